pub mod comparator;
pub mod config;
pub mod engine;
pub mod error;
pub mod grouper;
pub mod hasher;
pub mod progress;
pub mod scanner;
pub mod storage;

pub use config::AppConfig;
pub use engine::{DryEngine, GroupOutcome, IndexOutcome, RunResult};
pub use error::{Error, Result};
pub use grouper::DuplicateGroup;
pub use progress::{ProgressReporter, SilentReporter};
pub use storage::{Index, Storage, StorageKind, StorageLocator};
