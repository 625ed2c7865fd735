mod walk;

pub use walk::{compile_patterns, count_files, ensure_root, walk, WalkStats};
