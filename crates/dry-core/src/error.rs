use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("storage is not opened")]
    NotOpened,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("path already indexed: {path}")]
    UniquenessViolation { path: String },

    #[error("not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("error reading {}: {source}", path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("input must be a folder: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] diesel::result::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    pub(crate) fn read_failure(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::ReadFailure {
            path: path.into(),
            source,
        }
    }

    /// True for precondition failures that must never be swallowed.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::NotOpened | Error::InvalidConfig(_) | Error::NotAFile(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
