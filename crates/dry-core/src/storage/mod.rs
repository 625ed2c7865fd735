pub mod models;
pub mod pg;
mod pg_schema;
mod queries;
pub mod sqlite;

pub use models::{FileRecord, GroupRecord};
pub use pg::DistributedEngine;
pub use sqlite::EmbeddedEngine;

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// The capability set shared by both storage engines.
///
/// Every operation other than `open`/`close` starts with `check_open` and
/// fails with [`Error::NotOpened`] when there is no live connection. Reads
/// take `&mut self` because the distributed engine may reconnect on the way.
pub trait Index {
    fn open(&mut self, locator: &StorageLocator) -> Result<()>;

    fn close(&mut self);

    fn check_open(&self) -> Result<()>;

    /// Insert one file record. A path already present in the current scope
    /// fails with [`Error::UniquenessViolation`].
    fn write_file_info(&mut self, path: &str, hash: &str, size: u64) -> Result<()>;

    /// Every hash shared by at least two file records.
    fn not_unique_hashes(&mut self) -> Result<Vec<String>>;

    /// `(path, size)` of every record with `hash`, in insertion order.
    fn files_by_hash(&mut self, hash: &str) -> Result<Vec<(String, u64)>>;

    fn write_group_record(&mut self, hash: &str, path: &str, size: u64) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Embedded,
    Distributed,
}

impl StorageKind {
    pub const SQLITE: &'static str = "sqlite";
    pub const PG: &'static str = "pg";

    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            Self::SQLITE => Ok(StorageKind::Embedded),
            Self::PG => Ok(StorageKind::Distributed),
            other => Err(Error::InvalidConfig(format!("no {} storage", other))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Embedded => f.write_str(Self::SQLITE),
            StorageKind::Distributed => f.write_str(Self::PG),
        }
    }
}

#[derive(Debug, Clone)]
pub enum StorageLocator {
    /// SQLite file path, or `:memory:`.
    Embedded(String),
    Distributed(PgLocator),
}

/// Connection descriptor for the PostgreSQL backend.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PgLocator {
    pub host: String,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub port: Option<u16>,
    /// Search path for the store's tables; empty keeps the server default.
    /// The schema DDL runs once per process, so only the first store opened
    /// gets its tables created.
    pub schema: String,
}

impl PgLocator {
    pub fn is_filled(&self) -> bool {
        !self.host.is_empty() && !self.user.is_empty() && !self.dbname.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_filled() {
            Ok(())
        } else {
            Err(Error::InvalidConfig(
                "pg locator needs host, user and dbname".to_string(),
            ))
        }
    }

    /// libpq keyword/value connection string.
    pub fn connection_string(&self) -> String {
        let mut parts = vec![
            format!("host={}", quote_conninfo(&self.host)),
            format!("user={}", quote_conninfo(&self.user)),
            format!("dbname={}", quote_conninfo(&self.dbname)),
        ];
        if !self.password.is_empty() {
            parts.push(format!("password={}", quote_conninfo(&self.password)));
        }
        if let Some(port) = self.port {
            parts.push(format!("port={}", port));
        }
        if !self.schema.is_empty() {
            let options = format!("-c search_path={}", self.schema);
            parts.push(format!("options={}", quote_conninfo(&options)));
        }
        parts.join(" ")
    }
}

// Keeps the password out of logs.
impl fmt::Debug for PgLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgLocator")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("dbname", &self.dbname)
            .field("port", &self.port)
            .field("schema", &self.schema)
            .finish()
    }
}

fn quote_conninfo(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Identifies one producer's contribution to one session in the shared store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SessionScope {
    pub producer_id: i32,
    pub session_id: i32,
}

/// What the distributed engine does with a failed read or log write once the
/// connection itself has been confirmed alive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Log the failure, return an empty result (reads) or nothing (log
    /// writes) and keep the run going.
    #[default]
    BestEffort,
    /// Return the error to the caller.
    Strict,
}

/// The engine chosen at startup.
pub enum Storage {
    Embedded(EmbeddedEngine),
    Distributed(DistributedEngine),
}

impl Storage {
    pub fn new(kind: StorageKind, scope: Option<SessionScope>, policy: FailurePolicy) -> Self {
        match kind {
            StorageKind::Embedded => Storage::Embedded(EmbeddedEngine::new()),
            StorageKind::Distributed => {
                let mut engine = DistributedEngine::new().with_policy(policy);
                if let Some(scope) = scope {
                    engine = engine.with_scope(scope);
                }
                Storage::Distributed(engine)
            }
        }
    }

    /// Build the engine matching `locator` and open it.
    pub fn open(
        locator: &StorageLocator,
        scope: Option<SessionScope>,
        policy: FailurePolicy,
    ) -> Result<Self> {
        let kind = match locator {
            StorageLocator::Embedded(_) => StorageKind::Embedded,
            StorageLocator::Distributed(_) => StorageKind::Distributed,
        };
        let mut storage = Storage::new(kind, scope, policy);
        storage.index().open(locator)?;
        Ok(storage)
    }

    pub fn kind(&self) -> StorageKind {
        match self {
            Storage::Embedded(_) => StorageKind::Embedded,
            Storage::Distributed(_) => StorageKind::Distributed,
        }
    }

    pub fn index(&mut self) -> &mut dyn Index {
        match self {
            Storage::Embedded(engine) => engine,
            Storage::Distributed(engine) => engine,
        }
    }

    pub fn distributed(&mut self) -> Option<&mut DistributedEngine> {
        match self {
            Storage::Distributed(engine) => Some(engine),
            Storage::Embedded(_) => None,
        }
    }

    /// Record an operational event. The embedded store has no log table, so
    /// only the tracing line is written there.
    pub fn log_event(&mut self, elapsed: Duration, level: &str, message: &str) -> Result<()> {
        match self {
            Storage::Embedded(_) => {
                debug!("[{} ms] {}: {}", elapsed.as_millis(), level, message);
                Ok(())
            }
            Storage::Distributed(engine) => {
                let elapsed_ms = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);
                engine.write_log(elapsed_ms, level, message).map_err(|err| {
                    warn!("Log row rejected: {}", err);
                    err
                })
            }
        }
    }

    pub fn close(&mut self) {
        self.index().close();
    }
}
