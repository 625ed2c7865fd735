use crate::error::{Error, Result};
use crate::storage::{FailurePolicy, PgLocator, SessionScope, StorageKind, StorageLocator};
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::Path;

pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Storage backend name, `sqlite` or `pg`.
    pub storage: String,
    pub sqlite_path: String,
    pub pg: PgLocator,
    pub scope: Option<SessionScope>,
    pub ignore_patterns: Vec<String>,
    pub prescan: bool,
    pub failure_policy: FailurePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: "sqlite".to_string(),
            sqlite_path: IN_MEMORY.to_string(),
            pg: PgLocator::default(),
            scope: None,
            ignore_patterns: Vec::new(),
            prescan: true,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl AppConfig {
    pub fn storage_kind(&self) -> Result<StorageKind> {
        StorageKind::parse(&self.storage)
    }

    /// Build the locator for the configured backend, validating it on the way.
    pub fn storage_locator(&self) -> Result<StorageLocator> {
        match self.storage_kind()? {
            StorageKind::Embedded => {
                if self.sqlite_path.trim().is_empty() {
                    return Err(Error::InvalidConfig("sqlite_path is empty".to_string()));
                }
                Ok(StorageLocator::Embedded(self.sqlite_path.clone()))
            }
            StorageKind::Distributed => {
                self.pg.validate()?;
                Ok(StorageLocator::Distributed(self.pg.clone()))
            }
        }
    }
}

/// Load `Dry.toml` from the working directory (if present) and `DRY_*`
/// environment variables on top of it.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Dry").required(false))
        .add_source(Environment::with_prefix("DRY").separator("__"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

pub fn load_configuration_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::from(path).required(true))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
