use super::{Index, StorageLocator};
use crate::config::IN_MEMORY;
use crate::error::{Error, Result};
use rusqlite::Connection;
use tracing::debug;

/// Single-process SQLite store. The whole file is the scope.
pub struct EmbeddedEngine {
    conn: Option<Connection>,
    path: String,
}

impl Default for EmbeddedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddedEngine {
    pub fn new() -> Self {
        Self {
            conn: None,
            path: String::new(),
        }
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut engine = Self::new();
        engine.open_path(IN_MEMORY)?;
        Ok(engine)
    }

    pub fn open_path(&mut self, path: &str) -> Result<()> {
        if path.trim().is_empty() {
            return Err(Error::InvalidConfig("empty sqlite path".to_string()));
        }
        self.close();

        let conn = if path == IN_MEMORY {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        configure_pragmas(&conn)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        debug!("SQLite store ready at {}", path);

        self.conn = Some(conn);
        self.path = path.to_string();
        Ok(())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn connection(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(Error::NotOpened)
    }
}

fn configure_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

impl Index for EmbeddedEngine {
    fn open(&mut self, locator: &StorageLocator) -> Result<()> {
        match locator {
            StorageLocator::Embedded(path) => self.open_path(path),
            StorageLocator::Distributed(_) => Err(Error::InvalidConfig(
                "sqlite storage needs a file path".to_string(),
            )),
        }
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, err)) = conn.close() {
                tracing::error!("Error closing {}: {}", self.path, err);
            }
        }
    }

    fn check_open(&self) -> Result<()> {
        self.connection().map(|_| ())
    }

    fn write_file_info(&mut self, path: &str, hash: &str, size: u64) -> Result<()> {
        self.insert_file(path, hash, size)
    }

    fn not_unique_hashes(&mut self) -> Result<Vec<String>> {
        self.select_not_unique_hashes()
    }

    fn files_by_hash(&mut self, hash: &str) -> Result<Vec<(String, u64)>> {
        self.select_files_by_hash(hash)
    }

    fn write_group_record(&mut self, hash: &str, path: &str, size: u64) -> Result<()> {
        self.insert_group_record(hash, path, size)
    }
}
