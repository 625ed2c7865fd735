use super::models::*;
use super::sqlite::EmbeddedEngine;
use crate::error::{Error, Result};
use rusqlite::{params, ErrorCode};
use tracing::trace;

impl EmbeddedEngine {
    // ── Files ────────────────────────────────────────────────────

    pub(super) fn insert_file(&self, path: &str, hash: &str, size: u64) -> Result<()> {
        let result = self.connection()?.execute(
            "INSERT INTO files (path, hash, size) VALUES (?1, ?2, ?3)",
            params![path, hash, size as i64],
        );
        match result {
            Ok(_) => {
                trace!("Indexed {} ({} bytes)", path, size);
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(Error::UniquenessViolation {
                    path: path.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(super) fn select_not_unique_hashes(&self) -> Result<Vec<String>> {
        let mut stmt = self.connection()?.prepare_cached(
            "SELECT hash FROM files GROUP BY hash HAVING COUNT(*) > 1 ORDER BY hash",
        )?;
        let hashes = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(hashes)
    }

    pub(super) fn select_files_by_hash(&self, hash: &str) -> Result<Vec<(String, u64)>> {
        let mut stmt = self
            .connection()?
            .prepare_cached("SELECT path, size FROM files WHERE hash = ?1 ORDER BY rowid")?;
        let files = stmt
            .query_map(params![hash], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    /// Every indexed file, in insertion order.
    pub fn file_records(&self) -> Result<Vec<FileRecord>> {
        let mut stmt = self
            .connection()?
            .prepare("SELECT path, hash, size FROM files ORDER BY rowid")?;
        let files = stmt
            .query_map([], |row| {
                Ok(FileRecord {
                    path: row.get(0)?,
                    hash: row.get(1)?,
                    size: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    pub fn file_count(&self) -> Result<u64> {
        let count: i64 = self
            .connection()?
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ── Groups ───────────────────────────────────────────────────

    pub(super) fn insert_group_record(&self, hash: &str, path: &str, size: u64) -> Result<()> {
        self.connection()?.execute(
            "INSERT INTO result (groupId, path, size) VALUES (?1, ?2, ?3)",
            params![hash, path, size as i64],
        )?;
        Ok(())
    }

    /// The persisted result table, in insertion order.
    pub fn group_records(&self) -> Result<Vec<GroupRecord>> {
        let mut stmt = self
            .connection()?
            .prepare("SELECT groupId, path, size FROM result ORDER BY rowid")?;
        let records = stmt
            .query_map([], |row| {
                Ok(GroupRecord {
                    group_key: row.get(0)?,
                    path: row.get(1)?,
                    size: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}
