use super::pg_schema::{dry_files, dry_groups, dry_log};
use super::{FailurePolicy, Index, PgLocator, SessionScope, StorageLocator};
use crate::error::{Error, Result};
use diesel::connection::SimpleConnection;
use diesel::dsl::{count, max};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError, QueryResult};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// Set once this process has run the schema DDL. Other processes racing on
/// their first open rely on `IF NOT EXISTS`; there is no cross-process lock.
static SCHEMA_CREATED: AtomicBool = AtomicBool::new(false);

diesel::sql_function!(fn pg_backend_pid() -> diesel::sql_types::Integer);

pub fn schema_created() -> bool {
    SCHEMA_CREATED.load(Ordering::Acquire)
}

#[derive(Insertable)]
#[diesel(table_name = dry_files)]
struct NewFileRecord<'a> {
    producer_id: i32,
    session_id: i32,
    path: &'a str,
    hash: &'a str,
    size: i64,
}

#[derive(Insertable)]
#[diesel(table_name = dry_groups)]
struct NewGroupRecord<'a> {
    producer_id: i32,
    session_id: i32,
    group_key: &'a str,
    path: &'a str,
    size: i64,
}

#[derive(Insertable)]
#[diesel(table_name = dry_log)]
struct NewLogRow<'a> {
    producer_id: i32,
    session_id: i32,
    elapsed_ms: i64,
    level: &'a str,
    message: &'a str,
}

/// Multi-process PostgreSQL store.
///
/// Rows are tagged with the engine's [`SessionScope`]. Writes carry the full
/// `(producer, session)` pair and uniqueness is enforced per pair; grouping
/// reads and [`cleanup`](Self::cleanup) cover the whole session so that the
/// contributions of every producer are combined.
///
/// Before every read or write the connection is pinged and, if it stopped
/// answering, re-established from the stored locator.
pub struct DistributedEngine {
    conn: Option<PgConnection>,
    locator: Option<PgLocator>,
    scope: Option<SessionScope>,
    policy: FailurePolicy,
    degraded_failures: usize,
    reconnects: usize,
}

impl Default for DistributedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DistributedEngine {
    pub fn new() -> Self {
        Self {
            conn: None,
            locator: None,
            scope: None,
            policy: FailurePolicy::default(),
            degraded_failures: 0,
            reconnects: 0,
        }
    }

    pub fn with_scope(mut self, scope: SessionScope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_scope(&mut self, scope: SessionScope) {
        self.scope = Some(scope);
    }

    pub fn scope(&self) -> Result<SessionScope> {
        self.scope.ok_or_else(|| {
            Error::InvalidConfig("producer and session ids are not set".to_string())
        })
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Reads and log writes that failed and were absorbed by
    /// [`FailurePolicy::BestEffort`].
    pub fn degraded_failures(&self) -> usize {
        self.degraded_failures
    }

    pub fn reconnects(&self) -> usize {
        self.reconnects
    }

    pub fn open_locator(&mut self, locator: &PgLocator) -> Result<()> {
        locator.validate()?;
        self.close();

        let mut conn = establish(locator)?;
        ensure_schema(&mut conn)?;
        info!("Connected to {} on {}", locator.dbname, locator.host);

        self.conn = Some(conn);
        self.locator = Some(locator.clone());
        Ok(())
    }

    /// Server process id of the live connection, as listed in
    /// `pg_stat_activity`.
    pub fn backend_pid(&mut self) -> Result<i32> {
        let conn = self.live_connection()?;
        let pid = diesel::select(pg_backend_pid()).get_result::<i32>(conn)?;
        Ok(pid)
    }

    /// The highest session id seen in the store, for a reducer discovering
    /// what to group.
    pub fn last_session(&mut self) -> Result<Option<i32>> {
        let conn = self.live_connection()?;
        let result = (|| -> QueryResult<Option<i32>> {
            let files: Option<i32> = dry_files::table
                .select(max(dry_files::session_id))
                .first(conn)?;
            let groups: Option<i32> = dry_groups::table
                .select(max(dry_groups::session_id))
                .first(conn)?;
            Ok(files.max(groups))
        })();
        self.absorb("last_session", result)
    }

    /// Delete the session's file records once its groups are extracted.
    pub fn cleanup(&mut self) -> Result<usize> {
        let scope = self.scope()?;
        let conn = self.live_connection()?;
        let deleted = diesel::delete(
            dry_files::table.filter(dry_files::session_id.eq(scope.session_id)),
        )
        .execute(conn)?;
        info!(
            "Removed {} file records of session {}",
            deleted, scope.session_id
        );
        Ok(deleted)
    }

    /// Append an operational log row. Under [`FailurePolicy::BestEffort`] a
    /// failure is logged and swallowed.
    pub fn write_log(&mut self, elapsed_ms: i64, level: &str, message: &str) -> Result<()> {
        let scope = self.scope()?;
        let result = self.live_connection().and_then(|conn| {
            diesel::insert_into(dry_log::table)
                .values(&NewLogRow {
                    producer_id: scope.producer_id,
                    session_id: scope.session_id,
                    elapsed_ms,
                    level,
                    message,
                })
                .execute(conn)
                .map_err(Error::from)
        });
        match result {
            Ok(_) => Ok(()),
            Err(err) if err.is_precondition() => Err(err),
            Err(err) => match self.policy {
                FailurePolicy::BestEffort => {
                    self.degraded_failures += 1;
                    error!("Log write failed: {}", err);
                    Ok(())
                }
                FailurePolicy::Strict => Err(err),
            },
        }
    }

    /// Ping the current connection and reconnect if it no longer answers.
    fn live_connection(&mut self) -> Result<&mut PgConnection> {
        self.check_open()?;
        let alive = match self.conn.as_mut() {
            Some(conn) => ping(conn),
            None => false,
        };
        if !alive {
            self.reconnect()?;
        }
        self.conn.as_mut().ok_or(Error::NotOpened)
    }

    fn reconnect(&mut self) -> Result<()> {
        let locator = self.locator.clone().ok_or(Error::NotOpened)?;
        warn!("Connection to {} lost, reconnecting", locator.host);
        self.conn = None;

        let mut conn = establish(&locator)?;
        ensure_schema(&mut conn)?;
        self.conn = Some(conn);
        self.reconnects += 1;
        Ok(())
    }

    /// Apply the failure policy to a read that ran on a live connection.
    fn absorb<T: Default>(&mut self, operation: &str, result: QueryResult<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => match self.policy {
                FailurePolicy::BestEffort => {
                    self.degraded_failures += 1;
                    error!("{} failed, continuing with an empty result: {}", operation, err);
                    Ok(T::default())
                }
                FailurePolicy::Strict => Err(err.into()),
            },
        }
    }
}

fn establish(locator: &PgLocator) -> Result<PgConnection> {
    PgConnection::establish(&locator.connection_string()).map_err(|err| {
        Error::ConnectionFailed(format!("{} on {}: {}", locator.dbname, locator.host, err))
    })
}

fn ping(conn: &mut PgConnection) -> bool {
    diesel::sql_query("SELECT 1").execute(conn).is_ok()
}

fn ensure_schema(conn: &mut PgConnection) -> Result<()> {
    if SCHEMA_CREATED.load(Ordering::Acquire) {
        return Ok(());
    }
    conn.batch_execute(include_str!("pg_schema.sql"))?;
    SCHEMA_CREATED.store(true, Ordering::Release);
    debug!("PostgreSQL schema ensured");
    Ok(())
}

impl Index for DistributedEngine {
    fn open(&mut self, locator: &StorageLocator) -> Result<()> {
        match locator {
            StorageLocator::Distributed(pg) => self.open_locator(pg),
            StorageLocator::Embedded(_) => Err(Error::InvalidConfig(
                "pg storage needs host, user and dbname".to_string(),
            )),
        }
    }

    fn close(&mut self) {
        self.conn = None;
        self.locator = None;
    }

    fn check_open(&self) -> Result<()> {
        match self.locator {
            Some(_) => Ok(()),
            None => Err(Error::NotOpened),
        }
    }

    fn write_file_info(&mut self, path: &str, hash: &str, size: u64) -> Result<()> {
        let scope = self.scope()?;
        let conn = self.live_connection()?;
        let result = diesel::insert_into(dry_files::table)
            .values(&NewFileRecord {
                producer_id: scope.producer_id,
                session_id: scope.session_id,
                path,
                hash,
                size: size as i64,
            })
            .execute(conn);
        match result {
            Ok(_) => Ok(()),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(Error::UniquenessViolation {
                    path: path.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn not_unique_hashes(&mut self) -> Result<Vec<String>> {
        let scope = self.scope()?;
        let conn = self.live_connection()?;
        let result = dry_files::table
            .filter(dry_files::session_id.eq(scope.session_id))
            .group_by(dry_files::hash)
            .having(count(dry_files::id).gt(1_i64))
            .select(dry_files::hash)
            .load::<String>(conn);
        let mut hashes = self.absorb("not_unique_hashes", result)?;
        hashes.sort();
        Ok(hashes)
    }

    fn files_by_hash(&mut self, hash: &str) -> Result<Vec<(String, u64)>> {
        let scope = self.scope()?;
        let conn = self.live_connection()?;
        let result = dry_files::table
            .filter(dry_files::session_id.eq(scope.session_id))
            .filter(dry_files::hash.eq(hash))
            .order(dry_files::id.asc())
            .select((dry_files::path, dry_files::size))
            .load::<(String, i64)>(conn);
        let files = self.absorb("files_by_hash", result)?;
        Ok(files
            .into_iter()
            .map(|(path, size)| (path, size as u64))
            .collect())
    }

    fn write_group_record(&mut self, hash: &str, path: &str, size: u64) -> Result<()> {
        let scope = self.scope()?;
        let conn = self.live_connection()?;
        diesel::insert_into(dry_groups::table)
            .values(&NewGroupRecord {
                producer_id: scope.producer_id,
                session_id: scope.session_id,
                group_key: hash,
                path,
                size: size as i64,
            })
            .execute(conn)?;
        Ok(())
    }
}
