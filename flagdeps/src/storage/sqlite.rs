use super::{error::Result, error::StorageError, ChangeSet, EventSink, FlagStore};
use crate::core::{Actor, AuditEvent, CoreError, Dependency, EventKind, Flag, FlagId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Default pool size for SQLite connection pool.
const DEFAULT_POOL_SIZE: u32 = 10;

/// Default connection timeout in seconds.
const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Configuration for the SQLite connection pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool.
    pub max_size: u32,
    /// Minimum number of idle connections to maintain.
    pub min_idle: Option<u32>,
    /// Maximum time to wait for a connection from the pool.
    pub connection_timeout: Duration,
    /// Idle timeout for connections.
    pub idle_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_POOL_SIZE,
            min_idle: Some(1),
            connection_timeout: Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS),
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }
}

/// SQLite-backed flag store with connection pooling.
///
/// Each [`ChangeSet`] is written inside a single transaction. The audit
/// ledger lives in the same database and is reached through
/// [`SqliteFlagStore::event_log`].
pub struct SqliteFlagStore {
    pool: SqlitePool,
    db_path: String,
}

impl SqliteFlagStore {
    /// Opens (creating if missing) a database file with the default pool.
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(db_path, PoolConfig::default()).await
    }

    pub async fn with_config(db_path: impl AsRef<Path>, config: PoolConfig) -> Result<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        let connect_options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path_str))
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = Self::build_pool(connect_options, &config).await?;
        let store = Self {
            pool,
            db_path: db_path_str,
        };
        store.initialize().await?;
        Ok(store)
    }

    /// Creates an in-memory database.
    ///
    /// An in-memory database exists per connection, so the pool is pinned to
    /// a single connection that never idles out.
    pub async fn in_memory() -> Result<Self> {
        let config = PoolConfig {
            max_size: 1,
            min_idle: Some(1),
            idle_timeout: None,
            ..PoolConfig::default()
        };

        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .journal_mode(SqliteJournalMode::Memory)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = Self::build_pool(connect_options, &config).await?;
        let store = Self {
            pool,
            db_path: ":memory:".to_string(),
        };
        store.initialize().await?;
        Ok(store)
    }

    async fn build_pool(
        connect_options: SqliteConnectOptions,
        config: &PoolConfig,
    ) -> Result<Pool<Sqlite>> {
        let mut builder = SqlitePoolOptions::new()
            .max_connections(config.max_size)
            .acquire_timeout(config.connection_timeout);

        if let Some(min_idle) = config.min_idle {
            builder = builder.min_connections(min_idle);
        }

        builder = builder.idle_timeout(config.idle_timeout);

        let pool = builder
            .connect_with(connect_options)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(pool)
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS flags (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL UNIQUE,
                enabled INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS dependencies (
                id TEXT PRIMARY KEY,
                dependent_id TEXT NOT NULL REFERENCES flags(id),
                source_id TEXT NOT NULL REFERENCES flags(id),
                dependent_title TEXT NOT NULL,
                source_title TEXT NOT NULL,
                creator TEXT,
                created_at INTEGER NOT NULL,
                UNIQUE (dependent_id, source_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id TEXT PRIMARY KEY,
                flag_id TEXT NOT NULL,
                flag_title TEXT NOT NULL,
                kind TEXT NOT NULL,
                actor TEXT,
                reason TEXT,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_log_flag ON audit_log(flag_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Returns the database path.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Returns the current pool size for monitoring.
    pub fn pool_size(&self) -> u32 {
        self.pool.size()
    }

    /// An event sink writing to this database's audit ledger.
    pub fn event_log(&self) -> SqliteEventLog {
        SqliteEventLog {
            pool: self.pool.clone(),
        }
    }

    fn row_to_flag(row: &SqliteRow) -> Result<Flag> {
        let id: String = row.try_get("id")?;
        let title: String = row.try_get("title")?;
        let enabled: bool = row.try_get("enabled")?;
        let created_at: i64 = row.try_get("created_at")?;
        let updated_at: i64 = row.try_get("updated_at")?;

        Ok(Flag::from_parts(
            id.parse()?,
            title,
            enabled,
            from_millis(created_at)?,
            from_millis(updated_at)?,
        ))
    }

    fn row_to_dependency(row: &SqliteRow) -> Result<Dependency> {
        let id: String = row.try_get("id")?;
        let id = parse_record_id(&id)?;
        let dependent: String = row.try_get("dependent_id")?;
        let source: String = row.try_get("source_id")?;
        let dependent_title: String = row.try_get("dependent_title")?;
        let source_title: String = row.try_get("source_title")?;
        let creator: Option<String> = row.try_get("creator")?;
        let created_at: i64 = row.try_get("created_at")?;

        Ok(Dependency::from_parts(
            id,
            dependent.parse()?,
            dependent_title,
            source.parse()?,
            source_title,
            creator.map(Actor::new),
            from_millis(created_at)?,
        ))
    }
}

fn from_millis(millis: i64) -> std::result::Result<DateTime<Utc>, CoreError> {
    DateTime::from_timestamp_millis(millis).ok_or(CoreError::InvalidTimestamp(millis))
}

fn parse_record_id(id: &str) -> std::result::Result<Uuid, CoreError> {
    Uuid::parse_str(id).map_err(|_| CoreError::InvalidRecordId(id.to_string()))
}

/// Maps unique-constraint violations to [`StorageError::Conflict`].
fn conflict_or(err: sqlx::Error, what: impl FnOnce() -> String) -> StorageError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict(what()),
        _ => StorageError::Database(err),
    }
}

#[async_trait]
impl FlagStore for SqliteFlagStore {
    async fn load_flags(&self) -> Result<Vec<Flag>> {
        let rows = sqlx::query(
            "SELECT id, title, enabled, created_at, updated_at FROM flags ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_flag).collect()
    }

    async fn load_dependencies(&self) -> Result<Vec<Dependency>> {
        let rows = sqlx::query(
            "SELECT id, dependent_id, source_id, dependent_title, source_title, creator, created_at
             FROM dependencies ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_dependency).collect()
    }

    async fn apply(&self, changes: &ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        // Dropping the transaction on an early return rolls it back.
        let mut tx = self.pool.begin().await?;

        for flag in &changes.created_flags {
            sqlx::query(
                "INSERT INTO flags (id, title, enabled, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(flag.id().to_string())
            .bind(flag.title())
            .bind(flag.is_enabled())
            .bind(flag.created_at().timestamp_millis())
            .bind(flag.updated_at().timestamp_millis())
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict_or(e, || format!("flag '{}' already exists", flag.title())))?;
        }

        for flag in &changes.updated_flags {
            let result = sqlx::query("UPDATE flags SET enabled = ?, updated_at = ? WHERE id = ?")
                .bind(flag.is_enabled())
                .bind(flag.updated_at().timestamp_millis())
                .bind(flag.id().to_string())
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                return Err(StorageError::FlagNotFound(flag.id()));
            }
        }

        for id in &changes.removed_dependencies {
            let result = sqlx::query("DELETE FROM dependencies WHERE id = ?")
                .bind(id.to_string())
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                return Err(StorageError::DependencyNotFound(*id));
            }
        }

        for dependency in &changes.added_dependencies {
            sqlx::query(
                "INSERT INTO dependencies
                 (id, dependent_id, source_id, dependent_title, source_title, creator, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(dependency.id().to_string())
            .bind(dependency.dependent().to_string())
            .bind(dependency.source().to_string())
            .bind(dependency.dependent_title())
            .bind(dependency.source_title())
            .bind(dependency.creator().map(|a| a.name().to_string()))
            .bind(dependency.created_at().timestamp_millis())
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict_or(e, || format!("dependency '{}' already exists", dependency)))?;
        }

        tx.commit().await?;

        debug!(
            created = changes.created_flags.len(),
            updated = changes.updated_flags.len(),
            added = changes.added_dependencies.len(),
            removed = changes.removed_dependencies.len(),
            "committed change set"
        );
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM dependencies")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM flags").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM audit_log")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        info!(path = %self.db_path, "closed flag store database");
        Ok(())
    }
}

/// Audit ledger stored in the `audit_log` table of a [`SqliteFlagStore`].
#[derive(Clone)]
pub struct SqliteEventLog {
    pool: SqlitePool,
}

impl SqliteEventLog {
    fn row_to_event(row: &SqliteRow) -> Result<AuditEvent> {
        let id: String = row.try_get("id")?;
        let id = parse_record_id(&id)?;
        let flag: String = row.try_get("flag_id")?;
        let flag_title: String = row.try_get("flag_title")?;
        let kind: String = row.try_get("kind")?;
        let actor: Option<String> = row.try_get("actor")?;
        let reason: Option<String> = row.try_get("reason")?;
        let created_at: i64 = row.try_get("created_at")?;

        Ok(AuditEvent::from_parts(
            id,
            flag.parse()?,
            flag_title,
            kind.parse::<EventKind>()?,
            actor.map(Actor::new),
            reason,
            from_millis(created_at)?,
        ))
    }
}

#[async_trait]
impl EventSink for SqliteEventLog {
    async fn record(&self, events: &[AuditEvent]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for event in events {
            sqlx::query(
                "INSERT INTO audit_log (id, flag_id, flag_title, kind, actor, reason, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(event.id().to_string())
            .bind(event.flag().to_string())
            .bind(event.flag_title())
            .bind(event.kind().as_str())
            .bind(event.actor().map(|a| a.name().to_string()))
            .bind(event.reason())
            .bind(event.created_at().timestamp_millis())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn events(&self) -> Result<Vec<AuditEvent>> {
        let rows = sqlx::query(
            "SELECT id, flag_id, flag_title, kind, actor, reason, created_at
             FROM audit_log ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_event).collect()
    }

    async fn events_for_flag(&self, flag: FlagId) -> Result<Vec<AuditEvent>> {
        let rows = sqlx::query(
            "SELECT id, flag_id, flag_title, kind, actor, reason, created_at
             FROM audit_log WHERE flag_id = ? ORDER BY rowid",
        )
        .bind(flag.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_event).collect()
    }
}
