//! SQLite-backed [`SettingsStore`].

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{debug, info, warn};

use cogwheel_core::{CommandSetting, Setting, SettingsStore, StoreError, StoreResult};

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Settings persisted in a SQLite database.
///
/// Opening the store applies the embedded migrations, so a fresh file is
/// usable immediately.
#[derive(Clone)]
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    /// Connection acquire timeout.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Maximum time a connection can remain idle before being closed.
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Opens (or creates) the database at `path`.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub async fn connect(path: &str) -> StoreResult<Self> {
        let pool = if path == ":memory:" {
            // Uniquely named shared-cache database so parallel tests never collide.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let uri = format!(
                "file:cogwheel-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );
            let options = SqliteConnectOptions::new()
                .filename(&uri)
                .shared_cache(true)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .connect_with(options)
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                warn!(path = %parent.display(), error = %e, "Failed to create database directory");
            }

            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);

            let pool = SqlitePoolOptions::new()
                .max_connections(4)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .connect_with(options)
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;

            sqlx::query("PRAGMA journal_mode=WAL")
                .execute(&pool)
                .await
                .map_err(StoreError::database)?;
            pool
        };

        info!(path = %path, "Settings database connected");
        Self::from_pool(pool).await
    }

    /// Wraps an existing pool, applying migrations.
    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        debug!("Settings migrations checked/applied");
        Ok(Self { pool })
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl std::fmt::Debug for SqliteSettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSettingsStore")
            .field("connections", &self.pool.size())
            .finish()
    }
}

type CommandRow = (String, String, bool);

fn to_setting((handler_id, tag, enabled): CommandRow) -> CommandSetting {
    CommandSetting {
        handler_id,
        tag,
        enabled,
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn select(&self, handler_id: &str) -> StoreResult<Option<CommandSetting>> {
        let row = sqlx::query_as::<_, CommandRow>(
            "SELECT handler_id, tag, enabled FROM command_settings WHERE handler_id = ?",
        )
        .bind(handler_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::database)?;
        Ok(row.map(to_setting))
    }

    async fn select_all(&self) -> StoreResult<Vec<CommandSetting>> {
        let rows = sqlx::query_as::<_, CommandRow>(
            "SELECT handler_id, tag, enabled FROM command_settings ORDER BY handler_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::database)?;
        Ok(rows.into_iter().map(to_setting).collect())
    }

    async fn insert(&self, setting: &CommandSetting) -> StoreResult<u64> {
        let result = sqlx::query(
            "INSERT INTO command_settings (handler_id, tag, enabled) VALUES (?, ?, ?)",
        )
        .bind(&setting.handler_id)
        .bind(&setting.tag)
        .bind(setting.enabled)
        .execute(&self.pool)
        .await
        .map_err(StoreError::database)?;
        Ok(result.rows_affected())
    }

    async fn update(&self, setting: &CommandSetting) -> StoreResult<u64> {
        let result =
            sqlx::query("UPDATE command_settings SET tag = ?, enabled = ? WHERE handler_id = ?")
                .bind(&setting.tag)
                .bind(setting.enabled)
                .bind(&setting.handler_id)
                .execute(&self.pool)
                .await
                .map_err(StoreError::database)?;
        Ok(result.rows_affected())
    }

    async fn exists(&self, handler_id: &str) -> StoreResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM command_settings WHERE handler_id = ?")
                .bind(handler_id)
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::database)?;
        Ok(count > 0)
    }

    async fn delete(&self, handler_id: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM command_settings WHERE handler_id = ?")
            .bind(handler_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::database)?;
        Ok(result.rows_affected())
    }

    async fn get_value(&self, key: &str) -> StoreResult<Option<String>> {
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::database)
    }

    async fn set_value(&self, setting: &Setting) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(&setting.key)
        .bind(&setting.value)
        .execute(&self.pool)
        .await
        .map_err(StoreError::database)?;
        Ok(result.rows_affected())
    }

    async fn remove_value(&self, key: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(StoreError::database)?;
        Ok(result.rows_affected())
    }

    async fn values(&self) -> StoreResult<Vec<Setting>> {
        let rows = sqlx::query_as::<_, (String, String)>("SELECT key, value FROM settings ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::database)?;
        Ok(rows
            .into_iter()
            .map(|(key, value)| Setting { key, value })
            .collect())
    }
}
