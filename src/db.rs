use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, info, warn, Instrument};

use crate::blacklist::{
    add_to_list, decode_blacklist, encode_blacklist, remove_from_list, BlacklistError,
    BlacklistItem, BlacklistStore, OwnerId, BLACKLIST_KEY,
};
use crate::config::DatabaseConfig;
use crate::errors::error_logging;
use crate::observability;

/// Create a connection pool from configuration
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connecting to PostgreSQL"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
        .max_lifetime(config.max_lifetime_secs.map(std::time::Duration::from_secs))
        .idle_timeout(config.idle_timeout_secs.map(std::time::Duration::from_secs))
        .connect(&config.url)
        .await
        .context("Failed to connect to PostgreSQL")
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS kv_store (
            owner_id BIGINT NOT NULL,
            storage_key VARCHAR(255) NOT NULL,
            value TEXT NOT NULL,
            updated_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (owner_id, storage_key)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create kv_store table")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// Read the raw value stored under `key` for an owner
pub async fn read_value(pool: &PgPool, owner: OwnerId, key: &str) -> Result<Option<String>> {
    debug!(owner_id = %owner, storage_key = %key, "Reading stored value");

    let row = sqlx::query("SELECT value FROM kv_store WHERE owner_id = $1 AND storage_key = $2")
        .bind(owner)
        .bind(key)
        .fetch_optional(pool)
        .await
        .context("Failed to read stored value")?;

    Ok(row.map(|row| row.get(0)))
}

/// Delete the value stored under `key` for an owner
pub async fn delete_value(pool: &PgPool, owner: OwnerId, key: &str) -> Result<bool> {
    debug!(owner_id = %owner, storage_key = %key, "Deleting stored value");

    let result = sqlx::query("DELETE FROM kv_store WHERE owner_id = $1 AND storage_key = $2")
        .bind(owner)
        .bind(key)
        .execute(pool)
        .await
        .context("Failed to delete stored value")?;

    Ok(result.rows_affected() > 0)
}

async fn write_value(
    tx: &mut Transaction<'_, Postgres>,
    owner: OwnerId,
    key: &str,
    value: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO kv_store (owner_id, storage_key, value) VALUES ($1, $2, $3)
         ON CONFLICT (owner_id, storage_key)
         DO UPDATE SET value = EXCLUDED.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(owner)
    .bind(key)
    .bind(value)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Blacklist store backed by the PostgreSQL `kv_store` table
#[derive(Debug, Clone)]
pub struct PgBlacklistStore {
    pool: PgPool,
}

impl PgBlacklistStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Read-modify-write under a per-owner transaction-scoped advisory lock
    async fn update<F>(
        &self,
        owner: OwnerId,
        operation: &str,
        f: F,
    ) -> Result<Vec<BlacklistItem>, BlacklistError>
    where
        F: FnOnce(Vec<BlacklistItem>) -> Result<Vec<BlacklistItem>, BlacklistError> + Send,
    {
        let span = observability::storage_span(operation, self.backend_name());
        let start = Instant::now();

        let result = async {
            let mut tx = self.pool.begin().await?;

            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(owner)
                .execute(&mut *tx)
                .await?;

            let raw: Option<String> = sqlx::query(
                "SELECT value FROM kv_store WHERE owner_id = $1 AND storage_key = $2",
            )
            .bind(owner)
            .bind(BLACKLIST_KEY)
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| row.get(0));

            let updated = f(decode_blacklist(raw.as_deref())?)?;
            write_value(&mut tx, owner, BLACKLIST_KEY, &encode_blacklist(&updated)?).await?;
            tx.commit().await?;
            Ok::<_, BlacklistError>(updated)
        }
        .instrument(span)
        .await;

        if let Err(e @ BlacklistError::Storage(_)) = &result {
            error_logging::log_storage_error(e, operation, Some(owner), self.backend_name());
        }
        observability::record_blacklist_operation(operation, result.is_ok(), start.elapsed());
        result
    }
}

#[async_trait]
impl BlacklistStore for PgBlacklistStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn load(&self, owner: OwnerId) -> Vec<BlacklistItem> {
        let start = Instant::now();
        let loaded = match read_value(&self.pool, owner, BLACKLIST_KEY).await {
            Ok(raw) => decode_blacklist(raw.as_deref()).map_err(anyhow::Error::from),
            Err(e) => Err(e),
        };
        observability::record_storage_duration("load", start.elapsed());

        match loaded {
            Ok(items) => items,
            Err(e) => {
                warn!(owner_id = %owner, error = %e, "Failed to load blacklist, using empty list");
                Vec::new()
            }
        }
    }

    async fn add(&self, owner: OwnerId, name: &str) -> Result<Vec<BlacklistItem>, BlacklistError> {
        let name = name.to_string();
        self.update(owner, "add", move |current| add_to_list(current, &name))
            .await
    }

    async fn remove(
        &self,
        owner: OwnerId,
        id: &str,
    ) -> Result<Vec<BlacklistItem>, BlacklistError> {
        let id = id.to_string();
        self.update(owner, "remove", move |current| Ok(remove_from_list(current, &id)))
            .await
    }

    async fn clear(&self, owner: OwnerId) -> Result<(), BlacklistError> {
        let start = Instant::now();
        let result = delete_value(&self.pool, owner, BLACKLIST_KEY)
            .await
            .map(|_| ())
            .map_err(|e| BlacklistError::Storage(e.to_string()));

        if let Err(e) = &result {
            error_logging::log_storage_error(e, "clear", Some(owner), self.backend_name());
        }
        observability::record_blacklist_operation("clear", result.is_ok(), start.elapsed());
        result
    }

    async fn health_check(&self) -> Result<(), BlacklistError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| BlacklistError::Storage(format!("Database health check failed: {}", e)))
    }
}
