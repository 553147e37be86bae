use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use jiff::Timestamp;
use linkstub_core::{field, BackendError, KvBackend, LinkRecord};
use std::collections::HashMap;
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

type Result<T> = std::result::Result<T, BackendError>;

/// Key prefix the original service used for its record namespace.
pub const DEFAULT_KEY_PREFIX: &str = "Shortener:";

const DEFAULT_POOL_SIZE: usize = 16;

/// Connection settings for [`RedisBackend`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct RedisBackendConfig {
    /// Redis connection URL, e.g. `redis://127.0.0.1:6379`.
    #[builder(setter(into))]
    pub url: String,
    /// Prefix prepended to every record key.
    #[builder(default = String::from(DEFAULT_KEY_PREFIX), setter(into))]
    pub key_prefix: String,
    /// Maximum number of pooled connections.
    #[builder(default = DEFAULT_POOL_SIZE)]
    pub pool_size: usize,
}

/// Redis implementation of [`KvBackend`].
///
/// Records are stored as hashes under `<prefix><decimal id>`; eviction uses
/// Redis's native absolute expiry (`EXPIREAT`). Every operation checks a
/// connection out of a deadpool pool for its own duration; the pool guard
/// returns it on every exit path.
#[derive(Debug, Clone)]
pub struct RedisBackend {
    pool: deadpool_redis::Pool,
    key_prefix: String,
}

fn map_redis_error(operation: &str, err: deadpool_redis::redis::RedisError) -> BackendError {
    let message = format!("{operation}: {err}");
    if message.to_ascii_lowercase().contains("timed out") {
        BackendError::Timeout(message)
    } else {
        BackendError::Operation(message)
    }
}

fn map_pool_error(operation: &str, err: impl std::fmt::Display) -> BackendError {
    let message = format!("{operation}: {err}");
    if message.to_ascii_lowercase().contains("timed out") {
        BackendError::Timeout(message)
    } else {
        BackendError::Unavailable(message)
    }
}

impl RedisBackend {
    /// Creates a backend over an existing connection pool.
    pub fn new(pool: deadpool_redis::Pool, key_prefix: impl Into<String>) -> Self {
        Self {
            pool,
            key_prefix: key_prefix.into(),
        }
    }

    /// Creates a backend from connection settings.
    ///
    /// Pool creation is lazy; no connection is established until the first
    /// operation runs.
    pub fn open(config: RedisBackendConfig) -> Result<Self> {
        let mut pool_config = deadpool_redis::Config::from_url(&config.url);
        pool_config.pool = Some(deadpool_redis::PoolConfig::new(config.pool_size));

        let pool = pool_config
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .map_err(|e| BackendError::Unavailable(format!("failed to create redis pool: {e}")))?;

        Ok(Self::new(pool, config.key_prefix))
    }

    /// Derives the record key for an identifier.
    fn record_key(&self, id: u64) -> String {
        format!("{}{}", self.key_prefix, id)
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| map_pool_error("failed to get redis connection", e))
    }
}

#[async_trait]
impl KvBackend for RedisBackend {
    async fn exists(&self, id: u64) -> Result<bool> {
        let key = self.record_key(id);
        let mut conn = self.conn().await?;

        conn.exists::<_, bool>(&key)
            .await
            .map_err(|e| map_redis_error("failed to check key existence", e))
    }

    async fn write_record(&self, record: &LinkRecord) -> Result<()> {
        let key = self.record_key(record.id);
        trace!(id = record.id, "writing record");

        let mut conn = self.conn().await?;
        conn.hset_multiple::<_, _, _, ()>(&key, &record.to_fields())
            .await
            .map_err(|e| map_redis_error("failed to write record fields", e))
    }

    async fn write_record_if_absent(&self, record: &LinkRecord) -> Result<bool> {
        let key = self.record_key(record.id);
        trace!(id = record.id, "claiming record key");

        let mut conn = self.conn().await?;

        // HSETNX on the url field is the atomic claim; a losing writer sees
        // `false` and redraws. The remaining fields are filled in after a won
        // claim, so only the claim itself needs to be conditional.
        let claimed: bool = conn
            .hset_nx(&key, field::URL, &record.url)
            .await
            .map_err(|e| map_redis_error("failed to claim record key", e))?;

        if !claimed {
            debug!(id = record.id, "record key already taken");
            return Ok(false);
        }

        let rest = [
            (field::ID, record.id.to_string()),
            (field::EXPIRES_AT, record.expires_at.to_string()),
            (field::VISITS, record.visits.to_string()),
        ];
        conn.hset_multiple::<_, _, _, ()>(&key, &rest)
            .await
            .map_err(|e| map_redis_error("failed to write record fields", e))?;

        debug!(id = record.id, "record key claimed");
        Ok(true)
    }

    async fn set_expiry(&self, id: u64, at: Timestamp) -> Result<()> {
        let key = self.record_key(id);
        trace!(id, at = %at, "setting record expiry");

        let mut conn = self.conn().await?;
        let applied: bool = conn
            .expire_at(&key, at.as_second())
            .await
            .map_err(|e| map_redis_error("failed to set record expiry", e))?;

        if !applied {
            warn!(id, "expiry requested for a missing record key");
        }
        Ok(())
    }

    async fn read_field(&self, id: u64, name: &str) -> Result<Option<String>> {
        let key = self.record_key(id);
        let mut conn = self.conn().await?;

        conn.hget::<_, _, Option<String>>(&key, name)
            .await
            .map_err(|e| map_redis_error("failed to read record field", e))
    }

    async fn increment_field(&self, id: u64, name: &str, delta: i64) -> Result<i64> {
        let key = self.record_key(id);
        let mut conn = self.conn().await?;

        conn.hincr::<_, _, _, i64>(&key, name, delta)
            .await
            .map_err(|e| map_redis_error("failed to increment record field", e))
    }

    async fn read_all_fields(&self, id: u64) -> Result<HashMap<String, String>> {
        let key = self.record_key(id);
        let mut conn = self.conn().await?;

        conn.hgetall::<_, HashMap<String, String>>(&key)
            .await
            .map_err(|e| map_redis_error("failed to read record fields", e))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close();
        Ok(())
    }
}
