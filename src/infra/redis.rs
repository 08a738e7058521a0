//! Redis-backed cache gateway.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use crate::cache::{CacheConfig, CacheError, CacheGateway};

const SCAN_BATCH: usize = 100;

pub struct RedisCache {
    connection: ConnectionManager,
    prefix: String,
    timeout: Duration,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("connection", &"<ConnectionManager>")
            .field("prefix", &self.prefix)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RedisCache {
    pub async fn connect(
        url: &str,
        prefix: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(CacheError::backend)?;
        let connection = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout {
                op: "connect",
                after: timeout,
            })?
            .map_err(CacheError::backend)?;
        info!(prefix = prefix.as_deref().unwrap_or(""), "Connected to redis cache");
        Ok(Self {
            connection,
            prefix: prefix.unwrap_or_default(),
            timeout,
        })
    }

    pub async fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        let url = config
            .redis_url
            .as_deref()
            .ok_or_else(|| CacheError::backend("cache.redis_url is required for the redis backend"))?;
        Self::connect(url, config.key_prefix.clone(), config.operation_timeout).await
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(CacheError::backend),
            Err(_) => Err(CacheError::Timeout {
                op,
                after: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl CacheGateway for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut connection = self.connection.clone();
        let key = self.key(key);
        let value: Option<String> = self.bounded("get", connection.get(&key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        let key = self.key(key);
        let seconds = ttl.as_secs().max(1);
        let () = self
            .bounded("set", connection.set_ex(&key, value, seconds))
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        let key = self.key(key);
        let _removed: u64 = self.bounded("delete", connection.del(&key)).await?;
        Ok(())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut connection = self.connection.clone();
        let pattern = self.key(pattern);
        let mut cursor = 0_u64;
        let mut removed = 0_u64;

        loop {
            let (next, keys): (u64, Vec<String>) = self
                .bounded(
                    "scan",
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut connection),
                )
                .await?;

            if !keys.is_empty() {
                let deleted: u64 = self
                    .bounded("delete_by_pattern", connection.del(&keys))
                    .await?;
                removed += deleted;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern = %pattern, removed, "Swept redis keys");
        Ok(removed)
    }
}
