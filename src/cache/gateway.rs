//! Narrow key-value contract every cache backend implements.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::schema::TtlTier;

/// Key written and read back by [`CacheGateway::health_check`].
pub const HEALTH_CHECK_KEY: &str = "health_check";
const HEALTH_CHECK_VALUE: &str = "ok";
const HEALTH_CHECK_TTL: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache operation `{op}` timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },
    #[error("cache payload could not be encoded or decoded: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("cache health probe read back an unexpected value")]
    ProbeMismatch,
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Remote or in-process key-value store. Every call may fail independently.
#[async_trait]
pub trait CacheGateway: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Delete every key matching a glob (`*`, `?`). Returns the number of keys removed.
    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CacheError>;

    /// Write a probe key and read it back.
    async fn health_check(&self) -> Result<(), CacheError> {
        self.set(
            HEALTH_CHECK_KEY,
            HEALTH_CHECK_VALUE.to_string(),
            HEALTH_CHECK_TTL,
        )
        .await?;
        match self.get(HEALTH_CHECK_KEY).await? {
            Some(value) if value == HEALTH_CHECK_VALUE => Ok(()),
            _ => Err(CacheError::ProbeMismatch),
        }
    }
}

/// Gateway used when caching is disabled: every read misses, every write is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

#[async_trait]
impl CacheGateway for NullCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete_by_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
        Ok(0)
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Durations behind the named TTL tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub short: Duration,
    pub medium: Duration,
    pub long: Duration,
}

impl TtlPolicy {
    pub fn ttl(&self, tier: TtlTier) -> Duration {
        match tier {
            TtlTier::Short => self.short,
            TtlTier::Medium => self.medium,
            TtlTier::Long => self.long,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(60),
            medium: Duration::from_secs(60 * 60),
            long: Duration::from_secs(24 * 60 * 60),
        }
    }
}
