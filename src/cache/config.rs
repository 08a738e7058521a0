//! Cache configuration.
//!
//! Resolved from the `[cache]` and `[invalidation]` sections of `folio.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::config::{CacheBackend, CacheSettings, InvalidationSettings};

use super::gateway::TtlPolicy;

const DEFAULT_MEMORY_CAPACITY: usize = 10_000;
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 500;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 50;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false every read misses and nothing is stored.
    pub enabled: bool,
    pub backend: CacheBackend,
    pub redis_url: Option<String>,
    /// Prepended to every key written to a shared remote store.
    pub key_prefix: Option<String>,
    pub memory_capacity: usize,
    pub ttl: TtlPolicy,
    /// Let concurrent misses on one list key share a single fetch.
    pub coalesce_misses: bool,
    pub operation_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Memory,
            redis_url: None,
            key_prefix: None,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            ttl: TtlPolicy::default(),
            coalesce_misses: true,
            operation_timeout: Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MS),
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
            key_prefix: settings.key_prefix.clone(),
            memory_capacity: settings.memory_capacity.get(),
            ttl: TtlPolicy {
                short: settings.ttl_short,
                medium: settings.ttl_medium,
                long: settings.ttl_long,
            },
            coalesce_misses: settings.coalesce_misses,
            operation_timeout: settings.operation_timeout,
        }
    }
}

impl CacheConfig {
    /// Returns the memory capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn coalescing(&self) -> bool {
        self.enabled && self.coalesce_misses
    }
}

/// Bounded retry with exponential backoff for invalidation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (zero-based).
    pub fn delay(&self, retry: u32) -> Duration {
        self.backoff.saturating_mul(2_u32.saturating_pow(retry))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

impl From<&InvalidationSettings> for RetryPolicy {
    fn from(settings: &InvalidationSettings) -> Self {
        Self {
            attempts: settings.retry_attempts.get(),
            backoff: settings.retry_backoff,
        }
    }
}
