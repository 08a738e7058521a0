//! Folio cache system.
//!
//! A read-through cache in front of the content repositories:
//!
//! - **Gateway**: string key/value store with TTL and pattern delete, backed by an in-process
//!   LRU or Redis
//! - **Entity cache**: typed item and list-page caching on top of the gateway, where every
//!   backend failure degrades to a miss
//! - **Invalidation**: write events are planned into item keys and list patterns, expanded
//!   through cross-entity dependencies, and applied before the write is acknowledged
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "memory"
//! ttl_short_seconds = 60
//! # ... see config/default.toml for all options
//! ```

pub mod config;
mod consumer;
pub mod deps;
mod entity;
mod events;
mod flight;
mod gateway;
pub mod keys;
mod lock;
mod planner;
mod store;
mod trigger;

pub use config::{CacheConfig, RetryPolicy};
pub use consumer::{CacheConsumer, InvalidationError, InvalidationReport};
pub use deps::DependencyGraph;
pub use entity::EntityCache;
pub use events::{CacheEvent, EventKind};
pub use flight::{InFlight, Landed};
pub use gateway::{CacheError, CacheGateway, HEALTH_CHECK_KEY, NullCache, TtlPolicy};
pub use planner::InvalidationPlan;
pub use store::MemoryCache;
pub use trigger::CacheTrigger;

pub const METRIC_CACHE_HIT_TOTAL: &str = "folio_cache_hit_total";
pub const METRIC_CACHE_MISS_TOTAL: &str = "folio_cache_miss_total";
pub const METRIC_CACHE_ERROR_TOTAL: &str = "folio_cache_error_total";
pub const METRIC_CACHE_COALESCED_TOTAL: &str = "folio_cache_coalesced_total";
pub const METRIC_CACHE_INVALIDATION_FAILED_TOTAL: &str = "folio_cache_invalidation_failed_total";
pub const METRIC_CACHE_INVALIDATION_MS: &str = "folio_cache_invalidation_ms";
pub const METRIC_PAGINATE_MS: &str = "folio_paginate_ms";
