//! Executes invalidation plans against the cache gateway.
//!
//! Every step is retried with exponential backoff. Steps that still fail are logged at
//! error level, counted, and reported back so the write path knows the cache may be stale.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use super::config::RetryPolicy;
use super::deps::DependencyGraph;
use super::events::CacheEvent;
use super::gateway::{CacheError, CacheGateway};
use super::planner::InvalidationPlan;
use super::{METRIC_CACHE_INVALIDATION_FAILED_TOTAL, METRIC_CACHE_INVALIDATION_MS};

#[derive(Debug, Error)]
pub enum InvalidationError {
    #[error("cache invalidation incomplete: {failed} of {total} steps failed, first: `{first}`")]
    Incomplete {
        failed: usize,
        total: usize,
        first: String,
    },
}

/// Outcome of a fully applied plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvalidationReport {
    pub items_deleted: usize,
    pub keys_swept: u64,
}

pub struct CacheConsumer {
    gateway: Arc<dyn CacheGateway>,
    graph: DependencyGraph,
    retry: RetryPolicy,
}

impl CacheConsumer {
    pub fn new(gateway: Arc<dyn CacheGateway>, graph: DependencyGraph, retry: RetryPolicy) -> Self {
        Self {
            gateway,
            graph,
            retry,
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Plan and apply invalidation for a batch of events.
    #[instrument(skip_all, fields(event_count = events.len()))]
    pub async fn consume(
        &self,
        events: &[CacheEvent],
    ) -> Result<InvalidationReport, InvalidationError> {
        let plan = InvalidationPlan::from_events(events, &self.graph);
        info!(plan = %plan, "Cache invalidation starting");
        self.execute(&plan).await
    }

    pub async fn execute(
        &self,
        plan: &InvalidationPlan,
    ) -> Result<InvalidationReport, InvalidationError> {
        let started_at = Instant::now();

        let deletes = plan.item_keys.iter().map(|key| async move {
            let result = self
                .retrying("delete", key, || self.gateway.delete(key))
                .await;
            (key.as_str(), result)
        });
        let sweeps = plan.patterns.iter().map(|pattern| async move {
            let result = self
                .retrying("delete_by_pattern", pattern, || {
                    self.gateway.delete_by_pattern(pattern)
                })
                .await;
            (pattern.as_str(), result)
        });
        let (deleted, swept) = futures::join!(join_all(deletes), join_all(sweeps));

        let mut report = InvalidationReport::default();
        let mut failures: Vec<(&str, CacheError)> = Vec::new();
        for (key, result) in deleted {
            match result {
                Ok(()) => report.items_deleted += 1,
                Err(err) => failures.push((key, err)),
            }
        }
        for (pattern, result) in swept {
            match result {
                Ok(removed) => report.keys_swept += removed,
                Err(err) => failures.push((pattern, err)),
            }
        }

        histogram!(METRIC_CACHE_INVALIDATION_MS)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        if failures.is_empty() {
            info!(
                items_deleted = report.items_deleted,
                keys_swept = report.keys_swept,
                "Cache invalidation complete"
            );
            return Ok(report);
        }

        counter!(METRIC_CACHE_INVALIDATION_FAILED_TOTAL).increment(failures.len() as u64);
        for (target, err) in &failures {
            error!(
                target_key = *target,
                error = %err,
                attempts = self.retry.attempts,
                "Cache invalidation step failed, entries may stay stale until their TTL"
            );
        }

        Err(InvalidationError::Incomplete {
            failed: failures.len(),
            total: plan.len(),
            first: failures[0].0.to_string(),
        })
    }

    async fn retrying<T, F, Fut>(
        &self,
        op: &'static str,
        target: &str,
        mut attempt: F,
    ) -> Result<T, CacheError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CacheError>>,
    {
        let attempts = self.retry.attempts.max(1);
        let mut retry = 0;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if retry + 1 < attempts => {
                    let delay = self.retry.delay(retry);
                    warn!(op, target_key = target, retry, ?delay, error = %err, "Retrying cache invalidation step");
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::cache::store::MemoryCache;
    use crate::domain::types::TenantId;

    const MINUTE: Duration = Duration::from_secs(60);

    /// Fails the first `failures` pattern sweeps, then delegates.
    struct Flaky {
        inner: MemoryCache,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl CacheGateway for Flaky {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
            self.inner.set(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.inner.delete(key).await
        }

        async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(CacheError::backend("connection reset"));
            }
            self.inner.delete_by_pattern(pattern).await
        }
    }

    fn flaky(failures: usize) -> Arc<Flaky> {
        Arc::new(Flaky {
            inner: MemoryCache::new(NonZeroUsize::new(32).expect("capacity")),
            failures: AtomicUsize::new(failures),
        })
    }

    fn consumer(gateway: Arc<Flaky>, attempts: u32) -> CacheConsumer {
        CacheConsumer::new(
            gateway,
            DependencyGraph::portfolio(),
            RetryPolicy {
                attempts,
                backoff: Duration::from_millis(10),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let gateway = flaky(2);
        gateway
            .set("blog_post:list:7:{}", "page".into(), MINUTE)
            .await
            .expect("seed");
        gateway
            .set("blog_post:7:1", "item".into(), MINUTE)
            .await
            .expect("seed");

        let report = consumer(gateway.clone(), 3)
            .consume(&[CacheEvent::upserted("blog_post", TenantId::new(7), 1)])
            .await
            .expect("invalidation succeeds after retries");

        assert_eq!(report.items_deleted, 1);
        assert_eq!(report.keys_swept, 1);
        assert!(gateway.inner.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_are_reported() {
        let gateway = flaky(usize::MAX);
        gateway
            .set("work_milestone:2:5", "item".into(), MINUTE)
            .await
            .expect("seed");

        let err = consumer(gateway.clone(), 2)
            .consume(&[CacheEvent::deleted("work_milestone", TenantId::new(2), 5)])
            .await
            .expect_err("sweeps keep failing");

        let InvalidationError::Incomplete { failed, total, .. } = err;
        assert_eq!(failed, 2);
        assert_eq!(total, 3);
        assert!(
            gateway.inner.get("work_milestone:2:5").await.expect("get").is_none(),
            "item delete still applied"
        );
    }
}
