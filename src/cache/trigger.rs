//! Cache trigger service.
//!
//! Write paths call into the trigger after a successful commit. Invalidation runs to
//! completion before the call returns, so the caller acknowledges a write only once the
//! affected keys are gone (or the failure has been reported).

use std::sync::Arc;

use tracing::debug;

use super::consumer::{CacheConsumer, InvalidationError, InvalidationReport};
use super::events::CacheEvent;
use crate::domain::types::{RecordId, TenantId};

pub struct CacheTrigger {
    enabled: bool,
    consumer: Arc<CacheConsumer>,
}

impl CacheTrigger {
    pub fn new(enabled: bool, consumer: Arc<CacheConsumer>) -> Self {
        Self { enabled, consumer }
    }

    /// Invalidate everything affected by `events`.
    pub async fn trigger(
        &self,
        events: &[CacheEvent],
    ) -> Result<InvalidationReport, InvalidationError> {
        if !self.enabled {
            debug!(event_count = events.len(), "Cache trigger skipped: cache disabled");
            return Ok(InvalidationReport::default());
        }

        for event in events {
            debug!(event = %event, "Cache event");
        }
        self.consumer.consume(events).await
    }

    pub async fn created(
        &self,
        namespace: &'static str,
        tenant: TenantId,
        id: RecordId,
    ) -> Result<InvalidationReport, InvalidationError> {
        self.trigger(&[CacheEvent::created(namespace, tenant, id)])
            .await
    }

    pub async fn upserted(
        &self,
        namespace: &'static str,
        tenant: TenantId,
        id: RecordId,
    ) -> Result<InvalidationReport, InvalidationError> {
        self.trigger(&[CacheEvent::upserted(namespace, tenant, id)])
            .await
    }

    pub async fn deleted(
        &self,
        namespace: &'static str,
        tenant: TenantId,
        id: RecordId,
    ) -> Result<InvalidationReport, InvalidationError> {
        self.trigger(&[CacheEvent::deleted(namespace, tenant, id)])
            .await
    }

    /// Operator purge. With an id this evicts one item and its lists, without one it
    /// drops every cached item and list page of the tenant.
    pub async fn purge(
        &self,
        namespace: &'static str,
        tenant: TenantId,
        id: Option<RecordId>,
    ) -> Result<InvalidationReport, InvalidationError> {
        let event = match id {
            Some(id) => CacheEvent::upserted(namespace, tenant, id),
            None => CacheEvent::purged(namespace, tenant),
        };
        self.trigger(&[event]).await
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn consumer(&self) -> &Arc<CacheConsumer> {
        &self.consumer
    }
}
