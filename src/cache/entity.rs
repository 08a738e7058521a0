//! Typed cache-aside access for one entity.
//!
//! Read-side failures never escape: a backend error or an undecodable payload is logged,
//! counted and reported as a miss. A failed store is logged and dropped.

use std::marker::PhantomData;
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::application::pagination::PageEnvelope;
use crate::domain::schema::{Entity, TtlTier};
use crate::domain::types::{RecordId, TenantId};

use super::gateway::{CacheError, CacheGateway, TtlPolicy};
use super::keys;
use super::{METRIC_CACHE_ERROR_TOTAL, METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_MISS_TOTAL};

const KIND_ITEM: &str = "item";
const KIND_LIST: &str = "list";

pub struct EntityCache<E> {
    gateway: Arc<dyn CacheGateway>,
    ttl: TtlPolicy,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityCache<E> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            ttl: self.ttl,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> EntityCache<E> {
    pub fn new(gateway: Arc<dyn CacheGateway>, ttl: TtlPolicy) -> Self {
        Self {
            gateway,
            ttl,
            _entity: PhantomData,
        }
    }

    pub fn namespace(&self) -> &'static str {
        E::SCHEMA.namespace
    }

    pub fn list_key(&self, tenant: TenantId, fingerprint: &str) -> String {
        keys::list_key(self.namespace(), tenant, fingerprint)
    }

    pub async fn get_item(&self, tenant: TenantId, id: RecordId) -> Option<E> {
        let key = keys::item_key(self.namespace(), tenant, id);
        self.read(&key, KIND_ITEM).await
    }

    pub async fn put_item(&self, record: &E) {
        let key = keys::item_key(self.namespace(), record.tenant_id(), record.id());
        self.write(&key, KIND_ITEM, E::SCHEMA.item_ttl, record).await;
    }

    pub async fn get_list(&self, key: &str) -> Option<PageEnvelope<E>> {
        self.read(key, KIND_LIST).await
    }

    pub async fn put_list(&self, key: &str, page: &PageEnvelope<E>) {
        self.write(key, KIND_LIST, E::SCHEMA.list_ttl, page).await;
    }

    async fn read<T: DeserializeOwned>(&self, key: &str, kind: &'static str) -> Option<T> {
        let namespace = self.namespace();
        let decoded = match self.gateway.get(key).await {
            Ok(Some(raw)) => serde_json::from_str::<T>(&raw).map(Some).map_err(CacheError::from),
            Ok(None) => Ok(None),
            Err(err) => Err(err),
        };

        match decoded {
            Ok(Some(value)) => {
                counter!(METRIC_CACHE_HIT_TOTAL, "namespace" => namespace, "kind" => kind)
                    .increment(1);
                debug!(key, "Cache hit");
                Some(value)
            }
            Ok(None) => {
                counter!(METRIC_CACHE_MISS_TOTAL, "namespace" => namespace, "kind" => kind)
                    .increment(1);
                None
            }
            Err(err) => {
                counter!(METRIC_CACHE_ERROR_TOTAL, "namespace" => namespace, "op" => "get")
                    .increment(1);
                counter!(METRIC_CACHE_MISS_TOTAL, "namespace" => namespace, "kind" => kind)
                    .increment(1);
                warn!(key, error = %err, "Cache read failed, falling through to repository");
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, kind: &'static str, tier: TtlTier, value: &T) {
        let namespace = self.namespace();
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                counter!(METRIC_CACHE_ERROR_TOTAL, "namespace" => namespace, "op" => "encode")
                    .increment(1);
                warn!(key, kind, error = %err, "Cache payload could not be encoded");
                return;
            }
        };

        if let Err(err) = self.gateway.set(key, payload, self.ttl.ttl(tier)).await {
            counter!(METRIC_CACHE_ERROR_TOTAL, "namespace" => namespace, "op" => "set")
                .increment(1);
            warn!(key, kind, error = %err, "Cache store failed");
        }
    }
}
