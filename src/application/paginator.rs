//! Cache-aside list pagination.
//!
//! Every list operation funnels through [`Paginator::paginate`]: clean queries are looked up
//! in the cache first, misses plan a [`ListRequest`] and hand it to the caller's fetch
//! callback, and the shaped envelope is stored under the entity's list TTL. Concurrent misses
//! on one key share the first caller's fetch and its result, including its error.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, instrument, warn};

use crate::application::pagination::{ListRequest, PageEnvelope, shape_page};
use crate::application::query::QueryDescriptor;
use crate::application::repos::RepoError;
use crate::cache::{
    EntityCache, InFlight, METRIC_CACHE_COALESCED_TOTAL, METRIC_PAGINATE_MS,
};
use crate::domain::schema::Entity;

/// Rows of one page plus the exact total when the window asked for one.
pub type FetchedPage<E> = (Vec<E>, Option<u64>);

/// A fetched envelope shared between the callers of one flight. List keys embed the entity
/// namespace, so every caller of a key expects the same concrete envelope type.
type SharedPage = Result<Arc<dyn Any + Send + Sync>, RepoError>;

const OUTCOME_HIT: &str = "hit";
const OUTCOME_MISS: &str = "miss";
const OUTCOME_COALESCED: &str = "coalesced";
const OUTCOME_UNCACHED: &str = "uncached";
const OUTCOME_ERROR: &str = "error";

#[derive(Default)]
pub struct Paginator {
    coalesce: bool,
    flights: InFlight<SharedPage>,
}

impl Paginator {
    pub fn new(coalesce: bool) -> Self {
        Self {
            coalesce,
            flights: InFlight::new(),
        }
    }

    pub fn coalescing(&self) -> bool {
        self.coalesce
    }

    /// Keys with a fetch in progress.
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }

    #[instrument(
        skip_all,
        fields(
            namespace = E::SCHEMA.namespace,
            tenant = %descriptor.tenant,
            clean = descriptor.is_clean(),
        )
    )]
    pub async fn paginate<E, F, Fut>(
        &self,
        cache: &EntityCache<E>,
        descriptor: &QueryDescriptor,
        fetch: F,
    ) -> Result<PageEnvelope<E>, RepoError>
    where
        E: Entity,
        F: FnOnce(ListRequest) -> Fut,
        Fut: Future<Output = Result<FetchedPage<E>, RepoError>>,
    {
        let started_at = Instant::now();
        let (outcome, result) = self.resolve(cache, descriptor, fetch).await;
        histogram!(
            METRIC_PAGINATE_MS,
            "namespace" => E::SCHEMA.namespace,
            "outcome" => outcome
        )
        .record(started_at.elapsed().as_secs_f64() * 1000.0);
        result
    }

    async fn resolve<E, F, Fut>(
        &self,
        cache: &EntityCache<E>,
        descriptor: &QueryDescriptor,
        fetch: F,
    ) -> (&'static str, Result<PageEnvelope<E>, RepoError>)
    where
        E: Entity,
        F: FnOnce(ListRequest) -> Fut,
        Fut: Future<Output = Result<FetchedPage<E>, RepoError>>,
    {
        let request = ListRequest::plan(E::SCHEMA, descriptor);

        if !descriptor.is_clean() {
            return match fetch_page(request, fetch).await {
                Ok(page) => (OUTCOME_UNCACHED, Ok(page)),
                Err(err) => (OUTCOME_ERROR, Err(err)),
            };
        }

        let key = match descriptor.fingerprint(E::SCHEMA) {
            Ok(fingerprint) => cache.list_key(descriptor.tenant, &fingerprint),
            Err(err) => {
                warn!(error = %err, "List descriptor could not be fingerprinted, skipping cache");
                return match fetch_page(request, fetch).await {
                    Ok(page) => (OUTCOME_UNCACHED, Ok(page)),
                    Err(err) => (OUTCOME_ERROR, Err(err)),
                };
            }
        };

        if let Some(page) = cache.get_list(&key).await {
            return (OUTCOME_HIT, Ok(page));
        }

        if !self.coalesce {
            return match fetch_and_store(cache, &key, request, fetch).await {
                Ok(page) => (OUTCOME_MISS, Ok(page)),
                Err(err) => (OUTCOME_ERROR, Err(err)),
            };
        }

        let landed = self
            .flights
            .run(&key, || async {
                let page = fetch_and_store(cache, &key, request, fetch).await?;
                Ok(Arc::new(page) as Arc<dyn Any + Send + Sync>)
            })
            .await;

        if !landed.led {
            counter!(METRIC_CACHE_COALESCED_TOTAL, "namespace" => E::SCHEMA.namespace)
                .increment(1);
            debug!(key, "Served by a concurrent fetch");
        }

        let page = landed.value.and_then(|shared| {
            shared
                .downcast_ref::<PageEnvelope<E>>()
                .cloned()
                .ok_or_else(|| RepoError::Integrity {
                    message: format!("list key `{key}` is shared by another entity type"),
                })
        });

        match (page, landed.led) {
            (Ok(page), true) => (OUTCOME_MISS, Ok(page)),
            (Ok(page), false) => (OUTCOME_COALESCED, Ok(page)),
            (Err(err), _) => (OUTCOME_ERROR, Err(err)),
        }
    }
}

async fn fetch_and_store<E, F, Fut>(
    cache: &EntityCache<E>,
    key: &str,
    request: ListRequest,
    fetch: F,
) -> Result<PageEnvelope<E>, RepoError>
where
    E: Entity,
    F: FnOnce(ListRequest) -> Fut,
    Fut: Future<Output = Result<FetchedPage<E>, RepoError>>,
{
    let page = fetch_page(request, fetch).await?;
    cache.put_list(key, &page).await;
    Ok(page)
}

async fn fetch_page<E, F, Fut>(request: ListRequest, fetch: F) -> Result<PageEnvelope<E>, RepoError>
where
    E: Entity,
    F: FnOnce(ListRequest) -> Fut,
    Fut: Future<Output = Result<FetchedPage<E>, RepoError>>,
{
    let (rows, total) = fetch(request.clone()).await?;
    Ok(shape_page(&request, rows, total))
}
