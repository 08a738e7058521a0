//! Generic content service.
//!
//! One instance per entity type. Reads go through the entity cache, writes go to the
//! repository and then through the cache trigger before they are acknowledged.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{instrument, warn};

use crate::application::error::AppError;
use crate::application::pagination::PageEnvelope;
use crate::application::paginator::Paginator;
use crate::application::query::{FilterNormalizer, QueryDescriptor, RawQuery};
use crate::application::repos::{Changeset, EntityRepository, RepoError};
use crate::cache::{CacheTrigger, EntityCache, InvalidationError, InvalidationReport};
use crate::domain::error::DomainError;
use crate::domain::schema::Entity;
use crate::domain::types::{RecordId, TenantId};

pub struct ContentService<E: Entity> {
    repo: Arc<dyn EntityRepository<E>>,
    cache: EntityCache<E>,
    paginator: Arc<Paginator>,
    normalizer: FilterNormalizer,
    trigger: Arc<CacheTrigger>,
}

impl<E: Entity> ContentService<E> {
    pub fn new(
        repo: Arc<dyn EntityRepository<E>>,
        cache: EntityCache<E>,
        paginator: Arc<Paginator>,
        normalizer: FilterNormalizer,
        trigger: Arc<CacheTrigger>,
    ) -> Self {
        Self {
            repo,
            cache,
            paginator,
            normalizer,
            trigger,
        }
    }

    pub fn namespace(&self) -> &'static str {
        E::SCHEMA.namespace
    }

    pub fn normalize(&self, tenant: TenantId, raw: &RawQuery) -> QueryDescriptor {
        self.normalizer.normalize(E::SCHEMA, tenant, raw)
    }

    /// List one page for `tenant` from raw request parameters.
    pub async fn index(
        &self,
        tenant: TenantId,
        raw: &RawQuery,
    ) -> Result<PageEnvelope<E>, AppError> {
        let descriptor = self.normalize(tenant, raw);
        self.list(&descriptor).await
    }

    pub async fn list(&self, descriptor: &QueryDescriptor) -> Result<PageEnvelope<E>, AppError> {
        let repo = &self.repo;
        self.paginator
            .paginate(&self.cache, descriptor, move |request| async move {
                if request.window.needs_count() {
                    let (rows, total) =
                        tokio::try_join!(repo.fetch_rows(&request), repo.count_rows(&request))?;
                    Ok::<_, RepoError>((rows, Some(total)))
                } else {
                    Ok((repo.fetch_rows(&request).await?, None))
                }
            })
            .await
            .map_err(AppError::from)
    }

    #[instrument(skip(self), fields(namespace = E::SCHEMA.namespace))]
    pub async fn show(&self, tenant: TenantId, id: RecordId) -> Result<E, AppError> {
        if let Some(record) = self.cache.get_item(tenant, id).await {
            return Ok(record);
        }

        let record = self
            .repo
            .find_by_id(tenant, id)
            .await?
            .ok_or_else(|| DomainError::not_found(E::SCHEMA.namespace, tenant, id))?;
        self.cache.put_item(&record).await;
        Ok(record)
    }

    #[instrument(skip(self, changeset), fields(namespace = E::SCHEMA.namespace))]
    pub async fn store(&self, tenant: TenantId, changeset: &Changeset) -> Result<E, AppError> {
        self.check_changeset(changeset)?;
        let record = self.repo.insert(tenant, changeset).await?;
        let outcome = self
            .trigger
            .created(E::SCHEMA.namespace, tenant, record.id())
            .await;
        self.report_invalidation(tenant, record.id(), outcome);
        Ok(record)
    }

    #[instrument(skip(self, changeset), fields(namespace = E::SCHEMA.namespace))]
    pub async fn update(
        &self,
        tenant: TenantId,
        id: RecordId,
        changeset: &Changeset,
    ) -> Result<E, AppError> {
        self.check_changeset(changeset)?;
        if changeset.is_empty() {
            return Err(AppError::from(DomainError::validation(
                "update requires at least one column",
            )));
        }
        self.ensure_exists(tenant, id).await?;

        let record = self
            .repo
            .update(tenant, id, changeset)
            .await?
            .ok_or_else(|| DomainError::not_found(E::SCHEMA.namespace, tenant, id))?;
        let outcome = self.trigger.upserted(E::SCHEMA.namespace, tenant, id).await;
        self.report_invalidation(tenant, id, outcome);
        Ok(record)
    }

    #[instrument(skip(self), fields(namespace = E::SCHEMA.namespace))]
    pub async fn destroy(&self, tenant: TenantId, id: RecordId) -> Result<E, AppError> {
        self.ensure_exists(tenant, id).await?;

        let record = self
            .repo
            .delete(tenant, id)
            .await?
            .ok_or_else(|| DomainError::not_found(E::SCHEMA.namespace, tenant, id))?;
        let outcome = self.trigger.deleted(E::SCHEMA.namespace, tenant, id).await;
        self.report_invalidation(tenant, id, outcome);
        Ok(record)
    }

    /// Operator purge of cached state, bypassing any write.
    pub async fn purge(
        &self,
        tenant: TenantId,
        id: Option<RecordId>,
    ) -> Result<InvalidationReport, AppError> {
        Ok(self.trigger.purge(E::SCHEMA.namespace, tenant, id).await?)
    }

    async fn ensure_exists(&self, tenant: TenantId, id: RecordId) -> Result<(), AppError> {
        match self.repo.find_by_id(tenant, id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found(E::SCHEMA.namespace, tenant, id).into()),
        }
    }

    fn check_changeset(&self, changeset: &Changeset) -> Result<(), AppError> {
        if changeset.namespace() != E::SCHEMA.namespace {
            return Err(AppError::from(DomainError::invariant(format!(
                "`{}` changeset applied to `{}`",
                changeset.namespace(),
                E::SCHEMA.namespace
            ))));
        }
        Ok(())
    }

    /// The write is committed either way; a failed invalidation is reported, never rolled back.
    fn report_invalidation(
        &self,
        tenant: TenantId,
        id: RecordId,
        outcome: Result<InvalidationReport, InvalidationError>,
    ) {
        if let Err(err) = outcome {
            warn!(
                namespace = E::SCHEMA.namespace,
                %tenant,
                id,
                error = %err,
                "Write committed but cached pages may be stale"
            );
        }
    }
}

/// Namespace-erased view of a content service, used where the entity is chosen at runtime.
#[async_trait]
pub trait ContentEndpoint: Send + Sync {
    fn namespace(&self) -> &'static str;

    async fn index_json(&self, tenant: TenantId, raw: &RawQuery) -> Result<Value, AppError>;

    async fn show_json(&self, tenant: TenantId, id: RecordId) -> Result<Value, AppError>;

    async fn invalidate(
        &self,
        tenant: TenantId,
        id: Option<RecordId>,
    ) -> Result<InvalidationReport, AppError>;
}

#[async_trait]
impl<E: Entity> ContentEndpoint for ContentService<E> {
    fn namespace(&self) -> &'static str {
        E::SCHEMA.namespace
    }

    async fn index_json(&self, tenant: TenantId, raw: &RawQuery) -> Result<Value, AppError> {
        let page = self.index(tenant, raw).await?;
        serde_json::to_value(page).map_err(|err| AppError::unexpected(err.to_string()))
    }

    async fn show_json(&self, tenant: TenantId, id: RecordId) -> Result<Value, AppError> {
        let record = self.show(tenant, id).await?;
        serde_json::to_value(record).map_err(|err| AppError::unexpected(err.to_string()))
    }

    async fn invalidate(
        &self,
        tenant: TenantId,
        id: Option<RecordId>,
    ) -> Result<InvalidationReport, AppError> {
        self.purge(tenant, id).await
    }
}
