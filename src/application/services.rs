//! Service wiring for the portfolio entities.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::application::content::{ContentEndpoint, ContentService};
use crate::application::paginator::Paginator;
use crate::application::query::{FilterNormalizer, PaginationLimits};
use crate::application::repos::{EntityRepository, HealthRepo};
use crate::cache::{
    CacheConfig, CacheConsumer, CacheGateway, CacheTrigger, DependencyGraph, EntityCache,
    NullCache, RetryPolicy, TtlPolicy,
};
use crate::domain::entities::{
    BlogPost, MusicTrack, PortfolioConfig, Project, Technology, Testimonial, WorkExperience,
    WorkMilestone,
};
use crate::domain::schema::Entity;

/// Runtime knobs shared by every content service.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub cache: CacheConfig,
    pub retry: RetryPolicy,
    pub limits: PaginationLimits,
    pub graph: DependencyGraph,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            retry: RetryPolicy::default(),
            limits: PaginationLimits::default(),
            graph: DependencyGraph::portfolio(),
        }
    }
}

/// Repository capable of serving every portfolio entity.
pub trait PortfolioRepository:
    EntityRepository<BlogPost>
    + EntityRepository<Project>
    + EntityRepository<MusicTrack>
    + EntityRepository<Technology>
    + EntityRepository<Testimonial>
    + EntityRepository<WorkExperience>
    + EntityRepository<WorkMilestone>
    + EntityRepository<PortfolioConfig>
    + HealthRepo
    + 'static
{
}

impl<T> PortfolioRepository for T where
    T: EntityRepository<BlogPost>
        + EntityRepository<Project>
        + EntityRepository<MusicTrack>
        + EntityRepository<Technology>
        + EntityRepository<Testimonial>
        + EntityRepository<WorkExperience>
        + EntityRepository<WorkMilestone>
        + EntityRepository<PortfolioConfig>
        + HealthRepo
        + 'static
{
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ComponentHealth {
    Ok,
    Disabled,
    Failed(String),
}

impl ComponentHealth {
    pub fn is_ok(&self) -> bool {
        !matches!(self, ComponentHealth::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub database: ComponentHealth,
    pub cache: ComponentHealth,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.database.is_ok() && self.cache.is_ok()
    }
}

pub struct PortfolioServices {
    pub blog_posts: Arc<ContentService<BlogPost>>,
    pub projects: Arc<ContentService<Project>>,
    pub music_tracks: Arc<ContentService<MusicTrack>>,
    pub technologies: Arc<ContentService<Technology>>,
    pub testimonials: Arc<ContentService<Testimonial>>,
    pub work_experiences: Arc<ContentService<WorkExperience>>,
    pub work_milestones: Arc<ContentService<WorkMilestone>>,
    pub portfolio_configs: Arc<ContentService<PortfolioConfig>>,
    endpoints: BTreeMap<&'static str, Arc<dyn ContentEndpoint>>,
    gateway: Arc<dyn CacheGateway>,
    health_repo: Arc<dyn HealthRepo>,
    cache_enabled: bool,
}

struct Shared {
    gateway: Arc<dyn CacheGateway>,
    ttl: TtlPolicy,
    paginator: Arc<Paginator>,
    normalizer: FilterNormalizer,
    trigger: Arc<CacheTrigger>,
}

impl Shared {
    fn service<E, R>(&self, repo: &Arc<R>) -> Arc<ContentService<E>>
    where
        E: Entity,
        R: EntityRepository<E> + 'static,
    {
        let repo: Arc<dyn EntityRepository<E>> = repo.clone();
        Arc::new(ContentService::new(
            repo,
            EntityCache::new(self.gateway.clone(), self.ttl),
            self.paginator.clone(),
            self.normalizer,
            self.trigger.clone(),
        ))
    }
}

impl PortfolioServices {
    /// Wire every content service over one repository and one cache gateway. A disabled
    /// cache swaps the gateway for a [`NullCache`].
    pub fn build<R: PortfolioRepository>(
        repo: Arc<R>,
        gateway: Arc<dyn CacheGateway>,
        settings: ServiceSettings,
    ) -> Self {
        let cache_enabled = settings.cache.enabled;
        let gateway: Arc<dyn CacheGateway> = if cache_enabled {
            gateway
        } else {
            Arc::new(NullCache)
        };

        let consumer = CacheConsumer::new(gateway.clone(), settings.graph, settings.retry);
        let shared = Shared {
            gateway: gateway.clone(),
            ttl: settings.cache.ttl,
            paginator: Arc::new(Paginator::new(settings.cache.coalescing())),
            normalizer: FilterNormalizer::new(settings.limits),
            trigger: Arc::new(CacheTrigger::new(cache_enabled, Arc::new(consumer))),
        };

        let blog_posts = shared.service::<BlogPost, R>(&repo);
        let projects = shared.service::<Project, R>(&repo);
        let music_tracks = shared.service::<MusicTrack, R>(&repo);
        let technologies = shared.service::<Technology, R>(&repo);
        let testimonials = shared.service::<Testimonial, R>(&repo);
        let work_experiences = shared.service::<WorkExperience, R>(&repo);
        let work_milestones = shared.service::<WorkMilestone, R>(&repo);
        let portfolio_configs = shared.service::<PortfolioConfig, R>(&repo);

        let endpoints: [Arc<dyn ContentEndpoint>; 8] = [
            blog_posts.clone(),
            projects.clone(),
            music_tracks.clone(),
            technologies.clone(),
            testimonials.clone(),
            work_experiences.clone(),
            work_milestones.clone(),
            portfolio_configs.clone(),
        ];
        let endpoints = endpoints
            .into_iter()
            .map(|endpoint| (endpoint.namespace(), endpoint))
            .collect();

        let health_repo: Arc<dyn HealthRepo> = repo;

        Self {
            blog_posts,
            projects,
            music_tracks,
            technologies,
            testimonials,
            work_experiences,
            work_milestones,
            portfolio_configs,
            endpoints,
            gateway,
            health_repo,
            cache_enabled,
        }
    }

    pub fn endpoint(&self, namespace: &str) -> Option<Arc<dyn ContentEndpoint>> {
        self.endpoints.get(namespace).cloned()
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.endpoints.keys().copied()
    }

    pub async fn health(&self) -> HealthReport {
        let database = match self.health_repo.ping().await {
            Ok(()) => ComponentHealth::Ok,
            Err(err) => {
                warn!(error = %err, "Database health check failed");
                ComponentHealth::Failed(err.to_string())
            }
        };

        let cache = if !self.cache_enabled {
            ComponentHealth::Disabled
        } else {
            match self.gateway.health_check().await {
                Ok(()) => ComponentHealth::Ok,
                Err(err) => {
                    warn!(error = %err, "Cache health check failed");
                    ComponentHealth::Failed(err.to_string())
                }
            }
        };

        HealthReport { database, cache }
    }
}
