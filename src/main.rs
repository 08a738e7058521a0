use std::{process, sync::Arc};

use folio::{
    application::{
        content::ContentEndpoint,
        error::AppError,
        query::{PaginationLimits, RawQuery},
        services::{PortfolioServices, ServiceSettings},
    },
    cache::{CacheConfig, CacheGateway, DependencyGraph, MemoryCache, NullCache, RetryPolicy},
    config::{self, CacheBackend, Command, EntityTarget},
    domain::types::TenantId,
    infra::{db::PostgresRepositories, error::InfraError, redis::RedisCache, telemetry},
};
use serde::Serialize;
use serde_json::json;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "Application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "Application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::validation(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let services = build_services(&settings).await?;

    match cli_args.command {
        Command::List(args) => {
            let endpoint = resolve_endpoint(&services, &args.target)?;
            let raw: RawQuery = args.params.into_iter().collect();
            let page = endpoint
                .index_json(TenantId::new(args.target.tenant), &raw)
                .await?;
            print_json(&page)
        }
        Command::Show(args) => {
            let endpoint = resolve_endpoint(&services, &args.target)?;
            let record = endpoint
                .show_json(TenantId::new(args.target.tenant), args.id)
                .await?;
            print_json(&record)
        }
        Command::Invalidate(args) => {
            let endpoint = resolve_endpoint(&services, &args.target)?;
            let report = endpoint
                .invalidate(TenantId::new(args.target.tenant), args.id)
                .await?;
            info!(
                entity = endpoint.namespace(),
                tenant = args.target.tenant,
                items_deleted = report.items_deleted,
                keys_swept = report.keys_swept,
                "Cache invalidated"
            );
            print_json(&json!({
                "entity": endpoint.namespace(),
                "tenant": args.target.tenant,
                "id": args.id,
                "itemsDeleted": report.items_deleted,
                "keysSwept": report.keys_swept,
            }))
        }
        Command::Health => {
            let report = services.health().await;
            print_json(&report)?;
            if report.is_healthy() {
                Ok(())
            } else {
                Err(AppError::unexpected("one or more components are unhealthy"))
            }
        }
    }
}

async fn build_services(settings: &config::Settings) -> Result<PortfolioServices, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool =
        PostgresRepositories::connect_lazy(database_url, settings.database.max_connections.get())
            .map_err(|err| AppError::from(InfraError::from(err)))?;
    let repositories = Arc::new(PostgresRepositories::new(pool));

    let cache = CacheConfig::from(&settings.cache);
    let gateway = init_gateway(&cache).await?;

    let service_settings = ServiceSettings {
        cache,
        retry: RetryPolicy::from(&settings.invalidation),
        limits: PaginationLimits::new(
            settings.pagination.default_limit.get(),
            settings.pagination.max_limit.get(),
        ),
        graph: DependencyGraph::portfolio(),
    };

    Ok(PortfolioServices::build(
        repositories,
        gateway,
        service_settings,
    ))
}

async fn init_gateway(cache: &CacheConfig) -> Result<Arc<dyn CacheGateway>, AppError> {
    if !cache.enabled {
        return Ok(Arc::new(NullCache));
    }

    match cache.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCache::new(
            cache.memory_capacity_non_zero(),
        ))),
        CacheBackend::Redis => {
            let redis = RedisCache::from_config(cache).await?;
            Ok(Arc::new(redis))
        }
    }
}

fn resolve_endpoint(
    services: &PortfolioServices,
    target: &EntityTarget,
) -> Result<Arc<dyn ContentEndpoint>, AppError> {
    services.endpoint(&target.entity).ok_or_else(|| {
        let known = services.namespaces().collect::<Vec<_>>().join(", ");
        AppError::validation(format!(
            "unknown entity `{}` (expected one of: {known})",
            target.entity
        ))
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
