//! Settings for the folio binary, merged from files, `FOLIO__*` variables and CLI flags.

mod cli;

pub use cli::*;

use std::{
    fmt,
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const ENV_PREFIX: &str = "FOLIO";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_PAGE_LIMIT: u64 = 20;
const DEFAULT_MAX_PAGE_LIMIT: u64 = 100;
const DEFAULT_MEMORY_CAPACITY: u64 = 10_000;
const DEFAULT_TTL_SHORT_SECS: u64 = 60;
const DEFAULT_TTL_MEDIUM_SECS: u64 = 3_600;
const DEFAULT_TTL_LONG_SECS: u64 = 86_400;
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 500;
const DEFAULT_RETRY_ATTEMPTS: u64 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 50;

#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub pagination: PaginationSettings,
    pub cache: CacheSettings,
    pub invalidation: InvalidationSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone, Copy)]
pub struct PaginationSettings {
    pub default_limit: NonZeroU32,
    pub max_limit: NonZeroU32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Redis,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown cache backend `{other}` (expected memory or redis)")),
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Redis => f.write_str("redis"),
        }
    }
}

impl<'de> Deserialize<'de> for CacheBackend {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub backend: CacheBackend,
    pub redis_url: Option<String>,
    pub key_prefix: Option<String>,
    pub memory_capacity: NonZeroUsize,
    pub ttl_short: Duration,
    pub ttl_medium: Duration,
    pub ttl_long: Duration,
    pub coalesce_misses: bool,
    pub operation_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct InvalidationSettings {
    pub retry_attempts: NonZeroU32,
    pub retry_backoff: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not assemble settings: {0}")]
    Build(#[from] config::ConfigError),
    #[error("setting `{key}` rejected: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Later sources win: defaults file, local `folio` file, `--config-file`, environment, flags.
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_cli_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    pagination: RawPaginationSettings,
    cache: RawCacheSettings,
    invalidation: RawInvalidationSettings,
}

impl RawSettings {
    fn apply_cli_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(backend) = overrides.cache_backend.as_ref() {
            self.cache.backend = Some(backend.clone());
        }
        if let Some(url) = overrides.redis_url.as_ref() {
            self.cache.redis_url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            pagination,
            cache,
            invalidation,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let database = build_database_settings(database)?;
        let pagination = build_pagination_settings(pagination)?;
        let cache = build_cache_settings(cache)?;
        let invalidation = build_invalidation_settings(invalidation)?;

        Ok(Self {
            logging,
            database,
            pagination,
            cache,
            invalidation,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("not a level filter: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = non_blank(database.url);
    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_pagination_settings(
    pagination: RawPaginationSettings,
) -> Result<PaginationSettings, LoadError> {
    let default_limit = non_zero_u32(
        pagination.default_limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        "pagination.default_limit",
    )?;
    let max_limit = non_zero_u32(
        pagination.max_limit.unwrap_or(DEFAULT_MAX_PAGE_LIMIT),
        "pagination.max_limit",
    )?;

    if default_limit > max_limit {
        return Err(LoadError::invalid(
            "pagination.default_limit",
            format!("must not exceed pagination.max_limit ({max_limit})"),
        ));
    }

    Ok(PaginationSettings {
        default_limit,
        max_limit,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let backend = match cache.backend {
        Some(value) => value
            .parse::<CacheBackend>()
            .map_err(|reason| LoadError::invalid("cache.backend", reason))?,
        None => CacheBackend::Memory,
    };

    let redis_url = non_blank(cache.redis_url);
    if backend == CacheBackend::Redis && redis_url.is_none() {
        return Err(LoadError::invalid(
            "cache.redis_url",
            "required when cache.backend is redis",
        ));
    }

    let capacity = cache.memory_capacity.unwrap_or(DEFAULT_MEMORY_CAPACITY);
    let memory_capacity = usize::try_from(capacity)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| LoadError::invalid("cache.memory_capacity", "must be positive"))?;

    let ttl_short = seconds(
        cache.ttl_short_seconds.unwrap_or(DEFAULT_TTL_SHORT_SECS),
        "cache.ttl_short_seconds",
    )?;
    let ttl_medium = seconds(
        cache.ttl_medium_seconds.unwrap_or(DEFAULT_TTL_MEDIUM_SECS),
        "cache.ttl_medium_seconds",
    )?;
    let ttl_long = seconds(
        cache.ttl_long_seconds.unwrap_or(DEFAULT_TTL_LONG_SECS),
        "cache.ttl_long_seconds",
    )?;

    let timeout_ms = cache
        .operation_timeout_ms
        .unwrap_or(DEFAULT_OPERATION_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "cache.operation_timeout_ms",
            "must be positive",
        ));
    }

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        backend,
        redis_url,
        key_prefix: non_blank(cache.key_prefix),
        memory_capacity,
        ttl_short,
        ttl_medium,
        ttl_long,
        coalesce_misses: cache.coalesce_misses.unwrap_or(true),
        operation_timeout: Duration::from_millis(timeout_ms),
    })
}

fn build_invalidation_settings(
    invalidation: RawInvalidationSettings,
) -> Result<InvalidationSettings, LoadError> {
    let retry_attempts = non_zero_u32(
        invalidation.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS),
        "invalidation.retry_attempts",
    )?;
    let retry_backoff = Duration::from_millis(
        invalidation
            .retry_backoff_ms
            .unwrap_or(DEFAULT_RETRY_BACKOFF_MS),
    );

    Ok(InvalidationSettings {
        retry_attempts,
        retry_backoff,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPaginationSettings {
    default_limit: Option<u64>,
    max_limit: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    backend: Option<String>,
    redis_url: Option<String>,
    key_prefix: Option<String>,
    memory_capacity: Option<u64>,
    ttl_short_seconds: Option<u64>,
    ttl_medium_seconds: Option<u64>,
    ttl_long_seconds: Option<u64>,
    coalesce_misses: Option<bool>,
    operation_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawInvalidationSettings {
    retry_attempts: Option<u64>,
    retry_backoff_ms: Option<u64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn seconds(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be positive"));
    }
    Ok(Duration::from_secs(value))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be positive"));
    }
    u32::try_from(value)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| LoadError::invalid(key, "does not fit in 32 bits"))
}

/// Parses process arguments and loads settings against them.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
