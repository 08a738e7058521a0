use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the Folio binary.
#[derive(Debug, Parser)]
#[command(
    name = "folio",
    version,
    about = "Folio portfolio content pagination and cache operator"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "FOLIO_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print one page of an entity listing as JSON.
    List(ListArgs),
    /// Print a single record as JSON.
    Show(ShowArgs),
    /// Drop cached items and list pages for a tenant.
    Invalidate(InvalidateArgs),
    /// Check database and cache connectivity.
    Health,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the cache backend (memory|redis).
    #[arg(long = "cache-backend", value_name = "BACKEND", global = true)]
    pub cache_backend: Option<String>,

    /// Override the redis connection URL.
    #[arg(long = "redis-url", value_name = "URL", global = true)]
    pub redis_url: Option<String>,
}

/// Entity namespace and tenant every content command targets.
#[derive(Debug, Args, Clone)]
pub struct EntityTarget {
    /// Entity namespace, e.g. `blog_post` or `work_milestone`.
    #[arg(long, value_name = "NAMESPACE")]
    pub entity: String,

    /// Tenant whose rows and cache keys are addressed.
    #[arg(long, value_name = "ID")]
    pub tenant: i64,
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub target: EntityTarget,

    /// List parameter such as `limit=10`, `cursor=42` or `sortBy=title`; repeatable.
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub target: EntityTarget,

    #[arg(long, value_name = "ID")]
    pub id: i64,
}

#[derive(Debug, Args, Clone)]
pub struct InvalidateArgs {
    #[command(flatten)]
    pub target: EntityTarget,

    /// Evict one item and its lists; without it every cached key of the tenant is dropped.
    #[arg(long, value_name = "ID")]
    pub id: Option<i64>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("parameter name is empty in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}
