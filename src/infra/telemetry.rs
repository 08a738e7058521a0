use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{
    METRIC_CACHE_COALESCED_TOTAL, METRIC_CACHE_ERROR_TOTAL, METRIC_CACHE_HIT_TOTAL,
    METRIC_CACHE_INVALIDATION_FAILED_TOTAL, METRIC_CACHE_INVALIDATION_MS, METRIC_CACHE_MISS_TOTAL,
    METRIC_PAGINATE_MS,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Installs the process-wide subscriber. Logs go to stderr so stdout stays pure JSON output.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("subscriber already set or rejected: {err}"))
        })
}

/// Registers units and help text for every folio metric. Safe to call more than once.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT_TOTAL,
            Unit::Count,
            "Total number of cache hits, labelled by namespace and kind."
        );
        describe_counter!(
            METRIC_CACHE_MISS_TOTAL,
            Unit::Count,
            "Total number of cache misses, including reads degraded by backend errors."
        );
        describe_counter!(
            METRIC_CACHE_ERROR_TOTAL,
            Unit::Count,
            "Total number of failed cache gateway operations on the read path."
        );
        describe_counter!(
            METRIC_CACHE_COALESCED_TOTAL,
            Unit::Count,
            "Total number of list misses served by a concurrent in-flight fetch."
        );
        describe_counter!(
            METRIC_CACHE_INVALIDATION_FAILED_TOTAL,
            Unit::Count,
            "Total number of invalidation steps that failed after all retries."
        );
        describe_histogram!(
            METRIC_CACHE_INVALIDATION_MS,
            Unit::Milliseconds,
            "Invalidation plan execution latency in milliseconds."
        );
        describe_histogram!(
            METRIC_PAGINATE_MS,
            Unit::Milliseconds,
            "List pagination latency in milliseconds, labelled by outcome."
        );
    });
}
