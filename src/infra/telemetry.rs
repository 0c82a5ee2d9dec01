use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::{dispatch::METRIC_SWEEP_MS, render::METRIC_SNIPPET_FAULT_TOTAL};
use crate::cache::{METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_INVALIDATE_TOTAL, METRIC_CACHE_MISS_TOTAL};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

pub mod capture;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
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
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register metric descriptions with whatever recorder is installed. Runs once.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT_TOTAL,
            Unit::Count,
            "Sweeps served from the active-snippet cache."
        );
        describe_counter!(
            METRIC_CACHE_MISS_TOTAL,
            Unit::Count,
            "Sweeps that had to read the snippet store."
        );
        describe_counter!(
            METRIC_CACHE_INVALIDATE_TOTAL,
            Unit::Count,
            "Explicit active-snippet cache invalidations."
        );
        describe_counter!(
            METRIC_SNIPPET_FAULT_TOTAL,
            Unit::Count,
            "Code snippets whose execution faulted."
        );
        describe_histogram!(
            METRIC_SWEEP_MS,
            Unit::Milliseconds,
            "Dispatch sweep latency in milliseconds."
        );
    });
}
