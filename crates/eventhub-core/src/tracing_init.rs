//! Shared tracing/logging initialisation.
//!
//! Sets up `tracing_subscriber` with an env-filter, optional JSON output,
//! and (with the `metrics` feature) an `OpenTelemetry` span exporter.

use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

fn env_filter(default_filter: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    )
}

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- default `RUST_LOG` value when the env-var is not set
///   (e.g. `"eventhub_server=info"`).
/// * `log_json` -- when `true`, emit structured JSON log lines instead of the
///   human-readable format.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let fmt_layer = if log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter(default_filter))
        .init();
}

/// Initialise tracing and, when `endpoint` is set, the OTLP pipeline.
///
/// Falls back to plain logging (with a warning) if the exporter cannot be
/// built, so a collector outage never prevents the server from starting.
/// The returned guard must be held until [`shutdown_tracing`] is called.
#[cfg(feature = "metrics")]
pub fn init_tracing_with_metrics(
    default_filter: &str,
    log_json: bool,
    endpoint: Option<&str>,
) -> Option<crate::metrics::MetricsGuard> {
    let Some(endpoint) = endpoint else {
        init_tracing(default_filter, log_json);
        return None;
    };

    let guard = match crate::metrics::init_metrics(endpoint) {
        Ok(guard) => guard,
        Err(e) => {
            init_tracing(default_filter, log_json);
            tracing::warn!(error = %e, endpoint, "OTLP pipeline unavailable, metrics disabled");
            return None;
        }
    };

    let fmt_layer = if log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter(default_filter))
        .with(tracing_opentelemetry::layer().with_tracer(guard.tracer()))
        .init();

    tracing::info!(endpoint, "OTLP metrics and traces enabled");
    Some(guard)
}

/// Flush and stop the OTLP pipeline, if one was started.
///
/// Buffered spans and metric points are exported before this returns.
#[cfg(feature = "metrics")]
pub fn shutdown_tracing(
    guard: Option<crate::metrics::MetricsGuard>,
) -> Result<(), crate::metrics::MetricsError> {
    guard.map_or(Ok(()), crate::metrics::MetricsGuard::shutdown)
}
