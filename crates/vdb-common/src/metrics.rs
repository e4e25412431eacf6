//! Observability: `tracing` subscriber init plus process metrics recorded
//! through the `metrics` facade and exported as Prometheus text, mirroring
//! `lumadb-common::metrics`'s pattern of named wrapper functions around
//! `metrics::counter!`/`gauge!` rather than hand-rolled counters.

use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::Settings;

static RECORDER: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the global `tracing` subscriber from [`Settings`].
///
/// Safe to call more than once per process (e.g. in tests); subsequent
/// calls are no-ops because `tracing_subscriber::fmt().try_init()` fails
/// quietly if a subscriber is already set.
pub fn init_tracing(settings: &Settings) {
    let filter = tracing_subscriber::EnvFilter::try_new(&settings.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if settings.log_format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if result.is_err() {
        tracing::trace!("tracing subscriber already initialized");
    }
}

/// Install the global Prometheus recorder every `metrics::counter!` call in
/// `vdb-core`/`vdb-api` writes through, and return the handle `GET /metrics`
/// renders from. Safe to call more than once per process (e.g. each test
/// builds its own `AppState`): only the first call installs a recorder, the
/// rest return a clone of the handle it produced.
pub fn install_recorder() -> PrometheusHandle {
    RECORDER
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("install global metrics recorder")
        })
        .clone()
}

/// Record that a library's index build started.
pub fn record_index_build_started() {
    metrics::counter!("vdb_index_builds_started_total").increment(1);
}

/// Record that a library's index build finished.
pub fn record_index_build_completed() {
    metrics::counter!("vdb_index_builds_completed_total").increment(1);
}

/// Record a served `kNN` query, labeled by whether the index it hit was stale.
pub fn record_query_served(stale: bool) {
    metrics::counter!("vdb_queries_served_total", "stale" => stale.to_string()).increment(1);
}
