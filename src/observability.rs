use std::net::SocketAddr;

// ── Projection ──────────────────────────────────────────────────

/// Counter: court-day projections computed.
pub const PROJECTIONS_TOTAL: &str = "courtgrid_projections_total";

/// Histogram: time to project one court-day, in seconds.
pub const PROJECTION_DURATION_SECONDS: &str = "courtgrid_projection_duration_seconds";

// ── Loading ─────────────────────────────────────────────────────

/// Counter: snapshot loads. Labels: status (ok, error, superseded).
pub const LOADS_TOTAL: &str = "courtgrid_loads_total";

/// Histogram: load latency in seconds, including superseded loads.
pub const LOAD_DURATION_SECONDS: &str = "courtgrid_load_duration_seconds";

/// Counter: backend rows dropped while building a snapshot.
pub const EVENTS_REJECTED_TOTAL: &str = "courtgrid_events_rejected_total";

/// Gauge: facility loaders alive.
pub const LOADERS_ACTIVE: &str = "courtgrid_loaders_active";

// ── Optimistic updates ──────────────────────────────────────────

/// Counter: pending-buffer transitions. Labels: kind, outcome.
pub const MUTATIONS_TOTAL: &str = "courtgrid_mutations_total";

/// Gauge: mutations staged but not yet committed or rolled back.
pub const PENDING_MUTATIONS: &str = "courtgrid_pending_mutations";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics"),
        Err(e) => tracing::error!("failed to install Prometheus metrics exporter: {e}"),
    }
}
