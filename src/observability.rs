use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

// ── Domain activity ─────────────────────────────────────────────

/// Counter: effective room status transitions. Labels: from, to.
pub const ROOM_TRANSITIONS_TOTAL: &str = "frontdesk_room_transitions_total";

/// Counter: reservation writes rejected for overlapping a confirmed stay.
pub const RESERVATION_CONFLICTS_TOTAL: &str = "frontdesk_reservation_conflicts_total";

/// Counter: reservations accepted with more guests than the room holds.
pub const CAPACITY_WARNINGS_TOTAL: &str = "frontdesk_capacity_warnings_total";

/// Counter: events published on the bus. Labels: topic.
pub const EVENTS_PUBLISHED_TOTAL: &str = "frontdesk_events_published_total";

// ── Occupancy tracker ───────────────────────────────────────────

/// Gauge: occupied rooms as a percentage of all rooms.
pub const OCCUPANCY_RATE: &str = "frontdesk_occupancy_rate";

/// Counter: refreshes that failed or timed out.
pub const REFRESH_FAILURES_TOTAL: &str = "frontdesk_refresh_failures_total";

/// Histogram: occupancy refresh duration in seconds.
pub const REFRESH_DURATION_SECONDS: &str = "frontdesk_refresh_duration_seconds";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
