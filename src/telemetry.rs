//! Telemetry metric name constants.
//!
//! Centralised metric names for courier operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `courier_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `method`: wire method name, or "unknown" for unregistered methods
//! - `status`: outcome: "ok", "error" or "unknown_method"
//! - `reason`: shutdown trigger: "terminated" or "load_balancer_down"

/// Total connections accepted by the listener.
pub const CONNECTIONS_TOTAL: &str = "courier_connections_total";

/// Connections currently being served (gauge).
pub const CONNECTIONS_ACTIVE: &str = "courier_connections_active";

/// Total requests dispatched.
///
/// Labels: `method`, `status`.
pub const REQUESTS_TOTAL: &str = "courier_requests_total";

/// Handler duration in seconds.
///
/// Labels: `method`.
pub const REQUEST_DURATION_SECONDS: &str = "courier_request_duration_seconds";

/// Total liveness reports sent to the load balancer.
///
/// Labels: `status` ("ok" | "error").
pub const HEARTBEATS_TOTAL: &str = "courier_heartbeats_total";

/// Total shutdowns started.
///
/// Labels: `reason`.
pub const SHUTDOWNS_TOTAL: &str = "courier_shutdowns_total";
