//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use serde_json::json;

use courier::calculator::{Arithmetic, dispatch_table};
use courier::{Params, Request, telemetry};

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum counter values for `name` whose `status` label equals `status`.
fn counter_with_status(snapshot: &SnapshotVec, name: &str, status: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .filter(|(key, _, _, _)| {
            key.key()
                .labels()
                .any(|label| label.key() == "status" && label.value() == status)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

fn add_request(a: i64, b: i64) -> Request {
    let params = json!({"a": a, "b": b}).as_object().cloned().unwrap();
    Request::new("Add", params)
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn successful_request_records_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let table = dispatch_table(Arithmetic);

    let response = metrics::with_local_recorder(&recorder, || table.dispatch(&add_request(2, 3)));
    assert!(!response.is_error());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_with_status(&snapshot, telemetry::REQUESTS_TOTAL, "ok"), 1);
    assert!(
        has_histogram(&snapshot, telemetry::REQUEST_DURATION_SECONDS),
        "expected a duration histogram entry"
    );
}

#[test]
fn failed_request_records_error_status() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let table = dispatch_table(Arithmetic);

    metrics::with_local_recorder(&recorder, || table.dispatch(&add_request(i64::MAX, 1)));

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_with_status(&snapshot, telemetry::REQUESTS_TOTAL, "error"), 1);
    assert_eq!(counter_with_status(&snapshot, telemetry::REQUESTS_TOTAL, "ok"), 0);
}

#[test]
fn unknown_method_records_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let table = dispatch_table(Arithmetic);

    metrics::with_local_recorder(&recorder, || {
        table.dispatch(&Request::new("Divide", Params::new()))
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_with_status(&snapshot, telemetry::REQUESTS_TOTAL, "unknown_method"),
        1
    );
    assert!(!has_histogram(&snapshot, telemetry::REQUEST_DURATION_SECONDS));
}

#[test]
fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let table = dispatch_table(Arithmetic);
    assert!(!table.dispatch(&add_request(1, 1)).is_error());
}
