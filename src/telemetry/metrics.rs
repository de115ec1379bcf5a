//! Metric instrument factories for hon-rs.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"hon-rs"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for hon-rs instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("hon-rs")
}

/// Counter: goals created (deadline scheduled).
pub fn goals_created() -> Counter<u64> {
    meter()
        .u64_counter("hon.goal.created")
        .with_description("Number of goals created")
        .build()
}

/// Counter: resolution attempts.
/// Labels: `outcome` ("finished" | "expired"), `result` ("resolved" | "already_resolved").
pub fn goal_resolutions() -> Counter<u64> {
    meter()
        .u64_counter("hon.goal.resolutions")
        .with_description("Number of goal resolution attempts")
        .build()
}

/// Counter: progress records written.
/// Labels: `book_completed`.
pub fn progress_recorded() -> Counter<u64> {
    meter()
        .u64_counter("hon.progress.recorded")
        .with_description("Number of progress records written")
        .build()
}

/// Counter: queue-level operations (create, send, read, archive).
/// Labels: `queue`, `operation`.
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("hon.queue.operations")
        .with_description("Number of queue operations")
        .build()
}

/// Counter: notification attempts.
/// Labels: `kind` ("goal-finished" | "goal-expired"), `result` ("sent" | "error").
pub fn notifications() -> Counter<u64> {
    meter()
        .u64_counter("hon.notifications")
        .with_description("Number of goal notification attempts")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("hon.operation.duration_ms")
        .with_description("Operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
