//! Span helpers for queue consumption.

use tracing::Span;

/// Start a span covering the handling of one queue message.
///
/// `goal.id` is declared empty and filled once the payload is decoded.
pub fn start_message_span(queue: &str, msg_id: i64, read_ct: i32) -> Span {
    tracing::info_span!(
        "queue.consume",
        "queue.name" = queue,
        "queue.msg_id" = msg_id,
        "queue.read_ct" = read_ct,
        "goal.id" = tracing::field::Empty,
    )
}

/// Record a goal resolution attempt on the given span.
pub fn record_resolution(span: &Span, goal_id: &str, outcome: &str, resolved: bool) {
    span.record("goal.id", goal_id);
    span.in_scope(|| {
        tracing::info!(outcome, resolved, "goal_resolution");
    });
}
