//! Delayed dispatch of goal messages.
//!
//! Deadline messages go to [`DEADLINE_QUEUE`] with a pgmq send delay so
//! they become visible at (or just after) the goal's `expired_at`.
//! Goal-finished messages go to [`FINISHED_QUEUE`] with no delay. Both are
//! sent on the caller's transaction, so nothing is published for an
//! operation that rolls back.
//!
//! Scheduling has no cancellation. A goal finished early still gets its
//! deadline delivery later, which the deadline worker absorbs as a no-op.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::debug;

use crate::db::pgmq::send_on;
use crate::error::Result;
use crate::model::GoalMessage;

/// Queue of deadline messages, consumed by the deadline worker.
pub const DEADLINE_QUEUE: &str = "goal_deadline";

/// Queue of goal-finished notifications, filled by the progress evaluator.
pub const FINISHED_QUEUE: &str = "goal_finished";

pub const QUEUES: [&str; 2] = [DEADLINE_QUEUE, FINISHED_QUEUE];

/// Seconds until `expired_at`, rounded up so delivery never lands before the
/// deadline. A deadline already passed yields 0 (deliver immediately).
pub fn deadline_delay(expired_at: DateTime<Utc>, now: DateTime<Utc>) -> i32 {
    let millis = (expired_at - now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    let secs = (millis + 999) / 1000;
    i32::try_from(secs).unwrap_or(i32::MAX)
}

/// Publish the deadline message for a freshly created goal. Returns the
/// pgmq message ID.
pub async fn schedule_deadline(
    conn: &mut PgConnection,
    goal: &GoalMessage,
    now: DateTime<Utc>,
) -> Result<i64> {
    let delay = deadline_delay(goal.expired_at, now);
    let msg_id = send_on(conn, DEADLINE_QUEUE, &goal.to_json()?, delay).await?;
    debug!(goal = %goal.goal_id, delay_seconds = delay, msg_id, "deadline scheduled");
    Ok(msg_id)
}

/// Queue a goal-finished notification for a goal just resolved.
pub async fn enqueue_finished(conn: &mut PgConnection, goal: &GoalMessage) -> Result<i64> {
    let msg_id = send_on(conn, FINISHED_QUEUE, &goal.to_json()?, 0).await?;
    debug!(goal = %goal.goal_id, msg_id, "goal-finished notification queued");
    Ok(msg_id)
}
