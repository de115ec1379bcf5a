//! Queue payload for goal notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GoalId;
use crate::error::Result;

/// Payload carried by both the deadline queue and the goal-finished queue.
///
/// It is also the snapshot a resolution returns, so a notifier always gets
/// data read in the same statement that changed the goal's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GoalMessage {
    pub goal_id: GoalId,
    pub email: String,
    pub goal_name: String,
    pub book_title: String,
    pub target_page: i32,
    pub expired_at: DateTime<Utc>,
}

impl GoalMessage {
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decode a queue payload. Malformed payloads fail with `Error::Decode`.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        Ok(Self::deserialize(value)?)
    }
}
