//! Reading progress records.
//!
//! Progress is append-only per book: each record continues from where the
//! previous one stopped. Only the most recent record may be undone, and only
//! inside the grace window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{BookId, GoalId, ProgressId, UserId};

/// A recorded reading session.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Progress {
    pub id: ProgressId,
    pub book_id: BookId,
    /// Equal to the previous record's `until_page`, or 0 for the first.
    pub from_page: i32,
    pub until_page: i32,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Progress {
    /// Whether this record may still be undone at `now`.
    pub fn within_grace(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        match chrono::Duration::from_std(grace) {
            Ok(grace) => now < self.created_at + grace,
            Err(_) => true,
        }
    }
}

/// Parameters for recording progress.
#[derive(Debug, Clone)]
pub struct NewProgress {
    pub book_id: BookId,
    pub user_id: UserId,
    pub until_page: i32,
    pub description: String,
}

/// What a successful progress update changed.
#[derive(Debug, Clone)]
pub struct ProgressRecorded {
    pub progress: Progress,
    /// The update reached the last page and the book is now completed.
    pub book_completed: bool,
    /// Goals this update resolved to `finished`.
    pub finished_goals: Vec<GoalId>,
}
