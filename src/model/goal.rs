//! Goals and their resolution state machine.
//!
//! A goal starts `in-progress` and moves exactly once, to `finished` or
//! `expired`. Both terminal states are final.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Book, BookId, GoalId, GoalMessage, UserId};
use crate::error::{Error, Result};

/// A target page to reach before a deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub book_id: BookId,
    pub user_id: UserId,
    pub name: String,
    pub target_page: i32,
    pub status: GoalStatus,
    pub expired_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle state of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalStatus {
    /// Open, eligible for resolution.
    InProgress,
    /// Target page reached before the deadline. Terminal.
    Finished,
    /// Deadline passed first. Terminal.
    Expired,
}

impl GoalStatus {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: GoalStatus) -> bool {
        use GoalStatus::*;
        matches!((self, to), (InProgress, Finished) | (InProgress, Expired))
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, GoalStatus::InProgress)
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GoalStatus::InProgress => "in-progress",
            GoalStatus::Finished => "finished",
            GoalStatus::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "in-progress" => Ok(GoalStatus::InProgress),
            "finished" => Ok(GoalStatus::Finished),
            "expired" => Ok(GoalStatus::Expired),
            other => Err(Error::Other(format!("unknown goal status: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// The terminal state a resolution attempt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalOutcome {
    Finished,
    Expired,
}

impl GoalOutcome {
    pub fn status(self) -> GoalStatus {
        match self {
            GoalOutcome::Finished => GoalStatus::Finished,
            GoalOutcome::Expired => GoalStatus::Expired,
        }
    }
}

impl std::fmt::Display for GoalOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.status())
    }
}

/// Result of a resolution attempt.
///
/// Losing a race is not an error: the loser gets `AlreadyResolved` and must
/// not notify.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// This call moved the goal out of `in-progress`. Carries the snapshot
    /// read in the same statement as the update.
    Resolved(GoalMessage),
    /// The goal had already left `in-progress`; nothing changed.
    AlreadyResolved(GoalStatus),
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    /// Surface a lost race to a synchronous caller as a conflict.
    pub fn into_resolved(self) -> Result<GoalMessage> {
        match self {
            Resolution::Resolved(goal) => Ok(goal),
            Resolution::AlreadyResolved(status) => {
                Err(Error::Conflict(format!("goal already resolved as {status}")))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Parameters for creating a goal.
#[derive(Debug, Clone)]
pub struct NewGoal {
    pub book_id: BookId,
    pub user_id: UserId,
    pub name: String,
    pub target_page: i32,
    pub expired_at: DateTime<Utc>,
}

impl NewGoal {
    /// Check the goal against the book it targets.
    ///
    /// `latest_until` is the `until_page` of the book's most recent progress
    /// (0 when there is none).
    pub fn validate(&self, book: &Book, latest_until: i32, now: DateTime<Utc>) -> Result<()> {
        if book.is_completed() {
            return Err(Error::Conflict(format!(
                "book {} is already completed",
                book.id
            )));
        }
        if self.name.trim().is_empty() {
            return Err(Error::Validation("goal name is required".to_string()));
        }
        if self.target_page <= latest_until {
            return Err(Error::Validation(format!(
                "target_page {} is already reached (latest progress is page {latest_until})",
                self.target_page
            )));
        }
        if self.target_page > book.total_pages {
            return Err(Error::Validation(format!(
                "target_page {} exceeds the book's {} pages",
                self.target_page, book.total_pages
            )));
        }
        if self.expired_at <= now {
            return Err(Error::Validation(
                "expired_at must be in the future".to_string(),
            ));
        }
        Ok(())
    }
}
