//! Core data model.
//!
//! A user owns books. A book accumulates progress records and goals. A goal
//! is a target page with a deadline; it resolves exactly once, either to
//! `finished` (reached in time) or `expired` (deadline passed first).

pub mod book;
pub mod goal;
pub mod message;
pub mod progress;
pub mod user;

pub use book::{Book, BookStatus, NewBook};
pub use goal::{Goal, GoalOutcome, GoalStatus, NewGoal, Resolution};
pub use message::GoalMessage;
pub use progress::{NewProgress, Progress, ProgressRecorded};
pub use user::User;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                // Short display: first 8 chars of UUID
                write!(f, "{}", &self.0.to_string()[..8])
            }
        }
    };
}

id_newtype!(
    /// Newtype for user IDs.
    UserId
);
id_newtype!(
    /// Newtype for book IDs.
    BookId
);
id_newtype!(
    /// Newtype for progress record IDs.
    ProgressId
);
id_newtype!(
    /// Newtype for goal IDs.
    GoalId
);
