//! Books and their reading status.

use serde::{Deserialize, Serialize};

use super::{BookId, UserId};
use crate::error::{Error, Result};

/// A book on a user's shelf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub user_id: UserId,
    pub title: String,
    pub author: String,
    pub total_pages: i32,
    pub status: BookStatus,
}

/// Reading status of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    Reading,
    /// The last recorded progress reached `total_pages`.
    Completed,
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BookStatus::Reading => "reading",
            BookStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for BookStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reading" => Ok(BookStatus::Reading),
            "completed" => Ok(BookStatus::Completed),
            other => Err(Error::Other(format!("unknown book status: {other}"))),
        }
    }
}

impl Book {
    pub fn is_completed(&self) -> bool {
        self.status == BookStatus::Completed
    }

    /// Check that `until_page` is a legal next progress entry, given the
    /// `until_page` of the most recent record (0 when there is none).
    pub fn check_progress(&self, previous_until: i32, until_page: i32) -> Result<()> {
        if self.is_completed() {
            return Err(Error::Conflict(format!(
                "book {} is already completed",
                self.id
            )));
        }
        if until_page <= 0 {
            return Err(Error::Validation("until_page must be positive".to_string()));
        }
        if until_page > self.total_pages {
            return Err(Error::Validation(format!(
                "until_page {until_page} exceeds the book's {} pages",
                self.total_pages
            )));
        }
        if until_page <= previous_until {
            return Err(Error::Conflict(format!(
                "until_page {until_page} is not past the previous until_page {previous_until}"
            )));
        }
        Ok(())
    }
}

/// Parameters for adding a book.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub total_pages: i32,
}

impl NewBook {
    pub fn validate(&self) -> Result<()> {
        let title_len = self.title.trim().chars().count();
        if !(6..=50).contains(&title_len) {
            return Err(Error::Validation(
                "title must be between 6 and 50 characters".to_string(),
            ));
        }
        if self.author.trim().is_empty() {
            return Err(Error::Validation("author is required".to_string()));
        }
        if self.total_pages <= 0 {
            return Err(Error::Validation("total_pages must be positive".to_string()));
        }
        Ok(())
    }
}
