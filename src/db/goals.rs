//! Goal store: creation with deadline scheduling, and the single
//! resolution operation both the progress path and the deadline worker go
//! through.

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use sqlx::PgConnection;
use tracing::info;

use super::books::{fetch_book, latest_progress};
use crate::dispatch;
use crate::error::{Error, Result};
use crate::model::*;
use crate::telemetry::metrics;

impl super::Db {
    /// Create a goal and schedule its deadline message in one transaction.
    pub async fn create_goal(&self, new: NewGoal) -> Result<Goal> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        // Lock the book so a concurrent progress update can't slip past the
        // target check below.
        let book = fetch_book(&mut tx, new.book_id, new.user_id, true).await?;
        let latest_until = latest_progress(&mut tx, book.id)
            .await?
            .map_or(0, |p| p.until_page);
        new.validate(&book, latest_until, now)?;

        let email: (String,) = sqlx::query_as("SELECT email FROM users WHERE id = $1")
            .bind(new.user_id)
            .fetch_one(&mut *tx)
            .await?;

        let row: GoalRow = sqlx::query_as(
            "INSERT INTO goals (id, book_id, user_id, name, target_page, expired_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, book_id, user_id, name, target_page, status, expired_at, created_at, resolved_at",
        )
        .bind(GoalId::new())
        .bind(new.book_id)
        .bind(new.user_id)
        .bind(new.name.trim())
        .bind(new.target_page)
        .bind(new.expired_at)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        let goal = row.try_into_goal()?;

        let message = GoalMessage {
            goal_id: goal.id,
            email: email.0,
            goal_name: goal.name.clone(),
            book_title: book.title,
            target_page: goal.target_page,
            expired_at: goal.expired_at,
        };
        dispatch::schedule_deadline(&mut tx, &message, now).await?;

        tx.commit().await?;

        metrics::goals_created().add(1, &[]);
        info!(
            goal = %goal.id,
            book = %goal.book_id,
            target_page = goal.target_page,
            expired_at = %goal.expired_at,
            "goal created"
        );
        Ok(goal)
    }

    /// Resolve a goal to `outcome` if it is still `in-progress`.
    ///
    /// A `finished` resolution also queues the goal-finished notification in
    /// the same transaction. An `expired` resolution leaves notifying to the
    /// caller.
    pub async fn resolve_goal(&self, goal_id: GoalId, outcome: GoalOutcome) -> Result<Resolution> {
        let mut tx = self.pool.begin().await?;
        let resolution = resolve_goal_on(&mut tx, goal_id, outcome).await?;
        if let (GoalOutcome::Finished, Resolution::Resolved(goal)) = (outcome, &resolution) {
            dispatch::enqueue_finished(&mut tx, goal).await?;
        }
        tx.commit().await?;
        Ok(resolution)
    }

    /// Get a goal by ID.
    pub async fn get_goal(&self, goal_id: GoalId) -> Result<Goal> {
        let row: Option<GoalRow> = sqlx::query_as(
            "SELECT id, book_id, user_id, name, target_page, status, expired_at, created_at, resolved_at
             FROM goals WHERE id = $1",
        )
        .bind(goal_id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| Error::NotFound(format!("goal {goal_id}")))?
            .try_into_goal()
    }

    /// All goals of a user, newest first.
    pub async fn list_goals(&self, user_id: UserId) -> Result<Vec<Goal>> {
        let rows: Vec<GoalRow> = sqlx::query_as(
            "SELECT id, book_id, user_id, name, target_page, status, expired_at, created_at, resolved_at
             FROM goals WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(GoalRow::try_into_goal).collect()
    }

    /// All goals set on one of the user's books, newest first. Someone
    /// else's book is not found.
    pub async fn list_book_goals(&self, book_id: BookId, user_id: UserId) -> Result<Vec<Goal>> {
        let mut conn = self.pool.acquire().await?;
        let book = fetch_book(&mut conn, book_id, user_id, false).await?;

        let rows: Vec<GoalRow> = sqlx::query_as(
            "SELECT id, book_id, user_id, name, target_page, status, expired_at, created_at, resolved_at
             FROM goals WHERE book_id = $1 ORDER BY created_at DESC",
        )
        .bind(book.id)
        .fetch_all(&mut *conn)
        .await?;

        rows.into_iter().map(GoalRow::try_into_goal).collect()
    }

    /// Goals of a book that are still `in-progress`.
    pub async fn list_open_goals(&self, book_id: BookId) -> Result<Vec<Goal>> {
        let mut conn = self.pool.acquire().await?;
        open_goals_reached(&mut conn, book_id, i32::MAX).await
    }
}

/// Open goals of a book whose target is at or below `page`.
pub(crate) async fn open_goals_reached(
    conn: &mut PgConnection,
    book_id: BookId,
    page: i32,
) -> Result<Vec<Goal>> {
    let rows: Vec<GoalRow> = sqlx::query_as(
        "SELECT id, book_id, user_id, name, target_page, status, expired_at, created_at, resolved_at
         FROM goals
         WHERE book_id = $1 AND status = 'in-progress' AND target_page <= $2
         ORDER BY target_page",
    )
    .bind(book_id)
    .bind(page)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(GoalRow::try_into_goal).collect()
}

/// The resolution check-and-set.
///
/// One conditional UPDATE moves the goal out of `in-progress` and returns the
/// notification snapshot. Concurrent callers serialize on the row lock; the
/// loser re-evaluates `status = 'in-progress'`, matches nothing, and gets
/// `AlreadyResolved`.
pub(crate) async fn resolve_goal_on(
    conn: &mut PgConnection,
    goal_id: GoalId,
    outcome: GoalOutcome,
) -> Result<Resolution> {
    let to = outcome.status();
    let snapshot: Option<GoalMessage> = sqlx::query_as(
        "UPDATE goals AS g SET status = $1, resolved_at = now()
         FROM books AS b, users AS u
         WHERE g.id = $2 AND g.status = 'in-progress'
           AND b.id = g.book_id AND u.id = g.user_id
         RETURNING g.id AS goal_id, u.email, g.name AS goal_name,
                   b.title AS book_title, g.target_page, g.expired_at",
    )
    .bind(to.to_string())
    .bind(goal_id)
    .fetch_optional(&mut *conn)
    .await?;

    let resolution = match snapshot {
        Some(goal) => Resolution::Resolved(goal),
        None => {
            let current: Option<(String,)> =
                sqlx::query_as("SELECT status FROM goals WHERE id = $1")
                    .bind(goal_id)
                    .fetch_optional(&mut *conn)
                    .await?;
            let current = current.ok_or_else(|| Error::NotFound(format!("goal {goal_id}")))?;
            Resolution::AlreadyResolved(current.0.parse()?)
        }
    };

    metrics::goal_resolutions().add(
        1,
        &[
            KeyValue::new("outcome", outcome.to_string()),
            KeyValue::new(
                "result",
                if resolution.is_resolved() {
                    "resolved"
                } else {
                    "already_resolved"
                },
            ),
        ],
    );
    Ok(resolution)
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct GoalRow {
    id: GoalId,
    book_id: BookId,
    user_id: UserId,
    name: String,
    target_page: i32,
    status: String,
    expired_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl GoalRow {
    fn try_into_goal(self) -> Result<Goal> {
        Ok(Goal {
            id: self.id,
            book_id: self.book_id,
            user_id: self.user_id,
            name: self.name,
            target_page: self.target_page,
            status: self.status.parse()?,
            expired_at: self.expired_at,
            created_at: self.created_at,
            resolved_at: self.resolved_at,
        })
    }
}
