//! Progress recording and the goal evaluation that rides along with it.

use chrono::Utc;
use opentelemetry::KeyValue;
use std::time::Duration;
use tracing::{debug, info};

use super::books::{fetch_book, latest_progress};
use super::goals::{open_goals_reached, resolve_goal_on};
use crate::dispatch;
use crate::error::{Error, Result};
use crate::model::*;
use crate::telemetry::metrics;

impl super::Db {
    /// Record progress on a book and resolve every goal it satisfies.
    ///
    /// The progress insert, the book completion, the goal resolutions, and
    /// the goal-finished queue messages commit together or not at all. The
    /// mails themselves go out later from the goal-finished queue, so a mail
    /// failure can never undo a resolution.
    pub async fn record_progress(&self, new: NewProgress) -> Result<ProgressRecorded> {
        let mut tx = self.pool.begin().await?;

        let book = fetch_book(&mut tx, new.book_id, new.user_id, true).await?;
        let from_page = latest_progress(&mut tx, book.id)
            .await?
            .map_or(0, |p| p.until_page);
        book.check_progress(from_page, new.until_page)?;
        if new.description.trim().is_empty() {
            return Err(Error::Validation("description is required".to_string()));
        }

        let progress = sqlx::query_as::<_, Progress>(
            "INSERT INTO progresses (id, book_id, from_page, until_page, description)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, book_id, from_page, until_page, description, created_at",
        )
        .bind(ProgressId::new())
        .bind(book.id)
        .bind(from_page)
        .bind(new.until_page)
        .bind(new.description.trim())
        .fetch_one(&mut *tx)
        .await?;

        let book_completed = new.until_page == book.total_pages;
        if book_completed {
            set_book_status(&mut tx, book.id, BookStatus::Completed).await?;
        }

        let mut finished_goals = Vec::new();
        for goal in open_goals_reached(&mut tx, book.id, new.until_page).await? {
            match resolve_goal_on(&mut tx, goal.id, GoalOutcome::Finished).await? {
                Resolution::Resolved(message) => {
                    dispatch::enqueue_finished(&mut tx, &message).await?;
                    finished_goals.push(goal.id);
                }
                Resolution::AlreadyResolved(status) => {
                    // The deadline worker got there between our select and update.
                    debug!(goal = %goal.id, %status, "goal resolved concurrently, skipping");
                }
            }
        }

        tx.commit().await?;

        metrics::progress_recorded().add(
            1,
            &[KeyValue::new("book_completed", book_completed)],
        );
        info!(
            book = %book.id,
            from_page,
            until_page = new.until_page,
            book_completed,
            finished_goals = finished_goals.len(),
            "progress recorded"
        );

        Ok(ProgressRecorded {
            progress,
            book_completed,
            finished_goals,
        })
    }

    /// Undo the most recent progress record of a book, if it is younger than
    /// `grace`. A completed book goes back to `reading`. Goals already
    /// resolved stay resolved.
    pub async fn delete_latest_progress(
        &self,
        book_id: BookId,
        user_id: UserId,
        grace: Duration,
    ) -> Result<Progress> {
        let mut tx = self.pool.begin().await?;

        let book = fetch_book(&mut tx, book_id, user_id, true).await?;
        let latest = latest_progress(&mut tx, book.id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("progress for book {book_id}")))?;

        if !latest.within_grace(Utc::now(), grace) {
            return Err(Error::Conflict(format!(
                "progress {} is older than {}s and can no longer be undone",
                latest.id,
                grace.as_secs()
            )));
        }

        if book.is_completed() {
            set_book_status(&mut tx, book.id, BookStatus::Reading).await?;
        }

        sqlx::query("DELETE FROM progresses WHERE id = $1")
            .bind(latest.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(book = %book.id, progress = %latest.id, "latest progress undone");
        Ok(latest)
    }
}

async fn set_book_status(
    conn: &mut sqlx::PgConnection,
    book_id: BookId,
    status: BookStatus,
) -> Result<()> {
    sqlx::query("UPDATE books SET status = $1 WHERE id = $2")
        .bind(status.to_string())
        .bind(book_id)
        .execute(conn)
        .await?;
    Ok(())
}
