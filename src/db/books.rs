//! Book operations. Every lookup is scoped to the owning user.

use sqlx::PgConnection;
use tracing::info;

use crate::error::{Error, Result};
use crate::model::{Book, BookId, NewBook, Progress, UserId};

impl super::Db {
    /// Add a book to a user's shelf.
    pub async fn create_book(&self, user_id: UserId, new: NewBook) -> Result<Book> {
        new.validate()?;

        let row: BookRow = sqlx::query_as(
            "INSERT INTO books (id, user_id, title, author, total_pages)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, user_id, title, author, total_pages, status",
        )
        .bind(BookId::new())
        .bind(user_id)
        .bind(new.title.trim())
        .bind(new.author.trim())
        .bind(new.total_pages)
        .fetch_one(&self.pool)
        .await?;

        row.try_into_book()
    }

    /// Get a book owned by `user_id`. Someone else's book is not found.
    pub async fn get_book(&self, book_id: BookId, user_id: UserId) -> Result<Book> {
        let mut conn = self.pool.acquire().await?;
        fetch_book(&mut conn, book_id, user_id, false).await
    }

    /// All books of a user, oldest first.
    pub async fn list_books(&self, user_id: UserId) -> Result<Vec<Book>> {
        let rows: Vec<BookRow> = sqlx::query_as(
            "SELECT id, user_id, title, author, total_pages, status
             FROM books WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BookRow::try_into_book).collect()
    }

    /// Delete a book and its progress history.
    ///
    /// Goals are never deleted, so a book that ever had one is kept.
    pub async fn delete_book(&self, book_id: BookId, user_id: UserId) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let book = fetch_book(&mut tx, book_id, user_id, true).await?;

        let goals: (i64,) = sqlx::query_as("SELECT count(*) FROM goals WHERE book_id = $1")
            .bind(book.id)
            .fetch_one(&mut *tx)
            .await?;
        if goals.0 > 0 {
            return Err(Error::Conflict(format!(
                "book {book_id} has {} goal(s) and cannot be deleted",
                goals.0
            )));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(book.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(book = %book.id, "book deleted");
        Ok(())
    }

    /// Progress history of a book, in reading order.
    pub async fn list_progress(&self, book_id: BookId) -> Result<Vec<Progress>> {
        let rows = sqlx::query_as::<_, Progress>(
            "SELECT id, book_id, from_page, until_page, description, created_at
             FROM progresses WHERE book_id = $1 ORDER BY until_page",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Fetch a book on an open connection. With `for_update`, the row stays
/// locked until the surrounding transaction ends, which serializes progress
/// writes per book.
pub(crate) async fn fetch_book(
    conn: &mut PgConnection,
    book_id: BookId,
    user_id: UserId,
    for_update: bool,
) -> Result<Book> {
    let sql = if for_update {
        "SELECT id, user_id, title, author, total_pages, status
         FROM books WHERE id = $1 AND user_id = $2 FOR UPDATE"
    } else {
        "SELECT id, user_id, title, author, total_pages, status
         FROM books WHERE id = $1 AND user_id = $2"
    };

    let row: Option<BookRow> = sqlx::query_as(sql)
        .bind(book_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

    row.ok_or_else(|| Error::NotFound(format!("book {book_id}")))?
        .try_into_book()
}

/// The most recent progress record of a book, if any.
pub(crate) async fn latest_progress(
    conn: &mut PgConnection,
    book_id: BookId,
) -> Result<Option<Progress>> {
    // until_page strictly increases per book, so the highest is the latest.
    let row = sqlx::query_as::<_, Progress>(
        "SELECT id, book_id, from_page, until_page, description, created_at
         FROM progresses WHERE book_id = $1 ORDER BY until_page DESC LIMIT 1",
    )
    .bind(book_id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct BookRow {
    id: BookId,
    user_id: UserId,
    title: String,
    author: String,
    total_pages: i32,
    status: String,
}

impl BookRow {
    fn try_into_book(self) -> Result<Book> {
        Ok(Book {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            author: self.author,
            total_pages: self.total_pages,
            status: self.status.parse()?,
        })
    }
}
