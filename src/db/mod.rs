//! Database connection pool, migrations, and health check.
//!
//! One Postgres pool backs the relational tables and the pgmq queues, so
//! queue sends can join the transaction of the operation that causes them.

pub mod books;
pub mod goals;
pub mod pgmq;
pub mod progress;
pub mod users;

use crate::error::Result;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Database handle. Owns the connection pool shared across all modules.
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Connect to Postgres and create a connection pool.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| crate::error::Error::Other(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Create every queue the pipeline uses (idempotent).
    pub async fn create_queues(&self) -> Result<()> {
        for queue in crate::dispatch::QUEUES {
            self.create_queue(queue).await?;
        }
        Ok(())
    }

    /// Simple health check: run a SELECT 1.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
