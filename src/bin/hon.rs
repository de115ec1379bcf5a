//! hon CLI: run the goal workers and manage books, progress, and goals.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use hon_rs::config::Config;
use hon_rs::config::secrets::ExposeSecret;
use hon_rs::db::Db;
use hon_rs::model::{BookId, NewBook, NewGoal, NewProgress};
use hon_rs::notify::{LogNotifier, MailNotifier, Notifier};
use hon_rs::telemetry::{TelemetryConfig, init_telemetry};
use hon_rs::worker::{DeadlineHandler, FinishedHandler, QueueWorker};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "hon", about = "Track reading progress and page goals")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the deadline and goal-finished workers
    Serve,
    /// User operations
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Book operations
    Book {
        #[command(subcommand)]
        action: BookAction,
    },
    /// Progress operations
    Progress {
        #[command(subcommand)]
        action: ProgressAction,
    },
    /// Goal operations
    Goal {
        #[command(subcommand)]
        action: GoalAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a new user
    Register { email: String },
}

#[derive(Subcommand)]
enum BookAction {
    /// Add a book
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        total_pages: i32,
    },
    /// List your books
    List {
        #[arg(long)]
        email: String,
    },
    /// Show a book with its progress history
    Show {
        book_id: Uuid,
        #[arg(long)]
        email: String,
    },
    /// Delete a book that never had a goal
    Delete {
        book_id: Uuid,
        #[arg(long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum ProgressAction {
    /// Record how far you read
    Record {
        book_id: Uuid,
        #[arg(long)]
        email: String,
        #[arg(long)]
        until_page: i32,
        #[arg(long)]
        description: String,
    },
    /// Undo the latest progress record (only shortly after recording it)
    Undo {
        book_id: Uuid,
        #[arg(long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum GoalAction {
    /// Set a goal: reach a page before a deadline
    Create {
        book_id: Uuid,
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        target_page: i32,
        /// Deadline, RFC 3339 (e.g. 2026-11-01T18:00:00Z)
        #[arg(long)]
        expires_at: DateTime<Utc>,
    },
    /// List your goals
    List {
        #[arg(long)]
        email: String,
        /// Only goals set on this book
        #[arg(long)]
        book: Option<Uuid>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "hon".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let db = Db::connect(config.database_url.expose_secret()).await?;
    db.migrate().await?;
    db.create_queues().await?;

    match cli.command {
        Command::Serve => cmd_serve(db, &config).await,
        Command::User {
            action: UserAction::Register { email },
        } => {
            let user = db.create_user(&email).await?;
            println!("Registered: {} ({})", user.email, user.id);
            Ok(())
        }
        Command::Book { action } => cmd_book(&db, action).await,
        Command::Progress { action } => cmd_progress(&db, &config, action).await,
        Command::Goal { action } => cmd_goal(&db, action).await,
    }
}

async fn cmd_serve(db: Db, config: &Config) -> anyhow::Result<()> {
    let notifier: Arc<dyn Notifier> = match config.smtp {
        Some(ref smtp) => Arc::new(MailNotifier::new(smtp)?),
        None => {
            tracing::warn!("SMTP_HOST not set, mails will only be logged");
            Arc::new(LogNotifier::new()?)
        }
    };
    let db = Arc::new(db);

    let deadline = QueueWorker::new(
        Arc::clone(&db),
        DeadlineHandler::new(Arc::clone(&db), Arc::clone(&notifier)),
        config.worker.clone(),
    );
    let finished = QueueWorker::new(
        Arc::clone(&db),
        FinishedHandler::new(notifier),
        config.worker.clone(),
    );

    let (d, f) = (deadline.clone(), finished.clone());
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        d.shutdown();
        f.shutdown();
    });

    let deadline_task = tokio::spawn(async move { deadline.run().await });
    let finished_task = tokio::spawn(async move { finished.run().await });
    let (deadline_result, finished_result) = tokio::try_join!(deadline_task, finished_task)?;
    deadline_result?;
    finished_result?;
    Ok(())
}

async fn cmd_book(db: &Db, action: BookAction) -> anyhow::Result<()> {
    match action {
        BookAction::Add {
            email,
            title,
            author,
            total_pages,
        } => {
            let user = db.get_user_by_email(&email).await?;
            let book = db
                .create_book(
                    user.id,
                    NewBook {
                        title,
                        author,
                        total_pages,
                    },
                )
                .await?;
            println!(
                "Added: {} \"{}\" ({} pages)",
                book.id.0, book.title, book.total_pages
            );
        }
        BookAction::List { email } => {
            let user = db.get_user_by_email(&email).await?;
            let books = db.list_books(user.id).await?;
            if books.is_empty() {
                println!("No books found.");
                return Ok(());
            }
            println!("{:<36}  {:<10}  {:>5}  TITLE", "ID", "STATUS", "PAGES");
            println!("{}", "-".repeat(90));
            for book in &books {
                println!(
                    "{:<36}  {:<10}  {:>5}  {} ({})",
                    book.id.0,
                    book.status.to_string(),
                    book.total_pages,
                    book.title,
                    book.author
                );
            }
            println!("\n{} book(s)", books.len());
        }
        BookAction::Show { book_id, email } => {
            let user = db.get_user_by_email(&email).await?;
            let book = db.get_book(BookId(book_id), user.id).await?;
            println!("ID:      {}", book.id.0);
            println!("Title:   {}", book.title);
            println!("Author:  {}", book.author);
            println!("Pages:   {}", book.total_pages);
            println!("Status:  {}", book.status);
            let progress = db.list_progress(book.id).await?;
            if !progress.is_empty() {
                println!("---");
                for p in &progress {
                    println!(
                        "{}  p.{:>4} -> {:>4}  {}",
                        p.created_at.format("%Y-%m-%d %H:%M"),
                        p.from_page,
                        p.until_page,
                        p.description
                    );
                }
            }
        }
        BookAction::Delete { book_id, email } => {
            let user = db.get_user_by_email(&email).await?;
            db.delete_book(BookId(book_id), user.id).await?;
            println!("Deleted: {book_id}");
        }
    }
    Ok(())
}

async fn cmd_progress(db: &Db, config: &Config, action: ProgressAction) -> anyhow::Result<()> {
    match action {
        ProgressAction::Record {
            book_id,
            email,
            until_page,
            description,
        } => {
            let user = db.get_user_by_email(&email).await?;
            let recorded = db
                .record_progress(NewProgress {
                    book_id: BookId(book_id),
                    user_id: user.id,
                    until_page,
                    description,
                })
                .await?;
            println!(
                "Recorded: pages {} -> {}",
                recorded.progress.from_page, recorded.progress.until_page
            );
            if recorded.book_completed {
                println!("Book completed!");
            }
            for goal in &recorded.finished_goals {
                println!("Goal {goal} finished");
            }
        }
        ProgressAction::Undo { book_id, email } => {
            let user = db.get_user_by_email(&email).await?;
            let undone = db
                .delete_latest_progress(BookId(book_id), user.id, config.progress_grace)
                .await?;
            println!("Undone: pages {} -> {}", undone.from_page, undone.until_page);
        }
    }
    Ok(())
}

async fn cmd_goal(db: &Db, action: GoalAction) -> anyhow::Result<()> {
    match action {
        GoalAction::Create {
            book_id,
            email,
            name,
            target_page,
            expires_at,
        } => {
            let user = db.get_user_by_email(&email).await?;
            let goal = db
                .create_goal(NewGoal {
                    book_id: BookId(book_id),
                    user_id: user.id,
                    name,
                    target_page,
                    expired_at: expires_at,
                })
                .await?;
            println!(
                "Created: {} (page {} by {})",
                goal.id.0,
                goal.target_page,
                goal.expired_at.format("%Y-%m-%d %H:%M %Z")
            );
        }
        GoalAction::List { email, book } => {
            let user = db.get_user_by_email(&email).await?;
            let goals = match book {
                Some(book_id) => db.list_book_goals(BookId(book_id), user.id).await?,
                None => db.list_goals(user.id).await?,
            };
            if goals.is_empty() {
                println!("No goals found.");
                return Ok(());
            }
            println!(
                "{:<8}  {:<11}  {:>5}  {:<16}  NAME",
                "ID", "STATUS", "PAGE", "DEADLINE"
            );
            println!("{}", "-".repeat(80));
            for goal in &goals {
                println!(
                    "{:<8}  {:<11}  {:>5}  {:<16}  {}",
                    goal.id.to_string(),
                    goal.status.to_string(),
                    goal.target_page,
                    goal.expired_at.format("%Y-%m-%d %H:%M").to_string(),
                    goal.name
                );
            }
            println!("\n{} goal(s)", goals.len());
        }
    }
    Ok(())
}
