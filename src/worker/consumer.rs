//! Sequential queue consumer: read one message, handle it, acknowledge it.

use async_trait::async_trait;
use opentelemetry::KeyValue;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{Instrument, Span, error, info, warn};

use crate::config::WorkerSettings;
use crate::db::Db;
use crate::db::pgmq::PgmqMessage;
use crate::error::Result;
use crate::telemetry::metrics;
use crate::telemetry::queue::start_message_span;

/// Business logic for one queue.
///
/// `Ok` acknowledges the message. A transient error leaves it for
/// redelivery; any other error drops it.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    fn queue(&self) -> &'static str;

    /// `span` is the message span, for recording what the handler decided.
    async fn handle(&self, msg: &PgmqMessage, span: &Span) -> Result<()>;
}

/// Drives one handler over its queue until shutdown.
pub struct QueueWorker<H> {
    db: Arc<Db>,
    handler: Arc<H>,
    config: WorkerSettings,
    shutdown: Arc<Notify>,
}

impl<H> Clone for QueueWorker<H> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            handler: Arc::clone(&self.handler),
            config: self.config.clone(),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

impl<H: MessageHandler> QueueWorker<H> {
    pub fn new(db: Arc<Db>, handler: H, config: WorkerSettings) -> Self {
        Self {
            db,
            handler: Arc::new(handler),
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Signal the worker to stop after the message in hand.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Run the consume loop until shutdown.
    pub async fn run(&self) -> Result<()> {
        let queue = self.handler.queue();
        info!(queue, "worker started");

        loop {
            let processed = match self.poll_once().await {
                Ok(processed) => processed,
                Err(e) => {
                    error!(queue, "poll error: {e}");
                    false
                }
            };

            // Drain without sleeping while messages keep coming.
            let wait = if processed {
                Duration::ZERO
            } else {
                self.config.poll_interval
            };
            tokio::select! {
                biased;
                _ = self.shutdown.notified() => {
                    info!(queue, "worker shutting down");
                    return Ok(());
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Process at most one message. Returns whether a message was read.
    pub async fn poll_once(&self) -> Result<bool> {
        let queue = self.handler.queue();
        let Some(msg) = self
            .db
            .read_from_queue(queue, self.config.visibility_timeout)
            .await?
        else {
            return Ok(false);
        };

        let span = start_message_span(queue, msg.msg_id, msg.read_ct);
        let started = Instant::now();

        async {
            match self.handler.handle(&msg, &span).await {
                Ok(()) => self.db.archive_message(queue, msg.msg_id).await?,
                Err(e) if e.is_transient() && msg.read_ct < self.config.max_deliveries => {
                    warn!(
                        read_ct = msg.read_ct,
                        "transient failure, leaving message for redelivery: {e}"
                    );
                }
                Err(e) if e.is_transient() => {
                    error!(
                        read_ct = msg.read_ct,
                        "delivery limit reached, archiving: {e}"
                    );
                    self.db.archive_message(queue, msg.msg_id).await?;
                }
                Err(e) => {
                    error!(payload = %msg.message, "dropping message: {e}");
                    self.db.archive_message(queue, msg.msg_id).await?;
                }
            }

            metrics::operation_duration_ms().record(
                started.elapsed().as_secs_f64() * 1000.0,
                &[KeyValue::new("operation", format!("consume.{queue}"))],
            );
            Ok(true)
        }
        .instrument(span.clone())
        .await
    }
}
