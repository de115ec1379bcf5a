//! Goal-finished consumer: mails the congratulation for goals the progress
//! path already resolved.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::Span;

use super::consumer::MessageHandler;
use crate::db::pgmq::PgmqMessage;
use crate::dispatch::FINISHED_QUEUE;
use crate::error::Result;
use crate::model::{GoalMessage, GoalOutcome};
use crate::notify::{Notifier, notify_best_effort};

pub struct FinishedHandler {
    notifier: Arc<dyn Notifier>,
}

impl FinishedHandler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl MessageHandler for FinishedHandler {
    fn queue(&self) -> &'static str {
        FINISHED_QUEUE
    }

    async fn handle(&self, msg: &PgmqMessage, span: &Span) -> Result<()> {
        let goal = GoalMessage::from_json(&msg.message)?;
        span.record("goal.id", tracing::field::display(goal.goal_id));
        notify_best_effort(self.notifier.as_ref(), GoalOutcome::Finished.into(), &goal).await;
        Ok(())
    }
}
