//! Deadline consumer: expires goals that are still open when their
//! deadline message arrives.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{Span, debug};

use super::consumer::MessageHandler;
use crate::db::Db;
use crate::db::pgmq::PgmqMessage;
use crate::dispatch::DEADLINE_QUEUE;
use crate::error::Result;
use crate::model::{GoalMessage, GoalOutcome, Resolution};
use crate::notify::{Notifier, notify_best_effort};
use crate::telemetry::queue::record_resolution;

pub struct DeadlineHandler {
    db: Arc<Db>,
    notifier: Arc<dyn Notifier>,
}

impl DeadlineHandler {
    pub fn new(db: Arc<Db>, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier }
    }
}

#[async_trait]
impl MessageHandler for DeadlineHandler {
    fn queue(&self) -> &'static str {
        DEADLINE_QUEUE
    }

    async fn handle(&self, msg: &PgmqMessage, span: &Span) -> Result<()> {
        // The payload only names the goal; the store decides.
        let deadline = GoalMessage::from_json(&msg.message)?;
        let outcome = GoalOutcome::Expired;
        let resolution = self.db.resolve_goal(deadline.goal_id, outcome).await?;
        record_resolution(
            span,
            &deadline.goal_id.to_string(),
            &outcome.to_string(),
            resolution.is_resolved(),
        );

        match resolution {
            Resolution::Resolved(goal) => {
                notify_best_effort(self.notifier.as_ref(), outcome.into(), &goal).await;
            }
            Resolution::AlreadyResolved(status) => {
                debug!(goal = %deadline.goal_id, %status, "goal already resolved, nothing to expire");
            }
        }
        Ok(())
    }
}
