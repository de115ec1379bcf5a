//! Goal notifications.
//!
//! A [`Notifier`] turns a resolved goal into a mail. Delivery is best-effort:
//! callers log failures and move on, the goal's status is already committed.

pub mod mail;
pub mod template;

pub use mail::MailNotifier;
pub use template::{MailTemplates, RenderedMail};

use async_trait::async_trait;
use opentelemetry::KeyValue;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::model::{GoalMessage, GoalOutcome};
use crate::telemetry::metrics;

/// Which mail to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateKind {
    GoalFinished,
    GoalExpired,
}

impl TemplateKind {
    pub fn subject(self) -> &'static str {
        match self {
            TemplateKind::GoalFinished => "Hon Goal Completed",
            TemplateKind::GoalExpired => "Hon Goal Expired",
        }
    }
}

impl From<GoalOutcome> for TemplateKind {
    fn from(outcome: GoalOutcome) -> Self {
        match outcome {
            GoalOutcome::Finished => TemplateKind::GoalFinished,
            GoalOutcome::Expired => TemplateKind::GoalExpired,
        }
    }
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TemplateKind::GoalFinished => "goal-finished",
            TemplateKind::GoalExpired => "goal-expired",
        };
        write!(f, "{s}")
    }
}

/// Sends a rendered goal mail to one recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, kind: TemplateKind, goal: &GoalMessage) -> Result<()>;
}

/// Send and swallow the error. Returns whether the mail went out.
pub async fn notify_best_effort(
    notifier: &dyn Notifier,
    kind: TemplateKind,
    goal: &GoalMessage,
) -> bool {
    let result = notifier.send(&goal.email, kind, goal).await;
    let sent = result.is_ok();
    metrics::notifications().add(
        1,
        &[
            KeyValue::new("kind", kind.to_string()),
            KeyValue::new("result", if sent { "sent" } else { "error" }),
        ],
    );
    match result {
        Ok(()) => info!(goal = %goal.goal_id, %kind, "notification sent"),
        Err(e) => warn!(goal = %goal.goal_id, %kind, "notification failed: {e}"),
    }
    sent
}

/// Renders mails and logs them instead of sending. Used when SMTP is not
/// configured.
pub struct LogNotifier {
    templates: MailTemplates,
}

impl LogNotifier {
    pub fn new() -> Result<Self> {
        Ok(Self {
            templates: MailTemplates::new()?,
        })
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, kind: TemplateKind, goal: &GoalMessage) -> Result<()> {
        let mail = self.templates.render(kind, goal)?;
        info!(
            to,
            subject = mail.subject,
            body_len = mail.html.len(),
            "mail rendered, not sent (SMTP disabled)"
        );
        Ok(())
    }
}
