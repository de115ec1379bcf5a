//! Mail templates, rendered with minijinja.

use minijinja::Environment;

use super::TemplateKind;
use crate::error::{Error, Result};
use crate::model::GoalMessage;

const GOAL_FINISHED: &str = include_str!("templates/goal_finished.html");
const GOAL_EXPIRED: &str = include_str!("templates/goal_expired.html");

/// A mail ready to send.
#[derive(Debug, Clone)]
pub struct RenderedMail {
    pub subject: &'static str,
    pub html: String,
}

/// The compiled template set.
pub struct MailTemplates {
    env: Environment<'static>,
}

impl MailTemplates {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        // The .html names turn on HTML autoescaping for goal and book names.
        env.add_template(template_name(TemplateKind::GoalFinished), GOAL_FINISHED)
            .map_err(|e| Error::Notification(format!("template parse error: {e}")))?;
        env.add_template(template_name(TemplateKind::GoalExpired), GOAL_EXPIRED)
            .map_err(|e| Error::Notification(format!("template parse error: {e}")))?;
        Ok(Self { env })
    }

    pub fn render(&self, kind: TemplateKind, goal: &GoalMessage) -> Result<RenderedMail> {
        let html = self
            .env
            .get_template(template_name(kind))
            .and_then(|tmpl| tmpl.render(goal))
            .map_err(|e| Error::Notification(format!("template render error: {e}")))?;
        Ok(RenderedMail {
            subject: kind.subject(),
            html,
        })
    }
}

fn template_name(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::GoalFinished => "goal_finished.html",
        TemplateKind::GoalExpired => "goal_expired.html",
    }
}
