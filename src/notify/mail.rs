//! SMTP delivery through lettre.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;

use super::{MailTemplates, Notifier, TemplateKind};
use crate::config::SmtpConfig;
use crate::error::{Error, Result};
use crate::model::GoalMessage;

/// Sends goal mails over SMTP.
pub struct MailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    templates: MailTemplates,
}

impl MailNotifier {
    /// Build the transport. Port 465 uses implicit TLS, anything else STARTTLS.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| Error::Config(format!("invalid SMTP host {}: {e}", config.host)))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.expose_secret().to_string(),
            ))
            .build();

        let from = config
            .from
            .parse()
            .map_err(|e| Error::Config(format!("invalid SMTP_FROM {:?}: {e}", config.from)))?;

        Ok(Self {
            transport,
            from,
            templates: MailTemplates::new()?,
        })
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    async fn send(&self, to: &str, kind: TemplateKind, goal: &GoalMessage) -> Result<()> {
        let mail = self.templates.render(kind, goal)?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| Error::Notification(format!("invalid recipient {to:?}: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.html)
            .map_err(|e| Error::Notification(format!("cannot build mail: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| Error::Notification(format!("SMTP send failed: {e}")))?;
        Ok(())
    }
}
