//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing or
//! malformed. The resulting `Config` is immutable and handed to each
//! collaborator explicitly. Sensitive values are wrapped in
//! secrecy::SecretString to prevent log leaks.

pub mod secrets;

use crate::error::{Error, Result};
use secrecy::SecretString;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    /// SMTP delivery settings. `None` means mails are rendered and logged only.
    pub smtp: Option<SmtpConfig>,
    /// How long after creation the latest progress record may be undone.
    pub progress_grace: Duration,
    pub worker: WorkerSettings,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from: String,
}

/// Tuning for the queue consumers.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Seconds a read message stays invisible before it is redelivered.
    pub visibility_timeout: i32,
    pub poll_interval: Duration,
    /// Deliveries after which a message that keeps failing is archived.
    pub max_deliveries: i32,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            visibility_timeout: 30,
            poll_interval: Duration::from_millis(1000),
            max_deliveries: 10,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let defaults = WorkerSettings::default();
        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            smtp: SmtpConfig::from_env()?,
            progress_grace: Duration::from_secs(parsed_var("PROGRESS_GRACE_SECS", 60)?),
            worker: WorkerSettings {
                visibility_timeout: parsed_var(
                    "WORKER_VISIBILITY_TIMEOUT_SECS",
                    defaults.visibility_timeout,
                )?,
                poll_interval: Duration::from_millis(parsed_var(
                    "WORKER_POLL_INTERVAL_MS",
                    defaults.poll_interval.as_millis() as u64,
                )?),
                max_deliveries: parsed_var("WORKER_MAX_DELIVERIES", defaults.max_deliveries)?,
            },
        })
    }
}

impl SmtpConfig {
    /// SMTP is enabled by setting `SMTP_HOST`; the rest is then required.
    fn from_env() -> Result<Option<Self>> {
        let Ok(host) = std::env::var("SMTP_HOST") else {
            return Ok(None);
        };
        Ok(Some(Self {
            host,
            port: parsed_var("SMTP_PORT", 587)?,
            username: required_var("SMTP_USERNAME")?,
            password: SecretString::from(required_var("SMTP_PASSWORD")?),
            from: required_var("SMTP_FROM")?,
        }))
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

fn parsed_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("{name}={raw:?} is invalid: {e}"))),
        Err(_) => Ok(default),
    }
}
