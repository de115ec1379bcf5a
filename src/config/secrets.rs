//! Secret handling utilities.
//!
//! Re-exports secrecy types so callers reading the database URL or SMTP
//! password don't need their own secrecy dependency.

pub use secrecy::{ExposeSecret, SecretString};
