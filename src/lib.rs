//! # hon-rs
//!
//! Reading progress and page goals with deadlines, on Postgres + pgmq.
//!
//! A goal resolves exactly once. The progress path resolves it to
//! `finished` when the target page is reached; a delayed pgmq message
//! resolves it to `expired` at the deadline. Both go through one conditional
//! update, so whichever arrives second is a no-op.

pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod notify;
pub mod telemetry;
pub mod worker;
