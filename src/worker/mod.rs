//! Queue workers.
//!
//! Each queue gets its own sequential [`QueueWorker`]; the deadline and
//! goal-finished workers run side by side and share nothing but the store.

pub mod consumer;
pub mod deadline;
pub mod finished;

pub use consumer::{MessageHandler, QueueWorker};
pub use deadline::DeadlineHandler;
pub use finished::FinishedHandler;
