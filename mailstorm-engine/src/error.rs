//! Typed error handling for the send engine.
//!
//! Per-attempt failures are values ([`SendResult`](crate::SendResult)), not
//! errors; only run-level conditions surface here.

use thiserror::Error;

use crate::sender::SendResult;

/// Run-level errors returned by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The scenario has no recipients to distribute.
    #[error("Scenario has no recipients")]
    NoRecipients,

    /// The scenario's concurrency shape is invalid.
    #[error("Invalid scenario shape: {0}")]
    InvalidShape(String),

    /// The run was cancelled. Carries the attempts that completed before
    /// the cancellation signal landed, in fan-in order.
    #[error("Run cancelled ({} attempts completed)", completed.len())]
    Cancelled { completed: Vec<SendResult> },

    /// Statistics were requested for an empty result set.
    #[error("Cannot summarize an empty result set")]
    EmptyResults,

    /// A worker task terminated abnormally.
    #[error("Worker task failed: {0}")]
    WorkerPanic(String),
}

impl EngineError {
    /// Returns `true` if this error is a cooperative cancellation rather
    /// than a failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
