//! Send-orchestration and result-analysis engine.
//!
//! Given a [`ScenarioConfig`](mailstorm_common::scenario::ScenarioConfig),
//! the engine partitions the recipient list across `workers ×
//! sends_per_worker` attempts, dispatches the attempts concurrently through
//! an SMTP transport, records one [`SendResult`] per attempt with
//! protocol-level error classification, and aggregates a result set into a
//! [`RunReport`].
//!
//! The engine holds no state of its own beyond a live run: results are
//! returned to the caller, and reports are recomputed on demand.

pub mod classify;
pub mod distribute;
pub mod error;
pub mod report;
pub mod sender;
pub mod transport;

pub use classify::{ErrorCategory, classify};
pub use distribute::distribute;
pub use error::EngineError;
pub use report::{RunReport, summarize};
pub use sender::{Outcome, SendResult, StressSender};
pub use transport::{Envelope, MailTransport, SmtpTransport};
