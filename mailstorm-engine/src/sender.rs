//! Send orchestration: concurrent workers, fan-in, and cancellation.
//!
//! A [`StressSender`] owns one scenario and a transport. `run_test` spawns
//! exactly `workers` tasks, each of which performs `sends_per_worker`
//! strictly sequential attempts against its slice of the precomputed
//! recipient assignment. Results are concatenated in ascending worker
//! order, worker 0's attempts first; report reproducibility depends on
//! that ordering.
//!
//! Cancellation is cooperative: `cancel` broadcasts a [`Signal`] that every
//! worker observes at its next suspension point. An attempt in flight when
//! the signal lands is abandoned without a result; the run then resolves to
//! [`EngineError::Cancelled`] carrying only fully-completed attempts.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{sync::broadcast, task::JoinSet};

use mailstorm_common::{
    Signal, internal, outgoing, scenario::ScenarioConfig, timeouts::TimeoutSettings,
};
use mailstorm_smtp::MessageBuilder;

use crate::{
    classify::{ErrorCategory, classify},
    distribute::distribute,
    error::EngineError,
    transport::{Envelope, MailTransport, SmtpTransport},
};

/// Outcome of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The message was accepted by the server.
    Success,
    /// The send reached the transport and failed with a classified error.
    Failed,
    /// The attempt could not be dispatched at all (e.g. an unreadable
    /// attachment).
    Error,
}

/// One record per attempted send. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResult {
    pub worker: usize,
    /// Attempt index local to the worker.
    pub attempt: usize,
    /// `worker * sends_per_worker + attempt`; indexes the recipient
    /// assignment.
    pub global_index: usize,
    pub recipients: Vec<String>,
    pub recipient_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub outcome: Outcome,
    pub error: Option<String>,
    pub category: Option<ErrorCategory>,
    pub smtp_code: Option<String>,
}

/// What one worker hands back at fan-in.
struct WorkerReport {
    id: usize,
    results: Vec<SendResult>,
    cancelled: bool,
}

/// One concurrent line of sequential send attempts.
struct SendWorker {
    id: usize,
    scenario: Arc<ScenarioConfig>,
    assignment: Arc<Vec<Vec<String>>>,
    timeouts: Arc<TimeoutSettings>,
    transport: Arc<dyn MailTransport>,
}

impl SendWorker {
    async fn run(self, mut cancel: broadcast::Receiver<Signal>) -> WorkerReport {
        let sends = self.scenario.sends_per_worker;
        let mut results = Vec::with_capacity(sends);

        internal!(level = DEBUG, "Worker {} starting ({} sends)", self.id, sends);

        for attempt in 0..sends {
            let global_index = self.id * sends + attempt;

            tokio::select! {
                result = self.send_one(attempt, global_index) => results.push(result),
                _ = cancel.recv() => {
                    internal!(
                        level = INFO,
                        "Worker {} cancelled during attempt {}",
                        self.id,
                        attempt
                    );
                    return WorkerReport {
                        id: self.id,
                        results,
                        cancelled: true,
                    };
                }
            }

            let delay = self.scenario.send_delay_secs;
            if delay > 0.0 && attempt + 1 < sends {
                tokio::select! {
                    () = tokio::time::sleep(Duration::from_secs_f64(delay)) => {}
                    _ = cancel.recv() => {
                        internal!(level = INFO, "Worker {} cancelled between attempts", self.id);
                        return WorkerReport {
                            id: self.id,
                            results,
                            cancelled: true,
                        };
                    }
                }
            }
        }

        internal!(level = DEBUG, "Worker {} finished", self.id);
        WorkerReport {
            id: self.id,
            results,
            cancelled: false,
        }
    }

    async fn send_one(&self, attempt: usize, global_index: usize) -> SendResult {
        // Live timeouts are read at dispatch, so a mid-run update applies
        // to subsequently dispatched attempts, never one already in flight.
        let connect_timeout = self.timeouts.connect_timeout();
        let send_timeout = self.timeouts.send_timeout();

        let recipients = &self.assignment[global_index];
        let template = &self.scenario.template;

        let started_at = Utc::now();
        let clock = Instant::now();

        let mut result = SendResult {
            worker: self.id,
            attempt,
            global_index,
            recipients: recipients.clone(),
            recipient_count: recipients.len(),
            started_at,
            finished_at: started_at,
            duration_secs: 0.0,
            outcome: Outcome::Error,
            error: None,
            category: None,
            smtp_code: None,
        };

        let message = match self.build_message(recipients).await {
            Ok(message) => message,
            Err(e) => {
                outgoing!(
                    level = ERROR,
                    "Attempt {} could not be dispatched: {}",
                    global_index,
                    e
                );
                result.error = Some(e.to_string());
                result.finished_at = Utc::now();
                result.duration_secs = clock.elapsed().as_secs_f64();
                return result;
            }
        };

        let mut envelope_recipients = recipients.clone();
        envelope_recipients.extend(template.cc.iter().cloned());
        envelope_recipients.extend(template.bcc.iter().cloned());
        let envelope = Envelope {
            from: template.from.clone(),
            recipients: envelope_recipients,
        };

        match self
            .transport
            .deliver(&envelope, &message, connect_timeout, send_timeout)
            .await
        {
            Ok(()) => {
                outgoing!(
                    level = INFO,
                    "Attempt {} delivered to {} recipient(s)",
                    global_index,
                    recipients.len()
                );
                result.outcome = Outcome::Success;
            }
            Err(e) => {
                let (category, smtp_code) = classify(&e);
                outgoing!(
                    level = WARN,
                    "Attempt {} failed: [{}] {}",
                    global_index,
                    category,
                    e
                );
                result.outcome = Outcome::Failed;
                result.error = Some(e.to_string());
                result.category = Some(category);
                result.smtp_code = smtp_code;
            }
        }

        result.finished_at = Utc::now();
        result.duration_secs = clock.elapsed().as_secs_f64();
        result
    }

    async fn build_message(&self, recipients: &[String]) -> mailstorm_smtp::Result<String> {
        let template = &self.scenario.template;

        let mut builder = MessageBuilder::new()
            .from(template.from.as_str())
            .to_multiple(recipients)
            .cc_multiple(&template.cc)
            .subject(template.subject.as_str())
            .body(template.body.as_str());

        for path in &template.attachments {
            builder = builder.attach_file(path).await?;
        }

        builder.build()
    }
}

/// Orchestrates one load-test run: owns the scenario, the live timeout
/// settings, and the transport, and fans worker results back in.
pub struct StressSender {
    scenario: Arc<ScenarioConfig>,
    timeouts: Arc<TimeoutSettings>,
    transport: Arc<dyn MailTransport>,
    cancel: broadcast::Sender<Signal>,
}

impl StressSender {
    #[must_use]
    pub fn new(
        scenario: ScenarioConfig,
        timeouts: Arc<TimeoutSettings>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        let (cancel, _) = broadcast::channel(1);
        Self {
            scenario: Arc::new(scenario),
            timeouts,
            transport,
            cancel,
        }
    }

    /// Builds a sender with the production SMTP transport for the
    /// scenario's target.
    #[must_use]
    pub fn with_smtp_transport(scenario: ScenarioConfig, timeouts: Arc<TimeoutSettings>) -> Self {
        let transport = Arc::new(SmtpTransport::new(scenario.smtp.clone()));
        Self::new(scenario, timeouts, transport)
    }

    #[must_use]
    pub fn scenario(&self) -> &ScenarioConfig {
        &self.scenario
    }

    /// Requests cooperative shutdown of all running workers.
    ///
    /// Returns immediately; the caller must still await the in-flight
    /// [`Self::run_test`], which resolves to [`EngineError::Cancelled`]
    /// once every worker has stopped.
    pub fn cancel(&self) {
        internal!(level = INFO, "Cancellation requested");
        let _ = self.cancel.send(Signal::Shutdown);
    }

    /// Runs the scenario to completion.
    ///
    /// On normal completion returns exactly `workers × sends_per_worker`
    /// results, concatenated in ascending worker order with attempts in
    /// order within each worker.
    ///
    /// # Errors
    ///
    /// Fails fast on configuration errors (no recipients, zero-sized
    /// shape), and resolves to [`EngineError::Cancelled`] after a
    /// cancellation request once all workers have stopped.
    pub async fn run_test(&self) -> Result<Vec<SendResult>, EngineError> {
        let scenario = &self.scenario;

        if scenario.workers == 0 || scenario.sends_per_worker == 0 {
            return Err(EngineError::InvalidShape(format!(
                "workers and sends per worker must be at least 1 (got {}x{})",
                scenario.workers, scenario.sends_per_worker
            )));
        }

        let assignment = Arc::new(distribute(
            &scenario.template.to,
            scenario.total_sends(),
        )?);

        internal!(
            level = INFO,
            "Run '{}' starting: {} workers x {} sends",
            scenario.name,
            scenario.workers,
            scenario.sends_per_worker
        );

        let mut workers = JoinSet::new();
        for id in 0..scenario.workers {
            let worker = SendWorker {
                id,
                scenario: Arc::clone(&self.scenario),
                assignment: Arc::clone(&assignment),
                timeouts: Arc::clone(&self.timeouts),
                transport: Arc::clone(&self.transport),
            };
            let cancel = self.cancel.subscribe();
            workers.spawn(worker.run(cancel));
        }

        let mut per_worker: Vec<Option<Vec<SendResult>>> =
            (0..scenario.workers).map(|_| None).collect();
        let mut cancelled = false;
        let mut panicked: Option<String> = None;

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(report) => {
                    cancelled |= report.cancelled;
                    per_worker[report.id] = Some(report.results);
                }
                Err(e) => {
                    // A worker died; stop the rest and keep draining so no
                    // task outlives the run.
                    panicked = Some(e.to_string());
                    let _ = self.cancel.send(Signal::Shutdown);
                }
            }
        }

        if let Some(reason) = panicked {
            return Err(EngineError::WorkerPanic(reason));
        }

        let results: Vec<SendResult> = per_worker.into_iter().flatten().flatten().collect();

        if cancelled {
            internal!(
                level = INFO,
                "Run '{}' cancelled with {} completed attempts",
                scenario.name,
                results.len()
            );
            return Err(EngineError::Cancelled { completed: results });
        }

        internal!(
            level = INFO,
            "Run '{}' complete: {} attempts",
            scenario.name,
            results.len()
        );
        Ok(results)
    }
}
