//! Scenario configuration: everything one load-test run needs to know
//! about its target, message, and concurrency shape.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How the connection to the target server is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Plain TCP for the whole session.
    None,
    /// Plain TCP upgraded via STARTTLS after the greeting.
    StartTls,
    /// TLS from the first byte (SMTPS).
    #[default]
    Implicit,
}

/// Credentials for SMTP authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Connection settings for the target mail server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,

    #[serde(default)]
    pub tls: TlsMode,

    /// Verify the server certificate. Disable only against test servers
    /// with self-signed certificates.
    #[serde(default = "defaults::verify_cert")]
    pub verify_cert: bool,

    #[serde(default)]
    pub credentials: Option<Credentials>,
}

impl SmtpConfig {
    /// The `host:port` address the client connects to.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The message template every attempt is built from.
///
/// `to` holds the full recipient list; the engine partitions it across
/// attempts. `cc` and `bcc` are added to every attempt's envelope as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,

    #[serde(default)]
    pub cc: Vec<String>,

    #[serde(default)]
    pub bcc: Vec<String>,

    #[serde(default)]
    pub attachments: Vec<PathBuf>,
}

/// A complete, named description of one load-test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub smtp: SmtpConfig,
    pub template: EmailTemplate,

    /// Concurrent send workers. Must be at least 1.
    #[serde(default = "defaults::workers")]
    pub workers: usize,

    /// Sequential sends each worker performs. Must be at least 1.
    #[serde(default = "defaults::sends_per_worker")]
    pub sends_per_worker: usize,

    /// Pause between consecutive sends on one worker, in seconds.
    #[serde(default)]
    pub send_delay_secs: f64,
}

impl ScenarioConfig {
    /// Total number of attempts one run of this scenario dispatches.
    #[must_use]
    pub const fn total_sends(&self) -> usize {
        self.workers * self.sends_per_worker
    }
}

mod defaults {
    pub(super) const fn verify_cert() -> bool {
        true
    }

    pub(super) const fn workers() -> usize {
        1
    }

    pub(super) const fn sends_per_worker() -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn minimal_scenario_json() -> &'static str {
        r#"{
            "name": "smoke",
            "smtp": { "host": "mail.example.com", "port": 465 },
            "template": {
                "subject": "hello",
                "body": "world",
                "from": "sender@example.com",
                "to": ["a@example.com", "b@example.com"]
            }
        }"#
    }

    #[test]
    fn scenario_defaults() {
        let scenario: ScenarioConfig = serde_json::from_str(minimal_scenario_json()).unwrap();

        assert_eq!(scenario.workers, 1);
        assert_eq!(scenario.sends_per_worker, 1);
        assert_eq!(scenario.send_delay_secs, 0.0);
        assert_eq!(scenario.smtp.tls, TlsMode::Implicit);
        assert!(scenario.smtp.verify_cert);
        assert!(scenario.smtp.credentials.is_none());
        assert!(scenario.template.cc.is_empty());
        assert!(scenario.template.attachments.is_empty());
    }

    #[test]
    fn scenario_total_sends() {
        let mut scenario: ScenarioConfig = serde_json::from_str(minimal_scenario_json()).unwrap();
        scenario.workers = 4;
        scenario.sends_per_worker = 25;

        assert_eq!(scenario.total_sends(), 100);
    }

    #[test]
    fn smtp_address() {
        let scenario: ScenarioConfig = serde_json::from_str(minimal_scenario_json()).unwrap();
        assert_eq!(scenario.smtp.address(), "mail.example.com:465");
    }

    #[test]
    fn tls_mode_round_trip() {
        for (mode, text) in [
            (TlsMode::None, "\"none\""),
            (TlsMode::StartTls, "\"starttls\""),
            (TlsMode::Implicit, "\"implicit\""),
        ] {
            assert_eq!(serde_json::to_string(&mode).unwrap(), text);
            assert_eq!(serde_json::from_str::<TlsMode>(text).unwrap(), mode);
        }
    }
}
