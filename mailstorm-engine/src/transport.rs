//! The SMTP transport capability consumed by send workers.
//!
//! Workers drive one [`MailTransport::deliver`] call per attempt; the
//! production [`SmtpTransport`] walks a full session (connect, greet,
//! EHLO, TLS, AUTH, envelope, DATA, QUIT) against the scenario's target,
//! bounding every protocol operation with the timeouts handed in at
//! dispatch time.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use mailstorm_common::{
    scenario::{SmtpConfig, TlsMode},
    tracing,
};
use mailstorm_smtp::{ClientError, SmtpClient};

/// The HELO/EHLO identity presented to the target server.
const HELO_DOMAIN: &str = "mailstorm.local";

/// Envelope for one attempt: sender plus the full RCPT TO list
/// (the distributed recipient group, then any Cc and Bcc addresses).
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from: String,
    pub recipients: Vec<String>,
}

/// Capability set the engine needs from an SMTP collaborator: one complete
/// connect/authenticate/send/quit transaction per attempt.
///
/// Implementations must be cancel-safe: a caller may drop the `deliver`
/// future at any await point, and no state may leak across calls.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Performs one complete send attempt.
    ///
    /// # Errors
    ///
    /// Returns a structured [`ClientError`] identifying the phase that
    /// failed; the engine classifies it, never this trait.
    async fn deliver(
        &self,
        envelope: &Envelope,
        message: &str,
        connect_timeout: Duration,
        send_timeout: Duration,
    ) -> Result<(), ClientError>;
}

/// Production transport: one real SMTP session per attempt.
pub struct SmtpTransport {
    config: SmtpConfig,
}

impl SmtpTransport {
    #[must_use]
    pub const fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Connects, performs the TLS handshake for implicit mode, and reads
    /// the greeting, all within `connect_timeout`.
    async fn open(&self, connect_timeout: Duration) -> Result<SmtpClient, ClientError> {
        let address = self.config.address();

        let mut client = step(
            connect_timeout,
            "connect",
            SmtpClient::connect(&address, self.config.host.clone()),
        )
        .await?
        .accept_invalid_certs(!self.config.verify_cert);

        if self.config.tls == TlsMode::Implicit {
            step(connect_timeout, "TLS handshake", client.upgrade_tls()).await?;
        }

        let greeting = step(connect_timeout, "greeting", client.read_greeting()).await?;
        if !greeting.is_success() {
            return Err(ClientError::SmtpError {
                code: greeting.code,
                message: format!("Server rejected connection: {}", greeting.message()),
            });
        }

        Ok(client)
    }

    async fn transact(
        &self,
        client: &mut SmtpClient,
        envelope: &Envelope,
        message: &str,
        send_timeout: Duration,
    ) -> Result<(), ClientError> {
        let ehlo = step(send_timeout, "EHLO", client.ehlo(HELO_DOMAIN)).await?;
        if !ehlo.is_success() {
            return Err(ClientError::SmtpError {
                code: ehlo.code,
                message: format!("Server rejected EHLO: {}", ehlo.message()),
            });
        }

        if self.config.tls == TlsMode::StartTls {
            let response = step(send_timeout, "STARTTLS", client.starttls()).await?;
            if !response.is_success() {
                return Err(ClientError::TlsError(format!(
                    "Server rejected STARTTLS: {}",
                    response.message()
                )));
            }

            // Re-send EHLO in the fresh TLS session (RFC 3207).
            let ehlo = step(send_timeout, "EHLO", client.ehlo(HELO_DOMAIN)).await?;
            if !ehlo.is_success() {
                return Err(ClientError::SmtpError {
                    code: ehlo.code,
                    message: format!("Server rejected EHLO after STARTTLS: {}", ehlo.message()),
                });
            }
        }

        if let Some(credentials) = &self.config.credentials {
            step(
                send_timeout,
                "AUTH",
                client.auth_plain(&credentials.username, &credentials.password),
            )
            .await?;
        }

        let response = step(
            send_timeout,
            "MAIL FROM",
            client.mail_from(&envelope.from),
        )
        .await?;
        if !response.is_success() {
            return Err(ClientError::SenderRefused {
                code: response.code,
                message: format!("Server rejected MAIL FROM: {}", response.message()),
            });
        }

        for recipient in &envelope.recipients {
            let response = step(send_timeout, "RCPT TO", client.rcpt_to(recipient)).await?;
            if !response.is_success() {
                return Err(ClientError::RecipientRefused {
                    code: response.code,
                    message: format!(
                        "Server rejected RCPT TO {recipient}: {}",
                        response.message()
                    ),
                });
            }
        }

        let response = step(send_timeout, "DATA", client.data()).await?;
        if !(300..400).contains(&response.code) {
            return Err(ClientError::SmtpError {
                code: response.code,
                message: format!("Server rejected DATA: {}", response.message()),
            });
        }

        let response = step(send_timeout, "message data", client.send_data(message)).await?;
        if !response.is_success() {
            return Err(ClientError::SmtpError {
                code: response.code,
                message: format!("Server rejected message data: {}", response.message()),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn deliver(
        &self,
        envelope: &Envelope,
        message: &str,
        connect_timeout: Duration,
        send_timeout: Duration,
    ) -> Result<(), ClientError> {
        let mut client = self.open(connect_timeout).await?;

        let result = self
            .transact(&mut client, envelope, message, send_timeout)
            .await;

        // QUIT is best-effort; a hung or failed close never changes the
        // outcome of a transaction that already completed.
        if let Err(e) = step(send_timeout, "QUIT", client.quit()).await {
            tracing::debug!(server = %self.config.address(), error = %e, "QUIT failed");
        }

        result
    }
}

/// Bounds one protocol operation with a timeout, mapping elapsed timers to
/// [`ClientError::Timeout`].
async fn step<T>(
    limit: Duration,
    what: &str,
    op: impl Future<Output = Result<T, ClientError>> + Send,
) -> Result<T, ClientError> {
    tokio::time::timeout(limit, op)
        .await
        .map_err(|_| ClientError::Timeout(format!("{what} timed out after {limit:?}")))?
}
