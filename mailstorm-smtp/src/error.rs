//! Error types for the SMTP client.
//!
//! Variants are structural: the engine's classifier dispatches on which
//! phase of the session raised the failure before it ever looks at a
//! status code, so refusals carry their phase here rather than being
//! collapsed into a generic protocol error.

use std::io;

use thiserror::Error;

/// Errors that can occur when using the SMTP client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// IO error occurred during network operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// An operation did not complete within its configured timeout.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The server rejected authentication.
    #[error("Authentication failed: {code} - {message}")]
    Auth { code: u16, message: String },

    /// The server refused a RCPT TO address.
    #[error("Recipient refused: {code} - {message}")]
    RecipientRefused { code: u16, message: String },

    /// The server refused the MAIL FROM address.
    #[error("Sender refused: {code} - {message}")]
    SenderRefused { code: u16, message: String },

    /// The server returned an error status code outside the phases above.
    #[error("SMTP error: {code} - {message}")]
    SmtpError { code: u16, message: String },

    /// TLS/SSL error occurred.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// Failed to parse an SMTP response from the server.
    #[error("Failed to parse SMTP response: {0}")]
    ParseError(String),

    /// The message could not be built (missing field, unreadable file).
    #[error("Invalid message: {0}")]
    BuilderError(String),

    /// Connection was closed unexpectedly.
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

/// Specialized `Result` type for SMTP client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
