//! Failure classification for send attempts.
//!
//! Classification inspects the structural kind of a failure first and only
//! falls back to status-code inference for generic protocol responses: a
//! refused recipient stays [`ErrorCategory::Recipient`] whatever code the
//! server attached.

use std::fmt;

use mailstorm_smtp::ClientError;
use serde::{Deserialize, Serialize};

/// Closed set of failure categories reported per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    Authentication,
    Connection,
    ProtocolSmtp,
    Tls,
    RateLimit,
    Recipient,
    Other,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Authentication => "Authentication Error",
            Self::Connection => "Connection Error",
            Self::ProtocolSmtp => "SMTP Protocol Error",
            Self::Tls => "TLS Error",
            Self::RateLimit => "Rate Limit Error",
            Self::Recipient => "Recipient Error",
            Self::Other => "Other Error",
        })
    }
}

/// Maps a send failure to a category and, where the server supplied one,
/// the SMTP status code.
#[must_use]
pub fn classify(error: &ClientError) -> (ErrorCategory, Option<String>) {
    match error {
        ClientError::Auth { code, .. } => {
            (ErrorCategory::Authentication, Some(code.to_string()))
        }

        ClientError::Io(_) | ClientError::Timeout(_) | ClientError::ConnectionClosed => {
            (ErrorCategory::Connection, None)
        }

        ClientError::RecipientRefused { code, .. } => {
            (ErrorCategory::Recipient, Some(code.to_string()))
        }

        ClientError::SenderRefused { code, .. } => {
            (ErrorCategory::ProtocolSmtp, Some(code.to_string()))
        }

        ClientError::TlsError(_) => (ErrorCategory::Tls, None),

        ClientError::SmtpError { code, .. } => {
            let category = match code {
                421 | 451 | 554 => ErrorCategory::RateLimit,
                550 | 553 => ErrorCategory::Recipient,
                _ => ErrorCategory::ProtocolSmtp,
            };
            (category, Some(code.to_string()))
        }

        ClientError::ParseError(_)
        | ClientError::BuilderError(_)
        | ClientError::Utf8Error(_) => (ErrorCategory::Other, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp_error(code: u16) -> ClientError {
        ClientError::SmtpError {
            code,
            message: "response".to_string(),
        }
    }

    #[test]
    fn auth_failures_carry_their_code() {
        let error = ClientError::Auth {
            code: 535,
            message: "Authentication credentials invalid".to_string(),
        };
        assert_eq!(
            classify(&error),
            (ErrorCategory::Authentication, Some("535".to_string()))
        );
    }

    #[test]
    fn network_failures_have_no_code() {
        let io = ClientError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert_eq!(classify(&io), (ErrorCategory::Connection, None));

        let timed_out = ClientError::Timeout("connect timed out".to_string());
        assert_eq!(classify(&timed_out), (ErrorCategory::Connection, None));

        assert_eq!(
            classify(&ClientError::ConnectionClosed),
            (ErrorCategory::Connection, None)
        );
    }

    #[test]
    fn structural_refusals_beat_code_inference() {
        // A refused recipient with a 554 code is still a recipient error,
        // not a rate-limit one.
        let error = ClientError::RecipientRefused {
            code: 554,
            message: "No valid recipients".to_string(),
        };
        assert_eq!(
            classify(&error),
            (ErrorCategory::Recipient, Some("554".to_string()))
        );

        let error = ClientError::SenderRefused {
            code: 550,
            message: "Sender rejected".to_string(),
        };
        assert_eq!(
            classify(&error),
            (ErrorCategory::ProtocolSmtp, Some("550".to_string()))
        );
    }

    #[test]
    fn tls_failures_have_no_code() {
        let error = ClientError::TlsError("handshake failed".to_string());
        assert_eq!(classify(&error), (ErrorCategory::Tls, None));
    }

    #[test]
    fn generic_responses_fall_back_to_code_inference() {
        for code in [421, 451, 554] {
            assert_eq!(
                classify(&smtp_error(code)),
                (ErrorCategory::RateLimit, Some(code.to_string()))
            );
        }
        for code in [550, 553] {
            assert_eq!(
                classify(&smtp_error(code)),
                (ErrorCategory::Recipient, Some(code.to_string()))
            );
        }
        for code in [450, 452, 500, 552] {
            assert_eq!(
                classify(&smtp_error(code)),
                (ErrorCategory::ProtocolSmtp, Some(code.to_string()))
            );
        }
    }

    #[test]
    fn code_buckets_are_mutually_exclusive() {
        for code in 400..600 {
            let (category, _) = classify(&smtp_error(code));
            let buckets = [
                matches!(category, ErrorCategory::RateLimit),
                matches!(category, ErrorCategory::Recipient),
                matches!(category, ErrorCategory::ProtocolSmtp),
            ];
            assert_eq!(
                buckets.iter().filter(|b| **b).count(),
                1,
                "code {code} landed in {category:?}"
            );
        }
    }

    #[test]
    fn everything_else_is_other() {
        let error = ClientError::ParseError("garbage".to_string());
        assert_eq!(classify(&error), (ErrorCategory::Other, None));

        let error = ClientError::BuilderError("missing file".to_string());
        assert_eq!(classify(&error), (ErrorCategory::Other, None));
    }

    #[test]
    fn display_labels() {
        assert_eq!(ErrorCategory::Authentication.to_string(), "Authentication Error");
        assert_eq!(ErrorCategory::ProtocolSmtp.to_string(), "SMTP Protocol Error");
        assert_eq!(ErrorCategory::RateLimit.to_string(), "Rate Limit Error");
    }
}
