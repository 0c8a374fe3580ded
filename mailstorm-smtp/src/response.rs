//! SMTP response parsing and representation.

use super::error::{ClientError, Result};

/// A single line in an SMTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLine {
    /// The SMTP status code (e.g., 220, 250, 550).
    pub code: u16,
    /// Whether this is the last line in a multi-line response.
    pub is_last: bool,
    /// The message text following the status code.
    pub message: String,
}

/// A complete SMTP response, which may span multiple lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The SMTP status code.
    pub code: u16,
    /// All message lines in the response.
    pub lines: Vec<String>,
}

impl Response {
    #[must_use]
    pub const fn new(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// The complete message as a single string, lines joined by newlines.
    #[must_use]
    pub fn message(&self) -> String {
        self.lines.join("\n")
    }

    /// Returns `true` for a 2xx code.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code >= 200 && self.code < 300
    }

    /// Returns `true` for a 4xx code.
    #[must_use]
    pub const fn is_temporary_error(&self) -> bool {
        self.code >= 400 && self.code < 500
    }

    /// Returns `true` for a 5xx code.
    #[must_use]
    pub const fn is_permanent_error(&self) -> bool {
        self.code >= 500 && self.code < 600
    }

    /// Returns `true` for any 4xx or 5xx code.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.is_temporary_error() || self.is_permanent_error()
    }

    /// Parses a single response line.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ParseError` if the line doesn't match SMTP
    /// format.
    pub fn parse_line(line: &str) -> Result<ResponseLine> {
        if line.len() < 3 {
            return Err(ClientError::ParseError(format!(
                "Response line too short: '{line}'"
            )));
        }

        let code_str = &line[..3];
        let code = code_str
            .parse::<u16>()
            .map_err(|_| ClientError::ParseError(format!("Invalid status code: '{code_str}'")))?;

        // A space after the code terminates the response, a dash continues it.
        let is_last = match line.as_bytes().get(3) {
            Some(b' ') | None => true,
            Some(b'-') => false,
            Some(&c) => {
                return Err(ClientError::ParseError(format!(
                    "Invalid separator character: '{}'",
                    c as char
                )));
            }
        };

        let message = line.get(4..).unwrap_or_default().to_string();

        Ok(ResponseLine {
            code,
            is_last,
            message,
        })
    }

    /// Parses a complete multi-line SMTP response from a buffer.
    ///
    /// Returns the parsed `Response` and the number of bytes consumed, or
    /// `None` when the buffer does not yet hold a full response.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ParseError` if the response is malformed.
    pub fn parse_response(buffer: &[u8]) -> Result<Option<(Self, usize)>> {
        let text = std::str::from_utf8(buffer)?;

        let mut lines = Vec::new();
        let mut consumed = 0;
        let mut first_code: Option<u16> = None;
        let mut rest = text;

        loop {
            let Some(end) = rest.find('\n') else {
                return Ok(None); // need more data
            };
            let raw = &rest[..end];
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            consumed += end + 1;
            rest = &rest[end + 1..];

            if line.is_empty() {
                continue;
            }

            let parsed = Self::parse_line(line)?;
            let code = *first_code.get_or_insert(parsed.code);
            if parsed.code != code {
                return Err(ClientError::ParseError(format!(
                    "Status code mismatch in multi-line response: expected {code}, got {}",
                    parsed.code
                )));
            }

            lines.push(parsed.message);

            if parsed.is_last {
                return Ok(Some((Self::new(code, lines), consumed)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_line() {
        let line = ResponseLine {
            code: 220,
            is_last: true,
            message: "mail.example.com ESMTP".to_string(),
        };
        assert_eq!(
            Response::parse_line("220 mail.example.com ESMTP").unwrap(),
            line
        );
    }

    #[test]
    fn parse_continuation_line() {
        let line = ResponseLine {
            code: 250,
            is_last: false,
            message: "mail.example.com".to_string(),
        };
        assert_eq!(Response::parse_line("250-mail.example.com").unwrap(), line);
    }

    #[test]
    fn parse_bare_code() {
        let line = Response::parse_line("354").unwrap();
        assert!(line.is_last);
        assert_eq!(line.code, 354);
        assert_eq!(line.message, "");
    }

    #[test]
    fn parse_complete_response() {
        let data = b"250 OK\r\n";
        let (response, consumed) = Response::parse_response(data).unwrap().unwrap();
        assert_eq!(response.code, 250);
        assert_eq!(response.lines, vec!["OK"]);
        assert_eq!(consumed, 8);
    }

    #[test]
    fn parse_multi_line_response() {
        let data = b"250-mail.example.com\r\n250-SIZE 10000000\r\n250 HELP\r\n";
        let (response, consumed) = Response::parse_response(data).unwrap().unwrap();
        assert_eq!(response.code, 250);
        assert_eq!(
            response.lines,
            vec!["mail.example.com", "SIZE 10000000", "HELP"]
        );
        assert_eq!(consumed, 51);
    }

    #[test]
    fn parse_incomplete_response() {
        let data = b"250-mail.example.com\r\n250-SIZE";
        let result = Response::parse_response(data).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn parse_mismatched_codes() {
        let data = b"250-mail.example.com\r\n550 nope\r\n";
        assert!(matches!(
            Response::parse_response(data),
            Err(ClientError::ParseError(_))
        ));
    }

    #[test]
    fn success_and_error_predicates() {
        let ok = Response::new(250, vec!["OK".to_string()]);
        assert!(ok.is_success());
        assert!(!ok.is_error());

        let rejected = Response::new(550, vec!["Error".to_string()]);
        assert!(rejected.is_permanent_error());
        assert!(rejected.is_error());
        assert!(!rejected.is_success());

        let busy = Response::new(421, vec!["Busy".to_string()]);
        assert!(busy.is_temporary_error());
        assert!(busy.is_error());
    }
}
