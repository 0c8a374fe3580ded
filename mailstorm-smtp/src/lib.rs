//! SMTP client for dispatching load-test messages.
//!
//! This crate is the wire-protocol collaborator of the send engine: it
//! knows how to open a session (plain TCP, implicit TLS, or STARTTLS),
//! authenticate, and walk a message through the envelope and DATA phases.
//! It deliberately knows nothing about workers, scheduling, or result
//! accounting.
//!
//! # Examples
//!
//! ```no_run
//! use mailstorm_smtp::{MessageBuilder, SmtpClient};
//!
//! # async fn example() -> mailstorm_smtp::Result<()> {
//! let message = MessageBuilder::new()
//!     .from("sender@example.com")
//!     .to("recipient@example.com")
//!     .subject("Hello")
//!     .body("This is the message body")
//!     .build()?;
//!
//! let mut client = SmtpClient::connect("127.0.0.1:2525", "localhost".to_string()).await?;
//! client.read_greeting().await?;
//! client.ehlo("loadgen.local").await?;
//! client.mail_from("sender@example.com").await?;
//! client.rcpt_to("recipient@example.com").await?;
//! client.data().await?;
//! client.send_data(&message).await?;
//! client.quit().await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod message;
mod response;

pub use client::SmtpClient;
pub use error::{ClientError, Result};
pub use message::{Attachment, MessageBuilder};
pub use response::{Response, ResponseLine};
