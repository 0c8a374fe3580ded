//! Mock SMTP server for exercising the production transport.
//!
//! A deliberately small server: scripted single-line responses per command,
//! optional response delay for timeout injection. No TLS; transport tests
//! run with `TlsMode::None`.
#![allow(dead_code)] // Test utility module - not every helper is used in every test

use std::{net::SocketAddr, time::Duration};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};

/// Scripted `(code, text)` responses for each session phase.
#[derive(Debug, Clone)]
pub struct MockServerConfig {
    pub greeting: (u16, String),
    pub ehlo: (u16, String),
    pub auth: (u16, String),
    pub mail_from: (u16, String),
    pub rcpt_to: (u16, String),
    pub data: (u16, String),
    pub data_end: (u16, String),
    pub quit: (u16, String),
    /// Applied before every response; lets tests trip client timeouts.
    pub response_delay: Option<Duration>,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            greeting: (220, "Mock SMTP Server".to_string()),
            ehlo: (250, "mock.local".to_string()),
            auth: (235, "Authentication successful".to_string()),
            mail_from: (250, "OK".to_string()),
            rcpt_to: (250, "OK".to_string()),
            data: (354, "Start mail input; end with <CRLF>.<CRLF>".to_string()),
            data_end: (250, "OK: Message accepted".to_string()),
            quit: (221, "Bye".to_string()),
            response_delay: None,
        }
    }
}

/// Mock SMTP server listening on an ephemeral local port.
pub struct MockSmtpServer {
    addr: SocketAddr,
}

impl MockSmtpServer {
    pub async fn start(config: MockServerConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle_client(stream, config.clone()));
            }
        });

        Self { addr }
    }

    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.addr.port()
    }
}

async fn handle_client(mut stream: TcpStream, config: MockServerConfig) {
    let (reader, mut writer) = stream.split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    if write_response(&mut writer, config.response_delay, &config.greeting)
        .await
        .is_err()
    {
        return;
    }

    let unknown = (500, "Unknown command".to_string());
    let mut in_data = false;
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }

        if in_data {
            if line.trim_end() == "." {
                in_data = false;
                if write_response(&mut writer, config.response_delay, &config.data_end)
                    .await
                    .is_err()
                {
                    return;
                }
            }
            continue;
        }

        let command = line.trim_end().to_uppercase();
        let response = if command.starts_with("EHLO") || command.starts_with("HELO") {
            &config.ehlo
        } else if command.starts_with("AUTH") {
            &config.auth
        } else if command.starts_with("MAIL") {
            &config.mail_from
        } else if command.starts_with("RCPT") {
            &config.rcpt_to
        } else if command == "DATA" {
            in_data = config.data.0 == 354;
            &config.data
        } else if command == "QUIT" {
            let _ = write_response(&mut writer, config.response_delay, &config.quit).await;
            return;
        } else {
            &unknown
        };

        if write_response(&mut writer, config.response_delay, response)
            .await
            .is_err()
        {
            return;
        }
    }
}

async fn write_response(
    writer: &mut (impl AsyncWriteExt + Unpin),
    delay: Option<Duration>,
    (code, text): &(u16, String),
) -> std::io::Result<()> {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    writer
        .write_all(format!("{code} {text}\r\n").as_bytes())
        .await
}
