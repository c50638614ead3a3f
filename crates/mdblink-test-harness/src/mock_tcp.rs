//! Scripted MDB daemon over TCP.
//!
//! [`MockDaemonServer`] listens on a random localhost port and plays the
//! daemon's line protocol: for each expectation it accepts one connection,
//! reads one `\n`-terminated command, checks it, writes the scripted reply
//! and closes the connection. That matches `TcpDaemonLink`, which connects
//! once per command.
//!
//! # Example
//!
//! ```
//! use mdblink_test_harness::MockDaemonServer;
//!
//! # async fn example() -> mdblink_core::Result<()> {
//! let mut server = MockDaemonServer::new().await?;
//! server.expect("CashlessReset(1)", "{\"status\":\"ok\"}\n");
//! let addr = server.addr().to_string();
//! server.start();
//! // ... point a TcpDaemonLink at `addr` ...
//! # Ok(())
//! # }
//! ```

use mdblink_core::error::{Error, Result};
use std::collections::VecDeque;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
struct LineExpectation {
    /// The command line we expect, without the trailing newline.
    command: String,
    /// Raw bytes written back before the connection is closed.
    reply: Vec<u8>,
}

/// A mock MDB daemon for testing the TCP link end to end.
///
/// If a client sends a command that does not match the next expectation,
/// the server stops and [`wait`](MockDaemonServer::wait) reports the
/// mismatch.
pub struct MockDaemonServer {
    addr: String,
    listener: Option<TcpListener>,
    expectations: VecDeque<LineExpectation>,
    server_handle: Option<JoinHandle<std::result::Result<(), String>>>,
}

impl MockDaemonServer {
    /// Bind a new server on a random port. Connections are not accepted
    /// until [`start`](MockDaemonServer::start) is called, but clients may
    /// connect early; they queue in the listener backlog.
    pub async fn new() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| Error::Transport(format!("failed to bind mock daemon: {}", e)))?;
        let addr = listener.local_addr().map_err(Error::Io)?.to_string();

        Ok(Self {
            addr,
            listener: Some(listener),
            expectations: VecDeque::new(),
            server_handle: None,
        })
    }

    /// When a client sends `command`, answer with `reply` and hang up.
    ///
    /// `reply` is written verbatim, so include the line terminators the
    /// daemon would send. An empty reply closes the connection silently.
    pub fn expect(&mut self, command: &str, reply: &str) {
        self.expectations.push_back(LineExpectation {
            command: command.to_string(),
            reply: reply.as_bytes().to_vec(),
        });
    }

    /// The `host:port` the server is listening on.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Spawn the server task. Each expectation is served on its own
    /// connection, in order. Calling `start` twice has no effect.
    pub fn start(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let expectations: Vec<LineExpectation> = self.expectations.drain(..).collect();

        let handle = tokio::spawn(async move {
            for (i, expectation) in expectations.iter().enumerate() {
                let (stream, _) = listener
                    .accept()
                    .await
                    .map_err(|e| format!("expectation {}: failed to accept connection: {}", i, e))?;

                let mut reader = BufReader::new(stream);
                let mut line = String::new();
                let n = reader
                    .read_line(&mut line)
                    .await
                    .map_err(|e| format!("expectation {}: read error: {}", i, e))?;
                if n == 0 {
                    return Err(format!(
                        "expectation {}: client disconnected before sending a command",
                        i
                    ));
                }

                let received = line.trim_end_matches(&['\r', '\n'][..]);
                if received != expectation.command {
                    return Err(format!(
                        "expectation {}: command mismatch: expected {:?}, got {:?}",
                        i, expectation.command, received
                    ));
                }

                let stream = reader.get_mut();
                stream
                    .write_all(&expectation.reply)
                    .await
                    .map_err(|e| format!("expectation {}: write error: {}", i, e))?;
                stream
                    .flush()
                    .await
                    .map_err(|e| format!("expectation {}: flush error: {}", i, e))?;
                // Closing the connection ends the reply.
                let _ = stream.shutdown().await;
            }

            Ok(())
        });

        self.server_handle = Some(handle);
    }

    /// Wait for the server task to finish and return any mismatch.
    ///
    /// Call this after the client has sent every expected command.
    pub async fn wait(self) -> std::result::Result<(), String> {
        if let Some(handle) = self.server_handle {
            handle
                .await
                .map_err(|e| format!("server task panicked: {}", e))?
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdblink_core::link::DaemonLink;
    use mdblink_transport::TcpDaemonLink;

    #[tokio::test]
    async fn serves_one_connection_per_command() {
        let mut server = MockDaemonServer::new().await.unwrap();
        server.expect("CashlessReset(1)", "{\"status\":\"ok\"}\n");
        server.expect("CashlessReset(2)", "{\"status\":\"ok\"}\n{\"event\":\"reset\"}\n");
        let link = TcpDaemonLink::new(server.addr());
        server.start();

        assert_eq!(
            link.send_command("CashlessReset(1)").await.unwrap(),
            "{\"status\":\"ok\"}"
        );
        assert_eq!(
            link.send_command("CashlessReset(2)").await.unwrap(),
            "{\"status\":\"ok\"}\n{\"event\":\"reset\"}"
        );
        server.wait().await.unwrap();
    }

    #[tokio::test]
    async fn mismatch_is_reported() {
        let mut server = MockDaemonServer::new().await.unwrap();
        server.expect("CashlessReset(1)", "ok\n");
        let link = TcpDaemonLink::new(server.addr());
        server.start();

        // The server hangs up without a reply, so the link reports it.
        assert!(link.send_command("CashlessReset(5)").await.is_err());

        let err = server.wait().await.unwrap_err();
        assert!(err.contains("command mismatch"), "{err}");
    }

    #[tokio::test]
    async fn empty_reply_is_no_response() {
        let mut server = MockDaemonServer::new().await.unwrap();
        server.expect("CashlessReset(1)", "");
        let link = TcpDaemonLink::new(server.addr());
        server.start();

        let err = link.send_command("CashlessReset(1)").await.unwrap_err();
        assert!(err.to_string().contains("no response"), "{err}");
        server.wait().await.unwrap();
    }

    #[tokio::test]
    async fn wait_without_start_is_ok() {
        let server = MockDaemonServer::new().await.unwrap();
        assert!(server.wait().await.is_ok());
    }
}
