//! TCP link to the MDB daemon.
//!
//! The daemon speaks a line protocol: the client writes one command
//! terminated by `\n` (e.g. `CashlessReset(1)`), and the daemon answers
//! with one or more lines, usually JSON. There is no explicit end-of-reply
//! marker, so [`TcpDaemonLink`] treats the reply as complete when the daemon
//! closes the connection or stays quiet for the idle timeout.
//!
//! A fresh connection is made for every command.
//!
//! # Example
//!
//! ```no_run
//! use mdblink_core::DaemonLink;
//! use mdblink_transport::TcpDaemonLink;
//!
//! # async fn example() -> mdblink_core::Result<()> {
//! let link = TcpDaemonLink::new("localhost:5127");
//! let reply = link.send_command("CashlessReset(1)").await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use mdblink_core::error::{Error, Result};
use mdblink_core::link::DaemonLink;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Where the MDB daemon listens by default.
pub const DEFAULT_DAEMON_ADDR: &str = "localhost:5127";

/// Default connection timeout (5 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default quiet period that ends a reply (1 second).
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Line-protocol client for the MDB daemon.
#[derive(Debug, Clone)]
pub struct TcpDaemonLink {
    addr: String,
    connect_timeout: Duration,
    idle_timeout: Duration,
}

impl TcpDaemonLink {
    /// A link to `addr` (`host:port`) with default timeouts.
    pub fn new(addr: &str) -> Self {
        Self {
            addr: addr.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Maximum time to wait for the connection to be established.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// How long the daemon may stay silent before the reply is considered
    /// complete.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// The `host:port` this link connects to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn connect(&self) -> Result<TcpStream> {
        tracing::debug!(
            addr = %self.addr,
            timeout_ms = self.connect_timeout.as_millis(),
            "Connecting to MDB daemon"
        );

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| {
                tracing::error!(addr = %self.addr, "Daemon connection timed out");
                Error::Timeout
            })?
            .map_err(|e| {
                tracing::error!(addr = %self.addr, error = %e, "Daemon connection failed");
                map_connect_error(e, &self.addr)
            })?;

        // Commands are single short lines.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(
                addr = %self.addr,
                error = %e,
                "Failed to set TCP_NODELAY (continuing anyway)"
            );
        }

        tracing::info!(addr = %self.addr, "Connected to MDB daemon");
        Ok(stream)
    }
}

impl Default for TcpDaemonLink {
    fn default() -> Self {
        Self::new(DEFAULT_DAEMON_ADDR)
    }
}

#[async_trait]
impl DaemonLink for TcpDaemonLink {
    async fn send_command(&self, command: &str) -> Result<String> {
        let mut stream = self.connect().await?;

        let line = format!("{}\n", command.trim());
        tracing::trace!(addr = %self.addr, command = %command.trim(), "TX");

        stream.write_all(line.as_bytes()).await.map_err(|e| {
            tracing::error!(addr = %self.addr, error = %e, "Failed to send command");
            map_io_error(e)
        })?;
        stream.flush().await.map_err(map_io_error)?;

        let mut reader = BufReader::new(stream);
        let mut response = String::new();

        loop {
            let mut line = String::new();
            match tokio::time::timeout(self.idle_timeout, reader.read_line(&mut line)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(_)) => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        tracing::trace!(addr = %self.addr, line = %trimmed, "RX");
                        if !response.is_empty() {
                            response.push('\n');
                        }
                        response.push_str(trimmed);
                    }
                }
                Ok(Err(e)) => {
                    if response.is_empty() {
                        tracing::error!(addr = %self.addr, error = %e, "Failed to read reply");
                        return Err(map_io_error(e));
                    }
                    tracing::warn!(addr = %self.addr, error = %e, "Read error after partial reply");
                    break;
                }
                Err(_) => break,
            }
        }

        if let Err(e) = reader.get_mut().shutdown().await {
            tracing::debug!(addr = %self.addr, error = %e, "Failed to shut down daemon connection");
        }

        if response.is_empty() {
            return Err(Error::Transport(format!(
                "no response from MDB daemon at {} (timeout)",
                self.addr
            )));
        }

        Ok(response)
    }
}

/// Map a connection-time I/O error to the appropriate [`Error`] variant.
fn map_connect_error(e: std::io::Error, addr: &str) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionRefused => Error::Transport(format!(
            "cannot connect to MDB daemon at {} (is the daemon running?): connection refused",
            addr
        )),
        _ => Error::Io(e),
    }
}

/// Map a data-path I/O error to the appropriate [`Error`] variant.
fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::ConnectionAborted => Error::ConnectionLost,
        std::io::ErrorKind::NotConnected => Error::NotConnected,
        _ => Error::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Helper: bind a TcpListener on a random available port and return it
    /// along with its address string.
    async fn test_listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    /// Read one `\n`-terminated line from the client.
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let n = stream.read(&mut byte).await.unwrap();
            if n == 0 || byte[0] == b'\n' {
                break;
            }
            buf.push(byte[0]);
        }
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn command_line_and_multi_line_reply() {
        let (listener, addr) = test_listener().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            stream
                .write_all(b"{\"status\":\"ok\"}\n\n  {\"event\":\"reset\"}  \n")
                .await
                .unwrap();
            request
        });

        let link = TcpDaemonLink::new(&addr);
        let reply = link.send_command("  CashlessReset(1)  ").await.unwrap();
        assert_eq!(reply, "{\"status\":\"ok\"}\n{\"event\":\"reset\"}");
        assert_eq!(server.await.unwrap(), "CashlessReset(1)");
    }

    #[tokio::test]
    async fn reply_ends_on_idle_timeout() {
        let (listener, addr) = test_listener().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_request(&mut stream).await;
            stream.write_all(b"{\"ok\":true}\n").await.unwrap();
            // Keep the connection open without sending anything else.
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let link = TcpDaemonLink::new(&addr).idle_timeout(Duration::from_millis(100));
        let reply = link.send_command("CashlessReset(1)").await.unwrap();
        assert_eq!(reply, "{\"ok\":true}");
        server.abort();
    }

    #[tokio::test]
    async fn silent_daemon_is_an_error() {
        let (listener, addr) = test_listener().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_request(&mut stream).await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let link = TcpDaemonLink::new(&addr).idle_timeout(Duration::from_millis(100));
        let err = link.send_command("CashlessReset(1)").await.unwrap_err();
        match err {
            Error::Transport(msg) => assert!(msg.contains("no response"), "{msg}"),
            other => panic!("expected Transport error, got: {:?}", other),
        }
        server.abort();
    }

    #[tokio::test]
    async fn reset_after_partial_reply_keeps_collected_lines() {
        let (listener, addr) = test_listener().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_request(&mut stream).await;
            stream.write_all(b"{\"ok\":1}\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            // Zero linger turns the close into a reset.
            stream.set_linger(Some(Duration::ZERO)).unwrap();
            drop(stream);
        });

        let link = TcpDaemonLink::new(&addr).idle_timeout(Duration::from_secs(2));
        let reply = link.send_command("CashlessReset(1)").await.unwrap();
        assert_eq!(reply, "{\"ok\":1}");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn closed_without_reply_is_an_error() {
        let (listener, addr) = test_listener().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_request(&mut stream).await;
            drop(stream);
        });

        let link = TcpDaemonLink::new(&addr);
        let result = link.send_command("CashlessReset(1)").await;
        assert!(result.is_err());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connect_refused() {
        // Bind a listener and immediately drop it so the port is not listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = TcpDaemonLink::new(&addr).send_command("CashlessReset(1)").await;
        match result {
            Err(Error::Transport(msg)) => assert!(
                msg.contains("connection refused"),
                "expected 'connection refused' in message, got: {}",
                msg
            ),
            other => panic!("expected Transport error, got: {:?}", other),
        }
    }

    #[test]
    fn io_error_mapping() {
        use std::io::{Error as IoError, ErrorKind};

        for kind in [
            ErrorKind::ConnectionReset,
            ErrorKind::BrokenPipe,
            ErrorKind::ConnectionAborted,
        ] {
            assert!(matches!(map_io_error(IoError::from(kind)), Error::ConnectionLost));
        }
        assert!(matches!(
            map_io_error(IoError::from(ErrorKind::NotConnected)),
            Error::NotConnected
        ));
        assert!(matches!(
            map_io_error(IoError::from(ErrorKind::InvalidData)),
            Error::Io(_)
        ));
    }

    #[test]
    fn default_address() {
        assert_eq!(TcpDaemonLink::default().addr(), "localhost:5127");
    }
}
