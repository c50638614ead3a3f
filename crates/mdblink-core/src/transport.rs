//! Transport trait for command dispatch.
//!
//! The [`Transport`] trait hides the two dispatch contracts behind one call,
//! so the dispatcher never branches on how a command travels:
//!
//! - [`DaemonTransport`] renders a named command as canonical text, sends it
//!   over a [`DaemonLink`] and returns [`Response::Text`]. The whole exchange
//!   is bounded by an optional client-side timeout.
//! - [`SerialTransport`] sends raw bytes unmodified over a [`SerialLink`]
//!   with the target's read timeout and returns [`Response::Bytes`].

use async_trait::async_trait;
use std::time::Duration;

use crate::command::Command;
use crate::error::{Error, Result};
use crate::link::{DaemonLink, SerialLink};
use crate::types::{DEFAULT_SERIAL_READ_TIMEOUT_MS, Response, TransportKind, TransportTarget};

/// Client-side bound on a daemon exchange when none is configured.
pub const DEFAULT_DAEMON_TIMEOUT: Duration = Duration::from_secs(5);

/// One of the two dispatch contracts.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Which contract this transport implements.
    fn kind(&self) -> TransportKind;

    /// Send `command` to `target` and wait for the response.
    ///
    /// Returns [`Error::Unsupported`] if the command or target belongs to
    /// the other contract.
    async fn send(&self, target: &TransportTarget, command: &Command) -> Result<Response>;
}

/// Named commands to the MDB daemon.
pub struct DaemonTransport<L> {
    link: L,
    timeout: Option<Duration>,
}

impl<L: DaemonLink> DaemonTransport<L> {
    /// Wrap a daemon link with the default 5 second timeout.
    pub fn new(link: L) -> Self {
        DaemonTransport {
            link,
            timeout: Some(DEFAULT_DAEMON_TIMEOUT),
        }
    }

    /// Bound the whole exchange, or pass `None` to wait as long as the
    /// daemon takes.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn link(&self) -> &L {
        &self.link
    }
}

#[async_trait]
impl<L: DaemonLink> Transport for DaemonTransport<L> {
    fn kind(&self) -> TransportKind {
        TransportKind::Daemon
    }

    async fn send(&self, target: &TransportTarget, command: &Command) -> Result<Response> {
        if target.kind() != TransportKind::Daemon {
            return Err(Error::Unsupported(format!(
                "daemon transport cannot reach a {} target",
                target.kind()
            )));
        }
        let named = match command {
            Command::Named(named) => named,
            Command::RawBytes(_) => {
                return Err(Error::Unsupported(
                    "raw bytes cannot be sent to the daemon".into(),
                ))
            }
        };

        let text = named.canonical();
        tracing::debug!(command = %text, timeout = ?self.timeout, "Sending daemon command");

        let reply = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.link.send_command(&text))
                .await
                .map_err(|_| {
                    tracing::warn!(
                        command = %text,
                        timeout_ms = limit.as_millis(),
                        "Daemon did not answer in time"
                    );
                    Error::Timeout
                })??,
            None => self.link.send_command(&text).await?,
        };

        tracing::debug!(bytes = reply.len(), "Daemon replied");
        Ok(Response::Text(reply))
    }
}

/// Raw bytes over a serial port.
pub struct SerialTransport<L> {
    link: L,
}

impl<L: SerialLink> SerialTransport<L> {
    pub fn new(link: L) -> Self {
        SerialTransport { link }
    }

    pub fn link(&self) -> &L {
        &self.link
    }
}

#[async_trait]
impl<L: SerialLink> Transport for SerialTransport<L> {
    fn kind(&self) -> TransportKind {
        TransportKind::Serial
    }

    async fn send(&self, target: &TransportTarget, command: &Command) -> Result<Response> {
        let (port_path, expected_len) = match target {
            TransportTarget::Serial {
                port_path,
                expected_len,
                ..
            } => (port_path, *expected_len),
            TransportTarget::Daemon => {
                return Err(Error::Unsupported(
                    "serial transport cannot reach the daemon".into(),
                ))
            }
        };
        let bytes = match command {
            Command::RawBytes(bytes) if bytes.is_empty() => return Err(Error::EmptyCommand),
            Command::RawBytes(bytes) => bytes,
            Command::Named(named) => {
                return Err(Error::Unsupported(format!(
                    "named command {named} cannot be sent as raw bytes"
                )))
            }
        };

        let read_timeout = target
            .read_timeout()
            .unwrap_or(Duration::from_millis(DEFAULT_SERIAL_READ_TIMEOUT_MS));

        tracing::debug!(
            port = %port_path,
            bytes = bytes.len(),
            read_timeout_ms = read_timeout.as_millis(),
            expected_len = ?expected_len,
            "Sending raw bytes"
        );

        let reply = self
            .link
            .send_raw(port_path, bytes, read_timeout, expected_len)
            .await?;

        tracing::debug!(port = %port_path, bytes = reply.len(), "Serial replied");
        Ok(Response::Bytes(reply))
    }
}
