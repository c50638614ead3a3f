//! MdbClientBuilder -- fluent builder for a configured [`Dispatcher`].
//!
//! Collects daemon, serial and log settings before any link is created.
//! [`build`](MdbClientBuilder::build) wires the TCP daemon link and the
//! `tokio-serial` link; [`build_with_links`](MdbClientBuilder::build_with_links)
//! accepts any link implementations, which is how tests plug in mocks.
//!
//! # Example
//!
//! ```no_run
//! use mdblink::{MdbClientBuilder, SerialConfig};
//! use std::time::Duration;
//!
//! # fn example() -> mdblink::Result<()> {
//! let bridge = MdbClientBuilder::new()
//!     .daemon_addr("192.168.1.20:5127")
//!     .daemon_timeout(Some(Duration::from_secs(10)))
//!     .serial_config(SerialConfig::mdb_master())
//!     .serial_read_timeout(Duration::from_millis(500))
//!     .log_capacity(1000)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use mdblink_core::dispatch::{DispatchConfig, Dispatcher};
use mdblink_core::error::{Error, Result};
use mdblink_core::link::{DaemonLink, SerialLink};
use mdblink_core::log::CommandLog;
use mdblink_core::transport::{DEFAULT_DAEMON_TIMEOUT, DaemonTransport, SerialTransport};
use mdblink_core::types::DEFAULT_SERIAL_READ_TIMEOUT_MS;
use mdblink_transport::{DEFAULT_DAEMON_ADDR, SerialConfig, TcpDaemonLink, TokioSerialLink};

/// Fluent builder for a [`Dispatcher`].
///
/// Every setting has a default, so the simplest usage is:
///
/// ```ignore
/// let bridge = MdbClientBuilder::new().build()?;
/// ```
#[derive(Debug, Clone)]
pub struct MdbClientBuilder {
    daemon_addr: String,
    daemon_connect_timeout: Option<Duration>,
    daemon_idle_timeout: Option<Duration>,
    daemon_timeout: Option<Duration>,
    serial_config: SerialConfig,
    serial_read_timeout: Duration,
    expected_len: Option<usize>,
    append_checksum: bool,
    log_capacity: Option<usize>,
}

impl MdbClientBuilder {
    pub fn new() -> Self {
        Self {
            daemon_addr: DEFAULT_DAEMON_ADDR.to_string(),
            daemon_connect_timeout: None,
            daemon_idle_timeout: None,
            daemon_timeout: Some(DEFAULT_DAEMON_TIMEOUT),
            serial_config: SerialConfig::default(),
            serial_read_timeout: Duration::from_millis(DEFAULT_SERIAL_READ_TIMEOUT_MS),
            expected_len: None,
            append_checksum: true,
            log_capacity: None,
        }
    }

    /// Daemon `host:port` (default `localhost:5127`).
    pub fn daemon_addr(mut self, addr: &str) -> Self {
        self.daemon_addr = addr.to_string();
        self
    }

    /// How long to wait for the daemon connection to be established.
    pub fn daemon_connect_timeout(mut self, timeout: Duration) -> Self {
        self.daemon_connect_timeout = Some(timeout);
        self
    }

    /// How long the daemon may stay quiet before its reply is complete.
    pub fn daemon_idle_timeout(mut self, timeout: Duration) -> Self {
        self.daemon_idle_timeout = Some(timeout);
        self
    }

    /// Upper bound on a whole daemon exchange (default 5 s). `None` waits
    /// as long as the link does.
    pub fn daemon_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.daemon_timeout = timeout;
        self
    }

    pub fn serial_config(mut self, config: SerialConfig) -> Self {
        self.serial_config = config;
        self
    }

    /// Shorthand for overriding only the baud rate.
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.serial_config.baud_rate = baud;
        self
    }

    /// Quiet period that ends a serial response (default 300 ms).
    pub fn serial_read_timeout(mut self, timeout: Duration) -> Self {
        self.serial_read_timeout = timeout;
        self
    }

    /// Stop reading a serial response after this many bytes.
    pub fn expected_len(mut self, len: Option<usize>) -> Self {
        self.expected_len = len;
        self
    }

    /// Append the MDB checksum to raw frames (default on).
    pub fn append_checksum(mut self, enabled: bool) -> Self {
        self.append_checksum = enabled;
        self
    }

    /// Keep only the newest `capacity` log entries (at least 1). Unbounded
    /// by default.
    pub fn log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = Some(capacity);
        self
    }

    /// Build a [`Dispatcher`] over caller-provided links.
    ///
    /// Daemon and serial settings that belong to the real links (address,
    /// connect and idle timeouts, port settings, checksum framing) are not
    /// applied here; the caller's links own them.
    pub fn build_with_links<D, S>(self, daemon: D, serial: S) -> Result<Dispatcher>
    where
        D: DaemonLink + 'static,
        S: SerialLink + 'static,
    {
        if self.expected_len == Some(0) {
            return Err(Error::Unsupported(
                "expected_len must be at least 1 byte".into(),
            ));
        }
        if self.log_capacity == Some(0) {
            return Err(Error::Unsupported(
                "log capacity must be at least 1 entry".into(),
            ));
        }

        let serial_read_timeout_ms = u64::try_from(self.serial_read_timeout.as_millis())
            .map_err(|_| Error::Unsupported("serial read timeout is too large".into()))?;

        let daemon = DaemonTransport::new(daemon).with_timeout(self.daemon_timeout);
        let serial = SerialTransport::new(serial);

        let mut dispatcher = Dispatcher::new(Box::new(daemon), Box::new(serial))?.with_config(
            DispatchConfig {
                serial_read_timeout_ms,
                expected_len: self.expected_len,
            },
        );
        if let Some(capacity) = self.log_capacity {
            dispatcher = dispatcher.with_log(CommandLog::with_capacity(capacity));
        }

        tracing::debug!(
            daemon_timeout_ms = self.daemon_timeout.map(|t| t.as_millis() as u64),
            serial_read_timeout_ms,
            expected_len = ?self.expected_len,
            log_capacity = ?self.log_capacity,
            "Dispatcher configured"
        );
        Ok(dispatcher)
    }

    /// Build a [`Dispatcher`] over the TCP daemon link and the serial port
    /// link. Nothing is opened until the first command is dispatched.
    pub fn build(self) -> Result<Dispatcher> {
        let mut daemon = TcpDaemonLink::new(&self.daemon_addr);
        if let Some(timeout) = self.daemon_connect_timeout {
            daemon = daemon.connect_timeout(timeout);
        }
        if let Some(timeout) = self.daemon_idle_timeout {
            daemon = daemon.idle_timeout(timeout);
        }

        let serial =
            TokioSerialLink::new(self.serial_config.clone()).append_checksum(self.append_checksum);

        tracing::debug!(
            daemon = %self.daemon_addr,
            baud_rate = self.serial_config.baud_rate,
            checksum = self.append_checksum,
            "Building MDB bridge"
        );
        self.build_with_links(daemon, serial)
    }
}

impl Default for MdbClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdblink_test_harness::{MockDaemonLink, MockSerialLink};

    #[test]
    fn builder_defaults() {
        let bridge = MdbClientBuilder::new().build().unwrap();
        assert_eq!(bridge.config(), &DispatchConfig::default());
        assert_eq!(bridge.with_log_ref(|log| log.capacity()), None);
    }

    #[test]
    fn builder_fluent_chain() {
        let bridge = MdbClientBuilder::new()
            .daemon_addr("10.0.0.5:5127")
            .daemon_connect_timeout(Duration::from_secs(1))
            .daemon_idle_timeout(Duration::from_millis(250))
            .daemon_timeout(None)
            .serial_config(SerialConfig::mdb_master())
            .baud_rate(38_400)
            .serial_read_timeout(Duration::from_millis(50))
            .expected_len(Some(8))
            .append_checksum(false)
            .log_capacity(16)
            .build()
            .unwrap();

        assert_eq!(bridge.config().serial_read_timeout_ms, 50);
        assert_eq!(bridge.config().expected_len, Some(8));
        assert_eq!(bridge.with_log_ref(|log| log.capacity()), Some(16));
    }

    #[test]
    fn zero_expected_len_is_rejected() {
        let result = MdbClientBuilder::new()
            .expected_len(Some(0))
            .build_with_links(MockDaemonLink::new(), MockSerialLink::new());
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }

    #[test]
    fn zero_log_capacity_is_rejected() {
        let result = MdbClientBuilder::new()
            .log_capacity(0)
            .build_with_links(MockDaemonLink::new(), MockSerialLink::new());
        assert!(matches!(result, Err(Error::Unsupported(ref m)) if m.contains("log capacity")));
    }

    #[test]
    fn build_with_links_applies_dispatch_settings() {
        let bridge = MdbClientBuilder::new()
            .serial_read_timeout(Duration::from_millis(120))
            .build_with_links(MockDaemonLink::new(), MockSerialLink::new())
            .unwrap();
        assert_eq!(bridge.config().serial_read_timeout_ms, 120);
    }
}
