//! Boundary traits for the external collaborators.
//!
//! The core never opens a socket or a serial port itself. It talks to a
//! [`DaemonLink`] (the MDB daemon's text protocol) and a [`SerialLink`]
//! (raw bytes on a port), and whatever implements them owns the connection
//! lifecycle, the port settings and any framing such as the MDB checksum.
//!
//! Concrete implementations live in `mdblink-transport`; scripted mocks live
//! in `mdblink-test-harness`.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// High-level text channel to the MDB daemon.
#[async_trait]
pub trait DaemonLink: Send + Sync {
    /// Send one command line (e.g. `CashlessReset(1)`) and return the
    /// daemon's full textual reply.
    async fn send_command(&self, command: &str) -> Result<String>;
}

/// Low-level byte channel to a device on a serial port.
#[async_trait]
pub trait SerialLink: Send + Sync {
    /// Write `data` to `port` and collect the bytes that come back.
    ///
    /// Reading stops when no byte arrives within `read_timeout`, or as soon
    /// as `expected_len` bytes have been collected. Silence is an empty
    /// response, not an error.
    async fn send_raw(
        &self,
        port: &str,
        data: &[u8],
        read_timeout: Duration,
        expected_len: Option<usize>,
    ) -> Result<Vec<u8>>;
}
