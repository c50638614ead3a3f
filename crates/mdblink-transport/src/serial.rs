//! Serial port link for raw MDB byte exchanges.
//!
//! [`TokioSerialLink`] implements [`SerialLink`] on top of `tokio-serial`.
//! The port is opened for each exchange and closed again when the exchange
//! ends, so the bridge never holds the port between operator submissions.
//!
//! Typical settings:
//! - cashless reader wired directly: 9600 baud, 8 data bits, even parity,
//!   1 stop bit, no flow control ([`SerialConfig::default`])
//! - MDB master RS-232 interface: 115200 baud, 8N1, RTS/CTS
//!   ([`SerialConfig::mdb_master`])
//!
//! # Example
//!
//! ```no_run
//! use mdblink_core::SerialLink;
//! use mdblink_transport::{SerialConfig, TokioSerialLink};
//! use std::time::Duration;
//!
//! # async fn example() -> mdblink_core::Result<()> {
//! let link = TokioSerialLink::new(SerialConfig::mdb_master());
//!
//! // Send a cashless RESET; the checksum byte is appended by the link.
//! let reply = link
//!     .send_raw("/dev/ttyUSB0", &[0x10], Duration::from_millis(300), None)
//!     .await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use mdblink_core::error::{Error, Result};
use mdblink_core::link::SerialLink;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::checksum::with_checksum;

/// Size of a single read from the port.
const READ_CHUNK: usize = 256;

/// Serial port configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Baud rate (typically 9600 to 115200)
    pub baud_rate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Number of stop bits (typically 1)
    pub stop_bits: StopBits,
    /// Parity checking (even or none)
    pub parity: Parity,
    /// Flow control (none, or RTS/CTS on the MDB master interface)
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::Even,
            flow_control: FlowControl::None,
        }
    }
}

impl SerialConfig {
    /// Settings for an MDB master RS-232 interface: 115200 8N1 with
    /// hardware flow control.
    pub fn mdb_master() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::Hardware,
        }
    }
}

/// Data bits per character on the port.
///
/// MDB peripherals and master interfaces use 8. The narrower widths exist
/// for bench adapters that are set up differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    /// MDB framing.
    Eight,
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => tokio_serial::DataBits::Five,
            DataBits::Six => tokio_serial::DataBits::Six,
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

/// Stop bits per character. Both MDB presets use one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

/// Parity bit on each character.
///
/// A directly wired cashless reader is driven at 8E1. The master RS-232
/// interface carries the MDB mode bit itself and runs without parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    /// Used with the MDB master interface.
    None,
    Odd,
    /// Used with a directly wired reader.
    Even,
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// Handshaking between the host and the adapter.
///
/// Software (XON/XOFF) flow control is unsafe for binary MDB frames, since
/// 0x11 and 0x13 are ordinary command bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    /// Directly wired reader.
    None,
    Software,
    /// RTS/CTS, required by the MDB master interface.
    Hardware,
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Software => tokio_serial::FlowControl::Software,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}

/// Serial link that opens the port per exchange.
#[derive(Debug, Clone)]
pub struct TokioSerialLink {
    config: SerialConfig,
    append_checksum: bool,
}

impl TokioSerialLink {
    /// Create a link that appends the MDB checksum to every frame.
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            append_checksum: true,
        }
    }

    /// Enable or disable checksum framing. With framing off the operator's
    /// bytes go out exactly as typed (they must already carry a checksum).
    pub fn append_checksum(mut self, enabled: bool) -> Self {
        self.append_checksum = enabled;
        self
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// The bytes that will actually be written for `data`.
    pub fn frame(&self, data: &[u8]) -> Vec<u8> {
        if self.append_checksum {
            with_checksum(data)
        } else {
            data.to_vec()
        }
    }

    fn open(&self, port: &str) -> Result<SerialStream> {
        let config = &self.config;
        tracing::debug!(
            port = %port,
            baud_rate = config.baud_rate,
            data_bits = ?config.data_bits,
            stop_bits = ?config.stop_bits,
            parity = ?config.parity,
            flow_control = ?config.flow_control,
            "Opening serial port"
        );

        let stream = tokio_serial::new(port, config.baud_rate)
            .data_bits(config.data_bits.into())
            .stop_bits(config.stop_bits.into())
            .parity(config.parity.into())
            .flow_control(config.flow_control.into())
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %port, error = %e, "Failed to open serial port");
                Error::Transport(format!("failed to open port {}: {}", port, e))
            })?;

        tracing::info!(port = %port, baud_rate = config.baud_rate, "Serial port opened");
        Ok(stream)
    }
}

#[async_trait]
impl SerialLink for TokioSerialLink {
    async fn send_raw(
        &self,
        port: &str,
        data: &[u8],
        read_timeout: Duration,
        expected_len: Option<usize>,
    ) -> Result<Vec<u8>> {
        let mut stream = self.open(port)?;

        let frame = self.frame(data);
        tracing::trace!(
            port = %port,
            bytes = frame.len(),
            data = ?frame,
            checksum = self.append_checksum,
            "Sending frame"
        );

        stream.write_all(&frame).await.map_err(|e| {
            tracing::error!(port = %port, error = %e, "Failed to send frame");
            map_io_error(e)
        })?;

        if let Err(e) = stream.flush().await {
            tracing::warn!(port = %port, error = %e, "Failed to flush serial port (continuing anyway)");
        }

        let response = read_response(&mut stream, port, read_timeout, expected_len).await?;

        tracing::trace!(port = %port, bytes = response.len(), data = ?response, "Received response");
        Ok(response)
    }
}

/// Collect bytes until the line goes quiet for `read_timeout`, the port
/// reports end of stream, or `expected_len` bytes have arrived.
async fn read_response(
    stream: &mut SerialStream,
    port: &str,
    read_timeout: Duration,
    expected_len: Option<usize>,
) -> Result<Vec<u8>> {
    let mut response = Vec::new();
    let mut buf = [0u8; READ_CHUNK];

    loop {
        match tokio::time::timeout(read_timeout, stream.read(&mut buf)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => {
                response.extend_from_slice(&buf[..n]);
                if expected_len.is_some_and(|want| response.len() >= want) {
                    break;
                }
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::TimedOut => break,
            Ok(Err(e)) => {
                tracing::error!(port = %port, error = %e, "Failed to read response");
                return Err(map_io_error(e));
            }
            Err(_) => {
                tracing::trace!(
                    port = %port,
                    timeout_ms = read_timeout.as_millis(),
                    received = response.len(),
                    "Read timeout, response complete"
                );
                break;
            }
        }
    }

    Ok(response)
}

/// Map a data-path I/O error to the appropriate [`Error`] variant.
fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::BrokenPipe => Error::ConnectionLost,
        std::io::ErrorKind::NotConnected => Error::NotConnected,
        _ => Error::Io(e),
    }
}


/// Read-loop tests over a pseudo-terminal pair standing in for the adapter.
#[cfg(all(test, unix))]
mod pty_tests {
    use super::*;

    const QUIET: Duration = Duration::from_millis(100);

    fn pair() -> (SerialStream, SerialStream) {
        SerialStream::pair().expect("failed to open pty pair")
    }

    #[tokio::test]
    async fn silent_device_gives_empty_reply() {
        let (mut host, _device) = pair();
        let reply = read_response(&mut host, "pty", QUIET, None).await.unwrap();
        assert!(reply.is_empty());
    }

    #[tokio::test]
    async fn reply_ends_when_line_goes_quiet() {
        let (mut host, mut device) = pair();
        device.write_all(&[0x01, 0x02, 0x03]).await.unwrap();

        let reply = read_response(&mut host, "pty", QUIET, None).await.unwrap();
        assert_eq!(reply, vec![0x01, 0x02, 0x03]);
    }

    #[tokio::test]
    async fn chunks_accumulate() {
        let (mut host, mut device) = pair();
        device.write_all(&[0x00]).await.unwrap();

        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            device.write_all(&[0x01, 0x02]).await.unwrap();
            device
        });

        let reply = read_response(&mut host, "pty", Duration::from_millis(300), None)
            .await
            .unwrap();
        assert_eq!(reply, vec![0x00, 0x01, 0x02]);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn expected_len_stops_reading() {
        let (mut host, mut device) = pair();
        device.write_all(&[0x04, 0x05, 0x06]).await.unwrap();

        // Long enough that only the byte count can end the read in time.
        let read = read_response(&mut host, "pty", Duration::from_secs(10), Some(2));
        let reply = tokio::time::timeout(Duration::from_secs(2), read)
            .await
            .expect("expected_len did not end the read")
            .unwrap();

        assert!(reply.len() >= 2);
        assert!([0x04, 0x05, 0x06].starts_with(&reply));
    }
}
