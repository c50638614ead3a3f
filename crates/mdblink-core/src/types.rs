//! Shared value types passed between the classifier, dispatcher and
//! transports.

use std::fmt;
use std::time::Duration;

/// Serial read timeout used when the caller does not configure one.
pub const DEFAULT_SERIAL_READ_TIMEOUT_MS: u64 = 300;

/// Which of the two transport contracts handled a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Named commands to the MDB daemon over TCP.
    Daemon,
    /// Raw bytes directly over the serial link.
    Serial,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Daemon => write!(f, "daemon"),
            TransportKind::Serial => write!(f, "serial"),
        }
    }
}

/// Where a single dispatch is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportTarget {
    /// The daemon's single well-known endpoint.
    Daemon,
    /// A serial port, with the per-send read parameters.
    Serial {
        /// Port path (e.g. `/dev/ttyUSB0`, `COM3`).
        port_path: String,
        /// How long the serial collaborator waits for response bytes.
        read_timeout_ms: u64,
        /// Stop reading once this many bytes have arrived.
        expected_len: Option<usize>,
    },
}

impl TransportTarget {
    /// A serial target with the default 300 ms read timeout and no expected
    /// length.
    pub fn serial(port_path: impl Into<String>) -> Self {
        TransportTarget::Serial {
            port_path: port_path.into(),
            read_timeout_ms: DEFAULT_SERIAL_READ_TIMEOUT_MS,
            expected_len: None,
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            TransportTarget::Daemon => TransportKind::Daemon,
            TransportTarget::Serial { .. } => TransportKind::Serial,
        }
    }

    /// Serial read timeout as a [`Duration`]; `None` for the daemon. A zero
    /// timeout falls back to [`DEFAULT_SERIAL_READ_TIMEOUT_MS`].
    pub fn read_timeout(&self) -> Option<Duration> {
        match self {
            TransportTarget::Daemon => None,
            TransportTarget::Serial {
                read_timeout_ms, ..
            } => match *read_timeout_ms {
                0 => Some(Duration::from_millis(DEFAULT_SERIAL_READ_TIMEOUT_MS)),
                ms => Some(Duration::from_millis(ms)),
            },
        }
    }
}

/// A transport's answer to one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Text returned by the daemon (usually JSON lines).
    Text(String),
    /// Bytes read back from the serial link.
    Bytes(Vec<u8>),
}

/// One operator submission, captured once from the input form.
///
/// The dispatcher only ever sees this value; it never reads live form
/// state.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    /// Operator command text, untrimmed.
    pub text: String,
    /// Raw value of the address field. Validated only when a named command
    /// needs it.
    pub address: f64,
    /// Serial port path for raw-byte commands.
    pub port_path: String,
}

impl DispatchRequest {
    pub fn new(text: impl Into<String>, address: f64, port_path: impl Into<String>) -> Self {
        DispatchRequest {
            text: text.into(),
            address,
            port_path: port_path.into(),
        }
    }
}
