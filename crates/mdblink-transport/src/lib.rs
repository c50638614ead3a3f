//! Link implementations for mdblink.
//!
//! This crate provides concrete implementations of the boundary traits from
//! `mdblink-core`:
//!
//! - [`TcpDaemonLink`]: the MDB daemon's newline-delimited text protocol on
//!   TCP (default `localhost:5127`)
//! - [`TokioSerialLink`]: raw bytes on a serial port, with optional MDB
//!   checksum framing
//!
//! # Example
//!
//! ```no_run
//! use mdblink_core::{DaemonLink, SerialLink};
//! use mdblink_transport::{SerialConfig, TcpDaemonLink, TokioSerialLink};
//! use std::time::Duration;
//!
//! # async fn example() -> mdblink_core::Result<()> {
//! let daemon = TcpDaemonLink::new("localhost:5127");
//! let reply = daemon.send_command("CashlessReset(1)").await?;
//!
//! let serial = TokioSerialLink::new(SerialConfig::default());
//! let bytes = serial
//!     .send_raw("/dev/ttyUSB0", &[0x10], Duration::from_millis(300), None)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod serial;
pub mod tcp;

pub use checksum::{mdb_checksum, with_checksum};
pub use serial::{DataBits, FlowControl, Parity, SerialConfig, StopBits, TokioSerialLink};
pub use tcp::{DEFAULT_DAEMON_ADDR, TcpDaemonLink};
