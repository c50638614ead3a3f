//! mdblink-core: command translation and dispatch for the MDB cashless
//! bridge.
//!
//! Operator text goes in, display text comes out:
//!
//! ```text
//! text -> classify (hex, address) -> Command -> Transport -> Response -> format
//!                                                      \-> CommandLog
//! ```
//!
//! This crate owns no sockets or ports. It reaches the outside world only
//! through the [`DaemonLink`] and [`SerialLink`] traits, implemented by
//! `mdblink-transport` for real hardware and by `mdblink-test-harness` for
//! tests.
//!
//! # Key types
//!
//! - [`Dispatcher`] -- single-flight pipeline for one operator session
//! - [`Command`] -- a classified named command or raw byte run
//! - [`Transport`] -- the daemon and serial dispatch contracts
//! - [`CommandLog`] -- in-memory record of every attempt
//! - [`Error`] / [`Result`] -- error handling

pub mod address;
pub mod command;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod hex;
pub mod link;
pub mod log;
pub mod transport;
pub mod types;

pub use address::Address;
pub use command::{Command, NamedCommand, classify};
pub use dispatch::{DispatchConfig, DispatchOutcome, DispatchState, Dispatcher, OutcomeKind};
pub use error::{Error, Result};
pub use format::{NO_RESPONSE, format_response};
pub use link::{DaemonLink, SerialLink};
pub use log::{CommandLog, LogEntry};
pub use transport::{DEFAULT_DAEMON_TIMEOUT, DaemonTransport, SerialTransport, Transport};
pub use types::{
    DEFAULT_SERIAL_READ_TIMEOUT_MS, DispatchRequest, Response, TransportKind, TransportTarget,
};
