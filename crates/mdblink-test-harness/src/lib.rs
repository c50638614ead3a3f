//! mdblink-test-harness: mock links and a scripted daemon for testing
//! mdblink without a daemon process or a serial device.
//!
//! - [`MockSerialLink`] and [`MockDaemonLink`] implement the core link
//!   traits with pre-loaded request/response pairs.
//! - [`Gate`] pauses a mock exchange so tests can observe a dispatch while
//!   it is in flight.
//! - [`MockDaemonServer`] is a TCP listener that plays the daemon's line
//!   protocol, for testing `TcpDaemonLink`.

pub mod gate;
pub mod mock_daemon;
pub mod mock_serial;
pub mod mock_tcp;

pub use gate::Gate;
pub use mock_daemon::MockDaemonLink;
pub use mock_serial::{MockSerialLink, SentFrame};
pub use mock_tcp::MockDaemonServer;
