//! # mdblink -- operator command bridge for MDB cashless readers
//!
//! `mdblink` turns a line of operator text into a request to a vending
//! machine's cashless payment reader. Named commands such as
//! `CashlessReset(1)` go to the MDB daemon over its TCP line protocol; any
//! other text is decoded as hex and written to a serial port as raw MDB
//! bytes. Every attempt, successful or not, lands in a session log.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mdblink::{DispatchRequest, MdbClientBuilder};
//!
//! # async fn example() -> mdblink::Result<()> {
//! let bridge = MdbClientBuilder::new()
//!     .daemon_addr("localhost:5127")
//!     .build()?;
//!
//! let outcome = bridge
//!     .dispatch(DispatchRequest::new("CashlessReset(1)", 1.0, "/dev/ttyUSB0"))
//!     .await;
//! println!("{}", outcome.display);
//!
//! // Raw MDB bytes: cashless RESET, checksum appended by the serial link.
//! let outcome = bridge
//!     .dispatch(DispatchRequest::new("10", 1.0, "/dev/ttyUSB0"))
//!     .await;
//! println!("{}", outcome.display);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Crate                  | Purpose                                         |
//! |------------------------|-------------------------------------------------|
//! | `mdblink-core`         | Classification, hex codec, dispatcher, log, errors |
//! | `mdblink-transport`    | TCP daemon link, serial link, MDB checksum      |
//! | `mdblink-test-harness` | Mock links and a scripted daemon server         |
//! | **`mdblink`**          | This facade crate -- re-exports and the builder |
//!
//! The [`Dispatcher`] only ever talks to the two link traits,
//! [`DaemonLink`] and [`SerialLink`], so tests swap in mocks through
//! [`MdbClientBuilder::build_with_links`].

pub mod builder;

pub use builder::MdbClientBuilder;
pub use mdblink_core::*;
pub use mdblink_transport::{
    DEFAULT_DAEMON_ADDR, DataBits, FlowControl, Parity, SerialConfig, StopBits, TcpDaemonLink,
    TokioSerialLink, mdb_checksum, with_checksum,
};
