//! Operator text classification.
//!
//! Every submission is either a *named* high-level command for the daemon
//! (currently only the cashless reader reset) or a run of raw bytes for the
//! serial link. [`classify`] decides which, in a fixed order:
//!
//! 1. Named-command match (`CashlessReset`, `cashless_reset(1)`,
//!    `CASHLESS_RESET (7)`, ...). Wins even if the text would also decode
//!    as hex.
//! 2. Hex decode of the whole text.

use std::fmt;

use crate::address::Address;
use crate::error::{Error, Result};
use crate::hex;
use crate::types::TransportKind;

/// Canonical daemon spelling of the cashless reset command.
pub const CASHLESS_RESET: &str = "CashlessReset";

/// A high-level command understood by the MDB daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedCommand {
    /// Canonical command name (e.g. [`CASHLESS_RESET`]).
    pub name: String,
    /// Argument sent on the wire.
    pub arg: Option<u32>,
    /// The integer the operator wrote in parentheses, kept for logging only.
    pub written_arg: Option<u64>,
}

impl NamedCommand {
    /// Canonical text sent to the daemon, e.g. `CashlessReset(1)`.
    pub fn canonical(&self) -> String {
        match self.arg {
            Some(arg) => format!("{}({})", self.name, arg),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for NamedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// A classified operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Named command for the daemon channel.
    Named(NamedCommand),
    /// Raw bytes for the serial channel. Never empty once classified.
    RawBytes(Vec<u8>),
}

impl Command {
    /// The transport contract this command travels over.
    pub fn transport_kind(&self) -> TransportKind {
        match self {
            Command::Named(_) => TransportKind::Daemon,
            Command::RawBytes(_) => TransportKind::Serial,
        }
    }

    /// Text recorded in the command log.
    pub fn log_text(&self) -> String {
        match self {
            Command::Named(named) => named.canonical(),
            Command::RawBytes(bytes) => hex::encode(bytes),
        }
    }
}

/// Build the cashless reset command for a validated address.
pub fn cashless_reset(address: Address) -> Command {
    Command::Named(NamedCommand {
        name: CASHLESS_RESET.to_string(),
        arg: Some(u32::from(address.value())),
        written_arg: None,
    })
}

/// Classify operator text.
///
/// `address` is the raw value of the address field. It is only validated
/// when the text is a named command, and it is always the address that gets
/// dispatched; an integer written in parentheses does not override it.
///
/// # Example
///
/// ```
/// use mdblink_core::command::{Command, classify};
///
/// let cmd = classify("cashless_reset(7)", 1.0).unwrap();
/// assert!(matches!(cmd, Command::Named(ref n) if n.canonical() == "CashlessReset(1)"));
///
/// assert_eq!(classify("1000", 1.0).unwrap(), Command::RawBytes(vec![0x10, 0x00]));
/// ```
pub fn classify(text: &str, address: f64) -> Result<Command> {
    let text = text.trim();

    if let Some(written_arg) = match_cashless_reset(text) {
        let address = Address::validate(address)?;
        if let Some(written) = written_arg {
            if written != u64::from(address.value()) {
                tracing::debug!(
                    written,
                    address = address.value(),
                    "Ignoring written argument; dispatching configured address"
                );
            }
        }
        let mut command = cashless_reset(address);
        if let Command::Named(ref mut named) = command {
            named.written_arg = written_arg;
        }
        tracing::debug!(command = %command.log_text(), "Classified named command");
        return Ok(command);
    }

    let bytes = hex::decode(text)?;
    if bytes.is_empty() {
        return Err(Error::EmptyCommand);
    }
    tracing::debug!(bytes = bytes.len(), "Classified raw byte command");
    Ok(Command::RawBytes(bytes))
}

/// The transport operator text would be dispatched on, without validating
/// it. Used to label log entries for submissions that fail early.
pub fn route(text: &str) -> TransportKind {
    if match_cashless_reset(text.trim()).is_some() {
        TransportKind::Daemon
    } else {
        TransportKind::Serial
    }
}

/// Match `cashless[_]reset[ (N)]`, case-insensitively.
///
/// Returns `None` when the text is not a cashless reset, `Some(None)` for a
/// bare reset and `Some(Some(n))` when an argument was written. An argument
/// too large for `u64` still matches but is dropped.
fn match_cashless_reset(text: &str) -> Option<Option<u64>> {
    let lower = text.to_ascii_lowercase();
    let rest = lower.strip_prefix("cashless")?;
    let rest = rest.strip_prefix('_').unwrap_or(rest);
    let rest = rest.strip_prefix("reset")?.trim_start();

    if rest.is_empty() {
        return Some(None);
    }

    let inner = rest.strip_prefix('(')?.strip_suffix(')')?.trim();
    if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(inner.parse().ok())
}
