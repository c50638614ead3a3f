//! Error types for mdblink.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Operator-input errors (bad hex, bad
//! address), dispatch errors and transport failures are all captured here.

/// The error type for all mdblink operations.
///
/// The first group of variants is raised while translating operator text
/// into a command; everything from [`Error::Transport`] down to
/// [`Error::Io`] is raised by a daemon or serial collaborator and is
/// reported by [`Error::is_transport`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The operator text contained characters outside `[0-9a-fA-F]` after
    /// stripping whitespace and `0x` markers.
    #[error("invalid hex (use 0-9, A-F, spaces allowed): {0}")]
    InvalidHex(String),

    /// The operator text decoded to zero bytes.
    #[error("no bytes to send")]
    EmptyCommand,

    /// The device address is not a whole number in `0..=255`.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The operator text is not a known command.
    ///
    /// Currently never produced: anything that is not a named command is
    /// tried as hex, so classification fails with [`Error::InvalidHex`]
    /// instead.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A command was handed to a transport that cannot carry it.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Another dispatch is still in flight on this client.
    #[error("a command is already in flight")]
    Busy,

    /// A transport-level error (serial port, TCP socket).
    #[error("transport error: {0}")]
    Transport(String),

    /// Timed out waiting for the daemon or the device.
    #[error("timeout waiting for response")]
    Timeout,

    /// The daemon socket or serial port reported that it is not connected.
    #[error("not connected")]
    NotConnected,

    /// The connection was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error was raised by a transport collaborator rather than
    /// by command translation.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Transport(_)
                | Error::Timeout
                | Error::NotConnected
                | Error::ConnectionLost
                | Error::Io(_)
        )
    }

    /// Render the error the way the operator sees it.
    pub fn display_text(&self) -> String {
        format!("Error: {self}")
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_hex() {
        let e = Error::InvalidHex("G1".into());
        assert_eq!(e.to_string(), "invalid hex (use 0-9, A-F, spaces allowed): G1");
    }

    #[test]
    fn error_display_empty_command() {
        assert_eq!(Error::EmptyCommand.to_string(), "no bytes to send");
    }

    #[test]
    fn error_display_invalid_address() {
        let e = Error::InvalidAddress("256 is out of range 0-255".into());
        assert_eq!(e.to_string(), "invalid address: 256 is out of range 0-255");
    }

    #[test]
    fn error_display_busy() {
        assert_eq!(Error::Busy.to_string(), "a command is already in flight");
    }

    #[test]
    fn display_text_is_prefixed() {
        assert_eq!(Error::Timeout.display_text(), "Error: timeout waiting for response");
        assert_eq!(Error::EmptyCommand.display_text(), "Error: no bytes to send");
    }

    #[test]
    fn transport_family() {
        assert!(Error::Transport("refused".into()).is_transport());
        assert!(Error::Timeout.is_transport());
        assert!(Error::NotConnected.is_transport());
        assert!(Error::ConnectionLost.is_transport());
        assert!(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "x")).is_transport());

        assert!(!Error::InvalidHex("z".into()).is_transport());
        assert!(!Error::EmptyCommand.is_transport());
        assert!(!Error::InvalidAddress("-1".into()).is_transport());
        assert!(!Error::Busy.is_transport());
        assert!(!Error::Unsupported("x".into()).is_transport());
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
