//! Single-flight command dispatcher.
//!
//! [`Dispatcher`] is the whole translation pipeline for one operator
//! session: classify the submitted text, route the command to the daemon or
//! serial [`Transport`], format the response and append a [`LogEntry`].
//!
//! Each attempt moves `Idle -> Sending -> Completed | Failed -> Idle`. Only
//! one attempt may be `Sending` at a time; a submission that arrives while
//! another is in flight is rejected with [`Error::Busy`] (never queued) and
//! logged like any other failure. Errors never escape [`Dispatcher::dispatch`]:
//! they come back as an `Error: ...` display string.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::address::Address;
use crate::command::{self, Command};
use crate::error::{Error, Result};
use crate::format::format_response;
use crate::log::{CommandLog, LogEntry};
use crate::transport::Transport;
use crate::types::{
    DEFAULT_SERIAL_READ_TIMEOUT_MS, DispatchRequest, Response, TransportKind, TransportTarget,
};

/// Per-send serial parameters applied to every raw-byte dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Serial read timeout (default 300 ms).
    pub serial_read_timeout_ms: u64,
    /// Stop reading after this many bytes (default: read until timeout).
    pub expected_len: Option<usize>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            serial_read_timeout_ms: DEFAULT_SERIAL_READ_TIMEOUT_MS,
            expected_len: None,
        }
    }
}

/// Whether a dispatch is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Sending,
}

/// How a dispatch attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Completed,
    Failed,
}

/// The result of one dispatch attempt as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub kind: OutcomeKind,
    pub transport_kind: TransportKind,
    /// Formatted response, or `Error: ...`.
    pub display: String,
}

impl DispatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.kind == OutcomeKind::Completed
    }
}

/// Clears the in-flight flag when the attempt ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Routes classified commands to the daemon or serial transport.
pub struct Dispatcher {
    daemon: Box<dyn Transport>,
    serial: Box<dyn Transport>,
    config: DispatchConfig,
    in_flight: AtomicBool,
    log: Mutex<CommandLog>,
}

impl Dispatcher {
    /// Create a dispatcher over the two transports with default settings and
    /// an unbounded log.
    ///
    /// Returns [`Error::Unsupported`] if a transport is passed in the wrong
    /// slot.
    pub fn new(daemon: Box<dyn Transport>, serial: Box<dyn Transport>) -> Result<Self> {
        if daemon.kind() != TransportKind::Daemon {
            return Err(Error::Unsupported(format!(
                "expected a daemon transport, got {}",
                daemon.kind()
            )));
        }
        if serial.kind() != TransportKind::Serial {
            return Err(Error::Unsupported(format!(
                "expected a serial transport, got {}",
                serial.kind()
            )));
        }
        Ok(Dispatcher {
            daemon,
            serial,
            config: DispatchConfig::default(),
            in_flight: AtomicBool::new(false),
            log: Mutex::new(CommandLog::new()),
        })
    }

    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the session log (e.g. with a bounded one).
    pub fn with_log(mut self, log: CommandLog) -> Self {
        self.log = Mutex::new(log);
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn state(&self) -> DispatchState {
        if self.in_flight.load(Ordering::Acquire) {
            DispatchState::Sending
        } else {
            DispatchState::Idle
        }
    }

    /// Classify, send and log one operator submission.
    ///
    /// Never fails: errors are rendered into the outcome's display string.
    pub async fn dispatch(&self, request: DispatchRequest) -> DispatchOutcome {
        let route = command::route(&request.text);
        let mut command_text = request.text.trim().to_string();

        let result = match self.begin() {
            Some(_in_flight) => match command::classify(&request.text, request.address) {
                Ok(command) => {
                    command_text = command.log_text();
                    self.send(&command, &request.port_path).await
                }
                Err(e) => Err(e),
            },
            None => Err(Error::Busy),
        };

        self.finish(route, command_text, result)
    }

    /// Reset the cashless reader at `address` through the daemon.
    pub async fn reset_cashless_device(&self, address: Address) -> DispatchOutcome {
        let command = command::cashless_reset(address);
        let command_text = command.log_text();

        let result = match self.begin() {
            Some(_in_flight) => self.send(&command, "").await,
            None => Err(Error::Busy),
        };

        self.finish(TransportKind::Daemon, command_text, result)
    }

    /// Snapshot of the session log in arrival order.
    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.lock_log().entries().cloned().collect()
    }

    /// Run `f` against the session log without cloning it.
    pub fn with_log_ref<R>(&self, f: impl FnOnce(&CommandLog) -> R) -> R {
        f(&self.lock_log())
    }

    fn begin(&self) -> Option<InFlight<'_>> {
        match self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                tracing::debug!("Dispatch state Idle -> Sending");
                Some(InFlight(&self.in_flight))
            }
            Err(_) => {
                tracing::warn!("Rejecting submission: a command is already in flight");
                None
            }
        }
    }

    async fn send(&self, command: &Command, port_path: &str) -> Result<Response> {
        let (transport, target) = match command.transport_kind() {
            TransportKind::Daemon => (&self.daemon, TransportTarget::Daemon),
            TransportKind::Serial => (
                &self.serial,
                TransportTarget::Serial {
                    port_path: port_path.to_string(),
                    read_timeout_ms: self.config.serial_read_timeout_ms,
                    expected_len: self.config.expected_len,
                },
            ),
        };
        transport.send(&target, command).await
    }

    fn finish(
        &self,
        transport_kind: TransportKind,
        command_text: String,
        result: Result<Response>,
    ) -> DispatchOutcome {
        let (kind, display) = match result {
            Ok(response) => {
                tracing::debug!(transport = %transport_kind, "Dispatch completed");
                (OutcomeKind::Completed, format_response(&response))
            }
            Err(e) => {
                tracing::warn!(
                    transport = %transport_kind,
                    command = %command_text,
                    error = %e,
                    "Dispatch failed"
                );
                (OutcomeKind::Failed, e.display_text())
            }
        };

        self.lock_log().append(LogEntry::new(
            transport_kind,
            command_text,
            display.clone(),
        ));

        DispatchOutcome {
            kind,
            transport_kind,
            display,
        }
    }

    fn lock_log(&self) -> MutexGuard<'_, CommandLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
