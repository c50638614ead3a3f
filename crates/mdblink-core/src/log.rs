//! In-memory record of dispatch attempts for the current session.
//!
//! One [`LogEntry`] is appended per attempt, successful or not. Entries are
//! never edited. By default the log grows for the whole session; a capacity
//! turns it into a ring buffer that drops the oldest entry first.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::types::TransportKind;

/// One dispatch attempt and what the operator was shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub transport_kind: TransportKind,
    /// The command as dispatched, or the operator text if classification
    /// failed.
    pub command_text: String,
    /// Formatted response, or an `Error: ` string.
    pub response_text: String,
}

impl LogEntry {
    /// Create an entry stamped with the current time.
    pub fn new(
        transport_kind: TransportKind,
        command_text: impl Into<String>,
        response_text: impl Into<String>,
    ) -> Self {
        LogEntry {
            timestamp: Utc::now(),
            transport_kind,
            command_text: command_text.into(),
            response_text: response_text.into(),
        }
    }

    /// Whether the attempt ended in an error.
    pub fn is_error(&self) -> bool {
        self.response_text.starts_with("Error: ")
    }
}

/// Append-only session log.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    entries: VecDeque<LogEntry>,
    capacity: Option<usize>,
}

impl CommandLog {
    /// An unbounded log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that keeps at most `capacity` entries, evicting the oldest.
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        CommandLog {
            entries: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    pub fn append(&mut self, entry: LogEntry) {
        if let Some(cap) = self.capacity {
            if self.entries.len() == cap {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(entry);
    }

    /// Entries in arrival order.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
