//! Mock daemon link.
//!
//! [`MockDaemonLink`] implements [`DaemonLink`] with pre-loaded
//! command/reply pairs, mirroring [`MockSerialLink`](crate::MockSerialLink)
//! for the text channel.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mdblink_core::error::{Error, Result};
use mdblink_core::link::DaemonLink;

use crate::gate::{Gate, Latch, gate};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
    /// Never answer.
    Hang,
}

#[derive(Debug, Clone)]
struct Expectation {
    command: String,
    reply: Reply,
}

#[derive(Debug, Default)]
struct State {
    expectations: VecDeque<Expectation>,
    sent: Vec<String>,
    latch: Option<Latch>,
}

/// A mock [`DaemonLink`] with ordered expectations.
#[derive(Debug, Clone, Default)]
pub struct MockDaemonLink {
    state: Arc<Mutex<State>>,
}

impl MockDaemonLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// When `command` is sent, answer with `reply`.
    pub fn expect(&self, command: &str, reply: &str) {
        self.push(command, Reply::Text(reply.to_string()));
    }

    /// When `command` is sent, fail with a transport error.
    pub fn expect_failure(&self, command: &str, message: &str) {
        self.push(command, Reply::Fail(message.to_string()));
    }

    /// When `command` is sent, never answer.
    pub fn expect_hang(&self, command: &str) {
        self.push(command, Reply::Hang);
    }

    /// Pause the next exchange until the returned [`Gate`] is released.
    pub fn gate_next(&self) -> Gate {
        let (gate, latch) = gate();
        self.lock().latch = Some(latch);
        gate
    }

    /// Every command sent so far, in order.
    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    pub fn remaining_expectations(&self) -> usize {
        self.lock().expectations.len()
    }

    fn push(&self, command: &str, reply: Reply) {
        self.lock().expectations.push_back(Expectation {
            command: command.to_string(),
            reply,
        });
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DaemonLink for MockDaemonLink {
    async fn send_command(&self, command: &str) -> Result<String> {
        let (expectation, latch) = {
            let mut state = self.lock();
            state.sent.push(command.to_string());
            (state.expectations.pop_front(), state.latch.take())
        };

        if let Some(latch) = latch {
            latch.pass().await;
        }

        let expectation = expectation
            .ok_or_else(|| Error::Transport("no more expectations in mock daemon link".into()))?;

        if command != expectation.command {
            return Err(Error::Transport(format!(
                "unexpected command: expected {:?}, got {:?}",
                expectation.command, command
            )));
        }

        match expectation.reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail(message) => Err(Error::Transport(message)),
            Reply::Hang => std::future::pending().await,
        }
    }
}
