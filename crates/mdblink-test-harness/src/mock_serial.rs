//! Mock serial link for deterministic dispatch tests.
//!
//! [`MockSerialLink`] implements [`SerialLink`] with pre-loaded
//! request/response pairs. Clones share state, so a test can hand one clone
//! to a dispatcher and inspect what was sent through the other.
//!
//! # Example
//!
//! ```
//! use mdblink_test_harness::MockSerialLink;
//!
//! let mock = MockSerialLink::new();
//! // When the cashless RESET byte is sent, answer with ACK.
//! mock.expect(&[0x10], &[0x00]);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use mdblink_core::error::{Error, Result};
use mdblink_core::link::SerialLink;

use crate::gate::{Gate, Latch, gate};

/// What the mock answers for one expected request.
#[derive(Debug, Clone)]
enum Reply {
    Bytes(Vec<u8>),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    reply: Reply,
}

/// One recorded `send_raw` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub port: String,
    pub data: Vec<u8>,
    pub read_timeout: Duration,
    pub expected_len: Option<usize>,
}

#[derive(Debug, Default)]
struct State {
    expectations: VecDeque<Expectation>,
    sent: Vec<SentFrame>,
    latch: Option<Latch>,
}

/// A mock [`SerialLink`] for testing without a device.
///
/// Expectations are consumed in order. A send that does not match the next
/// expectation, or arrives when none are left, fails with
/// [`Error::Transport`].
#[derive(Debug, Clone, Default)]
pub struct MockSerialLink {
    state: Arc<Mutex<State>>,
}

impl MockSerialLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// When `request` is sent, answer with `response` (may be empty).
    pub fn expect(&self, request: &[u8], response: &[u8]) {
        self.lock().expectations.push_back(Expectation {
            request: request.to_vec(),
            reply: Reply::Bytes(response.to_vec()),
        });
    }

    /// When `request` is sent, fail with a transport error carrying `message`.
    pub fn expect_failure(&self, request: &[u8], message: &str) {
        self.lock().expectations.push_back(Expectation {
            request: request.to_vec(),
            reply: Reply::Fail(message.to_string()),
        });
    }

    /// Pause the next exchange until the returned [`Gate`] is released.
    pub fn gate_next(&self) -> Gate {
        let (gate, latch) = gate();
        self.lock().latch = Some(latch);
        gate
    }

    /// Every `send_raw` call so far, in order.
    pub fn sent(&self) -> Vec<SentFrame> {
        self.lock().sent.clone()
    }

    /// Number of expectations not yet consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.lock().expectations.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SerialLink for MockSerialLink {
    async fn send_raw(
        &self,
        port: &str,
        data: &[u8],
        read_timeout: Duration,
        expected_len: Option<usize>,
    ) -> Result<Vec<u8>> {
        let (expectation, latch) = {
            let mut state = self.lock();
            state.sent.push(SentFrame {
                port: port.to_string(),
                data: data.to_vec(),
                read_timeout,
                expected_len,
            });
            (state.expectations.pop_front(), state.latch.take())
        };

        if let Some(latch) = latch {
            latch.pass().await;
        }

        let expectation = expectation
            .ok_or_else(|| Error::Transport("no more expectations in mock serial link".into()))?;

        if data != expectation.request.as_slice() {
            return Err(Error::Transport(format!(
                "unexpected send data: expected {:02X?}, got {:02X?}",
                expectation.request, data
            )));
        }

        match expectation.reply {
            Reply::Bytes(mut bytes) => {
                if let Some(want) = expected_len {
                    bytes.truncate(want);
                }
                Ok(bytes)
            }
            Reply::Fail(message) => Err(Error::Transport(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_millis(300);

    #[tokio::test]
    async fn basic_send_receive() {
        let mock = MockSerialLink::new();
        mock.expect(&[0x10], &[0x00]);

        let reply = mock.send_raw("COM3", &[0x10], T, None).await.unwrap();
        assert_eq!(reply, vec![0x00]);
        assert_eq!(mock.remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn records_sent_frames() {
        let mock = MockSerialLink::new();
        mock.expect(&[0x01], &[]);
        mock.expect(&[0x02], &[]);

        let observer = mock.clone();
        mock.send_raw("/dev/ttyUSB0", &[0x01], T, None).await.unwrap();
        mock.send_raw("/dev/ttyUSB1", &[0x02], T, Some(4)).await.unwrap();

        let sent = observer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].port, "/dev/ttyUSB0");
        assert_eq!(sent[1].data, vec![0x02]);
        assert_eq!(sent[1].expected_len, Some(4));
    }

    #[tokio::test]
    async fn wrong_data_errors() {
        let mock = MockSerialLink::new();
        mock.expect(&[0x01], &[0xFF]);

        let result = mock.send_raw("COM3", &[0x99], T, None).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn no_expectations_errors() {
        let mock = MockSerialLink::new();
        let result = mock.send_raw("COM3", &[0x01], T, None).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn scripted_failure() {
        let mock = MockSerialLink::new();
        mock.expect_failure(&[0x01], "port busy");
        let err = mock.send_raw("COM3", &[0x01], T, None).await.unwrap_err();
        assert_eq!(err.to_string(), "transport error: port busy");
    }

    #[tokio::test]
    async fn expected_len_truncates() {
        let mock = MockSerialLink::new();
        mock.expect(&[0x01], &[0xAA, 0xBB, 0xCC]);
        let reply = mock.send_raw("COM3", &[0x01], T, Some(2)).await.unwrap();
        assert_eq!(reply, vec![0xAA, 0xBB]);
    }

    #[tokio::test]
    async fn gated_exchange_waits() {
        let mock = MockSerialLink::new();
        mock.expect(&[0x01], &[0x02]);
        let gate = mock.gate_next();

        let task = {
            let mock = mock.clone();
            tokio::spawn(async move { mock.send_raw("COM3", &[0x01], T, None).await })
        };

        gate.entered().await;
        assert_eq!(mock.sent().len(), 1);
        gate.release();

        assert_eq!(task.await.unwrap().unwrap(), vec![0x02]);
    }
}
