//! Pausing a mock exchange mid-flight.

use std::sync::Arc;
use tokio::sync::{Notify, oneshot};

/// Test-side handle for a paused exchange.
///
/// Obtained from [`MockSerialLink::gate_next`](crate::MockSerialLink::gate_next)
/// or [`MockDaemonLink::gate_next`](crate::MockDaemonLink::gate_next). The
/// next exchange on that mock signals [`entered`](Gate::entered) and then
/// waits until [`release`](Gate::release) is called or the gate is dropped.
#[derive(Debug)]
pub struct Gate {
    entered: Arc<Notify>,
    release: oneshot::Sender<()>,
}

/// Mock-side half of a [`Gate`].
#[derive(Debug)]
pub(crate) struct Latch {
    entered: Arc<Notify>,
    release: oneshot::Receiver<()>,
}

pub(crate) fn gate() -> (Gate, Latch) {
    let entered = Arc::new(Notify::new());
    let (tx, rx) = oneshot::channel();
    (
        Gate {
            entered: entered.clone(),
            release: tx,
        },
        Latch {
            entered,
            release: rx,
        },
    )
}

impl Gate {
    /// Wait until the mock has started the gated exchange.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the gated exchange finish.
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

impl Latch {
    pub(crate) async fn pass(self) {
        self.entered.notify_one();
        let _ = self.release.await;
    }
}
