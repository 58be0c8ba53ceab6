//! One-shot session readiness gate.

use super::message::SessionFailure;
use tokio::sync::watch;

/// Terminal outcome of a viewer session's startup.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Ready { page: u32, num_pages: u32 },
    Failed(SessionFailure),
    /// The session was destroyed before it became ready.
    Destroyed,
}

impl SessionOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionOutcome::Ready { .. })
    }
}

/// Signals readiness exactly once; later signals are ignored.
pub struct ReadyGate {
    tx: watch::Sender<Option<SessionOutcome>>,
}

impl ReadyGate {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Records the outcome. Returns `false` if one was already recorded.
    pub fn signal(&self, outcome: SessionOutcome) -> bool {
        let mut outcome = Some(outcome);
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = outcome.take();
            true
        })
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.tx.borrow().clone()
    }

    pub fn is_signalled(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Waits for the outcome.
    pub async fn wait(&self) -> SessionOutcome {
        let mut rx = self.tx.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(outcome) = current {
                return outcome;
            }
            if rx.changed().await.is_err() {
                return SessionOutcome::Destroyed;
            }
        }
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}
