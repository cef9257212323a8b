//! Process-wide shutdown signal.
//!
//! A one-way latch: it starts cleared, is set at most once through an
//! atomic compare-and-set, and is never reset. Long-running loops either
//! poll [`ShutdownSignal::is_triggered`] or `select!` on
//! [`ShutdownSignal::wait`].

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

#[derive(Debug)]
pub struct ShutdownSignal {
    triggered: AtomicBool,
    tx: watch::Sender<bool>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        ShutdownSignal {
            triggered: AtomicBool::new(false),
            tx,
        }
    }

    /// Set the latch. Returns `true` only for the single caller that
    /// flipped it; every later call is a no-op returning `false`.
    pub fn trigger(&self) -> bool {
        let won = self
            .triggered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.tx.send_replace(true);
        }
        won
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Resolve once the latch is set. Returns immediately if it already is.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while
        // we borrow it.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}
