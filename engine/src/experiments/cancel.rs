//! Cooperative cancellation shared by all pipeline stages.
//!
//! Cancelling drops the only sender of a zero capacity channel.
//! From then on every receive on that channel returns immediately with a disconnect,
//! so stages can put the signal into a `select!` next to their regular channel operations.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[derive(Debug)]
struct Inner {
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
    cancelled: AtomicBool,
}

/// Clones share the same state. Cancelling is idempotent and cannot be undone.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        CancellationToken {
            inner: Arc::new(Inner {
                trigger: Mutex::new(Some(trigger)),
                signal,
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.trigger.lock().take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Receiver which becomes ready once the token is cancelled. Nothing is ever sent on it.
    pub fn signal(&self) -> Receiver<()> {
        self.inner.signal.clone()
    }
}
