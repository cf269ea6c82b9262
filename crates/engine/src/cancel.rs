//! Shutdown cancellation token (§4.8, §5).
//!
//! A single token shared between `main` (which trips it on Ctrl-C) and the
//! engine loop (which selects on it inside `gate.await` and between turn
//! boundaries). Grounded on the teacher's `runtime::cancel::CancelToken`
//! (atomic flag, cheap clone) generalized with an async wait so the gate
//! can select on it directly instead of polling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once cancellation has been signalled. Safe to await
    /// concurrently from multiple tasks; safe to call after cancellation
    /// has already happened (resolves immediately).
    ///
    /// Registers as a `Notify` waiter via `enable()` *before* re-checking
    /// the flag, so a `cancel()` landing between the first check and the
    /// await is never lost (`notify_waiters()` only wakes waiters already
    /// registered at the time it runs).
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
