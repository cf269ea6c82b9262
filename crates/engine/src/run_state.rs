//! `RunState` handle — the process-wide singleton (§3, §9).
//!
//! `paused` is a bare atomic (read-any / write-HTTP, per §5's discipline
//! table). `last_seq` and `last_error` are mutated only by the engine
//! loop but read concurrently by HTTP handlers (`/health`), so they live
//! behind a small mutex rather than their own atomics — `last_error` is a
//! `String`, which has no atomic form, and keeping both fields under one
//! lock keeps `/health`'s read a single consistent snapshot.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use va_domain::{HealthResponse, RunState};

use crate::cancel::CancelToken;

struct Mutable {
    last_seq: u64,
    last_error: Option<String>,
}

pub struct RunStateHandle {
    paused: AtomicBool,
    run_dir: PathBuf,
    mutable: Mutex<Mutable>,
    unpaused: Notify,
}

impl RunStateHandle {
    pub fn new(run_dir: PathBuf) -> Self {
        Self {
            paused: AtomicBool::new(false),
            run_dir,
            mutable: Mutex::new(Mutable {
                last_seq: 0,
                last_error: None,
            }),
            unpaused: Notify::new(),
        }
    }

    /// Blocks the caller (the engine loop, at a turn boundary) until
    /// `paused` is false or `cancel` fires. Resolves immediately if
    /// already unpaused.
    ///
    /// Registers as a `Notify` waiter (via `enable()`) before re-checking
    /// `paused`, so an `unpause()`/`cancel()` landing between the first
    /// check and the `select!` is never lost.
    pub async fn wait_until_unpaused(&self, cancel: &CancelToken) {
        loop {
            if !self.is_paused() || cancel.is_cancelled() {
                return;
            }

            let notified = self.unpaused.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if !self.is_paused() || cancel.is_cancelled() {
                return;
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = cancel.cancelled() => return,
            }
        }
    }

    pub fn run_dir(&self) -> &PathBuf {
        &self.run_dir
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// `POST /pause` / `POST /unpause` — the only HTTP-side mutation.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
        if !paused {
            self.unpaused.notify_waiters();
        }
    }

    pub fn last_seq(&self) -> u64 {
        self.mutable.lock().last_seq
    }

    /// `EngineLoop`-only mutation: allocate and record the next seq.
    pub fn advance_seq(&self) -> u64 {
        let mut m = self.mutable.lock();
        m.last_seq += 1;
        m.last_seq
    }

    /// `EngineLoop`-only mutation: record the most recent error tag
    /// (`None` clears it after a clean turn).
    pub fn set_last_error(&self, error: Option<String>) {
        self.mutable.lock().last_error = error;
    }

    pub fn snapshot(&self) -> RunState {
        let m = self.mutable.lock();
        RunState {
            paused: self.is_paused(),
            run_dir: self.run_dir.clone(),
            last_seq: m.last_seq,
            last_error: m.last_error.clone(),
        }
    }

    pub fn health(&self) -> HealthResponse {
        let m = self.mutable.lock();
        HealthResponse {
            ok: true,
            paused: self.is_paused(),
            run_dir: self.run_dir.display().to_string(),
            ts: chrono::Utc::now(),
            last_seq: m.last_seq,
        }
    }
}
