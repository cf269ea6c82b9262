//! `RenderJobGate` — the single-slot rendezvous mediating between the
//! serial engine loop and the concurrent HTTP surface (§4.1).
//!
//! Implemented as a mutex-guarded record plus a condition-variable-like
//! `Notify`, per the design note in §9: "implement as a mutex + condition
//! variable... avoid global event flags that cannot carry a seq." The
//! record carries the pending job and, once posted, the delivered image;
//! `seq` is checked on every read so a stale or out-of-order POST is
//! detectable rather than silently misrouted.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use va_domain::{AnnotatedImage, RenderJob};

use crate::cancel::CancelToken;

#[derive(Clone, PartialEq, Eq)]
pub enum DeliverOutcome {
    Ok,
    Stale,
    NoPending,
}

#[derive(Debug, Clone)]
pub enum AwaitOutcome {
    Image(String),
    Timeout,
    Cancelled,
}

#[derive(Default)]
struct GateState {
    job: Option<RenderJob>,
    delivered: Option<AnnotatedImage>,
}

pub struct RenderJobGate {
    state: Mutex<GateState>,
    notify: Notify,
}

impl RenderJobGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            notify: Notify::new(),
        }
    }

    /// Installs `job` as the current pending render job, clearing any
    /// previously delivered (but not yet consumed) annotated image. Never
    /// blocks. Wakes any task parked in `await_annotation`.
    pub fn publish(&self, job: RenderJob) {
        let mut state = self.state.lock();
        state.job = Some(job);
        state.delivered = None;
        drop(state);
        self.notify.notify_waiters();
    }

    /// `GET /render_job` — non-destructive read of the current pending job.
    pub fn peek(&self) -> Option<RenderJob> {
        self.state.lock().job.clone()
    }

    /// `POST /annotated` — accepts `image_b64` for `seq` only if a job is
    /// pending with a matching seq. Re-delivery of an already-accepted seq
    /// is a no-op `Ok` (idempotent).
    pub fn deliver(&self, seq: u64, image_b64: String) -> DeliverOutcome {
        let mut state = self.state.lock();
        let Some(job) = state.job.as_ref() else {
            return DeliverOutcome::NoPending;
        };
        if job.seq != seq {
            if let Some(delivered) = state.delivered.as_ref() {
                if delivered.seq == seq {
                    return DeliverOutcome::Ok;
                }
            }
            return DeliverOutcome::Stale;
        }
        state.delivered = Some(AnnotatedImage { seq, image_b64 });
        drop(state);
        self.notify.notify_waiters();
        DeliverOutcome::Ok
    }

    /// Blocks until a delivered image for `seq` exists, `timeout` elapses,
    /// or `cancel` fires. On `Image`, the slot is cleared so a later
    /// re-delivery of the same seq cannot be observed twice.
    ///
    /// Registers as a `Notify` waiter (via `enable()`) *before* re-checking
    /// the delivered slot, so a `deliver()` that lands between the first
    /// check and the `select!` is never lost — `notify_waiters()` only
    /// wakes waiters already registered at the time it runs, and checking
    /// the condition only *after* registering closes that window.
    pub async fn await_annotation(
        &self,
        seq: u64,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> AwaitOutcome {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(image) = self.take_if_matching(seq) {
                return AwaitOutcome::Image(image);
            }
            if cancel.is_cancelled() {
                return AwaitOutcome::Cancelled;
            }
            let now = Instant::now();
            if now >= deadline {
                return AwaitOutcome::Timeout;
            }

            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(image) = self.take_if_matching(seq) {
                return AwaitOutcome::Image(image);
            }
            if cancel.is_cancelled() {
                return AwaitOutcome::Cancelled;
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep_until(deadline) => return AwaitOutcome::Timeout,
                _ = cancel.cancelled() => return AwaitOutcome::Cancelled,
            }
        }
    }

    fn take_if_matching(&self, seq: u64) -> Option<String> {
        let mut state = self.state.lock();
        match state.delivered.as_ref() {
            Some(img) if img.seq == seq => {
                let img = state.delivered.take().unwrap();
                Some(img.image_b64)
            }
            _ => None,
        }
    }
}

impl Default for RenderJobGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(seq: u64) -> RenderJob {
        RenderJob::new(seq, "raw", vec![])
    }

    #[test]
    fn peek_is_non_destructive() {
        let gate = RenderJobGate::new();
        gate.publish(job(1));
        assert_eq!(gate.peek().unwrap().seq, 1);
        assert_eq!(gate.peek().unwrap().seq, 1);
    }

    #[test]
    fn deliver_without_pending_job_is_no_pending() {
        let gate = RenderJobGate::new();
        assert_eq!(gate.deliver(1, "img".into()), DeliverOutcome::NoPending);
    }

    #[test]
    fn deliver_with_seq_mismatch_is_stale() {
        let gate = RenderJobGate::new();
        gate.publish(job(1));
        assert_eq!(gate.deliver(2, "img".into()), DeliverOutcome::Stale);
    }

    #[test]
    fn deliver_matching_seq_is_ok_and_idempotent() {
        let gate = RenderJobGate::new();
        gate.publish(job(1));
        assert_eq!(gate.deliver(1, "img".into()), DeliverOutcome::Ok);
        // Re-delivery of the same (already-consumed-pending) seq: since the
        // job is still pending (not yet await'ed), the second POST matches
        // the installed job directly.
        assert_eq!(gate.deliver(1, "img".into()), DeliverOutcome::Ok);
    }

    #[test]
    fn publish_invalidates_prior_undelivered_job() {
        let gate = RenderJobGate::new();
        gate.publish(job(1));
        gate.publish(job(2));
        assert_eq!(gate.deliver(1, "img".into()), DeliverOutcome::Stale);
        assert_eq!(gate.deliver(2, "img".into()), DeliverOutcome::Ok);
    }

    #[tokio::test]
    async fn await_returns_image_once_delivered() {
        let gate = RenderJobGate::new();
        gate.publish(job(1));
        let cancel = CancelToken::new();
        let outcome = tokio::join!(
            gate.await_annotation(1, Duration::from_secs(5), &cancel),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                gate.deliver(1, "image-bytes".into());
            }
        )
        .0;
        match outcome {
            AwaitOutcome::Image(img) => assert_eq!(img, "image-bytes"),
            other => panic!("expected Image, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn await_times_out_when_never_delivered() {
        let gate = RenderJobGate::new();
        gate.publish(job(1));
        let cancel = CancelToken::new();
        let outcome = gate
            .await_annotation(1, Duration::from_millis(50), &cancel)
            .await;
        assert!(matches!(outcome, AwaitOutcome::Timeout));
    }

    #[tokio::test]
    async fn await_is_cancelled_on_shutdown() {
        let gate = RenderJobGate::new();
        gate.publish(job(1));
        let cancel = CancelToken::new();
        let cancel2 = cancel.clone();
        let outcome = tokio::join!(
            gate.await_annotation(1, Duration::from_secs(5), &cancel),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                cancel2.cancel();
            }
        )
        .0;
        assert!(matches!(outcome, AwaitOutcome::Cancelled));
    }
}

impl std::fmt::Debug for DeliverOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeliverOutcome::Ok => "ok",
            DeliverOutcome::Stale => "stale",
            DeliverOutcome::NoPending => "no_pending",
        };
        write!(f, "{s}")
    }
}
