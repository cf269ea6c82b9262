//! `SSEBroker` — multi-subscriber fan-out of turn events (§4.5).
//!
//! Each subscriber gets its own bounded channel; a slow or disconnected
//! client cannot stall publishers. `tokio::sync::broadcast` already gives
//! us drop-oldest-on-lag semantics for a multi-consumer channel (a lagging
//! receiver's next `recv()` returns `Lagged(n)` instead of the oldest
//! missed messages), the same primitive the teacher uses for
//! `RunStore::subscribe` (see `runtime::runs`).

use tokio::sync::broadcast;

use va_domain::TurnEvent;

/// Bounded per-client queue depth (§5 resource bounds: "64 messages per
/// client").
const CHANNEL_CAPACITY: usize = 64;

pub struct SSEBroker {
    tx: broadcast::Sender<TurnEvent>,
}

impl SSEBroker {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Broadcast a turn event to every current subscriber. Never blocks;
    /// a channel with no subscribers simply drops the send.
    pub fn broadcast(&self, event: TurnEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TurnEvent> {
        self.tx.subscribe()
    }
}

impl Default for SSEBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use va_domain::Turn;

    fn event(seq: u64) -> TurnEvent {
        Turn::new(seq, "go").to_event("")
    }

    #[tokio::test]
    async fn subscriber_receives_broadcast_events() {
        let broker = SSEBroker::new();
        let mut rx = broker.subscribe();
        broker.broadcast(event(1));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.seq, 1);
    }

    #[tokio::test]
    async fn broadcast_with_no_subscribers_does_not_block_or_panic() {
        let broker = SSEBroker::new();
        broker.broadcast(event(1));
    }

    #[tokio::test]
    async fn lagging_subscriber_observes_lagged_not_a_hang() {
        let broker = SSEBroker::new();
        let mut rx = broker.subscribe();
        for seq in 1..=(CHANNEL_CAPACITY as u64 + 10) {
            broker.broadcast(event(seq));
        }
        let mut saw_lagged = false;
        loop {
            match rx.try_recv() {
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    saw_lagged = true;
                    continue;
                }
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => break,
            }
        }
        assert!(saw_lagged);
    }

    #[tokio::test]
    async fn independent_subscribers_each_get_all_events() {
        let broker = SSEBroker::new();
        let mut rx1 = broker.subscribe();
        let mut rx2 = broker.subscribe();
        broker.broadcast(event(1));
        assert_eq!(rx1.recv().await.unwrap().seq, 1);
        assert_eq!(rx2.recv().await.unwrap().seq, 1);
    }
}
