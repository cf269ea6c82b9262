//! `GET /events` (§4.5, §6) — server-sent events with bounded catch-up.
//!
//! Replays up to `replay=N` turns from the in-memory ring before switching
//! to live broadcast traffic, then emits a comment-only heartbeat every 15s
//! to defeat proxy idle-timeouts. A subscriber that falls behind sees
//! `broadcast::error::RecvError::Lagged` and simply resumes from the next
//! available event rather than erroring the stream.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::Stream;
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub replay: usize,
}

pub async fn events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let replayed = state.store.replay(query.replay);
    let rx = state.sse.subscribe();

    let stream = async_stream::stream! {
        for event in replayed {
            if let Ok(data) = serde_json::to_string(&event) {
                yield Ok(Event::default().data(data));
            }
        }

        let mut rx = rx;
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Ok(data) = serde_json::to_string(&event) {
                        yield Ok(Event::default().data(data));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
