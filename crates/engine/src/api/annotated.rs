//! `POST /annotated` (§4.1, §4.3, §6).
//!
//! Serializes only through the gate's own mutex (`deliver`). Rejects an
//! empty payload or a missing seq with 400; a seq that does not match the
//! currently pending job (or the most recently delivered one) is a stale
//! 409 rather than a silent drop — the engine may still be blocked
//! awaiting the real seq.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use crate::gate::DeliverOutcome;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnnotatedPayload {
    #[serde(default)]
    pub seq: Option<u64>,
    #[serde(default)]
    pub image_b64: String,
}

pub async fn annotated(
    State(state): State<AppState>,
    Json(payload): Json<AnnotatedPayload>,
) -> impl IntoResponse {
    let Some(seq) = payload.seq else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "missing seq"})),
        );
    };
    if payload.image_b64.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "missing image_b64"})),
        );
    }

    match state.gate.deliver(seq, payload.image_b64) {
        DeliverOutcome::Ok => (StatusCode::OK, Json(json!({"ok": true}))),
        DeliverOutcome::NoPending => (
            StatusCode::CONFLICT,
            Json(json!({"error": "no render job pending"})),
        ),
        DeliverOutcome::Stale => (
            StatusCode::CONFLICT,
            Json(json!({"error": "stale seq", "seq": seq})),
        ),
    }
}
