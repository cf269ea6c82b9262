//! `GET /` (§6) — the static browser panel that drives `/render_job`,
//! `/annotated`, and `/events` from the client side.

use axum::response::{Html, IntoResponse};

const PANEL_HTML: &str = include_str!("../../static/panel.html");

pub async fn index() -> impl IntoResponse {
    Html(PANEL_HTML)
}
