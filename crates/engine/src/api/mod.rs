//! HTTP surface (§4.3, §6) — an `axum::Router` over `AppState`, grounded
//! on the teacher's `api::router` module layout (one file per endpoint
//! group, wired together here).

mod allowed_tools;
mod annotated;
mod control;
mod debug_execute;
mod events;
mod health;
mod index;
mod render_job;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index::index))
        .route("/health", get(health::health))
        .route("/render_job", get(render_job::render_job))
        .route("/annotated", post(annotated::annotated))
        .route("/events", get(events::events))
        .route("/pause", post(control::pause))
        .route("/unpause", post(control::unpause))
        .route(
            "/allowed_tools",
            get(allowed_tools::get_allowed_tools).post(allowed_tools::post_allowed_tools),
        )
        .route("/debug/execute", post(debug_execute::debug_execute))
        .with_state(state)
}
