//! Shared application state passed to every HTTP handler and to the
//! engine loop (§4.8), grounded on the teacher's `state::AppState` —
//! trimmed to the handful of components this engine actually owns.

use std::sync::Arc;

use va_adapters::{ExecutorAdapter, VlmAdapter};
use va_domain::config::Config;

use crate::cancel::CancelToken;
use crate::gate::RenderJobGate;
use crate::policy_store::PolicyStore;
use crate::run_state::RunStateHandle;
use crate::sse::SSEBroker;
use crate::store::TurnStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gate: Arc<RenderJobGate>,
    pub store: Arc<TurnStore>,
    pub sse: Arc<SSEBroker>,
    pub policy: Arc<PolicyStore>,
    pub run_state: Arc<RunStateHandle>,
    pub executor: Arc<ExecutorAdapter>,
    pub vlm: Arc<VlmAdapter>,
    pub cancel: CancelToken,
}
