//! Run directory selection and `AppState` construction (§4.8), grounded
//! on the teacher's `bootstrap::build_app_state`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use va_adapters::{ExecutorAdapter, VlmAdapter};
use va_domain::config::{Config, ConfigSeverity};

use crate::cancel::CancelToken;
use crate::gate::RenderJobGate;
use crate::policy_store::PolicyStore;
use crate::run_state::RunStateHandle;
use crate::sse::SSEBroker;
use crate::state::AppState;
use crate::store::TurnStore;

/// Validate `config`, select/create the run directory, load or seed the
/// tool policy, and assemble a fully-wired `AppState`. Each step logs a
/// one-line `tracing::info!` on success, matching the teacher's
/// banner-style bootstrap logging.
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    let run_dir = select_run_dir(&config.paths.log_root)?;
    tracing::info!(run_dir = %run_dir.display(), "run directory ready");

    let policy_path = run_dir.join(&config.tool_policy.file);
    let policy = Arc::new(
        PolicyStore::load_or_seed(policy_path, config.tool_policy.default_tools.clone())
            .context("loading tool policy")?,
    );
    tracing::info!(tools = ?policy.snapshot().tools, "tool policy ready");

    let store = Arc::new(TurnStore::new(run_dir.clone()));
    let gate = Arc::new(RenderJobGate::new());
    let sse = Arc::new(SSEBroker::new());
    let run_state = Arc::new(RunStateHandle::new(run_dir.clone()));
    run_state.set_paused(true);

    let executor = Arc::new(ExecutorAdapter::new(config.executor.clone()));
    let vlm = Arc::new(VlmAdapter::new(config.vlm.clone()));
    tracing::info!("executor and vlm adapters ready");

    Ok(AppState {
        config,
        gate,
        store,
        sse,
        policy,
        run_state,
        executor,
        vlm,
        cancel: CancelToken::new(),
    })
}

/// Selects `<log_root>/run_<yyyymmdd_hhmmss>/`, creating it if absent.
/// One run per process (§1 Non-goals): each `build_app_state` call mints
/// a fresh, timestamp-named directory rather than resuming a prior one.
fn select_run_dir(log_root: &std::path::Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(log_root)
        .with_context(|| format!("creating log root {}", log_root.display()))?;
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let run_dir = log_root.join(format!("run_{stamp}"));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("creating run directory {}", run_dir.display()))?;
    Ok(run_dir)
}
