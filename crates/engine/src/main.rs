//! Entry point (§4.8): parse the CLI, dispatch to `serve`/`doctor`/
//! `version`, and for `serve`, bind the HTTP listener, spawn the engine
//! loop, and run both to completion or Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use va_engine::cli::{load_config, Cli, Command};
use va_engine::{api, bootstrap, doctor, engine_loop};

/// Caps in-flight HTTP requests so a burst of polling clients cannot
/// starve the single-threaded `/render_job`/`/annotated` exchange.
const MAX_CONCURRENT_REQUESTS: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            init_tracing();
            let (config, _config_path) = load_config()?;
            serve(Arc::new(config)).await
        }
        Some(Command::Doctor) => {
            let (config, config_path) = load_config()?;
            let passed = doctor::run(&config, &config_path)?;
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Version) => {
            println!("va-engine {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,va_engine=debug")),
        )
        .json()
        .init();
}

async fn serve(config: Arc<va_domain::config::Config>) -> anyhow::Result<()> {
    tracing::info!("visual agent driver starting");

    let state = bootstrap::build_app_state(config.clone())?;
    let cancel = state.cancel.clone();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    tracing::info!(addr = %addr, "va-engine listening");

    let loop_state = state.clone();
    let loop_handle = tokio::spawn(engine_loop::run_loop(loop_state));

    let app = api::router(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower::limit::ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS));

    let shutdown_cancel = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("ctrl-c received, shutting down");
            shutdown_cancel.cancel();
        })
        .await
        .context("axum server error")?;

    cancel.cancel();
    if let Err(e) = loop_handle.await {
        tracing::error!(error = %e, "engine loop task panicked");
    }

    Ok(())
}
