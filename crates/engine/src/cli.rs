//! Command-line surface (§4.8), grounded on the teacher's `cli::{Cli,
//! Command}` shape, trimmed to the three commands this engine needs.

use clap::{Parser, Subcommand};

/// Visual agent driver — a closed-loop GUI agent engine.
#[derive(Debug, Parser)]
#[command(name = "va-engine", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the engine and HTTP surface (default when no subcommand is given).
    Serve,
    /// Run diagnostic checks against the current configuration.
    Doctor,
    /// Print version information.
    Version,
}

/// Load configuration from the path named by `VA_CONFIG` (defaulting to
/// `config.toml`). Falls back to `Config::default()` when that path does
/// not exist, matching the teacher's permissive `load_config`.
pub fn load_config() -> anyhow::Result<(va_domain::config::Config, String)> {
    let config_path = std::env::var("VA_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        va_domain::config::Config::default()
    };

    Ok((config, config_path))
}
