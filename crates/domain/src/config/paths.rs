use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Run directory + tool policy paths (§4.4, §4.7)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root under which `run_<timestamp>/` directories are created.
    #[serde(default = "d_log_root")]
    pub log_root: PathBuf,
    /// Seed text fed as `story_in` for the first turn.
    #[serde(default = "d_initial_story")]
    pub initial_story: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_root: d_log_root(),
            initial_story: d_initial_story(),
        }
    }
}

fn d_log_root() -> PathBuf {
    PathBuf::from("panel_log")
}
fn d_initial_story() -> String {
    "Begin.".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPolicyConfig {
    /// Filename (relative to `run_dir`) of the persisted allowlist.
    #[serde(default = "d_policy_file")]
    pub file: String,
    /// Seed allowlist used the first time a run directory is created.
    #[serde(default = "d_default_tools")]
    pub default_tools: Vec<String>,
}

impl Default for ToolPolicyConfig {
    fn default() -> Self {
        Self {
            file: d_policy_file(),
            default_tools: d_default_tools(),
        }
    }
}

fn d_policy_file() -> String {
    "allowed_tools.json".into()
}
fn d_default_tools() -> Vec<String> {
    vec!["click".into(), "write".into(), "key".into(), "scroll".into()]
}
