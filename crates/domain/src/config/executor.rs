use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Executor subprocess (§4.6)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Command + args used to invoke the executor subprocess, e.g.
    /// `["python", "executor.py"]`.
    #[serde(default = "d_executor_command")]
    pub command: Vec<String>,
    /// Wall-clock timeout for a single executor invocation.
    #[serde(default = "d_executor_timeout_sec")]
    pub timeout_sec: u64,
    /// Grace period between SIGTERM and SIGKILL on timeout.
    #[serde(default = "d_kill_grace_sec")]
    pub kill_grace_sec: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            command: d_executor_command(),
            timeout_sec: d_executor_timeout_sec(),
            kill_grace_sec: d_kill_grace_sec(),
        }
    }
}

fn d_executor_command() -> Vec<String> {
    vec!["python".into(), "executor.py".into()]
}
fn d_executor_timeout_sec() -> u64 {
    20
}
fn d_kill_grace_sec() -> u64 {
    3
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// VLM subprocess (§4.6)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VlmConfig {
    /// Command + args used to invoke the VLM client subprocess.
    #[serde(default = "d_vlm_command")]
    pub command: Vec<String>,
    #[serde(default = "d_vlm_timeout_sec")]
    pub timeout_sec: u64,
    #[serde(default = "d_kill_grace_sec")]
    pub kill_grace_sec: u64,
    #[serde(default)]
    pub model: Option<String>,
}

impl Default for VlmConfig {
    fn default() -> Self {
        Self {
            command: d_vlm_command(),
            timeout_sec: d_vlm_timeout_sec(),
            kill_grace_sec: d_kill_grace_sec(),
            model: None,
        }
    }
}

fn d_vlm_command() -> Vec<String> {
    vec!["python".into(), "vlm_client.py".into()]
}
fn d_vlm_timeout_sec() -> u64 {
    30
}
