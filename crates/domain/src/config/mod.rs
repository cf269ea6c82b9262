mod engine;
mod executor;
mod paths;
mod server;

pub use engine::*;
pub use executor::*;
pub use paths::*;
pub use server::*;

use std::fmt;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub vlm: VlmConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub tool_policy: ToolPolicyConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues. An empty
    /// vec means the config is usable as-is.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.server.port == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }
        if self.server.host.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }
        if self.executor.command.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "executor.command".into(),
                message: "command must not be empty".into(),
            });
        }
        if self.vlm.command.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "vlm.command".into(),
                message: "command must not be empty".into(),
            });
        }
        if self.executor.timeout_sec == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "executor.timeout_sec".into(),
                message: "a zero timeout disables the execute-timeout guard".into(),
            });
        }
        if self.vlm.timeout_sec == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "vlm.timeout_sec".into(),
                message: "a zero timeout disables the vlm-timeout guard".into(),
            });
        }
        if self.engine.min_tool_calls == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "engine.min_tool_calls".into(),
                message: "tool_underflow can never trigger with min_tool_calls=0".into(),
            });
        }
        if self.tool_policy.default_tools.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "tool_policy.default_tools".into(),
                message: "empty default allowlist — every executor call will be denied \
                          until /allowed_tools is populated"
                    .into(),
            });
        }

        issues
    }
}
