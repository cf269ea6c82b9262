//! ExecutorAdapter — subprocess wrapper around the action executor
//! (§4.6). The executor parses `story_text` into tool calls, optionally
//! performs GUI actions, and captures a raw screenshot. It is invoked
//! fresh per turn; no executor process is held open between turns.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use va_domain::config::ExecutorConfig;
use va_domain::Error;

use crate::subprocess::run_json_subprocess;

#[derive(Debug, Clone, Serialize)]
pub struct ExecutorRequest {
    pub story_text: String,
    pub allowed_tools: Vec<String>,
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedAction {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub coords: Option<(i64, i64)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MalformedCall {
    pub text: String,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorResponse {
    #[serde(default)]
    pub executed: Vec<ExecutedAction>,
    #[serde(default)]
    pub malformed: Vec<MalformedCall>,
    #[serde(default)]
    pub raw_image_b64: String,
    #[serde(default)]
    pub error: Option<String>,
}

pub struct ExecutorAdapter {
    config: ExecutorConfig,
}

impl ExecutorAdapter {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Invoke the executor subprocess, retrying once on a transient
    /// child-process failure (crash or timeout) before bubbling the error
    /// (§7: "Transient child-process errors -> one bounded retry at the
    /// adapter level, then bubble"). `debug=true` requests a dry-run (no
    /// physical actions) for `POST /debug/execute`.
    pub async fn call(
        &self,
        story_text: &str,
        allowed_tools: &[String],
        debug: bool,
    ) -> Result<ExecutorResponse, Error> {
        let req = ExecutorRequest {
            story_text: story_text.to_string(),
            allowed_tools: allowed_tools.to_vec(),
            debug,
        };
        let input = serde_json::to_value(&req).map_err(Error::Json)?;

        let mut attempts_left = 1;
        let reply = loop {
            match self.spawn_once(&input).await {
                Ok(reply) => break reply,
                Err(e) if is_transient(&e) && attempts_left > 0 => {
                    tracing::warn!(error = %e, "executor call failed, retrying once");
                    attempts_left -= 1;
                }
                Err(e) => return Err(e),
            }
        };

        let parsed: ExecutorResponse = serde_json::from_str(&reply.stdout).map_err(|e| {
            Error::ExecutorMalformedOutput(format!(
                "{e}; stdout: {:.200}; stderr: {:.200}",
                reply.stdout, reply.stderr_tail
            ))
        })?;

        if let Some(msg) = parsed.error {
            return Err(Error::ExecutorCrash(msg));
        }

        Ok(parsed)
    }

    async fn spawn_once(
        &self,
        input: &serde_json::Value,
    ) -> Result<crate::subprocess::SubprocessReply, Error> {
        run_json_subprocess(
            &self.config.command,
            input,
            Duration::from_secs(self.config.timeout_sec),
            Duration::from_secs(self.config.kill_grace_sec),
            Error::ExecutorCrash,
            Error::ExecutorTimeout,
        )
        .await
    }
}

/// Transient, retry-eligible child-process failures (§7): the subprocess
/// itself crashed or ran past its timeout. Malformed/empty output that
/// the child returned cleanly is not transient and is not retried here.
fn is_transient(err: &Error) -> bool {
    matches!(err, Error::ExecutorCrash(_) | Error::ExecutorTimeout(_))
}
