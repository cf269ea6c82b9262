//! Shared subprocess wrapper used by both the executor and VLM adapters
//! (§4.6): write one JSON object to stdin, read exactly one JSON object
//! from stdout, enforce a wall-clock timeout with SIGTERM-then-SIGKILL,
//! and capture a bounded stderr tail for diagnostics.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::time::timeout;

use va_domain::Error;

/// Bytes of stderr retained for error diagnostics (§4.6: "~4 KB").
const STDERR_TAIL_BYTES: usize = 4096;

/// Outcome of a single subprocess round-trip.
pub struct SubprocessReply {
    pub stdout: String,
    pub stderr_tail: String,
}

/// Run `command` with `input` written as a single JSON line to stdin,
/// read its entire stdout after it exits, and enforce `call_timeout`.
/// On timeout, send SIGTERM and allow `kill_grace` before SIGKILL.
pub async fn run_json_subprocess(
    command: &[String],
    input: &serde_json::Value,
    call_timeout: Duration,
    kill_grace: Duration,
    crash_err: impl FnOnce(String) -> Error,
    timeout_err: impl FnOnce(u64) -> Error,
) -> Result<SubprocessReply, Error> {
    let Some((program, args)) = command.split_first() else {
        return Err(crash_err("empty subprocess command".into()));
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| crash_err(format!("failed to spawn {program}: {e}")))?;

    {
        let mut stdin = child.stdin.take().expect("piped stdin");
        let payload = serde_json::to_vec(input).map_err(Error::Json)?;
        // Best-effort write; a child that exits before reading stdin is
        // reported through its exit code / stderr, not this write.
        let _ = stdin.write_all(&payload).await;
        let _ = stdin.shutdown().await;
    }

    let stdout_pipe = child.stdout.take().expect("piped stdout");
    let stderr_pipe = child.stderr.take().expect("piped stderr");

    let stdout_task = tokio::spawn(read_all(stdout_pipe));
    let stderr_task = tokio::spawn(read_tail(stderr_pipe, STDERR_TAIL_BYTES));

    let wait_result = timeout(call_timeout, child.wait()).await;

    match wait_result {
        Ok(Ok(status)) => {
            let stdout = stdout_task.await.unwrap_or_default();
            let stderr_tail = stderr_task.await.unwrap_or_default();
            if !status.success() {
                tracing::warn!(%program, %status, "subprocess exited non-zero");
                return Err(crash_err(format!(
                    "exited with {status}; stderr: {stderr_tail}"
                )));
            }
            Ok(SubprocessReply {
                stdout,
                stderr_tail,
            })
        }
        Ok(Err(e)) => Err(crash_err(format!("wait failed: {e}"))),
        Err(_) => {
            tracing::warn!(%program, timeout_sec = call_timeout.as_secs(), "subprocess timed out, terminating");
            terminate_with_grace(&mut child, kill_grace).await;
            let _ = stdout_task.await;
            let _ = stderr_task.await;
            Err(timeout_err(call_timeout.as_secs()))
        }
    }
}

async fn read_all(mut pipe: impl tokio::io::AsyncRead + Unpin) -> String {
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

/// Read a pipe to completion but retain only the trailing `cap` bytes,
/// mirroring the bounded-output-buffer idiom used elsewhere for
/// subprocess diagnostics.
async fn read_tail(mut pipe: impl tokio::io::AsyncRead + Unpin, cap: usize) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.len() > cap * 2 {
                    let start = buf.len() - cap;
                    buf.drain(..start);
                }
            }
        }
    }
    if buf.len() > cap {
        let start = buf.len() - cap;
        buf.drain(..start);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// SIGTERM the child, wait up to `grace` for it to exit, then SIGKILL.
async fn terminate_with_grace(child: &mut Child, grace: Duration) {
    if let Some(pid) = child.id() {
        // SAFETY: `pid` is a live child PID owned by this process; sending
        // SIGTERM to our own child is a documented, non-racy use of kill(2).
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
    if timeout(grace, child.wait()).await.is_err() {
        let _ = child.kill().await;
        let _ = child.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_stdin_as_stdout() {
        let command = vec!["sh".to_string(), "-c".to_string(), "cat".to_string()];
        let input = serde_json::json!({"hello": "world"});
        let reply = run_json_subprocess(
            &command,
            &input,
            Duration::from_secs(5),
            Duration::from_secs(1),
            |m| Error::ExecutorCrash(m),
            Error::ExecutorTimeout,
        )
        .await
        .expect("subprocess should succeed");
        let parsed: serde_json::Value = serde_json::from_str(&reply.stdout).unwrap();
        assert_eq!(parsed, input);
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_crash_error() {
        let command = vec!["sh".to_string(), "-c".to_string(), "exit 1".to_string()];
        let err = run_json_subprocess(
            &command,
            &serde_json::json!({}),
            Duration::from_secs(5),
            Duration::from_secs(1),
            |m| Error::ExecutorCrash(m),
            Error::ExecutorTimeout,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "executor_crash");
    }

    #[tokio::test]
    async fn slow_child_is_timed_out_and_killed() {
        let command = vec!["sh".to_string(), "-c".to_string(), "sleep 30".to_string()];
        let start = std::time::Instant::now();
        let err = run_json_subprocess(
            &command,
            &serde_json::json!({}),
            Duration::from_millis(200),
            Duration::from_millis(200),
            |m| Error::ExecutorCrash(m),
            Error::ExecutorTimeout,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "executor_timeout");
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
