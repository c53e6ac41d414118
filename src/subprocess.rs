//! Bounded subprocess execution for the task executor's tool step (spec §4.5
//! step 7).
//!
//! The timeout-and-concurrent-capture shape here is the same one used
//! throughout this codebase's command-execution tooling: spawn under
//! `tokio::process::Command`, read stdout/stderr concurrently with
//! `tokio::join!` so neither pipe's buffer can deadlock the other, and kill +
//! wait the child on any early exit path so no file descriptors leak.

use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;

use crate::error::ToolError;

/// Subprocess timeout mandated by spec §4.5 step 7 / §5.
pub const SUBPROCESS_TIMEOUT_SECS: u64 = 120;

const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Outcome of running one tool's `command_string`.
#[derive(Debug, Clone)]
pub struct SubprocessResult {
    pub combined_output: String,
    pub exit_code: i32,
    pub succeeded: bool,
}

async fn read_limited<R: AsyncReadExt + Unpin>(
    mut reader: R,
    max_bytes: usize,
    stream_name: &'static str,
) -> Result<Vec<u8>, ToolError> {
    let mut buf = Vec::new();
    let mut chunk = vec![0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => return Ok(buf),
            Ok(n) => {
                if buf.len() + n > max_bytes {
                    return Err(ToolError::OutputTooLarge(format!(
                        "{} exceeded the {} byte limit",
                        stream_name, max_bytes
                    )));
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            Err(e) => return Err(ToolError::ExecutionFailed(e.to_string())),
        }
    }
}

/// Shell-interpret `command` with the 120s bound from spec §4.5/§5, capturing
/// stdout and stderr into a single combined string. Runs with the current
/// working directory and environment of the Runtime process, as specified.
pub async fn execute_bounded(command: &str) -> SubprocessResult {
    let mut cmd = TokioCommand::new("/bin/bash");
    cmd.arg("-c")
        .arg(command)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            return SubprocessResult {
                combined_output: format!("Error: {}", e),
                exit_code: -1,
                succeeded: false,
            }
        }
    };
    let stdout_pipe = child.stdout.take().expect("stdout was piped");
    let stderr_pipe = child.stderr.take().expect("stderr was piped");

    let wait_and_read = async {
        let (stdout_result, stderr_result) = tokio::join!(
            read_limited(stdout_pipe, MAX_OUTPUT_BYTES, "stdout"),
            read_limited(stderr_pipe, MAX_OUTPUT_BYTES, "stderr"),
        );

        let (stdout_bytes, stderr_bytes) = match (stdout_result, stderr_result) {
            (Err(e), _) | (_, Err(e)) => return Err(e),
            (Ok(out), Ok(err)) => (out, err),
        };

        let status = child
            .wait()
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        let mut combined = String::from_utf8_lossy(&stdout_bytes).into_owned();
        combined.push_str(&String::from_utf8_lossy(&stderr_bytes));

        let exit_code = status.code().unwrap_or(-1);
        Ok((combined, exit_code, status.success()))
    };

    let timeout = std::time::Duration::from_secs(SUBPROCESS_TIMEOUT_SECS);
    match tokio::time::timeout(timeout, wait_and_read).await {
        Ok(Ok((combined_output, exit_code, succeeded))) => SubprocessResult {
            combined_output,
            exit_code,
            succeeded,
        },
        Ok(Err(e)) => SubprocessResult {
            combined_output: format!("Error: {}", e),
            exit_code: -1,
            succeeded: false,
        },
        Err(_) => {
            // `wait_and_read` (and the `child` it borrowed) was dropped when the
            // timeout fired; `kill_on_drop` signals the process, but we still
            // reap it here so the exit status is collected promptly.
            let _ = child.start_kill();
            let _ = child.wait().await;
            SubprocessResult {
                combined_output: format!(
                    "Error: command exceeded {} second timeout",
                    SUBPROCESS_TIMEOUT_SECS
                ),
                exit_code: -1,
                succeeded: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_success() {
        let result = execute_bounded("echo hello").await;
        assert!(result.succeeded);
        assert_eq!(result.exit_code, 0);
        assert!(result.combined_output.contains("hello"));
    }

    #[tokio::test]
    async fn captures_nonzero_exit() {
        let result = execute_bounded("exit 3").await;
        assert!(!result.succeeded);
        assert_eq!(result.exit_code, 3);
    }

    #[tokio::test]
    async fn captures_stderr() {
        let result = execute_bounded("echo oops 1>&2; exit 1").await;
        assert!(!result.succeeded);
        assert!(result.combined_output.contains("oops"));
    }
}
