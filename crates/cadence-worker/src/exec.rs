//! One-shot command execution for the drain loop.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

/// Classified outcome of one command run.
///
/// Never an error: spawn failures, timeouts, and nonzero exits all fold into
/// a failure outcome so the drain loop keeps going.
#[derive(Debug)]
pub struct ExecOutcome {
    pub success: bool,
    pub message: String,
}

impl ExecOutcome {
    fn ok(message: String) -> Self {
        Self {
            success: true,
            message,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
        }
    }
}

/// Run `command` via `sh -c`, capturing stdout and stderr.
///
/// Classification:
/// - spawn error or nonzero exit → failure;
/// - zero exit but stderr containing "error" (case-insensitive) → failure.
///   Some tools report problems on the diagnostic stream while still exiting
///   0, so the marker outranks the exit code;
/// - otherwise success, message carrying the trimmed stdout.
///
/// With `timeout` set the child is killed on expiry and reported as failed.
/// Without it a hung command blocks the caller indefinitely.
pub async fn run_command(command: &str, timeout: Option<Duration>) -> ExecOutcome {
    if command.trim().is_empty() {
        return ExecOutcome::failed("No command provided".to_string());
    }
    debug!(%command, "spawning");

    let child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(child) => child,
        Err(e) => return ExecOutcome::failed(format!("Error: {e}")),
    };

    let output = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(result) => result,
            // Dropping the timed-out future reaps the child (kill_on_drop).
            Err(_) => {
                return ExecOutcome::failed(format!(
                    "Error: command timed out after {}s",
                    limit.as_secs()
                ))
            }
        },
        None => child.wait_with_output().await,
    };

    let output = match output {
        Ok(output) => output,
        Err(e) => return ExecOutcome::failed(format!("Error: {e}")),
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        let detail = if stderr.trim().is_empty() {
            match output.status.code() {
                Some(code) => format!("command exited with code {code}"),
                None => "command terminated by signal".to_string(),
            }
        } else {
            stderr.trim().to_string()
        };
        return ExecOutcome::failed(format!("Error: {detail}"));
    }

    if stderr.to_lowercase().contains("error") {
        return ExecOutcome::failed(format!("Error in output: {}", stderr.trim()));
    }

    ExecOutcome::ok(format!("Successfully executed: {}", stdout.trim()))
}
