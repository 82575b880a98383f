//! Utilities for running external commands with captured output and timeouts

use anyhow::{Context, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Captured output of a finished or killed command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, when the process exited on its own
    pub exit_code: Option<i32>,
    /// True when the process was killed because the time limit elapsed
    pub timed_out: bool,
}

impl CommandOutput {
    /// True when the process exited on its own with code 0
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Run a command, capturing stdout and stderr, with an optional wall-clock
/// time limit.
///
/// The output pipes are drained while the process runs, so anything written
/// before a timeout kill is still present in the returned output. A non-zero
/// exit is not an error here; callers classify exit codes themselves. Only
/// failing to spawn or wait on the process is an error.
pub async fn run_command(
    program: &str,
    args: &[&str],
    timeout: Option<Duration>,
) -> Result<CommandOutput> {
    debug!("Running command: {} {}", program, args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn {program}"))?;

    let stdout_task = drain_pipe(child.stdout.take());
    let stderr_task = drain_pipe(child.stderr.take());

    let (exit_code, timed_out) = wait_with_timeout(&mut child, program, timeout).await?;

    let stdout = String::from_utf8_lossy(&stdout_task.await.unwrap_or_default()).into_owned();
    let stderr = String::from_utf8_lossy(&stderr_task.await.unwrap_or_default()).into_owned();

    if timed_out {
        warn!("Command timed out and was killed: {} {}", program, args.join(" "));
    } else if exit_code != Some(0) {
        debug!("Command exited with {:?}: {} {}", exit_code, program, args.join(" "));
    }

    Ok(CommandOutput {
        stdout,
        stderr,
        exit_code,
        timed_out,
    })
}

fn drain_pipe<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    })
}

async fn wait_with_timeout(
    child: &mut Child,
    program: &str,
    timeout: Option<Duration>,
) -> Result<(Option<i32>, bool)> {
    let Some(limit) = timeout else {
        let status = child
            .wait()
            .await
            .with_context(|| format!("Failed to wait for {program}"))?;
        return Ok((status.code(), false));
    };

    match tokio::time::timeout(limit, child.wait()).await {
        Ok(status) => {
            let status = status.with_context(|| format!("Failed to wait for {program}"))?;
            Ok((status.code(), false))
        }
        Err(_) => {
            if let Err(e) = child.start_kill() {
                warn!("Failed to kill timed-out process {}: {}", program, e);
            }
            // Reap the child so the output pipes close and the drain
            // tasks can finish.
            let _ = child.wait().await;
            Ok((None, true))
        }
    }
}
