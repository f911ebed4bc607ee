//! Subprocess execution with a hard timeout and bounded output capture.
//!
//! Used by the git collaborator and the terminal module. The child is spawned
//! with `kill_on_drop`, so abandoning it on timeout also kills it.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Maximum bytes kept from stdout/stderr.
pub const MAX_OUTPUT_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("program not found: {0}")]
    NotFound(String),
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    #[error("process error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub truncated: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Keep the first [`MAX_OUTPUT_BYTES`] of `pipe` and discard the rest, so the
/// child never blocks on a full pipe. The flag is set when bytes were dropped.
async fn capture<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<(Vec<u8>, bool)> {
    let Some(mut pipe) = pipe else {
        return Ok((Vec::new(), false));
    };
    let mut kept = Vec::new();
    (&mut pipe).take(MAX_OUTPUT_BYTES as u64).read_to_end(&mut kept).await?;
    let dropped = tokio::io::copy(&mut pipe, &mut tokio::io::sink()).await?;
    Ok((kept, dropped > 0))
}

/// Run `cmd` to completion, or kill it once `timeout` elapses.
pub async fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<CommandOutput, RunError> {
    let program = format!("{:?}", cmd.as_std().get_program());
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => RunError::NotFound(program.clone()),
        _ => RunError::Io(e),
    })?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let run = async {
        let ((out, out_cut), (err, err_cut), status) =
            tokio::try_join!(capture(stdout), capture(stderr), child.wait())?;
        Ok::<_, io::Error>((out, err, out_cut || err_cut, status))
    };

    match tokio::time::timeout(timeout, run).await {
        Ok(Ok((stdout, stderr, truncated, status))) => {
            debug!(%program, code = ?status.code(), stdout_len = stdout.len(), truncated, "process finished");
            Ok(CommandOutput {
                code: status.code(),
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                truncated,
            })
        }
        Ok(Err(e)) => Err(RunError::Io(e)),
        Err(_elapsed) => {
            warn!(%program, timeout_ms = timeout.as_millis() as u64, "process timed out, killed");
            Err(RunError::TimedOut(timeout))
        }
    }
}
