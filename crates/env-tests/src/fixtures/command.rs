//! Subprocess execution for kubectl and helm.

use harness_common::error::{CollaboratorError, Result};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Run `program` with `args`, optionally feeding `stdin`, and return stdout.
///
/// A non-zero exit status becomes [`CollaboratorError::CommandFailed`]
/// carrying the trimmed stderr.
pub async fn run_command(program: &str, args: &[&str], stdin: Option<&[u8]>) -> Result<Vec<u8>> {
    debug!(target: "env_tests.command", program, ?args, "Running command");

    let mut command = Command::new(program);
    command
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|source| CollaboratorError::Spawn {
        program: program.to_string(),
        source,
    })?;

    if let Some(input) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(input).await?;
        }
    }

    let output = child.wait_with_output().await?;

    if !output.status.success() {
        return Err(CollaboratorError::CommandFailed {
            program: program.to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}
