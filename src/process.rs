//! Runner for external command-line tools.
//!
//! Tools are spawned with piped stdio; the child is killed when its future is
//! dropped, so a timeout never leaves a stray process behind. One runner owns
//! a small tokio runtime and may be shared across rayon workers.

use crate::error::{Result, RopCheckError};
use crate::timeout::{with_timeout, TimeoutConfig};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::{Builder, Runtime};
use tracing::trace;

/// Owns the runtime used to drive external tool invocations.
pub struct ToolRunner {
    runtime: Runtime,
}

impl ToolRunner {
    /// Build a runner with `workers` runtime threads.
    pub fn new(workers: usize) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers.max(1))
            .thread_name("ropcheck-tool")
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }

    /// Run `program args...`, feed `stdin`, and return captured stdout.
    ///
    /// A non-zero exit status is an error; a missing executable maps to
    /// [`RopCheckError::MissingTool`].
    pub fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&[u8]>,
        timeout: TimeoutConfig,
    ) -> Result<Vec<u8>> {
        self.runtime
            .block_on(with_timeout(timeout, run_tool(program, args, stdin)))
    }
}

async fn run_tool(program: &str, args: &[String], stdin: Option<&[u8]>) -> Result<Vec<u8>> {
    trace!(program, ?args, "Spawning tool");
    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RopCheckError::MissingTool(program.to_string()),
            _ => RopCheckError::Io(e),
        })?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input).await?;
        // dropping the pipe closes the child's stdin
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        return Err(RopCheckError::ToolFailed {
            tool: program.to_string(),
            status: output.status.code().unwrap_or(-1),
        });
    }
    Ok(output.stdout)
}

/// Locate `program` on `PATH`.
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
