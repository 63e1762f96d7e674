//! Staged diff collection by shelling out to the system `git` binary.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::DiffError;

/// Source of the staged diff fed to the model.
///
/// This abstraction allows replacing git in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiffSource: Send + Sync {
    /// Return the unified diff of staged changes. An empty string means
    /// nothing is staged.
    async fn staged_diff(&self, context_lines: Option<u32>) -> Result<String, DiffError>;
}

/// Runs `git diff --cached` in the given (or current) directory.
#[derive(Debug, Clone, Default)]
pub struct GitDiff {
    workdir: Option<PathBuf>,
}

impl GitDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run git inside `dir` instead of the process working directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: Some(dir.into()),
        }
    }
}

/// Build the argument list for `git diff`.
fn diff_args(context_lines: Option<u32>) -> Vec<String> {
    let mut args = vec![
        "diff".to_string(),
        "--cached".to_string(),
        "--no-color".to_string(),
        "--no-ext-diff".to_string(),
    ];
    if let Some(lines) = context_lines {
        args.push(format!("--unified={lines}"));
    }
    args
}

#[async_trait]
impl DiffSource for GitDiff {
    async fn staged_diff(&self, context_lines: Option<u32>) -> Result<String, DiffError> {
        let mut command = Command::new("git");
        command
            .args(diff_args(context_lines))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(DiffError::SpawnFailed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            return Err(DiffError::NonZeroExit { code, stderr });
        }

        let diff = String::from_utf8_lossy(&output.stdout).to_string();
        debug!("Collected staged diff: {} bytes", diff.len());
        Ok(diff)
    }
}

/// Check that git is installed and accessible.
pub fn check_git_installed() -> Result<(), DiffError> {
    which::which("git").map(|_| ()).map_err(|_| DiffError::NotInstalled)
}
