//! Thin async wrapper around the `git` command line

use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// A failed git invocation
#[derive(Debug, Error)]
#[error("git {op} failed: {message}")]
pub struct GitError {
    pub op: &'static str,
    pub message: String,
}

/// Runs git subcommands
#[derive(Debug, Clone)]
pub struct Git {
    program: String,
}

impl Default for Git {
    fn default() -> Self {
        Self::new("git")
    }
}

impl Git {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(
        &self,
        op: &'static str,
        dir: Option<&Path>,
        args: &[&str],
    ) -> Result<String, GitError> {
        debug!("git {}", op);

        let mut cmd = Command::new(&self.program);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        let output = cmd
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| GitError {
                op,
                message: format!("failed to run {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitError {
                op,
                message: if stderr.is_empty() {
                    format!("exited with {}", output.status)
                } else {
                    stderr
                },
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Clone `url` at `branch` into `target`
    pub async fn clone_branch(&self, url: &str, branch: &str, target: &Path) -> Result<(), GitError> {
        let target = target.to_string_lossy();
        self.run("clone", None, &["clone", "--branch", branch, "--", url, &target])
            .await
            .map(|_| ())
    }

    /// Overwrite the URL stored for `remote`
    pub async fn set_remote_url(&self, dir: &Path, remote: &str, url: &str) -> Result<(), GitError> {
        self.run("remote set-url", Some(dir), &["remote", "set-url", remote, url])
            .await
            .map(|_| ())
    }

    /// Fetch `branch` from `url`; the fetched tip is left in FETCH_HEAD
    pub async fn fetch(&self, dir: &Path, url: &str, branch: &str) -> Result<(), GitError> {
        self.run("fetch", Some(dir), &["fetch", "--quiet", url, branch])
            .await
            .map(|_| ())
    }

    /// Name of the checked-out branch, or `HEAD` when detached
    pub async fn current_branch(&self, dir: &Path) -> Result<String, GitError> {
        self.run("rev-parse", Some(dir), &["rev-parse", "--abbrev-ref", "HEAD"])
            .await
    }

    /// Number of commits reachable from `upstream` but not from `local`
    pub async fn behind_count(&self, dir: &Path, local: &str, upstream: &str) -> Result<u64, GitError> {
        let range = format!("{}..{}", local, upstream);
        let out = self
            .run("rev-list", Some(dir), &["rev-list", "--count", &range])
            .await?;
        out.parse().map_err(|_| GitError {
            op: "rev-list",
            message: format!("unexpected output: {}", out),
        })
    }

    /// Fast-forward the checked-out branch to `rev`
    pub async fn fast_forward(&self, dir: &Path, rev: &str) -> Result<(), GitError> {
        self.run("merge", Some(dir), &["merge", "--ff-only", "--quiet", rev])
            .await
            .map(|_| ())
    }

    /// Check out `branch`, creating or resetting it at `rev`
    pub async fn checkout_at(&self, dir: &Path, branch: &str, rev: &str) -> Result<(), GitError> {
        self.run("checkout", Some(dir), &["checkout", "--quiet", "-B", branch, rev])
            .await
            .map(|_| ())
    }

    /// Commit id of `rev`
    pub async fn rev_parse(&self, dir: &Path, rev: &str) -> Result<String, GitError> {
        self.run("rev-parse", Some(dir), &["rev-parse", rev]).await
    }
}
