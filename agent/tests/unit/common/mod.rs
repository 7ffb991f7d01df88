//! Shared fixtures: throwaway git remotes and project configs

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use hookdeploy::models::project::ProjectConfig;
use tempfile::TempDir;

/// Run git in `dir` and return trimmed stdout, panicking on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Test",
            "-c",
            "user.email=test@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A bare "remote" repository plus a scratch clone used to push commits to it
pub struct Remote {
    pub root: TempDir,
    pub bare: PathBuf,
    pub work: PathBuf,
    counter: usize,
}

impl Remote {
    /// Create a remote whose `main` branch has one commit
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let bare = root.path().join("remote.git");
        let work = root.path().join("author");
        fs::create_dir_all(&bare).unwrap();
        fs::create_dir_all(&work).unwrap();

        git(&bare, &["init", "--bare", "--quiet"]);
        git(&bare, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(&work, &["init", "--quiet"]);
        git(&work, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(&work, &["remote", "add", "origin", bare.to_str().unwrap()]);

        let mut remote = Self {
            root,
            bare,
            work,
            counter: 0,
        };
        remote.commit("main", "initial");
        remote
    }

    pub fn url(&self) -> String {
        self.bare.to_str().unwrap().to_string()
    }

    /// Commit a new file on `branch` and push it; returns the new commit id
    pub fn commit(&mut self, branch: &str, message: &str) -> String {
        let current = git(&self.work, &["symbolic-ref", "--short", "HEAD"]);
        if current != branch {
            let exists = Command::new("git")
                .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{}", branch)])
                .current_dir(&self.work)
                .output()
                .unwrap()
                .status
                .success();
            if exists {
                git(&self.work, &["checkout", "--quiet", branch]);
            } else {
                git(&self.work, &["checkout", "--quiet", "-b", branch]);
            }
        }
        self.counter += 1;
        fs::write(
            self.work.join(format!("file-{}.txt", self.counter)),
            message,
        )
        .unwrap();
        git(&self.work, &["add", "-A"]);
        git(&self.work, &["commit", "--quiet", "-m", message]);
        git(
            &self.work,
            &["push", "--quiet", "origin", &format!("HEAD:refs/heads/{}", branch)],
        );
        git(&self.work, &["rev-parse", "HEAD"])
    }

    /// Tip of `branch` on the remote
    pub fn tip(&self, branch: &str) -> String {
        git(&self.bare, &["rev-parse", &format!("refs/heads/{}", branch)])
    }
}

/// Project config pointing at a local remote
pub fn project(name: &str, repo: &str, branch: Option<&str>, run: &[&str]) -> ProjectConfig {
    ProjectConfig {
        name: name.to_string(),
        repo: repo.to_string(),
        token: None,
        branch: branch.map(str::to_string),
        run: run.iter().map(|c| c.to_string()).collect(),
    }
}

/// Write a project file into `config_dir`
pub fn write_project_file(config_dir: &Path, name: &str, contents: &str) {
    fs::write(config_dir.join(format!("{}.ini", name)), contents).unwrap();
}
