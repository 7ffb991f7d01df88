//! Sequential command pipeline

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{info, warn};

use crate::models::deployment::{CommandOutcome, CommandStatus};

/// Runs deploy commands one after another in a working copy.
///
/// A failing command is reported and the next one still runs.
#[derive(Debug, Clone)]
pub struct CommandPipeline {
    shell: String,
    timeout: Option<Duration>,
}

impl Default for CommandPipeline {
    fn default() -> Self {
        Self::new("sh", None)
    }
}

impl CommandPipeline {
    pub fn new(shell: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            shell: shell.into(),
            timeout,
        }
    }

    /// Run every command in order; returns one outcome per command
    pub async fn run(&self, commands: &[String], working_dir: &Path) -> Vec<CommandOutcome> {
        let mut outcomes = Vec::with_capacity(commands.len());
        for command in commands {
            let outcome = self.run_one(command, working_dir).await;
            report(&outcome, working_dir);
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn run_one(&self, command: &str, working_dir: &Path) -> CommandOutcome {
        info!("Running: {} in {}", command, working_dir.display());
        let started = Instant::now();

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a timeout can take down everything the shell started.
        #[cfg(unix)]
        cmd.process_group(0);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return CommandOutcome {
                    command: command.to_string(),
                    status: CommandStatus::SpawnFailed {
                        reason: e.to_string(),
                    },
                    stdout: String::new(),
                    stderr: String::new(),
                    duration: started.elapsed(),
                };
            }
        };
        let pid = child.id();
        let output = child.wait_with_output();

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, output).await {
                Ok(result) => result,
                Err(_) => {
                    kill_process_group(pid);
                    return CommandOutcome {
                        command: command.to_string(),
                        status: CommandStatus::TimedOut {
                            after_ms: limit.as_millis(),
                        },
                        stdout: String::new(),
                        stderr: String::new(),
                        duration: started.elapsed(),
                    };
                }
            },
            None => output.await,
        };

        match result {
            Ok(output) => CommandOutcome {
                command: command.to_string(),
                status: if output.status.success() {
                    CommandStatus::Succeeded
                } else {
                    CommandStatus::Failed {
                        code: output.status.code(),
                    }
                },
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                duration: started.elapsed(),
            },
            Err(e) => CommandOutcome {
                command: command.to_string(),
                status: CommandStatus::SpawnFailed {
                    reason: format!("wait failed: {}", e),
                },
                stdout: String::new(),
                stderr: String::new(),
                duration: started.elapsed(),
            },
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };
    // SAFETY: kill(2) takes plain integers and touches no memory of ours.
    let rc = unsafe { libc::kill(-pid, libc::SIGKILL) };
    if rc != 0 {
        warn!("Failed to kill process group {}: {}", pid, std::io::Error::last_os_error());
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

fn report(outcome: &CommandOutcome, working_dir: &Path) {
    let stdout = outcome.stdout.trim_end();
    let stderr = outcome.stderr.trim_end();
    if !stdout.is_empty() {
        info!("{}", stdout);
    }
    if !stderr.is_empty() {
        warn!("{}", stderr);
    }

    match outcome.error() {
        None => info!("Finished: {} ({} ms)", outcome.command, outcome.duration.as_millis()),
        Some(e) => warn!("{} (in {})", e, working_dir.display()),
    }
}
