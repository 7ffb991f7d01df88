//! Deployment models

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AgentError;

/// How a working copy was brought up to date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDecision {
    /// No usable working copy; clone from scratch
    Clone,

    /// Local branch was behind the fetched tip and was fast-forwarded
    FetchThenPull { behind: u64 },

    /// Local branch already at (or ahead of) the fetched tip
    FetchNoOp,

    /// A different branch was checked out; switched to the target branch
    SwitchBranch,
}

/// Result of running one pipeline command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandStatus {
    Succeeded,
    Failed { code: Option<i32> },
    SpawnFailed { reason: String },
    TimedOut { after_ms: u128 },
}

/// Outcome of one pipeline command
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub command: String,
    #[serde(flatten)]
    pub status: CommandStatus,
    pub stdout: String,
    pub stderr: String,
    #[serde(skip)]
    pub duration: Duration,
}

impl CommandOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == CommandStatus::Succeeded
    }

    /// The failure as an error, if the command did not succeed
    pub fn error(&self) -> Option<AgentError> {
        let reason = match &self.status {
            CommandStatus::Succeeded => return None,
            CommandStatus::Failed { code: Some(code) } => format!("exit code {}", code),
            CommandStatus::Failed { code: None } => "terminated by signal".to_string(),
            CommandStatus::SpawnFailed { reason } => format!("spawn failed: {}", reason),
            CommandStatus::TimedOut { after_ms } => format!("timed out after {} ms", after_ms),
        };
        Some(AgentError::CommandError(format!("{}: {}", self.command, reason)))
    }
}

/// One sync-and-deploy pass for a project. Lives only as long as the pass.
#[derive(Debug, Clone, Serialize)]
pub struct DeployRun {
    pub id: Uuid,
    pub project: String,
    pub branch: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub decision: Option<SyncDecision>,
    pub commands: Vec<CommandOutcome>,
}

impl DeployRun {
    pub fn start(project: &str, branch: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            project: project.to_string(),
            branch: branch.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            decision: None,
            commands: Vec::new(),
        }
    }

    /// Number of commands that failed for any reason
    pub fn failed_commands(&self) -> usize {
        self.commands.iter().filter(|c| !c.succeeded()).count()
    }

    pub fn finish(&mut self, commands: Vec<CommandOutcome>) {
        self.commands = commands;
        self.finished_at = Some(Utc::now());
    }
}
