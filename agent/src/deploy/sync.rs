//! Working copy synchronization

use tracing::{debug, info};

use crate::deploy::git::{Git, GitError};
use crate::errors::AgentError;
use crate::filesys::dir::Dir;
use crate::models::deployment::SyncDecision;
use crate::models::project::ProjectConfig;

/// Marker whose presence makes a directory a working copy
pub const REPOSITORY_MARKER: &str = ".git";

/// Observed condition of a project's working directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkingCopyState {
    Absent,
    /// Directory exists but has no repository marker (e.g. an interrupted clone)
    Corrupt,
    Repository,
}

impl WorkingCopyState {
    /// Look at the filesystem. Never cached: the directory may change between runs.
    pub async fn observe(dir: &Dir) -> Self {
        if !dir.exists().await {
            WorkingCopyState::Absent
        } else if dir.contains(REPOSITORY_MARKER).await {
            WorkingCopyState::Repository
        } else {
            WorkingCopyState::Corrupt
        }
    }
}

/// First step implied by the working copy state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPlan {
    Clone,
    Fetch,
}

/// How the local branch relates to the fetched remote tip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteRelation {
    pub behind: u64,
    pub on_target_branch: bool,
}

pub fn classify(state: WorkingCopyState) -> SyncPlan {
    match state {
        WorkingCopyState::Absent | WorkingCopyState::Corrupt => SyncPlan::Clone,
        WorkingCopyState::Repository => SyncPlan::Fetch,
    }
}

pub fn decide(relation: RemoteRelation) -> SyncDecision {
    if !relation.on_target_branch {
        SyncDecision::SwitchBranch
    } else if relation.behind > 0 {
        SyncDecision::FetchThenPull {
            behind: relation.behind,
        }
    } else {
        SyncDecision::FetchNoOp
    }
}

/// Result of a successful synchronization
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub decision: SyncDecision,
    pub working_dir: Dir,
    pub head: Option<String>,
}

/// Brings project working copies in line with their target branch
#[derive(Debug, Clone)]
pub struct RepoSynchronizer {
    git: Git,
    apps_dir: Dir,
}

impl RepoSynchronizer {
    pub fn new(git: Git, apps_dir: Dir) -> Self {
        Self { git, apps_dir }
    }

    /// Working copy location for a project
    pub fn working_dir(&self, project: &ProjectConfig) -> Dir {
        self.apps_dir.subdir(&project.name)
    }

    /// Ensure the project's working copy exists and matches the target branch tip
    pub async fn ensure_up_to_date(&self, project: &ProjectConfig) -> Result<SyncOutcome, AgentError> {
        let branch = project.target_branch();
        let dir = self.working_dir(project);
        self.apps_dir.create().await?;

        let state = WorkingCopyState::observe(&dir).await;
        debug!(project = %project.name, "Working copy state: {:?}", state);

        let decision = match classify(state) {
            SyncPlan::Clone => {
                if state == WorkingCopyState::Corrupt {
                    info!(project = %project.name, "Removing invalid directory: {}", dir.path().display());
                    dir.delete().await?;
                }
                self.clone_fresh(project, branch, &dir).await?;
                SyncDecision::Clone
            }
            SyncPlan::Fetch => self.fetch_and_update(project, branch, &dir).await?,
        };

        let head = self.git.rev_parse(dir.path(), "HEAD").await.ok();
        Ok(SyncOutcome {
            decision,
            working_dir: dir,
            head,
        })
    }

    async fn clone_fresh(&self, project: &ProjectConfig, branch: &str, dir: &Dir) -> Result<(), AgentError> {
        info!(project = %project.name, "Cloning into {} on branch {}...", dir.path().display(), branch);

        let url = project.authenticated_url();
        let wrap = |e: GitError| AgentError::CloneError(project.redact(&e.to_string()));

        self.git.clone_branch(&url, branch, dir.path()).await.map_err(wrap)?;
        if url != project.repo {
            // git stores the clone URL; keep the token out of .git/config.
            self.git
                .set_remote_url(dir.path(), "origin", &project.repo)
                .await
                .map_err(wrap)?;
        }

        info!(project = %project.name, "Cloned");
        Ok(())
    }

    async fn fetch_and_update(
        &self,
        project: &ProjectConfig,
        branch: &str,
        dir: &Dir,
    ) -> Result<SyncDecision, AgentError> {
        info!(project = %project.name, "Fetching latest changes on branch {}...", branch);

        let path = dir.path();
        let fetch_err = |e: GitError| AgentError::FetchError(project.redact(&e.to_string()));
        let pull_err = |e: GitError| AgentError::PullError(project.redact(&e.to_string()));

        self.git
            .fetch(path, &project.authenticated_url(), branch)
            .await
            .map_err(fetch_err)?;

        let current = self.git.current_branch(path).await.map_err(fetch_err)?;
        let behind = self
            .git
            .behind_count(path, "HEAD", "FETCH_HEAD")
            .await
            .map_err(fetch_err)?;

        let decision = decide(RemoteRelation {
            behind,
            on_target_branch: current == branch,
        });

        match decision {
            SyncDecision::FetchThenPull { behind } => {
                info!(project = %project.name, "Behind by {} commit(s), pulling changes...", behind);
                self.git.fast_forward(path, "FETCH_HEAD").await.map_err(pull_err)?;
            }
            SyncDecision::SwitchBranch => {
                info!(project = %project.name, "On branch {}, switching to {}...", current, branch);
                self.git
                    .checkout_at(path, branch, "FETCH_HEAD")
                    .await
                    .map_err(pull_err)?;
            }
            SyncDecision::FetchNoOp | SyncDecision::Clone => {
                info!(project = %project.name, "Already up to date on branch {}", branch);
            }
        }

        Ok(decision)
    }
}
