//! Sync-and-deploy orchestration

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::cache::registry::ConfigRegistry;
use crate::deploy::locks::ProjectLocks;
use crate::deploy::pipeline::CommandPipeline;
use crate::deploy::sync::RepoSynchronizer;
use crate::errors::AgentError;
use crate::models::deployment::DeployRun;
use crate::models::project::{branch_from_ref, ProjectConfig};

/// What to do with a push notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushMatch {
    /// The pushed branch is the project's target branch
    Deploy { branch: String },

    /// Some other ref was pushed; nothing to do
    Skip { pushed: String, target: String },
}

/// Result of one project within a bulk pass
pub type ProjectResult = (String, Result<DeployRun, AgentError>);

/// Coordinates synchronization and command pipelines across projects
pub struct DeployOrchestrator {
    registry: Arc<ConfigRegistry>,
    synchronizer: RepoSynchronizer,
    pipeline: CommandPipeline,
    locks: ProjectLocks,
    bulk: Mutex<()>,
}

impl DeployOrchestrator {
    pub fn new(
        registry: Arc<ConfigRegistry>,
        synchronizer: RepoSynchronizer,
        pipeline: CommandPipeline,
    ) -> Self {
        Self {
            registry,
            synchronizer,
            pipeline,
            locks: ProjectLocks::new(),
            bulk: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<ConfigRegistry> {
        &self.registry
    }

    /// Decide whether a push of `git_ref` to `project` should deploy
    pub fn match_push(&self, project: &str, git_ref: &str) -> Result<PushMatch, AgentError> {
        let config = self.registry.get(project)?;
        let pushed = branch_from_ref(git_ref);
        let target = config.target_branch();

        if pushed == target {
            Ok(PushMatch::Deploy {
                branch: pushed.to_string(),
            })
        } else {
            info!(
                project = %project,
                "Branch {} does not match target branch {}. Skipping pull.", pushed, target
            );
            Ok(PushMatch::Skip {
                pushed: pushed.to_string(),
                target: target.to_string(),
            })
        }
    }

    /// Synchronize one project and run its pipeline.
    ///
    /// At most one pass per project runs at a time; a second trigger waits for
    /// the first to finish and then works from the state it left behind.
    pub async fn sync_and_deploy(&self, project: &str) -> Result<DeployRun, AgentError> {
        self.registry.get(project)?;

        let _guard = self.locks.acquire(project).await;
        // Re-read after waiting: a reload may have replaced or removed the entry.
        let config = self.registry.get(project)?;
        self.deploy_locked(&config).await
    }

    async fn deploy_locked(&self, project: &ProjectConfig) -> Result<DeployRun, AgentError> {
        let mut run = DeployRun::start(&project.name, project.target_branch());
        info!(project = %project.name, run_id = %run.id, "Sync and deploy starting");

        let synced = match self.synchronizer.ensure_up_to_date(project).await {
            Ok(synced) => synced,
            Err(e) => {
                error!(project = %project.name, run_id = %run.id, "Sync failed: {}", e);
                return Err(e);
            }
        };
        run.decision = Some(synced.decision);

        let outcomes = self
            .pipeline
            .run(&project.run, synced.working_dir.path())
            .await;
        run.finish(outcomes);

        info!(
            project = %project.name,
            run_id = %run.id,
            decision = ?synced.decision,
            head = synced.head.as_deref().unwrap_or("unknown"),
            commands = run.commands.len(),
            failed = run.failed_commands(),
            "Sync and deploy finished"
        );
        Ok(run)
    }

    /// Run `sync_and_deploy` for every project, one after another, in name order
    pub async fn sync_and_deploy_all(&self) -> Vec<ProjectResult> {
        let _bulk = self.bulk.lock().await;
        self.deploy_all_locked().await
    }

    /// Reload the registry, then redeploy every project.
    ///
    /// The reload happens under the bulk lock, so snapshots are installed in
    /// the order reloads were requested and never change mid-pass.
    pub async fn reload_and_deploy_all(&self) -> Result<Vec<ProjectResult>, AgentError> {
        let _bulk = self.bulk.lock().await;
        self.registry.reload().await?;
        self.locks.retain(|name| self.registry.get(name).is_ok()).await;
        Ok(self.deploy_all_locked().await)
    }

    async fn deploy_all_locked(&self) -> Vec<ProjectResult> {
        let names = self.registry.names();
        info!("Starting all apps ({})...", names.len());

        let mut results = Vec::with_capacity(names.len());
        for name in names {
            info!(project = %name, "Initializing...");
            let result = self.sync_and_deploy(&name).await;
            results.push((name, result));
        }

        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        info!("All apps processed ({} failed)", failed);
        results
    }

    /// Start `sync_and_deploy` in the background
    pub fn spawn_deploy(self: &Arc<Self>, project: String) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            match orchestrator.sync_and_deploy(&project).await {
                Ok(run) => info!(project = %project, run_id = %run.id, "Updated from webhook"),
                // Already reported by the pass itself
                Err(e) if e.is_sync_error() => {}
                Err(e) => warn!(project = %project, "Deploy not started: {}", e),
            }
        })
    }

    /// Start `sync_and_deploy_all` in the background
    pub fn spawn_deploy_all(self: &Arc<Self>) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            orchestrator.sync_and_deploy_all().await;
        })
    }

    /// Start `reload_and_deploy_all` in the background
    pub fn spawn_reload_all(self: &Arc<Self>) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestrator.reload_and_deploy_all().await {
                error!("Reload failed: {}", e);
            }
        })
    }
}
