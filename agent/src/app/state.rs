//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::DeployOptions;
use crate::cache::registry::ConfigRegistry;
use crate::deploy::git::Git;
use crate::deploy::orchestrator::DeployOrchestrator;
use crate::deploy::pipeline::CommandPipeline;
use crate::deploy::sync::RepoSynchronizer;
use crate::errors::AgentError;
use crate::filesys::dir::Dir;

/// Main application state
pub struct AppState {
    /// Project configurations
    pub registry: Arc<ConfigRegistry>,

    /// Sync-and-deploy coordinator
    pub orchestrator: Arc<DeployOrchestrator>,
}

impl AppState {
    /// Initialize application state. Project files are loaded here, before
    /// any trigger can reach the registry.
    pub async fn init(options: &DeployOptions) -> Result<Self, AgentError> {
        info!("Initializing application state...");

        let config_dir = Dir::new(&options.config_dir);
        config_dir.create().await?;
        let apps_dir = Dir::new(&options.apps_dir);
        apps_dir.create().await?;

        let registry = Arc::new(ConfigRegistry::new(config_dir));
        registry.reload().await?;
        let synchronizer = RepoSynchronizer::new(Git::default(), apps_dir);
        let pipeline = CommandPipeline::new(options.shell.clone(), options.command_timeout);

        let orchestrator = Arc::new(DeployOrchestrator::new(
            registry.clone(),
            synchronizer,
            pipeline,
        ));

        Ok(Self {
            registry,
            orchestrator,
        })
    }
}
