//! In-memory project registry

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::errors::AgentError;
use crate::filesys::dir::Dir;
use crate::models::project::{ProjectConfig, ProjectSummary};
use crate::storage::project_file::{load_project, PROJECT_FILE_EXTENSION};

/// Immutable snapshot of every loaded project, keyed and ordered by name
pub type ProjectMap = BTreeMap<String, Arc<ProjectConfig>>;

/// Result of a registry reload
#[derive(Debug, Default)]
pub struct ReloadReport {
    /// Projects present in the new snapshot
    pub loaded: Vec<String>,

    /// Projects whose file could not be decoded, with the reason
    pub failed: Vec<(String, AgentError)>,
}

/// Registry of project configurations.
///
/// Readers always see a complete snapshot: a reload builds a new map and swaps
/// it in with a single pointer replacement.
pub struct ConfigRegistry {
    config_dir: Dir,
    projects: RwLock<Arc<ProjectMap>>,
}

impl ConfigRegistry {
    /// Create an empty registry backed by `config_dir`
    pub fn new(config_dir: Dir) -> Self {
        Self {
            config_dir,
            projects: RwLock::new(Arc::new(ProjectMap::new())),
        }
    }

    /// Directory scanned on reload
    pub fn config_dir(&self) -> &Dir {
        &self.config_dir
    }

    /// Re-scan the config directory and replace the whole snapshot.
    ///
    /// A project file that fails to decode is left out of the new snapshot and
    /// reported; it never prevents other projects from loading. If the
    /// directory itself cannot be read the previous snapshot is kept.
    pub async fn reload(&self) -> Result<ReloadReport, AgentError> {
        let files = self
            .config_dir
            .list_files_with_extension(PROJECT_FILE_EXTENSION)
            .await
            .map_err(|e| {
                AgentError::ConfigError(format!(
                    "cannot read config directory {}: {}",
                    self.config_dir.path().display(),
                    e
                ))
            })?;

        let mut next = ProjectMap::new();
        let mut report = ReloadReport::default();

        for file in files {
            let name = file.stem().unwrap_or_default().to_string();
            match load_project(&file).await {
                Ok(project) => {
                    next.insert(project.name.clone(), Arc::new(project));
                }
                Err(e) => {
                    warn!(project = %name, "Skipping project: {}", e);
                    report.failed.push((name, e));
                }
            }
        }

        report.loaded = next.keys().cloned().collect();
        info!(
            "Loaded {} project(s): [{}]",
            report.loaded.len(),
            report.loaded.join(", ")
        );

        self.replace(next);
        Ok(report)
    }

    /// Swap in a new snapshot
    pub fn replace(&self, projects: ProjectMap) {
        let mut current = self.projects.write().unwrap_or_else(|e| e.into_inner());
        *current = Arc::new(projects);
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<ProjectMap> {
        self.projects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Configuration of one project
    pub fn get(&self, name: &str) -> Result<Arc<ProjectConfig>, AgentError> {
        self.snapshot()
            .get(name)
            .cloned()
            .ok_or_else(|| AgentError::NotFound(format!("no config found for {}", name)))
    }

    /// Project names in stable (sorted) order
    pub fn names(&self) -> Vec<String> {
        self.snapshot().keys().cloned().collect()
    }

    /// Credential-free summaries in stable order
    pub fn summaries(&self) -> Vec<ProjectSummary> {
        self.snapshot().values().map(|p| p.summary()).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
