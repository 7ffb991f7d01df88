//! Config directory watcher
//!
//! Any change to a project file reloads the registry and redeploys every
//! project. Bursts of events are collapsed into a single pass, and changes
//! that land while a pass is running produce exactly one follow-up pass.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::deploy::orchestrator::DeployOrchestrator;
use crate::errors::AgentError;
use crate::storage::project_file::PROJECT_FILE_EXTENSION;

/// Watcher worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Quiet period after the last change before a pass starts
    pub debounce: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
        }
    }
}

type EventRx = mpsc::UnboundedReceiver<notify::Result<Event>>;

/// Start watching `config_dir`. The returned watcher must be kept alive.
pub fn watch(config_dir: &Path) -> Result<(RecommendedWatcher, EventRx), AgentError> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    watcher.watch(config_dir, RecursiveMode::NonRecursive)?;
    debug!("Watching config directory {}", config_dir.display());
    Ok((watcher, event_rx))
}

/// Run the watcher worker
pub async fn run<S, F>(
    options: &Options,
    orchestrator: Arc<DeployOrchestrator>,
    mut events: EventRx,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Config watcher starting...");

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Config watcher shutting down...");
                return;
            }
            event = events.recv() => {
                let Some(event) = event else {
                    warn!("Config watcher channel closed");
                    return;
                };
                let Some(path) = changed_project_file(event) else { continue };
                info!("Config file changed: {}", path.display());
            }
        }

        // Keep passing until no change arrived during the last pass.
        loop {
            tokio::select! {
                _ = &mut shutdown_signal => {
                    info!("Config watcher shutting down...");
                    return;
                }
                quiet = wait_for_quiet(&mut events, options.debounce, &sleep_fn) => {
                    if !quiet {
                        warn!("Config watcher channel closed");
                        return;
                    }
                }
            }

            tokio::select! {
                _ = &mut shutdown_signal => {
                    info!("Config watcher shutting down mid-pass...");
                    return;
                }
                result = orchestrator.reload_and_deploy_all() => {
                    if let Err(e) = result {
                        error!("Reload after config change failed: {}", e);
                    }
                }
            }

            if !drain_changes(&mut events) {
                break;
            }
            info!("Config changed during the last pass, running again");
        }
    }
}

/// Wait until no project file has changed for `debounce`. Every relevant
/// event restarts the window. False if the event channel closed.
async fn wait_for_quiet<S, F>(events: &mut EventRx, debounce: Duration, sleep_fn: &S) -> bool
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    let mut window = Box::pin(sleep_fn(debounce));
    loop {
        tokio::select! {
            _ = &mut window => return true,
            event = events.recv() => {
                let Some(event) = event else { return false };
                if let Some(path) = changed_project_file(event) {
                    debug!("Coalescing change to {}", path.display());
                    window = Box::pin(sleep_fn(debounce));
                }
            }
        }
    }
}

/// Consume every queued event; true if any of them touched a project file
fn drain_changes(events: &mut EventRx) -> bool {
    let mut changed = false;
    while let Ok(event) = events.try_recv() {
        if let Some(path) = changed_project_file(event) {
            debug!("Coalescing change to {}", path.display());
            changed = true;
        }
    }
    changed
}

fn changed_project_file(event: notify::Result<Event>) -> Option<PathBuf> {
    match event {
        Ok(event) if is_relevant_event_kind(&event.kind) => {
            event.paths.into_iter().find(|p| is_project_file(p))
        }
        Ok(_) => None,
        Err(err) => {
            warn!("Watcher event error: {}", err);
            None
        }
    }
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn is_project_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(PROJECT_FILE_EXTENSION))
        .unwrap_or(false)
}
