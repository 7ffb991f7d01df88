//! Per-project mutual exclusion

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async lock per project name.
///
/// Holding the guard for a project means no other sync-and-deploy pass for
/// that project is running; later callers queue in FIFO order.
#[derive(Default)]
pub struct ProjectLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `project`
    pub async fn acquire(&self, project: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(
                locks
                    .entry(project.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Whether a pass currently holds the lock for `project`
    pub async fn is_busy(&self, project: &str) -> bool {
        let locks = self.locks.lock().await;
        locks
            .get(project)
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }

    /// Drop idle locks for projects that are no longer configured
    pub async fn retain(&self, keep: impl Fn(&str) -> bool) {
        let mut locks = self.locks.lock().await;
        locks.retain(|name, lock| keep(name) || Arc::strong_count(lock) > 1);
    }
}
