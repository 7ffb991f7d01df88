//! Server state

use std::sync::Arc;

use crate::deploy::orchestrator::DeployOrchestrator;

/// Server state shared across handlers
pub struct ServerState {
    pub orchestrator: Arc<DeployOrchestrator>,
}

impl ServerState {
    pub fn new(orchestrator: Arc<DeployOrchestrator>) -> Self {
        Self { orchestrator }
    }
}
