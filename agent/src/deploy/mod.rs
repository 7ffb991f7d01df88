//! Deployment module

pub mod git;
pub mod locks;
pub mod orchestrator;
pub mod pipeline;
pub mod sync;
