//! hookdeploy library
//!
//! Config registry, repository synchronization, command pipelines and the
//! webhook server that ties them together.

pub mod app;
pub mod cache;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod server;
pub mod storage;
pub mod utils;
pub mod workers;
