//! In-memory state

pub mod registry;
