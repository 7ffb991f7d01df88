//! Background workers

pub mod watcher;
