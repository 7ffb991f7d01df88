//! On-disk configuration

pub mod project_file;
pub mod settings;
