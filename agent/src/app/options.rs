//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use crate::storage::settings::Settings;
use crate::workers::watcher;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Deployment configuration
    pub deploy: DeployOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Watch the config directory for changes
    pub enable_watcher: bool,

    /// Config watcher options
    pub watcher: watcher::Options,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            deploy: DeployOptions::default(),
            server: ServerOptions::default(),
            enable_watcher: true,
            watcher: watcher::Options::default(),
        }
    }
}

impl From<&Settings> for AppOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            lifecycle: LifecycleOptions {
                max_shutdown_delay: Duration::from_secs(settings.max_shutdown_delay_secs),
            },
            deploy: DeployOptions {
                config_dir: settings.config_dir.clone(),
                apps_dir: settings.apps_dir.clone(),
                shell: settings.shell.clone(),
                command_timeout: settings.command_timeout(),
            },
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            enable_watcher: settings.watch_config,
            watcher: watcher::Options {
                debounce: Duration::from_millis(settings.watch_debounce_ms),
            },
        }
    }
}

/// Lifecycle options for the agent
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Where projects come from and how they are deployed
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Directory of project files
    pub config_dir: PathBuf,

    /// Root of the working copies
    pub apps_dir: PathBuf,

    /// Shell for pipeline commands
    pub shell: String,

    /// Per-command deadline
    pub command_timeout: Option<Duration>,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("repos"),
            apps_dir: PathBuf::from("/apps"),
            shell: "sh".to_string(),
            command_timeout: None,
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9009,
        }
    }
}
