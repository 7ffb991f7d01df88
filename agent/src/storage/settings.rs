//! Settings file management

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AgentError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,

    /// Directory for daily rolling log files, if any
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// HTTP listener configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Directory holding one `.ini` file per project
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Root under which each project's working copy lives
    #[serde(default = "default_apps_dir")]
    pub apps_dir: PathBuf,

    /// Shell used to run pipeline commands (`<shell> -c <command>`)
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Per-command deadline in seconds; unset means no deadline
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,

    /// Watch the config directory and redeploy on change
    #[serde(default = "default_true")]
    pub watch_config: bool,

    /// Debounce window for config change events
    #[serde(default = "default_watch_debounce_ms")]
    pub watch_debounce_ms: u64,

    /// Maximum delay for graceful shutdown
    #[serde(default = "default_max_shutdown_delay")]
    pub max_shutdown_delay_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("repos")
}

fn default_apps_dir() -> PathBuf {
    PathBuf::from("/apps")
}

fn default_shell() -> String {
    "sh".to_string()
}

fn default_watch_debounce_ms() -> u64 {
    500
}

fn default_max_shutdown_delay() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            config_dir: default_config_dir(),
            apps_dir: default_apps_dir(),
            shell: default_shell(),
            command_timeout_secs: None,
            watch_config: true,
            watch_debounce_ms: default_watch_debounce_ms(),
            max_shutdown_delay_secs: default_max_shutdown_delay(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file; a missing file yields defaults
    pub async fn load(file: &File) -> Result<Self, AgentError> {
        if !file.exists().await {
            info!("No settings file at {}, using defaults", file.path().display());
            return Ok(Self::default());
        }
        file.read_json::<Settings>().await
    }

    /// Apply `--key=value` command line overrides
    pub fn apply_overrides<'a>(
        &mut self,
        overrides: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<(), AgentError> {
        for (key, value) in overrides {
            match key {
                "config-dir" | "config_dir" => self.config_dir = PathBuf::from(value),
                "apps-dir" | "apps_dir" => self.apps_dir = PathBuf::from(value),
                "host" => self.server.host = value.to_string(),
                "port" => {
                    self.server.port = value.parse().map_err(|_| {
                        AgentError::ConfigError(format!("invalid port: {}", value))
                    })?
                }
                "log-level" | "log_level" => {
                    self.log_level = value.parse().map_err(AgentError::ConfigError)?
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9009
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
