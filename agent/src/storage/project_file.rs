//! Project file decoding
//!
//! A project file is an INI document in the config directory, one per project:
//!
//! ```ini
//! repo = https://github.com/acme/site.git
//! token = ghp_xxx
//! branch = main
//! run = ['npm ci', 'npm run build', 'systemctl restart site']
//! ```

use ini::{Ini, ParseOption};
use secrecy::SecretString;

use crate::errors::AgentError;
use crate::filesys::file::File;
use crate::models::project::ProjectConfig;

/// Extension of project files inside the config directory
pub const PROJECT_FILE_EXTENSION: &str = "ini";

/// Read and decode a project file. The project name is the file stem.
pub async fn load_project(file: &File) -> Result<ProjectConfig, AgentError> {
    let name = file.stem().ok_or_else(|| {
        AgentError::ConfigError(format!("invalid project file name: {}", file.path().display()))
    })?;
    let contents = file.read_string().await?;
    parse_project(name, &contents)
}

/// Decode the contents of a project file
pub fn parse_project(name: &str, contents: &str) -> Result<ProjectConfig, AgentError> {
    validate_name(name)?;

    // Values must reach us verbatim: the run list is quoted JSON and commands
    // may contain backslashes.
    let options = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..Default::default()
    };
    let doc = Ini::load_from_str_opt(contents, options)
        .map_err(|e| AgentError::ConfigError(format!("{}: {}", name, e)))?;

    let get = |key: &str| -> Option<String> {
        doc.section(None::<String>)
            .and_then(|props| props.get(key))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let repo = get("repo")
        .ok_or_else(|| AgentError::ConfigError(format!("{}: missing `repo`", name)))?;

    let run = match get("run") {
        Some(raw) => decode_run_list(&raw)
            .map_err(|e| AgentError::ConfigError(format!("{}: invalid `run`: {}", name, e)))?,
        None => Vec::new(),
    };

    Ok(ProjectConfig {
        name: name.to_string(),
        repo,
        token: get("token").map(SecretString::from),
        branch: get("branch"),
        run,
    })
}

/// Project names become directory names under the apps root
fn validate_name(name: &str) -> Result<(), AgentError> {
    let valid = !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\']);
    if valid {
        Ok(())
    } else {
        Err(AgentError::ValidationError(format!("invalid project name: {:?}", name)))
    }
}

/// Decode a run list written with single-quoted JSON syntax.
///
/// Quotes are normalized to double quotes first. If that produces invalid
/// JSON (a command containing an apostrophe), the raw value is tried as
/// plain JSON.
pub fn decode_run_list(raw: &str) -> Result<Vec<String>, serde_json::Error> {
    let normalized = raw.replace('\'', "\"");
    match serde_json::from_str::<Vec<String>>(&normalized) {
        Ok(commands) => Ok(commands),
        Err(err) => serde_json::from_str::<Vec<String>>(raw).map_err(|_| err),
    }
}
