//! Project models

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use url::Url;

/// Branch used when a project does not name one
pub const DEFAULT_BRANCH: &str = "main";

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Sync and deploy configuration for one project
#[derive(Debug)]
pub struct ProjectConfig {
    /// Unique project name (config file stem)
    pub name: String,

    /// Remote repository URL, without credentials
    pub repo: String,

    /// Access token embedded into the remote URL at the point of use
    pub token: Option<SecretString>,

    /// Configured target branch
    pub branch: Option<String>,

    /// Shell commands run after every synchronization, in order
    pub run: Vec<String>,
}

impl ProjectConfig {
    /// Branch that receives deployments
    pub fn target_branch(&self) -> &str {
        self.branch
            .as_deref()
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_BRANCH)
    }

    /// Remote URL with the access token injected as userinfo.
    ///
    /// Only http(s) remotes carry the token; anything else is returned as is.
    pub fn authenticated_url(&self) -> String {
        let Some(token) = self.token.as_ref().map(|t| t.expose_secret()) else {
            return self.repo.clone();
        };
        if token.is_empty() {
            return self.repo.clone();
        }

        match Url::parse(&self.repo) {
            Ok(mut url) if matches!(url.scheme(), "http" | "https") => {
                if url.set_username(token).is_err() {
                    return self.repo.clone();
                }
                url.to_string()
            }
            _ => self.repo.clone(),
        }
    }

    /// Replace every occurrence of the token in `text` with `***`, both as
    /// written and as percent-encoded into a URL.
    pub fn redact(&self, text: &str) -> String {
        let Some(token) = self.token.as_ref().map(|t| t.expose_secret()) else {
            return text.to_string();
        };
        if token.is_empty() {
            return text.to_string();
        }

        let mut redacted = text.to_string();
        if let Some(encoded) = encoded_userinfo(token).filter(|e| e != token) {
            redacted = redacted.replace(&encoded, "***");
        }
        redacted.replace(token, "***")
    }

    /// Public view of the project, safe to log or serve
    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            name: self.name.clone(),
            repo: self.repo.clone(),
            branch: self.target_branch().to_string(),
            commands: self.run.len(),
        }
    }
}

/// Credential-free view of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub name: String,
    pub repo: String,
    pub branch: String,
    pub commands: usize,
}

/// `value` as it appears in the userinfo of a serialized URL
fn encoded_userinfo(value: &str) -> Option<String> {
    let mut url = Url::parse("https://host.invalid").ok()?;
    url.set_username(value).ok()?;
    Some(url.username().to_string())
}

/// Branch name carried by a push ref.
///
/// `refs/heads/<branch>` yields `<branch>`; any other ref is returned unchanged
/// so that tags and notes never match a branch name.
pub fn branch_from_ref(git_ref: &str) -> &str {
    git_ref.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(git_ref)
}
