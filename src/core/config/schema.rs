//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! [remote]
//! owner = "someone"
//! repo = "site"
//! branch = "main"
//! timeout_secs = 20
//!
//! [auth]
//! token_env = "GITHUB_TOKEN"
//!
//! [guestbook]
//! path = "public/guestbook/messages.json"
//! on_conflict = { mode = "reapply", max_attempts = 3 }
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing: the branch must be a valid branch
//! name, content paths must be valid repository paths, and numeric limits
//! must be positive.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::{BranchName, RepoPath};
use crate::pipeline::ConflictPolicy;

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Default environment variable holding the bearer credential.
pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Where the about document lives in the content repository.
pub const DEFAULT_ABOUT_PATH: &str = "src/app/about/list.json";

/// Where the guestbook message list lives in the content repository.
pub const DEFAULT_GUESTBOOK_PATH: &str = "public/guestbook/messages.json";

/// Longest guestbook message accepted, in characters.
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 100;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Remote repository settings
    pub remote: RemoteConfig,

    /// Credential source
    pub auth: AuthConfig,

    /// About document flow
    pub about: AboutConfig,

    /// Guestbook flow
    pub guestbook: GuestbookConfig,
}

impl SiteConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.remote.validate()?;
        self.auth.validate()?;
        validate_path("about.path", &self.about.path)?;
        validate_policy("about.on_conflict", self.about.on_conflict)?;
        validate_path("guestbook.path", &self.guestbook.path)?;
        validate_policy("guestbook.on_conflict", self.guestbook.on_conflict)?;
        if self.guestbook.max_content_chars == 0 {
            return Err(ConfigError::InvalidValue(
                "guestbook.max_content_chars must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Remote repository settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// Repository owner (user or organization)
    pub owner: Option<String>,

    /// Repository name
    pub repo: Option<String>,

    /// Branch that holds the site content
    pub branch: String,

    /// API base URL (GitHub Enterprise or a test server)
    pub api_base: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            owner: None,
            repo: None,
            branch: "main".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl RemoteConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        BranchName::new(&self.branch).map_err(|e| {
            ConfigError::InvalidValue(format!("remote.branch '{}': {}", self.branch, e))
        })?;
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "remote.timeout_secs must be at least 1".into(),
            ));
        }
        for (key, value) in [("remote.owner", &self.owner), ("remote.repo", &self.repo)] {
            if let Some(v) = value {
                if v.is_empty() || v.contains('/') {
                    return Err(ConfigError::InvalidValue(format!(
                        "{key} '{v}' must be a single non-empty path segment"
                    )));
                }
            }
        }
        Ok(())
    }

    /// The configured branch, validated.
    pub fn branch_name(&self) -> Result<BranchName, ConfigError> {
        BranchName::new(&self.branch).map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }

    /// Owner and repository, required by every remote command.
    pub fn repository(&self) -> Result<(&str, &str), ConfigError> {
        match (self.owner.as_deref(), self.repo.as_deref()) {
            (Some(owner), Some(repo)) => Ok((owner, repo)),
            _ => Err(ConfigError::Missing("remote.owner and remote.repo")),
        }
    }
}

/// Credential source settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Environment variable holding the token
    pub token_env: String,

    /// File holding the token (takes precedence over `token_env`)
    pub token_file: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            token_file: None,
        }
    }
}

impl AuthConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.token_env.is_empty() || self.token_env.contains('=') {
            return Err(ConfigError::InvalidValue(format!(
                "auth.token_env '{}' is not a valid variable name",
                self.token_env
            )));
        }
        Ok(())
    }
}

/// About document flow settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AboutConfig {
    /// Repository path of the encoded document
    pub path: String,

    /// What to do when the branch moved during a save
    pub on_conflict: ConflictPolicy,
}

impl Default for AboutConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_ABOUT_PATH.to_string(),
            on_conflict: ConflictPolicy::Surface,
        }
    }
}

impl AboutConfig {
    pub fn repo_path(&self) -> Result<RepoPath, ConfigError> {
        RepoPath::new(&self.path).map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }
}

/// Guestbook flow settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GuestbookConfig {
    /// Repository path of the encoded message list
    pub path: String,

    /// What to do when the branch moved during a post
    pub on_conflict: ConflictPolicy,

    /// Longest accepted message, in characters
    pub max_content_chars: usize,
}

impl Default for GuestbookConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_GUESTBOOK_PATH.to_string(),
            on_conflict: ConflictPolicy::Reapply { max_attempts: 3 },
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
        }
    }
}

impl GuestbookConfig {
    pub fn repo_path(&self) -> Result<RepoPath, ConfigError> {
        RepoPath::new(&self.path).map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }
}

fn validate_path(key: &str, path: &str) -> Result<(), ConfigError> {
    RepoPath::new(path)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidValue(format!("{key}: {e}")))
}

fn validate_policy(key: &str, policy: ConflictPolicy) -> Result<(), ConfigError> {
    match policy {
        ConflictPolicy::Reapply { max_attempts: 0 } => Err(ConfigError::InvalidValue(format!(
            "{key}: max_attempts must be at least 1"
        ))),
        _ => Ok(()),
    }
}
