//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! The first file found wins; later locations are not merged in:
//! 1. An explicit path (the `--config` flag)
//! 2. `$SITEGIT_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/sitegit/config.toml`
//! 4. `~/.sitegit/config.toml` (canonical location)
//!
//! When no file exists, defaults are used. A file that exists but cannot be
//! parsed or validated is an error.
//!
//! # Example
//!
//! ```no_run
//! use sitegit::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("branch: {}", config.site.remote.branch);
//! ```

pub mod schema;

pub use schema::{AboutConfig, AuthConfig, GuestbookConfig, RemoteConfig, SiteConfig};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SITEGIT_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("config file '{0}' does not exist")]
    NotFound(PathBuf),

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("missing required config: {0}")]
    Missing(&'static str),
}

/// Loaded configuration plus where it came from.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// The parsed settings
    pub site: SiteConfig,
    /// Path of the file that was loaded, if any
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from an explicit path or the default locations.
    ///
    /// # Errors
    ///
    /// An explicit path that does not exist is an error; missing default
    /// locations are not. Files that exist but fail to parse or validate
    /// are errors.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::from_file(path);
        }

        match Self::discover() {
            Some(path) => Self::from_file(&path),
            None => {
                tracing::debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Find the first existing config file in the default locations.
    fn discover() -> Option<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            candidates.push(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            candidates.push(PathBuf::from(xdg_home).join("sitegit/config.toml"));
        }
        if let Some(path) = Self::default_path() {
            candidates.push(path);
        }

        candidates.into_iter().find(|p| p.exists())
    }

    /// The canonical config location, `~/.sitegit/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".sitegit/config.toml"))
    }

    /// Read, parse and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let site = Self::parse(&contents).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(Self {
            site,
            path: Some(path.to_path_buf()),
        })
    }

    /// Parse and validate config text.
    pub fn parse(contents: &str) -> Result<SiteConfig, ConfigError> {
        let site: SiteConfig = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        site.validate()?;
        Ok(site)
    }

    /// Path of the loaded file, `None` when running on defaults.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
