//! auth::provider
//!
//! Credential provider implementations.
//!
//! - [`StaticCredential`] - a token known up front (tests, embedding)
//! - [`EnvCredential`] - read from an environment variable on every call
//! - [`FileCredential`] - read from a file on every call, so a rotated
//!   token is picked up without restarting
//!
//! [`from_config`] picks the file source when one is configured and falls
//! back to the environment.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::errors::AuthError;
use super::CredentialProvider;
use crate::core::config::AuthConfig;

/// A fixed token.
pub struct StaticCredential {
    token: String,
}

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredential")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn credential(&self) -> Result<String, AuthError> {
        checked(self.token.trim())
    }

    fn source(&self) -> String {
        "static".to_string()
    }
}

/// Token read from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl CredentialProvider for EnvCredential {
    async fn credential(&self) -> Result<String, AuthError> {
        match std::env::var(&self.var) {
            Ok(value) if !value.trim().is_empty() => checked(value.trim()),
            _ => Err(AuthError::MissingEnv(self.var.clone())),
        }
    }

    fn source(&self) -> String {
        format!("env:{}", self.var)
    }
}

/// Token read from a file. Surrounding whitespace is ignored.
#[derive(Debug, Clone)]
pub struct FileCredential {
    path: PathBuf,
}

impl FileCredential {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialProvider for FileCredential {
    async fn credential(&self) -> Result<String, AuthError> {
        let contents =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|e| AuthError::Unreadable {
                    path: self.path.clone(),
                    message: e.to_string(),
                })?;
        let token = contents.trim();
        if token.is_empty() {
            return Err(AuthError::EmptyFile(self.path.clone()));
        }
        checked(token)
    }

    fn source(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Build the provider described by configuration.
pub fn from_config(config: &AuthConfig) -> Arc<dyn CredentialProvider> {
    match &config.token_file {
        Some(path) => Arc::new(FileCredential::new(expand_home(path))),
        None => Arc::new(EnvCredential::new(&config.token_env)),
    }
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &std::path::Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Tokens end up in an `Authorization` header.
fn checked(token: &str) -> Result<String, AuthError> {
    if token.chars().any(|c| c.is_control() || !c.is_ascii()) {
        return Err(AuthError::Malformed);
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn static_credential_returns_token() {
        let provider = StaticCredential::new("ghp_abc");
        assert_eq!(provider.credential().await.unwrap(), "ghp_abc");
        assert_eq!(provider.source(), "static");
    }

    #[test]
    fn static_credential_debug_is_redacted() {
        let provider = StaticCredential::new("ghp_secret_value");
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("ghp_secret_value"));
        assert!(debug.contains("REDACTED"));
    }

    #[tokio::test]
    async fn env_credential_missing_variable() {
        let provider = EnvCredential::new("SITEGIT_TEST_SURELY_UNSET_VARIABLE");
        assert_eq!(
            provider.credential().await,
            Err(AuthError::MissingEnv(
                "SITEGIT_TEST_SURELY_UNSET_VARIABLE".into()
            ))
        );
    }

    #[tokio::test]
    async fn file_credential_trims_contents() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  ghp_from_file  ").unwrap();

        let provider = FileCredential::new(file.path());
        assert_eq!(provider.credential().await.unwrap(), "ghp_from_file");
    }

    #[tokio::test]
    async fn file_credential_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let provider = FileCredential::new(file.path());
        assert!(matches!(
            provider.credential().await,
            Err(AuthError::EmptyFile(_))
        ));
    }

    #[tokio::test]
    async fn file_credential_missing_file() {
        let provider = FileCredential::new("/no/such/token");
        assert!(matches!(
            provider.credential().await,
            Err(AuthError::Unreadable { .. })
        ));
    }

    #[tokio::test]
    async fn rejects_header_unsafe_tokens() {
        let provider = StaticCredential::new("abc\ndef");
        assert_eq!(provider.credential().await, Err(AuthError::Malformed));
    }

    #[test]
    fn from_config_prefers_file() {
        let config = AuthConfig {
            token_env: "X".into(),
            token_file: Some(PathBuf::from("/tmp/token")),
        };
        assert_eq!(from_config(&config).source(), "file:/tmp/token");

        let config = AuthConfig {
            token_env: "X".into(),
            token_file: None,
        };
        assert_eq!(from_config(&config).source(), "env:X");
    }
}
