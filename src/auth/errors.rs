//! auth::errors
//!
//! Credential error types.
//!
//! # Design
//!
//! Error messages never contain credential values. They name the source
//! (variable or file) that failed so the user knows what to fix.
//!
//! # Example
//!
//! ```
//! use sitegit::auth::AuthError;
//!
//! let err = AuthError::MissingEnv("GITHUB_TOKEN".to_string());
//! assert!(err.to_string().contains("GITHUB_TOKEN"));
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Errors from credential providers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The configured environment variable is unset or empty.
    #[error("no credential in environment variable '{0}'")]
    MissingEnv(String),

    /// The configured token file could not be read.
    #[error("cannot read token file '{path}': {message}")]
    Unreadable { path: PathBuf, message: String },

    /// The token file exists but holds no token.
    #[error("token file '{0}' is empty")]
    EmptyFile(PathBuf),

    /// The credential cannot be used in an HTTP header.
    #[error("credential contains characters not allowed in a header")]
    Malformed,
}
