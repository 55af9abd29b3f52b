//! auth
//!
//! The credential boundary.
//!
//! Producing a credential (signing, OAuth, key exchange) happens elsewhere;
//! this module only defines how the object store asks for one and ships the
//! simple sources a deployment needs: a static token, an environment
//! variable and a token file.
//!
//! # Security
//!
//! Credentials never appear in logs, error messages or `Debug` output.
//!
//! # Example
//!
//! ```
//! use sitegit::auth::{CredentialProvider, StaticCredential};
//!
//! # tokio_test::block_on(async {
//! let provider = StaticCredential::new("ghp_example");
//! assert_eq!(provider.credential().await.unwrap(), "ghp_example");
//! # });
//! ```

mod errors;
mod provider;

pub use errors::AuthError;
pub use provider::{from_config, EnvCredential, FileCredential, StaticCredential};

/// Source of the bearer credential attached to every store request.
///
/// Implementations are asked once per request, so a source that can change
/// underneath (a rotated token file) is always read fresh.
#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Return a bearer credential.
    ///
    /// # Errors
    ///
    /// Any [`AuthError`] means no credential can be produced; callers treat
    /// it as fatal for the current operation.
    async fn credential(&self) -> Result<String, AuthError>;

    /// Human-readable description of where the credential comes from.
    fn source(&self) -> String;
}
