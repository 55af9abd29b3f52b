//! site::errors
//!
//! Errors from the about and guestbook flows.

use thiserror::Error;

use crate::content::ContentError;
use crate::core::config::ConfigError;
use crate::core::types::RepoPath;
use crate::pipeline::CommitError;
use crate::store::StoreError;

/// Errors from [`super::Site`] operations.
#[derive(Debug, Error)]
pub enum SiteError {
    /// Committing or reading through the pipeline failed.
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// A stored document is not valid.
    #[error("cannot decode '{path}': {source}")]
    Decode {
        path: RepoPath,
        #[source]
        source: ContentError,
    },

    /// The document does not exist at the branch tip.
    #[error("'{0}' does not exist on the content branch")]
    MissingDocument(RepoPath),

    /// A submission was rejected before anything was sent.
    #[error("{0}")]
    Invalid(ContentError),

    /// The site could not be configured.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<StoreError> for SiteError {
    fn from(err: StoreError) -> Self {
        SiteError::Commit(CommitError::from(err))
    }
}

impl SiteError {
    /// Whether this is a lost compare-and-swap.
    pub fn is_conflict(&self) -> bool {
        matches!(self, SiteError::Commit(err) if err.is_conflict())
    }

    /// Text shown to the person using the site.
    pub fn user_message(&self) -> String {
        match self {
            SiteError::Commit(err) => err.user_message().to_string(),
            SiteError::Invalid(err) => err.to_string(),
            SiteError::MissingDocument(path) => format!("Nothing is stored at '{path}' yet."),
            SiteError::Decode { .. } => "The stored content is damaged and cannot be shown.".into(),
            SiteError::Config(err) => err.to_string(),
        }
    }
}
