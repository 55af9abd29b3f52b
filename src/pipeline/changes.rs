//! pipeline::changes
//!
//! The set of file contents one commit writes.

use std::collections::BTreeMap;

use super::errors::CommitError;
use crate::content::Document;
use crate::core::types::RepoPath;

/// Mapping from repository path to new file content.
///
/// Keyed by path, so one commit can never name a path twice. Iteration is
/// in path order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    files: BTreeMap<RepoPath, Vec<u8>>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set raw content for `path`, replacing any earlier entry.
    pub fn insert_bytes(&mut self, path: RepoPath, content: impl Into<Vec<u8>>) -> &mut Self {
        self.files.insert(path, content.into());
        self
    }

    /// Encode `document` and set it as the content for `path`.
    pub fn insert_document<D: Document>(
        &mut self,
        path: RepoPath,
        document: &D,
    ) -> Result<&mut Self, CommitError> {
        let bytes = document.encode().map_err(|source| CommitError::Encode {
            path: path.clone(),
            source,
        })?;
        Ok(self.insert_bytes(path, bytes))
    }

    /// Build a change set holding a single encoded document.
    pub fn single<D: Document>(path: RepoPath, document: &D) -> Result<Self, CommitError> {
        let mut changes = Self::new();
        changes.insert_document(path, document)?;
        Ok(changes)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn get(&self, path: &RepoPath) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn paths(&self) -> impl Iterator<Item = &RepoPath> {
        self.files.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RepoPath, &[u8])> {
        self.files.iter().map(|(p, c)| (p, c.as_slice()))
    }
}
