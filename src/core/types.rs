//! core::types
//!
//! Strong types for the objects the commit pipeline moves around.
//!
//! # Types
//!
//! - [`BranchName`] - Validated branch name (the mutable pointer being advanced)
//! - [`ObjectId`] - Opaque content identifier returned by the remote store
//! - [`RepoPath`] - Validated repository-relative file path
//! - [`FileMode`] / [`ObjectKind`] - Tree entry metadata
//!
//! # Validation
//!
//! These types enforce validity at construction time so a malformed path or
//! branch is rejected before any network round trip is made.
//!
//! # Examples
//!
//! ```
//! use sitegit::core::types::{BranchName, ObjectId, RepoPath};
//!
//! let branch = BranchName::new("main").unwrap();
//! let path = RepoPath::new("public/guestbook/messages.json").unwrap();
//! let id = ObjectId::new("3b18e512dba79e4c8300dd08aeb37f8e728b8dad").unwrap();
//!
//! assert_eq!(branch.as_str(), "main");
//! assert_eq!(path.file_name(), "messages.json");
//! assert_eq!(id.short(7), "3b18e51");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(RepoPath::new("../escape").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("invalid repository path: {0}")]
    InvalidPath(String),
}

/// A validated branch name.
///
/// Branch names must conform to git's refname rules (see `git check-ref-format`):
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
///
/// # Example
///
/// ```
/// use sitegit::core::types::BranchName;
///
/// let name = BranchName::new("content/drafts").unwrap();
/// assert_eq!(name.as_str(), "content/drafts");
/// assert_eq!(name.ref_path(), "heads/content/drafts");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |why: &str| Err(TypeError::InvalidBranchName(why.to_string()));

        if name.is_empty() {
            return reject("branch name cannot be empty");
        }
        if name == "@" {
            return reject("branch name cannot be '@' (reserved)");
        }
        if name.starts_with('.') || name.starts_with('-') {
            return reject("branch name cannot start with '.' or '-'");
        }
        if name.ends_with(".lock") || name.ends_with('/') {
            return reject("branch name cannot end with '.lock' or '/'");
        }
        for bad in ["..", "@{", "//"] {
            if name.contains(bad) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{bad}'"
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name
            .chars()
            .find(|c| INVALID_CHARS.contains(c) || c.is_ascii_control())
        {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot contain {c:?}"
            )));
        }

        if name
            .split('/')
            .any(|component| component.starts_with('.') || component.ends_with(".lock"))
        {
            return reject("path component cannot start with '.' or end with '.lock'");
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The ref path relative to `refs/`, as the git-data API addresses it.
    pub fn ref_path(&self) -> String {
        format!("heads/{}", self.0)
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A content identifier issued by the object store.
///
/// Identifiers are treated as opaque: GitHub hands out 40-character SHA-1
/// hex strings, the in-memory store uses SHA-256. The only requirement is a
/// non-empty string without whitespace; equality is plain string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Create a new object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidObjectId` for empty ids or ids containing whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.is_empty() {
            return Err(TypeError::InvalidObjectId("object id cannot be empty".into()));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(TypeError::InvalidObjectId(format!(
                "object id cannot contain whitespace: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    /// Create an object id from a digest.
    pub(crate) fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    /// Get an abbreviated form of the id.
    ///
    /// Returns the first `len` characters, or the full id if it is shorter.
    pub fn short(&self, len: usize) -> &str {
        match self.0.char_indices().nth(len) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ObjectId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated path inside the content repository.
///
/// Paths are relative and slash separated. Empty, `.` and `..` components
/// are rejected, as are absolute paths and backslashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoPath(String);

impl RepoPath {
    /// Create a new validated repository path.
    pub fn new(path: impl Into<String>) -> Result<Self, TypeError> {
        let path = path.into();
        if path.is_empty() {
            return Err(TypeError::InvalidPath("path cannot be empty".into()));
        }
        if path.starts_with('/') {
            return Err(TypeError::InvalidPath(format!("path must be relative: {path}")));
        }
        if path.contains('\\') || path.chars().any(|c| c.is_control()) {
            return Err(TypeError::InvalidPath(format!(
                "path contains forbidden characters: {path:?}"
            )));
        }
        if path
            .split('/')
            .any(|component| component.is_empty() || component == "." || component == "..")
        {
            return Err(TypeError::InvalidPath(format!(
                "path has an empty, '.' or '..' component: {path}"
            )));
        }
        Ok(Self(path))
    }

    /// Iterate over the slash-separated components.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// The final component.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Get the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RepoPath {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RepoPath> for String {
    fn from(path: RepoPath) -> Self {
        path.0
    }
}

impl AsRef<str> for RepoPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepoPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mode of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileMode {
    /// Regular, non-executable file
    #[default]
    Blob,
    /// Executable file
    Executable,
    /// Subdirectory
    Tree,
}

impl FileMode {
    /// The octal mode string used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Blob => "100644",
            FileMode::Executable => "100755",
            FileMode::Tree => "040000",
        }
    }

    /// Parse a wire mode string. Unknown modes yield `None`.
    pub fn parse(mode: &str) -> Option<Self> {
        match mode {
            "100644" => Some(FileMode::Blob),
            "100755" => Some(FileMode::Executable),
            "040000" | "40000" => Some(FileMode::Tree),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of object a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ObjectKind {
    #[default]
    Blob,
    Tree,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
