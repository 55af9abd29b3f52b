//! content::about
//!
//! The about page document.

use serde::{Deserialize, Serialize};

/// The about page: a heading, a one-line description and a markdown body.
///
/// Stored as a single JSON object. Missing fields decode as empty strings so
/// a hand-edited file with only a body still loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AboutDocument {
    /// Page heading
    pub title: String,
    /// Short description shown under the heading
    pub description: String,
    /// Markdown body
    pub content: String,
}

impl AboutDocument {
    /// Apply the fields that are present, keeping the rest.
    ///
    /// Used by editors that only change part of the document.
    pub fn with_changes(
        mut self,
        title: Option<String>,
        description: Option<String>,
        content: Option<String>,
    ) -> Self {
        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(content) = content {
            self.content = content;
        }
        self
    }
}
