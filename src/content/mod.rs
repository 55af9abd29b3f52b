//! content
//!
//! Application documents and their byte encoding.
//!
//! # Design
//!
//! Every document the site stores is a [`Document`]: a serde value encoded
//! as two-space indented JSON. Encoding is deterministic (field order is
//! declaration order, floats use shortest round-trip formatting), so saving
//! an unchanged document yields byte-identical content and therefore the
//! same blob identifier.
//!
//! # Documents
//!
//! - [`AboutDocument`] - title, description and markdown body of the about page
//! - [`Guestbook`] - ordered list of [`GuestbookMessage`]s
//!
//! # Example
//!
//! ```
//! use sitegit::content::{AboutDocument, Document};
//!
//! let doc = AboutDocument {
//!     title: "Hello".into(),
//!     description: "About me".into(),
//!     content: "# Hi".into(),
//! };
//! let bytes = doc.encode().unwrap();
//! assert_eq!(AboutDocument::decode(&bytes).unwrap(), doc);
//! ```

mod about;
mod guestbook;

pub use about::AboutDocument;
pub use guestbook::{
    Guestbook, GuestbookMessage, MessageDraft, Position, PALETTE, SCALE_RANGE, X_RANGE, Y_RANGE,
};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors from encoding, decoding or validating documents.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentError {
    /// The value could not be serialized (e.g. a non-finite number).
    #[error("failed to encode document: {0}")]
    Encode(String),

    /// The stored bytes are not a valid document.
    #[error("failed to decode document: {0}")]
    Decode(String),

    /// A draft was rejected before it became a document.
    #[error("{0}")]
    Invalid(String),
}

/// A value that is persisted as a file in the content repository.
pub trait Document: Serialize + DeserializeOwned {
    /// Encode to the bytes stored in the repository.
    fn encode(&self) -> Result<Vec<u8>, ContentError> {
        serde_json::to_vec_pretty(self).map_err(|e| ContentError::Encode(e.to_string()))
    }

    /// Decode stored bytes.
    fn decode(bytes: &[u8]) -> Result<Self, ContentError> {
        serde_json::from_slice(bytes).map_err(|e| ContentError::Decode(e.to_string()))
    }
}

impl Document for AboutDocument {}
