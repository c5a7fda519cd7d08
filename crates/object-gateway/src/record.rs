//! The unit of storage: payload plus metadata.

use bytes::Bytes;
use std::collections::HashMap;

/// A stored object addressed by container and key.
///
/// Records are written whole and never updated in place; writing the same
/// key again replaces the previous record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Container (bucket) holding the object.
    pub container: String,
    /// Object key, e.g. `input/cat.jpg`.
    pub key: String,
    /// Object contents.
    pub payload: Bytes,
    /// User metadata.
    pub metadata: HashMap<String, String>,
    /// MIME type, if known.
    pub content_type: Option<String>,
}

impl ObjectRecord {
    /// Creates a record with no metadata and no content type.
    pub fn new(container: impl Into<String>, key: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
            payload: payload.into(),
            metadata: HashMap::new(),
            content_type: None,
        }
    }

    /// Replaces the user metadata.
    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets the MIME type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}
