//! Error types for storage operations.

use thiserror::Error;

/// Boxed error source from a storage backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A specialised Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors surfaced by an [`ObjectGateway`](crate::ObjectGateway).
///
/// A failed put never leaves a partially written object behind: the object
/// is either fully replaced or unchanged.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StorageError {
    /// The object does not exist.
    #[error("object {container}/{key} not found")]
    NotFound {
        /// Container that was read.
        container: String,
        /// Key that was read.
        key: String,
    },

    /// The backend failed; the caller's runtime may retry.
    #[error("storage request for {container}/{key} failed")]
    Transient {
        /// Container addressed by the request.
        container: String,
        /// Key addressed by the request.
        key: String,
        /// Backend error.
        #[source]
        source: BoxError,
    },
}

impl StorageError {
    /// Creates a [`StorageError::NotFound`].
    pub fn not_found(container: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            container: container.into(),
            key: key.into(),
        }
    }

    /// Creates a [`StorageError::Transient`] wrapping a backend error.
    pub fn transient(
        container: impl Into<String>,
        key: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Transient {
            container: container.into(),
            key: key.into(),
            source: source.into(),
        }
    }

    /// Returns `true` for [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
