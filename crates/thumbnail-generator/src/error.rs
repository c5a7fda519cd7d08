//! Error types for the upload and create-thumbnail functions.

use crate::resizer::ResizeError;
use object_gateway::StorageError;
use thiserror::Error;

/// Errors returned by [`Ingress::upload`](crate::Ingress::upload).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum UploadError {
    /// The object name is blank or would escape the `input/` prefix.
    #[error("invalid object name {name:?}")]
    InvalidName {
        /// Name as received.
        name: String,
    },

    /// The payload is not valid base64. Nothing was written.
    #[error("payload is not valid base64")]
    Decode(#[from] base64::DecodeError),

    /// Writing the original failed.
    #[error("failed to store upload")]
    Storage(#[from] StorageError),
}

impl UploadError {
    /// Whether the caller sent a request that can never succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidName { .. } | Self::Decode(_))
    }
}

/// Errors returned by [`Dispatcher::on_object_created`](crate::Dispatcher::on_object_created).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Reading the original or writing the thumbnail failed.
    #[error("storage operation failed")]
    Storage(#[from] StorageError),

    /// The original could not be resized. Nothing was written.
    #[error("failed to resize image")]
    Resize(#[from] ResizeError),

    /// The resize task was cancelled or panicked.
    #[error("resize task did not complete")]
    Interrupted(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use std::error::Error as _;

    #[test]
    fn test_client_errors() {
        let decode = STANDARD.decode("not-base64!!").unwrap_err();
        assert!(UploadError::from(decode).is_client_error());
        assert!(
            UploadError::InvalidName {
                name: String::new()
            }
            .is_client_error()
        );
        assert!(!UploadError::from(StorageError::not_found("input", "input/a.jpg")).is_client_error());
    }

    #[test]
    fn test_dispatch_error_keeps_source() {
        let err = DispatchError::from(StorageError::not_found("input", "input/a.jpg"));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "storage operation failed");
    }
}
