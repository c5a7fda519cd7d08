//! The storage capability consumed by the pipeline.

use crate::error::Result;
use crate::record::ObjectRecord;
use async_trait::async_trait;
use std::sync::Arc;

/// Get/put access to an object store.
///
/// Both operations are at-least-once from the caller's point of view: a put
/// may be repeated and simply overwrites. Individual objects are atomic, so a
/// get observes either the previous record or the new one in full.
#[async_trait]
pub trait ObjectGateway: Send + Sync {
    /// Reads an object with its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`](crate::StorageError::NotFound) when
    /// the object does not exist, or
    /// [`StorageError::Transient`](crate::StorageError::Transient) when the
    /// backend fails.
    async fn get(&self, container: &str, key: &str) -> Result<ObjectRecord>;

    /// Writes an object, replacing any existing object under the same key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transient`](crate::StorageError::Transient)
    /// when the backend fails; the previous object, if any, is left intact.
    async fn put(&self, record: ObjectRecord) -> Result<()>;
}

#[async_trait]
impl<T> ObjectGateway for Arc<T>
where
    T: ObjectGateway + ?Sized,
{
    async fn get(&self, container: &str, key: &str) -> Result<ObjectRecord> {
        (**self).get(container, key).await
    }

    async fn put(&self, record: ObjectRecord) -> Result<()> {
        (**self).put(record).await
    }
}
