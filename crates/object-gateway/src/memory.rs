//! In-process object store for tests and local runs.

use crate::error::{Result, StorageError};
use crate::gateway::ObjectGateway;
use crate::record::ObjectRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

type ObjectKey = (String, String);

#[derive(Debug, Error)]
#[error("in-memory storage is unavailable")]
struct Unavailable;

/// An [`ObjectGateway`] backed by a map guarded by an async lock.
///
/// Clones share the same objects. Puts replace whole records under the write
/// lock, so concurrent readers never see a partial object.
///
/// # Example
///
/// ```
/// use object_gateway::{InMemoryGateway, ObjectGateway, ObjectRecord};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let gateway = InMemoryGateway::new();
/// gateway
///     .put(ObjectRecord::new("images", "input/cat.jpg", &b"jpeg"[..]))
///     .await
///     .unwrap();
///
/// let record = gateway.get("images", "input/cat.jpg").await.unwrap();
/// assert_eq!(&record.payload[..], b"jpeg");
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    objects: Arc<RwLock<HashMap<ObjectKey, ObjectRecord>>>,
    unavailable: Arc<AtomicBool>,
    puts: Arc<AtomicUsize>,
}

impl InMemoryGateway {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent get and put fail with
    /// [`StorageError::Transient`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Removes an object. Returns whether it existed.
    pub async fn delete(&self, container: &str, key: &str) -> bool {
        self.objects
            .write()
            .await
            .remove(&(container.to_owned(), key.to_owned()))
            .is_some()
    }

    /// Sorted keys in `container` starting with `prefix`.
    pub async fn keys(&self, container: &str, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .await
            .keys()
            .filter(|(c, k)| c == container && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Whether an object exists.
    pub async fn contains(&self, container: &str, key: &str) -> bool {
        self.objects
            .read()
            .await
            .contains_key(&(container.to_owned(), key.to_owned()))
    }

    /// Number of successful puts since creation.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn check_available(&self, container: &str, key: &str) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::transient(container, key, Unavailable));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectGateway for InMemoryGateway {
    async fn get(&self, container: &str, key: &str) -> Result<ObjectRecord> {
        self.check_available(container, key)?;

        self.objects
            .read()
            .await
            .get(&(container.to_owned(), key.to_owned()))
            .cloned()
            .ok_or_else(|| StorageError::not_found(container, key))
    }

    async fn put(&self, record: ObjectRecord) -> Result<()> {
        self.check_available(&record.container, &record.key)?;

        tracing::trace!(
            container = %record.container,
            key = %record.key,
            size = record.payload.len(),
            "Storing object in memory"
        );

        let id = (record.container.clone(), record.key.clone());
        self.objects.write().await.insert(id, record);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
