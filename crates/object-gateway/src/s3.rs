//! Amazon S3 backed gateway.

use crate::error::{Result, StorageError};
use crate::gateway::ObjectGateway;
use crate::record::ObjectRecord;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;

/// An [`ObjectGateway`] over an S3 client. Containers map to buckets.
#[derive(Debug, Clone)]
pub struct S3Gateway {
    client: Client,
}

impl S3Gateway {
    /// Wraps an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the ambient AWS configuration (environment,
    /// profile, or the Lambda execution role).
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl ObjectGateway for S3Gateway {
    async fn get(&self, container: &str, key: &str) -> Result<ObjectRecord> {
        let output = self
            .client
            .get_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(GetObjectError::is_no_such_key)
                {
                    StorageError::not_found(container, key)
                } else {
                    StorageError::transient(container, key, err)
                }
            })?;

        let metadata = output.metadata().cloned().unwrap_or_default();
        let content_type = output.content_type().map(str::to_owned);
        let payload = output
            .body
            .collect()
            .await
            .map_err(|err| StorageError::transient(container, key, err))?
            .into_bytes();

        tracing::debug!(
            bucket = container,
            key,
            size = payload.len(),
            "Fetched object from S3"
        );

        Ok(ObjectRecord {
            container: container.to_owned(),
            key: key.to_owned(),
            payload,
            metadata,
            content_type,
        })
    }

    async fn put(&self, record: ObjectRecord) -> Result<()> {
        let ObjectRecord {
            container,
            key,
            payload,
            metadata,
            content_type,
        } = record;
        let size = payload.len();

        self.client
            .put_object()
            .bucket(&container)
            .key(&key)
            .body(ByteStream::from(payload))
            .set_metadata(Some(metadata))
            .set_content_type(content_type)
            .send()
            .await
            .map_err(|err| StorageError::transient(&container, &key, err))?;

        tracing::debug!(bucket = %container, key = %key, size, "Stored object in S3");
        Ok(())
    }
}
