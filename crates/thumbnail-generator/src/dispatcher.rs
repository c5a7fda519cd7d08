//! Create-thumbnail step triggered by storage events.
//!
//! The dispatcher reads the original, resizes it and writes the thumbnail
//! under the same name with the `output/` prefix. The original's metadata is
//! forwarded unchanged, so the trace context travels with the thumbnail too.
//! Running it twice for the same key produces the same thumbnail.

use crate::config::{Config, ThumbnailSize};
use crate::error::DispatchError;
use crate::ingress::{CONTAINER_ATTRIBUTE, INPUT_PREFIX, KEY_ATTRIBUTE};
use crate::resizer::{Resizer, content_type_of};
use object_gateway::{ObjectGateway, ObjectRecord};
use opentelemetry::KeyValue;
use serde::Serialize;
use std::sync::Arc;
use trace_metadata::{DependencySpan, SpanTimer, TelemetrySink, from_metadata};

/// Key prefix of written thumbnails.
pub const OUTPUT_PREFIX: &str = "output/";

/// Name of the span recorded for each processed original.
pub const CREATE_THUMBNAIL_SPAN: &str = "CreateThumbnail";

/// A newly created object, as reported by a storage event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectCreated {
    /// Container holding the object.
    pub container: String,
    /// Key of the object, already URL-decoded.
    pub key: String,
}

impl ObjectCreated {
    /// Creates an event for `container` / `key`.
    pub fn new(container: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
        }
    }
}

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A thumbnail was written.
    Written {
        /// Key of the thumbnail.
        output_key: String,
    },
    /// The event needed no work.
    Skipped(SkipReason),
}

/// Why an event was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The key is not under `input/`, e.g. the thumbnail write itself.
    NotAnInput,
    /// The original was gone by the time the event was handled.
    MissingObject,
}

/// Per-record results of a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Keys of written thumbnails.
    pub written: Vec<String>,
    /// Records that needed no work.
    pub skipped: Vec<SkippedRecord>,
    /// Records that failed.
    pub failed: Vec<FailedRecord>,
}

impl BatchReport {
    /// Whether any record failed.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Number of records covered by the report.
    pub fn len(&self) -> usize {
        self.written.len() + self.skipped.len() + self.failed.len()
    }

    /// Whether the report covers no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A skipped record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// Key from the event.
    pub key: String,
    /// Why nothing was done.
    pub reason: SkipReason,
}

/// A failed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRecord {
    /// Key from the event.
    pub key: String,
    /// Rendered error chain.
    pub error: String,
}

/// Replaces the leading `input/` of `key` with `output/`.
///
/// Returns `None` for keys outside `input/`.
///
/// ```
/// use thumbnail_generator::derive_output_key;
///
/// assert_eq!(derive_output_key("input/cat.jpg").as_deref(), Some("output/cat.jpg"));
/// assert_eq!(derive_output_key("input/input/x.png").as_deref(), Some("output/input/x.png"));
/// assert_eq!(derive_output_key("output/cat.jpg"), None);
/// ```
pub fn derive_output_key(key: &str) -> Option<String> {
    key.strip_prefix(INPUT_PREFIX)
        .map(|rest| format!("{OUTPUT_PREFIX}{rest}"))
}

/// Turns stored originals into thumbnails.
pub struct Dispatcher<G, R> {
    gateway: G,
    resizer: Arc<R>,
    sink: Arc<dyn TelemetrySink>,
    output_container: String,
    size: ThumbnailSize,
    content_type: String,
}

impl<G, R> std::fmt::Debug for Dispatcher<G, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("output_container", &self.output_container)
            .field("size", &self.size)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

impl<G, R> Dispatcher<G, R>
where
    G: ObjectGateway,
    R: Resizer,
{
    /// Creates a dispatcher.
    pub fn new(gateway: G, resizer: R, sink: Arc<dyn TelemetrySink>, config: &Config) -> Self {
        Self {
            gateway,
            resizer: Arc::new(resizer),
            sink,
            output_container: config.storage.output_container.clone(),
            size: config.thumbnail.size,
            content_type: config.thumbnail.content_type.clone(),
        }
    }

    /// Processes one created object.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Storage`] on a transient read or write failure
    /// - [`DispatchError::Resize`] when the original cannot be resized; no
    ///   thumbnail is written
    /// - [`DispatchError::Interrupted`] when the resize task did not finish
    pub async fn on_object_created(
        &self,
        event: &ObjectCreated,
    ) -> Result<DispatchOutcome, DispatchError> {
        let Some(output_key) = derive_output_key(&event.key) else {
            tracing::debug!(key = %event.key, "Ignoring object outside input prefix");
            return Ok(DispatchOutcome::Skipped(SkipReason::NotAnInput));
        };

        let mut timer = DependencySpan::start(CREATE_THUMBNAIL_SPAN)
            .with_attribute(KeyValue::new(CONTAINER_ATTRIBUTE, event.container.clone()))
            .with_attribute(KeyValue::new(KEY_ATTRIBUTE, event.key.clone()));

        let result = self.process(event, output_key, &mut timer).await;

        let written = matches!(result, Ok(DispatchOutcome::Written { .. }));
        self.sink.record(timer.finish(written));

        match &result {
            Ok(DispatchOutcome::Written { output_key }) => tracing::info!(
                container = %self.output_container,
                key = %output_key,
                "Wrote thumbnail"
            ),
            Ok(DispatchOutcome::Skipped(reason)) => tracing::info!(
                key = %event.key,
                reason = ?reason,
                "Skipped object"
            ),
            Err(err) => tracing::error!(
                key = %event.key,
                error = %err,
                "Failed to create thumbnail"
            ),
        }

        result
    }

    async fn process(
        &self,
        event: &ObjectCreated,
        output_key: String,
        timer: &mut SpanTimer,
    ) -> Result<DispatchOutcome, DispatchError> {
        let original = match self.gateway.get(&event.container, &event.key).await {
            Ok(record) => record,
            Err(err) if err.is_not_found() => {
                return Ok(DispatchOutcome::Skipped(SkipReason::MissingObject));
            }
            Err(err) => return Err(err.into()),
        };

        let parent = from_metadata(&original.metadata);
        if parent.is_none() {
            tracing::debug!(key = %event.key, "No trace context on original");
        }
        timer.set_parent(parent);

        let resizer = Arc::clone(&self.resizer);
        let payload = original.payload.clone();
        let target = self.size.dimensions();
        let thumbnail =
            tokio::task::spawn_blocking(move || resizer.resize(&payload, target)).await??;

        let content_type = content_type_of(&thumbnail)
            .map(str::to_string)
            .or(original.content_type)
            .unwrap_or_else(|| self.content_type.clone());

        let record = ObjectRecord::new(&self.output_container, &output_key, thumbnail)
            .with_metadata(original.metadata)
            .with_content_type(content_type);
        self.gateway.put(record).await?;

        Ok(DispatchOutcome::Written { output_key })
    }

    /// Processes every record of a storage event.
    ///
    /// A failing record does not stop the rest of the batch.
    pub async fn dispatch_batch(&self, events: &[ObjectCreated]) -> BatchReport {
        let mut report = BatchReport::default();

        for event in events {
            match self.on_object_created(event).await {
                Ok(DispatchOutcome::Written { output_key }) => report.written.push(output_key),
                Ok(DispatchOutcome::Skipped(reason)) => report.skipped.push(SkippedRecord {
                    key: event.key.clone(),
                    reason,
                }),
                Err(err) => report.failed.push(FailedRecord {
                    key: event.key.clone(),
                    error: error_chain(&err),
                }),
            }
        }

        tracing::info!(
            written = report.written.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Batch complete"
        );

        report
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
