//! Synchronous upload entry point.
//!
//! Stores the original under `input/<name>` and hands the trace context to
//! the create-thumbnail step through the object's metadata. The metadata
//! carries the id of the Upload span itself, so the thumbnail span becomes
//! its child rather than a sibling.

use crate::config::Config;
use crate::error::UploadError;
use crate::resizer::content_type_of;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use object_gateway::{ObjectGateway, ObjectRecord};
use opentelemetry::KeyValue;
use opentelemetry_sdk::trace::{IdGenerator, RandomIdGenerator};
use std::sync::Arc;
use trace_metadata::{
    DependencySpan, ObjectMetadata, PARENT_ID_KEY, TelemetrySink, TraceContext, TraceId,
    to_metadata,
};

/// Key prefix of uploaded originals.
pub const INPUT_PREFIX: &str = "input/";

/// Name of the span recorded for each upload.
pub const UPLOAD_SPAN: &str = "Upload";

/// Attribute holding the container written to.
pub const CONTAINER_ATTRIBUTE: &str = "storage.container";

/// Attribute holding the object key written to.
pub const KEY_ATTRIBUTE: &str = "storage.key";

/// One upload as received from the caller.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// Object name without prefix, e.g. `cat.jpg`.
    pub name: String,
    /// Base64 encoded image.
    pub payload: String,
    /// Raw `traceparent` header, if the caller sent one.
    pub trace_header: Option<String>,
    /// Content type to store. When absent it is detected from the payload,
    /// falling back to the configured default.
    pub content_type: Option<String>,
}

impl UploadRequest {
    /// Creates a request without trace header or content type.
    pub fn new(name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
            ..Self::default()
        }
    }

    /// Attaches a `traceparent` header value.
    pub fn with_trace_header(mut self, header: impl Into<String>) -> Self {
        self.trace_header = Some(header.into());
        self
    }

    /// Overrides the stored content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Where an upload was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Container written to.
    pub container: String,
    /// Key written, `input/<name>`.
    pub key: String,
    /// Trace the upload belongs to, if any.
    pub trace_id: Option<TraceId>,
}

/// Accepts uploads and writes them to the input container.
pub struct Ingress<G> {
    gateway: G,
    sink: Arc<dyn TelemetrySink>,
    container: String,
    content_type: String,
    synthesize_missing: bool,
    ids: RandomIdGenerator,
}

impl<G> std::fmt::Debug for Ingress<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingress")
            .field("container", &self.container)
            .field("content_type", &self.content_type)
            .field("synthesize_missing", &self.synthesize_missing)
            .finish_non_exhaustive()
    }
}

impl<G: ObjectGateway> Ingress<G> {
    /// Creates an ingress writing through `gateway` and recording to `sink`.
    pub fn new(gateway: G, sink: Arc<dyn TelemetrySink>, config: &Config) -> Self {
        Self {
            gateway,
            sink,
            container: config.storage.input_container.clone(),
            content_type: config.thumbnail.content_type.clone(),
            synthesize_missing: config.trace.synthesize_missing,
            ids: RandomIdGenerator::default(),
        }
    }

    /// Decodes and stores one upload.
    ///
    /// A missing or malformed trace header never fails the upload.
    ///
    /// # Errors
    ///
    /// - [`UploadError::InvalidName`] for a blank name or one starting with `/`
    /// - [`UploadError::Decode`] when the payload is not base64
    /// - [`UploadError::Storage`] when the write fails
    ///
    /// Nothing is written in the first two cases.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadReceipt, UploadError> {
        validate_name(&request.name)?;
        let payload = decode_payload(&request.payload)?;
        let key = format!("{INPUT_PREFIX}{}", request.name);

        let parent = request.trace_header.as_deref().and_then(parse_header);

        let span_id = self.ids.new_span_id();
        let timer = DependencySpan::start(UPLOAD_SPAN)
            .with_attribute(KeyValue::new(CONTAINER_ATTRIBUTE, self.container.clone()))
            .with_attribute(KeyValue::new(KEY_ATTRIBUTE, key.clone()));

        let (timer, propagated) = match parent {
            Some(ctx) => (
                timer.with_parent(Some(ctx)).with_span_id(span_id),
                Some(ctx.child(span_id)),
            ),
            None if self.synthesize_missing => {
                let root = TraceContext::generate(&self.ids);
                tracing::debug!(trace_id = %root.trace_id(), "Starting new trace for upload");
                (timer.with_root(root), Some(root))
            }
            None => (timer.with_span_id(span_id), None),
        };

        let metadata = propagated
            .as_ref()
            .map(propagation_metadata)
            .unwrap_or_default();
        let content_type = request
            .content_type
            .or_else(|| content_type_of(&payload).map(str::to_string))
            .unwrap_or_else(|| self.content_type.clone());

        let record = ObjectRecord::new(&self.container, &key, payload)
            .with_metadata(metadata)
            .with_content_type(content_type);

        let result = self.gateway.put(record).await;
        self.sink.record(timer.finish(result.is_ok()));

        if let Err(err) = result {
            tracing::error!(
                container = %self.container,
                key = %key,
                error = %err,
                "Failed to store upload"
            );
            return Err(err.into());
        }

        let trace_id = propagated.map(|ctx| ctx.trace_id());
        tracing::info!(
            container = %self.container,
            key = %key,
            trace_id = ?trace_id.map(|id| id.to_string()),
            "Stored upload"
        );

        Ok(UploadReceipt {
            container: self.container.clone(),
            key,
            trace_id,
        })
    }
}

fn validate_name(name: &str) -> Result<(), UploadError> {
    if name.trim().is_empty() || name.starts_with('/') {
        return Err(UploadError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn decode_payload(payload: &str) -> Result<Vec<u8>, UploadError> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(compact)?)
}

/// Metadata handed to the create-thumbnail step.
///
/// An unsampled context keeps only its trace id: the Upload span is not
/// exported, so nothing downstream may name it as a parent.
fn propagation_metadata(ctx: &TraceContext) -> ObjectMetadata {
    let mut metadata = to_metadata(ctx);
    if !ctx.is_sampled() {
        metadata.remove(PARENT_ID_KEY);
    }
    metadata
}

fn parse_header(raw: &str) -> Option<TraceContext> {
    match TraceContext::parse(raw) {
        Ok(ctx) => Some(ctx),
        Err(err) => {
            tracing::warn!(header = raw, error = %err, "Ignoring malformed trace header");
            None
        }
    }
}
