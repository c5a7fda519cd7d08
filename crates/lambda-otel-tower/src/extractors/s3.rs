//! S3 object notification extractor.
//!
//! S3 notifications carry no trace headers: the causal link to the upload
//! lives in the object's metadata, which only the handler can read. The
//! invocation span therefore starts without a remote parent and describes the
//! triggering documents instead.

use crate::extractor::InvocationExtractor;
use aws_lambda_events::s3::{S3Event, S3EventRecord};
use lambda_runtime::Context as LambdaContext;
use opentelemetry_semantic_conventions::attribute::{
    CLOUD_REGION, FAAS_DOCUMENT_COLLECTION, FAAS_DOCUMENT_NAME, FAAS_DOCUMENT_OPERATION,
    FAAS_DOCUMENT_TIME,
};
use trace_metadata::TraceContext;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Number of records in the notification.
pub const RECORD_COUNT_ATTRIBUTE: &str = "aws.s3.record_count";

/// Extractor for S3 notification events.
#[derive(Clone, Debug, Default)]
pub struct S3EventExtractor;

impl S3EventExtractor {
    /// Creates a new extractor.
    pub fn new() -> Self {
        Self
    }
}

/// Maps an S3 event name onto `faas.document.operation`.
fn document_operation(event_name: &str) -> &'static str {
    if event_name.starts_with("ObjectCreated") {
        "insert"
    } else if event_name.starts_with("ObjectRemoved") {
        "delete"
    } else {
        "edit"
    }
}

fn bucket_name(record: &S3EventRecord) -> Option<&str> {
    record.s3.bucket.name.as_deref()
}

impl InvocationExtractor<S3Event> for S3EventExtractor {
    fn extract_context(&self, _event: &S3Event) -> Option<TraceContext> {
        None
    }

    fn trigger_type(&self) -> &'static str {
        "datasource"
    }

    fn span_name(&self, event: &S3Event, lambda_ctx: &LambdaContext) -> String {
        match event.records.first().and_then(bucket_name) {
            Some(bucket) => format!("{bucket} process"),
            None => lambda_ctx.env_config.function_name.clone(),
        }
    }

    fn record_attributes(&self, event: &S3Event, span: &Span) {
        span.set_attribute(RECORD_COUNT_ATTRIBUTE, event.records.len() as i64);

        let Some(first) = event.records.first() else {
            return;
        };

        if let Some(bucket) = bucket_name(first) {
            span.set_attribute(FAAS_DOCUMENT_COLLECTION, bucket.to_owned());
        }

        if let Some(event_name) = &first.event_name {
            span.set_attribute(FAAS_DOCUMENT_OPERATION, document_operation(event_name));
        }

        span.set_attribute(FAAS_DOCUMENT_TIME, first.event_time.to_rfc3339());

        if let Some(region) = &first.aws_region {
            span.set_attribute(CLOUD_REGION, region.clone());
        }

        // The document name is only meaningful for a single-record event.
        if event.records.len() == 1
            && let Some(key) = &first.s3.object.key
        {
            span.set_attribute(FAAS_DOCUMENT_NAME, key.clone());
        }
    }
}
