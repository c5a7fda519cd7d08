//! Telemetry sinks receiving completed [`DependencySpan`]s.
//!
//! Sinks are constructed explicitly and passed to the stages that record
//! spans. Recording is fire-and-forget: a sink never reports failure back to
//! the pipeline.

use crate::span::DependencySpan;
use opentelemetry::trace::{Span as _, SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};
use parking_lot::Mutex;
use std::sync::Arc;

/// Attribute recording the stage outcome on exported spans.
pub const SUCCESS_ATTRIBUTE: &str = "dependency.success";

/// Destination for completed pipeline stages.
pub trait TelemetrySink: Send + Sync {
    /// Records a completed stage. Must not block or fail the caller.
    fn record(&self, span: DependencySpan);
}

impl<T> TelemetrySink for Arc<T>
where
    T: TelemetrySink + ?Sized,
{
    fn record(&self, span: DependencySpan) {
        (**self).record(span);
    }
}

/// Exports dependency spans through an OpenTelemetry tracer.
///
/// The span is parented under the remote context carried by the
/// [`DependencySpan`], keeps its pre-allocated span id when one is set, and is
/// back-dated to the stage's measured start and end.
///
/// # Example
///
/// ```
/// use opentelemetry::trace::noop::NoopTracer;
/// use trace_metadata::{DependencySpan, OtelDependencySink, TelemetrySink};
///
/// let sink = OtelDependencySink::new(NoopTracer::new());
/// sink.record(DependencySpan::start("Upload").finish(true));
/// ```
#[derive(Debug, Clone)]
pub struct OtelDependencySink<T> {
    tracer: T,
}

impl<T> OtelDependencySink<T> {
    /// Creates a sink exporting through the given tracer.
    pub fn new(tracer: T) -> Self {
        Self { tracer }
    }
}

impl<T> TelemetrySink for OtelDependencySink<T>
where
    T: Tracer + Send + Sync,
{
    fn record(&self, span: DependencySpan) {
        let parent_cx = match span.parent {
            Some(ctx) => Context::new().with_remote_span_context(ctx.to_span_context()),
            None => Context::new(),
        };

        let mut builder = self
            .tracer
            .span_builder(span.name.clone())
            .with_kind(SpanKind::Client)
            .with_start_time(span.start_time)
            .with_attributes(span.attributes.iter().cloned());

        if let Some(span_id) = span.span_id {
            builder = builder.with_span_id(span_id);
        }

        if span.parent.is_none()
            && let Some(trace_id) = span.root_trace_id
        {
            builder = builder.with_trace_id(trace_id);
        }

        let mut otel_span = self.tracer.build_with_context(builder, &parent_cx);
        otel_span.set_attribute(KeyValue::new(SUCCESS_ATTRIBUTE, span.success));
        otel_span.set_status(if span.success {
            Status::Ok
        } else {
            Status::error(format!("{} failed", span.name))
        });

        tracing::debug!(
            name = %span.name,
            trace_id = ?span.trace_id().map(|id| id.to_string()),
            parent_id = ?span.parent_id().map(|id| id.to_string()),
            duration_ms = span.duration.as_millis() as u64,
            success = span.success,
            "Recorded dependency span"
        );

        otel_span.end_with_timestamp(span.end_time());
    }
}

/// Keeps every recorded span in memory.
///
/// Clones share the same buffer, so a clone handed to the pipeline can be
/// inspected through the original.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    spans: Arc<Mutex<Vec<DependencySpan>>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded spans, oldest first.
    pub fn spans(&self) -> Vec<DependencySpan> {
        self.spans.lock().clone()
    }

    /// Returns recorded spans with the given name.
    pub fn spans_named(&self, name: &str) -> Vec<DependencySpan> {
        self.spans
            .lock()
            .iter()
            .filter(|span| span.name == name)
            .cloned()
            .collect()
    }

    /// Number of recorded spans.
    pub fn len(&self) -> usize {
        self.spans.lock().len()
    }

    /// Whether no span was recorded.
    pub fn is_empty(&self) -> bool {
        self.spans.lock().is_empty()
    }
}

impl TelemetrySink for RecordingSink {
    fn record(&self, span: DependencySpan) {
        self.spans.lock().push(span);
    }
}
