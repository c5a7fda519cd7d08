//! Timed records of one pipeline stage.

use crate::context::TraceContext;
use opentelemetry::KeyValue;
use opentelemetry::trace::{SpanId, TraceId};
use std::borrow::Cow;
use std::time::{Duration, Instant, SystemTime};

/// A completed pipeline stage, ready to hand to a [`TelemetrySink`](crate::TelemetrySink).
///
/// `parent` is the context the stage ran under: its trace id is the trace the
/// span belongs to and its span id is the span's parent. A stage that starts
/// a trace has no parent but may carry a `root_trace_id` instead. Both are
/// absent when no trace context reached the stage.
#[derive(Debug, Clone)]
pub struct DependencySpan {
    /// Operation name, e.g. `"Upload"`.
    pub name: Cow<'static, str>,
    /// Wall-clock start of the stage.
    pub start_time: SystemTime,
    /// How long the stage took.
    pub duration: Duration,
    /// Whether the stage achieved its purpose.
    pub success: bool,
    /// Context the stage ran under.
    pub parent: Option<TraceContext>,
    /// Pre-allocated identifier for this span, if the stage handed it downstream.
    pub span_id: Option<SpanId>,
    /// Trace started by this span when it has no parent.
    pub root_trace_id: Option<TraceId>,
    /// Additional attributes, such as the object key.
    pub attributes: Vec<KeyValue>,
}

impl DependencySpan {
    /// Starts timing a stage.
    pub fn start(name: impl Into<Cow<'static, str>>) -> SpanTimer {
        SpanTimer {
            name: name.into(),
            start_time: SystemTime::now(),
            started: Instant::now(),
            parent: None,
            span_id: None,
            root_trace_id: None,
            attributes: Vec::new(),
        }
    }

    /// Trace the span belongs to.
    pub fn trace_id(&self) -> Option<TraceId> {
        self.parent
            .map(|ctx| ctx.trace_id())
            .or(self.root_trace_id)
    }

    /// Identifier of the parent span.
    pub fn parent_id(&self) -> Option<SpanId> {
        self.parent.map(|ctx| ctx.span_id())
    }

    /// Wall-clock end of the stage.
    pub fn end_time(&self) -> SystemTime {
        self.start_time + self.duration
    }
}

/// A stage in progress. Finish it with [`SpanTimer::finish`].
#[must_use = "a timer records nothing until finished"]
#[derive(Debug)]
pub struct SpanTimer {
    name: Cow<'static, str>,
    start_time: SystemTime,
    started: Instant,
    parent: Option<TraceContext>,
    span_id: Option<SpanId>,
    root_trace_id: Option<TraceId>,
    attributes: Vec<KeyValue>,
}

impl SpanTimer {
    /// Sets the context the stage runs under.
    pub fn with_parent(mut self, parent: Option<TraceContext>) -> Self {
        self.parent = parent;
        self
    }

    /// Uses a pre-allocated span id instead of letting the sink generate one.
    pub fn with_span_id(mut self, span_id: SpanId) -> Self {
        self.span_id = Some(span_id);
        self
    }

    /// Makes the stage the root of `ctx`: the span takes the context's trace
    /// id and span id and has no parent.
    pub fn with_root(mut self, ctx: TraceContext) -> Self {
        self.parent = None;
        self.root_trace_id = Some(ctx.trace_id());
        self.span_id = Some(ctx.span_id());
        self
    }

    /// Adds an attribute.
    pub fn with_attribute(mut self, attribute: KeyValue) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Sets the parent once it becomes known mid-stage.
    pub fn set_parent(&mut self, parent: Option<TraceContext>) {
        self.parent = parent;
    }

    /// Stops the clock.
    pub fn finish(self, success: bool) -> DependencySpan {
        DependencySpan {
            name: self.name,
            start_time: self.start_time,
            duration: self.started.elapsed(),
            success,
            parent: self.parent,
            span_id: self.span_id,
            root_trace_id: self.root_trace_id,
            attributes: self.attributes,
        }
    }
}
