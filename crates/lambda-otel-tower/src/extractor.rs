//! Trait describing how one Lambda event type is instrumented.

use lambda_runtime::Context as LambdaContext;
use trace_metadata::TraceContext;
use tracing::Span;

/// Describes how to instrument invocations carrying a payload of type `T`.
///
/// Trace context is parsed with the pipeline's own codec rather than a
/// globally registered propagator, so an extractor is fully self-contained.
///
/// # Example
///
/// ```
/// use lambda_otel_tower::InvocationExtractor;
/// use lambda_runtime::Context as LambdaContext;
/// use trace_metadata::TraceContext;
///
/// #[derive(Clone)]
/// struct ScheduledExtractor;
///
/// impl InvocationExtractor<serde_json::Value> for ScheduledExtractor {
///     fn extract_context(&self, _payload: &serde_json::Value) -> Option<TraceContext> {
///         None
///     }
///
///     fn trigger_type(&self) -> &'static str {
///         "timer"
///     }
///
///     fn span_name(&self, _payload: &serde_json::Value, ctx: &LambdaContext) -> String {
///         ctx.env_config.function_name.clone()
///     }
///
///     fn record_attributes(&self, _payload: &serde_json::Value, _span: &tracing::Span) {}
/// }
/// ```
pub trait InvocationExtractor<T>: Clone + Send + Sync + 'static {
    /// Returns the remote parent of the invocation, if the event carries one.
    fn extract_context(&self, payload: &T) -> Option<TraceContext>;

    /// FaaS trigger type (`http`, `datasource`, `pubsub`, `timer`, `other`).
    fn trigger_type(&self) -> &'static str;

    /// Low-cardinality span name for the invocation.
    fn span_name(&self, payload: &T, lambda_ctx: &LambdaContext) -> String;

    /// Records event-specific semantic attributes on the invocation span.
    fn record_attributes(&self, payload: &T, span: &Span);
}
