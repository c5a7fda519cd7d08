//! Tower layer wrapping Lambda handlers in an invocation span.

use crate::cold_start::ColdStart;
use crate::flush::TelemetryFlush;
use crate::service::OtelTracingService;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::sync::Arc;
use std::time::Duration;
use tower::Layer;

const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Tower layer adding one OpenTelemetry span per Lambda invocation.
///
/// The wrapped service:
/// - takes the remote parent from the event via the extractor
/// - records FaaS and event attributes, including cold start
/// - closes the span and flushes every registered handle before returning
///
/// # Example
///
/// ```
/// use lambda_otel_tower::{ApiGatewayV2Extractor, OtelTracingLayer};
/// use opentelemetry_sdk::trace::SdkTracerProvider;
/// use std::time::Duration;
///
/// let provider = SdkTracerProvider::builder().build();
/// let layer = OtelTracingLayer::builder(ApiGatewayV2Extractor::new())
///     .tracer_provider(provider)
///     .flush_timeout(Duration::from_secs(2))
///     .build();
/// # let _ = layer;
/// ```
#[derive(Clone)]
pub struct OtelTracingLayer<E> {
    extractor: E,
    flush_handles: Vec<Arc<dyn TelemetryFlush>>,
    flush_on_end: bool,
    flush_timeout: Duration,
    cold_start: ColdStart,
}

impl<E> OtelTracingLayer<E> {
    /// Creates a layer that flushes nothing.
    pub fn new(extractor: E) -> Self {
        OtelTracingLayerBuilder::new(extractor).build()
    }

    /// Creates a builder for more detailed configuration.
    pub fn builder(extractor: E) -> OtelTracingLayerBuilder<E> {
        OtelTracingLayerBuilder::new(extractor)
    }
}

impl<S, E> Layer<S> for OtelTracingLayer<E>
where
    E: Clone,
{
    type Service = OtelTracingService<S, E>;

    fn layer(&self, inner: S) -> Self::Service {
        let flush_handles = if self.flush_on_end {
            self.flush_handles.clone()
        } else {
            Vec::new()
        };

        OtelTracingService::new(
            inner,
            self.extractor.clone(),
            flush_handles,
            self.flush_timeout,
            self.cold_start.clone(),
        )
    }
}

/// Builder for an [`OtelTracingLayer`].
#[must_use = "builders do nothing unless .build() is called"]
pub struct OtelTracingLayerBuilder<E> {
    extractor: E,
    flush_handles: Vec<Arc<dyn TelemetryFlush>>,
    flush_on_end: bool,
    flush_timeout: Duration,
}

impl<E> OtelTracingLayerBuilder<E> {
    /// Creates a builder with the given extractor.
    pub fn new(extractor: E) -> Self {
        Self {
            extractor,
            flush_handles: Vec::new(),
            flush_on_end: true,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        }
    }

    /// Flushes this tracer provider after each invocation.
    pub fn tracer_provider(self, provider: SdkTracerProvider) -> Self {
        self.flush_handle(Arc::new(provider))
    }

    /// Flushes this logger provider after each invocation.
    pub fn logger_provider(self, provider: SdkLoggerProvider) -> Self {
        self.flush_handle(Arc::new(provider))
    }

    /// Flushes an arbitrary handle after each invocation.
    pub fn flush_handle(mut self, handle: Arc<dyn TelemetryFlush>) -> Self {
        self.flush_handles.push(handle);
        self
    }

    /// Whether to flush after each invocation. Default: `true`.
    ///
    /// Disable only when something else (an extension) exports telemetry.
    pub fn flush_on_end(mut self, flush: bool) -> Self {
        self.flush_on_end = flush;
        self
    }

    /// Upper bound on the post-invocation flush. Default: 5 seconds.
    pub fn flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    /// Builds the layer.
    pub fn build(self) -> OtelTracingLayer<E> {
        OtelTracingLayer {
            extractor: self.extractor,
            flush_handles: self.flush_handles,
            flush_on_end: self.flush_on_end,
            flush_timeout: self.flush_timeout,
            cold_start: ColdStart::new(),
        }
    }
}
