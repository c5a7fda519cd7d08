//! Tower service instrumenting one Lambda invocation.

use crate::cold_start::ColdStart;
use crate::extractor::InvocationExtractor;
use crate::flush::TelemetryFlush;
use crate::future::OtelTracingFuture;
use lambda_runtime::LambdaEvent;
use opentelemetry::Context as OtelContext;
use opentelemetry::trace::TraceContextExt;
use opentelemetry_semantic_conventions::attribute::{
    CLOUD_ACCOUNT_ID, CLOUD_PROVIDER, CLOUD_REGION, FAAS_MAX_MEMORY, FAAS_NAME, FAAS_VERSION,
};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;
use tracing::Span;
use tracing::field::Empty;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Service produced by [`OtelTracingLayer`](crate::OtelTracingLayer).
#[derive(Clone)]
pub struct OtelTracingService<S, E> {
    inner: S,
    extractor: E,
    flush_handles: Vec<Arc<dyn TelemetryFlush>>,
    flush_timeout: Duration,
    cold_start: ColdStart,
}

impl<S, E> OtelTracingService<S, E> {
    pub(crate) fn new(
        inner: S,
        extractor: E,
        flush_handles: Vec<Arc<dyn TelemetryFlush>>,
        flush_timeout: Duration,
        cold_start: ColdStart,
    ) -> Self {
        Self {
            inner,
            extractor,
            flush_handles,
            flush_timeout,
            cold_start,
        }
    }
}

impl<S, E, T> Service<LambdaEvent<T>> for OtelTracingService<S, E>
where
    S: Service<LambdaEvent<T>>,
    S::Response: Send + 'static,
    S::Error: std::fmt::Display + Send + 'static,
    E: InvocationExtractor<T>,
    T: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = OtelTracingFuture<S::Future, S::Response, S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, event: LambdaEvent<T>) -> Self::Future {
        let (payload, lambda_ctx) = event.into_parts();

        let parent = self.extractor.extract_context(&payload);
        let span_name = self.extractor.span_name(&payload, &lambda_ctx);
        let is_cold_start = self.cold_start.check();

        let span = tracing::info_span!(
            "lambda.invoke",
            otel.name = %span_name,
            otel.kind = "server",
            otel.status_code = Empty,
            otel.status_description = Empty,
            faas.trigger = self.extractor.trigger_type(),
            faas.invocation_id = %lambda_ctx.request_id,
            faas.coldstart = is_cold_start,
        );

        if let Some(parent) = parent {
            let cx = OtelContext::new().with_remote_span_context(parent.to_span_context());
            let _ = span.set_parent(cx);
        }

        self.extractor.record_attributes(&payload, &span);
        record_lambda_context_attributes(&span, &lambda_ctx);

        let event = LambdaEvent::new(payload, lambda_ctx);

        // Not `.instrument()`: the future must hold the only reference to the
        // span so it closes before the flush.
        let future = {
            let _entered = span.enter();
            self.inner.call(event)
        };

        OtelTracingFuture::new(
            future,
            span,
            self.flush_handles.clone(),
            self.flush_timeout,
        )
    }
}

fn record_lambda_context_attributes(span: &Span, ctx: &lambda_runtime::Context) {
    span.set_attribute(CLOUD_PROVIDER, "aws");
    span.set_attribute(FAAS_NAME, ctx.env_config.function_name.clone());
    span.set_attribute(FAAS_VERSION, ctx.env_config.version.clone());
    span.set_attribute(FAAS_MAX_MEMORY, ctx.env_config.memory as i64 * 1024 * 1024);

    if let Ok(region) = std::env::var("AWS_REGION") {
        span.set_attribute(CLOUD_REGION, region);
    }

    span.set_attribute("aws.lambda.invoked_arn", ctx.invoked_function_arn.clone());

    if let Some(account_id) = ctx.invoked_function_arn.split(':').nth(4) {
        span.set_attribute(CLOUD_ACCOUNT_ID, account_id.to_owned());
    }
}
