//! Future closing the invocation span and flushing telemetry.

use crate::flush::{TelemetryFlush, flush_all};
use pin_project::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};
use std::time::Duration;
use tracing::Span;

type FlushFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

/// Drives the inner handler, then closes the span and flushes.
///
/// The result is held back until the flush has completed or timed out:
/// returning earlier would let Lambda freeze the process with spans still
/// buffered.
#[pin_project]
pub struct OtelTracingFuture<F, T, E> {
    #[pin]
    inner: F,
    span: Option<Span>,
    flush_handles: Vec<Arc<dyn TelemetryFlush>>,
    flush_timeout: Duration,
    flushing: Option<FlushFuture<T, E>>,
}

impl<F, T, E> OtelTracingFuture<F, T, E> {
    pub(crate) fn new(
        inner: F,
        span: Span,
        flush_handles: Vec<Arc<dyn TelemetryFlush>>,
        flush_timeout: Duration,
    ) -> Self {
        Self {
            inner,
            span: Some(span),
            flush_handles,
            flush_timeout,
            flushing: None,
        }
    }
}

impl<F, T, E> Future for OtelTracingFuture<F, T, E>
where
    F: Future<Output = Result<T, E>>,
    T: Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        if let Some(flushing) = this.flushing.as_mut() {
            return flushing.as_mut().poll(cx);
        }

        let result = match this.span.as_ref() {
            Some(span) => {
                let _entered = span.enter();
                ready!(this.inner.poll(cx))
            }
            None => ready!(this.inner.poll(cx)),
        };

        if let Some(span) = this.span.take() {
            match &result {
                Ok(_) => {
                    span.record("otel.status_code", "OK");
                }
                Err(error) => {
                    span.record("otel.status_code", "ERROR");
                    span.record("otel.status_description", error.to_string().as_str());
                }
            }
            // Closing the span before flushing is what makes it exportable.
            drop(span);
        }

        if this.flush_handles.is_empty() {
            return Poll::Ready(result);
        }

        let handles = std::mem::take(this.flush_handles);
        let timeout = *this.flush_timeout;
        let mut flushing: FlushFuture<T, E> = Box::pin(async move {
            flush_all(handles, timeout).await;
            result
        });
        let poll = flushing.as_mut().poll(cx);
        *this.flushing = Some(flushing);
        poll
    }
}
