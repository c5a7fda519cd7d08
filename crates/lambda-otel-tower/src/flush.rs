//! Telemetry handles flushed at the end of every invocation.

use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::sync::Arc;
use std::time::Duration;

/// Something holding buffered telemetry that must be exported before Lambda
/// freezes the execution environment.
pub trait TelemetryFlush: Send + Sync {
    /// Short label used in lifecycle logs.
    fn label(&self) -> &'static str;

    /// Blocks until buffered telemetry is exported.
    fn force_flush(&self) -> OTelSdkResult;
}

impl TelemetryFlush for SdkTracerProvider {
    fn label(&self) -> &'static str {
        "tracer provider"
    }

    fn force_flush(&self) -> OTelSdkResult {
        SdkTracerProvider::force_flush(self)
    }
}

impl TelemetryFlush for SdkLoggerProvider {
    fn label(&self) -> &'static str {
        "logger provider"
    }

    fn force_flush(&self) -> OTelSdkResult {
        SdkLoggerProvider::force_flush(self)
    }
}

/// Flushes every handle on the blocking pool, giving up after `timeout`.
pub(crate) async fn flush_all(handles: Vec<Arc<dyn TelemetryFlush>>, timeout: Duration) {
    let flush = tokio::task::spawn_blocking(move || {
        for handle in &handles {
            if let Err(error) = handle.force_flush() {
                tracing::warn!(
                    target: "otel_lifecycle",
                    %error,
                    handle = handle.label(),
                    "Failed to flush telemetry"
                );
            }
        }
    });

    match tokio::time::timeout(timeout, flush).await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => {
            tracing::warn!(target: "otel_lifecycle", %error, "Telemetry flush task failed");
        }
        Err(_) => {
            tracing::warn!(
                target: "otel_lifecycle",
                timeout_ms = timeout.as_millis() as u64,
                "Telemetry flush timed out"
            );
        }
    }
}
