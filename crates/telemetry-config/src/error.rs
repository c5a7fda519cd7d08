//! Error types for SDK configuration and lifecycle.

use opentelemetry_otlp::ExporterBuildError;
use opentelemetry_sdk::error::OTelSdkError;
use thiserror::Error;

/// Errors raised while building or shutting down the telemetry SDK.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SdkError {
    /// Configuration could not be loaded or extracted.
    #[error("invalid telemetry configuration")]
    Config(#[source] Box<figment::Error>),

    /// The span exporter could not be built.
    #[error("failed to build trace exporter")]
    TraceExporter(#[source] ExporterBuildError),

    /// The log exporter could not be built.
    #[error("failed to build log exporter")]
    LogExporter(#[source] ExporterBuildError),

    /// A global `tracing` subscriber was already installed.
    #[error("failed to initialise tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),

    /// A provider failed to flush.
    #[error("failed to flush provider")]
    Flush(#[source] OTelSdkError),

    /// A provider failed to shut down.
    #[error("failed to shut down provider")]
    Shutdown(#[source] OTelSdkError),
}

impl From<figment::Error> for SdkError {
    fn from(err: figment::Error) -> Self {
        SdkError::Config(Box::new(err))
    }
}
