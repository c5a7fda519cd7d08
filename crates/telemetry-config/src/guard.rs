//! Provider lifecycle management.
//!
//! The [`OtelGuard`] owns the tracer and logger providers. Dropping it flushes
//! pending data and shuts the providers down, which a Lambda function must do
//! before the execution environment freezes.

use crate::config::{OtelSdkConfig, Protocol};
use crate::error::SdkError;
use crate::resource::AwsLambdaDetector;
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig, WithTonicConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::{
    BatchConfigBuilder as LogBatchConfigBuilder, BatchLogProcessor, SdkLoggerProvider,
};
use opentelemetry_sdk::resource::ResourceDetector as _;
use opentelemetry_sdk::trace::{
    BatchConfigBuilder as TraceBatchConfigBuilder, BatchSpanProcessor, SdkTracer,
    SdkTracerProvider,
};
use opentelemetry_semantic_conventions::resource as semconv;
use tonic::metadata::{MetadataKey, MetadataMap, MetadataValue};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const INSTRUMENTATION_SCOPE: &str = "thumbnail-pipeline";

/// Owns the configured providers for the life of the process.
///
/// Providers are never registered globally: callers obtain a tracer through
/// [`OtelGuard::tracer`] and pass it where it is needed.
///
/// # Example
///
/// ```no_run
/// use telemetry_config::{OtelSdkBuilder, SdkError};
///
/// fn main() -> Result<(), SdkError> {
///     let guard = OtelSdkBuilder::new().service_name("upload").build()?;
///     let _tracer = guard.tracer("upload");
///
///     tracing::info!("Application running");
///     Ok(())
/// }
/// ```
pub struct OtelGuard {
    tracer_provider: Option<SdkTracerProvider>,
    logger_provider: Option<SdkLoggerProvider>,
}

impl OtelGuard {
    pub(crate) fn from_config(config: OtelSdkConfig, detect_lambda: bool) -> Result<Self, SdkError> {
        let resource = build_resource(&config, detect_lambda);

        let tracer_provider = if config.traces.enabled {
            Some(build_tracer_provider(&config, resource.clone())?)
        } else {
            None
        };

        let logger_provider = if config.logs.enabled {
            Some(build_logger_provider(&config, resource)?)
        } else {
            None
        };

        if config.init_tracing_subscriber {
            init_subscriber(tracer_provider.as_ref(), logger_provider.as_ref())?;
        }

        tracing::debug!(
            target: "otel_lifecycle",
            endpoint = %config.effective_endpoint(),
            protocol = ?config.endpoint.protocol,
            traces = config.traces.enabled,
            logs = config.logs.enabled,
            "Telemetry providers initialised"
        );

        Ok(Self {
            tracer_provider,
            logger_provider,
        })
    }

    /// Wraps already-built providers, e.g. ones using an in-memory exporter.
    pub fn from_providers(
        tracer_provider: Option<SdkTracerProvider>,
        logger_provider: Option<SdkLoggerProvider>,
    ) -> Self {
        Self {
            tracer_provider,
            logger_provider,
        }
    }

    /// Returns the tracer provider if traces are enabled.
    pub fn tracer_provider(&self) -> Option<&SdkTracerProvider> {
        self.tracer_provider.as_ref()
    }

    /// Returns the logger provider if logs are enabled.
    pub fn logger_provider(&self) -> Option<&SdkLoggerProvider> {
        self.logger_provider.as_ref()
    }

    /// Returns a named tracer, or `None` when traces are disabled.
    pub fn tracer(&self, name: &'static str) -> Option<SdkTracer> {
        self.tracer_provider
            .as_ref()
            .map(|provider| provider.tracer(name))
    }

    /// Flushes all configured providers.
    ///
    /// Flush errors are logged with target `otel_lifecycle`.
    pub fn flush(&self) {
        if let Some(provider) = &self.tracer_provider
            && let Err(e) = provider.force_flush()
        {
            tracing::warn!(target: "otel_lifecycle", error = %e, "Failed to flush tracer provider");
        }

        if let Some(provider) = &self.logger_provider
            && let Err(e) = provider.force_flush()
        {
            tracing::warn!(target: "otel_lifecycle", error = %e, "Failed to flush logger provider");
        }
    }

    /// Flushes and shuts down all providers.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered.
    pub fn shutdown(mut self) -> Result<(), SdkError> {
        if let Some(provider) = self.tracer_provider.take() {
            provider.force_flush().map_err(SdkError::Flush)?;
            provider.shutdown().map_err(SdkError::Shutdown)?;
        }

        if let Some(provider) = self.logger_provider.take() {
            provider.force_flush().map_err(SdkError::Flush)?;
            provider.shutdown().map_err(SdkError::Shutdown)?;
        }

        Ok(())
    }
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            let _ = provider.force_flush();
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down tracer provider: {e}");
            }
        }

        if let Some(provider) = self.logger_provider.take() {
            let _ = provider.force_flush();
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down logger provider: {e}");
            }
        }
    }
}

fn build_resource(config: &OtelSdkConfig, detect_lambda: bool) -> Resource {
    let mut attributes: Vec<KeyValue> = Vec::new();

    if detect_lambda {
        attributes.extend(
            AwsLambdaDetector
                .detect()
                .iter()
                .map(|(k, v)| KeyValue::new(k.clone(), v.clone())),
        );
    }

    attributes.extend(
        config
            .resource
            .attributes
            .iter()
            .map(|(k, v)| KeyValue::new(k.clone(), v.clone())),
    );

    if let Some(name) = &config.resource.service_name {
        attributes.push(KeyValue::new(semconv::SERVICE_NAME, name.clone()));
    }

    if let Some(version) = &config.resource.service_version {
        attributes.push(KeyValue::new(semconv::SERVICE_VERSION, version.clone()));
    }

    if let Some(env) = &config.resource.deployment_environment {
        attributes.push(KeyValue::new(
            semconv::DEPLOYMENT_ENVIRONMENT_NAME,
            env.clone(),
        ));
    }

    Resource::builder().with_attributes(attributes).build()
}

fn grpc_metadata(config: &OtelSdkConfig) -> MetadataMap {
    let mut metadata = MetadataMap::new();
    for (key, value) in &config.endpoint.headers {
        if let (Ok(k), Ok(v)) = (
            key.parse::<MetadataKey<_>>(),
            value.parse::<MetadataValue<_>>(),
        ) {
            metadata.insert(k, v);
        }
    }
    metadata
}

fn http_protocol(protocol: Protocol) -> opentelemetry_otlp::Protocol {
    match protocol {
        Protocol::HttpJson => opentelemetry_otlp::Protocol::HttpJson,
        _ => opentelemetry_otlp::Protocol::HttpBinary,
    }
}

fn build_tracer_provider(
    config: &OtelSdkConfig,
    resource: Resource,
) -> Result<SdkTracerProvider, SdkError> {
    let exporter = match config.endpoint.protocol {
        Protocol::Grpc => opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(config.effective_endpoint())
            .with_timeout(config.endpoint.timeout)
            .with_metadata(grpc_metadata(config))
            .build()
            .map_err(SdkError::TraceExporter)?,
        protocol @ (Protocol::HttpBinary | Protocol::HttpJson) => {
            opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_endpoint(config.signal_endpoint("/v1/traces"))
                .with_timeout(config.endpoint.timeout)
                .with_protocol(http_protocol(protocol))
                .with_headers(config.endpoint.headers.clone())
                .build()
                .map_err(SdkError::TraceExporter)?
        }
    };

    let batch_config = TraceBatchConfigBuilder::default()
        .with_max_queue_size(config.traces.batch.max_queue_size)
        .with_max_export_batch_size(config.traces.batch.max_export_batch_size)
        .with_scheduled_delay(config.traces.batch.scheduled_delay)
        .build();

    let span_processor = BatchSpanProcessor::builder(exporter)
        .with_batch_config(batch_config)
        .build();

    Ok(SdkTracerProvider::builder()
        .with_span_processor(span_processor)
        .with_resource(resource)
        .build())
}

fn build_logger_provider(
    config: &OtelSdkConfig,
    resource: Resource,
) -> Result<SdkLoggerProvider, SdkError> {
    let exporter = match config.endpoint.protocol {
        Protocol::Grpc => opentelemetry_otlp::LogExporter::builder()
            .with_tonic()
            .with_endpoint(config.effective_endpoint())
            .with_timeout(config.endpoint.timeout)
            .with_metadata(grpc_metadata(config))
            .build()
            .map_err(SdkError::LogExporter)?,
        protocol @ (Protocol::HttpBinary | Protocol::HttpJson) => {
            opentelemetry_otlp::LogExporter::builder()
                .with_http()
                .with_endpoint(config.signal_endpoint("/v1/logs"))
                .with_timeout(config.endpoint.timeout)
                .with_protocol(http_protocol(protocol))
                .with_headers(config.endpoint.headers.clone())
                .build()
                .map_err(SdkError::LogExporter)?
        }
    };

    let batch_config = LogBatchConfigBuilder::default()
        .with_max_queue_size(config.logs.batch.max_queue_size)
        .with_max_export_batch_size(config.logs.batch.max_export_batch_size)
        .with_scheduled_delay(config.logs.batch.scheduled_delay)
        .build();

    let log_processor = BatchLogProcessor::builder(exporter)
        .with_batch_config(batch_config)
        .build();

    Ok(SdkLoggerProvider::builder()
        .with_log_processor(log_processor)
        .with_resource(resource)
        .build())
}

fn init_subscriber(
    tracer_provider: Option<&SdkTracerProvider>,
    logger_provider: Option<&SdkLoggerProvider>,
) -> Result<(), SdkError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .without_time();

    let telemetry_layer = tracer_provider.map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(INSTRUMENTATION_SCOPE))
    });
    let log_layer = logger_provider.map(|provider| OpenTelemetryTracingBridge::new(provider));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(telemetry_layer)
        .with(log_layer)
        .try_init()?;

    Ok(())
}
