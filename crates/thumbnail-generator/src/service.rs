//! Lambda adapters for the upload and create-thumbnail functions.
//!
//! Handlers translate Lambda events into [`Ingress`] and [`Dispatcher`] calls.
//! The `create_*_service` functions wrap them in the invocation tracing layer,
//! which flushes the guard's providers before each response is returned.

use crate::dispatcher::{BatchReport, Dispatcher, ObjectCreated};
use crate::error::UploadError;
use crate::ingress::{Ingress, UploadRequest};
use crate::resizer::Resizer;
use aws_lambda_events::apigw::ApiGatewayV2httpRequest;
use aws_lambda_events::s3::S3Event;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use lambda_otel_tower::{ApiGatewayV2Extractor, OtelTracingLayer, S3EventExtractor, TRACEPARENT_HEADER};
use lambda_runtime::LambdaEvent;
use object_gateway::ObjectGateway;
use opentelemetry::trace::TraceContextExt as _;
use opentelemetry::trace::noop::NoopTracer;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use telemetry_config::{OtelGuard, OtelSdkBuilder, SdkError};
use tower::{Service, ServiceBuilder};
use trace_metadata::{OtelDependencySink, TelemetrySink, TraceContext};
use tracing_opentelemetry::OpenTelemetrySpanExt;

const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);
const INSTRUMENTATION_SCOPE: &str = "thumbnail-generator";

/// HTTP API Gateway v2 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Plain text body.
    pub body: String,
}

impl HttpResponse {
    fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }
}

/// Initialises the OpenTelemetry SDK for one of the functions.
///
/// # Errors
///
/// Returns an error if configuration or exporter setup fails.
pub fn init_telemetry(service_name: &str) -> Result<OtelGuard, SdkError> {
    OtelSdkBuilder::new()
        .with_default_file()
        .with_standard_env()
        .service_name(service_name)
        .service_version(env!("CARGO_PKG_VERSION"))
        .build()
}

/// Builds the dependency span sink for a guard.
///
/// Falls back to a no-op tracer when tracing is disabled.
pub fn telemetry_sink(guard: &OtelGuard) -> Arc<dyn TelemetrySink> {
    match guard.tracer(INSTRUMENTATION_SCOPE) {
        Some(tracer) => Arc::new(OtelDependencySink::new(tracer)),
        None => Arc::new(OtelDependencySink::new(NoopTracer::new())),
    }
}

fn tracing_layer<E>(extractor: E, guard: &OtelGuard) -> OtelTracingLayer<E> {
    let mut builder = OtelTracingLayer::builder(extractor)
        .flush_on_end(true)
        .flush_timeout(FLUSH_TIMEOUT);

    if let Some(provider) = guard.tracer_provider() {
        builder = builder.tracer_provider(provider.clone());
    }
    if let Some(provider) = guard.logger_provider() {
        builder = builder.logger_provider(provider.clone());
    }

    builder.build()
}

/// Creates the instrumented upload service.
pub fn create_upload_service<G>(
    ingress: Arc<Ingress<G>>,
    guard: &OtelGuard,
) -> impl Service<
    LambdaEvent<ApiGatewayV2httpRequest>,
    Response = HttpResponse,
    Error = lambda_runtime::Error,
    Future = impl Future<Output = Result<HttpResponse, lambda_runtime::Error>> + Send,
> + Clone
where
    G: ObjectGateway + 'static,
{
    let handler = tower::service_fn(move |event: LambdaEvent<ApiGatewayV2httpRequest>| {
        let ingress = Arc::clone(&ingress);
        async move { Ok::<_, lambda_runtime::Error>(handle_upload(&ingress, event.payload).await) }
    });

    ServiceBuilder::new()
        .layer(tracing_layer(ApiGatewayV2Extractor::new(), guard))
        .service(handler)
}

/// Creates the instrumented create-thumbnail service.
pub fn create_thumbnail_service<G, R>(
    dispatcher: Arc<Dispatcher<G, R>>,
    guard: &OtelGuard,
) -> impl Service<
    LambdaEvent<S3Event>,
    Response = BatchReport,
    Error = lambda_runtime::Error,
    Future = impl Future<Output = Result<BatchReport, lambda_runtime::Error>> + Send,
> + Clone
where
    G: ObjectGateway + 'static,
    R: Resizer,
{
    let handler = tower::service_fn(move |event: LambdaEvent<S3Event>| {
        let dispatcher = Arc::clone(&dispatcher);
        async move { handle_object_created(&dispatcher, event.payload).await }
    });

    ServiceBuilder::new()
        .layer(tracing_layer(S3EventExtractor::new(), guard))
        .service(handler)
}

/// Handles one upload request.
///
/// The name comes from the `name` path parameter, or the `filename` query
/// parameter when the route has none. The body is the base64 encoded image.
///
/// The upload is parented under the current invocation span when it carries
/// a valid OpenTelemetry context, so the invocation, the upload and the
/// thumbnail share one trace even when the caller sent no `traceparent`.
/// Without an OpenTelemetry layer the incoming header is used as is.
pub async fn handle_upload<G: ObjectGateway>(
    ingress: &Ingress<G>,
    request: ApiGatewayV2httpRequest,
) -> HttpResponse {
    let Some(name) = request
        .path_parameters
        .get("name")
        .map(String::as_str)
        .or_else(|| request.query_string_parameters.first("filename"))
        .map(str::to_string)
    else {
        return HttpResponse::new(400, "missing object name");
    };

    let body = request.body.unwrap_or_default();
    let payload = if request.is_base64_encoded {
        // API Gateway wrapped the base64 text in another layer of base64.
        match STANDARD
            .decode(body.trim())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
        {
            Some(inner) => inner,
            None => return HttpResponse::new(400, "request body is not valid base64"),
        }
    } else {
        body
    };

    let trace_header = invocation_traceparent().or_else(|| {
        request
            .headers
            .get(TRACEPARENT_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    });

    let upload = UploadRequest {
        name: name.clone(),
        payload,
        trace_header,
        content_type: None,
    };

    match ingress.upload(upload).await {
        Ok(_) => HttpResponse::new(200, format!("{name} uploaded successfully.")),
        Err(err) if err.is_client_error() => HttpResponse::new(400, err.to_string()),
        Err(err) => {
            tracing::error!(name = %name, error = %err, "Upload failed");
            HttpResponse::new(502, upload_failure_message(&err))
        }
    }
}

fn invocation_traceparent() -> Option<String> {
    let cx = tracing::Span::current().context();
    TraceContext::from_span_context(cx.span().span_context()).map(|ctx| ctx.to_traceparent())
}

fn upload_failure_message(err: &UploadError) -> String {
    match err {
        UploadError::Storage(storage) => format!("{err}: {storage}"),
        other => other.to_string(),
    }
}

/// Handles one storage event, processing every record.
///
/// # Errors
///
/// Returns an error when any record failed so the platform retries the
/// event. Redelivery of records that already succeeded is harmless.
pub async fn handle_object_created<G, R>(
    dispatcher: &Dispatcher<G, R>,
    event: S3Event,
) -> Result<BatchReport, lambda_runtime::Error>
where
    G: ObjectGateway,
    R: Resizer,
{
    let events = object_created_events(&event);
    let report = dispatcher.dispatch_batch(&events).await;

    if report.has_failures() {
        return Err(format!(
            "{} of {} records failed: {}",
            report.failed.len(),
            report.len(),
            report
                .failed
                .iter()
                .map(|failed| format!("{} ({})", failed.key, failed.error))
                .collect::<Vec<_>>()
                .join(", ")
        )
        .into());
    }

    Ok(report)
}

/// Converts S3 records into dispatcher events.
///
/// Records without a bucket or key are dropped. Keys are decoded from the
/// URL form encoding S3 uses in notifications.
pub fn object_created_events(event: &S3Event) -> Vec<ObjectCreated> {
    event
        .records
        .iter()
        .filter_map(|record| {
            let container = record.s3.bucket.name.as_deref();
            let key = record.s3.object.key.as_deref();
            match (container, key) {
                (Some(container), Some(key)) => {
                    Some(ObjectCreated::new(container, decode_object_key(key)))
                }
                _ => {
                    tracing::warn!(
                        event_name = ?record.event_name,
                        "Ignoring record without bucket or key"
                    );
                    None
                }
            }
        })
        .collect()
}

/// Decodes an S3 notification key: `+` is a space, then percent-decoding.
///
/// ```
/// use thumbnail_generator::decode_object_key;
///
/// assert_eq!(decode_object_key("input/my+cat%281%29.jpg"), "input/my cat(1).jpg");
/// ```
pub fn decode_object_key(key: &str) -> String {
    let spaced = key.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
