//! Tower middleware instrumenting the pipeline's Lambda handlers.
//!
//! Each invocation gets one `tracing` span, bridged to OpenTelemetry by
//! `tracing-opentelemetry`, carrying FaaS semantic attributes. Before the
//! handler's result is returned, the span is closed and every registered
//! [`TelemetryFlush`] handle is flushed, since Lambda freezes the process as
//! soon as the response is sent.
//!
//! Remote parents are parsed with [`trace_metadata::TraceContext`]; nothing
//! here relies on a global propagator or provider.
//!
//! # Usage
//!
//! ```no_run
//! use aws_lambda_events::apigw::{ApiGatewayV2httpRequest, ApiGatewayV2httpResponse};
//! use lambda_otel_tower::{ApiGatewayV2Extractor, OtelTracingLayer};
//! use lambda_runtime::{Error, LambdaEvent, Runtime, service_fn};
//! use tower::ServiceBuilder;
//!
//! async fn handler(
//!     _event: LambdaEvent<ApiGatewayV2httpRequest>,
//! ) -> Result<ApiGatewayV2httpResponse, Error> {
//!     tracing::info!("Handling upload");
//!     Ok(ApiGatewayV2httpResponse::default())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let service = ServiceBuilder::new()
//!         .layer(OtelTracingLayer::new(ApiGatewayV2Extractor::new()))
//!         .service(service_fn(handler));
//!
//!     Runtime::new(service).run().await
//! }
//! ```
//!
//! # Features
//!
//! - `http` - API Gateway HTTP API (v2) extractor (default)
//! - `s3` - S3 notification extractor (default)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cold_start;
mod extractor;
mod flush;
mod future;
mod layer;
mod service;

pub mod extractors;

pub use cold_start::ColdStart;
pub use extractor::InvocationExtractor;
pub use flush::TelemetryFlush;
pub use future::OtelTracingFuture;
pub use layer::{OtelTracingLayer, OtelTracingLayerBuilder};
pub use service::OtelTracingService;

#[cfg(feature = "http")]
pub use extractors::http::{ApiGatewayV2Extractor, TRACEPARENT_HEADER, traceparent_from_headers};

#[cfg(feature = "s3")]
pub use extractors::s3::S3EventExtractor;
