//! Upload function: API Gateway v2 request in, original stored under `input/`.
//!
//! Environment variables:
//! - `IMAGE_BUCKET` - bucket holding originals and thumbnails
//! - `THUMBNAIL_*` - function settings, see [`thumbnail_generator::Config`]
//! - `OTEL_*` - standard OpenTelemetry exporter settings

use lambda_runtime::Runtime;
use object_gateway::S3Gateway;
use std::sync::Arc;
use thumbnail_generator::{Config, Ingress, create_upload_service, init_telemetry, telemetry_sink};

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    let guard = init_telemetry("thumbnail-upload")?;
    let config = Config::load()?;

    let gateway = S3Gateway::from_env().await;
    let ingress = Arc::new(Ingress::new(gateway, telemetry_sink(&guard), &config));

    let service = create_upload_service(ingress, &guard);

    // Runtime::new rather than run(): the tracing layer already owns the
    // invocation span and its flush.
    Runtime::new(service).run().await
}
