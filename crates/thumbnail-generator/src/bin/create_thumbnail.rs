//! Create-thumbnail function: S3 `ObjectCreated` notifications in, thumbnails
//! stored under `output/`.
//!
//! Reads the same environment as the upload function.

use lambda_runtime::Runtime;
use object_gateway::S3Gateway;
use std::sync::Arc;
use thumbnail_generator::{
    Config, Dispatcher, ImageResizer, create_thumbnail_service, init_telemetry, telemetry_sink,
};

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    let guard = init_telemetry("thumbnail-create")?;
    let config = Config::load()?;

    tracing::info!(
        input = %config.storage.input_container,
        output = %config.storage.output_container,
        size = ?config.thumbnail.size,
        "Starting create-thumbnail function"
    );

    let gateway = S3Gateway::from_env().await;
    let dispatcher = Arc::new(Dispatcher::new(
        gateway,
        ImageResizer::default(),
        telemetry_sink(&guard),
        &config,
    ));

    let service = create_thumbnail_service(dispatcher, &guard);

    Runtime::new(service).run().await
}
