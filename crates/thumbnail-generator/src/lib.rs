//! Traced thumbnail pipeline: an upload function and a create-thumbnail function.
//!
//! The upload function stores a base64 encoded image under `input/<name>`.
//! Storing it raises a storage event that invokes the create-thumbnail
//! function, which writes a resized copy under `output/<name>`. Storage
//! events carry no headers, so the trace context of the upload request
//! travels in the original's object metadata and the thumbnail step is
//! recorded as part of the same trace.
//!
//! - [`Ingress`] - validates, decodes and stores uploads
//! - [`Dispatcher`] - turns created originals into thumbnails
//! - [`Resizer`] / [`ImageResizer`] - the resize step
//! - [`Config`] - layered function configuration
//! - [`create_upload_service`] / [`create_thumbnail_service`] - instrumented
//!   Lambda services
//!
//! # Example
//!
//! ```
//! use object_gateway::{InMemoryGateway, ObjectGateway};
//! use std::sync::Arc;
//! use thumbnail_generator::{Config, Dispatcher, ImageResizer, Ingress, ObjectCreated, UploadRequest};
//! use trace_metadata::RecordingSink;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = Config::default();
//! let gateway = InMemoryGateway::new();
//! let sink = Arc::new(RecordingSink::new());
//!
//! let ingress = Ingress::new(gateway.clone(), sink.clone(), &config);
//! let dispatcher = Dispatcher::new(gateway.clone(), ImageResizer::default(), sink, &config);
//!
//! let err = ingress.upload(UploadRequest::new("cat.jpg", "not-base64!!")).await;
//! assert!(err.is_err());
//!
//! let report = dispatcher
//!     .dispatch_batch(&[ObjectCreated::new("input", "input/cat.jpg")])
//!     .await;
//! assert_eq!(report.skipped.len(), 1);
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dispatcher;
mod error;
mod ingress;
mod resizer;
mod service;

pub use config::{
    Config, DEFAULT_CONFIG_PATH, StorageConfig, ThumbnailConfig, ThumbnailSize, TraceConfig,
};
pub use dispatcher::{
    BatchReport, CREATE_THUMBNAIL_SPAN, DispatchOutcome, Dispatcher, FailedRecord, OUTPUT_PREFIX,
    ObjectCreated, SkipReason, SkippedRecord, derive_output_key,
};
pub use error::{DispatchError, UploadError};
pub use ingress::{
    CONTAINER_ATTRIBUTE, INPUT_PREFIX, Ingress, KEY_ATTRIBUTE, UPLOAD_SPAN, UploadReceipt,
    UploadRequest,
};
pub use resizer::{Dimensions, ImageResizer, ResizeError, Resizer};
pub use service::{
    HttpResponse, create_thumbnail_service, create_upload_service, decode_object_key,
    handle_object_created, handle_upload, init_telemetry, object_created_events, telemetry_sink,
};
