//! Thumbnail pipeline workspace - integration tests for the traced upload and
//! thumbnail functions.
//!
//! This is a virtual package that provides workspace-level integration tests.
//! The actual functionality is provided by the workspace member crates:
//!
//! - `trace-metadata`: trace header codec, object metadata encoding, dependency spans
//! - `object-gateway`: get/put facade over object storage (in-memory and S3)
//! - `telemetry-config`: OpenTelemetry SDK setup and provider lifecycle
//! - `lambda-otel-tower`: Tower middleware instrumenting Lambda invocations
//! - `thumbnail-generator`: the upload and create-thumbnail functions
