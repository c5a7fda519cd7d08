//! Extractors for the event sources the pipeline is triggered by.
//!
//! - `http` - API Gateway HTTP API (v2) requests
//! - `s3` - S3 object notifications

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "s3")]
pub mod s3;
