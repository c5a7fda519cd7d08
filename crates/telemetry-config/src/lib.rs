//! OpenTelemetry SDK configuration and lifecycle for the thumbnail pipeline.
//!
//! Wires the OpenTelemetry SDK, OTLP exporters and the `tracing` ecosystem
//! together:
//!
//! - **Layered configuration** - defaults, an optional TOML file, standard
//!   `OTEL_*` environment variables and programmatic overrides, merged with
//!   [figment](https://docs.rs/figment)
//! - **Lambda resource detection** - `faas.*` and `cloud.*` attributes from
//!   the Lambda environment
//! - **Drop-based lifecycle** - providers are flushed and shut down when the
//!   [`OtelGuard`] goes out of scope
//! - **Tracing integration** - `tracing-opentelemetry` and
//!   `opentelemetry-appender-tracing` layers on an `EnvFilter` + `fmt`
//!   subscriber
//!
//! No provider is installed globally; the guard hands out tracers.
//!
//! # Example
//!
//! ```no_run
//! use telemetry_config::{OtelSdkBuilder, Protocol, SdkError};
//!
//! fn main() -> Result<(), SdkError> {
//!     let guard = OtelSdkBuilder::new()
//!         .with_default_file()
//!         .with_standard_env()
//!         .endpoint("http://collector:4318")
//!         .protocol(Protocol::HttpBinary)
//!         .service_name("create-thumbnail")
//!         .build()?;
//!
//!     let _tracer = guard.tracer("create-thumbnail");
//!     tracing::info!("Application running");
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod error;
mod guard;
mod resource;

pub use builder::OtelSdkBuilder;
pub use config::{
    BatchConfig, DEFAULT_CONFIG_PATH, EndpointConfig, OtelSdkConfig, Protocol, ResourceConfig,
    SignalConfig,
};
pub use error::SdkError;
pub use guard::OtelGuard;
pub use resource::AwsLambdaDetector;

pub use figment;
