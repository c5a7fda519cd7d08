//! Fluent construction of the telemetry SDK.

use crate::config::{DEFAULT_CONFIG_PATH, OtelSdkConfig, Protocol, standard_otel_env};
use crate::error::SdkError;
use crate::guard::OtelGuard;
use figment::Figment;
use figment::providers::{Format, Serialized, Toml};
use std::path::Path;
use std::time::Duration;

/// Builder layering configuration sources and producing an [`OtelGuard`].
///
/// Later calls take precedence over earlier ones, so programmatic overrides
/// should come after [`with_file`](Self::with_file) and
/// [`with_standard_env`](Self::with_standard_env).
///
/// # Example
///
/// ```no_run
/// use telemetry_config::{OtelSdkBuilder, Protocol, SdkError};
///
/// fn main() -> Result<(), SdkError> {
///     let _guard = OtelSdkBuilder::new()
///         .with_default_file()
///         .with_standard_env()
///         .protocol(Protocol::HttpBinary)
///         .service_name("create-thumbnail")
///         .build()?;
///     Ok(())
/// }
/// ```
#[must_use = "builders do nothing unless .build() is called"]
#[derive(Debug, Clone)]
pub struct OtelSdkBuilder {
    figment: Figment,
    detect_lambda: bool,
}

impl OtelSdkBuilder {
    /// Starts from compiled-in defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::from(Serialized::defaults(OtelSdkConfig::default())),
            detect_lambda: true,
        }
    }

    /// Starts from a caller-provided figment.
    pub fn from_figment(figment: Figment) -> Self {
        Self {
            figment,
            detect_lambda: true,
        }
    }

    /// Layers a TOML file, if it exists.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.exists() {
            self.figment = self.figment.merge(Toml::file(path));
        }
        self
    }

    /// Layers `/var/task/otel-config.toml`, if it exists.
    pub fn with_default_file(self) -> Self {
        self.with_file(DEFAULT_CONFIG_PATH)
    }

    /// Layers the standard `OTEL_*` environment variables.
    pub fn with_standard_env(mut self) -> Self {
        self.figment = self.figment.merge(standard_otel_env());
        self
    }

    /// Sets the collector URL.
    pub fn endpoint(self, url: impl Into<String>) -> Self {
        self.set("endpoint.url", url.into())
    }

    /// Sets the OTLP transport.
    pub fn protocol(self, protocol: Protocol) -> Self {
        self.set("endpoint.protocol", protocol)
    }

    /// Sets the export timeout.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.set("endpoint.timeout", timeout.as_millis() as u64)
    }

    /// Adds an export header.
    pub fn header(self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        let path = format!("endpoint.headers.{}", key.as_ref());
        self.set(&path, value.into())
    }

    /// Sets `service.name`.
    pub fn service_name(self, name: impl Into<String>) -> Self {
        self.set("resource.service_name", name.into())
    }

    /// Sets `service.version`.
    pub fn service_version(self, version: impl Into<String>) -> Self {
        self.set("resource.service_version", version.into())
    }

    /// Sets `deployment.environment.name`.
    pub fn deployment_environment(self, environment: impl Into<String>) -> Self {
        self.set("resource.deployment_environment", environment.into())
    }

    /// Enables or disables span export.
    pub fn traces(self, enabled: bool) -> Self {
        self.set("traces.enabled", enabled)
    }

    /// Enables or disables log export.
    pub fn logs(self, enabled: bool) -> Self {
        self.set("logs.enabled", enabled)
    }

    /// Whether [`build`](Self::build) installs the global `tracing` subscriber.
    pub fn init_tracing_subscriber(self, enabled: bool) -> Self {
        self.set("init_tracing_subscriber", enabled)
    }

    /// Whether Lambda environment attributes are added to the resource.
    pub fn detect_lambda_resource(mut self, enabled: bool) -> Self {
        self.detect_lambda = enabled;
        self
    }

    /// Resolves the layered configuration without building providers.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Config`] if a source fails to parse.
    pub fn extract(&self) -> Result<OtelSdkConfig, SdkError> {
        Ok(self.figment.extract()?)
    }

    /// Builds the providers and, unless disabled, installs the subscriber.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid, an exporter cannot be
    /// built, or a subscriber is already installed.
    pub fn build(self) -> Result<OtelGuard, SdkError> {
        let config = self.extract()?;
        OtelGuard::from_config(config, self.detect_lambda)
    }

    fn set<T: serde::Serialize>(mut self, path: &str, value: T) -> Self {
        self.figment = self.figment.merge(Serialized::default(path, value));
        self
    }
}

impl Default for OtelSdkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_programmatic_overrides() {
        let config = OtelSdkBuilder::new()
            .endpoint("http://collector:4317")
            .protocol(Protocol::Grpc)
            .timeout(Duration::from_millis(2500))
            .header("x-api-key", "secret")
            .service_name("upload")
            .service_version("1.2.3")
            .logs(false)
            .extract()
            .unwrap();

        assert_eq!(config.endpoint.url.as_deref(), Some("http://collector:4317"));
        assert_eq!(config.endpoint.protocol, Protocol::Grpc);
        assert_eq!(config.endpoint.timeout, Duration::from_millis(2500));
        assert_eq!(config.endpoint.headers["x-api-key"], "secret");
        assert_eq!(config.resource.service_name.as_deref(), Some("upload"));
        assert_eq!(config.resource.service_version.as_deref(), Some("1.2.3"));
        assert!(config.traces.enabled);
        assert!(!config.logs.enabled);
    }

    #[test]
    fn test_file_layer() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[endpoint]
url = "http://file-collector:4318"
protocol = "http_json"

[resource]
service_name = "from-file"

[traces.batch]
max_export_batch_size = 64
"#
        )
        .unwrap();

        let config = OtelSdkBuilder::new()
            .with_file(file.path())
            .extract()
            .unwrap();

        assert_eq!(
            config.endpoint.url.as_deref(),
            Some("http://file-collector:4318")
        );
        assert_eq!(config.endpoint.protocol, Protocol::HttpJson);
        assert_eq!(config.resource.service_name.as_deref(), Some("from-file"));
        assert_eq!(config.traces.batch.max_export_batch_size, 64);
        assert_eq!(config.traces.batch.max_queue_size, 2048);
    }

    #[test]
    fn test_missing_file_is_ignored() {
        let config = OtelSdkBuilder::new()
            .with_file("/nonexistent/otel-config.toml")
            .extract()
            .unwrap();
        assert!(config.endpoint.url.is_none());
    }

    #[test]
    #[serial]
    fn test_standard_env_layer() {
        temp_env::with_vars(
            [
                ("OTEL_EXPORTER_OTLP_ENDPOINT", Some("http://env-collector:4317")),
                ("OTEL_EXPORTER_OTLP_PROTOCOL", Some("grpc")),
                ("OTEL_EXPORTER_OTLP_HEADERS", Some("team=imaging")),
                ("OTEL_SERVICE_NAME", Some("env-service")),
            ],
            || {
                let config = OtelSdkBuilder::new()
                    .with_standard_env()
                    .extract()
                    .unwrap();

                assert_eq!(
                    config.endpoint.url.as_deref(),
                    Some("http://env-collector:4317")
                );
                assert_eq!(config.endpoint.protocol, Protocol::Grpc);
                assert_eq!(config.endpoint.headers["team"], "imaging");
                assert_eq!(config.resource.service_name.as_deref(), Some("env-service"));
            },
        );
    }

    #[test]
    #[serial]
    fn test_programmatic_beats_env() {
        temp_env::with_var("OTEL_SERVICE_NAME", Some("env-service"), || {
            let config = OtelSdkBuilder::new()
                .with_standard_env()
                .service_name("explicit")
                .extract()
                .unwrap();
            assert_eq!(config.resource.service_name.as_deref(), Some("explicit"));
        });
    }

    #[test]
    #[serial]
    fn test_unknown_protocol_env_keeps_default() {
        temp_env::with_var("OTEL_EXPORTER_OTLP_PROTOCOL", Some("smoke-signals"), || {
            let config = OtelSdkBuilder::new()
                .with_standard_env()
                .extract()
                .unwrap();
            assert_eq!(config.endpoint.protocol, Protocol::HttpBinary);
        });
    }
}
