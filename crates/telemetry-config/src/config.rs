//! Telemetry configuration model and layered loading.
//!
//! Configuration is resolved from, in increasing priority:
//! 1. Compiled-in defaults
//! 2. A TOML file, `/var/task/otel-config.toml` by default (optional)
//! 3. Standard OpenTelemetry environment variables
//! 4. Programmatic overrides applied through [`OtelSdkBuilder`](crate::OtelSdkBuilder)
//!
//! | Variable | Config Path |
//! |----------|-------------|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | `endpoint.url` |
//! | `OTEL_EXPORTER_OTLP_PROTOCOL` | `endpoint.protocol` |
//! | `OTEL_EXPORTER_OTLP_HEADERS` | `endpoint.headers` |
//! | `OTEL_SERVICE_NAME` | `resource.service_name` |

use figment::providers::Serialized;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Path of the optional configuration file inside a Lambda package.
pub const DEFAULT_CONFIG_PATH: &str = "/var/task/otel-config.toml";

const DEFAULT_HTTP_ENDPOINT: &str = "http://localhost:4318";
const DEFAULT_GRPC_ENDPOINT: &str = "http://localhost:4317";

/// OTLP transport.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// gRPC via tonic (port 4317).
    Grpc,
    /// HTTP with protobuf bodies (port 4318).
    #[default]
    HttpBinary,
    /// HTTP with JSON bodies (port 4318).
    HttpJson,
}

impl Protocol {
    /// Parses the values accepted by `OTEL_EXPORTER_OTLP_PROTOCOL`.
    pub fn from_otel_env(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "grpc" => Some(Self::Grpc),
            "http/protobuf" | "http" => Some(Self::HttpBinary),
            "http/json" => Some(Self::HttpJson),
            _ => None,
        }
    }
}

/// Complete SDK configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OtelSdkConfig {
    /// Collector endpoint.
    pub endpoint: EndpointConfig,
    /// Resource attributes.
    pub resource: ResourceConfig,
    /// Trace pipeline.
    pub traces: SignalConfig,
    /// Log pipeline.
    pub logs: SignalConfig,
    /// Whether to install the global `tracing` subscriber.
    pub init_tracing_subscriber: bool,
}

impl Default for OtelSdkConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            resource: ResourceConfig::default(),
            traces: SignalConfig::default(),
            logs: SignalConfig::default(),
            init_tracing_subscriber: true,
        }
    }
}

impl OtelSdkConfig {
    /// The configured endpoint, or the protocol's localhost default.
    pub fn effective_endpoint(&self) -> String {
        match &self.endpoint.url {
            Some(url) => url.clone(),
            None => match self.endpoint.protocol {
                Protocol::Grpc => DEFAULT_GRPC_ENDPOINT.to_string(),
                Protocol::HttpBinary | Protocol::HttpJson => DEFAULT_HTTP_ENDPOINT.to_string(),
            },
        }
    }

    /// HTTP endpoint for one signal, e.g. `/v1/traces`.
    ///
    /// An endpoint that already names the signal path is returned unchanged.
    pub fn signal_endpoint(&self, path: &str) -> String {
        let base = self.effective_endpoint();
        let base = base.trim_end_matches('/');
        if base.ends_with(path) {
            base.to_string()
        } else {
            format!("{base}{path}")
        }
    }
}

/// Collector endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Collector URL; defaults by protocol when unset.
    pub url: Option<String>,
    /// Transport.
    pub protocol: Protocol,
    /// Export timeout in milliseconds.
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    /// Extra headers (HTTP) or metadata (gRPC).
    pub headers: HashMap<String, String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: None,
            protocol: Protocol::HttpBinary,
            timeout: Duration::from_secs(10),
            headers: HashMap::new(),
        }
    }
}

/// Resource attributes attached to every exported signal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// `service.name`.
    pub service_name: Option<String>,
    /// `service.version`.
    pub service_version: Option<String>,
    /// `deployment.environment.name`.
    pub deployment_environment: Option<String>,
    /// Arbitrary additional attributes.
    pub attributes: HashMap<String, String>,
}

/// Per-signal switch and batching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Whether the signal is exported.
    pub enabled: bool,
    /// Batch processor settings.
    pub batch: BatchConfig,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch: BatchConfig::default(),
        }
    }
}

/// Batch processor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum queued items before dropping.
    pub max_queue_size: usize,
    /// Maximum items per export call.
    pub max_export_batch_size: usize,
    /// Delay between scheduled exports in milliseconds.
    #[serde(with = "duration_ms")]
    pub scheduled_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 2048,
            max_export_batch_size: 512,
            scheduled_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct PartialEndpointConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    protocol: Option<Protocol>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    headers: HashMap<String, String>,
}

#[derive(Debug, Default, Serialize)]
struct PartialResourceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    service_name: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct PartialConfig {
    endpoint: PartialEndpointConfig,
    resource: PartialResourceConfig,
}

/// Standard `OTEL_*` variables as a figment provider.
pub(crate) fn standard_otel_env() -> Serialized<PartialConfig> {
    let mut config = PartialConfig::default();

    if let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        config.endpoint.url = Some(endpoint);
    }

    if let Ok(protocol) = std::env::var("OTEL_EXPORTER_OTLP_PROTOCOL") {
        config.endpoint.protocol = Protocol::from_otel_env(&protocol);
    }

    if let Ok(headers) = std::env::var("OTEL_EXPORTER_OTLP_HEADERS") {
        config.endpoint.headers = parse_headers(&headers);
    }

    if let Ok(name) = std::env::var("OTEL_SERVICE_NAME") {
        config.resource.service_name = Some(name);
    }

    Serialized::defaults(config)
}

fn parse_headers(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
