//! API Gateway HTTP API (v2) extractor.

use crate::extractor::InvocationExtractor;
use aws_lambda_events::apigw::ApiGatewayV2httpRequest;
use http::HeaderMap;
use lambda_runtime::Context as LambdaContext;
use opentelemetry_semantic_conventions::attribute::{
    CLIENT_ADDRESS, HTTP_REQUEST_METHOD, HTTP_ROUTE, NETWORK_PROTOCOL_VERSION, SERVER_ADDRESS,
    URL_PATH, URL_QUERY, URL_SCHEME, USER_AGENT_ORIGINAL,
};
use trace_metadata::TraceContext;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// W3C trace context header name.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Extractor for API Gateway HTTP API (v2) events.
///
/// The parent context comes from the `traceparent` header. A missing or
/// malformed header yields no parent and the invocation starts a new trace.
#[derive(Clone, Debug, Default)]
pub struct ApiGatewayV2Extractor;

impl ApiGatewayV2Extractor {
    /// Creates a new extractor.
    pub fn new() -> Self {
        Self
    }
}

/// Parses the `traceparent` header, if present and well formed.
pub fn traceparent_from_headers(headers: &HeaderMap) -> Option<TraceContext> {
    let raw = headers.get(TRACEPARENT_HEADER)?.to_str().ok()?;
    match TraceContext::parse(raw) {
        Ok(ctx) => Some(ctx),
        Err(error) => {
            tracing::debug!(%error, header = raw, "Ignoring malformed traceparent header");
            None
        }
    }
}

impl InvocationExtractor<ApiGatewayV2httpRequest> for ApiGatewayV2Extractor {
    fn extract_context(&self, event: &ApiGatewayV2httpRequest) -> Option<TraceContext> {
        traceparent_from_headers(&event.headers)
    }

    fn trigger_type(&self) -> &'static str {
        "http"
    }

    fn span_name(&self, event: &ApiGatewayV2httpRequest, lambda_ctx: &LambdaContext) -> String {
        let method = event.request_context.http.method.as_str();

        // route_key is e.g. "POST /upload/{name}"
        let route = event
            .route_key
            .as_deref()
            .and_then(|rk| rk.split_once(' ').map(|(_, route)| route))
            .or(event.raw_path.as_deref())
            .unwrap_or(&lambda_ctx.env_config.function_name);

        format!("{method} {route}")
    }

    fn record_attributes(&self, event: &ApiGatewayV2httpRequest, span: &Span) {
        span.set_attribute(
            HTTP_REQUEST_METHOD,
            event.request_context.http.method.as_str().to_owned(),
        );
        span.set_attribute(URL_SCHEME, "https");

        if let Some(path) = &event.raw_path {
            span.set_attribute(URL_PATH, path.clone());
        }

        if let Some(route_key) = &event.route_key {
            let route = route_key
                .split_once(' ')
                .map_or(route_key.as_str(), |(_, route)| route);
            span.set_attribute(HTTP_ROUTE, route.to_owned());
        }

        if let Some(query) = &event.raw_query_string
            && !query.is_empty()
        {
            span.set_attribute(URL_QUERY, query.clone());
        }

        if let Some(ua) = event.headers.get("user-agent")
            && let Ok(ua) = ua.to_str()
        {
            span.set_attribute(USER_AGENT_ORIGINAL, ua.to_owned());
        }

        if let Some(ip) = &event.request_context.http.source_ip {
            span.set_attribute(CLIENT_ADDRESS, ip.clone());
        }

        if let Some(host) = event.headers.get("host")
            && let Ok(host) = host.to_str()
        {
            span.set_attribute(SERVER_ADDRESS, host.to_owned());
        }

        if let Some(protocol) = &event.request_context.http.protocol {
            span.set_attribute(
                NETWORK_PROTOCOL_VERSION,
                extract_http_version(protocol).to_owned(),
            );
        }
    }
}

/// `"HTTP/1.1"` becomes `"1.1"`, `"HTTP/2.0"` becomes `"2"`.
fn extract_http_version(protocol: &str) -> &str {
    protocol
        .strip_prefix("HTTP/")
        .map(|v| v.trim_end_matches(".0"))
        .unwrap_or(protocol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    const HEADER: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    fn event_with_headers(headers: &[(&'static str, &'static str)]) -> ApiGatewayV2httpRequest {
        let mut event = ApiGatewayV2httpRequest::default();
        for &(name, value) in headers {
            event.headers.insert(name, HeaderValue::from_static(value));
        }
        event
    }

    #[test]
    fn test_extracts_traceparent() {
        let event = event_with_headers(&[(TRACEPARENT_HEADER, HEADER)]);
        let ctx = ApiGatewayV2Extractor::new().extract_context(&event).unwrap();

        assert_eq!(ctx.trace_id_hex(), "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(ctx.span_id_hex(), "00f067aa0ba902b7");
        assert!(ctx.is_sampled());
    }

    #[test]
    fn test_missing_header_yields_none() {
        let event = event_with_headers(&[("host", "example.com")]);
        assert!(ApiGatewayV2Extractor::new().extract_context(&event).is_none());
    }

    #[test]
    fn test_malformed_header_yields_none() {
        let event = event_with_headers(&[(TRACEPARENT_HEADER, "00-abc-def-01")]);
        assert!(ApiGatewayV2Extractor::new().extract_context(&event).is_none());
    }

    #[test]
    fn test_span_name_uses_route() {
        let mut event = ApiGatewayV2httpRequest::default();
        event.request_context.http.method = http::Method::POST;
        event.route_key = Some("POST /upload/{name}".to_string());
        event.raw_path = Some("/upload/cat.jpg".to_string());

        let name = ApiGatewayV2Extractor::new().span_name(&event, &LambdaContext::default());
        assert_eq!(name, "POST /upload/{name}");
    }

    #[test]
    fn test_span_name_falls_back_to_path() {
        let mut event = ApiGatewayV2httpRequest::default();
        event.request_context.http.method = http::Method::POST;
        event.raw_path = Some("/upload/cat.jpg".to_string());

        let name = ApiGatewayV2Extractor::new().span_name(&event, &LambdaContext::default());
        assert_eq!(name, "POST /upload/cat.jpg");
    }

    #[test]
    fn test_extract_http_version() {
        assert_eq!(extract_http_version("HTTP/1.1"), "1.1");
        assert_eq!(extract_http_version("HTTP/2.0"), "2");
        assert_eq!(extract_http_version("h2"), "h2");
    }
}
