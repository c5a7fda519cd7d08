//! Extractors run against events shaped the way Lambda delivers them.

use aws_lambda_events::apigw::ApiGatewayV2httpRequest;
use aws_lambda_events::s3::S3Event;
use lambda_otel_tower::{ApiGatewayV2Extractor, InvocationExtractor, S3EventExtractor};
use lambda_runtime::Context as LambdaContext;

/// Upload request routed through an HTTP API with a traceparent header.
const UPLOAD_REQUEST: &str = r#"{
  "version": "2.0",
  "routeKey": "POST /upload/{name}",
  "rawPath": "/upload/cat.jpg",
  "rawQueryString": "",
  "headers": {
    "traceparent": "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
    "content-type": "text/plain",
    "user-agent": "curl/8.5.0",
    "host": "api.example.com"
  },
  "requestContext": {
    "accountId": "123456789012",
    "apiId": "api-id",
    "domainName": "api.example.com",
    "domainPrefix": "api",
    "http": {
      "method": "POST",
      "path": "/upload/cat.jpg",
      "protocol": "HTTP/1.1",
      "sourceIp": "203.0.113.42",
      "userAgent": "curl/8.5.0"
    },
    "requestId": "request-id",
    "routeKey": "POST /upload/{name}",
    "stage": "$default",
    "time": "01/Mar/2024:12:00:00 +0000",
    "timeEpoch": 1709294400000
  },
  "pathParameters": {
    "name": "cat.jpg"
  },
  "body": "aGVsbG8=",
  "isBase64Encoded": false
}"#;

/// Upload request without any trace header.
const UNTRACED_REQUEST: &str = r#"{
  "version": "2.0",
  "routeKey": "$default",
  "rawPath": "/upload",
  "rawQueryString": "filename=dog.png",
  "headers": {
    "Header1": "value1"
  },
  "queryStringParameters": {
    "filename": "dog.png"
  },
  "requestContext": {
    "accountId": "123456789012",
    "apiId": "api-id",
    "domainName": "id.execute-api.us-east-1.amazonaws.com",
    "domainPrefix": "id",
    "http": {
      "method": "POST",
      "path": "/upload",
      "protocol": "HTTP/1.1",
      "sourceIp": "192.168.0.1",
      "userAgent": "agent"
    },
    "requestId": "id",
    "routeKey": "$default",
    "stage": "$default",
    "time": "12/Mar/2020:19:03:58 +0000",
    "timeEpoch": 1583348638390
  },
  "body": "aGVsbG8=",
  "isBase64Encoded": false
}"#;

/// S3 notification for two uploaded originals, the second with an encoded key.
const OBJECT_CREATED: &str = r#"{
  "Records": [
    {
      "eventVersion": "2.1",
      "eventSource": "aws:s3",
      "awsRegion": "us-east-1",
      "eventTime": "2024-03-01T12:00:01.000Z",
      "eventName": "ObjectCreated:Put",
      "userIdentity": {"principalId": "AWS:AIDAEXAMPLE"},
      "requestParameters": {"sourceIPAddress": "203.0.113.42"},
      "responseElements": {
        "x-amz-request-id": "C3D13FE58DE4C810",
        "x-amz-id-2": "FMyUVURIY8/IgAtTv8xRjskZQpcIZ9KG4V5Wp6S7S/JRWeUWerMUE5JgHvANOjpD"
      },
      "s3": {
        "s3SchemaVersion": "1.0",
        "configurationId": "thumbnails",
        "bucket": {
          "name": "images",
          "ownerIdentity": {"principalId": "A3NL1KOZZKExample"},
          "arn": "arn:aws:s3:::images"
        },
        "object": {
          "key": "input/cat.jpg",
          "size": 1024,
          "eTag": "d41d8cd98f00b204e9800998ecf8427e",
          "sequencer": "0055AED6DCD90281E5"
        }
      }
    },
    {
      "eventVersion": "2.1",
      "eventSource": "aws:s3",
      "awsRegion": "us-east-1",
      "eventTime": "2024-03-01T12:00:02.000Z",
      "eventName": "ObjectCreated:Put",
      "userIdentity": {"principalId": "AWS:AIDAEXAMPLE"},
      "requestParameters": {"sourceIPAddress": "203.0.113.42"},
      "responseElements": {},
      "s3": {
        "s3SchemaVersion": "1.0",
        "configurationId": "thumbnails",
        "bucket": {
          "name": "images",
          "ownerIdentity": {"principalId": "A3NL1KOZZKExample"},
          "arn": "arn:aws:s3:::images"
        },
        "object": {
          "key": "input/my+holiday%281%29.jpg",
          "size": 2048,
          "eTag": "9e107d9d372bb6826bd81d3542a419d6",
          "sequencer": "0055AED6DCD90281E6"
        }
      }
    }
  ]
}"#;

#[test]
fn test_upload_request_parent_context() {
    let event: ApiGatewayV2httpRequest = serde_json::from_str(UPLOAD_REQUEST).unwrap();
    let extractor = ApiGatewayV2Extractor::new();

    let ctx = extractor.extract_context(&event).unwrap();
    assert_eq!(ctx.trace_id_hex(), "4bf92f3577b34da6a3ce929d0e0e4736");
    assert_eq!(ctx.span_id_hex(), "00f067aa0ba902b7");

    assert_eq!(extractor.trigger_type(), "http");
    assert_eq!(
        extractor.span_name(&event, &LambdaContext::default()),
        "POST /upload/{name}"
    );
}

#[test]
fn test_untraced_request_has_no_parent() {
    let event: ApiGatewayV2httpRequest = serde_json::from_str(UNTRACED_REQUEST).unwrap();
    let extractor = ApiGatewayV2Extractor::new();

    assert!(extractor.extract_context(&event).is_none());
    // "$default" has no method/route split, so the raw path is used
    assert_eq!(
        extractor.span_name(&event, &LambdaContext::default()),
        "POST /upload"
    );
}

#[test]
fn test_object_created_notification() {
    let event: S3Event = serde_json::from_str(OBJECT_CREATED).unwrap();
    let extractor = S3EventExtractor::new();

    assert_eq!(event.records.len(), 2);
    assert!(extractor.extract_context(&event).is_none());
    assert_eq!(extractor.trigger_type(), "datasource");
    assert_eq!(
        extractor.span_name(&event, &LambdaContext::default()),
        "images process"
    );
}
