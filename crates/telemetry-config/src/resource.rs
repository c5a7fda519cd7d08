//! Lambda resource attribute detection.
//!
//! Reads the standard Lambda environment variables and maps them onto the
//! cloud and FaaS semantic conventions. Outside Lambda (no
//! `AWS_EXECUTION_ENV` starting with `AWS_Lambda_`) nothing is detected.

use opentelemetry::KeyValue;
use opentelemetry_sdk::resource::{Resource, ResourceDetector};
use opentelemetry_semantic_conventions::SCHEMA_URL;
use opentelemetry_semantic_conventions::attribute as semconv;
use std::borrow::Cow;
use std::env;

const AWS_EXECUTION_ENV: &str = "AWS_EXECUTION_ENV";
const AWS_REGION: &str = "AWS_REGION";
const AWS_LAMBDA_FUNCTION_NAME: &str = "AWS_LAMBDA_FUNCTION_NAME";
const AWS_LAMBDA_FUNCTION_VERSION: &str = "AWS_LAMBDA_FUNCTION_VERSION";
const AWS_LAMBDA_FUNCTION_MEMORY_SIZE: &str = "AWS_LAMBDA_FUNCTION_MEMORY_SIZE";
const AWS_LAMBDA_LOG_STREAM_NAME: &str = "AWS_LAMBDA_LOG_STREAM_NAME";

/// Detects the Lambda function the process runs as.
#[derive(Debug, Default, Clone, Copy)]
pub struct AwsLambdaDetector;

impl ResourceDetector for AwsLambdaDetector {
    fn detect(&self) -> Resource {
        let in_lambda = env::var(AWS_EXECUTION_ENV)
            .map(|value| value.starts_with("AWS_Lambda_"))
            .unwrap_or(false);
        if !in_lambda {
            return Resource::builder_empty().build();
        }

        let mut attributes = vec![
            KeyValue::new(semconv::CLOUD_PROVIDER, "aws"),
            KeyValue::new(semconv::CLOUD_PLATFORM, "aws_lambda"),
        ];

        if let Ok(region) = env::var(AWS_REGION) {
            attributes.push(KeyValue::new(semconv::CLOUD_REGION, region));
        }

        if let Ok(name) = env::var(AWS_LAMBDA_FUNCTION_NAME) {
            attributes.push(KeyValue::new(semconv::FAAS_NAME, name));
        }

        if let Ok(version) = env::var(AWS_LAMBDA_FUNCTION_VERSION) {
            attributes.push(KeyValue::new(semconv::FAAS_VERSION, version));
        }

        if let Ok(memory) = env::var(AWS_LAMBDA_FUNCTION_MEMORY_SIZE)
            && let Ok(mb) = memory.parse::<i64>()
        {
            attributes.push(KeyValue::new(semconv::FAAS_MAX_MEMORY, mb * 1024 * 1024));
        }

        if let Ok(stream) = env::var(AWS_LAMBDA_LOG_STREAM_NAME) {
            attributes.push(KeyValue::new(semconv::FAAS_INSTANCE, stream));
        }

        Resource::builder_empty()
            .with_schema_url(attributes, Cow::Borrowed(SCHEMA_URL))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::{Key, Value};
    use serial_test::serial;

    fn get(resource: &Resource, key: &'static str) -> Option<Value> {
        resource.get(&Key::from_static_str(key))
    }

    #[test]
    #[serial]
    fn test_outside_lambda_detects_nothing() {
        temp_env::with_var_unset(AWS_EXECUTION_ENV, || {
            let resource = AwsLambdaDetector.detect();
            assert!(resource.is_empty());
        });
    }

    #[test]
    #[serial]
    fn test_detects_function_attributes() {
        temp_env::with_vars(
            [
                (AWS_EXECUTION_ENV, Some("AWS_Lambda_rust")),
                (AWS_REGION, Some("eu-west-1")),
                (AWS_LAMBDA_FUNCTION_NAME, Some("create-thumbnail")),
                (AWS_LAMBDA_FUNCTION_VERSION, Some("$LATEST")),
                (AWS_LAMBDA_FUNCTION_MEMORY_SIZE, Some("512")),
                (AWS_LAMBDA_LOG_STREAM_NAME, None),
            ],
            || {
                let resource = AwsLambdaDetector.detect();

                assert_eq!(
                    get(&resource, semconv::FAAS_NAME),
                    Some(Value::from("create-thumbnail"))
                );
                assert_eq!(
                    get(&resource, semconv::CLOUD_REGION),
                    Some(Value::from("eu-west-1"))
                );
                assert_eq!(
                    get(&resource, semconv::FAAS_MAX_MEMORY),
                    Some(Value::I64(512 * 1024 * 1024))
                );
                assert!(get(&resource, semconv::FAAS_INSTANCE).is_none());
            },
        );
    }
}
