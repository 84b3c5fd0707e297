//! Mapping of SDK failures into orchestrator errors

use aws_sdk_s3::error::DisplayErrorContext;
use spa_deploy_cloud::CloudError;

/// Wrap any SDK, build or stream error, keeping its full source chain
pub(crate) fn api_error<E>(resource: impl Into<String>, err: E) -> CloudError
where
    E: std::error::Error,
{
    CloudError::api(resource, DisplayErrorContext(err))
}

/// A required field was not present in an otherwise successful response
pub(crate) fn missing(resource: impl Into<String>, field: &str) -> CloudError {
    CloudError::api(resource, format!("response did not include {}", field))
}
