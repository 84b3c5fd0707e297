//! Orchestrator error types

use crate::chain::ResourceKind;
use thiserror::Error;

/// Errors raised while provisioning or tearing down a deployment
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Failed to create bucket '{bucket}': {message}")]
    BucketCreation { bucket: String, message: String },

    #[error(
        "Cannot run the {step} step: {missing} is not recorded in the deployment state\n\nHint:\n  • Resources must be created by spa-deploy before later steps can use them"
    )]
    Precondition {
        step: &'static str,
        missing: ResourceKind,
    },

    #[error(
        "No Route53 hosted zone found for {0}\n\nHint:\n  • Create the hosted zone for the apex domain before deploying\n  • spa-deploy never creates hosted zones"
    )]
    HostedZoneNotFound(String),

    #[error("Certificate {arn} failed validation: {reason}")]
    CertificateFailed { arn: String, reason: String },

    #[error("Timed out waiting for {what} after {attempts} attempts")]
    Timeout { what: String, attempts: u32 },

    #[error("Cancelled while waiting for {0}")]
    Cancelled(String),

    #[error("{resource}: {message}")]
    Api { resource: String, message: String },

    #[error(
        "Output directory not found: {0}\n\nHint:\n  • Run the build first, or pass --output to point at the build output"
    )]
    OutputDirNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Nothing to destroy: no resources are tracked in the state file")]
    NothingToDestroy,

    #[error("Aborted by user")]
    Aborted,

    #[error("State file error: {0}")]
    StateError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Wrap a backend failure, naming the resource it concerns
    pub fn api(resource: impl Into<String>, message: impl std::fmt::Display) -> Self {
        CloudError::Api {
            resource: resource.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
