//! AWS backends for spa-deploy
//!
//! Implements the collaborator traits of `spa-deploy-cloud` with the AWS
//! SDK for Rust: S3 for storage, CloudFront for delivery, ACM for
//! certificates and Route53 for DNS.
//!
//! Credentials and the deployment region come from the standard AWS
//! configuration chain. ACM is always called in `us-east-1`, the only
//! region whose certificates CloudFront accepts.
//!
//! # Example
//!
//! ```ignore
//! use spa_deploy_cloud::{Deployer, StateStore};
//! use spa_deploy_cloud_aws::AwsClients;
//!
//! let aws = AwsClients::from_env("eu-west-1").await;
//! let deployer = Deployer::new(aws.clients(), StateStore::new("."));
//! ```

mod error;

pub mod acm;
pub mod cloudfront;
pub mod route53;
pub mod s3;

pub use acm::AcmCertificates;
pub use cloudfront::CloudFrontCdn;
pub use route53::Route53Zones;
pub use s3::S3Storage;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use spa_deploy_cloud::Clients;
use std::sync::Arc;

/// Region every ACM call is made in
pub const CERTIFICATE_REGION: &str = "us-east-1";

/// SDK clients for one deployment region
#[derive(Clone)]
pub struct AwsClients {
    pub s3: aws_sdk_s3::Client,
    pub cloudfront: aws_sdk_cloudfront::Client,
    pub acm: aws_sdk_acm::Client,
    pub route53: aws_sdk_route53::Client,
}

impl AwsClients {
    /// Load the shared AWS configuration for `region`
    pub async fn from_env(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        tracing::debug!("Loaded AWS configuration for {}", region);
        Self::from_config(&config)
    }

    pub fn from_config(config: &SdkConfig) -> Self {
        let acm_config = aws_sdk_acm::config::Builder::from(config)
            .region(Region::new(CERTIFICATE_REGION))
            .build();

        Self {
            s3: aws_sdk_s3::Client::new(config),
            cloudfront: aws_sdk_cloudfront::Client::new(config),
            acm: aws_sdk_acm::Client::from_conf(acm_config),
            route53: aws_sdk_route53::Client::new(config),
        }
    }

    /// Backends for the orchestrator
    pub fn clients(&self) -> Clients {
        Clients {
            storage: Arc::new(S3Storage::new(self.s3.clone())),
            cdn: Arc::new(CloudFrontCdn::new(self.cloudfront.clone())),
            certificates: Arc::new(AcmCertificates::new(self.acm.clone())),
            dns: Arc::new(Route53Zones::new(self.route53.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acm_is_pinned_to_us_east_1() {
        let config = SdkConfig::builder()
            .region(Region::new("eu-west-1"))
            .behavior_version(BehaviorVersion::latest())
            .build();
        let aws = AwsClients::from_config(&config);

        assert_eq!(
            aws.acm.config().region().map(|r| r.as_ref()),
            Some(CERTIFICATE_REGION)
        );
        assert_eq!(
            aws.s3.config().region().map(|r| r.as_ref()),
            Some("eu-west-1")
        );
    }
}
