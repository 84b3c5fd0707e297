//! Resource kinds and the dependency chain between them
//!
//! The forward order is the order in which resources are created on a
//! full deploy (bucket, certificate, validation record, distribution,
//! alias). Teardown always walks the exact reverse. State only answers
//! "is this kind present", never "in which order was it created".

use serde::{Deserialize, Serialize};

/// Kind of a managed resource, serialized as its state-file tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// S3 bucket holding the site files
    #[serde(rename = "s3_bucket")]
    Bucket,
    /// ACM certificate for the custom domain
    #[serde(rename = "acm_certificate")]
    Certificate,
    /// Route53 record answering the ACM DNS challenge
    #[serde(rename = "route53_validation_record")]
    ValidationRecord,
    /// CloudFront distribution (and its origin access control)
    #[serde(rename = "cloudfront_distribution")]
    Distribution,
    /// Route53 alias from the custom domain to the distribution
    #[serde(rename = "route53_alias_record")]
    AliasRecord,
}

impl ResourceKind {
    /// State-file tag for this kind
    pub fn tag(self) -> &'static str {
        match self {
            ResourceKind::Bucket => "s3_bucket",
            ResourceKind::Certificate => "acm_certificate",
            ResourceKind::ValidationRecord => "route53_validation_record",
            ResourceKind::Distribution => "cloudfront_distribution",
            ResourceKind::AliasRecord => "route53_alias_record",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Bucket => write!(f, "S3 bucket"),
            ResourceKind::Certificate => write!(f, "ACM certificate"),
            ResourceKind::ValidationRecord => write!(f, "Route53 validation record"),
            ResourceKind::Distribution => write!(f, "CloudFront distribution"),
            ResourceKind::AliasRecord => write!(f, "Route53 alias record"),
        }
    }
}

/// The fixed dependency chain
pub struct Chain;

impl Chain {
    /// Creation order
    pub const FORWARD: [ResourceKind; 5] = [
        ResourceKind::Bucket,
        ResourceKind::Certificate,
        ResourceKind::ValidationRecord,
        ResourceKind::Distribution,
        ResourceKind::AliasRecord,
    ];

    /// Teardown order, the exact reverse of [`Chain::FORWARD`]
    pub fn teardown_order() -> impl Iterator<Item = ResourceKind> {
        Self::FORWARD.into_iter().rev()
    }

    /// Kinds that must exist before `kind` can be created
    pub fn requires(kind: ResourceKind) -> &'static [ResourceKind] {
        match kind {
            ResourceKind::Bucket => &[],
            ResourceKind::Certificate => &[],
            ResourceKind::ValidationRecord => &[ResourceKind::Certificate],
            ResourceKind::Distribution => &[ResourceKind::Bucket],
            ResourceKind::AliasRecord => &[ResourceKind::Distribution],
        }
    }
}
