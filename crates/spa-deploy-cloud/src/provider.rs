//! Cloud collaborator traits
//!
//! The orchestrator talks to four managed services. Each is abstracted
//! behind an async trait so the AWS backends and the in-memory test
//! doubles are interchangeable.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Object storage (S3)
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Whether the bucket exists and is reachable
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()>;

    async fn put_public_access_block(&self, bucket: &str, block: PublicAccessBlock) -> Result<()>;

    async fn put_bucket_policy(&self, bucket: &str, policy: &serde_json::Value) -> Result<()>;

    /// Enable website mode with the given index and error documents
    async fn put_website(&self, bucket: &str, index_document: &str, error_document: &str)
    -> Result<()>;

    async fn delete_website(&self, bucket: &str) -> Result<()>;

    async fn put_object(&self, bucket: &str, object: &UploadObject) -> Result<()>;

    /// Delete every object version, delete marker and current object
    async fn empty_bucket(&self, bucket: &str) -> Result<()>;

    async fn delete_bucket(&self, bucket: &str) -> Result<()>;
}

/// Content delivery network (CloudFront)
#[async_trait]
pub trait ContentDelivery: Send + Sync {
    /// Create an origin access control and return its id
    async fn create_origin_access_control(&self, name: &str) -> Result<String>;

    async fn delete_origin_access_control(&self, id: &str) -> Result<()>;

    async fn create_distribution(&self, spec: &DistributionSpec) -> Result<DistributionInfo>;

    async fn get_distribution(&self, id: &str) -> Result<DistributionStatus>;

    /// Disable the distribution, returning the new version token
    async fn disable_distribution(&self, id: &str, etag: &str) -> Result<String>;

    async fn delete_distribution(&self, id: &str, etag: &str) -> Result<()>;

    /// Invalidate cached paths, returning the invalidation id
    async fn create_invalidation(&self, id: &str, paths: &[String]) -> Result<String>;
}

/// Certificate authority (ACM)
#[async_trait]
pub trait CertificateAuthority: Send + Sync {
    /// Request a DNS-validated certificate and return its ARN
    async fn request_certificate(&self, domain: &str) -> Result<String>;

    /// Describe a certificate; `None` when it no longer exists
    async fn describe_certificate(&self, arn: &str) -> Result<Option<CertificateDetail>>;

    async fn delete_certificate(&self, arn: &str) -> Result<()>;
}

/// DNS hosting (Route53)
#[async_trait]
pub trait DnsZones: Send + Sync {
    /// Id of the hosted zone named exactly `name`, if any
    async fn find_zone(&self, name: &str) -> Result<Option<String>>;

    async fn change_record(
        &self,
        zone_id: &str,
        action: RecordAction,
        record: &RecordSet,
    ) -> Result<()>;
}

/// The set of backends one deployment runs against
#[derive(Clone)]
pub struct Clients {
    pub storage: Arc<dyn ObjectStorage>,
    pub cdn: Arc<dyn ContentDelivery>,
    pub certificates: Arc<dyn CertificateAuthority>,
    pub dns: Arc<dyn DnsZones>,
}

/// Public access block settings for a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicAccessBlock {
    pub block_public_acls: bool,
    pub ignore_public_acls: bool,
    pub block_public_policy: bool,
    pub restrict_public_buckets: bool,
}

impl PublicAccessBlock {
    /// Everything open, for public website hosting
    pub fn open() -> Self {
        Self {
            block_public_acls: false,
            ignore_public_acls: false,
            block_public_policy: false,
            restrict_public_buckets: false,
        }
    }

    /// ACLs locked; policies stay allowed so a distribution policy can be attached
    pub fn private_with_policy() -> Self {
        Self {
            block_public_acls: true,
            ignore_public_acls: true,
            block_public_policy: false,
            restrict_public_buckets: false,
        }
    }
}

/// A file to be uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadObject {
    /// Object key, always `/`-separated
    pub key: String,
    /// Local file to read
    pub path: PathBuf,
    pub content_type: String,
    pub cache_control: Option<String>,
}

/// Desired configuration of a new distribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionSpec {
    pub caller_reference: String,
    pub comment: String,
    /// Regional REST endpoint of the origin bucket
    pub origin_domain: String,
    pub origin_access_control_id: String,
    pub default_root_object: String,
    pub cache_policy_id: String,
    /// Custom domain and certificate; `None` uses the default certificate
    pub alias: Option<DistributionAlias>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionAlias {
    pub domain: String,
    pub certificate_arn: String,
}

/// Identifiers of a created distribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionInfo {
    pub id: String,
    pub arn: String,
    pub domain_name: String,
}

/// Current state of a distribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionStatus {
    pub enabled: bool,
    /// `true` once the provider reports the last change fully deployed
    pub deployed: bool,
    /// Version token required for update and delete
    pub etag: String,
}

/// Certificate status as reported by the authority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    PendingValidation,
    Issued,
    Inactive,
    Expired,
    ValidationTimedOut,
    Revoked,
    Failed,
}

impl CertificateStatus {
    /// Parse the authority's status string; unknown values count as failed
    pub fn parse(s: &str) -> Self {
        match s {
            "PENDING_VALIDATION" => CertificateStatus::PendingValidation,
            "ISSUED" => CertificateStatus::Issued,
            "INACTIVE" => CertificateStatus::Inactive,
            "EXPIRED" => CertificateStatus::Expired,
            "VALIDATION_TIMED_OUT" => CertificateStatus::ValidationTimedOut,
            "REVOKED" => CertificateStatus::Revoked,
            _ => CertificateStatus::Failed,
        }
    }
}

impl std::fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CertificateStatus::PendingValidation => write!(f, "PENDING_VALIDATION"),
            CertificateStatus::Issued => write!(f, "ISSUED"),
            CertificateStatus::Inactive => write!(f, "INACTIVE"),
            CertificateStatus::Expired => write!(f, "EXPIRED"),
            CertificateStatus::ValidationTimedOut => write!(f, "VALIDATION_TIMED_OUT"),
            CertificateStatus::Revoked => write!(f, "REVOKED"),
            CertificateStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// What the authority knows about a certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDetail {
    pub status: CertificateStatus,
    /// DNS challenge, once the authority has published it
    pub validation_record: Option<ValidationRecord>,
    pub failure_reason: Option<String>,
}

/// DNS challenge published by the certificate authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub name: String,
    pub record_type: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    Upsert,
    Delete,
}

impl std::fmt::Display for RecordAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordAction::Upsert => write!(f, "UPSERT"),
            RecordAction::Delete => write!(f, "DELETE"),
        }
    }
}

/// A DNS record set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSet {
    /// Plain record with a TTL and a single value
    Simple {
        name: String,
        record_type: String,
        ttl: i64,
        value: String,
    },
    /// `A` alias pointing at another AWS-hosted name
    Alias {
        name: String,
        target_zone_id: String,
        target_dns_name: String,
    },
}

impl RecordSet {
    pub fn name(&self) -> &str {
        match self {
            RecordSet::Simple { name, .. } | RecordSet::Alias { name, .. } => name,
        }
    }
}
