//! spa-deploy resource orchestration
//!
//! This crate provisions and tears down the small graph of AWS resources
//! that publishes a single-page application: an S3 bucket, an optional
//! CloudFront distribution, an optional ACM certificate and the Route53
//! records that validate and alias it. Every run is idempotent against the
//! resources recorded in the project's state file.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  spa-deploy CLI                  │
//! │          (deploy / --destroy, prompts)           │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               spa-deploy-cloud                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Deployer: chain forward / teardown back  │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────────┐    │
//! │  │  Steps   │ │  Waiter  │ │  State Store │    │
//! │  └──────────┘ └──────────┘ └──────────────┘    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  ObjectStorage / ContentDelivery /        │   │
//! │  │  CertificateAuthority / DnsZones          │   │
//! │  └──────────────────────────────────────────┘   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │ spa-deploy-   │
//!           │  cloud-aws    │
//!           └───────────────┘
//! ```

pub mod action;
pub mod chain;
pub mod confirm;
pub mod deployer;
pub mod error;
pub mod provider;
pub mod state;
pub mod steps;
pub mod teardown;
pub mod upload;
pub mod waiter;
pub mod zone;

// Re-exports
pub use action::{DeploySummary, StepAction, StepOutcome, TeardownReport, TeardownWarning};
pub use chain::{Chain, ResourceKind};
pub use confirm::{AutoConfirm, Confirm};
pub use deployer::{DeployRequest, Deployer};
pub use error::{CloudError, Result};
pub use provider::{
    CertificateAuthority, CertificateDetail, CertificateStatus, Clients, ContentDelivery,
    DistributionAlias, DistributionInfo, DistributionSpec, DistributionStatus, DnsZones,
    ObjectStorage, PublicAccessBlock, RecordAction, RecordSet, UploadObject, ValidationRecord,
};
pub use state::{DeployState, StateStore};
pub use steps::bucket::BucketTarget;
pub use steps::{StepContext, Timings};
pub use waiter::{Check, WaitPolicy, Waiter};
