//! Resource steps
//!
//! Each step receives the deployment state it may touch, decides whether
//! its resource already exists, creates it if not, and persists the state
//! before returning. Running a step twice converges on the same result.

pub mod alias;
pub mod bucket;
pub mod certificate;
pub mod distribution;
pub mod hosting;

use crate::chain::ResourceKind;
use crate::error::{CloudError, Result};
use crate::provider::Clients;
use crate::state::{DeployState, StateStore};
use crate::waiter::{WaitPolicy, Waiter};
use std::time::Duration;

/// Polling bounds for every asynchronous wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// ACM publishing the DNS challenge
    pub validation_record: WaitPolicy,
    /// ACM issuing the certificate once the challenge is in DNS
    pub issuance: WaitPolicy,
    /// CloudFront rolling out a configuration change
    pub distribution_deployed: WaitPolicy,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            validation_record: WaitPolicy::new(Duration::from_secs(2), 30),
            issuance: WaitPolicy::new(Duration::from_secs(2), 90).with_progress_every(15),
            distribution_deployed: WaitPolicy::new(Duration::from_secs(15), 60)
                .with_progress_every(4),
        }
    }
}

/// What a step needs besides the state itself
pub struct StepContext<'a> {
    pub clients: &'a Clients,
    pub store: &'a StateStore,
    pub waiter: &'a Waiter,
    pub timings: &'a Timings,
}

/// Fail unless `kind` is recorded in `state`
pub(crate) fn require(state: &DeployState, step: &'static str, kind: ResourceKind) -> Result<()> {
    if state.has(kind) {
        Ok(())
    } else {
        Err(CloudError::Precondition {
            step,
            missing: kind,
        })
    }
}

/// Fail unless the bucket step confirmed `bucket` or it is recorded
pub(crate) fn require_bucket(
    state: &DeployState,
    step: &'static str,
    bucket: &bucket::BucketTarget,
) -> Result<()> {
    if bucket.confirmed {
        return Ok(());
    }
    require(state, step, ResourceKind::Bucket)
}

/// A trusted attribute that must be set when its kind is recorded
pub(crate) fn attribute<'a>(
    state: &'a DeployState,
    kind: ResourceKind,
    value: &'a Option<String>,
    name: &str,
) -> Result<&'a str> {
    state.trusted(kind, value).ok_or_else(|| {
        CloudError::StateError(format!("{} is recorded but {} is missing", kind, name))
    })
}
