//! Storage bucket step

use super::StepContext;
use crate::action::StepOutcome;
use crate::chain::ResourceKind;
use crate::error::{CloudError, Result};
use crate::state::DeployState;

/// Bucket a run publishes to
///
/// Name and region come from the request, not from state, so a bucket
/// that existed before spa-deploy can still be published to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketTarget {
    pub name: String,
    pub region: String,
    /// The bucket step saw the bucket in this run
    pub confirmed: bool,
}

impl BucketTarget {
    /// A target nothing has vouched for yet; later steps then require the
    /// bucket tag
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            confirmed: false,
        }
    }

    fn confirmed(name: &str, region: &str) -> Self {
        Self {
            confirmed: true,
            ..Self::new(name, region)
        }
    }
}

/// Reuse the bucket if it exists, otherwise create it and record it
///
/// Only a bucket created here gets the bucket tag; a pre-existing one is
/// published to but never torn down.
pub async fn ensure_bucket(
    ctx: &StepContext<'_>,
    state: &mut DeployState,
    bucket: &str,
    region: &str,
) -> Result<(StepOutcome, BucketTarget)> {
    let target = BucketTarget::confirmed(bucket, region);
    if ctx.clients.storage.bucket_exists(bucket).await? {
        tracing::info!("Bucket {} already exists", bucket);
        return Ok((StepOutcome::reused(ResourceKind::Bucket, bucket), target));
    }

    tracing::info!("Creating bucket {} in {}", bucket, region);
    ctx.clients
        .storage
        .create_bucket(bucket, region)
        .await
        .map_err(|e| CloudError::BucketCreation {
            bucket: bucket.to_string(),
            message: e.to_string(),
        })?;

    state.mark_created(ResourceKind::Bucket);
    state.bucket_name = Some(bucket.to_string());
    state.region = Some(region.to_string());
    ctx.store.commit(state).await?;

    Ok((StepOutcome::created(ResourceKind::Bucket, bucket), target))
}
