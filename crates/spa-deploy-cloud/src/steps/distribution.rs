//! CloudFront distribution step
//!
//! Makes the bucket private, binds it to a new origin access control and
//! fronts it with a distribution. On later runs the existing distribution
//! only gets its cache invalidated.

use super::hosting::INDEX_DOCUMENT;
use super::bucket::BucketTarget;
use super::{StepContext, attribute, require, require_bucket};
use crate::action::StepOutcome;
use crate::chain::ResourceKind;
use crate::error::Result;
use crate::provider::{DistributionAlias, DistributionSpec, PublicAccessBlock};
use crate::state::DeployState;

/// Managed "CachingOptimized" cache policy
pub const CACHING_OPTIMIZED_POLICY_ID: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";

/// Paths invalidated after every upload
pub const INVALIDATE_ALL: &str = "/*";

/// Regional REST endpoint of a bucket, used as the distribution origin
pub fn origin_domain(bucket: &str, region: &str) -> String {
    format!("{}.s3.{}.amazonaws.com", bucket, region)
}

/// Read access for one distribution only
///
/// Scoped by the distribution ARN so no other distribution can use the
/// CloudFront service principal to read the bucket.
pub fn distribution_read_policy(bucket: &str, distribution_arn: &str) -> serde_json::Value {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Sid": "AllowCloudFrontServicePrincipal",
                "Effect": "Allow",
                "Principal": {"Service": "cloudfront.amazonaws.com"},
                "Action": "s3:GetObject",
                "Resource": format!("arn:aws:s3:::{}/*", bucket),
                "Condition": {"StringEquals": {"AWS:SourceArn": distribution_arn}},
            }
        ],
    })
}

/// Name of the distribution step in precondition errors
pub const STEP: &str = "CloudFront distribution";

/// Check the distribution step could run, before anything is provisioned
/// for it
pub fn check_preconditions(state: &DeployState, target: &BucketTarget) -> Result<()> {
    require_bucket(state, STEP, target)
}

/// Create the distribution in front of `target`
///
/// The custom domain is attached only when a certificate is recorded;
/// otherwise the distribution uses the provider's default certificate.
pub async fn create_distribution(
    ctx: &StepContext<'_>,
    state: &mut DeployState,
    target: &BucketTarget,
    domain: Option<&str>,
) -> Result<StepOutcome> {
    check_preconditions(state, target)?;
    if let Some(id) = state.trusted(ResourceKind::Distribution, &state.cloudfront_distribution_id)
    {
        return Ok(StepOutcome::reused(ResourceKind::Distribution, id));
    }

    let bucket = target.name.as_str();
    let region = target.region.as_str();
    let storage = &ctx.clients.storage;
    let cdn = &ctx.clients.cdn;

    // Website mode and the REST origin are mutually exclusive
    if let Err(e) = storage.delete_website(bucket).await {
        tracing::debug!("No website configuration removed from {}: {}", bucket, e);
    }
    storage
        .put_public_access_block(bucket, PublicAccessBlock::private_with_policy())
        .await?;

    tracing::info!("Creating origin access control for {}", bucket);
    let oac_id = cdn
        .create_origin_access_control(&format!("{}-oac", bucket))
        .await?;

    let alias = match (
        domain,
        state.trusted(ResourceKind::Certificate, &state.acm_certificate_arn),
    ) {
        (Some(domain), Some(arn)) => Some(DistributionAlias {
            domain: domain.to_string(),
            certificate_arn: arn.to_string(),
        }),
        (Some(domain), None) => {
            tracing::warn!(
                "No certificate recorded for {}, using the default CloudFront certificate",
                domain
            );
            None
        }
        _ => None,
    };

    let spec = DistributionSpec {
        caller_reference: uuid::Uuid::new_v4().to_string(),
        comment: format!("SPA deploy: {}", bucket),
        origin_domain: origin_domain(bucket, region),
        origin_access_control_id: oac_id.clone(),
        default_root_object: INDEX_DOCUMENT.to_string(),
        cache_policy_id: CACHING_OPTIMIZED_POLICY_ID.to_string(),
        alias,
    };

    tracing::info!("Creating CloudFront distribution for {}", bucket);
    let info = cdn.create_distribution(&spec).await?;

    storage
        .put_bucket_policy(bucket, &distribution_read_policy(bucket, &info.arn))
        .await?;

    state.mark_created(ResourceKind::Distribution);
    state.cloudfront_distribution_id = Some(info.id.clone());
    state.cloudfront_domain = Some(info.domain_name.clone());
    state.cloudfront_oac_id = Some(oac_id);
    ctx.store.commit(state).await?;

    tracing::info!(
        "CloudFront distribution {} created at https://{}",
        info.id,
        info.domain_name
    );
    Ok(StepOutcome::created(ResourceKind::Distribution, info.id))
}

/// Purge every cached path of the recorded distribution
///
/// Returns the outcome together with the invalidation id.
pub async fn invalidate_all(
    ctx: &StepContext<'_>,
    state: &DeployState,
) -> Result<(StepOutcome, String)> {
    require(state, "cache invalidation", ResourceKind::Distribution)?;
    let id = attribute(
        state,
        ResourceKind::Distribution,
        &state.cloudfront_distribution_id,
        "cloudfront_distribution_id",
    )?;

    tracing::info!("Invalidating {} on distribution {}", INVALIDATE_ALL, id);
    let invalidation = ctx
        .clients
        .cdn
        .create_invalidation(id, &[INVALIDATE_ALL.to_string()])
        .await?;

    Ok((StepOutcome::updated(ResourceKind::Distribution, id), invalidation))
}
