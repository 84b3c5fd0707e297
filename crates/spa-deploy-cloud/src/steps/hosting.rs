//! Public website hosting on the bucket itself (no CDN)

use super::bucket::BucketTarget;
use super::{StepContext, require_bucket};
use crate::action::StepOutcome;
use crate::chain::ResourceKind;
use crate::error::Result;
use crate::provider::PublicAccessBlock;
use crate::state::DeployState;

pub const INDEX_DOCUMENT: &str = "index.html";

/// Website endpoint of a bucket
pub fn website_url(bucket: &str, region: &str) -> String {
    format!("http://{}.s3-website-{}.amazonaws.com", bucket, region)
}

/// Read-only access to every object for anyone
pub fn public_read_policy(bucket: &str) -> serde_json::Value {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Sid": "PublicReadGetObject",
                "Effect": "Allow",
                "Principal": "*",
                "Action": "s3:GetObject",
                "Resource": format!("arn:aws:s3:::{}/*", bucket),
            }
        ],
    })
}

/// Open the bucket to the public and serve it as a website
///
/// Every call overwrites the full configuration, so there is nothing to
/// check first. The error document is the index so client-side routes
/// resolve.
pub async fn configure_website(
    ctx: &StepContext<'_>,
    state: &mut DeployState,
    target: &BucketTarget,
) -> Result<StepOutcome> {
    require_bucket(state, "website hosting", target)?;
    let bucket = target.name.as_str();

    tracing::info!("Configuring static website hosting on {}", bucket);
    let storage = &ctx.clients.storage;
    storage
        .put_public_access_block(bucket, PublicAccessBlock::open())
        .await?;
    storage
        .put_bucket_policy(bucket, &public_read_policy(bucket))
        .await?;
    storage
        .put_website(bucket, INDEX_DOCUMENT, INDEX_DOCUMENT)
        .await?;

    state.s3_website_url = Some(website_url(bucket, &target.region));
    ctx.store.commit(state).await?;

    Ok(StepOutcome::updated(ResourceKind::Bucket, bucket))
}
