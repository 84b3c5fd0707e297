//! Reverse-order teardown
//!
//! Every recorded resource is deleted in the reverse of the creation
//! chain. A failure is logged and reported, and the next resource is
//! still attempted.

use crate::action::TeardownReport;
use crate::chain::{Chain, ResourceKind};
use crate::error::{CloudError, Result};
use crate::provider::RecordAction;
use crate::state::DeployState;
use crate::steps::alias::alias_record;
use crate::steps::certificate::validation_record_set;
use crate::steps::{StepContext, attribute};
use crate::waiter::Check;

/// Delete everything `state` records, in teardown order
///
/// Never fails; the report lists what was deleted and what was not.
pub async fn teardown(ctx: &StepContext<'_>, state: &DeployState) -> TeardownReport {
    let mut report = TeardownReport::new();

    for kind in Chain::teardown_order().filter(|kind| state.has(*kind)) {
        report.attempted.push(kind);
        tracing::info!("Deleting {}", kind);

        let result = match kind {
            ResourceKind::AliasRecord => delete_alias(ctx, state).await,
            ResourceKind::ValidationRecord => delete_validation_record(ctx, state).await,
            ResourceKind::Distribution => delete_distribution(ctx, state).await,
            ResourceKind::Certificate => delete_certificate(ctx, state).await,
            ResourceKind::Bucket => delete_bucket(ctx, state).await,
        };

        match result {
            Ok(()) => report.add_success(kind),
            Err(e) => report.add_failure(kind, e.to_string()),
        }

        if kind == ResourceKind::Distribution {
            teardown_origin_access_control(ctx, state, &mut report).await;
        }
    }

    report
}

async fn delete_alias(ctx: &StepContext<'_>, state: &DeployState) -> Result<()> {
    let kind = ResourceKind::AliasRecord;
    let domain = attribute(state, kind, &state.domain, "domain")?;
    let zone_id = attribute(state, kind, &state.route53_zone_id, "route53_zone_id")?;
    let target = state.cloudfront_domain.as_deref().ok_or_else(|| {
        CloudError::StateError(format!("{} is recorded but cloudfront_domain is missing", kind))
    })?;

    ctx.clients
        .dns
        .change_record(zone_id, RecordAction::Delete, &alias_record(domain, target))
        .await
}

async fn delete_validation_record(ctx: &StepContext<'_>, state: &DeployState) -> Result<()> {
    let kind = ResourceKind::ValidationRecord;
    let arn = attribute(state, kind, &state.acm_certificate_arn, "acm_certificate_arn")?;
    let zone_id = attribute(state, kind, &state.route53_zone_id, "route53_zone_id")?;

    let record = ctx
        .clients
        .certificates
        .describe_certificate(arn)
        .await?
        .and_then(|detail| detail.validation_record);

    match record {
        Some(record) => {
            ctx.clients
                .dns
                .change_record(zone_id, RecordAction::Delete, &validation_record_set(&record))
                .await
        }
        None => {
            tracing::info!("Validation challenge for {} is gone, nothing to delete", arn);
            Ok(())
        }
    }
}

async fn delete_distribution(ctx: &StepContext<'_>, state: &DeployState) -> Result<()> {
    let id = attribute(
        state,
        ResourceKind::Distribution,
        &state.cloudfront_distribution_id,
        "cloudfront_distribution_id",
    )?;
    let cdn = &ctx.clients.cdn;

    let status = cdn.get_distribution(id).await?;
    let mut etag = status.etag;
    let mut must_wait = !status.deployed;

    if status.enabled {
        tracing::info!("Disabling distribution {}", id);
        etag = cdn.disable_distribution(id, &etag).await?;
        must_wait = true;
    }

    if must_wait {
        tracing::info!("Waiting for distribution {} to finish deploying...", id);
        etag = ctx
            .waiter
            .wait(
                "distribution deployment",
                &ctx.timings.distribution_deployed,
                move || async move {
                    let status = cdn.get_distribution(id).await?;
                    Ok(if status.deployed {
                        Check::Ready(status.etag)
                    } else {
                        Check::Pending("InProgress".to_string())
                    })
                },
            )
            .await?;
    }

    cdn.delete_distribution(id, &etag).await
}

/// The access control can only go once its distribution is gone
async fn teardown_origin_access_control(
    ctx: &StepContext<'_>,
    state: &DeployState,
    report: &mut TeardownReport,
) {
    let kind = ResourceKind::Distribution;
    let Some(oac_id) = state.trusted(kind, &state.cloudfront_oac_id) else {
        return;
    };

    if !report.deleted.contains(&kind) {
        report.add_failure(
            kind,
            format!(
                "origin access control {} left in place because its distribution was not deleted",
                oac_id
            ),
        );
        return;
    }

    tracing::info!("Deleting origin access control {}", oac_id);
    if let Err(e) = ctx.clients.cdn.delete_origin_access_control(oac_id).await {
        report.add_failure(kind, format!("origin access control {}: {}", oac_id, e));
    }
}

async fn delete_certificate(ctx: &StepContext<'_>, state: &DeployState) -> Result<()> {
    let arn = attribute(
        state,
        ResourceKind::Certificate,
        &state.acm_certificate_arn,
        "acm_certificate_arn",
    )?;
    ctx.clients.certificates.delete_certificate(arn).await
}

async fn delete_bucket(ctx: &StepContext<'_>, state: &DeployState) -> Result<()> {
    let bucket = attribute(state, ResourceKind::Bucket, &state.bucket_name, "bucket_name")?;
    ctx.clients.storage.empty_bucket(bucket).await?;
    ctx.clients.storage.delete_bucket(bucket).await
}
