//! Custom domain alias step

use super::{StepContext, attribute, require};
use crate::action::StepOutcome;
use crate::chain::ResourceKind;
use crate::error::Result;
use crate::provider::{RecordAction, RecordSet};
use crate::state::DeployState;

/// Hosted zone id CloudFront uses for every alias target
pub const CLOUDFRONT_ZONE_ID: &str = "Z2FDTNDATAQYW2";

/// Alias record from `domain` to a distribution domain
///
/// Creation and teardown build the record through here so both send the
/// same name, type and target.
pub fn alias_record(domain: &str, distribution_domain: &str) -> RecordSet {
    RecordSet::Alias {
        name: domain.to_string(),
        target_zone_id: CLOUDFRONT_ZONE_ID.to_string(),
        target_dns_name: distribution_domain.to_string(),
    }
}

/// Point `domain` at the recorded distribution
///
/// The record is upserted, so running this again is harmless.
pub async fn ensure_alias(
    ctx: &StepContext<'_>,
    state: &mut DeployState,
    domain: &str,
    zone_id: &str,
) -> Result<StepOutcome> {
    require(state, "Route53 alias", ResourceKind::Distribution)?;
    let target = attribute(
        state,
        ResourceKind::Distribution,
        &state.cloudfront_domain,
        "cloudfront_domain",
    )?
    .to_string();

    tracing::info!("Pointing {} at {}", domain, target);
    ctx.clients
        .dns
        .change_record(zone_id, RecordAction::Upsert, &alias_record(domain, &target))
        .await?;

    let created = state.mark_created(ResourceKind::AliasRecord);
    state.domain = Some(domain.to_string());
    state.route53_zone_id = Some(zone_id.to_string());
    ctx.store.commit(state).await?;

    Ok(if created {
        StepOutcome::created(ResourceKind::AliasRecord, domain)
    } else {
        StepOutcome::updated(ResourceKind::AliasRecord, domain)
    })
}
