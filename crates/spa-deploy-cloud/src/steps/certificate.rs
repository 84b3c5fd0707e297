//! DNS-validated TLS certificate step
//!
//! The certificate is recorded as soon as it is requested, so an
//! interrupted run resumes waiting on the same certificate instead of
//! leaving an untracked one behind.

use super::StepContext;
use crate::action::{StepAction, StepOutcome};
use crate::chain::ResourceKind;
use crate::error::{CloudError, Result};
use crate::provider::{CertificateStatus, RecordAction, RecordSet, ValidationRecord};
use crate::state::DeployState;
use crate::waiter::Check;

/// TTL of the validation record
pub const VALIDATION_TTL: i64 = 300;

/// Record set answering a DNS challenge
pub fn validation_record_set(record: &ValidationRecord) -> RecordSet {
    RecordSet::Simple {
        name: record.name.clone(),
        record_type: record.record_type.clone(),
        ttl: VALIDATION_TTL,
        value: record.value.clone(),
    }
}

/// Make sure an issued certificate for `domain` is recorded
///
/// `zone_id` is the hosted zone that receives the validation record.
pub async fn ensure_certificate(
    ctx: &StepContext<'_>,
    state: &mut DeployState,
    domain: &str,
    zone_id: &str,
) -> Result<StepOutcome> {
    let certificates = &ctx.clients.certificates;

    let (arn, action) = match state
        .trusted(ResourceKind::Certificate, &state.acm_certificate_arn)
        .map(str::to_string)
    {
        Some(arn) => match certificates.describe_certificate(&arn).await? {
            Some(detail) if detail.status == CertificateStatus::Issued => {
                tracing::info!("Certificate already issued: {}", arn);
                return Ok(StepOutcome::reused(ResourceKind::Certificate, arn));
            }
            Some(detail) if detail.status == CertificateStatus::PendingValidation => {
                tracing::info!("Resuming validation of certificate {}", arn);
                (arn, StepAction::Reused)
            }
            Some(detail) => {
                tracing::warn!(
                    "Certificate {} is {}, replacing it with a new request",
                    arn,
                    detail.status
                );
                if let Some(record) = &detail.validation_record {
                    remove_stale_challenge(ctx, state, zone_id, record).await;
                }
                if let Err(e) = certificates.delete_certificate(&arn).await {
                    tracing::warn!("Could not delete certificate {}: {}", arn, e);
                }
                (request_certificate(ctx, state, domain).await?, StepAction::Created)
            }
            None => {
                tracing::info!("Tracked certificate {} no longer exists", arn);
                (request_certificate(ctx, state, domain).await?, StepAction::Created)
            }
        },
        None => (request_certificate(ctx, state, domain).await?, StepAction::Created),
    };

    let arn_ref = arn.as_str();
    let record = ctx
        .waiter
        .wait(
            "ACM validation details",
            &ctx.timings.validation_record,
            move || async move {
                let detail = certificates.describe_certificate(arn_ref).await?;
                Ok(match detail.and_then(|d| d.validation_record) {
                    Some(record) => Check::Ready(record),
                    None => Check::Pending("no validation record yet".to_string()),
                })
            },
        )
        .await?;

    tracing::info!(
        "Creating validation record: {} -> {}",
        record.name,
        record.value
    );
    ctx.clients
        .dns
        .change_record(zone_id, RecordAction::Upsert, &validation_record_set(&record))
        .await?;
    state.mark_created(ResourceKind::ValidationRecord);
    state.route53_zone_id = Some(zone_id.to_string());
    ctx.store.commit(state).await?;

    tracing::info!("Waiting for certificate validation (this may take a few minutes)...");
    ctx.waiter
        .wait("certificate issuance", &ctx.timings.issuance, move || async move {
            let detail = certificates
                .describe_certificate(arn_ref)
                .await?
                .ok_or_else(|| {
                    CloudError::api(
                        ResourceKind::Certificate.to_string(),
                        format!("{} disappeared during validation", arn_ref),
                    )
                })?;
            match detail.status {
                CertificateStatus::Issued => Ok(Check::Ready(())),
                CertificateStatus::PendingValidation => {
                    Ok(Check::Pending(detail.status.to_string()))
                }
                other => Err(CloudError::CertificateFailed {
                    arn: arn_ref.to_string(),
                    reason: detail.failure_reason.unwrap_or_else(|| other.to_string()),
                }),
            }
        })
        .await?;

    tracing::info!("Certificate issued: {}", arn);
    Ok(StepOutcome {
        kind: ResourceKind::Certificate,
        id: arn,
        action,
    })
}

/// Best-effort removal of a replaced certificate's DNS challenge
///
/// Only a challenge this tool wrote is touched, in the zone it was written
/// to.
async fn remove_stale_challenge(
    ctx: &StepContext<'_>,
    state: &DeployState,
    zone_id: &str,
    record: &ValidationRecord,
) {
    if !state.has(ResourceKind::ValidationRecord) {
        return;
    }
    let zone_id = state
        .trusted(ResourceKind::ValidationRecord, &state.route53_zone_id)
        .unwrap_or(zone_id);

    tracing::info!("Removing validation record {} of the replaced certificate", record.name);
    if let Err(e) = ctx
        .clients
        .dns
        .change_record(zone_id, RecordAction::Delete, &validation_record_set(record))
        .await
    {
        tracing::warn!("Could not remove validation record {}: {}", record.name, e);
    }
}

async fn request_certificate(
    ctx: &StepContext<'_>,
    state: &mut DeployState,
    domain: &str,
) -> Result<String> {
    tracing::info!("Requesting ACM certificate for {}", domain);
    let arn = ctx.clients.certificates.request_certificate(domain).await?;

    state.mark_created(ResourceKind::Certificate);
    state.acm_certificate_arn = Some(arn.clone());
    ctx.store.commit(state).await?;

    Ok(arn)
}
