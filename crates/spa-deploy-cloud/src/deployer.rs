//! Forward deploy and teardown drivers
//!
//! [`Deployer`] owns the collaborators of one project and walks the
//! resource chain: bucket, upload, then either website hosting or the
//! certificate, distribution and alias steps.

use crate::action::{DeploySummary, TeardownReport, teardown_plan};
use crate::chain::ResourceKind;
use crate::confirm::{AutoConfirm, Confirm};
use crate::error::{CloudError, Result};
use crate::provider::Clients;
use crate::state::{DeployState, StateStore};
use crate::steps::bucket::BucketTarget;
use crate::steps::{StepContext, Timings, alias, bucket, certificate, distribution, hosting};
use crate::upload::upload_dir;
use crate::waiter::Waiter;
use crate::zone::resolve_hosted_zone;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub const CDN_PROMPT: &str = "Create a CloudFront distribution to front this S3 bucket?";
pub const DESTROY_PROMPT: &str =
    "Are you sure you want to destroy all resources? This cannot be undone.";

/// What a forward run should end up with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub bucket: String,
    pub region: String,
    /// Front the bucket with a distribution
    pub cdn: bool,
    /// Custom domain, only valid together with `cdn`
    pub domain: Option<String>,
    /// Build output to upload; `None` skips the upload
    pub output_dir: Option<PathBuf>,
}

impl DeployRequest {
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            cdn: false,
            domain: None,
            output_dir: None,
        }
    }

    pub fn with_cdn(mut self, cdn: bool) -> Self {
        self.cdn = cdn;
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            return Err(CloudError::InvalidConfig("bucket name is required".to_string()));
        }
        if self.region.trim().is_empty() {
            return Err(CloudError::InvalidConfig("region is required".to_string()));
        }
        if self.domain.is_some() && !self.cdn {
            return Err(CloudError::InvalidConfig(
                "a custom domain requires the CloudFront distribution".to_string(),
            ));
        }
        if let Some(dir) = &self.output_dir
            && !dir.is_dir()
        {
            return Err(CloudError::OutputDirNotFound(dir.display().to_string()));
        }
        Ok(())
    }
}

/// Runs deploys and teardowns for one project
pub struct Deployer {
    clients: Clients,
    store: StateStore,
    timings: Timings,
    waiter: Waiter,
    confirm: Arc<dyn Confirm>,
}

impl Deployer {
    /// Nothing is confirmed until a [`Confirm`] is supplied
    pub fn new(clients: Clients, store: StateStore) -> Self {
        Self {
            clients,
            store,
            timings: Timings::default(),
            waiter: Waiter::default(),
            confirm: Arc::new(AutoConfirm(false)),
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_waiter(mut self, waiter: Waiter) -> Self {
        self.waiter = waiter;
        self
    }

    pub fn with_confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    fn context(&self) -> StepContext<'_> {
        StepContext {
            clients: &self.clients,
            store: &self.store,
            waiter: &self.waiter,
            timings: &self.timings,
        }
    }

    /// Bring the project's resources in line with `request`
    ///
    /// Aborts on the first fatal error; the state file then reflects every
    /// step that completed.
    pub async fn deploy(&self, request: &DeployRequest) -> Result<DeploySummary> {
        let start = Instant::now();
        request.validate()?;

        let ctx = self.context();
        let mut state = self.store.load().await?;
        let mut summary = DeploySummary::new();

        let (outcome, target) =
            bucket::ensure_bucket(&ctx, &mut state, &request.bucket, &request.region).await?;
        summary.push(outcome);

        if let Some(dir) = &request.output_dir {
            summary.uploaded =
                upload_dir(self.clients.storage.as_ref(), &request.bucket, dir).await?;
        }

        if !request.cdn {
            summary.push(hosting::configure_website(&ctx, &mut state, &target).await?);
        } else if state.has(ResourceKind::Distribution) {
            tracing::info!("CloudFront distribution already exists, refreshing its cache");
            let (outcome, invalidation) = distribution::invalidate_all(&ctx, &state).await?;
            summary.push(outcome);
            summary.invalidation_id = Some(invalidation);
        } else if self.confirm.confirm(CDN_PROMPT) {
            self.provision_cdn(
                &ctx,
                &mut state,
                &target,
                request.domain.as_deref(),
                &mut summary,
            )
            .await?;
        } else {
            tracing::info!("Skipping CloudFront setup");
            summary.push(hosting::configure_website(&ctx, &mut state, &target).await?);
        }

        summary.site_url = state.site_url();
        summary.duration_ms = start.elapsed().as_millis() as u64;
        Ok(summary)
    }

    async fn provision_cdn(
        &self,
        ctx: &StepContext<'_>,
        state: &mut DeployState,
        target: &BucketTarget,
        domain: Option<&str>,
        summary: &mut DeploySummary,
    ) -> Result<()> {
        distribution::check_preconditions(state, target)?;
        let Some(domain) = domain else {
            summary.push(distribution::create_distribution(ctx, state, target, None).await?);
            return Ok(());
        };

        let zone_id = match recorded_zone(state) {
            Some(id) => id.to_string(),
            None => resolve_hosted_zone(self.clients.dns.as_ref(), domain).await?,
        };

        summary.push(certificate::ensure_certificate(ctx, state, domain, &zone_id).await?);
        summary.push(
            distribution::create_distribution(ctx, state, target, Some(domain)).await?,
        );
        summary.push(alias::ensure_alias(ctx, state, domain, &zone_id).await?);
        Ok(())
    }

    /// Delete every recorded resource and forget the project
    ///
    /// Asks for confirmation before touching anything. The state file is
    /// removed even when some deletions failed.
    pub async fn destroy(&self) -> Result<TeardownReport> {
        let start = Instant::now();
        let state = self.store.load().await?;
        if state.is_empty() {
            return Err(CloudError::NothingToDestroy);
        }

        let plan = teardown_plan(&state);
        let prompt = format!(
            "The following resources will be destroyed:\n  - {}\n\n{}",
            plan.join("\n  - "),
            DESTROY_PROMPT
        );
        if !self.confirm.confirm(&prompt) {
            return Err(CloudError::Aborted);
        }

        let mut report = crate::teardown::teardown(&self.context(), &state).await;

        self.store.remove().await?;
        tracing::info!("State file removed");

        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }
}

/// Zone id recorded by an earlier validation or alias step
fn recorded_zone(state: &DeployState) -> Option<&str> {
    [ResourceKind::ValidationRecord, ResourceKind::AliasRecord]
        .into_iter()
        .find_map(|kind| state.trusted(kind, &state.route53_zone_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_requires_cdn() {
        let request = DeployRequest::new("my-app", "us-east-1").with_domain("app.example.com");
        assert!(matches!(request.validate(), Err(CloudError::InvalidConfig(_))));
        assert!(request.with_cdn(true).validate().is_ok());
    }

    #[test]
    fn test_missing_output_dir_is_rejected() {
        let request = DeployRequest::new("my-app", "us-east-1")
            .with_output_dir("/definitely/not/a/real/dir");
        assert!(matches!(
            request.validate(),
            Err(CloudError::OutputDirNotFound(_))
        ));
    }

    #[test]
    fn test_recorded_zone_needs_a_dns_tag() {
        let mut state = DeployState::new();
        state.route53_zone_id = Some("Z1".to_string());
        assert_eq!(recorded_zone(&state), None);

        state.mark_created(ResourceKind::ValidationRecord);
        assert_eq!(recorded_zone(&state), Some("Z1"));
    }
}
