//! Step outcomes and run reports

use crate::chain::{Chain, ResourceKind};
use crate::state::DeployState;
use serde::{Deserialize, Serialize};

/// What a resource step did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// A new resource was created
    Created,
    /// An existing resource was found and left as-is
    Reused,
    /// An existing resource was reconfigured or refreshed
    Updated,
}

impl std::fmt::Display for StepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepAction::Created => write!(f, "created"),
            StepAction::Reused => write!(f, "reused"),
            StepAction::Updated => write!(f, "updated"),
        }
    }
}

/// Result of one resource step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub kind: ResourceKind,

    /// Primary identifier (bucket name, ARN, distribution id, record name)
    pub id: String,

    pub action: StepAction,
}

impl StepOutcome {
    pub fn created(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            action: StepAction::Created,
        }
    }

    pub fn reused(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            action: StepAction::Reused,
        }
    }

    pub fn updated(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            action: StepAction::Updated,
        }
    }

    pub fn is_created(&self) -> bool {
        self.action == StepAction::Created
    }
}

/// Everything a forward run did
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploySummary {
    pub outcomes: Vec<StepOutcome>,

    /// Number of files uploaded
    pub uploaded: usize,

    /// Invalidation issued against an existing distribution
    pub invalidation_id: Option<String>,

    pub site_url: Option<String>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl DeploySummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: StepOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn count(&self, action: StepAction) -> usize {
        self.outcomes.iter().filter(|o| o.action == action).count()
    }
}

impl std::fmt::Display for DeploySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} reused, {} updated, {} files uploaded",
            self.count(StepAction::Created),
            self.count(StepAction::Reused),
            self.count(StepAction::Updated),
            self.uploaded
        )
    }
}

/// Result of a teardown
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeardownReport {
    /// Kinds in the order their deletion was attempted
    pub attempted: Vec<ResourceKind>,

    /// Successfully deleted resources
    pub deleted: Vec<ResourceKind>,

    /// Failures, reported as warnings
    pub warnings: Vec<TeardownWarning>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownWarning {
    pub kind: ResourceKind,
    pub message: String,
}

impl TeardownReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn add_success(&mut self, kind: ResourceKind) {
        self.deleted.push(kind);
    }

    pub fn add_failure(&mut self, kind: ResourceKind, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("Failed to delete {}: {}", kind, message);
        self.warnings.push(TeardownWarning { kind, message });
    }
}

/// One line of the teardown preview shown before confirmation
pub fn teardown_plan(state: &DeployState) -> Vec<String> {
    Chain::teardown_order()
        .filter(|kind| state.has(*kind))
        .map(|kind| {
            let detail = match kind {
                ResourceKind::AliasRecord => state.domain.clone(),
                ResourceKind::ValidationRecord => None,
                ResourceKind::Distribution => state.cloudfront_distribution_id.clone(),
                ResourceKind::Certificate => state.acm_certificate_arn.clone(),
                ResourceKind::Bucket => state
                    .bucket_name
                    .as_ref()
                    .map(|b| format!("{} (all objects will be deleted)", b)),
            };
            match detail {
                Some(detail) => format!("{}: {}", kind, detail),
                None => kind.to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_display() {
        let mut summary = DeploySummary::new();
        summary.push(StepOutcome::reused(ResourceKind::Bucket, "my-app"));
        summary.push(StepOutcome::updated(ResourceKind::Distribution, "E1"));
        summary.uploaded = 12;
        assert_eq!(
            summary.to_string(),
            "0 created, 1 reused, 1 updated, 12 files uploaded"
        );
    }

    #[test]
    fn test_teardown_plan_follows_reverse_chain() {
        let mut state = DeployState::new();
        state.mark_created(ResourceKind::Bucket);
        state.mark_created(ResourceKind::Distribution);
        state.bucket_name = Some("my-app".to_string());
        state.cloudfront_distribution_id = Some("E1".to_string());

        assert_eq!(
            teardown_plan(&state),
            vec![
                "CloudFront distribution: E1".to_string(),
                "S3 bucket: my-app (all objects will be deleted)".to_string(),
            ]
        );
    }
}
