//! Deployment state for a single project
//!
//! Manages the `spa_deploy.json` file in the project directory, which
//! records every resource this tool has created along with the
//! identifiers needed to reuse or delete it.

use crate::chain::ResourceKind;
use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_FILE: &str = "spa_deploy.json";
const STATE_BACKUP: &str = "spa_deploy.json.backup";
const STATE_TEMP: &str = "spa_deploy.json.tmp";

fn default_version() -> u32 {
    STATE_VERSION
}

/// Everything known about a project's deployed resources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployState {
    /// State file version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Last modified timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Resource tags, each present at most once
    #[serde(default)]
    pub created_resources: Vec<ResourceKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_website_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acm_certificate_arn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudfront_distribution_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudfront_domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudfront_oac_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route53_zone_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Keys written by other versions of the tool, kept as-is
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for DeployState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: None,
            created_resources: Vec::new(),
            bucket_name: None,
            region: None,
            s3_website_url: None,
            acm_certificate_arn: None,
            cloudfront_distribution_id: None,
            cloudfront_domain: None,
            cloudfront_oac_id: None,
            route53_zone_id: None,
            domain: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl DeployState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a resource of this kind is believed to exist
    pub fn has(&self, kind: ResourceKind) -> bool {
        self.created_resources.contains(&kind)
    }

    /// Record that a resource of this kind now exists
    ///
    /// Returns `false` if the kind was already recorded.
    pub fn mark_created(&mut self, kind: ResourceKind) -> bool {
        if self.has(kind) {
            return false;
        }
        self.created_resources.push(kind);
        self.updated_at = Some(Utc::now());
        true
    }

    pub fn is_empty(&self) -> bool {
        self.created_resources.is_empty()
    }

    /// Attribute for `kind`, only when the kind's tag is present
    pub fn trusted<'a>(&'a self, kind: ResourceKind, value: &'a Option<String>) -> Option<&'a str> {
        if self.has(kind) { value.as_deref() } else { None }
    }

    /// Public URL of the site, preferring the custom domain
    pub fn site_url(&self) -> Option<String> {
        if let Some(domain) = self.trusted(ResourceKind::AliasRecord, &self.domain) {
            return Some(format!("https://{}", domain));
        }
        if let Some(cf) = self.trusted(ResourceKind::Distribution, &self.cloudfront_domain) {
            return Some(format!("https://{}", cf));
        }
        self.s3_website_url.clone()
    }
}

/// Reads and writes the state file of one project directory
pub struct StateStore {
    /// Project root directory
    project_root: PathBuf,
}

impl StateStore {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    /// Get the state file path
    pub fn state_path(&self) -> PathBuf {
        self.project_root.join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.project_root.join(STATE_BACKUP)
    }

    fn temp_path(&self) -> PathBuf {
        self.project_root.join(STATE_TEMP)
    }

    /// Load the current state, or an empty one if nothing was persisted
    pub async fn load(&self) -> Result<DeployState> {
        let path = self.state_path();
        if !fs::try_exists(&path).await? {
            tracing::debug!("State file not found, returning empty state");
            return Ok(DeployState::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: DeployState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!(
            "Loaded state with {} resources",
            state.created_resources.len()
        );
        Ok(state)
    }

    /// Persist the state
    ///
    /// The new content is written to a temporary file and renamed over the
    /// state file, so the file on disk is always a complete state.
    pub async fn save(&self, state: &DeployState) -> Result<()> {
        let path = self.state_path();
        let temp = self.temp_path();

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&temp, content).await?;

        if fs::try_exists(&path).await? {
            fs::copy(&path, self.backup_path()).await?;
        }
        fs::rename(&temp, &path).await?;

        tracing::debug!(
            "Saved state with {} resources to {}",
            state.created_resources.len(),
            path.display()
        );
        Ok(())
    }

    /// Stamp and persist the state after a step has mutated it
    pub async fn commit(&self, state: &mut DeployState) -> Result<()> {
        state.updated_at = Some(Utc::now());
        self.save(state).await
    }

    /// Delete the state file and its backup
    pub async fn remove(&self) -> Result<()> {
        for path in [self.state_path(), self.backup_path()] {
            match fs::remove_file(&path).await {
                Ok(()) => tracing::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
