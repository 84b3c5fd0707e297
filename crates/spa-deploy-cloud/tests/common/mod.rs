use async_trait::async_trait;
use spa_deploy_cloud::{
    CertificateAuthority, CertificateDetail, CertificateStatus, Clients, CloudError,
    ContentDelivery, DistributionInfo, DistributionSpec, DistributionStatus, DnsZones,
    ObjectStorage, PublicAccessBlock, RecordAction, RecordSet, Result, StateStore, UploadObject,
    ValidationRecord,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    pub fn store(&self) -> StateStore {
        StateStore::new(self.root.path())
    }

    /// A small build output: `dist/index.html` and one hashed asset
    #[allow(dead_code)]
    pub fn write_output(&self) -> PathBuf {
        let dist = self.root.path().join("dist");
        fs::create_dir_all(dist.join("assets")).unwrap();
        fs::write(dist.join("index.html"), "<!doctype html><div id=app></div>").unwrap();
        fs::write(dist.join("assets/index-4f1c.js"), "console.log('app')").unwrap();
        dist
    }

    #[allow(dead_code)]
    pub fn state_json(&self) -> serde_json::Value {
        let raw = fs::read_to_string(self.store().state_path()).unwrap();
        serde_json::from_str(&raw).unwrap()
    }
}

#[derive(Debug, Clone)]
pub struct FakeDistribution {
    pub spec: DistributionSpec,
    pub enabled: bool,
    /// Status checks left before a pending change reports deployed
    pub pending_checks: u32,
    pub etag: u32,
}

#[derive(Default)]
pub struct Inner {
    /// Every mutating call, as "<operation> <target>"
    pub calls: Vec<String>,
    pub buckets: BTreeSet<String>,
    pub objects: BTreeMap<String, UploadObject>,
    pub policies: HashMap<String, serde_json::Value>,
    pub access_blocks: HashMap<String, PublicAccessBlock>,
    pub websites: BTreeSet<String>,
    pub oacs: BTreeSet<String>,
    pub distributions: BTreeMap<String, FakeDistribution>,
    pub invalidations: Vec<(String, Vec<String>)>,
    pub certificates: BTreeMap<String, CertificateStatus>,
    /// Statuses returned by successive describe calls before falling back
    /// to the stored status
    pub certificate_script: VecDeque<CertificateStatus>,
    /// Zone name (with trailing dot) to `/hostedzone/<id>`
    pub zones: Vec<(String, String)>,
    pub records: BTreeMap<(String, String), RecordSet>,
    /// Operations that fail
    pub failing: BTreeSet<String>,
    /// Checks a distribution stays in progress after a change
    pub deploy_checks: u32,
    next_id: u32,
}

/// In-memory stand-in for S3, CloudFront, ACM and Route53
#[derive(Clone, Default)]
pub struct FakeCloud {
    pub inner: Arc<Mutex<Inner>>,
}

#[allow(dead_code)]
impl FakeCloud {
    pub fn new() -> Self {
        let cloud = Self::default();
        cloud.inner.lock().unwrap().deploy_checks = 2;
        cloud
    }

    pub fn with_zone(self, name: &str, id: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .zones
            .push((format!("{}.", name), format!("/hostedzone/{}", id)));
        self
    }

    pub fn with_bucket(self, bucket: &str) -> Self {
        self.inner.lock().unwrap().buckets.insert(bucket.to_string());
        self
    }

    pub fn failing(self, operation: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .failing
            .insert(operation.to_string());
        self
    }

    pub fn script_certificate(&self, statuses: &[CertificateStatus]) {
        self.inner
            .lock()
            .unwrap()
            .certificate_script
            .extend(statuses.iter().copied());
    }

    pub fn clients(&self) -> Clients {
        Clients {
            storage: Arc::new(self.clone()),
            cdn: Arc::new(self.clone()),
            certificates: Arc::new(self.clone()),
            dns: Arc::new(self.clone()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Calls whose operation name is `operation`
    pub fn calls_to(&self, operation: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.split(' ').next() == Some(operation))
            .collect()
    }

    fn record(&self, operation: &str, target: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("{} {}", operation, target));
        if inner.failing.contains(operation) {
            return Err(CloudError::api(target, format!("{} failed", operation)));
        }
        Ok(())
    }

    fn next_id(&self) -> u32 {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        inner.next_id
    }
}

pub fn validation_record() -> ValidationRecord {
    ValidationRecord {
        name: "_3639ac514e785e898d2646601fa951d5.app.example.com.".to_string(),
        record_type: "CNAME".to_string(),
        value: "_98d2646601fa951d5.acm-validations.aws.".to_string(),
    }
}

#[async_trait]
impl ObjectStorage for FakeCloud {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.inner.lock().unwrap().buckets.contains(bucket))
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()> {
        self.record("create_bucket", &format!("{}@{}", bucket, region))?;
        self.inner.lock().unwrap().buckets.insert(bucket.to_string());
        Ok(())
    }

    async fn put_public_access_block(&self, bucket: &str, block: PublicAccessBlock) -> Result<()> {
        self.record("put_public_access_block", bucket)?;
        self.inner
            .lock()
            .unwrap()
            .access_blocks
            .insert(bucket.to_string(), block);
        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &serde_json::Value) -> Result<()> {
        self.record("put_bucket_policy", bucket)?;
        self.inner
            .lock()
            .unwrap()
            .policies
            .insert(bucket.to_string(), policy.clone());
        Ok(())
    }

    async fn put_website(&self, bucket: &str, _index: &str, _error: &str) -> Result<()> {
        self.record("put_website", bucket)?;
        self.inner.lock().unwrap().websites.insert(bucket.to_string());
        Ok(())
    }

    async fn delete_website(&self, bucket: &str) -> Result<()> {
        self.record("delete_website", bucket)?;
        self.inner.lock().unwrap().websites.remove(bucket);
        Ok(())
    }

    async fn put_object(&self, bucket: &str, object: &UploadObject) -> Result<()> {
        self.record("put_object", &format!("{}/{}", bucket, object.key))?;
        self.inner
            .lock()
            .unwrap()
            .objects
            .insert(object.key.clone(), object.clone());
        Ok(())
    }

    async fn empty_bucket(&self, bucket: &str) -> Result<()> {
        self.record("empty_bucket", bucket)?;
        self.inner.lock().unwrap().objects.clear();
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.record("delete_bucket", bucket)?;
        self.inner.lock().unwrap().buckets.remove(bucket);
        Ok(())
    }
}

#[async_trait]
impl ContentDelivery for FakeCloud {
    async fn create_origin_access_control(&self, name: &str) -> Result<String> {
        self.record("create_origin_access_control", name)?;
        let id = format!("OAC{}", self.next_id());
        self.inner.lock().unwrap().oacs.insert(id.clone());
        Ok(id)
    }

    async fn delete_origin_access_control(&self, id: &str) -> Result<()> {
        self.record("delete_origin_access_control", id)?;
        self.inner.lock().unwrap().oacs.remove(id);
        Ok(())
    }

    async fn create_distribution(&self, spec: &DistributionSpec) -> Result<DistributionInfo> {
        self.record("create_distribution", &spec.origin_domain)?;
        let n = self.next_id();
        let id = format!("E{}", n);
        self.inner.lock().unwrap().distributions.insert(
            id.clone(),
            FakeDistribution {
                spec: spec.clone(),
                enabled: true,
                pending_checks: 0,
                etag: 1,
            },
        );
        Ok(DistributionInfo {
            arn: format!("arn:aws:cloudfront::123456789012:distribution/{}", id),
            domain_name: format!("d{}.cloudfront.net", n),
            id,
        })
    }

    async fn get_distribution(&self, id: &str) -> Result<DistributionStatus> {
        let mut inner = self.inner.lock().unwrap();
        let dist = inner
            .distributions
            .get_mut(id)
            .ok_or_else(|| CloudError::api(id, "NoSuchDistribution"))?;
        let deployed = dist.pending_checks == 0;
        dist.pending_checks = dist.pending_checks.saturating_sub(1);
        Ok(DistributionStatus {
            enabled: dist.enabled,
            deployed,
            etag: format!("ETAG{}", dist.etag),
        })
    }

    async fn disable_distribution(&self, id: &str, etag: &str) -> Result<String> {
        self.record("disable_distribution", id)?;
        let mut inner = self.inner.lock().unwrap();
        let checks = inner.deploy_checks;
        let dist = inner
            .distributions
            .get_mut(id)
            .ok_or_else(|| CloudError::api(id, "NoSuchDistribution"))?;
        if etag != format!("ETAG{}", dist.etag) {
            return Err(CloudError::api(id, "PreconditionFailed"));
        }
        dist.enabled = false;
        dist.pending_checks = checks;
        dist.etag += 1;
        Ok(format!("ETAG{}", dist.etag))
    }

    async fn delete_distribution(&self, id: &str, etag: &str) -> Result<()> {
        self.record("delete_distribution", id)?;
        let mut inner = self.inner.lock().unwrap();
        let dist = inner
            .distributions
            .get(id)
            .ok_or_else(|| CloudError::api(id, "NoSuchDistribution"))?;
        if dist.enabled || dist.pending_checks > 0 {
            return Err(CloudError::api(id, "DistributionNotDisabled"));
        }
        if etag != format!("ETAG{}", dist.etag) {
            return Err(CloudError::api(id, "PreconditionFailed"));
        }
        inner.distributions.remove(id);
        Ok(())
    }

    async fn create_invalidation(&self, id: &str, paths: &[String]) -> Result<String> {
        self.record("create_invalidation", id)?;
        let mut inner = self.inner.lock().unwrap();
        inner.invalidations.push((id.to_string(), paths.to_vec()));
        Ok(format!("I{}", inner.invalidations.len()))
    }
}

#[async_trait]
impl CertificateAuthority for FakeCloud {
    async fn request_certificate(&self, domain: &str) -> Result<String> {
        self.record("request_certificate", domain)?;
        let arn = format!(
            "arn:aws:acm:us-east-1:123456789012:certificate/cert-{}",
            self.next_id()
        );
        self.inner
            .lock()
            .unwrap()
            .certificates
            .insert(arn.clone(), CertificateStatus::Issued);
        Ok(arn)
    }

    async fn describe_certificate(&self, arn: &str) -> Result<Option<CertificateDetail>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(stored) = inner.certificates.get(arn).copied() else {
            return Ok(None);
        };
        let status = inner.certificate_script.pop_front().unwrap_or(stored);
        Ok(Some(CertificateDetail {
            status,
            validation_record: Some(validation_record()),
            failure_reason: (status == CertificateStatus::Failed)
                .then(|| "CAA_ERROR".to_string()),
        }))
    }

    async fn delete_certificate(&self, arn: &str) -> Result<()> {
        self.record("delete_certificate", arn)?;
        match self.inner.lock().unwrap().certificates.remove(arn) {
            Some(_) => Ok(()),
            None => Err(CloudError::api(arn, "ResourceNotFoundException")),
        }
    }
}

#[async_trait]
impl DnsZones for FakeCloud {
    async fn find_zone(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .zones
            .iter()
            .find(|(zone, _)| zone.trim_end_matches('.') == name)
            .map(|(_, id)| id.clone()))
    }

    async fn change_record(
        &self,
        zone_id: &str,
        action: RecordAction,
        record: &RecordSet,
    ) -> Result<()> {
        let operation = match action {
            RecordAction::Upsert => "upsert_record",
            RecordAction::Delete => "delete_record",
        };
        self.record(operation, record.name())?;

        let key = (zone_id.to_string(), record.name().to_string());
        let mut inner = self.inner.lock().unwrap();
        match action {
            RecordAction::Upsert => {
                inner.records.insert(key, record.clone());
            }
            RecordAction::Delete => {
                if inner.records.get(&key) != Some(record) {
                    return Err(CloudError::api(record.name(), "InvalidChangeBatch"));
                }
                inner.records.remove(&key);
            }
        }
        Ok(())
    }
}

/// Confirmation that answers with a fixed value and remembers every prompt
#[derive(Default)]
pub struct RecordingConfirm {
    pub answer: bool,
    pub prompts: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingConfirm {
    pub fn answering(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl spa_deploy_cloud::Confirm for RecordingConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer
    }
}
