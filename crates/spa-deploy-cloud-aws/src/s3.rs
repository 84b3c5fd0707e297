//! S3 bucket and object operations

use crate::error::api_error;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, Delete, ErrorDocument, IndexDocument,
    ObjectIdentifier, PublicAccessBlockConfiguration, WebsiteConfiguration,
};
use spa_deploy_cloud::{ObjectStorage, PublicAccessBlock, Result, UploadObject};

/// Region where buckets are created without a location constraint
const DEFAULT_REGION: &str = "us-east-1";

/// DeleteObjects accepts at most this many keys per request
const DELETE_BATCH: usize = 1000;

pub struct S3Storage {
    client: Client,
}

impl S3Storage {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn delete_batch(&self, bucket: &str, ids: Vec<ObjectIdentifier>) -> Result<()> {
        for chunk in ids.chunks(DELETE_BATCH) {
            let delete = Delete::builder()
                .set_objects(Some(chunk.to_vec()))
                .quiet(true)
                .build()
                .map_err(|e| api_error(bucket, e))?;
            self.client
                .delete_objects()
                .bucket(bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| api_error(bucket, e))?;
        }
        Ok(())
    }

    async fn delete_all_versions(&self, bucket: &str) -> Result<usize> {
        let mut deleted = 0;
        let mut key_marker: Option<String> = None;
        let mut version_marker: Option<String> = None;

        loop {
            let page = self
                .client
                .list_object_versions()
                .bucket(bucket)
                .set_key_marker(key_marker.take())
                .set_version_id_marker(version_marker.take())
                .send()
                .await
                .map_err(|e| api_error(bucket, e))?;

            let mut ids = Vec::new();
            let versions = page
                .versions()
                .iter()
                .map(|v| (v.key(), v.version_id()));
            let markers = page
                .delete_markers()
                .iter()
                .map(|m| (m.key(), m.version_id()));
            for (key, version_id) in versions.chain(markers) {
                let Some(key) = key else { continue };
                let id = ObjectIdentifier::builder()
                    .key(key)
                    .set_version_id(version_id.map(str::to_string))
                    .build()
                    .map_err(|e| api_error(bucket, e))?;
                ids.push(id);
            }

            deleted += ids.len();
            self.delete_batch(bucket, ids).await?;

            if !page.is_truncated().unwrap_or(false) {
                break;
            }
            key_marker = page.next_key_marker().map(str::to_string);
            version_marker = page.next_version_id_marker().map(str::to_string);
            if key_marker.is_none() && version_marker.is_none() {
                break;
            }
        }

        Ok(deleted)
    }

    async fn delete_current_objects(&self, bucket: &str) -> Result<usize> {
        let mut deleted = 0;
        let mut token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(|e| api_error(bucket, e))?;

            let mut ids = Vec::new();
            for key in page.contents().iter().filter_map(|o| o.key()) {
                ids.push(
                    ObjectIdentifier::builder()
                        .key(key)
                        .build()
                        .map_err(|e| api_error(bucket, e))?,
                );
            }

            deleted += ids.len();
            self.delete_batch(bucket, ids).await?;

            token = page.next_continuation_token().map(str::to_string);
            if !page.is_truncated().unwrap_or(false) || token.is_none() {
                break;
            }
        }

        Ok(deleted)
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(api_error(bucket, e)),
        }
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }
        request.send().await.map_err(|e| api_error(bucket, e))?;
        tracing::debug!("Created bucket {} in {}", bucket, region);
        Ok(())
    }

    async fn put_public_access_block(&self, bucket: &str, block: PublicAccessBlock) -> Result<()> {
        let config = PublicAccessBlockConfiguration::builder()
            .block_public_acls(block.block_public_acls)
            .ignore_public_acls(block.ignore_public_acls)
            .block_public_policy(block.block_public_policy)
            .restrict_public_buckets(block.restrict_public_buckets)
            .build();
        self.client
            .put_public_access_block()
            .bucket(bucket)
            .public_access_block_configuration(config)
            .send()
            .await
            .map_err(|e| api_error(bucket, e))?;
        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &serde_json::Value) -> Result<()> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy.to_string())
            .send()
            .await
            .map_err(|e| api_error(bucket, e))?;
        Ok(())
    }

    async fn put_website(
        &self,
        bucket: &str,
        index_document: &str,
        error_document: &str,
    ) -> Result<()> {
        let website = WebsiteConfiguration::builder()
            .index_document(
                IndexDocument::builder()
                    .suffix(index_document)
                    .build()
                    .map_err(|e| api_error(bucket, e))?,
            )
            .error_document(
                ErrorDocument::builder()
                    .key(error_document)
                    .build()
                    .map_err(|e| api_error(bucket, e))?,
            )
            .build();
        self.client
            .put_bucket_website()
            .bucket(bucket)
            .website_configuration(website)
            .send()
            .await
            .map_err(|e| api_error(bucket, e))?;
        Ok(())
    }

    async fn delete_website(&self, bucket: &str) -> Result<()> {
        self.client
            .delete_bucket_website()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| api_error(bucket, e))?;
        Ok(())
    }

    async fn put_object(&self, bucket: &str, object: &UploadObject) -> Result<()> {
        let body = ByteStream::from_path(&object.path)
            .await
            .map_err(|e| api_error(object.path.display().to_string(), e))?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(&object.key)
            .body(body)
            .content_type(&object.content_type)
            .set_cache_control(object.cache_control.clone())
            .send()
            .await
            .map_err(|e| api_error(format!("s3://{}/{}", bucket, object.key), e))?;
        Ok(())
    }

    async fn empty_bucket(&self, bucket: &str) -> Result<()> {
        let versions = self.delete_all_versions(bucket).await?;
        let objects = self.delete_current_objects(bucket).await?;
        tracing::debug!(
            "Emptied {}: {} versions, {} objects",
            bucket,
            versions,
            objects
        );
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| api_error(bucket, e))?;
        Ok(())
    }
}
