//! CloudFront distributions, origin access controls and invalidations

use crate::error::{api_error, missing};
use async_trait::async_trait;
use aws_sdk_cloudfront::Client;
use aws_sdk_cloudfront::error::BuildError;
use aws_sdk_cloudfront::types::{
    Aliases, AllowedMethods, CachedMethods, CustomErrorResponse, CustomErrorResponses,
    DefaultCacheBehavior, DistributionConfig, InvalidationBatch, Method, MinimumProtocolVersion,
    Origin, OriginAccessControlConfig, OriginAccessControlOriginTypes,
    OriginAccessControlSigningBehaviors, OriginAccessControlSigningProtocols, Origins, Paths,
    S3OriginConfig, SslSupportMethod, ViewerCertificate, ViewerProtocolPolicy,
};
use spa_deploy_cloud::{
    ContentDelivery, DistributionInfo, DistributionSpec, DistributionStatus, Result,
};

const RESOURCE: &str = "CloudFront distribution";
const ORIGIN_ID: &str = "s3origin";
const DEPLOYED: &str = "Deployed";
const TLS_POLICY: &str = "TLSv1.2_2021";

/// Status CloudFront answers with when the bucket hides a missing key
const FORBIDDEN: i32 = 403;

pub struct CloudFrontCdn {
    client: Client,
}

impl CloudFrontCdn {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn config_with_etag(&self, id: &str) -> Result<(DistributionConfig, String)> {
        let out = self
            .client
            .get_distribution_config()
            .id(id)
            .send()
            .await
            .map_err(|e| api_error(id, e))?;
        let config = out
            .distribution_config()
            .cloned()
            .ok_or_else(|| missing(id, "a distribution config"))?;
        let etag = out
            .e_tag()
            .map(str::to_string)
            .ok_or_else(|| missing(id, "an ETag"))?;
        Ok((config, etag))
    }
}

/// Full distribution configuration for a new SPA distribution
pub fn distribution_config(
    spec: &DistributionSpec,
) -> std::result::Result<DistributionConfig, BuildError> {
    let origin = Origin::builder()
        .id(ORIGIN_ID)
        .domain_name(&spec.origin_domain)
        .origin_access_control_id(&spec.origin_access_control_id)
        // An empty identity is required when an origin access control is used
        .s3_origin_config(S3OriginConfig::builder().origin_access_identity("").build())
        .build()?;

    let allowed_methods = AllowedMethods::builder()
        .quantity(2)
        .items(Method::Get)
        .items(Method::Head)
        .cached_methods(
            CachedMethods::builder()
                .quantity(2)
                .items(Method::Get)
                .items(Method::Head)
                .build()?,
        )
        .build()?;

    let cache_behavior = DefaultCacheBehavior::builder()
        .target_origin_id(ORIGIN_ID)
        .viewer_protocol_policy(ViewerProtocolPolicy::RedirectToHttps)
        .allowed_methods(allowed_methods)
        .cache_policy_id(&spec.cache_policy_id)
        .compress(true)
        .build()?;

    // Deep links into client-side routes resolve to the app shell
    let spa_fallback = CustomErrorResponses::builder()
        .quantity(1)
        .items(
            CustomErrorResponse::builder()
                .error_code(FORBIDDEN)
                .response_page_path(format!("/{}", spec.default_root_object))
                .response_code("200")
                .error_caching_min_ttl(10)
                .build()?,
        )
        .build()?;

    let (aliases, certificate) = match &spec.alias {
        Some(alias) => (
            Some(
                Aliases::builder()
                    .quantity(1)
                    .items(&alias.domain)
                    .build()?,
            ),
            ViewerCertificate::builder()
                .acm_certificate_arn(&alias.certificate_arn)
                .ssl_support_method(SslSupportMethod::SniOnly)
                .minimum_protocol_version(MinimumProtocolVersion::from(TLS_POLICY))
                .build(),
        ),
        None => (
            None,
            ViewerCertificate::builder()
                .cloud_front_default_certificate(true)
                .build(),
        ),
    };

    DistributionConfig::builder()
        .caller_reference(&spec.caller_reference)
        .comment(&spec.comment)
        .enabled(true)
        .origins(Origins::builder().quantity(1).items(origin).build()?)
        .default_cache_behavior(cache_behavior)
        .default_root_object(&spec.default_root_object)
        .custom_error_responses(spa_fallback)
        .set_aliases(aliases)
        .viewer_certificate(certificate)
        .build()
}

#[async_trait]
impl ContentDelivery for CloudFrontCdn {
    async fn create_origin_access_control(&self, name: &str) -> Result<String> {
        let config = OriginAccessControlConfig::builder()
            .name(name)
            .description(format!("Origin access control for {}", name))
            .origin_access_control_origin_type(OriginAccessControlOriginTypes::S3)
            .signing_behavior(OriginAccessControlSigningBehaviors::Always)
            .signing_protocol(OriginAccessControlSigningProtocols::Sigv4)
            .build()
            .map_err(|e| api_error(name, e))?;

        let out = self
            .client
            .create_origin_access_control()
            .origin_access_control_config(config)
            .send()
            .await
            .map_err(|e| api_error(name, e))?;

        out.origin_access_control()
            .map(|oac| oac.id().to_string())
            .ok_or_else(|| missing(name, "an origin access control id"))
    }

    async fn delete_origin_access_control(&self, id: &str) -> Result<()> {
        let out = self
            .client
            .get_origin_access_control()
            .id(id)
            .send()
            .await
            .map_err(|e| api_error(id, e))?;
        self.client
            .delete_origin_access_control()
            .id(id)
            .set_if_match(out.e_tag().map(str::to_string))
            .send()
            .await
            .map_err(|e| api_error(id, e))?;
        Ok(())
    }

    async fn create_distribution(&self, spec: &DistributionSpec) -> Result<DistributionInfo> {
        let config = distribution_config(spec).map_err(|e| api_error(RESOURCE, e))?;
        let out = self
            .client
            .create_distribution()
            .distribution_config(config)
            .send()
            .await
            .map_err(|e| api_error(RESOURCE, e))?;

        let distribution = out
            .distribution()
            .ok_or_else(|| missing(RESOURCE, "a distribution"))?;
        Ok(DistributionInfo {
            id: distribution.id().to_string(),
            arn: distribution.arn().to_string(),
            domain_name: distribution.domain_name().to_string(),
        })
    }

    async fn get_distribution(&self, id: &str) -> Result<DistributionStatus> {
        let out = self
            .client
            .get_distribution()
            .id(id)
            .send()
            .await
            .map_err(|e| api_error(id, e))?;
        let distribution = out
            .distribution()
            .ok_or_else(|| missing(id, "a distribution"))?;
        let enabled = distribution
            .distribution_config()
            .map(|config| config.enabled())
            .ok_or_else(|| missing(id, "a distribution config"))?;

        Ok(DistributionStatus {
            enabled,
            deployed: distribution.status() == DEPLOYED,
            etag: out
                .e_tag()
                .map(str::to_string)
                .ok_or_else(|| missing(id, "an ETag"))?,
        })
    }

    async fn disable_distribution(&self, id: &str, etag: &str) -> Result<String> {
        let (mut config, current) = self.config_with_etag(id).await?;
        if current != etag {
            tracing::debug!("Distribution {} changed since it was read, using latest", id);
        }
        config.enabled = false;

        let out = self
            .client
            .update_distribution()
            .id(id)
            .if_match(current)
            .distribution_config(config)
            .send()
            .await
            .map_err(|e| api_error(id, e))?;
        out.e_tag()
            .map(str::to_string)
            .ok_or_else(|| missing(id, "an ETag"))
    }

    async fn delete_distribution(&self, id: &str, etag: &str) -> Result<()> {
        self.client
            .delete_distribution()
            .id(id)
            .if_match(etag)
            .send()
            .await
            .map_err(|e| api_error(id, e))?;
        Ok(())
    }

    async fn create_invalidation(&self, id: &str, paths: &[String]) -> Result<String> {
        let batch = Paths::builder()
            .quantity(paths.len() as i32)
            .set_items(Some(paths.to_vec()))
            .build()
            .and_then(|paths| {
                InvalidationBatch::builder()
                    .paths(paths)
                    .caller_reference(uuid::Uuid::new_v4().to_string())
                    .build()
            })
            .map_err(|e| api_error(id, e))?;

        let out = self
            .client
            .create_invalidation()
            .distribution_id(id)
            .invalidation_batch(batch)
            .send()
            .await
            .map_err(|e| api_error(id, e))?;
        out.invalidation()
            .map(|invalidation| invalidation.id().to_string())
            .ok_or_else(|| missing(id, "an invalidation id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spa_deploy_cloud::DistributionAlias;

    fn spec(alias: Option<DistributionAlias>) -> DistributionSpec {
        DistributionSpec {
            caller_reference: "ref-1".to_string(),
            comment: "SPA deploy: my-app".to_string(),
            origin_domain: "my-app.s3.us-east-1.amazonaws.com".to_string(),
            origin_access_control_id: "OAC1".to_string(),
            default_root_object: "index.html".to_string(),
            cache_policy_id: "658327ea-f89d-4fab-a63d-7e88639e58f6".to_string(),
            alias,
        }
    }

    #[test]
    fn test_default_certificate_without_alias() {
        let config = distribution_config(&spec(None)).unwrap();
        assert!(config.aliases().is_none());
        let certificate = config.viewer_certificate().unwrap();
        assert_eq!(certificate.cloud_front_default_certificate(), Some(true));
        assert!(config.enabled());
    }

    #[test]
    fn test_alias_uses_acm_certificate() {
        let config = distribution_config(&spec(Some(DistributionAlias {
            domain: "app.example.com".to_string(),
            certificate_arn: "arn:aws:acm:us-east-1:123456789012:certificate/abc".to_string(),
        })))
        .unwrap();

        assert_eq!(
            config.aliases().unwrap().items(),
            &["app.example.com".to_string()]
        );
        let certificate = config.viewer_certificate().unwrap();
        assert_eq!(
            certificate.acm_certificate_arn(),
            Some("arn:aws:acm:us-east-1:123456789012:certificate/abc")
        );
        assert_eq!(certificate.ssl_support_method(), Some(&SslSupportMethod::SniOnly));
    }

    #[test]
    fn test_forbidden_rewrites_to_index() {
        let config = distribution_config(&spec(None)).unwrap();
        let responses = config.custom_error_responses().unwrap();
        let fallback = &responses.items()[0];
        assert_eq!(fallback.error_code(), FORBIDDEN);
        assert_eq!(fallback.response_page_path(), Some("/index.html"));
        assert_eq!(fallback.response_code(), Some("200"));
    }
}
