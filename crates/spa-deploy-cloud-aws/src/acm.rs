//! ACM certificates (always in us-east-1)

use crate::error::{api_error, missing};
use async_trait::async_trait;
use aws_sdk_acm::Client;
use aws_sdk_acm::types::{DomainValidation, ValidationMethod};
use spa_deploy_cloud::{
    CertificateAuthority, CertificateDetail, CertificateStatus, Result, ValidationRecord,
};

pub struct AcmCertificates {
    client: Client,
}

impl AcmCertificates {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// DNS challenge of the first validation option, once ACM has published it
fn challenge(options: &[DomainValidation]) -> Option<ValidationRecord> {
    options
        .iter()
        .find_map(|option| option.resource_record())
        .map(|record| ValidationRecord {
            name: record.name().to_string(),
            record_type: record.r#type().as_str().to_string(),
            value: record.value().to_string(),
        })
}

#[async_trait]
impl CertificateAuthority for AcmCertificates {
    async fn request_certificate(&self, domain: &str) -> Result<String> {
        let out = self
            .client
            .request_certificate()
            .domain_name(domain)
            .validation_method(ValidationMethod::Dns)
            .send()
            .await
            .map_err(|e| api_error(domain, e))?;
        out.certificate_arn()
            .map(str::to_string)
            .ok_or_else(|| missing(domain, "a certificate ARN"))
    }

    async fn describe_certificate(&self, arn: &str) -> Result<Option<CertificateDetail>> {
        let out = match self
            .client
            .describe_certificate()
            .certificate_arn(arn)
            .send()
            .await
        {
            Ok(out) => out,
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception()) =>
            {
                return Ok(None);
            }
            Err(e) => return Err(api_error(arn, e)),
        };

        let Some(certificate) = out.certificate() else {
            return Ok(None);
        };
        Ok(Some(CertificateDetail {
            status: certificate
                .status()
                .map(|s| CertificateStatus::parse(s.as_str()))
                .unwrap_or(CertificateStatus::PendingValidation),
            validation_record: challenge(certificate.domain_validation_options()),
            failure_reason: certificate.failure_reason().map(|r| r.as_str().to_string()),
        }))
    }

    async fn delete_certificate(&self, arn: &str) -> Result<()> {
        self.client
            .delete_certificate()
            .certificate_arn(arn)
            .send()
            .await
            .map_err(|e| api_error(arn, e))?;
        Ok(())
    }
}
