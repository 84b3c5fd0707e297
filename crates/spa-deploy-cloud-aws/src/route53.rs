//! Route53 hosted zones and record changes

use crate::error::api_error;
use async_trait::async_trait;
use aws_sdk_route53::Client;
use aws_sdk_route53::error::BuildError;
use aws_sdk_route53::types::{
    AliasTarget, Change, ChangeAction, ChangeBatch, ResourceRecord, ResourceRecordSet, RrType,
};
use spa_deploy_cloud::{DnsZones, RecordAction, RecordSet, Result};

pub struct Route53Zones {
    client: Client,
}

impl Route53Zones {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Route53 form of a record set
pub fn resource_record_set(
    record: &RecordSet,
) -> std::result::Result<ResourceRecordSet, BuildError> {
    match record {
        RecordSet::Simple {
            name,
            record_type,
            ttl,
            value,
        } => ResourceRecordSet::builder()
            .name(name)
            .r#type(RrType::from(record_type.as_str()))
            .ttl(*ttl)
            .resource_records(ResourceRecord::builder().value(value).build()?)
            .build(),
        RecordSet::Alias {
            name,
            target_zone_id,
            target_dns_name,
        } => ResourceRecordSet::builder()
            .name(name)
            .r#type(RrType::A)
            .alias_target(
                AliasTarget::builder()
                    .hosted_zone_id(target_zone_id)
                    .dns_name(target_dns_name)
                    .evaluate_target_health(false)
                    .build()?,
            )
            .build(),
    }
}

#[async_trait]
impl DnsZones for Route53Zones {
    async fn find_zone(&self, name: &str) -> Result<Option<String>> {
        let out = self
            .client
            .list_hosted_zones_by_name()
            .dns_name(name)
            .max_items(1)
            .send()
            .await
            .map_err(|e| api_error(name, e))?;

        // The listing starts at `name` but may return the next zone instead
        Ok(out
            .hosted_zones()
            .iter()
            .find(|zone| zone.name().trim_end_matches('.') == name)
            .map(|zone| zone.id().to_string()))
    }

    async fn change_record(
        &self,
        zone_id: &str,
        action: RecordAction,
        record: &RecordSet,
    ) -> Result<()> {
        let action = match action {
            RecordAction::Upsert => ChangeAction::Upsert,
            RecordAction::Delete => ChangeAction::Delete,
        };
        let batch = resource_record_set(record)
            .and_then(|set| {
                Change::builder()
                    .action(action)
                    .resource_record_set(set)
                    .build()
            })
            .and_then(|change| ChangeBatch::builder().changes(change).build())
            .map_err(|e| api_error(record.name(), e))?;

        self.client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(batch)
            .send()
            .await
            .map_err(|e| api_error(record.name(), e))?;
        tracing::debug!("Changed record {} in zone {}", record.name(), zone_id);
        Ok(())
    }
}
