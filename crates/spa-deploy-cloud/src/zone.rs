//! Hosted zone lookup

use crate::error::{CloudError, Result};
use crate::provider::DnsZones;

const HOSTED_ZONE_PREFIX: &str = "/hostedzone/";

/// Zone names to try for `domain`, most specific first
///
/// `app.example.com` yields `app.example.com` then `example.com`. The
/// bare top-level domain is never a candidate.
pub fn candidate_zones(domain: &str) -> Vec<String> {
    let labels: Vec<&str> = domain
        .trim_end_matches('.')
        .split('.')
        .filter(|label| !label.is_empty())
        .collect();

    (0..labels.len().saturating_sub(1))
        .map(|start| labels[start..].join("."))
        .collect()
}

/// Zone id without the `/hostedzone/` prefix
pub fn normalize_zone_id(id: &str) -> &str {
    id.strip_prefix(HOSTED_ZONE_PREFIX).unwrap_or(id)
}

/// Find the hosted zone responsible for `domain`
///
/// Never creates anything; a missing zone must be created by the operator.
pub async fn resolve_hosted_zone(dns: &dyn DnsZones, domain: &str) -> Result<String> {
    for candidate in candidate_zones(domain) {
        tracing::debug!("Looking up hosted zone {}", candidate);
        if let Some(id) = dns.find_zone(&candidate).await? {
            let id = normalize_zone_id(&id).to_string();
            tracing::info!("Using hosted zone {} ({})", candidate, id);
            return Ok(id);
        }
    }
    Err(CloudError::HostedZoneNotFound(domain.to_string()))
}
