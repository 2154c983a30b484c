// # Route 53 Zone
//
// This crate provides the AWS Route 53 implementation of the DDNS system's
// zone boundary: `ZoneReader` and `ZoneWriter` on one client.
//
// - ✅ One API call per operation
// - ✅ Exact name + type match on read (Route 53 lists "starting from" a name)
// - ✅ `UPSERT` on write, so repeated writes converge
// - ✅ Operation timeout configured on the SDK client
// - ❌ NO decision about whether to write (owned by Reconciler)
// - ❌ NO retry logic beyond the SDK's transport defaults (owned by Scheduler)
//
// ## Credentials
//
// Resolved by the default AWS chain (environment, profile, instance role).
// Nothing here reads or logs them.
//
// ## API Reference
//
// - ListResourceRecordSets: GET `/2013-04-01/hostedzone/{Id}/rrset?name=...&type=A&maxitems=1`
// - ChangeResourceRecordSets: POST `/2013-04-01/hostedzone/{Id}/rrset/`

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_route53::Client;
use aws_sdk_route53::config::Region;
use aws_sdk_route53::error::DisplayErrorContext;
use aws_sdk_route53::types::{
    Change, ChangeAction, ChangeBatch, ResourceRecord, ResourceRecordSet, RrType,
};
use ddns_core::config::{DdnsConfig, ManagedName};
use ddns_core::traits::{ChangeId, ListedRecord, RecordState, ZoneReader, ZoneWriter};
use ddns_core::{Error, Result};
use std::net::Ipv4Addr;

/// Comment attached to every change batch
const CHANGE_COMMENT: &str = "ddnsd: external address changed";

/// Route 53 zone client
#[derive(Debug, Clone)]
pub struct Route53Zone {
    client: Client,
}

impl Route53Zone {
    /// Wrap an existing Route 53 client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client for the configured region
    ///
    /// Each Route 53 operation is bounded by the configured call timeout.
    pub async fn from_config(config: &DdnsConfig) -> Self {
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(config.call_timeout())
            .build();

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.zone.region.clone()))
            .timeout_config(timeouts)
            .load()
            .await;

        tracing::debug!("Route 53 client configured for region {}", config.zone.region);
        Self::new(Client::new(&sdk_config))
    }
}

#[async_trait]
impl ZoneReader for Route53Zone {
    async fn read_record(&self, name: &ManagedName) -> Result<RecordState> {
        tracing::debug!("Looking up A record for {} in zone {}", name, name.zone_id());

        let output = self
            .client
            .list_resource_record_sets()
            .hosted_zone_id(hosted_zone_id(name.zone_id()))
            .start_record_name(name.name())
            .start_record_type(RrType::A)
            .max_items(1)
            .send()
            .await
            .map_err(|e| Error::lookup(name.name(), DisplayErrorContext(&e).to_string()))?;

        let state = RecordState::from_listing(
            name.name(),
            output.resource_record_sets().iter().map(listed_record),
        );

        tracing::debug!("Route 53 value for {}: {}", name, state);
        Ok(state)
    }
}

#[async_trait]
impl ZoneWriter for Route53Zone {
    async fn upsert_record(&self, name: &ManagedName, address: Ipv4Addr) -> Result<ChangeId> {
        let batch = upsert_batch(name, address).map_err(|e| Error::write(name.name(), e))?;

        let output = self
            .client
            .change_resource_record_sets()
            .hosted_zone_id(hosted_zone_id(name.zone_id()))
            .change_batch(batch)
            .send()
            .await
            .map_err(|e| Error::write(name.name(), DisplayErrorContext(&e).to_string()))?;

        let change_id = output
            .change_info()
            .map(|info| ChangeId::new(info.id()))
            .ok_or_else(|| Error::write(name.name(), "response carried no change info"))?;

        tracing::info!(
            "Route 53 accepted upsert for {} -> {} (change {})",
            name,
            address,
            change_id
        );
        Ok(change_id)
    }

    fn provider_name(&self) -> &'static str {
        "route53"
    }
}

/// Build the single-change `UPSERT` batch for an address record
pub fn upsert_batch(
    name: &ManagedName,
    address: Ipv4Addr,
) -> std::result::Result<ChangeBatch, String> {
    let record = ResourceRecord::builder()
        .value(address.to_string())
        .build()
        .map_err(|e| e.to_string())?;

    let record_set = ResourceRecordSet::builder()
        .name(name.name())
        .r#type(RrType::A)
        .ttl(i64::from(name.ttl_secs()))
        .resource_records(record)
        .build()
        .map_err(|e| e.to_string())?;

    let change = Change::builder()
        .action(ChangeAction::Upsert)
        .resource_record_set(record_set)
        .build()
        .map_err(|e| e.to_string())?;

    ChangeBatch::builder()
        .comment(CHANGE_COMMENT)
        .changes(change)
        .build()
        .map_err(|e| e.to_string())
}

/// Convert a listed record set into the provider-neutral form
fn listed_record(set: &ResourceRecordSet) -> ListedRecord {
    ListedRecord {
        name: decode_name(set.name()),
        record_type: set.r#type().as_str().to_string(),
        values: set
            .resource_records()
            .iter()
            .map(|r| r.value().to_string())
            .collect(),
    }
}

/// Accept both `Z123` and `/hostedzone/Z123`
pub fn hosted_zone_id(zone_id: &str) -> &str {
    zone_id.strip_prefix("/hostedzone/").unwrap_or(zone_id)
}

/// Undo Route 53's `\DDD` octal escaping of record names
///
/// Route 53 returns characters outside `a-z0-9-_.` escaped, e.g. a wildcard
/// record comes back as `\052.example.com.`.
pub fn decode_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];

        let escaped = tail
            .get(..3)
            .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| u8::from_str_radix(digits, 8).ok());

        match escaped {
            Some(byte) => {
                out.push(char::from(byte));
                rest = &tail[3..];
            }
            None => {
                out.push('\\');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}
