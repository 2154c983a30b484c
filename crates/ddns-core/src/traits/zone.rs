// # Zone Traits
//
// Defines the two zone operations the reconciler consumes: reading the
// current address record for a name, and upserting it.
//
// ## Implementations
//
// - Route 53: `ddns-zone-route53` crate
//
// Providers implement both traits on the same client. They must not decide
// whether a write is needed (owned by `Reconciler`) and must not retry
// (owned by the next `Scheduler` cycle).

use async_trait::async_trait;
use serde::Serialize;
use std::net::Ipv4Addr;

use crate::config::ManagedName;
use crate::error::Result;

/// Record type managed by this system
pub const ADDRESS_RECORD_TYPE: &str = "A";

/// Current state of a name's address record in the zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RecordState {
    /// An address record exists with this value
    Present(String),
    /// No address record exists for the exact name
    Absent,
}

impl RecordState {
    /// Select the state for `name` out of a provider listing
    ///
    /// Providers that list "from" a name return the next record in zone order
    /// when the requested one does not exist. Only a record whose name equals
    /// `name` (ASCII case-insensitive, trailing dot included) and whose type
    /// is `A` counts; anything else means the record is absent.
    ///
    /// When a record set holds several values the first one is used.
    pub fn from_listing<I>(name: &str, listing: I) -> Self
    where
        I: IntoIterator<Item = ListedRecord>,
    {
        listing
            .into_iter()
            .find(|record| {
                record.name.eq_ignore_ascii_case(name)
                    && record.record_type.eq_ignore_ascii_case(ADDRESS_RECORD_TYPE)
            })
            .and_then(|record| record.values.into_iter().next())
            .map_or(RecordState::Absent, RecordState::Present)
    }

    /// The current value, if any
    pub fn value(&self) -> Option<&str> {
        match self {
            RecordState::Present(value) => Some(value),
            RecordState::Absent => None,
        }
    }
}

impl std::fmt::Display for RecordState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordState::Present(value) => f.write_str(value),
            RecordState::Absent => f.write_str("<absent>"),
        }
    }
}

/// A record set as listed by a provider, before exact-match selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedRecord {
    /// Record name as returned by the provider
    pub name: String,
    /// Record type (e.g. "A", "CNAME")
    pub record_type: String,
    /// Record values in provider order
    pub values: Vec<String>,
}

/// Opaque identifier of an applied change
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChangeId(String);

impl ChangeId {
    /// Wrap a provider change identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read side of the zone
///
/// # Contract
///
/// - Returns [`RecordState::Absent`] when no exact address record exists.
/// - Returns [`crate::Error::Lookup`] on transport or authorization
///   failures. A failed lookup is never reported as `Absent`.
#[async_trait]
pub trait ZoneReader: Send + Sync {
    /// Read the current address record for `name`
    async fn read_record(&self, name: &ManagedName) -> Result<RecordState>;
}

/// Write side of the zone
///
/// # Idempotency
///
/// `upsert_record` must be a create-or-replace: calling it twice with the
/// same arguments leaves the zone exactly as calling it once. This makes a
/// retry after a write of unknown outcome always safe.
#[async_trait]
pub trait ZoneWriter: Send + Sync {
    /// Create or replace the address record for `name` with `address`,
    /// using the name's configured TTL
    async fn upsert_record(&self, name: &ManagedName, address: Ipv4Addr) -> Result<ChangeId>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}
