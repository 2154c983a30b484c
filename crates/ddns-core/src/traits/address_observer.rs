// # Address Observer Trait
//
// Defines the interface for sampling the network's externally-visible address.
//
// ## Implementations
//
// - HTTP-based: `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::AddressObserver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let observer = /* AddressObserver implementation */;
//
//     let observed = observer.observe().await?;
//     println!("External address: {}", observed.address());
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::Ipv4Addr;

use crate::error::{Error, Result};

/// An external address sampled during one cycle
///
/// Never persisted; a fresh value is produced at the start of every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservedAddress {
    address: Ipv4Addr,
    observed_at: DateTime<Utc>,
}

impl ObservedAddress {
    /// Wrap an address sampled now
    pub fn new(address: Ipv4Addr) -> Self {
        Self {
            address,
            observed_at: Utc::now(),
        }
    }

    /// Parse a payload returned by an address-reporting service
    ///
    /// Surrounding whitespace is ignored. Anything other than a bare IPv4
    /// dotted quad is rejected.
    pub fn parse(payload: &str) -> Result<Self> {
        let text = payload.trim();
        let address: Ipv4Addr = text.parse().map_err(|_| {
            Error::invalid_input(format!("Not an IPv4 address: {:?}", truncate(text, 64)))
        })?;
        Ok(Self::new(address))
    }

    /// The observed address
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// When the address was sampled
    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Whether a record value points at this address
    ///
    /// String comparison of the dotted-quad forms, ignoring surrounding
    /// whitespace on the record value.
    pub fn matches(&self, value: &str) -> bool {
        value.trim() == self.address.to_string()
    }
}

impl std::fmt::Display for ObservedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.address.fmt(f)
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Trait for address observer implementations
///
/// One call performs exactly one outbound request. Implementations do not
/// retry and do not cache: a failed observation is retried by the next
/// scheduled cycle.
///
/// Errors should be [`Error::Observer`]; the reconciler maps anything else to
/// an observer failure as well, since no name can be processed without an
/// address.
#[async_trait]
pub trait AddressObserver: Send + Sync {
    /// Sample the current external address
    async fn observe(&self) -> Result<ObservedAddress>;

    /// Observer name (for logging)
    fn observer_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_whitespace() {
        let observed = ObservedAddress::parse("  203.0.113.5\n").unwrap();
        assert_eq!(observed.address(), Ipv4Addr::new(203, 0, 113, 5));
        assert_eq!(observed.to_string(), "203.0.113.5");
    }

    #[test]
    fn test_parse_rejects_non_ipv4_payloads() {
        for payload in ["", "not an ip", "2001:db8::1", "203.0.113", "<html>203.0.113.5</html>"] {
            assert!(
                matches!(ObservedAddress::parse(payload), Err(Error::InvalidInput(_))),
                "{:?} should be rejected",
                payload
            );
        }
    }

    #[test]
    fn test_matches_is_string_equality() {
        let observed = ObservedAddress::new(Ipv4Addr::new(203, 0, 113, 5));
        assert!(observed.matches("203.0.113.5"));
        assert!(observed.matches(" 203.0.113.5 "));
        assert!(!observed.matches("203.0.113.9"));
    }
}
