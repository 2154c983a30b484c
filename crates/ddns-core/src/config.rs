//! Configuration types for the DDNS system
//!
//! Configuration is read once at startup into an immutable [`DdnsConfig`]
//! and passed by value into the reconciler and scheduler. Nothing reads the
//! environment after that point.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default region for the zone-management endpoint
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default record TTL, also the interval between cycles
pub const DEFAULT_TTL_SECS: u32 = 300;

/// Default address-reporting endpoint
pub const DEFAULT_IP_SOURCE_URL: &str = "https://checkip.amazonaws.com";

/// Default timeout for outbound calls, capped at half the interval
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 10;

/// Environment variable names
pub mod env {
    pub const HOSTED_ZONE_ID: &str = "HOSTED_ZONE_ID";
    pub const DNS_NAMES: &str = "DNS_NAMES";
    pub const DNS_NAME: &str = "DNS_NAME";
    pub const AWS_REGION: &str = "AWS_REGION";
    pub const RECORD_TTL: &str = "RECORD_TTL";
    pub const IP_SOURCE_URL: &str = "DDNS_IP_SOURCE_URL";
    pub const HTTP_TIMEOUT_SECS: &str = "DDNS_HTTP_TIMEOUT_SECS";
}

/// Main DDNS configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Authoritative zone to operate on
    pub zone: ZoneConfig,

    /// DNS names to keep in sync, as configured (not yet normalized)
    pub records: Vec<String>,

    /// Record TTL in seconds; also the scheduler interval
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u32,

    /// Address observer configuration
    #[serde(default)]
    pub ip_source: IpSourceConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Create a configuration for one zone with defaults for everything else
    pub fn new(zone_id: impl Into<String>, records: Vec<String>) -> Self {
        Self {
            zone: ZoneConfig {
                zone_id: zone_id.into(),
                region: DEFAULT_REGION.to_string(),
            },
            records,
            ttl_secs: DEFAULT_TTL_SECS,
            ip_source: IpSourceConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Empty values are treated as unset. The result is validated before it
    /// is returned, so any `Ok` value is safe to build the engine from.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let zone_id = get(env::HOSTED_ZONE_ID).ok_or_else(|| {
            Error::config(format!(
                "{} is required. Set it via: export {}=Z0123456789ABC",
                env::HOSTED_ZONE_ID,
                env::HOSTED_ZONE_ID
            ))
        })?;

        let records: Vec<String> = get(env::DNS_NAMES)
            .or_else(|| get(env::DNS_NAME))
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let mut config = Self::new(zone_id, records);

        if let Some(region) = get(env::AWS_REGION) {
            config.zone.region = region;
        }
        if let Some(ttl) = get(env::RECORD_TTL) {
            config.ttl_secs = parse_number(env::RECORD_TTL, &ttl)?;
        }
        if let Some(url) = get(env::IP_SOURCE_URL) {
            config.ip_source.url = url;
        }
        if let Some(timeout) = get(env::HTTP_TIMEOUT_SECS) {
            config.engine.call_timeout_secs =
                Some(parse_number(env::HTTP_TIMEOUT_SECS, &timeout)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.zone.validate()?;

        if self.records.is_empty() {
            return Err(Error::config(format!(
                "{} must contain at least one record. \
                Set it via: export {}=vpn.example.com,home.example.com",
                env::DNS_NAMES,
                env::DNS_NAMES
            )));
        }

        if self.ttl_secs == 0 {
            return Err(Error::config(format!("{} must be > 0", env::RECORD_TTL)));
        }

        self.ip_source.validate()?;

        if let Some(timeout) = self.engine.call_timeout_secs
            && (timeout == 0 || timeout >= u64::from(self.ttl_secs))
        {
            return Err(Error::config(format!(
                "{} must be > 0 and below {} ({}s). Got: {}. \
                Unset it to derive the timeout from the TTL.",
                env::HTTP_TIMEOUT_SECS,
                env::RECORD_TTL,
                self.ttl_secs,
                timeout
            )));
        }

        // Builds and checks every name, including duplicates after normalization
        self.managed_names()?;

        Ok(())
    }

    /// Build the managed names in configured order
    pub fn managed_names(&self) -> Result<Vec<ManagedName>> {
        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(self.records.len());

        for record in &self.records {
            let name = ManagedName::new(&self.zone.zone_id, record, self.ttl_secs)
                .map_err(|e| Error::config(e.to_string()))?;
            if !seen.insert(name.name().to_string()) {
                return Err(Error::config(format!(
                    "Duplicate record name: {}",
                    name.name()
                )));
            }
            names.push(name);
        }

        Ok(names)
    }

    /// Interval between reconciliation cycles
    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.ttl_secs))
    }

    /// Timeout applied to each outbound call
    ///
    /// An explicit setting wins. Otherwise the default, capped at half the
    /// interval.
    pub fn call_timeout(&self) -> Duration {
        match self.engine.call_timeout_secs {
            Some(secs) => Duration::from_secs(secs),
            None => Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS).min(self.interval() / 2),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::config(format!("{} must be a positive integer. Got: {}", key, value)))
}

/// Authoritative zone configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Hosted zone identifier
    pub zone_id: String,

    /// Region of the zone-management endpoint
    #[serde(default = "default_region")]
    pub region: String,
}

impl ZoneConfig {
    /// Validate the zone configuration
    pub fn validate(&self) -> Result<()> {
        if self.zone_id.is_empty() {
            return Err(Error::config(format!("{} cannot be empty", env::HOSTED_ZONE_ID)));
        }
        if self.region.is_empty() {
            return Err(Error::config(format!("{} cannot be empty", env::AWS_REGION)));
        }
        Ok(())
    }
}

/// Address observer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpSourceConfig {
    /// URL returning the external address as plain text
    pub url: String,
}

impl IpSourceConfig {
    /// Validate the observer configuration
    pub fn validate(&self) -> Result<()> {
        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(Error::config(format!(
                "{} must use HTTP or HTTPS scheme. Got: {}",
                env::IP_SOURCE_URL,
                self.url
            )));
        }
        Ok(())
    }
}

impl Default for IpSourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_IP_SOURCE_URL.to_string(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Timeout for each outbound call (observe, read, write)
    ///
    /// Must stay below the cycle interval when set. Unset means
    /// [`DdnsConfig::call_timeout`] derives it from the interval.
    #[serde(default)]
    pub call_timeout_secs: Option<u64>,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_ttl_secs() -> u32 {
    DEFAULT_TTL_SECS
}

/// A DNS name kept in sync with the observed address
///
/// Immutable once built. The name is lower-cased and always carries the
/// trailing dot the zone requires, so `vpn.example.com` and
/// `VPN.example.com.` are the same managed name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ManagedName {
    zone_id: String,
    name: String,
    ttl_secs: u32,
}

impl ManagedName {
    /// Build a managed name, normalizing and validating it
    pub fn new(zone_id: impl Into<String>, name: &str, ttl_secs: u32) -> Result<Self> {
        let zone_id = zone_id.into();
        if zone_id.is_empty() {
            return Err(Error::invalid_input("zone id cannot be empty"));
        }
        if ttl_secs == 0 {
            return Err(Error::invalid_input(format!("TTL for {} must be > 0", name)));
        }

        Ok(Self {
            zone_id,
            name: normalize_name(name)?,
            ttl_secs,
        })
    }

    /// Zone the record lives in
    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    /// Fully-qualified name, trailing dot included
    pub fn name(&self) -> &str {
        &self.name
    }

    /// TTL applied on write
    pub fn ttl_secs(&self) -> u32 {
        self.ttl_secs
    }
}

impl std::fmt::Display for ManagedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Normalize a DNS name to lower case with a trailing dot
///
/// Basic RFC 1035 checks only: total length, label length and characters.
/// A leading `*` label is accepted for wildcard records.
pub fn normalize_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    let bare = trimmed.strip_suffix('.').unwrap_or(trimmed);

    if bare.is_empty() {
        return Err(Error::invalid_input("Domain name cannot be empty"));
    }

    if bare.len() > 253 {
        return Err(Error::invalid_input(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            bare.len(),
            bare
        )));
    }

    for (index, label) in bare.split('.').enumerate() {
        if label.is_empty() {
            return Err(Error::invalid_input(format!(
                "Domain name has empty label: '{}'",
                name
            )));
        }

        if index == 0 && label == "*" {
            continue;
        }

        if label.len() > 63 {
            return Err(Error::invalid_input(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::invalid_input(format!(
                "Domain label contains invalid characters. Label: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::invalid_input(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(format!("{}.", bare.to_ascii_lowercase()))
}
