// # HTTP Address Observer
//
// This crate provides an HTTP-based address observer for the DDNS system.
//
// ## Architecture
//
// One GET per observation to an address-reporting service (by default
// `https://checkip.amazonaws.com`) that answers with the caller's external
// address as plain text.
//
// - ✅ One request per `observe()` call
// - ✅ Request timeout configured on the client
// - ❌ NO retry logic (the next scheduled cycle retries)
// - ❌ NO caching (every cycle samples a fresh address)
// - ❌ NO background tasks

use async_trait::async_trait;
use ddns_core::config::DdnsConfig;
use ddns_core::traits::{AddressObserver, ObservedAddress};
use ddns_core::{Error, Result};
use std::time::Duration;

/// HTTP-based address observer
#[derive(Debug, Clone)]
pub struct HttpAddressObserver {
    /// URL to fetch the address from
    url: String,

    /// HTTP client (carries the request timeout)
    client: reqwest::Client,
}

impl HttpAddressObserver {
    /// Create a new HTTP address observer
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch the address from (e.g., "https://checkip.amazonaws.com")
    /// - `timeout`: Bound on the whole request, connect included
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Create an observer from the DDNS configuration
    pub fn from_config(config: &DdnsConfig) -> Result<Self> {
        Self::new(config.ip_source.url.clone(), config.call_timeout())
    }

    /// URL this observer queries
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AddressObserver for HttpAddressObserver {
    async fn observe(&self) -> Result<ObservedAddress> {
        tracing::debug!("Fetching external address from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::observer(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::observer(format!(
                "{} answered with HTTP {}",
                self.url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::observer(format!("Failed to read response: {}", e)))?;

        ObservedAddress::parse(&body).map_err(|e| Error::observer(e.to_string()))
    }

    fn observer_name(&self) -> &'static str {
        "http"
    }
}
