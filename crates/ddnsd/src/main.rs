// # ddnsd - Route 53 DDNS Daemon
//
// This daemon is a THIN integration layer:
// - DO NOT add reconciliation, DNS or retry logic here
// - All DDNS logic lives in ddns-core
// - Configuration is via environment variables only (a `.env` file in the
//   working directory is loaded first, without overriding the environment)
//
// The ddnsd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Building the address observer and the Route 53 zone client
// 4. Running the scheduler until SIGTERM/SIGINT
//
// ## Configuration
//
// ### Zone
// - `HOSTED_ZONE_ID`: Route 53 hosted zone ID (required)
// - `DNS_NAMES`: Comma-separated list of DNS names to manage (required;
//   `DNS_NAME` is accepted for a single name)
// - `AWS_REGION`: Region for the Route 53 client (default: us-east-1)
// - `RECORD_TTL`: Record TTL and cycle interval in seconds (default: 300)
//
// ### Address observer
// - `DDNS_IP_SOURCE_URL`: Address-reporting service (default: https://checkip.amazonaws.com)
// - `DDNS_HTTP_TIMEOUT_SECS`: Timeout for every outbound call (default: 10,
//   or half of `RECORD_TTL` when that is shorter)
//
// ### Logging
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// Credentials come from the default AWS chain (`AWS_ACCESS_KEY_ID` /
// `AWS_SECRET_ACCESS_KEY`, `AWS_PROFILE`, instance role, ...).
//
// ## Example
//
// ```bash
// export HOSTED_ZONE_ID=Z0123456789ABC
// export DNS_NAMES=vpn.example.com,home.example.com
// export RECORD_TTL=300
//
// ddnsd
// ```

use anyhow::Result;
use ddns_core::{DdnsConfig, Reconciler, Scheduler};
use ddns_ip_http::HttpAddressObserver;
use ddns_zone_route53::Route53Zone;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

const LOG_LEVEL_VAR: &str = "DDNS_LOG_LEVEL";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl DdnsExitCode {
    /// Exit code for an error that ends the daemon
    fn for_error(err: &ddns_core::Error) -> Self {
        if err.is_fatal() {
            Self::ConfigError
        } else {
            Self::RuntimeError
        }
    }
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Parse `DDNS_LOG_LEVEL`, defaulting to info when unset
fn log_level(value: Option<&str>) -> Result<Level> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(Level::INFO);
    };

    match raw.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "{} '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            LOG_LEVEL_VAR,
            raw
        ),
    }
}

fn main() -> ExitCode {
    // A missing .env is the normal case
    let dotenv = dotenvy::dotenv();

    let level = match log_level(std::env::var(LOG_LEVEL_VAR).ok().as_deref()) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    if let Err(e) = dotenv
        && !e.not_found()
    {
        error!("Failed to load .env file: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Load and validate configuration from environment
    let config = match DdnsConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{}", e);
            return DdnsExitCode::for_error(&e).into();
        }
    };

    info!("Starting ddnsd daemon");
    info!(
        "Configuration loaded: zone {} in {}, {} record(s), TTL {}s",
        config.zone.zone_id,
        config.zone.region,
        config.records.len(),
        config.ttl_secs
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let scheduler = match build_scheduler(&config).await {
            Ok(scheduler) => scheduler,
            Err(e) => {
                error!("Startup error: {}", e);
                return DdnsExitCode::for_error(&e);
            }
        };

        match scheduler.run().await {
            Ok(_) => {
                info!("Shutting down daemon");
                DdnsExitCode::CleanShutdown
            }
            Err(e) => {
                error!("Daemon error: {}", e);
                DdnsExitCode::for_error(&e)
            }
        }
    })
    .into()
}

/// Wire the observer and zone client into a scheduler
async fn build_scheduler(config: &DdnsConfig) -> ddns_core::Result<Scheduler> {
    let observer = HttpAddressObserver::from_config(config)?;
    info!("Address observer: {}", observer.url());

    let zone = Route53Zone::from_config(config).await;

    let reconciler = Reconciler::new(
        Box::new(observer),
        Box::new(zone.clone()),
        Box::new(zone),
        config,
    )?;

    for name in reconciler.names() {
        info!("Managing record: {}", name);
    }

    Ok(Scheduler::new(reconciler, config.interval()))
}
