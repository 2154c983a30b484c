//! Core reconciliation engine
//!
//! The Reconciler is responsible for one cycle:
//! - Sampling the current external address via AddressObserver
//! - Reading each managed name's record via ZoneReader
//! - Deciding whether a write is needed
//! - Upserting the record via ZoneWriter when it drifted
//!
//! ## Architecture
//!
//! ```text
//!                            ┌──────────────┐
//!                            │  Scheduler   │
//!                            └──────────────┘
//!                                     │ run_cycle()
//!                                     ▼
//!                            ┌──────────────┐
//!                            │  Reconciler  │
//!                            └──────────────┘
//!                                     │
//!         ┌───────────────────────────┼───────────────────────────┐
//!         │                           │                           │
//!         ▼                           ▼                           ▼
//! ┌─────────────────┐       ┌──────────────┐           ┌─────────────┐
//! │ AddressObserver │       │  ZoneReader  │           │ ZoneWriter  │
//! │ (once/cycle)    │       │  (per name)  │           │ (on drift)  │
//! └─────────────────┘       └──────────────┘           └─────────────┘
//! ```
//!
//! ## Per-name flow
//!
//! `START -> READ -> (MATCH | MISMATCH) -> [WRITE] -> DONE`, with a failed
//! state reachable from READ or WRITE. Names are processed sequentially in
//! configured order and never affect each other.

use crate::config::{DdnsConfig, ManagedName};
use crate::error::{Error, Result};
use crate::traits::{AddressObserver, ChangeId, ObservedAddress, RecordState, ZoneReader, ZoneWriter};
use std::future::Future;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Outcome of one managed name within a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Record already pointed at the observed address; nothing written
    Matched,

    /// Record was absent or stale and has been upserted
    Updated {
        /// Address written
        address: Ipv4Addr,
        /// Change identifier returned by the zone
        change_id: ChangeId,
    },

    /// Reading the current record failed; no write attempted
    ReadFailed(Error),

    /// Upserting the record failed
    WriteFailed(Error),
}

impl CycleOutcome {
    /// Whether this name failed during the cycle
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::ReadFailed(_) | Self::WriteFailed(_))
    }
}

/// Result of one completed cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Address observed at the start of the cycle
    pub observed: ObservedAddress,

    /// Outcome per managed name, in configured order
    pub outcomes: Vec<(ManagedName, CycleOutcome)>,

    /// Wall-clock duration of the cycle
    pub elapsed: Duration,
}

impl CycleReport {
    /// Outcome for a name (normalized form, trailing dot included)
    pub fn outcome_for(&self, name: &str) -> Option<&CycleOutcome> {
        self.outcomes
            .iter()
            .find(|(managed, _)| managed.name() == name)
            .map(|(_, outcome)| outcome)
    }

    /// Number of names that already matched
    pub fn matched(&self) -> usize {
        self.count(|o| matches!(o, CycleOutcome::Matched))
    }

    /// Number of names that were written
    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, CycleOutcome::Updated { .. }))
    }

    /// Number of names that failed to read or write
    pub fn failed(&self) -> usize {
        self.count(CycleOutcome::is_failure)
    }

    fn count(&self, predicate: impl Fn(&CycleOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| predicate(o)).count()
    }
}

/// Reconciles every managed name against the observed address
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Call [`Reconciler::run_cycle()`] once per interval (usually through
///    [`crate::Scheduler`])
///
/// The reconciler holds no state between cycles. Every cycle samples the
/// address and reads every record afresh.
pub struct Reconciler {
    /// Source of the current external address
    observer: Box<dyn AddressObserver>,

    /// Read side of the zone
    reader: Box<dyn ZoneReader>,

    /// Write side of the zone
    writer: Box<dyn ZoneWriter>,

    /// Names to keep in sync, in configured order
    names: Vec<ManagedName>,

    /// Bound applied to every outbound call
    call_timeout: Duration,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `observer`: AddressObserver implementation
    /// - `reader`: ZoneReader implementation
    /// - `writer`: ZoneWriter implementation
    /// - `config`: DDNS configuration (validated here)
    pub fn new(
        observer: Box<dyn AddressObserver>,
        reader: Box<dyn ZoneReader>,
        writer: Box<dyn ZoneWriter>,
        config: &DdnsConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            observer,
            reader,
            writer,
            names: config.managed_names()?,
            call_timeout: config.call_timeout(),
        })
    }

    /// Override the per-call timeout
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Managed names, in processing order
    pub fn names(&self) -> &[ManagedName] {
        &self.names
    }

    /// Run one reconciliation cycle
    ///
    /// # Returns
    ///
    /// - `Ok(CycleReport)`: The address was observed and every name was
    ///   processed (individual names may still have failed)
    /// - `Err(Error::Observer)`: The address could not be determined; no
    ///   name was read or written
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started = Instant::now();

        let observed = match self.bounded(self.observer.observe(), Error::observer).await {
            Ok(observed) => observed,
            Err(e) => {
                let e = match e {
                    Error::Observer(_) => e,
                    other => Error::observer(other.to_string()),
                };
                error!(
                    "Could not determine external address via {}, skipping cycle: {}",
                    self.observer.observer_name(),
                    e
                );
                return Err(e);
            }
        };

        info!("Current external address: {}", observed);

        let mut outcomes = Vec::with_capacity(self.names.len());
        for name in &self.names {
            let outcome = self.reconcile_name(name, &observed).await;
            outcomes.push((name.clone(), outcome));
        }

        let report = CycleReport {
            observed,
            outcomes,
            elapsed: started.elapsed(),
        };

        info!(
            "Cycle complete in {:?}: {} matched, {} updated, {} failed",
            report.elapsed,
            report.matched(),
            report.updated(),
            report.failed()
        );

        Ok(report)
    }

    /// Read, compare and, if needed, write one name
    async fn reconcile_name(&self, name: &ManagedName, observed: &ObservedAddress) -> CycleOutcome {
        let read = self
            .bounded(self.reader.read_record(name), |m| Error::lookup(name.name(), m))
            .await;

        let state = match read {
            Ok(state) => state,
            Err(e) => {
                let e = match e {
                    Error::Lookup { .. } => e,
                    other => Error::lookup(name.name(), other.to_string()),
                };
                warn!("Failed to read record {}: {}", name, e);
                return CycleOutcome::ReadFailed(e);
            }
        };

        if let RecordState::Present(current) = &state
            && observed.matches(current)
        {
            debug!("Record {} already points at {}", name, observed);
            return CycleOutcome::Matched;
        }

        info!(
            "Address mismatch for {}: zone={}, observed={}; upserting via {}",
            name,
            state,
            observed,
            self.writer.provider_name()
        );

        let address = observed.address();
        let written = self
            .bounded(self.writer.upsert_record(name, address), |m| {
                Error::write(name.name(), m)
            })
            .await;

        match written {
            Ok(change_id) => {
                info!(
                    "Updated {} -> {} (ttl {}s, change {})",
                    name,
                    address,
                    name.ttl_secs(),
                    change_id
                );
                CycleOutcome::Updated { address, change_id }
            }
            Err(e) => {
                let e = match e {
                    Error::Write { .. } => e,
                    other => Error::write(name.name(), other.to_string()),
                };
                warn!("Failed to update record {}: {}", name, e);
                CycleOutcome::WriteFailed(e)
            }
        }
    }

    /// Apply the call timeout to an outbound call
    ///
    /// `on_timeout` tags an elapsed timeout with the step it belongs to, so a
    /// hung call fails exactly like a transport error of that step.
    async fn bounded<T, F>(&self, call: F, on_timeout: impl FnOnce(String) -> Error) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout(format!(
                "call timed out after {:?}",
                self.call_timeout
            ))),
        }
    }
}
