//! Fixed-interval scheduler
//!
//! The Scheduler owns process lifetime: it runs one reconciliation cycle,
//! waits the configured interval, and repeats until shutdown.
//!
//! ## Resilience
//!
//! No single cycle's failure stops future cycles:
//! - Observer failures skip the cycle (logged by the reconciler)
//! - Per-name failures are isolated inside the cycle
//! - Anything else, panics included, is caught here and logged
//!
//! Each cycle runs in its own task. A panic therefore surfaces as a
//! `JoinError` instead of unwinding through the loop, and shutdown can abort
//! an in-flight cycle. Abandoning a cycle midway is safe because every write
//! is an idempotent upsert.

use crate::engine::{CycleReport, Reconciler};
use crate::error::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{debug, error, info};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Counters reported when the scheduler stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    /// Cycles that observed an address and processed every name
    pub cycles_completed: usize,

    /// Cycles skipped because the address could not be determined
    pub cycles_skipped: usize,

    /// Cycles that failed for an unanticipated reason (errors or panics)
    pub cycles_failed: usize,
}

impl SchedulerSummary {
    /// Total cycles that ran to an outcome
    pub fn total(&self) -> usize {
        self.cycles_completed + self.cycles_skipped + self.cycles_failed
    }
}

/// Drives a [`Reconciler`] at a fixed interval
///
/// The first cycle starts immediately. After every cycle, successful or not,
/// the scheduler waits `interval` before the next one.
pub struct Scheduler {
    reconciler: Arc<Reconciler>,
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler for `reconciler`
    pub fn new(reconciler: Reconciler, interval: Duration) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            interval,
        }
    }

    /// Interval between cycles
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until SIGTERM or SIGINT
    ///
    /// # Returns
    ///
    /// - `Ok(SchedulerSummary)`: Clean shutdown
    /// - `Err(Error)`: Signal handlers could not be installed
    #[cfg(unix)]
    pub async fn run(&self) -> Result<SchedulerSummary> {
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| Error::unexpected(format!("Failed to setup SIGTERM handler: {}", e)))?;
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| Error::unexpected(format!("Failed to setup SIGINT handler: {}", e)))?;

        let summary = self
            .run_until(async move {
                let received = tokio::select! {
                    _ = sigterm.recv() => "SIGTERM",
                    _ = sigint.recv() => "SIGINT",
                };
                info!("Received shutdown signal: {}", received);
            })
            .await;

        Ok(summary)
    }

    /// Run until Ctrl-C
    ///
    /// Fallback implementation for non-Unix platforms.
    #[cfg(not(unix))]
    pub async fn run(&self) -> Result<SchedulerSummary> {
        let summary = self
            .run_until(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => info!("Received shutdown signal: SIGINT"),
                    Err(e) => {
                        error!("Failed to wait for CTRL-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            })
            .await;

        Ok(summary)
    }

    /// Run until `shutdown_rx` fires (or its sender is dropped)
    ///
    /// For embedders and tests that control shutdown programmatically
    /// rather than through OS signals.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    ) -> SchedulerSummary {
        self.run_until(async move {
            let _ = shutdown_rx.await;
            info!("Shutdown signal received");
        })
        .await
    }

    async fn run_until<F>(&self, shutdown: F) -> SchedulerSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut summary = SchedulerSummary::default();
        info!(
            "Scheduler started: {} record(s), interval {:?}",
            self.reconciler.names().len(),
            self.interval
        );

        loop {
            let reconciler = Arc::clone(&self.reconciler);
            let mut cycle = tokio::spawn(async move { reconciler.run_cycle().await });

            tokio::select! {
                joined = &mut cycle => record_cycle(joined, &mut summary),
                _ = &mut shutdown => {
                    cycle.abort();
                    info!("Aborted in-flight cycle on shutdown");
                    break;
                }
            }

            debug!("Next cycle in {:?}", self.interval);

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown => break,
            }
        }

        info!(
            "Scheduler stopped after {} cycle(s): {} completed, {} skipped, {} failed",
            summary.total(),
            summary.cycles_completed,
            summary.cycles_skipped,
            summary.cycles_failed
        );

        summary
    }
}

fn record_cycle(
    joined: std::result::Result<Result<CycleReport>, JoinError>,
    summary: &mut SchedulerSummary,
) {
    match joined {
        Ok(Ok(_)) => summary.cycles_completed += 1,
        // Already logged by the reconciler
        Ok(Err(Error::Observer(_))) => summary.cycles_skipped += 1,
        Ok(Err(e)) => {
            summary.cycles_failed += 1;
            error!("Unexpected cycle failure: {}", e);
        }
        Err(e) => {
            summary.cycles_failed += 1;
            error!("Unexpected cycle failure: {}", describe_join_error(e));
        }
    }
}

fn describe_join_error(err: JoinError) -> Error {
    if !err.is_panic() {
        return Error::unexpected(err.to_string());
    }

    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());

    Error::unexpected(format!("cycle panicked: {}", message))
}
