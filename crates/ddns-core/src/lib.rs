// # ddns-core
//
// Core library for keeping DNS address records pointed at the network's
// current external address.
//
// ## Architecture Overview
//
// This library provides the reconciliation loop and its boundaries:
// - **AddressObserver**: Trait for sampling the current external address
// - **ZoneReader**: Trait for reading a name's address record
// - **ZoneWriter**: Trait for idempotently upserting a name's address record
// - **Reconciler**: One cycle of observe → read → compare → write, per name
// - **Scheduler**: Drives the Reconciler at a fixed interval until shutdown
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider clients
// 2. **Convergence**: The zone is the only durable state; every cycle reads it afresh
// 3. **Failure Isolation**: One name's failure never affects another name
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: Writes are upserts, so any cycle is safe to retry or abandon

pub mod traits;
pub mod engine;
pub mod scheduler;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{AddressObserver, ZoneReader, ZoneWriter};
pub use traits::{ChangeId, ListedRecord, ObservedAddress, RecordState};
pub use engine::{CycleOutcome, CycleReport, Reconciler};
pub use scheduler::{Scheduler, SchedulerSummary};
pub use config::{DdnsConfig, ManagedName};
pub use error::{Error, Result};
