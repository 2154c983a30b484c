//! Core traits for the DDNS system
//!
//! This module defines the narrow interfaces the reconciler depends on.
//!
//! - [`AddressObserver`]: Sample the current external address
//! - [`ZoneReader`]: Read the current address record for a name
//! - [`ZoneWriter`]: Upsert the address record for a name

pub mod address_observer;
pub mod zone;

pub use address_observer::{AddressObserver, ObservedAddress};
pub use zone::{ChangeId, ListedRecord, RecordState, ZoneReader, ZoneWriter};
