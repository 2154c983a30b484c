//! Test doubles and common utilities for reconciliation contract tests
//!
//! A scripted address observer and an in-memory zone with call counters and
//! injectable failures.

#![allow(dead_code)]

use ddns_core::config::DdnsConfig;
use ddns_core::error::{Error, Result};
use ddns_core::traits::{
    AddressObserver, ChangeId, ListedRecord, ObservedAddress, RecordState, ZoneReader, ZoneWriter,
};
use ddns_core::{ManagedName, Reconciler};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted observer response
#[derive(Debug, Clone)]
pub enum ObserverStep {
    /// Report this address
    Address(Ipv4Addr),
    /// Fail with a transport error
    Fail(&'static str),
    /// Never answer within any reasonable timeout
    Hang(Duration),
    /// Panic inside the cycle
    Panic,
}

/// An AddressObserver that replays a script, then repeats its last step
#[derive(Clone)]
pub struct ScriptedObserver {
    script: Arc<Mutex<VecDeque<ObserverStep>>>,
    last: Arc<Mutex<ObserverStep>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedObserver {
    pub fn new(steps: Vec<ObserverStep>) -> Self {
        let last = steps
            .last()
            .cloned()
            .expect("script needs at least one step");
        Self {
            script: Arc::new(Mutex::new(steps.into())),
            last: Arc::new(Mutex::new(last)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always report `address`
    pub fn fixed(address: Ipv4Addr) -> Self {
        Self::new(vec![ObserverStep::Address(address)])
    }

    /// Number of times observe() was called
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AddressObserver for ScriptedObserver {
    async fn observe(&self) -> Result<ObservedAddress> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let step = {
            let mut script = self.script.lock().unwrap();
            match script.pop_front() {
                Some(step) => {
                    *self.last.lock().unwrap() = step.clone();
                    step
                }
                None => self.last.lock().unwrap().clone(),
            }
        };

        match step {
            ObserverStep::Address(address) => ObservedAddress::parse(&format!("{}\n", address)),
            ObserverStep::Fail(message) => Err(Error::observer(message)),
            ObserverStep::Hang(duration) => {
                tokio::time::sleep(duration).await;
                Err(Error::observer("hung observer eventually gave up"))
            }
            ObserverStep::Panic => panic!("observer blew up"),
        }
    }

    fn observer_name(&self) -> &'static str {
        "scripted"
    }
}

/// A single recorded upsert call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertCall {
    pub name: String,
    pub address: Ipv4Addr,
    pub ttl_secs: u32,
}

#[derive(Default)]
struct ZoneState {
    records: BTreeMap<String, String>,
    failing_reads: HashSet<String>,
    failing_writes: HashSet<String>,
    read_log: Vec<String>,
    upserts: Vec<UpsertCall>,
    next_change: usize,
}

/// An in-memory zone implementing both ZoneReader and ZoneWriter
///
/// Reads emulate "list starting from name" semantics: when the requested name
/// does not exist the next record in zone order is returned, so the
/// exact-match rule is exercised. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryZone {
    state: Arc<Mutex<ZoneState>>,
}

impl InMemoryZone {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an address record
    pub fn with_record(self, name: &str, value: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .records
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Make reads of `name` fail with a transport error
    pub fn failing_read(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_reads
            .insert(name.to_string());
        self
    }

    /// Make writes of `name` fail with a transport error
    pub fn failing_write(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_writes
            .insert(name.to_string());
        self
    }

    /// Current value of a record
    pub fn record(&self, name: &str) -> Option<String> {
        self.state.lock().unwrap().records.get(name).cloned()
    }

    /// Snapshot of every record
    pub fn records(&self) -> BTreeMap<String, String> {
        self.state.lock().unwrap().records.clone()
    }

    /// Names read, in call order
    pub fn read_log(&self) -> Vec<String> {
        self.state.lock().unwrap().read_log.clone()
    }

    /// Upsert calls, in call order
    pub fn upserts(&self) -> Vec<UpsertCall> {
        self.state.lock().unwrap().upserts.clone()
    }

    pub fn read_count(&self) -> usize {
        self.state.lock().unwrap().read_log.len()
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().upserts.len()
    }
}

#[async_trait::async_trait]
impl ZoneReader for InMemoryZone {
    async fn read_record(&self, name: &ManagedName) -> Result<RecordState> {
        let mut state = self.state.lock().unwrap();
        state.read_log.push(name.name().to_string());

        if state.failing_reads.contains(name.name()) {
            return Err(Error::lookup(name.name(), "simulated transport error"));
        }

        // First record at or after `name`, like a "start from" listing with one item
        let listing: Vec<ListedRecord> = state
            .records
            .range(name.name().to_string()..)
            .take(1)
            .map(|(record_name, value)| ListedRecord {
                name: record_name.clone(),
                record_type: "A".to_string(),
                values: vec![value.clone()],
            })
            .collect();

        Ok(RecordState::from_listing(name.name(), listing))
    }
}

#[async_trait::async_trait]
impl ZoneWriter for InMemoryZone {
    async fn upsert_record(&self, name: &ManagedName, address: Ipv4Addr) -> Result<ChangeId> {
        let mut state = self.state.lock().unwrap();
        state.upserts.push(UpsertCall {
            name: name.name().to_string(),
            address,
            ttl_secs: name.ttl_secs(),
        });

        if state.failing_writes.contains(name.name()) {
            return Err(Error::write(name.name(), "simulated transport error"));
        }

        state
            .records
            .insert(name.name().to_string(), address.to_string());
        state.next_change += 1;
        Ok(ChangeId::new(format!("/change/C{}", state.next_change)))
    }

    fn provider_name(&self) -> &'static str {
        "in-memory"
    }
}

/// A ZoneReader whose reads never complete in time
pub struct HangingReader {
    pub delay: Duration,
}

#[async_trait::async_trait]
impl ZoneReader for HangingReader {
    async fn read_record(&self, _name: &ManagedName) -> Result<RecordState> {
        tokio::time::sleep(self.delay).await;
        Ok(RecordState::Absent)
    }
}

/// Helper to create a minimal DdnsConfig for testing
pub fn minimal_config(names: &[&str]) -> DdnsConfig {
    let mut config = DdnsConfig::new("Z0TESTZONE", names.iter().map(|n| n.to_string()).collect());
    config.ttl_secs = 60;
    config.engine.call_timeout_secs = Some(5);
    config
}

/// Build a reconciler over an observer and a shared in-memory zone
pub fn reconciler(observer: &ScriptedObserver, zone: &InMemoryZone, names: &[&str]) -> Reconciler {
    Reconciler::new(
        Box::new(observer.clone()),
        Box::new(zone.clone()),
        Box::new(zone.clone()),
        &minimal_config(names),
    )
    .expect("reconciler construction succeeds")
}

pub fn addr(s: &str) -> Ipv4Addr {
    s.parse().expect("valid test address")
}
