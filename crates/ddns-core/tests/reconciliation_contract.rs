//! Contract Test: Convergence & Correction
//!
//! This test verifies the per-name decision rule of a reconciliation cycle.
//!
//! Constraints verified:
//! - A record already pointing at the observed address is never written
//! - A stale or absent record gets exactly one upsert with the observed
//!   address and the configured TTL
//! - A record returned for a different name is treated as absent
//! - Names with and without a trailing dot are the same name
//! - Repeated upserts converge to the same zone state
//!
//! If this test fails, the reconciler writes too much or too little.

mod common;

use common::*;
use ddns_core::CycleOutcome;
use ddns_core::traits::ZoneWriter;
use ddns_core::ManagedName;

#[tokio::test]
async fn matching_record_is_not_written() {
    // Observed 203.0.113.5, record already 203.0.113.5

    let observer = ScriptedObserver::fixed(addr("203.0.113.5"));
    let zone = InMemoryZone::new().with_record("vpn.example.com.", "203.0.113.5");
    let reconciler = reconciler(&observer, &zone, &["vpn.example.com"]);

    let report = reconciler.run_cycle().await.expect("cycle completes");

    assert_eq!(
        report.outcome_for("vpn.example.com."),
        Some(&CycleOutcome::Matched)
    );
    assert_eq!(zone.write_count(), 0, "Matched record must not be written");
    assert_eq!(report.matched(), 1);
}

#[tokio::test]
async fn stale_record_gets_one_upsert_and_next_name_still_runs() {
    // Observed 203.0.113.9, record still 203.0.113.5, plus an unrelated name

    let observer = ScriptedObserver::fixed(addr("203.0.113.9"));
    let zone = InMemoryZone::new()
        .with_record("vpn.example.com.", "203.0.113.5")
        .with_record("home.example.com.", "203.0.113.9");
    let reconciler = reconciler(&observer, &zone, &["vpn.example.com", "home.example.com"]);

    let report = reconciler.run_cycle().await.expect("cycle completes");

    assert_eq!(
        zone.upserts(),
        vec![UpsertCall {
            name: "vpn.example.com.".to_string(),
            address: addr("203.0.113.9"),
            ttl_secs: 60,
        }]
    );
    assert!(matches!(
        report.outcome_for("vpn.example.com."),
        Some(CycleOutcome::Updated { address, .. }) if *address == addr("203.0.113.9")
    ));
    assert_eq!(
        report.outcome_for("home.example.com."),
        Some(&CycleOutcome::Matched)
    );
    assert_eq!(
        zone.read_log(),
        vec!["vpn.example.com.".to_string(), "home.example.com.".to_string()],
        "Both names are read, in configured order"
    );
    assert_eq!(zone.record("vpn.example.com.").as_deref(), Some("203.0.113.9"));
}

#[tokio::test]
async fn absent_record_is_created_with_configured_ttl() {
    let observer = ScriptedObserver::fixed(addr("198.51.100.7"));
    let zone = InMemoryZone::new();
    let reconciler = reconciler(&observer, &zone, &["vpn.example.com"]);

    let report = reconciler.run_cycle().await.expect("cycle completes");

    assert_eq!(zone.write_count(), 1);
    let call = &zone.upserts()[0];
    assert_eq!(call.name, "vpn.example.com.");
    assert_eq!(call.address, addr("198.51.100.7"));
    assert_eq!(call.ttl_secs, 60);
    assert_eq!(report.updated(), 1);
    assert_eq!(zone.record("vpn.example.com.").as_deref(), Some("198.51.100.7"));
}

#[tokio::test]
async fn record_for_a_different_name_counts_as_absent() {
    // The zone only has "www", which sorts after "vpn": a "start from"
    // listing for "vpn" returns the "www" record.

    let observer = ScriptedObserver::fixed(addr("203.0.113.5"));
    let zone = InMemoryZone::new().with_record("www.example.com.", "203.0.113.5");
    let reconciler = reconciler(&observer, &zone, &["vpn.example.com"]);

    let report = reconciler.run_cycle().await.expect("cycle completes");

    assert_eq!(report.updated(), 1, "Next-record result must not count as a match");
    assert_eq!(zone.upserts()[0].name, "vpn.example.com.");
    assert_eq!(
        zone.record("www.example.com.").as_deref(),
        Some("203.0.113.5"),
        "Unrelated record is untouched"
    );
}

#[tokio::test]
async fn second_cycle_after_correction_is_a_no_op() {
    let observer = ScriptedObserver::fixed(addr("203.0.113.9"));
    let zone = InMemoryZone::new().with_record("vpn.example.com.", "203.0.113.5");
    let reconciler = reconciler(&observer, &zone, &["vpn.example.com"]);

    let first = reconciler.run_cycle().await.expect("first cycle completes");
    let second = reconciler.run_cycle().await.expect("second cycle completes");

    assert_eq!(first.updated(), 1);
    assert_eq!(second.matched(), 1);
    assert_eq!(zone.write_count(), 1, "Converged zone needs no further writes");
    assert_eq!(observer.call_count(), 2, "Address is sampled fresh every cycle");
}

#[tokio::test]
async fn names_with_and_without_trailing_dot_behave_identically() {
    let observer = ScriptedObserver::fixed(addr("203.0.113.5"));

    let bare_zone = InMemoryZone::new().with_record("vpn.example.com.", "203.0.113.1");
    let dotted_zone = InMemoryZone::new().with_record("vpn.example.com.", "203.0.113.1");

    let bare = reconciler(&observer, &bare_zone, &["vpn.example.com"]);
    let dotted = reconciler(&observer, &dotted_zone, &["vpn.example.com."]);

    assert_eq!(bare.names(), dotted.names());

    bare.run_cycle().await.expect("cycle completes");
    dotted.run_cycle().await.expect("cycle completes");

    assert_eq!(bare_zone.upserts(), dotted_zone.upserts());
    assert_eq!(bare_zone.records(), dotted_zone.records());
}

#[tokio::test]
async fn repeated_upsert_leaves_same_state_as_one() {
    let name = ManagedName::new("Z0TESTZONE", "vpn.example.com", 60).unwrap();

    let once = InMemoryZone::new().with_record("vpn.example.com.", "203.0.113.5");
    let twice = InMemoryZone::new().with_record("vpn.example.com.", "203.0.113.5");

    once.upsert_record(&name, addr("203.0.113.9")).await.unwrap();
    twice.upsert_record(&name, addr("203.0.113.9")).await.unwrap();
    twice.upsert_record(&name, addr("203.0.113.9")).await.unwrap();

    assert_eq!(once.records(), twice.records());
}
