// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Restart durability: bookkeeping recorded before a node goes down must be
//! answerable after it comes back, or the node re-requests and re-floods
//! everything it already handled.

use driftsub_persistence::{Config, ReceivedSequenceIndex, StoreError, TransmissionHistory};

#[test]
fn test_received_facts_survive_restart() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = Config::builder()
        .db_path(dir.path().join("bookkeeping.db"))
        .build();

    {
        let index = ReceivedSequenceIndex::open(&config).expect("first open");
        for seq in [1, 2, 3, 8] {
            index.add_message("chat", "nodeA", seq).expect("add fact");
        }
    } // node goes down

    let index = ReceivedSequenceIndex::open(&config).expect("reopen");
    assert!(index.contains("chat", "nodeA", 2).expect("contains"));
    assert_eq!(index.max_seq_id("chat", "nodeA").expect("max"), Some(8));

    // The gap (4-7) is still derivable from the replayed ranges.
    let all = index.by_group_and_publisher().expect("scan");
    let set = &all["chat"]["nodeA"];
    assert_eq!(set.range_count(), 2);
    assert!(!set.contains(5));

    // And duplicates are still detected across the restart.
    assert!(matches!(
        index.add_message("chat", "nodeA", 3),
        Err(StoreError::AlreadyExists)
    ));
}

#[test]
fn test_transmission_history_survives_restart() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = Config::builder()
        .db_path(dir.path().join("bookkeeping.db"))
        .build();

    {
        let history = TransmissionHistory::open(&config).expect("first open");
        history.add_message_target("m1", "t1").expect("add");
        history.add_message_target("m2", "t2").expect("add");
    }

    let history = TransmissionHistory::open(&config).expect("reopen");
    assert!(history.has_target("m1", "t1").expect("has"));
    assert!(!history.has_target("m1", "t2").expect("has"));

    let mut union = history.message_list_via("t1", "t2").expect("union");
    union.sort();
    assert_eq!(union, vec!["m1", "m2"]);
}

#[test]
fn test_both_stores_share_one_database_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = Config::builder()
        .db_path(dir.path().join("bookkeeping.db"))
        .build();

    // Separate connections, disjoint tables, one file.
    let index = ReceivedSequenceIndex::open(&config).expect("open index");
    let history = TransmissionHistory::open(&config).expect("open history");

    index.add_message("chat", "nodeA", 1).expect("add fact");
    history.add_message_target("m1", "t1").expect("add relation");

    assert!(index.contains("chat", "nodeA", 1).expect("contains"));
    assert!(history.has_target("m1", "t1").expect("has"));

    // Resetting one store leaves the other's tables alone.
    history.reset().expect("reset history");
    assert!(index.contains("chat", "nodeA", 1).expect("contains"));
    assert!(!history.has_message("m1").expect("has"));
}
