// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Cross-module scenarios exercising the public API end to end.

use crabtree::Tree;
use std::thread;

#[test]
fn root_split_then_lookup() {
    let tree = Tree::new(3);
    for (k, v) in [("a", "0"), ("b", "1"), ("c", "2"), ("d", "3")] {
        tree.upsert(k, v);
    }
    assert_eq!(tree.find("b"), Some("1".to_string()));
    assert_eq!(tree.find("d"), Some("3".to_string()));
    assert_eq!(tree.find("z"), None);
}

#[test]
fn ten_sequential_inserts_all_resolve() {
    let tree = Tree::new(3);
    let keys: Vec<String> = ('a'..='j').map(|c| c.to_string()).collect();
    for (i, k) in keys.iter().enumerate() {
        tree.upsert(k, &i.to_string());
    }
    for (i, k) in keys.iter().enumerate() {
        assert_eq!(tree.find(k), Some(i.to_string()));
    }
    assert_eq!(tree.find("k"), None);
    assert_eq!(tree.find(""), None);
    assert_eq!(tree.find("ea"), None);
}

#[test]
fn upsert_idempotence_and_overwrite() {
    let tree = Tree::new(3);
    assert!(tree.upsert("a", "x"));
    assert!(!tree.upsert("a", "y"));
    assert_eq!(tree.find("a"), Some("y".to_string()));
}

#[test]
fn root_replacement_with_minimal_max_keys() {
    let tree = Tree::new(2);
    tree.upsert("a", "0");
    tree.upsert("b", "1");
    tree.upsert("c", "2");
    assert_eq!(tree.find("a"), Some("0".to_string()));
    assert_eq!(tree.find("b"), Some("1".to_string()));
    assert_eq!(tree.find("c"), Some("2".to_string()));
}

#[test]
fn concurrent_transactions_see_their_own_writes_consistently() {
    let tree = Tree::new(4);
    thread::scope(|scope| {
        for label in ["a", "b"] {
            let tree = tree.clone();
            scope.spawn(move || {
                let txn = tree.write_transaction();
                txn.upsert(&tree, "1", label);
                txn.upsert(&tree, "2", label);
                assert_eq!(txn.find(&tree, "1"), txn.find(&tree, "2"));
                txn.end();
            });
        }
    });
    assert_eq!(tree.find("1"), tree.find("2"));
}

/// The full 1,000,000-entry / 8-worker sweep. Slow; run explicitly with
/// `cargo test --release -- --ignored bulk_concurrent_inserts`.
#[test]
#[ignore]
fn bulk_concurrent_inserts() {
    let tree = Tree::new(128);
    let workers = 8;
    let total = 1_000_000usize;
    let per_worker = total / workers;

    thread::scope(|scope| {
        for w in 0..workers {
            let tree = tree.clone();
            scope.spawn(move || {
                for i in 0..per_worker {
                    let n = w * per_worker + i;
                    tree.upsert(&format!("key-{n}"), &format!("value-{n}"));
                }
            });
        }
    });

    for n in 0..total {
        assert_eq!(tree.find(&format!("key-{n}")), Some(format!("value-{n}")));
    }
}
