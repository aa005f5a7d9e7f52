use super::*;
use std::collections::HashMap;
use std::thread;

#[test]
#[should_panic(expected = "invalid max_keys")]
fn new_rejects_max_keys_below_two() {
    Tree::new(1);
}

#[test]
fn clone_shares_the_same_underlying_tree() {
    let tree = Tree::new(8);
    let clone = tree.clone();
    tree.upsert("a", "1");
    assert_eq!(clone.find("a"), Some("1".to_string()));
}

#[test]
fn sequential_inserts_are_all_findable() {
    let tree = Tree::new(3);
    let entries: Vec<(String, String)> = (0..10)
        .map(|i| (format!("k{i}"), format!("v{i}")))
        .collect();
    for (k, v) in &entries {
        tree.upsert(k, v);
    }
    for (k, v) in &entries {
        assert_eq!(tree.find(k), Some(v.clone()));
    }
    assert_eq!(tree.find("k"), None);
    assert_eq!(tree.find(""), None);
    assert_eq!(tree.find("k10"), None);
}

#[test]
fn concurrent_inserts_from_multiple_threads_all_land() {
    let tree = Tree::new(12);
    let workers = 8;
    let per_worker = 500;

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

    for n in 0..(workers * per_worker) {
        assert_eq!(tree.find(&format!("key-{n}")), Some(format!("value-{n}")));
    }
}

#[test]
fn root_replacement_at_small_max_keys() {
    let tree = Tree::new(2);
    assert!(tree.upsert("a", "0"));
    assert!(tree.upsert("b", "1"));
    assert!(tree.upsert("c", "2"));

    assert_eq!(tree.find("a"), Some("0".to_string()));
    assert_eq!(tree.find("b"), Some("1".to_string()));
    assert_eq!(tree.find("c"), Some("2".to_string()));
}

#[test]
fn concurrent_write_transactions_stay_internally_consistent() {
    let tree = Tree::new(4);
    thread::scope(|scope| {
        let t1_tree = tree.clone();
        let t1 = scope.spawn(move || {
            let txn = t1_tree.write_transaction();
            txn.upsert(&t1_tree, "1", "a");
            txn.upsert(&t1_tree, "2", "a");
            let consistent = txn.find(&t1_tree, "1") == txn.find(&t1_tree, "2");
            txn.end();
            consistent
        });

        let t2_tree = tree.clone();
        let t2 = scope.spawn(move || {
            let txn = t2_tree.write_transaction();
            txn.upsert(&t2_tree, "1", "b");
            txn.upsert(&t2_tree, "2", "b");
            let consistent = txn.find(&t2_tree, "1") == txn.find(&t2_tree, "2");
            txn.end();
            consistent
        });

        assert!(t1.join().unwrap());
        assert!(t2.join().unwrap());
    });

    // Whichever transaction committed last, both keys must agree with each other.
    assert_eq!(tree.find("1"), tree.find("2"));
}

#[test]
fn overwrite_does_not_change_tree_shape_spuriously() {
    let tree = Tree::new(4);
    let mut expected = HashMap::new();
    for i in 0..20 {
        let key = format!("k{i}");
        let value = format!("v{i}-0");
        tree.upsert(&key, &value);
        expected.insert(key, value);
    }
    for i in 0..20 {
        let key = format!("k{i}");
        let value = format!("v{i}-1");
        assert!(!tree.upsert(&key, &value));
        expected.insert(key, value);
    }
    for (k, v) in &expected {
        assert_eq!(tree.find(k), Some(v.clone()));
    }
}
