use super::*;
use crate::btree::tree::Tree;

#[test]
fn read_transaction_scoped_find_matches_plain_find() {
    let tree = Tree::new(8);
    tree.upsert("a", "1");
    tree.upsert("b", "2");

    let txn = tree.read_transaction();
    assert_eq!(txn.find(&tree, "a"), Some("1".to_string()));
    assert_eq!(txn.find(&tree, "b"), Some("2".to_string()));
    assert_eq!(txn.find(&tree, "missing"), None);
    txn.end();
}

#[test]
#[should_panic(expected = "already ended")]
fn ending_a_transaction_twice_panics() {
    let tree = Tree::new(8);
    let txn = tree.read_transaction();
    let _ = txn.find(&tree, "a");
    txn.end();
    txn.end();
}

#[test]
fn read_transaction_add_node_retains_a_latch_idempotently() {
    let tree = Tree::new(8);
    tree.upsert("a", "1");

    let txn = tree.read_transaction();
    let root = tree.root_latch().read_arc().clone();
    txn.add_node(&root);
    // Retaining the same node twice must not attempt a second acquisition.
    txn.add_node(&root);
    assert_eq!(txn.find(&tree, "a"), Some("1".to_string()));
    txn.end();
}

#[test]
fn write_transaction_batches_multiple_upserts_consistently() {
    let tree = Tree::new(3);
    let txn = tree.write_transaction();
    txn.upsert(&tree, "1", "a");
    txn.upsert(&tree, "2", "a");
    assert_eq!(txn.find(&tree, "1"), txn.find(&tree, "2"));
    txn.end();

    assert_eq!(tree.find("1"), Some("a".to_string()));
    assert_eq!(tree.find("2"), Some("a".to_string()));
}

#[test]
fn write_transaction_keeps_working_after_replacing_the_root() {
    // max_keys = 2 forces the third upsert to split the root leaf into a new internal
    // root, write-tracking the tree-level latch. A fourth upsert on the same transaction
    // must still reach `rlock_root` without re-locking that tracked latch.
    let tree = Tree::new(2);
    let txn = tree.write_transaction();
    txn.upsert(&tree, "a", "0");
    txn.upsert(&tree, "b", "1");
    txn.upsert(&tree, "c", "2");
    txn.upsert(&tree, "d", "3");
    txn.end();

    assert_eq!(tree.find("a"), Some("0".to_string()));
    assert_eq!(tree.find("b"), Some("1".to_string()));
    assert_eq!(tree.find("c"), Some("2".to_string()));
    assert_eq!(tree.find("d"), Some("3".to_string()));
}
