// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! In-memory concurrent B+-tree.
//!
//! ## Architecture
//!
//! ```text
//!            Tree
//!              |
//!        RootLatch (Arc<RwLock<NodeHandle>>)   <- tree-level latch, guards the root pointer
//!              |
//!        Internal --- Internal --- ...
//!           /   |   \
//!        Leaf--Leaf--Leaf    (linked left-to-right via `next`)
//! ```
//!
//! Readers crab down the tree holding at most two latches at a time (parent + child); a
//! writer first crabs down read-latched to find the deepest *stable* ancestor (one that
//! cannot itself overflow as a direct result of the pending insertion), then re-acquires
//! that ancestor write-latched and re-validates it, restarting the whole operation on a
//! race. Because a stable node is defined as holding fewer than `max_keys` keys, absorbing
//! at most one key promoted up from a splitting child never overflows it — so once a
//! genuine stable ancestor is found, `safe_upsert` starting there is guaranteed not to
//! split the ancestor itself; only the "no stable ancestor anywhere on the path" case (the
//! root itself may need to split) needs a root-replacement step.
//!
//! ## Performance
//! - `find`: O(log n) latch acquisitions, each released before the next is taken.
//! - `upsert`: O(log n) for the stable-ancestor descent; O(d) write latches held
//!   simultaneously where `d` is the depth from the stable ancestor to the leaf (usually 1).
//!
//! ## Error Conditions
//! - `Tree::new` panics if `max_keys < 2` (a split could not produce two non-empty halves).

use std::sync::Arc;

use parking_lot::RwLock;

use crate::btree::latch::{AnyWriteGuard, NodeHandle, ParentLatch, RootLatch};
use crate::btree::lock_context::LockContext;
use crate::btree::node::{find, safe_upsert, InternalNode, Node};
use crate::btree::transaction::{LatchManager, ReadTransactionManager, WriteTransactionManager};
use crate::error::invalid_max_keys;

/// A concurrent, in-memory B+-tree index from `String` keys to `String` values.
///
/// Cheaply `Clone`able (an `Arc` clone of the root latch); share one `Tree` across threads.
pub struct Tree {
    root_latch: RootLatch,
    max_keys: usize,
}

impl Clone for Tree {
    fn clone(&self) -> Self {
        Self {
            root_latch: Arc::clone(&self.root_latch),
            max_keys: self.max_keys,
        }
    }
}

impl Tree {
    /// Builds an empty tree whose root is a single leaf. `max_keys` bounds how many keys
    /// any node may hold before it must split; it must be at least 2.
    pub fn new(max_keys: usize) -> Self {
        if max_keys < 2 {
            invalid_max_keys(max_keys);
        }
        Self {
            root_latch: Arc::new(RwLock::new(Node::new_leaf(max_keys))),
            max_keys,
        }
    }

    pub(crate) fn root_latch(&self) -> &RootLatch {
        &self.root_latch
    }

    pub fn max_keys(&self) -> usize {
        self.max_keys
    }

    /// Point lookup, scoped to a transaction that exists only for the duration of the call.
    pub fn find(&self, key: &str) -> Option<String> {
        let manager = ReadTransactionManager::new();
        let result = self.transaction_find(&manager, key);
        manager.end();
        result
    }

    /// Insert or overwrite `key` -> `value`. Returns whether a new key was created.
    pub fn upsert(&self, key: &str, value: &str) -> bool {
        let manager = WriteTransactionManager::new();
        let created = self.transaction_upsert(&manager, key, value);
        manager.end();
        created
    }

    pub fn read_transaction(&self) -> ReadTransactionManager {
        ReadTransactionManager::new()
    }

    pub fn write_transaction(&self) -> WriteTransactionManager {
        WriteTransactionManager::new()
    }

    /// Raw hand-over-hand lookup through an already-open transaction manager. Only the
    /// initial tree-level latch acquisition is routed through `manager`; the rest of the
    /// descent is untracked, matching ordinary B+-tree read-side crabbing. A `find` issued
    /// after an `upsert` within the same write transaction therefore does not inherit the
    /// consistency of latches the earlier `upsert` retained beyond this shared prefix.
    pub(crate) fn transaction_find(&self, manager: &dyn LatchManager, key: &str) -> Option<String> {
        let (parent, root) = manager.rlock_root(&self.root_latch);
        find(root, key, parent)
    }

    /// The write protocol: find the deepest stable ancestor, upgrade it to a write latch
    /// (retrying if it destabilized between the descent and the upgrade), mutate, and
    /// replace the root if the mutation propagated a split all the way to it.
    pub(crate) fn transaction_upsert(
        &self,
        manager: &WriteTransactionManager,
        key: &str,
        value: &str,
    ) -> bool {
        loop {
            let (ancestor, tree_parent) = self.get_stable_ancestor(manager, key);

            let Some(ancestor) = ancestor else {
                // No stable ancestor anywhere on the path: even the root may need to
                // split. Upgrade the tree-level latch itself to a writer.
                drop(tree_parent);
                let mut root_guard = self.root_latch.write_arc();
                let write_target = root_guard.clone();
                let result = safe_upsert(&write_target, key, value, manager);
                if let Some((left, right, split_key)) = result.split {
                    debug_assert!(Arc::ptr_eq(&left, &write_target));
                    let new_root: NodeHandle = Arc::new(RwLock::new(Node::Internal(InternalNode {
                        keys: vec![split_key],
                        children: vec![left, right],
                        max_keys: self.max_keys,
                    })));
                    log::debug!("root split, installing new internal-node root");
                    *root_guard = new_root;
                }
                manager.add_locked_root(&self.root_latch, AnyWriteGuard::Root(root_guard));
                return result.created;
            };

            // Upgrade to a write latch and keep holding it through the stability
            // re-check and the mutation itself — dropping and reacquiring in between
            // would reopen exactly the race this check exists to close. If `manager`
            // already retains this exact latch from an earlier operation in the same
            // write transaction, reuse that guard instead of acquiring a second one
            // (which would deadlock); skip the stability re-check in that case, since no
            // other transaction can touch a node this one already holds exclusively.
            let (mut write_guard, was_tracked) =
                crate::btree::node::acquire_write_latch(manager, &ancestor);
            if !was_tracked && !write_guard.is_stable() {
                // Raced: another writer split (or otherwise destabilized) this node
                // between our read-latched descent and the write-latch upgrade. There is
                // no true upgrade path, so drop everything acquired this attempt and
                // restart the descent from scratch.
                log::debug!("upgrade miss on stable ancestor, retrying upsert");
                drop(write_guard);
                drop(tree_parent);
                continue;
            }
            drop(tree_parent);

            let result = crate::btree::node::safe_upsert_locked(&ancestor, &mut write_guard, key, value, manager);
            debug_assert!(
                result.split.is_none(),
                "a stable ancestor absorbs at most one promoted key and cannot itself overflow"
            );
            manager.add_locked_node(&ancestor, AnyWriteGuard::Node(write_guard));
            return result.created;
        }
    }

    fn get_stable_ancestor(
        &self,
        manager: &dyn LatchManager,
        key: &str,
    ) -> (Option<NodeHandle>, ParentLatch) {
        let mut ctx = LockContext::new();
        let root = ctx.init(self, manager);
        crate::btree::node::acquire_lock_context(root, key, &mut ctx, manager);
        ctx.resolve()
    }
}

#[cfg(test)]
mod tree_test;
