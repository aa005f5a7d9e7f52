// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Node model: leaf and internal variants, descent, split, and safe (write-latched) upsert.
//!
//! ## Input
//! - Keys and values are owned `String`s; `keys` is always kept sorted ascending.
//!
//! ## Performance
//! - `find`/child selection: O(log k) per node via binary search, O(log n) overall.
//! - `safe_upsert`: O(log n) latch acquisitions plus O(k) vector shifts per touched node.

use parking_lot::RwLock;
use std::sync::{Arc, Weak};

use crate::btree::latch::{AnyReadGuard, AnyWriteGuard, NodeHandle, NodeWriteGuard, ParentLatch};
use crate::btree::lock_context::LockContext;
use crate::btree::transaction::{LatchManager, WriteTransactionManager};
use crate::btree::utils::{internal_child_index, internal_median, leaf_search_index, leaf_split_at};

/// A leaf node: parallel `keys`/`values`, and a weak link to the next leaf in key order.
pub struct LeafNode {
    pub keys: Vec<String>,
    pub values: Vec<String>,
    pub next: Option<Weak<RwLock<Node>>>,
    pub max_keys: usize,
}

/// An internal node: `len(children) == len(keys) + 1`; `children[i]` covers
/// `[keys[i-1], keys[i])`.
pub struct InternalNode {
    pub keys: Vec<String>,
    pub children: Vec<NodeHandle>,
    pub max_keys: usize,
}

pub enum Node {
    Leaf(LeafNode),
    Internal(InternalNode),
}

/// Outcome of a `safe_upsert`: whether a new key was created, and, if the node split,
/// the two halves plus the separator key to promote to the parent.
pub struct InsertionResult {
    pub created: bool,
    pub split: Option<(NodeHandle, NodeHandle, String)>,
}

impl Node {
    pub fn new_leaf(max_keys: usize) -> NodeHandle {
        Arc::new(RwLock::new(Node::Leaf(LeafNode {
            keys: Vec::new(),
            values: Vec::new(),
            next: None,
            max_keys,
        })))
    }

    fn max_keys(&self) -> usize {
        match self {
            Node::Leaf(l) => l.max_keys,
            Node::Internal(i) => i.max_keys,
        }
    }

    fn len(&self) -> usize {
        match self {
            Node::Leaf(l) => l.keys.len(),
            Node::Internal(i) => i.keys.len(),
        }
    }

    /// A node is stable iff it has room for at least one more key before splitting.
    pub fn is_stable(&self) -> bool {
        self.len() < self.max_keys()
    }
}

/// Hand-over-hand point lookup. `parent` is the latch the caller already holds on this
/// node's parent (or the tree-level latch, for the root); it is released as soon as this
/// node's own latch is acquired.
pub fn find(handle: NodeHandle, key: &str, parent: ParentLatch) -> Option<String> {
    let guard = handle.read_arc();
    drop(parent);
    if let Node::Leaf(leaf) = &*guard {
        let idx = leaf_search_index(&leaf.keys, key);
        return if idx < leaf.keys.len() && leaf.keys[idx] == key {
            Some(leaf.values[idx].clone())
        } else {
            None
        };
    }
    let child = child_for_key(&guard, key).expect("non-leaf node always has a child covering any key");
    find(child, key, ParentLatch::Owned(AnyReadGuard::Node(guard)))
}

/// The child of `node` covering `key`, or `None` for a leaf. Shared by `find`'s hand-over-hand
/// descent and `acquire_lock_context`'s latch-coupled one, so both pick a child only while
/// reading `node` through a latch that actually protects it.
pub(crate) fn child_for_key(node: &Node, key: &str) -> Option<NodeHandle> {
    match node {
        Node::Leaf(_) => None,
        Node::Internal(internal) => {
            let idx = internal_child_index(&internal.keys, key);
            Some(internal.children[idx].clone())
        }
    }
}

/// Descent-time accumulation of read latches for a write. Adds every node on the path from
/// `handle` to the leaf covering `key` to `ctx`, tracking the deepest stable ancestor.
///
/// `ctx.add` both acquires (or reuses) the latch on `handle` *and* reads its content to pick
/// the next child, in one step, rather than peeking at the node first and retaining the
/// latch after. A separate peek-then-retain here would leave a window, between the peek and
/// `ctx.add`, where a concurrent writer on this (legitimately stable, hence mutable) node
/// could change which child covers `key` out from under the already-chosen `child`.
pub fn acquire_lock_context(
    handle: NodeHandle,
    key: &str,
    ctx: &mut LockContext,
    manager: &dyn LatchManager,
) {
    let child = ctx.add(&handle, key, manager);
    if let Some(child) = child {
        acquire_lock_context(child, key, ctx, manager);
    }
}

/// Acquires a write latch on `handle` for the duration of one `safe_upsert` call: reuses a
/// guard `manager` already retains from an earlier operation in the same write transaction
/// in place (a second acquisition on a latch this transaction already holds would
/// deadlock), or takes a fresh one otherwise. The returned `bool` says which happened, so
/// the caller knows whether to hand the guard back to `manager` afterward.
pub(crate) fn acquire_write_latch(manager: &WriteTransactionManager, handle: &NodeHandle) -> (NodeWriteGuard, bool) {
    match manager.take_tracked_node(handle) {
        Some(guard) => (guard, true),
        None => (handle.write_arc(), false),
    }
}

/// Hands a guard obtained from [`acquire_write_latch`] back to `manager` if (and only if)
/// it was already retained before this call — a node touched only transiently during this
/// call's descent is simply dropped, matching ordinary (non-retaining) write crabbing.
fn release_write_latch(manager: &WriteTransactionManager, handle: &NodeHandle, guard: NodeWriteGuard, was_tracked: bool) {
    if was_tracked {
        manager.add_locked_node(handle, AnyWriteGuard::Node(guard));
    }
}

/// Insert or overwrite `key`/`value` under `handle`. Acquires (or reuses, if `manager`
/// already retains it) a write latch on `handle` itself; descendants are latched the same
/// way by the recursive call in the `Internal` arm of [`safe_upsert_locked`].
pub fn safe_upsert(
    handle: &NodeHandle,
    key: &str,
    value: &str,
    manager: &WriteTransactionManager,
) -> InsertionResult {
    let (mut guard, was_tracked) = acquire_write_latch(manager, handle);
    let result = safe_upsert_locked(handle, &mut guard, key, value, manager);
    release_write_latch(manager, handle, guard, was_tracked);
    result
}

/// Core of `safe_upsert`, operating on a write latch the caller already holds (e.g. the
/// stable ancestor's latch, validated and retained by `transaction_upsert` before this is
/// called) rather than acquiring its own — acquiring a second write latch on the same node
/// from the same thread would deadlock, and re-validating stability would be pointless if
/// the latch were dropped and reacquired in between.
pub fn safe_upsert_locked(
    handle: &NodeHandle,
    guard: &mut Node,
    key: &str,
    value: &str,
    manager: &WriteTransactionManager,
) -> InsertionResult {
    match guard {
        Node::Leaf(leaf) => {
            let idx = leaf_search_index(&leaf.keys, key);
            if idx < leaf.keys.len() && leaf.keys[idx] == key {
                leaf.values[idx] = value.to_string();
                return InsertionResult {
                    created: false,
                    split: None,
                };
            }
            leaf.keys.insert(idx, key.to_string());
            leaf.values.insert(idx, value.to_string());
            if leaf.keys.len() <= leaf.max_keys {
                return InsertionResult {
                    created: true,
                    split: None,
                };
            }
            let split_at = leaf_split_at(leaf.keys.len());
            let right_keys = leaf.keys.split_off(split_at);
            let right_values = leaf.values.split_off(split_at);
            let split_key = right_keys[0].clone();
            let right_handle = Arc::new(RwLock::new(Node::Leaf(LeafNode {
                keys: right_keys,
                values: right_values,
                next: leaf.next.take(),
                max_keys: leaf.max_keys,
            })));
            leaf.next = Some(Arc::downgrade(&right_handle));
            InsertionResult {
                created: true,
                split: Some((handle.clone(), right_handle, split_key)),
            }
        }
        Node::Internal(internal) => {
            let idx = internal_child_index(&internal.keys, key);
            let child = internal.children[idx].clone();
            // `guard` (this node's write latch) is held across the recursive call, matching
            // lock-coupling for writers: every node from the stable ancestor down stays
            // write-latched until its own stack frame returns.
            let child_result = safe_upsert(&child, key, value, manager);
            let Some((left, right, split_key)) = child_result.split else {
                return InsertionResult {
                    created: child_result.created,
                    split: None,
                };
            };
            internal.children[idx] = left;
            internal.children.insert(idx + 1, right);
            internal.keys.insert(idx, split_key);
            if internal.keys.len() <= internal.max_keys {
                return InsertionResult {
                    created: child_result.created,
                    split: None,
                };
            }
            let median = internal_median(internal.keys.len());
            let right_keys = internal.keys.split_off(median + 1);
            let promoted = internal.keys.pop().unwrap();
            let right_children = internal.children.split_off(median + 1);
            let right_handle = Arc::new(RwLock::new(Node::Internal(InternalNode {
                keys: right_keys,
                children: right_children,
                max_keys: internal.max_keys,
            })));
            InsertionResult {
                created: child_result.created,
                split: Some((handle.clone(), right_handle, promoted)),
            }
        }
    }
}

#[cfg(test)]
mod node_test;
