// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Descent-time latch bookkeeping for writes.
//!
//! A write first crabs down read-latched, recording every visited node, so that the
//! *deepest stable* node on the path (the one that cannot itself split as a direct result
//! of the pending insertion) can be identified. Latches above that node are unnecessary for
//! the write and are released as soon as a deeper stable node is found.

use crate::btree::latch::{NodeHandle, ParentLatch};
use crate::btree::node::{child_for_key, Node};
use crate::btree::transaction::LatchManager;
use crate::btree::tree::Tree;

pub struct LockContext {
    rungs: Vec<ParentLatch>,
    stable_ancestor: Option<NodeHandle>,
}

impl LockContext {
    pub fn new() -> Self {
        Self {
            rungs: Vec::new(),
            stable_ancestor: None,
        }
    }

    /// Acquires the tree-level latch as a reader (through `manager`) and returns the
    /// current root handle to begin descent from. The handle comes from whatever `manager`
    /// hands back — a fresh read of the root latch, or, if it is already tracked, the
    /// manager's own held value — never from an independent second `read_arc()`, which
    /// could deadlock against a write latch this same transaction already holds on the root.
    pub fn init(&mut self, tree: &Tree, manager: &dyn LatchManager) -> NodeHandle {
        let (latch, root) = manager.rlock_root(tree.root_latch());
        self.rungs.push(latch);
        root
    }

    /// Records `handle` as visited on the descent path and, if it is stable, trims all but
    /// the handoff pair of latches and marks it as the new deepest stable ancestor. Returns
    /// the child of `handle` covering `key` (`None` for a leaf), read from the very same
    /// observation of `handle`'s content that `rlock_node` protects.
    ///
    /// Both the stability check and the child selection are read from whatever latch
    /// `rlock_node` hands back (a fresh read guard, or — when the latch is already tracked —
    /// the manager's own held guard) rather than through an independent lock acquisition,
    /// which could deadlock against a write latch this same transaction already holds on
    /// `handle`, or race a concurrent writer that is free to mutate a stable (and therefore
    /// legitimately still-writable) node between an earlier peek and this call.
    pub fn add(&mut self, handle: &NodeHandle, key: &str, manager: &dyn LatchManager) -> Option<NodeHandle> {
        let mut stable = false;
        let mut child = None;
        let latch = manager.rlock_node(handle, &mut |node: &Node| {
            stable = node.is_stable();
            child = child_for_key(node, key);
        });
        self.rungs.push(latch);
        if stable {
            self.update_stable_ancestor(handle.clone());
        }
        child
    }

    fn update_stable_ancestor(&mut self, handle: NodeHandle) {
        let keep_from = self.rungs.len().saturating_sub(2);
        self.rungs.drain(..keep_from);
        self.stable_ancestor = Some(handle);
        log::trace!("lock context: new stable ancestor, {} latches retained", self.rungs.len());
    }

    /// Ends the descent: drops every latch but the tree-level one, returning it alongside
    /// whatever stable ancestor was found (`None` means even the root must be replaced).
    pub fn resolve(mut self) -> (Option<NodeHandle>, ParentLatch) {
        let tree_level = self.rungs.drain(..1).next().expect("tree-level latch always present");
        (self.stable_ancestor, tree_level)
    }
}

impl Default for LockContext {
    fn default() -> Self {
        Self::new()
    }
}
