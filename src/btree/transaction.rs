// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Transaction managers: idempotent latch retention across multiple tree operations.
//!
//! A latch recorded via `add`/`add_locked` is owned by the manager for the rest of the
//! transaction's lifetime; later calls that touch the same latch neither re-acquire it
//! (would self-deadlock) nor release it early (would break the transaction's consistent
//! view). `end()` is the sole release point and must be called exactly once.
//!
//! Descent (`LockContext::add`, used while locating a write's stable ancestor) always
//! read-latches through `rlock_node`/`rlock_root`, regardless of whether the owning
//! transaction is read-only or read/write — only the deliberately-retained latches
//! acquired via `add`/`add_locked` differ in kind between the two manager variants.

use parking_lot::Mutex;
use std::collections::HashMap;

use crate::btree::latch::{
    node_latch_id, root_latch_id, AnyReadGuard, AnyWriteGuard, NodeHandle, NodeWriteGuard, ParentLatch, RootLatch,
};
use crate::btree::node::{find, Node};
use crate::btree::tree::Tree;
use crate::error::manager_already_ended;

/// Shared contract used by `LockContext` during descent: acquire-or-reuse a read latch,
/// tracked generically whether the manager ultimately deals in read or write retention.
///
/// `rlock_node` invokes `peek` against the node's content while the returned latch is known
/// to protect it — whether that is a freshly taken read guard, or (when the latch is already
/// tracked) the guard the manager itself already holds. Callers must never follow `rlock_node`
/// with an independent lock acquisition on the same `handle` to read its content: taking any
/// lock on a latch this thread already holds as a writer would deadlock, since `parking_lot`'s
/// raw lock is not reentrant. `rlock_root` mirrors this by handing back the root `NodeHandle`
/// itself rather than requiring a second `read_arc()` on the root latch.
pub trait LatchManager {
    fn rlock_node(&self, handle: &NodeHandle, peek: &mut dyn FnMut(&Node)) -> ParentLatch;
    fn rlock_root(&self, latch: &RootLatch) -> (ParentLatch, NodeHandle);
}

/// A read-only transaction: every retained latch is a reader.
pub struct ReadTransactionManager {
    tracked: Mutex<Option<HashMap<usize, AnyReadGuard>>>,
}

impl ReadTransactionManager {
    pub fn new() -> Self {
        Self {
            tracked: Mutex::new(Some(HashMap::new())),
        }
    }

    /// Acquires (or reuses) a read latch on `handle`, retaining it until `end()`.
    pub fn add_node(&self, handle: &NodeHandle) {
        let id = node_latch_id(handle);
        let mut tracked = self.tracked.lock();
        let map = tracked.as_mut().expect("transaction already ended");
        map.entry(id).or_insert_with(|| AnyReadGuard::Node(handle.read_arc()));
    }

    /// Point lookup scoped to this transaction.
    pub fn find(&self, tree: &Tree, key: &str) -> Option<String> {
        let (parent, root) = self.rlock_root(tree.root_latch());
        find(root, key, parent)
    }

    pub fn end(&self) {
        let mut tracked = self.tracked.lock();
        if tracked.take().is_none() {
            manager_already_ended();
        }
        log::debug!("read transaction ended");
    }
}

impl Default for ReadTransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LatchManager for ReadTransactionManager {
    fn rlock_node(&self, handle: &NodeHandle, peek: &mut dyn FnMut(&Node)) -> ParentLatch {
        let id = node_latch_id(handle);
        let mut tracked = self.tracked.lock();
        let map = tracked.as_mut().expect("transaction already ended");
        if let Some(guard) = map.get(&id) {
            log::trace!("rlock_node: {id:x} already tracked, no-op");
            match guard {
                AnyReadGuard::Node(g) => peek(g),
                AnyReadGuard::Root(_) => unreachable!("root latch id collided with a node latch id"),
            }
            return ParentLatch::TrackedNoop;
        }
        drop(tracked);
        let guard = handle.read_arc();
        peek(&guard);
        ParentLatch::Owned(AnyReadGuard::Node(guard))
    }

    fn rlock_root(&self, latch: &RootLatch) -> (ParentLatch, NodeHandle) {
        let id = root_latch_id(latch);
        let mut tracked = self.tracked.lock();
        let map = tracked.as_mut().expect("transaction already ended");
        if let Some(guard) = map.get(&id) {
            let root = match guard {
                AnyReadGuard::Root(g) => g.clone(),
                AnyReadGuard::Node(_) => unreachable!("node latch id collided with a root latch id"),
            };
            return (ParentLatch::TrackedNoop, root);
        }
        drop(tracked);
        let guard = latch.read_arc();
        let root = guard.clone();
        (ParentLatch::Owned(AnyReadGuard::Root(guard)), root)
    }
}

/// A read/write transaction: retained latches acquired via `add`/`add_locked` are writers.
pub struct WriteTransactionManager {
    tracked: Mutex<Option<HashMap<usize, AnyWriteGuard>>>,
}

impl WriteTransactionManager {
    pub fn new() -> Self {
        Self {
            tracked: Mutex::new(Some(HashMap::new())),
        }
    }

    /// Records a write latch the caller has already acquired on `handle` (e.g. the stable
    /// ancestor after a successful upgrade), retaining it until `end()`.
    pub fn add_locked_node(&self, handle: &NodeHandle, guard: AnyWriteGuard) {
        let id = node_latch_id(handle);
        let mut tracked = self.tracked.lock();
        let map = tracked.as_mut().expect("transaction already ended");
        map.entry(id).or_insert(guard);
    }

    /// Records a write latch the caller has already acquired on the tree-level latch
    /// (root-replacement path).
    pub fn add_locked_root(&self, latch: &RootLatch, guard: AnyWriteGuard) {
        let id = root_latch_id(latch);
        let mut tracked = self.tracked.lock();
        let map = tracked.as_mut().expect("transaction already ended");
        map.entry(id).or_insert(guard);
    }

    /// Removes and returns a write guard this manager already holds on `handle`, if any,
    /// so the caller can reuse it in place instead of attempting a second acquisition on
    /// the same latch (which would deadlock). The guard must be handed back — via
    /// `add_locked_node`, whose `entry().or_insert()` re-fills the now-vacant slot — before
    /// this manager's `end()`.
    pub(crate) fn take_tracked_node(&self, handle: &NodeHandle) -> Option<NodeWriteGuard> {
        let id = node_latch_id(handle);
        let mut tracked = self.tracked.lock();
        let map = tracked.as_mut().expect("transaction already ended");
        match map.remove(&id) {
            Some(AnyWriteGuard::Node(guard)) => Some(guard),
            Some(other) => {
                map.insert(id, other);
                None
            }
            None => None,
        }
    }

    /// Point lookup scoped to this transaction. As in the read manager, the descent after
    /// the initial tree-level latch is raw hand-over-hand, not routed through `self` — a
    /// `find` issued after an `upsert` in the same transaction therefore does not observe
    /// the write-latched subtree the earlier `upsert` retained beyond that shared prefix.
    pub fn find(&self, tree: &Tree, key: &str) -> Option<String> {
        let (parent, root) = self.rlock_root(tree.root_latch());
        find(root, key, parent)
    }

    pub fn upsert(&self, tree: &Tree, key: &str, value: &str) -> bool {
        tree.transaction_upsert(self, key, value)
    }

    pub fn end(&self) {
        let mut tracked = self.tracked.lock();
        if tracked.take().is_none() {
            manager_already_ended();
        }
        log::debug!("write transaction ended");
    }
}

impl Default for WriteTransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LatchManager for WriteTransactionManager {
    fn rlock_node(&self, handle: &NodeHandle, peek: &mut dyn FnMut(&Node)) -> ParentLatch {
        let id = node_latch_id(handle);
        let mut tracked = self.tracked.lock();
        let map = tracked.as_mut().expect("transaction already ended");
        if let Some(guard) = map.get(&id) {
            log::trace!("rlock_node: {id:x} already tracked (write), no-op");
            // Read through the write guard this manager already holds rather than
            // taking a fresh read lock, which would deadlock against our own write hold.
            match guard {
                AnyWriteGuard::Node(g) => peek(g),
                AnyWriteGuard::Root(_) => unreachable!("root latch id collided with a node latch id"),
            }
            return ParentLatch::TrackedNoop;
        }
        drop(tracked);
        let guard = handle.read_arc();
        peek(&guard);
        ParentLatch::Owned(AnyReadGuard::Node(guard))
    }

    fn rlock_root(&self, latch: &RootLatch) -> (ParentLatch, NodeHandle) {
        let id = root_latch_id(latch);
        let mut tracked = self.tracked.lock();
        let map = tracked.as_mut().expect("transaction already ended");
        if let Some(guard) = map.get(&id) {
            // Read through the write guard this manager already holds on the root latch
            // (from an earlier root replacement) rather than taking a fresh read lock,
            // which would deadlock against our own write hold.
            let root = match guard {
                AnyWriteGuard::Root(g) => g.clone(),
                AnyWriteGuard::Node(_) => unreachable!("node latch id collided with a root latch id"),
            };
            return (ParentLatch::TrackedNoop, root);
        }
        drop(tracked);
        let guard = latch.read_arc();
        let root = guard.clone();
        (ParentLatch::Owned(AnyReadGuard::Root(guard)), root)
    }
}

#[cfg(test)]
mod transaction_test;
