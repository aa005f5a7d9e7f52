// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Shared latch types.
//!
//! A node's latch is the `RwLock` embedded in its own `Arc<RwLock<Node>>` handle, so the
//! latch's address is stable for the node's whole lifetime regardless of how its internal
//! vectors reallocate. The tree-level latch has the same shape (`Arc<RwLock<NodeHandle>>`)
//! but guards the root pointer rather than node contents. `AnyReadGuard`/`AnyWriteGuard`
//! unify both shapes behind one pair of types so the lock context and transaction manager
//! can track either generically.

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock};
use std::sync::Arc;

use crate::btree::node::Node;

/// A reference-counted, latch-bearing reference to a node.
pub type NodeHandle = Arc<RwLock<Node>>;

/// The tree-level latch: guards which `NodeHandle` is currently the root.
pub type RootLatch = Arc<RwLock<NodeHandle>>;

pub type NodeReadGuard = ArcRwLockReadGuard<RawRwLock, Node>;
pub type NodeWriteGuard = ArcRwLockWriteGuard<RawRwLock, Node>;
pub type RootReadGuard = ArcRwLockReadGuard<RawRwLock, NodeHandle>;
pub type RootWriteGuard = ArcRwLockWriteGuard<RawRwLock, NodeHandle>;

/// A held read guard on either a node's own latch or the tree-level latch.
pub enum AnyReadGuard {
    Node(NodeReadGuard),
    Root(RootReadGuard),
}

/// A held write guard on either a node's own latch or the tree-level latch.
pub enum AnyWriteGuard {
    Node(NodeWriteGuard),
    Root(RootWriteGuard),
}

/// A latch held during descent: either acquired locally (dropping it releases the latch)
/// or already owned by the active transaction manager, in which case dropping it is a
/// no-op — the manager alone releases it, at `end()`.
pub enum ParentLatch {
    Owned(AnyReadGuard),
    TrackedNoop,
}

/// Identity of a latch, used as the transaction manager's tracking key. Two clones of the
/// same `Arc` always yield the same id; distinct nodes never collide because `Arc::as_ptr`
/// returns the address of the shared allocation.
pub fn node_latch_id(handle: &NodeHandle) -> usize {
    Arc::as_ptr(handle) as usize
}

pub fn root_latch_id(latch: &RootLatch) -> usize {
    Arc::as_ptr(latch) as usize
}
