// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! In-memory concurrent B+-tree: fine-grained per-node latching with lock-coupling descent
//! and a transaction manager that retains latches across multiple operations.
//!
//! Start at [`Tree`] for the public surface. [`node`] holds the tree's data model and the
//! single-threaded-per-call split/search logic; [`latch`] defines the shared latch types;
//! [`lock_context`] and [`transaction`] implement the concurrency protocol described in the
//! crate's design notes.

pub mod latch;
pub mod lock_context;
pub mod node;
pub mod transaction;
mod tree;
mod utils;

pub use latch::{AnyReadGuard, AnyWriteGuard, NodeHandle, RootLatch};
pub use node::{InsertionResult, Node};
pub use transaction::{LatchManager, ReadTransactionManager, WriteTransactionManager};
pub use tree::Tree;
