// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! An in-memory, concurrent B+-tree index over `String` keys and values.
//!
//! The index supports point lookups and upserts, plus transactions that retain latches
//! across several operations so a caller sees a consistent view of the nodes it has
//! touched. The central engineering concern is the concurrency protocol: fine-grained
//! per-node latches combined with a top-down lock-coupling descent that releases ancestor
//! latches as soon as a node is proven stable (cannot itself overflow under the pending
//! write).
//!
//! ## Quick start
//!
//! ```rust
//! use crabtree::Tree;
//!
//! let tree = Tree::new(64);
//! tree.upsert("a", "1");
//! tree.upsert("b", "2");
//! assert_eq!(tree.find("a"), Some("1".to_string()));
//! assert_eq!(tree.find("z"), None);
//! ```
//!
//! ## Transactions
//!
//! ```rust
//! use crabtree::Tree;
//!
//! let tree = Tree::new(64);
//! let txn = tree.write_transaction();
//! txn.upsert(&tree, "a", "1");
//! txn.upsert(&tree, "b", "1");
//! assert_eq!(txn.find(&tree, "a"), txn.find(&tree, "b"));
//! txn.end();
//! ```
//!
//! ## Logging
//!
//! The crate instruments its latching protocol (descent, stable-ancestor discovery,
//! upgrade retries, splits, root replacement) via the [`log`] crate at `trace`/`debug`
//! level. Enable the `init_env_logger` feature and call [`init_logging`] to wire up a
//! concrete subscriber, or bring your own `log` implementation.

pub mod btree;
mod error;

pub use btree::{LatchManager, ReadTransactionManager, Tree, WriteTransactionManager};

/// Initialises an [`env_logger`] subscriber from the `RUST_LOG` environment variable.
/// Only available with the `init_env_logger` feature; without it, initialise whatever
/// `log` implementation your application already uses.
#[cfg(feature = "init_env_logger")]
pub fn init_logging() {
    let _ = env_logger::try_init();
}
