// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Panic-precondition helpers.
//!
//! This crate has no user-visible `Result`/`Error` type: lookups return `Option<String>`
//! and upserts return `bool`, and the only failure modes are programmer errors — an
//! unusable tree configuration or a transaction manager driven past its lifetime. Those
//! are reported as panics with a named, consistent message rather than scattered ad hoc
//! strings, centralised here the way a richer error enum would be centralised elsewhere.

/// `Tree::new` was called with a `max_keys` too small to ever produce two non-empty halves.
pub fn invalid_max_keys(max_keys: usize) -> ! {
    panic!("invalid max_keys {max_keys}: must be at least 2");
}

/// A transaction manager's `end()` was called more than once.
pub fn manager_already_ended() -> ! {
    panic!("transaction manager end() called after the transaction already ended");
}
