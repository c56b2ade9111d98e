// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recoverable failures surfaced to callers.
//!
//! Programmer errors (committing a batch twice, rendering into a committed
//! batch, reentrant flushes, stale [`FiberId`](crate::fiber::FiberId)s handed
//! to store accessors) and broken tree invariants panic instead.

use thiserror::Error;

/// Recoverable failures of the reconciler API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// The fiber is not part of any mounted tree.
    #[error("unable to find node on an unmounted component")]
    NotFound,
    /// The attachment point is not an element, document, document fragment,
    /// or mount-point comment.
    #[error("target container is not a DOM element")]
    InvalidContainer,
    /// A legacy subtree render named a parent fiber that is not mounted.
    #[error("parent component must be a mounted fiber")]
    InvalidParentComponent,
    /// The root handle refers to a root that has been destroyed.
    #[error("root has been unmounted and destroyed")]
    StaleRoot,
}

/// Shorthand for results with the crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;
