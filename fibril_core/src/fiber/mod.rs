// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fiber tree data model.
//!
//! A *fiber* is the reconciler's record of one position in the UI tree. Each
//! fiber has:
//!
//! - An identity ([`FiberId`]): a generational handle that becomes stale when
//!   the fiber is destroyed.
//! - Topology: `return` (parent), first-child, and sibling links forming an
//!   ordered tree, plus an `alternate` link to its counterpart in the other
//!   tree version.
//! - Work state: a [`WorkTag`](crate::tag::WorkTag), pending
//!   [`EffectTag`](crate::tag::EffectTag)s, the backing [`StateNode`], and
//!   pending and memoized [`Props`].
//!
//! # Dual trees
//!
//! At most two versions of every position exist: the *current* fiber (what
//! the host shows) and its *work-in-progress* alternate. Both live in the same
//! [`FiberStore`]. Which of the two is current is not stored on the fiber at
//! all; it is decided by the root record, whose `current` pointer names the
//! committed host-root fiber. Committing a render flips that pointer, and the
//! two versions swap roles without any copying.
//!
//! A committed parent and its alternate may share one child list. Children
//! then have a single `return` pointing at whichever parent last touched
//! them, which is why [`reflection`](crate::reflection) compares child sets
//! rather than trusting `return` alone.

mod id;
mod store;
mod traverse;

pub use id::{ContainerId, FiberId, INVALID, InstanceId, RootIndex, StateNode};
pub use store::{FiberStore, Props};
pub use traverse::{Children, Descendants};
