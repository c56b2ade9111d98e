// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fiber reconciliation with expiration-time scheduling.
//!
//! `fibril_core` keeps two versions of a UI tree (the committed *current*
//! tree and a *work-in-progress* tree), diffs new element descriptions
//! against the committed one, and applies the resulting mutations to a
//! rendering target through the [`Host`](host::Host) trait. It is `no_std`
//! compatible (with `alloc`) and stores fibers in struct-of-arrays form
//! behind generational handles.
//!
//! # Architecture
//!
//! ```text
//!   Reconciler::render(root, Node) ──► update queue ──► schedule_work
//!                                                            │
//!                 ┌──────────────────────────────────────────┘
//!                 ▼
//!   perform_work ──► render (begin / complete per fiber) ──► effect list
//!                                                                │
//!                 ┌──────────────────────────────────────────────┘
//!                 ▼
//!   commit ──► Host mutations ──► current flips ──► Work::then callbacks
//! ```
//!
//! **[`node`]**: Immutable, reference-counted element descriptions.
//!
//! **[`fiber`]**: Struct-of-arrays fiber store with generational handles and
//! the current / work-in-progress pairing.
//!
//! **[`reflection`]**: Mount status of a fiber and which of it and its
//! alternate belongs to the committed tree; first host descendant lookup.
//!
//! **[`expiration`]** and **[`scheduler`]**: Priorities as deadlines, the
//! scheduled-root list, batching contexts, and deferred work under a
//! [`WorkBudget`](scheduler::WorkBudget).
//!
//! **[`root`]**, **[`batch`]**, **[`handle`]**: Roots with their update
//! queues, explicitly committed batches, and single-fire completion handles.
//!
//! **[`container`]**: The legacy one-root-per-container API with hydration
//! of server-rendered markup.
//!
//! **[`devtools`]**: Renderer identification and host instance lookups for
//! external tools.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! render and commit instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-fiber
//!   effect records.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod batch;
pub mod container;
pub mod devtools;
pub mod error;
pub mod expiration;
pub mod fiber;
pub mod handle;
pub mod host;
pub mod node;
pub mod reconciler;
pub mod reflection;
pub mod root;
pub mod scheduler;
pub mod tag;
pub mod trace;
mod work;

pub use error::{Error, Result};
pub use reconciler::Reconciler;
