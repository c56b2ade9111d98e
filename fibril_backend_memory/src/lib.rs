// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory document host for fibril.
//!
//! [`MemoryDocument`] is a small DOM: elements, text, comments, documents and
//! document fragments in one slot arena. It implements
//! [`Host`](fibril_core::host::Host), records every mutation the reconciler
//! applies, and serializes containers to HTML so tests can compare the
//! rendered result as a string.
//!
//! ```rust,ignore
//! let mut doc = MemoryDocument::new();
//! let container = doc.create_element_container("div");
//! let mut reconciler = Reconciler::new(doc, SchedulerConfig::default());
//! reconciler.legacy_render(container, Element::new("p").child("hi").into(), None)?;
//! assert_eq!(reconciler.host().to_html(container), "<p>hi</p>");
//! ```
//!
//! Time does not pass on its own: advance the clock with
//! [`MemoryDocument::advance`] to make deferred work expire.

mod document;
mod host;

pub use document::{MOUNT_POINT_COMMENT, MemoryDocument, Mutation, NodeKind};
