// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Explicitly committed batches of work.
//!
//! A [`Batch`] renders into its root at a fixed expiration time but does not
//! let that render commit until [`Batch::commit`] is called. Each root keeps
//! its pending batches in ascending expiration order; batches with equal
//! expiration times keep their creation order.
//!
//! # Lifecycle
//!
//! ```text
//!   PendingEmpty ──render()──► PendingWithChildren ──commit()──► Committed
//!        │                                                          ▲
//!        └──────────────────────── commit() ───────────────────────┘
//! ```
//!
//! Committing a batch that is not at the head of the list first promotes it
//! to the head's expiration time and renders it again, so flushing it also
//! flushes everything queued ahead of it. Once committed, the batch leaves
//! the list, and a new head that already has children is rendered again so
//! the list keeps draining.
//!
//! [`Batch::then`] callbacks fire when the batch's render has *completed*,
//! which for a deferred batch is before it commits.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::error::{Error, Result};
use crate::expiration::ExpirationTime;
use crate::handle::{Callback, Work};
use crate::host::Host;
use crate::node::Node;
use crate::reconciler::Reconciler;
use crate::root::RootId;
use crate::trace::{BatchEvent, BatchEventKind};

/// Where a batch is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BatchPhase {
    /// Created; no children rendered yet.
    PendingEmpty,
    /// Children rendered; waiting for [`Batch::commit`].
    PendingWithChildren,
    /// Committed (or committing).
    Committed,
}

/// A deferred, explicitly committed unit of work on one root.
///
/// Cloning yields another handle to the same batch.
#[derive(Clone)]
pub struct Batch {
    state: Rc<RefCell<BatchState>>,
}

struct BatchState {
    root: RootId,
    expiration: ExpirationTime,
    phase: BatchPhase,
    children: Node,
    did_complete: bool,
    callbacks: Vec<Callback>,
}

impl Batch {
    pub(crate) fn new(root: RootId, expiration: ExpirationTime) -> Self {
        Self {
            state: Rc::new(RefCell::new(BatchState {
                root,
                expiration,
                phase: BatchPhase::PendingEmpty,
                children: Node::Empty,
                did_complete: false,
                callbacks: Vec::new(),
            })),
        }
    }

    /// Returns the root this batch renders into.
    #[must_use]
    pub fn root(&self) -> RootId {
        self.state.borrow().root
    }

    /// Returns the expiration time the batch renders at.
    #[must_use]
    pub fn expiration(&self) -> ExpirationTime {
        self.state.borrow().expiration
    }

    /// Returns the lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> BatchPhase {
        self.state.borrow().phase
    }

    /// Returns whether the batch's render has completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.borrow().did_complete
    }

    /// Registers `on_complete` to run once the batch's render completes.
    ///
    /// Fires immediately if it already has.
    pub fn then(&self, on_complete: impl FnOnce() + 'static) {
        let mut state = self.state.borrow_mut();
        if state.did_complete {
            drop(state);
            on_complete();
            return;
        }
        state.callbacks.push(Box::new(on_complete));
    }

    /// Renders `children` into the batch's root at the batch's expiration
    /// time. See [`Reconciler::render_batch`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleRoot`] if the root was destroyed.
    ///
    /// # Panics
    ///
    /// Panics if the batch has already committed.
    pub fn render<H: Host>(&self, reconciler: &mut Reconciler<H>, children: Node) -> Result<Work> {
        reconciler.render_batch(self, children)
    }

    /// Commits the batch. See [`Reconciler::commit_batch`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleRoot`] if the root was destroyed.
    ///
    /// # Panics
    ///
    /// Panics if the batch has already committed.
    pub fn commit<H: Host>(&self, reconciler: &mut Reconciler<H>) -> Result<()> {
        reconciler.commit_batch(self)
    }

    /// Returns whether both handles refer to the same batch.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    pub(crate) fn children(&self) -> Node {
        self.state.borrow().children.clone()
    }

    pub(crate) fn set_expiration(&self, expiration: ExpirationTime) {
        self.state.borrow_mut().expiration = expiration;
    }

    pub(crate) fn set_phase(&self, phase: BatchPhase) {
        self.state.borrow_mut().phase = phase;
    }

    /// Marks the render complete and fires the queued callbacks once.
    ///
    /// Returns `false` if the batch had already completed.
    pub(crate) fn on_complete(&self) -> bool {
        let callbacks = {
            let mut state = self.state.borrow_mut();
            if state.did_complete {
                return false;
            }
            state.did_complete = true;
            core::mem::take(&mut state.callbacks)
        };
        for callback in callbacks {
            callback();
        }
        true
    }
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Batch")
            .field("root", &state.root)
            .field("expiration", &state.expiration)
            .field("phase", &state.phase)
            .field("did_complete", &state.did_complete)
            .finish_non_exhaustive()
    }
}

/// Inserts `batch` after every batch whose expiration time is not later.
pub(crate) fn insert_batch(list: &mut Vec<Batch>, batch: Batch) {
    let expiration = batch.expiration();
    let at = list.partition_point(|b| b.expiration() <= expiration);
    list.insert(at, batch);
}

/// Removes `batch` from the list, returning whether it was listed.
pub(crate) fn remove_batch(list: &mut Vec<Batch>, batch: &Batch) -> bool {
    if let Some(at) = list.iter().position(|b| b.ptr_eq(batch)) {
        list.remove(at);
        true
    } else {
        false
    }
}

impl<H: Host> Reconciler<H> {
    /// Creates a batch on `root` at a fresh, unique low-priority expiration
    /// time and inserts it into the root's batch list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleRoot`] if the root was destroyed.
    pub fn create_batch(&mut self, root: RootId) -> Result<Batch> {
        let expiration = self.compute_unique_async_expiration();
        let state = self.roots.get_mut(root).ok_or(Error::StaleRoot)?;
        let batch = Batch::new(root, expiration);
        insert_batch(&mut state.batches, batch.clone());
        self.trace_batch(root, expiration, BatchEventKind::Created);
        Ok(batch)
    }

    /// Renders `children` into the batch's root at the batch's expiration
    /// time and returns the update's completion handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleRoot`] if the root was destroyed.
    ///
    /// # Panics
    ///
    /// Panics if the batch has already committed.
    pub fn render_batch(&mut self, batch: &Batch, children: Node) -> Result<Work> {
        assert!(
            batch.phase() != BatchPhase::Committed,
            "batch.render: Cannot render a batch that already committed."
        );
        let root = batch.root();
        if self.roots.get(root).is_none() {
            return Err(Error::StaleRoot);
        }
        {
            let mut state = batch.state.borrow_mut();
            state.phase = BatchPhase::PendingWithChildren;
            state.children = children.clone();
        }
        let expiration = batch.expiration();
        let work = Work::new();
        self.update_container_at_expiration(root, children, expiration, Some(work.clone()))?;
        self.trace_batch(root, expiration, BatchEventKind::Rendered);
        Ok(work)
    }

    /// Commits a batch, flushing its root up to the batch's (possibly
    /// promoted) expiration time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleRoot`] if the root was destroyed.
    ///
    /// # Panics
    ///
    /// Panics if the batch has already committed, or if called while the
    /// reconciler is rendering.
    pub fn commit_batch(&mut self, batch: &Batch) -> Result<()> {
        assert!(
            batch.phase() != BatchPhase::Committed,
            "batch.commit: Cannot commit a batch multiple times."
        );
        let root = batch.root();
        let state = self.roots.get_mut(root).ok_or(Error::StaleRoot)?;

        if batch.phase() == BatchPhase::PendingEmpty {
            batch.set_phase(BatchPhase::Committed);
            remove_batch(&mut state.batches, batch);
            self.trace_batch(root, batch.expiration(), BatchEventKind::Committed);
            return Ok(());
        }

        let head = state.batches.first().cloned();
        let mut expiration = batch.expiration();
        if let Some(head) = head.filter(|head| !head.ptr_eq(batch)) {
            // Promote to the head's priority and re-render so flushing this
            // batch also flushes everything queued ahead of it.
            expiration = head.expiration();
            batch.set_expiration(expiration);
            self.render_batch(batch, batch.children())?;
            let state = self.roots.get_mut(root).ok_or(Error::StaleRoot)?;
            remove_batch(&mut state.batches, batch);
            state.batches.insert(0, batch.clone());
        }

        batch.set_phase(BatchPhase::Committed);
        self.flush_root(root, expiration);
        self.trace_batch(root, expiration, BatchEventKind::Committed);

        let Some(state) = self.roots.get_mut(root) else {
            return Ok(());
        };
        remove_batch(&mut state.batches, batch);
        let next = state
            .batches
            .first()
            .filter(|next| next.phase() == BatchPhase::PendingWithChildren)
            .cloned();
        if let Some(next) = next {
            self.render_batch(&next, next.children())?;
        }
        Ok(())
    }

    fn trace_batch(&mut self, root: RootId, expiration: ExpirationTime, kind: BatchEventKind) {
        self.tracer.batch(&BatchEvent {
            root: root.idx,
            expiration,
            kind,
        });
    }
}
