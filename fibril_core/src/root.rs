// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Roots and their update queues.
//!
//! A root owns one host-root fiber pair (through a record in the
//! [`FiberStore`](crate::fiber::FiberStore)), the queue of updates that have
//! been scheduled against it, and its ordered list of pending
//! [`Batch`]es.
//!
//! # Update queue
//!
//! Each update carries the element to render and the expiration time it was
//! scheduled at. A render at expiration `e` applies, in enqueue order, every
//! update with an expiration time at or below `e`; the last one wins.
//! Updates that are skipped stay queued, and so does every update after the
//! first skipped one: the queue's *base state* stays at the state before the
//! first skipped update so that a later render replays the remaining updates
//! in their original order.

use alloc::vec::Vec;
use core::fmt;

use crate::batch::Batch;
use crate::expiration::ExpirationTime;
use crate::fiber::{ContainerId, FiberId, RootIndex};
use crate::handle::Work;
use crate::node::Node;
use crate::work::RenderState;

/// A handle to a root in a [`Reconciler`](crate::reconciler::Reconciler).
///
/// Handles become stale once the root is destroyed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl RootId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }
}

impl fmt::Debug for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootId({}@gen{})", self.idx, self.generation)
    }
}

/// Options for concurrent roots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RootOptions {
    /// Claim the container's existing content on the first render instead of
    /// clearing it.
    pub hydrate: bool,
}

/// One scheduled update of a root.
#[derive(Debug)]
pub(crate) struct Update {
    pub(crate) expiration: ExpirationTime,
    pub(crate) element: Node,
    pub(crate) callback: Option<Work>,
}

/// Result of replaying a queue for one render.
#[derive(Clone, Debug, Default)]
pub(crate) struct ProcessedQueue {
    /// Element after applying every update that fits the render.
    pub(crate) state: Node,
    /// State to keep as the new base after commit.
    pub(crate) new_base: Node,
    /// Index of the first skipped update.
    pub(crate) first_skipped: Option<usize>,
    /// Queue length when processed.
    pub(crate) processed_len: usize,
    /// Whether any update was applied.
    pub(crate) applied: bool,
    /// Most urgent expiration time among the skipped updates.
    pub(crate) remaining: ExpirationTime,
}

/// Ordered updates of a host root.
#[derive(Debug, Default)]
pub(crate) struct UpdateQueue {
    base_state: Node,
    updates: Vec<Update>,
    /// Most urgent expiration time among updates no render has applied yet.
    expiration: ExpirationTime,
}

impl UpdateQueue {
    pub(crate) fn push(&mut self, update: Update) {
        self.expiration = self.expiration.most_urgent(update.expiration);
        self.updates.push(update);
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Returns the most urgent expiration time among updates that still
    /// have to be applied.
    ///
    /// Updates kept only for rebasing behind a skipped one do not count.
    pub(crate) fn remaining(&self) -> ExpirationTime {
        self.expiration
    }

    /// Replays the queue for a render at `expiration` without consuming it.
    pub(crate) fn process(&self, expiration: ExpirationTime) -> ProcessedQueue {
        let mut state = self.base_state.clone();
        let mut new_base = None;
        let mut first_skipped = None;
        let mut applied = false;
        let mut remaining = ExpirationTime::NO_WORK;
        for (i, update) in self.updates.iter().enumerate() {
            if update.expiration.within(expiration) {
                state = update.element.clone();
                applied = true;
            } else {
                if first_skipped.is_none() {
                    first_skipped = Some(i);
                    new_base = Some(state.clone());
                }
                remaining = remaining.most_urgent(update.expiration);
            }
        }
        ProcessedQueue {
            new_base: new_base.unwrap_or_else(|| state.clone()),
            state,
            first_skipped,
            processed_len: self.updates.len(),
            applied,
            remaining,
        }
    }

    /// Commits a processed replay: drops the consumed prefix, rebases, and
    /// returns the handles of every update applied by the render.
    pub(crate) fn commit(&mut self, processed: &ProcessedQueue, expiration: ExpirationTime) -> Vec<Work> {
        let mut handles = Vec::new();
        for update in self.updates.iter_mut().take(processed.processed_len) {
            if update.expiration.within(expiration) {
                handles.extend(update.callback.take());
            }
        }
        self.expiration = self.updates[processed.processed_len..]
            .iter()
            .fold(processed.remaining, |acc, u| acc.most_urgent(u.expiration));
        let consumed = processed.first_skipped.unwrap_or(processed.processed_len);
        self.updates.drain(..consumed);
        self.base_state = processed.new_base.clone();
        handles
    }
}

/// Per-root state owned by the reconciler.
#[derive(Debug)]
pub(crate) struct RootState {
    pub(crate) container: ContainerId,
    pub(crate) record: RootIndex,
    pub(crate) concurrent: bool,
    pub(crate) hydrate: bool,
    pub(crate) queue: UpdateQueue,
    /// Most urgent pending expiration time, or `NO_WORK` when unscheduled.
    pub(crate) remaining: ExpirationTime,
    /// A completed render waiting to commit.
    pub(crate) finished: Option<RenderState>,
    /// Pending batches, most urgent first.
    pub(crate) batches: Vec<Batch>,
    /// Parent fiber of the last legacy subtree render.
    pub(crate) context: Option<FiberId>,
}

impl RootState {
    pub(crate) fn new(container: ContainerId, record: RootIndex, concurrent: bool, hydrate: bool) -> Self {
        Self {
            container,
            record,
            concurrent,
            hydrate,
            queue: UpdateQueue::default(),
            remaining: ExpirationTime::NO_WORK,
            finished: None,
            batches: Vec::new(),
            context: None,
        }
    }
}

#[derive(Debug)]
struct RootSlot {
    generation: u32,
    state: Option<RootState>,
}

/// Generational table of roots.
#[derive(Debug, Default)]
pub(crate) struct RootTable {
    slots: Vec<RootSlot>,
    free_list: Vec<u32>,
}

impl RootTable {
    pub(crate) fn insert(&mut self, state: RootState) -> RootId {
        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.state = Some(state);
            RootId {
                idx,
                generation: slot.generation,
            }
        } else {
            let idx = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(RootSlot {
                generation: 0,
                state: Some(state),
            });
            RootId { idx, generation: 0 }
        }
    }

    pub(crate) fn get(&self, id: RootId) -> Option<&RootState> {
        self.slots
            .get(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.state.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: RootId) -> Option<&mut RootState> {
        self.slots
            .get_mut(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.state.as_mut())
    }

    pub(crate) fn remove(&mut self, id: RootId) -> Option<RootState> {
        let slot = self
            .slots
            .get_mut(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let state = slot.state.take()?;
        slot.generation += 1;
        self.free_list.push(id.idx);
        Some(state)
    }
}
