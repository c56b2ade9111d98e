// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The work loop: building a work-in-progress tree and committing it.
//!
//! A render walks the tree depth first, one *unit of work* per fiber:
//!
//! ```text
//!   begin(fiber) ──► child? ──yes──► next unit = child
//!                      │
//!                      no
//!                      ▼
//!   complete(fiber) ──► sibling? ──yes──► next unit = sibling
//!        ▲               │
//!        │               no
//!        └── complete(return) ◄┘        (until the host root completes)
//! ```
//!
//! [`begin`] reconciles a fiber's children ([`child`]), [`complete`] creates
//! or diffs its host instance, and the commit pass ([`commit`]) applies the
//! collected effects to the [`Host`](crate::host::Host) and flips the root's
//! `current` pointer.
//!
//! A render only ever writes to work-in-progress fibers and to fibers it
//! allocated itself, so it can be abandoned at any unit boundary:
//! [`Reconciler::discard_render`] frees what the render allocated and puts
//! the reused alternates back the way the committed tree sees them.

mod begin;
mod child;
mod commit;
mod complete;
mod hydration;

use alloc::rc::Rc;
use alloc::vec::Vec;

pub(crate) use hydration::Hydration;

use crate::error::{Error, Result};
use crate::expiration::ExpirationTime;
use crate::fiber::{ContainerId, INVALID, InstanceId, Props};
use crate::host::Host;
use crate::reconciler::Reconciler;
use crate::root::{ProcessedQueue, RootId};
use crate::tag::EffectTag;

/// Fibers a render allocated, reused, or marked.
#[derive(Debug, Default)]
pub(crate) struct RenderLog {
    /// Fibers allocated by this render.
    pub(crate) fresh: Vec<u32>,
    /// Alternates reused as work-in-progress fibers.
    pub(crate) touched: Vec<u32>,
    /// Fibers with host effects, in commit order.
    pub(crate) effects: Vec<u32>,
    /// Host instances created by this render, children first.
    pub(crate) instances: Vec<InstanceId>,
}

/// An in-progress or finished render of one root.
#[derive(Debug)]
pub(crate) struct RenderState {
    pub(crate) root: RootId,
    pub(crate) expiration: ExpirationTime,
    pub(crate) container: ContainerId,
    pub(crate) root_wip: u32,
    pub(crate) next_unit: u32,
    pub(crate) queue: ProcessedQueue,
    pub(crate) log: RenderLog,
    pub(crate) hydration: Hydration,
    /// Units of work performed so far.
    pub(crate) units: u32,
}

impl RenderState {
    pub(crate) fn is_finished(&self) -> bool {
        self.next_unit == INVALID
    }
}

impl<H: Host> Reconciler<H> {
    /// Starts a fresh render of `root` at `expiration`.
    pub(crate) fn prepare_render(&mut self, root: RootId, expiration: ExpirationTime) -> Result<RenderState> {
        let state = self.roots.get(root).ok_or(Error::StaleRoot)?;
        let queue = state.queue.process(expiration);
        let container = state.container;
        let current = self.fibers.root_current[state.record.0 as usize];
        let hydrate = state.hydrate && self.fibers.child[current as usize] == INVALID;

        // An untouched queue keeps the memoized children, so the root bails out.
        let pending = if queue.applied {
            Props::Children(Rc::from([queue.state.clone()]))
        } else {
            self.fibers.memoized_props[current as usize].clone()
        };
        let root_wip = self.fibers.work_in_progress_at(current, pending);

        let mut render = RenderState {
            root,
            expiration,
            container,
            root_wip,
            next_unit: root_wip,
            queue,
            log: RenderLog::default(),
            hydration: Hydration::default(),
            units: 0,
        };
        render.log.touched.push(root_wip);
        if hydrate {
            render.hydration.enter(&self.host, root_wip, container);
        }
        Ok(render)
    }

    /// Performs units of work until the render finishes or `budget` runs out.
    ///
    /// `None` is an unlimited budget. Returns whether the render finished.
    pub(crate) fn work_loop(&mut self, render: &mut RenderState, budget: &mut Option<u32>) -> bool {
        while render.next_unit != INVALID {
            if *budget == Some(0) {
                return false;
            }
            render.next_unit = self.perform_unit_of_work(render, render.next_unit);
            render.units += 1;
            if let Some(left) = budget {
                *left -= 1;
            }
        }
        true
    }

    fn perform_unit_of_work(&mut self, render: &mut RenderState, unit: u32) -> u32 {
        let next = self.begin_work(render, unit);
        if next == INVALID {
            self.complete_unit_of_work(render, unit)
        } else {
            next
        }
    }

    /// Completes `unit` and its ancestors until one has a sibling left to
    /// begin. Returns that sibling, or `INVALID` once the root completed.
    fn complete_unit_of_work(&mut self, render: &mut RenderState, unit: u32) -> u32 {
        let mut fiber = unit;
        loop {
            self.complete_work(render, fiber);
            if self.fibers.effect[fiber as usize].intersects(EffectTag::HOST_EFFECTS) {
                render.log.effects.push(fiber);
            }
            if fiber == render.root_wip {
                return INVALID;
            }
            let sibling = self.fibers.sibling[fiber as usize];
            if sibling != INVALID {
                return sibling;
            }
            fiber = self.fibers.ret[fiber as usize];
            if fiber == INVALID {
                return INVALID;
            }
        }
    }

    /// Abandons a render, returning the number of fibers it freed.
    ///
    /// Reused alternates get their committed links back, deletion marks on
    /// committed fibers are cleared, and fibers the render allocated are
    /// freed. Host instances the render created go back to the host.
    pub(crate) fn discard_render(&mut self, render: RenderState) -> u32 {
        let store = &mut self.fibers;
        for &wip in &render.log.touched {
            let w = wip as usize;
            if !store.live[w] {
                continue;
            }
            let current = store.alternate[w];
            if current != INVALID {
                let c = current as usize;
                store.child[w] = store.child[c];
                store.sibling[w] = store.sibling[c];
                store.index[w] = store.index[c];
            }
            store.effect[w] = EffectTag::NONE;
        }
        for &fiber in &render.log.effects {
            if store.live[fiber as usize] {
                store.effect[fiber as usize] = EffectTag::NONE;
            }
        }
        for &fiber in &render.log.fresh {
            store.free(fiber);
        }
        for &instance in render.log.instances.iter().rev() {
            self.host.release_instance(instance);
        }
        u32::try_from(render.log.fresh.len()).unwrap_or(u32::MAX)
    }
}
