// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Claiming pre-existing host content on a root's first render.
//!
//! While hydrating, every fresh host fiber tries to claim the host node under
//! a cursor that walks the existing content in document order. A claimed
//! element opens a new level whose cursor starts at its first child; when
//! the element completes, whatever its level did not claim is deleted.
//!
//! A fiber that cannot claim the node under the cursor is inserted instead
//! (marked [`PLACEMENT`](crate::tag::EffectTag::PLACEMENT)), and the
//! cursor stays where it is so later siblings can still claim it. The
//! subtree of an inserted element mounts from scratch, and so do portals.

use alloc::vec::Vec;

use super::RenderState;
use crate::fiber::{ContainerId, INVALID, InstanceId, StateNode};
use crate::host::Host;
use crate::reconciler::Reconciler;
use crate::tag::{EffectTag, WorkTag};

/// A hydration level opened by one fiber.
#[derive(Debug)]
struct Frame {
    fiber: u32,
    parent_cursor: Option<InstanceId>,
    parent_active: bool,
}

/// Hydration cursor state of one render.
#[derive(Debug, Default)]
pub(crate) struct Hydration {
    pub(crate) active: bool,
    cursor: Option<InstanceId>,
    frames: Vec<Frame>,
}

impl Hydration {
    /// Starts hydrating the content of `container` below the root fiber.
    pub(crate) fn enter<H: Host>(&mut self, host: &H, root: u32, container: ContainerId) {
        self.frames.push(Frame {
            fiber: root,
            parent_cursor: None,
            parent_active: false,
        });
        self.active = true;
        self.cursor = host.first_hydratable_child_of_container(container);
    }

    /// Opens a level below `fiber`. A `None` cursor with `hydrate` off stops
    /// hydrating until the level closes.
    fn push(&mut self, fiber: u32, hydrate: bool, cursor: Option<InstanceId>) {
        self.frames.push(Frame {
            fiber,
            parent_cursor: self.cursor,
            parent_active: self.active,
        });
        self.active = hydrate;
        self.cursor = cursor;
    }

    /// Stops hydrating below a portal until it completes.
    pub(crate) fn enter_portal(&mut self, fiber: u32) {
        if self.active {
            self.push(fiber, false, None);
        }
    }
}

impl<H: Host> Reconciler<H> {
    /// Tries to claim the host node under the cursor for the fresh host fiber
    /// `wip`. Returns whether it was claimed.
    pub(crate) fn try_to_claim(&mut self, render: &mut RenderState, wip: u32) -> bool {
        let w = wip as usize;
        let mut claimed = self.claimable(render.hydration.cursor, wip);
        if claimed.is_none() {
            // One mismatched node is skipped when the next one fits.
            if let Some(skipped) = render.hydration.cursor {
                let next = self.host.next_hydratable_sibling(skipped);
                claimed = self.claimable(next, wip);
                if claimed.is_some() {
                    let parent = self.fibers.ret[w];
                    self.delete_hydratable(render, parent, skipped);
                }
            }
        }

        let Some(instance) = claimed else {
            self.fibers.effect[w] |= EffectTag::PLACEMENT;
            if self.fibers.tag[w] == WorkTag::HostComponent {
                render.hydration.push(wip, false, None);
            }
            return false;
        };

        self.fibers.state_node[w] = StateNode::Instance(instance);
        render.hydration.cursor = self.host.next_hydratable_sibling(instance);
        if self.fibers.tag[w] == WorkTag::HostComponent {
            let first = self.host.first_hydratable_child(instance);
            render.hydration.push(wip, true, first);
        }
        true
    }

    fn claimable(&self, candidate: Option<InstanceId>, wip: u32) -> Option<InstanceId> {
        let instance = candidate?;
        let w = wip as usize;
        let fits = match self.fibers.tag[w] {
            WorkTag::HostComponent => self.fibers.element_type[w]
                .as_deref()
                .is_some_and(|ty| self.host.can_hydrate_instance(instance, ty)),
            WorkTag::HostText => self.host.can_hydrate_text_instance(instance),
            _ => false,
        };
        fits.then_some(instance)
    }

    /// Schedules removal of an unclaimed host node below `parent`.
    fn delete_hydratable(&mut self, render: &mut RenderState, parent: u32, instance: InstanceId) {
        let fiber = self.fibers.alloc(WorkTag::HostComponent);
        let f = fiber as usize;
        self.fibers.state_node[f] = StateNode::Instance(instance);
        self.fibers.ret[f] = parent;
        self.fibers.effect[f] = EffectTag::DELETION;
        render.log.fresh.push(fiber);
        render.log.effects.push(fiber);
    }

    /// Closes the hydration level opened by `wip`, deleting what it left
    /// unclaimed. A no-op for fibers that opened no level.
    pub(crate) fn pop_hydration(&mut self, render: &mut RenderState, wip: u32) {
        if render.hydration.frames.last().is_none_or(|frame| frame.fiber != wip) {
            return;
        }
        if render.hydration.active {
            let mut leftover = render.hydration.cursor;
            while let Some(instance) = leftover {
                leftover = self.host.next_hydratable_sibling(instance);
                self.delete_hydratable(render, wip, instance);
            }
        }
        if let Some(frame) = render.hydration.frames.pop() {
            render.hydration.cursor = frame.parent_cursor;
            render.hydration.active = frame.parent_active;
        }
    }

    /// Returns whether the fresh fiber `wip` holds a claimed host node.
    pub(crate) fn was_claimed(&self, wip: u32) -> bool {
        let w = wip as usize;
        self.fibers.alternate[w] == INVALID && matches!(self.fibers.state_node[w], StateNode::Instance(_))
    }
}
