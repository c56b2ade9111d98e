// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Committing a finished render to the host.
//!
//! One pass over the effect list applies every host mutation in order:
//!
//! - [`PLACEMENT`](EffectTag::PLACEMENT): insert the fiber's top-level host
//!   nodes under the nearest host parent, before the nearest host sibling
//!   that is already in place.
//! - [`UPDATE`](EffectTag::UPDATE): patch attributes or text.
//! - [`DELETION`](EffectTag::DELETION): remove the top-level host nodes of
//!   the subtree (portal content from the portal's container), then free the
//!   subtree and its alternates.
//!
//! Afterwards the root's `current` pointer flips to the finished tree and
//! the consumed updates leave the queue.

#[cfg(feature = "trace-rich")]
use alloc::vec::Vec;

use super::RenderState;
use crate::fiber::{ContainerId, INVALID, InstanceId, Props, StateNode};
use crate::host::{Host, HostParent};
use crate::reconciler::Reconciler;
use crate::tag::{EffectTag, WorkTag};
#[cfg(feature = "trace-rich")]
use crate::trace::FiberEffect;
use crate::trace::{CommitSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind};

impl<H: Host> Reconciler<H> {
    /// Applies a finished render and makes it the committed tree.
    pub(crate) fn commit_root(&mut self, render: RenderState) {
        debug_assert!(render.is_finished(), "only finished renders commit");
        let root = render.root;
        let container = render.container;
        let expiration = render.expiration;
        self.scheduler.is_committing = true;
        let timestamp_ms = self.host.now();
        self.tracer.phase_begin(&PhaseBeginEvent {
            root: root.idx,
            phase: PhaseKind::Commit,
            expiration,
            timestamp_ms,
        });

        self.host.prepare_for_commit(container);
        let mut summary = CommitSummary {
            root: root.idx,
            expiration,
            ..CommitSummary::default()
        };
        #[cfg(feature = "trace-rich")]
        let mut records = Vec::new();
        for &fiber in &render.log.effects {
            let f = fiber as usize;
            let effect = self.fibers.effect[f];
            #[cfg(feature = "trace-rich")]
            records.push(FiberEffect {
                fiber,
                tag: self.fibers.tag[f],
                effect,
            });
            if effect.contains(EffectTag::DELETION) {
                self.commit_deletion(fiber, container);
                summary.deletions += 1;
                continue;
            }
            if effect.contains(EffectTag::PLACEMENT) {
                self.commit_placement(fiber, container);
                self.fibers.effect[f].remove(EffectTag::PLACEMENT);
                summary.placements += 1;
            }
            if effect.contains(EffectTag::UPDATE) {
                self.commit_work(fiber);
                summary.updates += 1;
            }
        }
        self.host.reset_after_commit(container);

        let finished = self.fibers.id_at(render.root_wip);
        self.fibers.set_root_current(finished);
        // Previous versions see the committed child lists from now on.
        for &wip in &render.log.touched {
            let w = wip as usize;
            if !self.fibers.live[w] {
                continue;
            }
            let previous = self.fibers.alternate[w];
            if previous != INVALID {
                self.fibers.child[previous as usize] = self.fibers.child[w];
            }
        }
        self.scheduler.is_committing = false;

        if let Some(state) = self.roots.get_mut(root) {
            let handles = state.queue.commit(&render.queue, expiration);
            state.hydrate = false;
            state.remaining = state.queue.remaining();
            let remaining = state.remaining;
            self.scheduler.committed_work.extend(handles);
            if !remaining.is_no_work() {
                self.add_root_to_schedule(root);
            }
        }

        let timestamp_ms = self.host.now();
        summary.timestamp_ms = timestamp_ms;
        #[cfg(feature = "trace-rich")]
        self.tracer.fiber_effects(root.idx, &records);
        self.tracer.commit_summary(&summary);
        self.tracer.phase_end(&PhaseEndEvent {
            root: root.idx,
            phase: PhaseKind::Commit,
            expiration,
            timestamp_ms,
        });
    }

    /// Returns the host node the children of `fiber`'s nearest host ancestor
    /// are attached to.
    fn host_parent(&self, fiber: u32, container: ContainerId) -> HostParent {
        let mut parent = self.fibers.ret[fiber as usize];
        while parent != INVALID {
            let p = parent as usize;
            match (self.fibers.tag[p], self.fibers.state_node[p]) {
                (WorkTag::HostComponent, StateNode::Instance(instance)) => {
                    return HostParent::Instance(instance);
                }
                (WorkTag::HostRoot, _) => return HostParent::Container(container),
                (WorkTag::HostPortal, StateNode::Portal(portal)) => {
                    return HostParent::Container(portal);
                }
                _ => {}
            }
            parent = self.fibers.ret[p];
        }
        panic!("Expected to find a host parent. This error is likely caused by a bug in the reconciler.");
    }

    /// Finds the host node `fiber`'s nodes must be inserted before: the next
    /// host node in tree order under the same host parent that is not itself
    /// about to be placed.
    fn host_sibling(&mut self, fiber: u32) -> Option<InstanceId> {
        let store = &mut self.fibers;
        let mut node = fiber;
        'siblings: loop {
            while store.sibling[node as usize] == INVALID {
                let up = store.ret[node as usize];
                if up == INVALID || store.tag[up as usize].is_host_parent() {
                    return None;
                }
                node = up;
            }
            let sibling = store.sibling[node as usize];
            store.ret[sibling as usize] = store.ret[node as usize];
            node = sibling;
            while !store.tag[node as usize].is_host() {
                let n = node as usize;
                if store.effect[n].contains(EffectTag::PLACEMENT)
                    || store.child[n] == INVALID
                    || store.tag[n] == WorkTag::HostPortal
                {
                    continue 'siblings;
                }
                let child = store.child[n];
                store.ret[child as usize] = node;
                node = child;
            }
            if !store.effect[node as usize].contains(EffectTag::PLACEMENT)
                && let StateNode::Instance(instance) = store.state_node[node as usize]
            {
                return Some(instance);
            }
        }
    }

    fn commit_placement(&mut self, fiber: u32, container: ContainerId) {
        let parent = self.host_parent(fiber, container);
        let before = self.host_sibling(fiber);
        let mut node = fiber;
        loop {
            let n = node as usize;
            let tag = self.fibers.tag[n];
            if tag.is_host() {
                if let StateNode::Instance(instance) = self.fibers.state_node[n] {
                    match before {
                        Some(before) => self.host.insert_before(parent, instance, before),
                        None => self.host.append_child(parent, instance),
                    }
                }
            } else if tag != WorkTag::HostPortal && self.fibers.child[n] != INVALID {
                let child = self.fibers.child[n];
                self.fibers.ret[child as usize] = node;
                node = child;
                continue;
            }
            if node == fiber {
                return;
            }
            while self.fibers.sibling[node as usize] == INVALID {
                let up = self.fibers.ret[node as usize];
                if up == INVALID || up == fiber {
                    return;
                }
                node = up;
            }
            let sibling = self.fibers.sibling[node as usize];
            self.fibers.ret[sibling as usize] = self.fibers.ret[node as usize];
            node = sibling;
        }
    }

    fn commit_work(&mut self, fiber: u32) {
        let f = fiber as usize;
        let StateNode::Instance(instance) = self.fibers.state_node[f] else {
            return;
        };
        let current = self.fibers.alternate[f];
        let old = if current == INVALID {
            None
        } else {
            Some(self.fibers.memoized_props[current as usize].clone())
        };
        match (&self.fibers.memoized_props[f], old) {
            (Props::Element(new), Some(Props::Element(old))) => {
                self.host
                    .commit_update(instance, &new.ty, &old.attributes, &new.attributes);
            }
            (Props::Element(new), _) => {
                self.host
                    .commit_update(instance, &new.ty, &new.attributes, &new.attributes);
            }
            (Props::Text(new), Some(Props::Text(old))) => {
                self.host.commit_text_update(instance, &old, new);
            }
            (Props::Text(new), _) => self.host.commit_text_update(instance, new, new),
            _ => {}
        }
    }

    /// Removes the host nodes of the subtree at `fiber` and frees it.
    ///
    /// Only the topmost host nodes leave their parent; nodes below them go
    /// with it. Portal content is removed from the portal's container.
    fn commit_deletion(&mut self, fiber: u32, container: ContainerId) {
        let outer = self.host_parent(fiber, container);
        let stop = self.fibers.ret[fiber as usize];
        let mut node = fiber;
        'walk: loop {
            let n = node as usize;
            if self.fibers.tag[n].is_host()
                && let StateNode::Instance(instance) = self.fibers.state_node[n]
                && let Some(parent) = self.removal_parent(node, stop, outer)
            {
                self.host.remove_child(parent, instance);
            }
            let child = self.fibers.child[n];
            if child != INVALID {
                self.fibers.ret[child as usize] = node;
                node = child;
                continue;
            }
            if node == fiber {
                break;
            }
            while self.fibers.sibling[node as usize] == INVALID {
                let up = self.fibers.ret[node as usize];
                if up == INVALID || up == fiber {
                    break 'walk;
                }
                node = up;
            }
            let sibling = self.fibers.sibling[node as usize];
            self.fibers.ret[sibling as usize] = self.fibers.ret[node as usize];
            node = sibling;
        }
        self.fibers.free_subtree(fiber);
    }

    /// Returns the parent a deleted host node must leave, or `None` when a
    /// deleted host ancestor takes it along.
    fn removal_parent(&self, node: u32, stop: u32, outer: HostParent) -> Option<HostParent> {
        let mut up = self.fibers.ret[node as usize];
        while up != stop && up != INVALID {
            let u = up as usize;
            match (self.fibers.tag[u], self.fibers.state_node[u]) {
                (WorkTag::HostPortal, StateNode::Portal(portal)) => {
                    return Some(HostParent::Container(portal));
                }
                (tag, _) if tag.is_host() => return None,
                _ => {}
            }
            up = self.fibers.ret[u];
        }
        Some(outer)
    }
}
