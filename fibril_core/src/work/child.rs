// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Child reconciliation: diffing a new child list against the current one.
//!
//! Children are matched by explicit key, or by position when they have none.
//! A match is reused when it mirrors the same kind of node (same tag, same
//! host type, same portal container); otherwise the old child is deleted and
//! a fresh fiber created.
//!
//! Moves are detected with a single "last placed index": walking the new
//! list in order, a reused child whose old index is lower than the highest
//! old index placed so far has moved and gets
//! [`PLACEMENT`](EffectTag::PLACEMENT); the others stay put.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::rc::Rc;

use super::RenderLog;
use crate::fiber::{FiberStore, INVALID, Props, StateNode};
use crate::node::Node;
use crate::tag::{EffectTag, WorkTag};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum ChildKey {
    Explicit(Rc<str>),
    Implicit(u32),
}

/// Returns the props a fiber for `node` renders with.
pub(crate) fn props_for(node: &Node) -> Props {
    match node {
        Node::Empty => Props::None,
        Node::Text(text) => Props::Text(text.clone()),
        Node::Element(element) => Props::Element(element.clone()),
        Node::Fragment(fragment) => Props::Children(fragment.children.clone()),
        Node::Portal(portal) => Props::Children(portal.children.clone()),
    }
}

fn tag_for(node: &Node) -> WorkTag {
    match node {
        Node::Text(_) => WorkTag::HostText,
        Node::Element(_) => WorkTag::HostComponent,
        Node::Portal(_) => WorkTag::HostPortal,
        Node::Empty | Node::Fragment(_) => WorkTag::Fragment,
    }
}

impl FiberStore {
    /// Creates a fresh fiber for `node` and records it in `log`.
    pub(crate) fn create_from_node(&mut self, node: &Node, log: &mut RenderLog) -> u32 {
        let idx = self.alloc(tag_for(node));
        let i = idx as usize;
        self.key[i] = node.key().cloned();
        match node {
            Node::Element(element) => self.element_type[i] = Some(element.ty.clone()),
            Node::Portal(portal) => self.state_node[i] = StateNode::Portal(portal.container),
            _ => {}
        }
        self.pending_props[i] = props_for(node);
        log.fresh.push(idx);
        idx
    }

    /// Returns whether the existing fiber `old` can be reused for `node`.
    fn matches_node(&self, old: u32, node: &Node) -> bool {
        let i = old as usize;
        match node {
            Node::Empty => false,
            Node::Text(_) => self.tag[i] == WorkTag::HostText,
            Node::Fragment(_) => self.tag[i] == WorkTag::Fragment,
            Node::Element(element) => {
                self.tag[i] == WorkTag::HostComponent
                    && self.element_type[i].as_deref() == Some(&*element.ty)
            }
            Node::Portal(portal) => {
                self.tag[i] == WorkTag::HostPortal
                    && self.state_node[i] == StateNode::Portal(portal.container)
            }
        }
    }

    fn delete_child(&mut self, parent: u32, child: u32, log: &mut RenderLog) {
        self.effect[child as usize] = EffectTag::DELETION;
        self.ret[child as usize] = parent;
        log.effects.push(child);
    }

    /// Reconciles `children` into new child fibers of the work-in-progress
    /// fiber `parent`, diffing against the current list starting at
    /// `current_first`.
    ///
    /// With `track` off (mounting a fresh subtree), no effects are recorded.
    /// Returns the new first child.
    pub(crate) fn reconcile_children(
        &mut self,
        parent: u32,
        current_first: u32,
        children: &[Node],
        track: bool,
        log: &mut RenderLog,
    ) -> u32 {
        // A lone unkeyed fragment is transparent.
        let children = match children {
            [Node::Fragment(fragment)] if fragment.key.is_none() => &fragment.children[..],
            _ => children,
        };

        // Duplicate keys queue up and are matched in order.
        let mut existing: BTreeMap<ChildKey, VecDeque<u32>> = BTreeMap::new();
        let mut old = current_first;
        while old != INVALID {
            let key = match &self.key[old as usize] {
                Some(key) => ChildKey::Explicit(key.clone()),
                None => ChildKey::Implicit(self.index[old as usize]),
            };
            existing.entry(key).or_default().push_back(old);
            old = self.sibling[old as usize];
        }

        let mut first = INVALID;
        let mut previous = INVALID;
        let mut last_placed_index = 0;
        for (position, node) in children.iter().enumerate() {
            if node.is_empty() {
                continue;
            }
            let position = u32::try_from(position).unwrap_or(u32::MAX);
            let key = match node.key() {
                Some(key) => ChildKey::Explicit(key.clone()),
                None => ChildKey::Implicit(position),
            };

            let matched = existing.get_mut(&key).and_then(VecDeque::pop_front);
            let (fiber, old_index) = match matched {
                Some(old) if self.matches_node(old, node) => {
                    let old_index = self.index[old as usize];
                    let wip = self.work_in_progress_at(old, props_for(node));
                    log.touched.push(wip);
                    (wip, Some(old_index))
                }
                Some(old) => {
                    if track {
                        self.delete_child(parent, old, log);
                    }
                    (self.create_from_node(node, log), None)
                }
                None => (self.create_from_node(node, log), None),
            };

            let f = fiber as usize;
            self.ret[f] = parent;
            self.sibling[f] = INVALID;
            self.index[f] = position;
            if track {
                match old_index {
                    Some(old_index) if old_index < last_placed_index => {
                        self.effect[f] |= EffectTag::PLACEMENT;
                    }
                    Some(old_index) => last_placed_index = old_index,
                    None => self.effect[f] |= EffectTag::PLACEMENT,
                }
            }

            if previous == INVALID {
                first = fiber;
            } else {
                self.sibling[previous as usize] = fiber;
            }
            previous = fiber;
        }

        if track {
            for old in existing.into_values().flatten() {
                self.delete_child(parent, old, log);
            }
        }

        self.child[parent as usize] = first;
        first
    }
}
