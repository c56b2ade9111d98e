// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Completing a unit of work: creating or diffing host instances.

use super::RenderState;
use crate::fiber::{INVALID, InstanceId, Props, StateNode};
use crate::host::Host;
use crate::reconciler::Reconciler;
use crate::tag::{EffectTag, WorkTag};

impl<H: Host> Reconciler<H> {
    pub(crate) fn complete_work(&mut self, render: &mut RenderState, wip: u32) {
        let w = wip as usize;
        let current = self.fibers.alternate[w];
        match self.fibers.tag[w] {
            WorkTag::HostComponent => {
                let Props::Element(element) = self.fibers.pending_props[w].clone() else {
                    return;
                };
                if current != INVALID && self.fibers.state_node[w] != StateNode::None {
                    let changed = match &self.fibers.memoized_props[current as usize] {
                        Props::Element(old) => old.attributes != element.attributes,
                        _ => true,
                    };
                    if changed {
                        self.fibers.effect[w] |= EffectTag::UPDATE;
                    }
                } else if self.was_claimed(wip) {
                    self.pop_hydration(render, wip);
                } else {
                    self.pop_hydration(render, wip);
                    let instance =
                        self.host
                            .create_instance(&element.ty, &element.attributes, render.container);
                    self.append_all_children(wip, instance);
                    self.fibers.state_node[w] = StateNode::Instance(instance);
                    render.log.instances.push(instance);
                }
            }
            WorkTag::HostText => {
                let Props::Text(text) = self.fibers.pending_props[w].clone() else {
                    return;
                };
                if current != INVALID && self.fibers.state_node[w] != StateNode::None {
                    let changed = match &self.fibers.memoized_props[current as usize] {
                        Props::Text(old) => **old != *text,
                        _ => true,
                    };
                    if changed {
                        self.fibers.effect[w] |= EffectTag::UPDATE;
                    }
                } else if self.was_claimed(wip) {
                    if let StateNode::Instance(instance) = self.fibers.state_node[w]
                        && self.host.hydrate_text_instance(instance, &text)
                    {
                        self.fibers.effect[w] |= EffectTag::UPDATE;
                    }
                } else {
                    let instance = self.host.create_text_instance(&text, render.container);
                    self.fibers.state_node[w] = StateNode::Instance(instance);
                    render.log.instances.push(instance);
                }
            }
            WorkTag::HostRoot | WorkTag::HostPortal => self.pop_hydration(render, wip),
            _ => {}
        }
        self.fibers.memoized_props[w] = self.fibers.pending_props[w].clone();
    }

    /// Appends the top-level host nodes below `wip` to its fresh instance.
    ///
    /// Non-host fibers are looked through; portals are not.
    fn append_all_children(&mut self, wip: u32, parent: InstanceId) {
        let store = &mut self.fibers;
        let mut node = store.child[wip as usize];
        while node != INVALID {
            let n = node as usize;
            let tag = store.tag[n];
            if tag.is_host() {
                if let StateNode::Instance(child) = store.state_node[n] {
                    self.host.append_initial_child(parent, child);
                }
            } else if tag != WorkTag::HostPortal && store.child[n] != INVALID {
                let child = store.child[n];
                store.ret[child as usize] = node;
                node = child;
                continue;
            }
            if node == wip {
                return;
            }
            while store.sibling[node as usize] == INVALID {
                let up = store.ret[node as usize];
                if up == INVALID || up == wip {
                    return;
                }
                node = up;
            }
            let sibling = store.sibling[node as usize];
            store.ret[sibling as usize] = store.ret[node as usize];
            node = sibling;
        }
    }
}
