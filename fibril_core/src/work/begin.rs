// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Beginning a unit of work: reconciling a fiber's children.

use alloc::rc::Rc;

use super::RenderState;
use crate::fiber::{INVALID, Props};
use crate::host::Host;
use crate::node::Node;
use crate::reconciler::Reconciler;
use crate::tag::WorkTag;

impl<H: Host> Reconciler<H> {
    /// Begins work on `wip` and returns its first child, or `INVALID` when
    /// there is nothing below it to work on.
    pub(crate) fn begin_work(&mut self, render: &mut RenderState, wip: u32) -> u32 {
        let w = wip as usize;
        let current = self.fibers.alternate[w];

        // Unchanged description: keep the committed children as they are.
        if current != INVALID
            && self.fibers.pending_props[w].same(&self.fibers.memoized_props[current as usize])
        {
            return INVALID;
        }

        let tag = self.fibers.tag[w];
        let track = match tag {
            WorkTag::HostRoot => !render.hydration.active,
            // Portal children are placed one by one into the portal container.
            WorkTag::HostPortal => true,
            _ => current != INVALID,
        };
        match tag {
            WorkTag::HostText => {
                if current == INVALID && render.hydration.active {
                    self.try_to_claim(render, wip);
                }
                return INVALID;
            }
            WorkTag::HostComponent => {
                if current == INVALID && render.hydration.active {
                    self.try_to_claim(render, wip);
                }
            }
            WorkTag::HostPortal => render.hydration.enter_portal(wip),
            WorkTag::HostRoot | WorkTag::Fragment | WorkTag::Mode => {}
            // Component kinds carry no children description of their own.
            _ => return INVALID,
        }

        let children: Rc<[Node]> = match &self.fibers.pending_props[w] {
            Props::Element(element) => element.children.clone(),
            Props::Children(children) => children.clone(),
            Props::None | Props::Text(_) => Rc::from([]),
        };
        let current_first = if current == INVALID {
            INVALID
        } else {
            self.fibers.child[current as usize]
        };
        self.fibers
            .reconcile_children(wip, current_first, &children, track, &mut render.log)
    }
}
