// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays fiber storage with allocation, topology, and pairing.

use alloc::rc::Rc;
use alloc::vec::Vec;

use super::id::{FiberId, INVALID, RootIndex, StateNode};
use super::traverse::{Children, Descendants};
use crate::node::{Element, Node};
use crate::tag::{EffectTag, WorkTag};

/// Input or output props of a fiber.
///
/// Pointer identity of the inner `Rc` is what the reconciler compares to
/// decide that a subtree is unchanged.
#[derive(Clone, Debug, Default)]
pub enum Props {
    /// No props (components outside the host model, fresh host roots).
    #[default]
    None,
    /// Host element description.
    Element(Rc<Element>),
    /// Host text content.
    Text(Rc<str>),
    /// A bare child list (host roots, fragments, portals).
    Children(Rc<[Node]>),
}

impl Props {
    /// Returns whether both props are the very same description.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Element(a), Self::Element(b)) => Rc::ptr_eq(a, b),
            (Self::Text(a), Self::Text(b)) => Rc::ptr_eq(a, b),
            (Self::Children(a), Self::Children(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Returns the child descriptions carried by these props.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        match self {
            Self::Element(e) => &e.children,
            Self::Children(c) => c,
            Self::None | Self::Text(_) => &[],
        }
    }
}

/// Struct-of-arrays storage for the fibers of every tree version.
///
/// Fibers are addressed by [`FiberId`] handles. A fiber and its `alternate`
/// live side by side in the same store; which of the two is *current* is
/// decided by the root record that the host-root fiber points at. Destroyed
/// fibers are recycled via a free list, and generation counters prevent
/// stale handle access.
#[derive(Debug)]
pub struct FiberStore {
    // -- Identity --
    pub(crate) tag: Vec<WorkTag>,
    pub(crate) key: Vec<Option<Rc<str>>>,
    pub(crate) element_type: Vec<Option<Rc<str>>>,

    // -- Topology --
    pub(crate) ret: Vec<u32>,
    pub(crate) child: Vec<u32>,
    pub(crate) sibling: Vec<u32>,
    pub(crate) index: Vec<u32>,
    pub(crate) alternate: Vec<u32>,

    // -- Work --
    pub(crate) effect: Vec<EffectTag>,
    pub(crate) state_node: Vec<StateNode>,
    pub(crate) pending_props: Vec<Props>,
    pub(crate) memoized_props: Vec<Props>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) live: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Root records --
    pub(crate) root_current: Vec<u32>,
    pub(crate) root_free: Vec<u32>,
}

impl Default for FiberStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FiberStore {
    /// Creates an empty fiber store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tag: Vec::new(),
            key: Vec::new(),
            element_type: Vec::new(),
            ret: Vec::new(),
            child: Vec::new(),
            sibling: Vec::new(),
            index: Vec::new(),
            alternate: Vec::new(),
            effect: Vec::new(),
            state_node: Vec::new(),
            pending_props: Vec::new(),
            memoized_props: Vec::new(),
            generation: Vec::new(),
            live: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            root_current: Vec::new(),
            root_free: Vec::new(),
        }
    }

    // -- Allocation API --

    /// Creates a detached fiber of the given kind and returns its handle.
    ///
    /// The fiber starts with no parent, children, alternate, effects, or props.
    pub fn create_fiber(&mut self, tag: WorkTag) -> FiberId {
        let idx = self.alloc(tag);
        self.id_at(idx)
    }

    /// Creates a new root record together with its first host-root fiber.
    ///
    /// The returned fiber is recorded as the root's `current` fiber.
    pub fn create_host_root(&mut self) -> FiberId {
        let record = self.alloc_host_root();
        self.id_at(self.root_current[record.0 as usize])
    }

    pub(crate) fn alloc_host_root(&mut self) -> RootIndex {
        let idx = self.alloc(WorkTag::HostRoot);
        let root = if let Some(slot) = self.root_free.pop() {
            self.root_current[slot as usize] = idx;
            slot
        } else {
            let slot = u32::try_from(self.root_current.len()).unwrap_or(INVALID);
            self.root_current.push(idx);
            slot
        };
        self.state_node[idx as usize] = StateNode::Root(RootIndex(root));
        RootIndex(root)
    }

    /// Destroys a fiber, freeing its slot for reuse.
    ///
    /// The fiber's alternate (if any) loses its back-reference. Topology of
    /// surrounding fibers is not repaired; detach first.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn destroy_fiber(&mut self, id: FiberId) {
        self.validate(id);
        self.free(id.idx);
    }

    /// Destroys a root record and both of its host-root fibers.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or not a host root.
    pub fn destroy_host_root(&mut self, id: FiberId) {
        self.validate(id);
        let StateNode::Root(root) = self.state_node[id.idx as usize] else {
            panic!("{id:?} is not a host root");
        };
        let current = self.root_current[root.0 as usize];
        let alternate = self.alternate[current as usize];
        self.free(current);
        if alternate != INVALID {
            self.free(alternate);
        }
        self.root_current[root.0 as usize] = INVALID;
        self.root_free.push(root.0);
    }

    /// Returns whether the given handle refers to a live fiber.
    #[must_use]
    pub fn is_alive(&self, id: FiberId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.live[id.idx as usize]
    }

    /// Returns the number of live fibers.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|live| **live).count()
    }

    // -- Pairing API --

    /// Returns the work-in-progress counterpart of `current`, creating it if
    /// the fiber has never been paired.
    ///
    /// The counterpart's effects are reset, and its child list, sibling,
    /// index, and memoized props are copied from `current`.
    pub fn create_work_in_progress(&mut self, current: FiberId, pending: Props) -> FiberId {
        self.validate(current);
        let wip = self.work_in_progress_at(current.idx, pending);
        self.id_at(wip)
    }

    /// Links `a` and `b` as each other's alternates.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn set_alternate(&mut self, a: FiberId, b: FiberId) {
        self.validate(a);
        self.validate(b);
        self.alternate[a.idx as usize] = b.idx;
        self.alternate[b.idx as usize] = a.idx;
    }

    /// Returns the alternate of a fiber, if any.
    #[must_use]
    pub fn alternate(&self, id: FiberId) -> Option<FiberId> {
        self.validate(id);
        self.opt_id(self.alternate[id.idx as usize])
    }

    // -- Topology API --

    /// Appends `child` as the last child of `parent` and points its `return`
    /// at `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn append_child(&mut self, parent: FiberId, child: FiberId) {
        self.validate(parent);
        self.validate(child);
        let (p, c) = (parent.idx, child.idx);
        self.ret[c as usize] = p;
        self.sibling[c as usize] = INVALID;
        let mut position = 0;
        if self.child[p as usize] == INVALID {
            self.child[p as usize] = c;
        } else {
            let mut last = self.child[p as usize];
            position += 1;
            while self.sibling[last as usize] != INVALID {
                last = self.sibling[last as usize];
                position += 1;
            }
            self.sibling[last as usize] = c;
        }
        self.index[c as usize] = position;
    }

    /// Points the first-child link of `parent` at `child` without touching
    /// `child`'s `return`. Used to share one child list between both versions
    /// of a parent.
    pub fn set_first_child(&mut self, parent: FiberId, child: Option<FiberId>) {
        self.validate(parent);
        self.child[parent.idx as usize] = self.raw(child);
    }

    /// Points the `return` link of `child` at `parent`.
    pub fn set_return(&mut self, child: FiberId, parent: Option<FiberId>) {
        self.validate(child);
        self.ret[child.idx as usize] = self.raw(parent);
    }

    /// Clears the `return` and child links of a fiber and of its alternate.
    pub fn detach(&mut self, id: FiberId) {
        self.validate(id);
        self.detach_at(id.idx);
    }

    /// Returns the `return` (parent) of a fiber, if any.
    #[must_use]
    pub fn parent(&self, id: FiberId) -> Option<FiberId> {
        self.validate(id);
        self.opt_id(self.ret[id.idx as usize])
    }

    /// Returns the first child of a fiber, if any.
    #[must_use]
    pub fn first_child(&self, id: FiberId) -> Option<FiberId> {
        self.validate(id);
        self.opt_id(self.child[id.idx as usize])
    }

    /// Returns the next sibling of a fiber, if any.
    #[must_use]
    pub fn sibling(&self, id: FiberId) -> Option<FiberId> {
        self.validate(id);
        self.opt_id(self.sibling[id.idx as usize])
    }

    /// Returns an iterator over the direct children of a fiber.
    #[must_use]
    pub fn children(&self, id: FiberId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.child[id.idx as usize])
    }

    /// Returns a pre-order iterator over `id` and its descendants.
    #[must_use]
    pub fn descendants(&self, id: FiberId) -> Descendants<'_> {
        self.validate(id);
        Descendants::new(self, id.idx)
    }

    // -- Property API --

    /// Returns the kind of a fiber.
    #[must_use]
    pub fn tag(&self, id: FiberId) -> WorkTag {
        self.validate(id);
        self.tag[id.idx as usize]
    }

    /// Returns the explicit key of a fiber.
    #[must_use]
    pub fn key(&self, id: FiberId) -> Option<&str> {
        self.validate(id);
        self.key[id.idx as usize].as_deref()
    }

    /// Returns the host type name of a fiber.
    #[must_use]
    pub fn element_type(&self, id: FiberId) -> Option<&str> {
        self.validate(id);
        self.element_type[id.idx as usize].as_deref()
    }

    /// Returns the pending effects of a fiber.
    #[must_use]
    pub fn effect(&self, id: FiberId) -> EffectTag {
        self.validate(id);
        self.effect[id.idx as usize]
    }

    /// Replaces the pending effects of a fiber.
    pub fn set_effect(&mut self, id: FiberId, effect: EffectTag) {
        self.validate(id);
        self.effect[id.idx as usize] = effect;
    }

    /// Returns the backing instance of a fiber.
    #[must_use]
    pub fn state_node(&self, id: FiberId) -> StateNode {
        self.validate(id);
        self.state_node[id.idx as usize]
    }

    /// Replaces the backing instance of a fiber.
    pub fn set_state_node(&mut self, id: FiberId, state_node: StateNode) {
        self.validate(id);
        self.state_node[id.idx as usize] = state_node;
    }

    /// Returns the props the fiber was last rendered with.
    #[must_use]
    pub fn memoized_props(&self, id: FiberId) -> &Props {
        self.validate(id);
        &self.memoized_props[id.idx as usize]
    }

    /// Returns the props the fiber is about to be rendered with.
    #[must_use]
    pub fn pending_props(&self, id: FiberId) -> &Props {
        self.validate(id);
        &self.pending_props[id.idx as usize]
    }

    // -- Root API --

    /// Returns the root record a host-root fiber refers to.
    #[must_use]
    pub fn root_of(&self, id: FiberId) -> Option<RootIndex> {
        self.validate(id);
        match self.state_node[id.idx as usize] {
            StateNode::Root(root) => Some(root),
            _ => None,
        }
    }

    /// Returns the committed host-root fiber of a root.
    ///
    /// # Panics
    ///
    /// Panics if the root record was destroyed.
    #[must_use]
    pub fn root_current(&self, root: RootIndex) -> FiberId {
        let current = self.root_current[root.0 as usize];
        assert!(current != INVALID, "destroyed {root:?}");
        self.id_at(current)
    }

    /// Records `fiber` as the committed host-root fiber of its root.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or not a host root.
    pub fn set_root_current(&mut self, fiber: FiberId) {
        let Some(root) = self.root_of(fiber) else {
            panic!("{fiber:?} is not a host root");
        };
        self.root_current[root.0 as usize] = fiber.idx;
    }

    // -- Crate-internal raw-index helpers --

    /// Builds a handle for a live raw slot index.
    #[inline]
    pub(crate) fn id_at(&self, idx: u32) -> FiberId {
        FiberId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    #[inline]
    pub(crate) fn opt_id(&self, idx: u32) -> Option<FiberId> {
        (idx != INVALID).then(|| self.id_at(idx))
    }

    #[inline]
    fn raw(&self, id: Option<FiberId>) -> u32 {
        id.map_or(INVALID, |id| {
            self.validate(id);
            id.idx
        })
    }

    pub(crate) fn alloc(&mut self, tag: WorkTag) -> u32 {
        if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.tag[i] = tag;
            self.key[i] = None;
            self.element_type[i] = None;
            self.ret[i] = INVALID;
            self.child[i] = INVALID;
            self.sibling[i] = INVALID;
            self.index[i] = 0;
            self.alternate[i] = INVALID;
            self.effect[i] = EffectTag::NONE;
            self.state_node[i] = StateNode::None;
            self.pending_props[i] = Props::None;
            self.memoized_props[i] = Props::None;
            self.live[i] = true;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.tag.push(tag);
            self.key.push(None);
            self.element_type.push(None);
            self.ret.push(INVALID);
            self.child.push(INVALID);
            self.sibling.push(INVALID);
            self.index.push(0);
            self.alternate.push(INVALID);
            self.effect.push(EffectTag::NONE);
            self.state_node.push(StateNode::None);
            self.pending_props.push(Props::None);
            self.memoized_props.push(Props::None);
            self.generation.push(0);
            self.live.push(true);
            idx
        }
    }

    pub(crate) fn free(&mut self, idx: u32) {
        let i = idx as usize;
        if !self.live[i] {
            return;
        }
        let alternate = self.alternate[i];
        if alternate != INVALID && self.alternate[alternate as usize] == idx {
            self.alternate[alternate as usize] = INVALID;
        }
        self.ret[i] = INVALID;
        self.child[i] = INVALID;
        self.sibling[i] = INVALID;
        self.alternate[i] = INVALID;
        self.pending_props[i] = Props::None;
        self.memoized_props[i] = Props::None;
        self.key[i] = None;
        self.element_type[i] = None;
        self.state_node[i] = StateNode::None;
        // Bump generation so old handles immediately fail validation.
        self.generation[i] += 1;
        self.live[i] = false;
        self.free_list.push(idx);
    }

    pub(crate) fn work_in_progress_at(&mut self, current: u32, pending: Props) -> u32 {
        let c = current as usize;
        let mut wip = self.alternate[c];
        if wip == INVALID {
            wip = self.alloc(self.tag[c]);
            let w = wip as usize;
            self.key[w] = self.key[c].clone();
            self.element_type[w] = self.element_type[c].clone();
            self.state_node[w] = self.state_node[c];
            self.alternate[w] = current;
            self.alternate[c] = wip;
        } else {
            self.effect[wip as usize] = EffectTag::NONE;
        }
        let w = wip as usize;
        self.pending_props[w] = pending;
        self.memoized_props[w] = self.memoized_props[c].clone();
        self.child[w] = self.child[c];
        self.sibling[w] = self.sibling[c];
        self.index[w] = self.index[c];
        wip
    }

    pub(crate) fn detach_at(&mut self, idx: u32) {
        self.ret[idx as usize] = INVALID;
        self.child[idx as usize] = INVALID;
        let alternate = self.alternate[idx as usize];
        if alternate != INVALID {
            self.ret[alternate as usize] = INVALID;
            self.child[alternate as usize] = INVALID;
        }
    }

    /// Frees `idx`, its alternate, and every descendant reachable through the
    /// child lists of `idx`'s version.
    ///
    /// Alternates are freed without walking their own child lists, which may
    /// still name fibers that were reused elsewhere.
    pub(crate) fn free_subtree(&mut self, idx: u32) {
        let mut stack = Vec::new();
        stack.push(idx);
        while let Some(node) = stack.pop() {
            if !self.live[node as usize] {
                continue;
            }
            let mut child = self.child[node as usize];
            while child != INVALID && self.live[child as usize] {
                stack.push(child);
                child = self.sibling[child as usize];
            }
            let alternate = self.alternate[node as usize];
            self.free(node);
            if alternate != INVALID {
                self.free(alternate);
            }
        }
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: FiberId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale FiberId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }
}
