// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node arena, seeding helpers, and HTML serialization.

use std::fmt::Write as _;

use fibril_core::fiber::{ContainerId, InstanceId};
use fibril_core::host::HostParent;
use fibril_core::node::Attributes;

/// Content of a comment that marks a legacy mount point.
pub const MOUNT_POINT_COMMENT: &str = " fibril-mount-point-unstable ";

/// What a node in the document is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// An element with its type and attributes.
    Element {
        /// Element type (tag name).
        ty: String,
        /// Attributes by name.
        attributes: Attributes,
    },
    /// A text node.
    Text(String),
    /// A comment.
    Comment(String),
    /// A document.
    Document,
    /// A document fragment.
    Fragment,
}

/// One host mutation applied through the [`Host`](fibril_core::host::Host)
/// contract. Node ids are arena slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// An element was created.
    CreateElement {
        /// New node.
        node: u32,
        /// Element type.
        ty: String,
    },
    /// A text node was created.
    CreateText {
        /// New node.
        node: u32,
        /// Initial content.
        text: String,
    },
    /// A child was appended while its parent was being built.
    AppendInitial {
        /// Parent node.
        parent: u32,
        /// Appended node.
        child: u32,
    },
    /// A child was appended to an attached parent.
    Append {
        /// Parent node.
        parent: u32,
        /// Appended node.
        child: u32,
    },
    /// A child was inserted before a sibling.
    InsertBefore {
        /// Parent node.
        parent: u32,
        /// Inserted node.
        child: u32,
        /// Reference sibling.
        before: u32,
    },
    /// A child was removed.
    Remove {
        /// Parent node.
        parent: u32,
        /// Removed node.
        child: u32,
    },
    /// The attributes of an element were replaced.
    UpdateAttributes {
        /// Updated node.
        node: u32,
    },
    /// The content of a text node was replaced.
    UpdateText {
        /// Updated node.
        node: u32,
        /// New content.
        text: String,
    },
    /// All children of a container were removed.
    Clear {
        /// Cleared container.
        container: u32,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct Slot {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<u32>,
    pub(crate) children: Vec<u32>,
}

/// An in-memory document that implements the host contract.
///
/// Removed nodes stay in the arena detached, so their ids remain valid for
/// inspection. Only instances released by an abandoned render are recycled.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    pub(crate) nodes: Vec<Slot>,
    /// Released slots, reused by later allocations.
    pub(crate) free: Vec<u32>,
    pub(crate) now_ms: u64,
    pub(crate) mutations: Vec<Mutation>,
    pub(crate) deferred_requests: u32,
}

impl MemoryDocument {
    /// Creates an empty document arena with the clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Clock --

    /// Advances the clock by `ms` milliseconds.
    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }

    /// Returns the current time in milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    // -- Containers --

    /// Creates a detached document node.
    pub fn create_document(&mut self) -> ContainerId {
        ContainerId(self.push(NodeKind::Document))
    }

    /// Creates a detached element to render into.
    pub fn create_element_container(&mut self, ty: &str) -> ContainerId {
        ContainerId(self.push(NodeKind::Element {
            ty: ty.into(),
            attributes: Attributes::new(),
        }))
    }

    /// Creates a detached document fragment.
    pub fn create_fragment(&mut self) -> ContainerId {
        ContainerId(self.push(NodeKind::Fragment))
    }

    /// Returns the container id of a node created as an instance.
    #[must_use]
    pub const fn as_container(instance: InstanceId) -> ContainerId {
        ContainerId(instance.0)
    }

    // -- Seeding (pre-existing markup) --

    /// Appends an element to `parent` without recording a mutation.
    pub fn seed_element(&mut self, parent: HostParent, ty: &str, attributes: &[(&str, &str)]) -> InstanceId {
        let attributes = attributes
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        let node = self.push(NodeKind::Element {
            ty: ty.into(),
            attributes,
        });
        self.attach(Self::raw_parent(parent), node, None);
        InstanceId(node)
    }

    /// Appends a text node to `parent` without recording a mutation.
    pub fn seed_text(&mut self, parent: HostParent, text: &str) -> InstanceId {
        let node = self.push(NodeKind::Text(text.into()));
        self.attach(Self::raw_parent(parent), node, None);
        InstanceId(node)
    }

    /// Appends a comment to `parent` without recording a mutation.
    ///
    /// Comments with [`MOUNT_POINT_COMMENT`] as content are valid
    /// containers: content rendered into them goes before the comment.
    pub fn seed_comment(&mut self, parent: HostParent, text: &str) -> ContainerId {
        let node = self.push(NodeKind::Comment(text.into()));
        self.attach(Self::raw_parent(parent), node, None);
        ContainerId(node)
    }

    // -- Inspection --

    /// Returns what `instance` is, or `None` for unknown ids.
    #[must_use]
    pub fn kind(&self, instance: InstanceId) -> Option<&NodeKind> {
        self.nodes.get(instance.0 as usize).map(|slot| &slot.kind)
    }

    /// Returns the children of a node, in order.
    #[must_use]
    pub fn children(&self, parent: HostParent) -> Vec<InstanceId> {
        self.nodes
            .get(Self::raw_parent(parent) as usize)
            .map(|slot| slot.children.iter().copied().map(InstanceId).collect())
            .unwrap_or_default()
    }

    /// Returns whether `instance` currently has a parent.
    #[must_use]
    pub fn is_attached(&self, instance: InstanceId) -> bool {
        self.nodes
            .get(instance.0 as usize)
            .is_some_and(|slot| slot.parent.is_some())
    }

    /// Returns the value of an attribute of an element.
    #[must_use]
    pub fn attribute(&self, instance: InstanceId, name: &str) -> Option<&str> {
        match self.kind(instance)? {
            NodeKind::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            _ => None,
        }
    }

    /// Returns the number of slots in the arena, including released ones.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of nodes that have not been released.
    #[must_use]
    pub fn live_node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Returns the mutations recorded so far.
    #[must_use]
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Returns and clears the recorded mutations.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }

    /// Returns how often deferred work has been requested.
    #[must_use]
    pub fn deferred_requests(&self) -> u32 {
        self.deferred_requests
    }

    /// Serializes the children of `container` as HTML.
    #[must_use]
    pub fn to_html(&self, container: ContainerId) -> String {
        let mut out = String::new();
        if let Some(slot) = self.nodes.get(container.0 as usize) {
            for &child in &slot.children {
                self.write_html(child, &mut out);
            }
        }
        out
    }

    /// Serializes `instance` itself as HTML.
    #[must_use]
    pub fn outer_html(&self, instance: InstanceId) -> String {
        let mut out = String::new();
        if (instance.0 as usize) < self.nodes.len() {
            self.write_html(instance.0, &mut out);
        }
        out
    }

    fn write_html(&self, node: u32, out: &mut String) {
        let slot = &self.nodes[node as usize];
        match &slot.kind {
            NodeKind::Element { ty, attributes } => {
                out.push('<');
                out.push_str(ty);
                for (name, value) in attributes {
                    let _ = write!(out, " {name}=\"{}\"", escape(value));
                }
                out.push('>');
                for &child in &slot.children {
                    self.write_html(child, out);
                }
                let _ = write!(out, "</{ty}>");
            }
            NodeKind::Text(text) => out.push_str(&escape(text)),
            NodeKind::Comment(text) => {
                let _ = write!(out, "<!--{text}-->");
            }
            NodeKind::Document | NodeKind::Fragment => {
                for &child in &slot.children {
                    self.write_html(child, out);
                }
            }
        }
    }

    // -- Arena --

    pub(crate) fn push(&mut self, kind: NodeKind) -> u32 {
        let slot = Slot {
            kind,
            parent: None,
            children: Vec::new(),
        };
        if let Some(node) = self.free.pop() {
            self.nodes[node as usize] = slot;
            return node;
        }
        let node = u32::try_from(self.nodes.len()).unwrap_or(u32::MAX);
        self.nodes.push(slot);
        node
    }

    /// Returns a detached node's slot to the free list. Its children are
    /// detached but stay allocated.
    pub(crate) fn release(&mut self, node: u32) {
        let Some(slot) = self.nodes.get_mut(node as usize) else {
            return;
        };
        if slot.parent.is_some() || self.free.contains(&node) {
            return;
        }
        let children = std::mem::take(&mut slot.children);
        for child in children {
            if let Some(child) = self.nodes.get_mut(child as usize) {
                child.parent = None;
            }
        }
        self.free.push(node);
    }

    pub(crate) const fn raw_parent(parent: HostParent) -> u32 {
        match parent {
            HostParent::Instance(instance) => instance.0,
            HostParent::Container(container) => container.0,
        }
    }

    /// Resolves where children of `parent` go: the node itself, or for a
    /// mount-point comment, the comment's parent with the comment as anchor.
    ///
    /// # Panics
    ///
    /// Panics if a comment container is detached.
    pub(crate) fn resolve(&self, parent: HostParent) -> (u32, Option<u32>) {
        let raw = Self::raw_parent(parent);
        match &self.nodes[raw as usize] {
            Slot {
                kind: NodeKind::Comment(_),
                parent,
                ..
            } => {
                let Some(outer) = *parent else {
                    panic!("mount-point comment {raw} has no parent");
                };
                (outer, Some(raw))
            }
            _ => (raw, None),
        }
    }

    /// Moves `child` under `parent`, before `before` or at the end.
    ///
    /// # Panics
    ///
    /// Panics if `before` is not a child of `parent`.
    pub(crate) fn attach(&mut self, parent: u32, child: u32, before: Option<u32>) {
        self.detach(child);
        let children = &mut self.nodes[parent as usize].children;
        match before {
            Some(before) => {
                let Some(at) = children.iter().position(|&c| c == before) else {
                    panic!("insert_before: node {before} is not a child of {parent}");
                };
                children.insert(at, child);
            }
            None => children.push(child),
        }
        self.nodes[child as usize].parent = Some(parent);
    }

    pub(crate) fn detach(&mut self, child: u32) {
        if let Some(parent) = self.nodes[child as usize].parent.take() {
            self.nodes[parent as usize].children.retain(|&c| c != child);
        }
    }

    pub(crate) fn is_hydratable(&self, node: u32) -> bool {
        matches!(
            self.nodes[node as usize].kind,
            NodeKind::Element { .. } | NodeKind::Text(_)
        )
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_markup_serializes() {
        let mut doc = MemoryDocument::new();
        let root = doc.create_element_container("div");
        let p = doc.seed_element(HostParent::Container(root), "p", &[("class", "a&b")]);
        doc.seed_text(HostParent::Instance(p), "1 < 2");
        doc.seed_comment(HostParent::Container(root), " note ");
        assert_eq!(
            doc.to_html(root),
            "<p class=\"a&amp;b\">1 &lt; 2</p><!-- note -->"
        );
        assert!(doc.mutations().is_empty());
    }

    #[test]
    fn attach_moves_between_parents() {
        let mut doc = MemoryDocument::new();
        let a = doc.create_element_container("a");
        let b = doc.create_element_container("b");
        let x = doc.seed_text(HostParent::Container(a), "x");
        let y = doc.seed_text(HostParent::Container(b), "y");
        doc.attach(b.0, x.0, Some(y.0));
        assert_eq!(doc.to_html(a), "");
        assert_eq!(doc.to_html(b), "xy");
        doc.attach(b.0, x.0, None);
        assert_eq!(doc.to_html(b), "yx");
    }

    #[test]
    fn comment_resolves_to_its_parent() {
        let mut doc = MemoryDocument::new();
        let root = doc.create_element_container("div");
        let mount = doc.seed_comment(HostParent::Container(root), MOUNT_POINT_COMMENT);
        assert_eq!(
            doc.resolve(HostParent::Container(mount)),
            (root.0, Some(mount.0))
        );
        assert_eq!(doc.resolve(HostParent::Container(root)), (root.0, None));
    }
}
