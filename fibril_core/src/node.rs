// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element descriptions.
//!
//! A [`Node`] describes what a subtree should look like after the next commit.
//! Descriptions are immutable and reference-counted: cloning a `Node` is cheap,
//! and handing the *same* `Rc` back on a later render tells the reconciler the
//! subtree is unchanged, so it can skip it entirely.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use crate::fiber::ContainerId;

/// Host attributes of an element, ordered by name.
pub type Attributes = BTreeMap<String, String>;

/// A description of one position in the tree.
#[derive(Clone, Debug, Default)]
pub enum Node {
    /// Renders nothing.
    #[default]
    Empty,
    /// A host text node.
    Text(Rc<str>),
    /// A host element.
    Element(Rc<Element>),
    /// A group of children without a host node of its own.
    Fragment(Rc<Fragment>),
    /// Children mounted into another host container.
    Portal(Rc<Portal>),
}

impl Node {
    /// Creates a text node.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self::Text(Rc::from(text))
    }

    /// Creates an unkeyed fragment.
    #[must_use]
    pub fn fragment(children: impl IntoIterator<Item = Self>) -> Self {
        Self::Fragment(Rc::new(Fragment {
            key: None,
            children: children.into_iter().collect(),
        }))
    }

    /// Creates a keyed fragment.
    #[must_use]
    pub fn keyed_fragment(key: &str, children: impl IntoIterator<Item = Self>) -> Self {
        Self::Fragment(Rc::new(Fragment {
            key: Some(Rc::from(key)),
            children: children.into_iter().collect(),
        }))
    }

    /// Creates a portal into `container`.
    #[must_use]
    pub fn portal(container: ContainerId, children: impl IntoIterator<Item = Self>) -> Self {
        Self::Portal(Rc::new(Portal {
            container,
            key: None,
            children: children.into_iter().collect(),
        }))
    }

    /// Returns the explicit key of this node, if any.
    #[must_use]
    pub fn key(&self) -> Option<&Rc<str>> {
        match self {
            Self::Element(e) => e.key.as_ref(),
            Self::Fragment(f) => f.key.as_ref(),
            Self::Portal(p) => p.key.as_ref(),
            Self::Empty | Self::Text(_) => None,
        }
    }

    /// Returns whether this node renders nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns whether both nodes are the very same description.
    ///
    /// This is pointer identity, not structural equality.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Text(a), Self::Text(b)) => Rc::ptr_eq(a, b),
            (Self::Element(a), Self::Element(b)) => Rc::ptr_eq(a, b),
            (Self::Fragment(a), Self::Fragment(b)) => Rc::ptr_eq(a, b),
            (Self::Portal(a), Self::Portal(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(Rc::new(element))
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

/// A host element description.
///
/// Built with [`Element::new`] and the consuming builder methods.
#[derive(Clone, Debug)]
pub struct Element {
    /// Host type name (e.g. `"div"`).
    pub ty: Rc<str>,
    /// Explicit reconciliation key.
    pub key: Option<Rc<str>>,
    /// Host attributes.
    pub attributes: Attributes,
    /// Child descriptions.
    pub children: Rc<[Node]>,
}

impl Element {
    /// Creates an element of the given host type with no attributes or children.
    #[must_use]
    pub fn new(ty: &str) -> Self {
        Self {
            ty: Rc::from(ty),
            key: None,
            attributes: Attributes::new(),
            children: Rc::from([]),
        }
    }

    /// Sets the reconciliation key.
    #[must_use]
    pub fn key(mut self, key: &str) -> Self {
        self.key = Some(Rc::from(key));
        self
    }

    /// Sets an attribute.
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(String::from(name), String::from(value));
        self
    }

    /// Appends a child.
    #[must_use]
    pub fn child(self, child: impl Into<Node>) -> Self {
        let mut children: Vec<Node> = self.children.iter().cloned().collect();
        children.push(child.into());
        Self {
            children: children.into(),
            ..self
        }
    }

    /// Replaces the children.
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children = children.into_iter().collect();
        self
    }
}

/// A fragment description.
#[derive(Clone, Debug)]
pub struct Fragment {
    /// Explicit reconciliation key.
    pub key: Option<Rc<str>>,
    /// Child descriptions.
    pub children: Rc<[Node]>,
}

/// A portal description.
#[derive(Clone, Debug)]
pub struct Portal {
    /// Host container that receives the children.
    pub container: ContainerId,
    /// Explicit reconciliation key.
    pub key: Option<Rc<str>>,
    /// Child descriptions.
    pub children: Rc<[Node]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_children_in_order() {
        let element = Element::new("ul")
            .attr("class", "list")
            .child(Element::new("li").key("a"))
            .child("tail");

        assert_eq!(&*element.ty, "ul");
        assert_eq!(element.attributes.get("class").map(String::as_str), Some("list"));
        assert_eq!(element.children.len(), 2);
        assert_eq!(element.children[0].key().map(|k| &**k), Some("a"));
        assert!(matches!(element.children[1], Node::Text(ref t) if &**t == "tail"));
    }

    #[test]
    fn keys_come_from_descriptions() {
        assert!(Node::Empty.key().is_none());
        assert!(Node::text("x").key().is_none());
        let fragment = Node::keyed_fragment("f", [Node::text("x")]);
        assert_eq!(fragment.key().map(|k| &**k), Some("f"));
        let portal = Node::portal(ContainerId(3), []);
        assert!(portal.key().is_none());
    }

    #[test]
    fn sameness_is_pointer_identity() {
        let a = Node::from(Element::new("div"));
        let b = Node::from(Element::new("div"));
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
        assert!(Node::Empty.same(&Node::Empty));
        assert!(!Node::text("x").same(&Node::text("x")));
    }
}
