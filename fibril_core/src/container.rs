// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Legacy container API: one synchronous root per attachment point.
//!
//! ```text
//!   legacy_render(c, tree)
//!     ├─ root for c exists ──► render(root, tree)
//!     └─ first render
//!          ├─ validate c                    (InvalidContainer)
//!          ├─ hydrate?  marker attribute on c's root element, or legacy_hydrate
//!          ├─ no: clear c
//!          └─ unbatched: create root, render(root, tree)
//! ```
//!
//! The first render of a container is never batched, so it reaches the host
//! before the call returns even inside
//! [`batched_updates`](Reconciler::batched_updates).

use crate::error::{Error, Result};
use crate::fiber::ContainerId;
use crate::handle::{Callback, Work};
use crate::host::{ContainerKind, Host};
use crate::node::Node;
use crate::reconciler::Reconciler;
use crate::root::RootId;

/// Attribute whose presence on a container's root element marks server
/// rendered markup that the first legacy render claims instead of clearing.
pub const ROOT_ATTRIBUTE_NAME: &str = "data-fibril-root";

impl<H: Host> Reconciler<H> {
    /// Returns whether a tree may be attached to `container`.
    #[must_use]
    pub fn is_valid_container(&self, container: ContainerId) -> bool {
        self.host
            .container_kind(container)
            .is_some_and(ContainerKind::is_valid)
    }

    /// Returns whether the existing content of `container` carries the
    /// server-rendering marker.
    #[must_use]
    pub fn should_hydrate(&self, container: ContainerId) -> bool {
        self.host
            .root_element_has_attribute(container, ROOT_ATTRIBUTE_NAME)
    }

    /// Renders `children` into `container` synchronously, creating the
    /// container's root on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if `container` cannot hold a tree.
    pub fn legacy_render(
        &mut self,
        container: ContainerId,
        children: Node,
        callback: Option<Callback>,
    ) -> Result<Work> {
        self.render_into_container(container, children, false, callback)
    }

    /// Like [`legacy_render`](Self::legacy_render), but a new root always
    /// claims the container's existing content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if `container` cannot hold a tree.
    pub fn legacy_hydrate(
        &mut self,
        container: ContainerId,
        children: Node,
        callback: Option<Callback>,
    ) -> Result<Work> {
        self.render_into_container(container, children, true, callback)
    }

    fn render_into_container(
        &mut self,
        container: ContainerId,
        children: Node,
        force_hydrate: bool,
        callback: Option<Callback>,
    ) -> Result<Work> {
        if !self.is_valid_container(container) {
            return Err(Error::InvalidContainer);
        }
        if let Some(&root) = self.containers.get(&container) {
            return self.render(root, children, callback);
        }
        let hydrate = force_hydrate || self.should_hydrate(container);
        if !hydrate {
            self.host.clear_container(container);
        }
        let root = self.create_root_with(container, false, hydrate);
        self.containers.insert(container, root);
        self.unbatched_updates(|this| this.render(root, children, callback))
    }

    /// Unmounts the tree rendered into `container` and destroys its root.
    ///
    /// Returns `false` if nothing was rendered into `container`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if `container` cannot hold a tree.
    pub fn unmount_component_at_node(&mut self, container: ContainerId) -> Result<bool> {
        if !self.is_valid_container(container) {
            return Err(Error::InvalidContainer);
        }
        let Some(&root) = self.containers.get(&container) else {
            return Ok(false);
        };
        self.unbatched_updates(|this| this.render(root, Node::Empty, None))?;
        self.destroy_root(root)?;
        Ok(true)
    }

    /// Returns the legacy root rendering into `container`, if any.
    #[must_use]
    pub fn root_for_container(&self, container: ContainerId) -> Option<RootId> {
        self.containers.get(&container).copied()
    }
}
