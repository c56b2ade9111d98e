// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host contract for rendering targets.
//!
//! Fibril splits target-specific work into *host* crates. The reconciler
//! decides *what* changes; a [`Host`] decides *how* a change is made on the
//! target (a DOM, a native widget tree, an in-memory document for tests).
//! A host provides the following pieces:
//!
//! - **Time**: `now()` in milliseconds, used to compute expiration times.
//! - **Instances**: creation of element and text instances and the mutation
//!   primitives the commit phase applies (append, insert-before, remove,
//!   attribute and text updates).
//! - **Containers**: classification of attachment points and the query the
//!   boundary adapter needs to decide between hydrating and clearing.
//! - **Hydration cursor**: a walk over pre-existing content, so a first
//!   render can claim host nodes instead of recreating them.
//! - **Deferred work**: a notification that low-priority work is pending,
//!   which the host answers by calling
//!   [`Reconciler::run_deferred`](crate::reconciler::Reconciler::run_deferred)
//!   when it has time.
//!
//! # Crate boundaries
//!
//! `fibril_core` owns the fiber model, reconciliation, scheduling, and this
//! contract module. Host crates depend on `fibril_core` and provide target
//! glue. Application code depends on both and wires them together.

use crate::fiber::{ContainerId, InstanceId};
use crate::node::Attributes;

/// The parent a host node is attached to during commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostParent {
    /// A host element.
    Instance(InstanceId),
    /// A root or portal container.
    Container(ContainerId),
}

/// What kind of host node an attachment point is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// A host element.
    Element,
    /// A whole document.
    Document,
    /// A detached document fragment.
    DocumentFragment,
    /// A comment whose content marks it as a mount point.
    MountPointComment,
    /// Any other node (plain text, ordinary comments, ...).
    Other,
}

impl ContainerKind {
    /// Returns whether a tree may be attached to a container of this kind.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// Applies reconciler decisions to a rendering target.
///
/// Instances and containers are opaque ids to the reconciler; the host owns
/// the nodes behind them.
///
/// # Commit pseudocode
///
/// ```rust,ignore
/// host.prepare_for_commit(container);
/// for fiber in effects {
///     // PLACEMENT: host.insert_before(parent, node, before) or append_child
///     // UPDATE:    host.commit_update(..) or commit_text_update(..)
///     // DELETION:  host.remove_child(parent, node)
/// }
/// host.reset_after_commit(container);
/// ```
pub trait Host {
    /// Returns the current time in milliseconds from an arbitrary origin.
    fn now(&self) -> u64;

    /// Creates a detached element instance.
    fn create_instance(
        &mut self,
        ty: &str,
        attributes: &Attributes,
        root_container: ContainerId,
    ) -> InstanceId;

    /// Creates a detached text instance.
    fn create_text_instance(&mut self, text: &str, root_container: ContainerId) -> InstanceId;

    /// Appends `child` to a not-yet-attached `parent` while it is being built.
    fn append_initial_child(&mut self, parent: InstanceId, child: InstanceId);

    /// Appends `child` as the last child of `parent`, moving it if attached.
    fn append_child(&mut self, parent: HostParent, child: InstanceId);

    /// Inserts `child` into `parent` before `before`, moving it if attached.
    fn insert_before(&mut self, parent: HostParent, child: InstanceId, before: InstanceId);

    /// Removes `child` from `parent`.
    fn remove_child(&mut self, parent: HostParent, child: InstanceId);

    /// Replaces the attributes of an element instance.
    fn commit_update(
        &mut self,
        instance: InstanceId,
        ty: &str,
        old_attributes: &Attributes,
        new_attributes: &Attributes,
    );

    /// Replaces the content of a text instance.
    fn commit_text_update(&mut self, instance: InstanceId, old_text: &str, new_text: &str);

    /// Called before the commit phase mutates `container`.
    fn prepare_for_commit(&mut self, container: ContainerId) {
        _ = container;
    }

    /// Called after the commit phase has mutated `container`.
    fn reset_after_commit(&mut self, container: ContainerId) {
        _ = container;
    }

    /// Classifies an attachment point, or returns `None` for unknown ids.
    fn container_kind(&self, container: ContainerId) -> Option<ContainerKind>;

    /// Returns whether the root element of `container` (the document element
    /// for documents, the first child otherwise) carries `attribute`.
    fn root_element_has_attribute(&self, container: ContainerId, attribute: &str) -> bool;

    /// Removes all children of `container`.
    fn clear_container(&mut self, container: ContainerId);

    /// Returns the first element or text child of `container`.
    fn first_hydratable_child_of_container(&self, container: ContainerId) -> Option<InstanceId>;

    /// Returns the first element or text child of `instance`.
    fn first_hydratable_child(&self, instance: InstanceId) -> Option<InstanceId>;

    /// Returns the next element or text sibling of `instance`.
    fn next_hydratable_sibling(&self, instance: InstanceId) -> Option<InstanceId>;

    /// Returns whether `instance` is an element of type `ty`.
    fn can_hydrate_instance(&self, instance: InstanceId, ty: &str) -> bool;

    /// Returns whether `instance` is a text node.
    fn can_hydrate_text_instance(&self, instance: InstanceId) -> bool;

    /// Returns whether the content of a claimed text node differs from `text`
    /// and must be updated during commit.
    fn hydrate_text_instance(&mut self, instance: InstanceId, text: &str) -> bool;

    /// Releases an instance created by a render that was abandoned before it
    /// committed.
    ///
    /// The instance was never attached to a container. Parents are released
    /// before their children, and each child gets its own call. Nodes removed
    /// during commit are not passed here; they are the host's to drop.
    fn release_instance(&mut self, _instance: InstanceId) {}

    /// Called when deferred work has been scheduled and no call to
    /// [`run_deferred`](crate::reconciler::Reconciler::run_deferred) is
    /// pending yet.
    fn request_deferred_work(&mut self) {}
}
