// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fiber kinds and pending side effects.
//!
//! Every fiber carries a [`WorkTag`] naming what kind of tree node it mirrors
//! and an [`EffectTag`] bitset naming the host mutations that are still
//! outstanding for it.
//!
//! # Effect semantics
//!
//! - [`PLACEMENT`](EffectTag::PLACEMENT): the fiber's top-level host nodes
//!   must be inserted (or moved) into the host parent. Cleared as soon as the
//!   commit inserts them, so a committed fiber never carries it.
//! - [`UPDATE`](EffectTag::UPDATE): the fiber's host node must be patched with
//!   its new attributes or text.
//! - [`DELETION`](EffectTag::DELETION): the fiber (a member of the committed
//!   tree) must be removed together with its subtree.
//!
//! The identity resolver reads only [`PLACEMENT`](EffectTag::PLACEMENT): a
//! fiber without an alternate whose ancestry carries it is still mounting.

use bitflags::bitflags;

/// The kind of tree node a fiber represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkTag {
    /// A function component.
    FunctionComponent,
    /// A class component.
    ClassComponent,
    /// A component whose kind is not yet known.
    IndeterminateComponent,
    /// The root of a tree; its state node is the root record.
    HostRoot,
    /// A subtree rendered into a different host container.
    HostPortal,
    /// A host element.
    HostComponent,
    /// A host text node.
    HostText,
    /// A keyed or unkeyed group of children without a host node.
    Fragment,
    /// A mode boundary (strict, concurrent).
    Mode,
    /// A context consumer.
    ContextConsumer,
    /// A context provider.
    ContextProvider,
    /// A component that forwards its ref.
    ForwardRef,
    /// A profiler boundary.
    Profiler,
    /// A suspense boundary.
    SuspenseComponent,
    /// A memoized component.
    MemoComponent,
    /// A memoized function component without custom comparison.
    SimpleMemoComponent,
    /// A component whose type resolves lazily.
    LazyComponent,
    /// A class component that threw before mounting.
    IncompleteClassComponent,
    /// A suspense boundary whose content is still server markup.
    DehydratedSuspenseComponent,
}

impl WorkTag {
    /// Returns whether fibers of this kind own a concrete host node.
    #[inline]
    #[must_use]
    pub const fn is_host(self) -> bool {
        matches!(self, Self::HostComponent | Self::HostText)
    }

    /// Returns whether fibers of this kind can act as the host parent of
    /// their descendants' host nodes.
    #[inline]
    #[must_use]
    pub const fn is_host_parent(self) -> bool {
        matches!(self, Self::HostComponent | Self::HostRoot | Self::HostPortal)
    }
}

bitflags! {
    /// Pending side effects of a fiber.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EffectTag: u8 {
        /// Insert or move the fiber's host nodes.
        const PLACEMENT = 1 << 0;
        /// Patch the fiber's host node.
        const UPDATE = 1 << 1;
        /// Remove the fiber and its subtree.
        const DELETION = 1 << 2;
    }
}

impl EffectTag {
    /// No pending side effect.
    pub const NONE: Self = Self::empty();

    /// Effects that make a completed fiber join the effect list.
    pub const HOST_EFFECTS: Self = Self::PLACEMENT.union(Self::UPDATE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_kinds() {
        assert!(WorkTag::HostComponent.is_host());
        assert!(WorkTag::HostText.is_host());
        assert!(!WorkTag::HostPortal.is_host());
        assert!(!WorkTag::Fragment.is_host());
    }

    #[test]
    fn host_parent_kinds() {
        assert!(WorkTag::HostRoot.is_host_parent());
        assert!(WorkTag::HostPortal.is_host_parent());
        assert!(WorkTag::HostComponent.is_host_parent());
        assert!(!WorkTag::HostText.is_host_parent());
        assert!(!WorkTag::ClassComponent.is_host_parent());
    }

    #[test]
    fn effect_bits_compose() {
        let mut effect = EffectTag::NONE;
        effect |= EffectTag::PLACEMENT;
        effect |= EffectTag::UPDATE;
        assert!(effect.intersects(EffectTag::HOST_EFFECTS));
        effect.remove(EffectTag::HOST_EFFECTS);
        assert_eq!(effect, EffectTag::NONE);
    }
}
