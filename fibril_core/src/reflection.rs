// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree identity resolution.
//!
//! Any fiber handle may belong to either tree version: the committed one or a
//! work-in-progress one. The functions here decide whether a fiber is mounted
//! at all ([`mount_status`]), which of a fiber and its alternate belongs to the
//! committed tree ([`find_current_fiber`]), and which committed host node a
//! fiber ultimately renders to ([`find_current_host_fiber`]).
//!
//! # The lockstep walk
//!
//! [`find_current_fiber`] climbs from a fiber `a` and its alternate `b` in
//! lockstep. At every level the parents `parent_a` and `parent_b` must be each
//! other's alternates. Three cases decide how to continue:
//!
//! 1. Both parents share one child list (a bail-out left it untouched). The
//!    list is scanned once; whichever of `a` or `b` is in it belongs to
//!    `parent_a`'s version, so the answer is known immediately.
//! 2. `a` and `b` have different `return` pointers. Each simply moves to its
//!    own parent. Parent chains never criss-cross, so no scan is needed.
//! 3. `a` and `b` have the same `return`. The child lists of both parents are
//!    scanned to find out which parent each of them really belongs to.
//!
//! The walk ends at a host root, whose root record names the committed
//! host-root fiber. If the chain that started at the fiber ended there, the
//! fiber is current; otherwise its alternate is.

use crate::error::{Error, Result};
use crate::fiber::{FiberId, FiberStore, INVALID};
use crate::tag::{EffectTag, WorkTag};

/// Whether a fiber is part of a mounted tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MountStatus {
    /// Inserted by a render that has not committed yet.
    Mounting,
    /// Reachable from a host root.
    Mounted,
    /// Disconnected from every host root.
    Unmounted,
}

/// Computes the mount status of a fiber.
///
/// A fiber without an alternate has never been committed on its own; if it or
/// any ancestor still carries [`PLACEMENT`](EffectTag::PLACEMENT), it is
/// [`Mounting`](MountStatus::Mounting). Otherwise the fiber is
/// [`Mounted`](MountStatus::Mounted) exactly when its root-most ancestor is a
/// host root. Stale handles are [`Unmounted`](MountStatus::Unmounted).
#[must_use]
pub fn mount_status(store: &FiberStore, fiber: FiberId) -> MountStatus {
    if !store.is_alive(fiber) {
        return MountStatus::Unmounted;
    }
    mount_status_at(store, fiber.idx)
}

/// Returns whether the fiber is [`Mounted`](MountStatus::Mounted).
#[must_use]
pub fn is_fiber_mounted(store: &FiberStore, fiber: FiberId) -> bool {
    mount_status(store, fiber) == MountStatus::Mounted
}

/// Returns whether the component behind a fiber is mounted.
///
/// `None` (a component that never rendered) is not mounted.
#[must_use]
pub fn is_mounted(store: &FiberStore, fiber: Option<FiberId>) -> bool {
    fiber.is_some_and(|fiber| is_fiber_mounted(store, fiber))
}

pub(crate) fn mount_status_at(store: &FiberStore, idx: u32) -> MountStatus {
    let mut node = idx;
    if store.alternate[node as usize] == INVALID {
        if store.effect[node as usize].contains(EffectTag::PLACEMENT) {
            return MountStatus::Mounting;
        }
        while store.ret[node as usize] != INVALID {
            node = store.ret[node as usize];
            if store.effect[node as usize].contains(EffectTag::PLACEMENT) {
                return MountStatus::Mounting;
            }
        }
    } else {
        while store.ret[node as usize] != INVALID {
            node = store.ret[node as usize];
        }
    }
    if store.tag[node as usize] == WorkTag::HostRoot {
        MountStatus::Mounted
    } else {
        MountStatus::Unmounted
    }
}

/// Returns which of `fiber` and its alternate belongs to the committed tree.
///
/// Returns `Ok(None)` when the fiber has no alternate and is still mounting.
///
/// # Errors
///
/// Returns [`Error::NotFound`] when the fiber (or the parent whose shared
/// child list decided the answer) is not mounted.
///
/// # Panics
///
/// Panics when the tree is structurally corrupt: the pair's parents are not
/// each other's alternates, or a child is in neither parent's child list.
pub fn find_current_fiber(store: &FiberStore, fiber: FiberId) -> Result<Option<FiberId>> {
    if !store.is_alive(fiber) {
        return Err(Error::NotFound);
    }
    let alternate = store.alternate[fiber.idx as usize];
    if alternate == INVALID {
        return match mount_status_at(store, fiber.idx) {
            MountStatus::Unmounted => Err(Error::NotFound),
            MountStatus::Mounting => Ok(None),
            MountStatus::Mounted => Ok(Some(fiber)),
        };
    }
    let alternate = store.id_at(alternate);

    let mut a = fiber.idx;
    let mut b = alternate.idx;
    loop {
        let parent_a = store.ret[a as usize];
        let parent_b = if parent_a == INVALID {
            INVALID
        } else {
            store.alternate[parent_a as usize]
        };
        if parent_a == INVALID || parent_b == INVALID {
            // One chain reached its root first.
            break;
        }

        if store.child[parent_a as usize] == store.child[parent_b as usize] {
            // Shared child list: whichever of `a`/`b` is in it belongs to
            // `parent_a`'s version.
            let mut child = store.child[parent_a as usize];
            while child != INVALID {
                if child == a {
                    assert_mounted(store, parent_a)?;
                    return Ok(Some(fiber));
                }
                if child == b {
                    assert_mounted(store, parent_a)?;
                    return Ok(Some(alternate));
                }
                child = store.sibling[child as usize];
            }
            panic!("Child was not found in the shared child set of its parents");
        }

        if store.ret[a as usize] != store.ret[b as usize] {
            // Chains never criss-cross: each fiber's return is its own parent.
            a = parent_a;
            b = parent_b;
        } else {
            // Same return: find which parent each fiber really belongs to.
            let (next_a, next_b) = if contains_child(store, parent_a, a) {
                (parent_a, parent_b)
            } else if contains_child(store, parent_a, b) {
                (parent_b, parent_a)
            } else if contains_child(store, parent_b, a) {
                (parent_b, parent_a)
            } else if contains_child(store, parent_b, b) {
                (parent_a, parent_b)
            } else {
                panic!(
                    "Child was not found in either parent set. \
                     This indicates a bug in the reconciler related to return pointers."
                );
            };
            a = next_a;
            b = next_b;
        }

        assert!(
            store.alternate[a as usize] == b,
            "Return fibers should always be each others' alternates. \
             This error is likely caused by a bug in the reconciler."
        );
    }

    if store.tag[a as usize] != WorkTag::HostRoot {
        return Err(Error::NotFound);
    }
    let root = store.root_of(store.id_at(a)).ok_or(Error::NotFound)?;
    if store.root_current[root.0 as usize] == a {
        Ok(Some(fiber))
    } else {
        Ok(Some(alternate))
    }
}

fn assert_mounted(store: &FiberStore, idx: u32) -> Result<()> {
    if mount_status_at(store, idx) == MountStatus::Mounted {
        Ok(())
    } else {
        Err(Error::NotFound)
    }
}

fn contains_child(store: &FiberStore, parent: u32, target: u32) -> bool {
    let mut child = store.child[parent as usize];
    while child != INVALID {
        if child == target {
            return true;
        }
        child = store.sibling[child as usize];
    }
    false
}

/// Finds the first committed host fiber (element or text) at or below the
/// committed counterpart of `parent`, in pre-order.
///
/// `return` links are repaired on the way down, since a committed child list
/// may still point at the work-in-progress parent.
///
/// # Errors
///
/// Propagates [`Error::NotFound`] from [`find_current_fiber`].
pub fn find_current_host_fiber(store: &mut FiberStore, parent: FiberId) -> Result<Option<FiberId>> {
    find_host(store, parent, true)
}

/// Like [`find_current_host_fiber`], but never descends into portals.
///
/// # Errors
///
/// Propagates [`Error::NotFound`] from [`find_current_fiber`].
pub fn find_current_host_fiber_with_no_portals(
    store: &mut FiberStore,
    parent: FiberId,
) -> Result<Option<FiberId>> {
    find_host(store, parent, false)
}

fn find_host(store: &mut FiberStore, parent: FiberId, into_portals: bool) -> Result<Option<FiberId>> {
    let Some(current_parent) = find_current_fiber(store, parent)? else {
        return Ok(None);
    };
    let start = current_parent.idx;
    let mut node = start;
    loop {
        let tag = store.tag[node as usize];
        if tag.is_host() {
            return Ok(Some(store.id_at(node)));
        }
        let child = store.child[node as usize];
        if child != INVALID && (into_portals || tag != WorkTag::HostPortal) {
            store.ret[child as usize] = node;
            node = child;
            continue;
        }
        if node == start {
            return Ok(None);
        }
        while store.sibling[node as usize] == INVALID {
            let up = store.ret[node as usize];
            if up == INVALID || up == start {
                return Ok(None);
            }
            node = up;
        }
        let sibling = store.sibling[node as usize];
        store.ret[sibling as usize] = store.ret[node as usize];
        node = sibling;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::fiber::Props;

    /// Committed root `r` with a single host child `c`.
    fn mounted_pair() -> (FiberStore, FiberId, FiberId) {
        let mut store = FiberStore::new();
        let r = store.create_host_root();
        let c = store.create_fiber(WorkTag::HostComponent);
        store.append_child(r, c);
        (store, r, c)
    }

    #[test]
    fn fresh_tree_is_mounted() {
        let (store, r, c) = mounted_pair();
        assert_eq!(mount_status(&store, c), MountStatus::Mounted);
        assert_eq!(mount_status(&store, r), MountStatus::Mounted);
        assert_eq!(find_current_fiber(&store, c), Ok(Some(c)));
    }

    #[test]
    fn placement_on_path_is_mounting() {
        let (mut store, _, c) = mounted_pair();
        let leaf = store.create_fiber(WorkTag::HostText);
        store.append_child(c, leaf);
        store.set_effect(c, EffectTag::PLACEMENT);
        assert_eq!(mount_status(&store, leaf), MountStatus::Mounting);
        assert_eq!(find_current_fiber(&store, leaf), Ok(None));
    }

    #[test]
    fn alternate_skips_placement_scan() {
        let (mut store, r, c) = mounted_pair();
        let c2 = store.create_work_in_progress(c, Props::None);
        store.set_return(c2, Some(r));
        store.set_effect(c, EffectTag::PLACEMENT);
        assert_eq!(mount_status(&store, c), MountStatus::Mounted);
    }

    #[test]
    fn disconnected_is_unmounted() {
        let mut store = FiberStore::new();
        let orphan = store.create_fiber(WorkTag::Fragment);
        let leaf = store.create_fiber(WorkTag::HostText);
        store.append_child(orphan, leaf);
        assert_eq!(mount_status(&store, leaf), MountStatus::Unmounted);
        assert_eq!(find_current_fiber(&store, leaf), Err(Error::NotFound));
        assert!(!is_mounted(&store, Some(leaf)));
        assert!(!is_mounted(&store, None));
    }

    #[test]
    fn stale_handle_is_unmounted() {
        let (mut store, _, c) = mounted_pair();
        store.detach(c);
        store.destroy_fiber(c);
        assert_eq!(mount_status(&store, c), MountStatus::Unmounted);
        assert_eq!(find_current_fiber(&store, c), Err(Error::NotFound));
    }

    /// Committed `r -> c` and work-in-progress `r2 -> c2`, fully paired.
    fn dual_tree() -> (FiberStore, FiberId, FiberId, FiberId, FiberId) {
        let (mut store, r, c) = mounted_pair();
        let r2 = store.create_work_in_progress(r, Props::None);
        let c2 = store.create_work_in_progress(c, Props::None);
        store.set_first_child(r2, Some(c2));
        store.set_return(c2, Some(r2));
        (store, r, c, r2, c2)
    }

    #[test]
    fn divergent_chains_resolve_through_root_record() {
        let (mut store, _, c, r2, c2) = dual_tree();
        assert_eq!(find_current_fiber(&store, c), Ok(Some(c)));
        assert_eq!(find_current_fiber(&store, c2), Ok(Some(c)));

        store.set_root_current(r2);
        assert_eq!(find_current_fiber(&store, c), Ok(Some(c2)));
        assert_eq!(find_current_fiber(&store, c2), Ok(Some(c2)));
    }

    #[test]
    fn shared_child_list_decides_immediately() {
        let (mut store, r, c) = mounted_pair();
        let r2 = store.create_work_in_progress(r, Props::None);
        // Bail-out: both root versions share `c`, whose return points at r2.
        store.set_return(c, Some(r2));
        // `c` has a stale alternate that sits in no child list.
        let stale = store.create_work_in_progress(c, Props::None);
        store.set_return(stale, Some(r));

        assert_eq!(find_current_fiber(&store, stale), Ok(Some(c)));
        assert_eq!(find_current_fiber(&store, c), Ok(Some(c)));
    }

    #[test]
    fn same_return_scans_both_parents() {
        let (mut store, r, c, r2, c2) = dual_tree();
        // Both versions point at r, but r2 owns `c` while r owns `c2`.
        store.set_first_child(r, Some(c2));
        store.set_first_child(r2, Some(c));
        store.set_return(c, Some(r));
        store.set_return(c2, Some(r));

        // r is committed, and r's child list holds c2.
        assert_eq!(find_current_fiber(&store, c), Ok(Some(c2)));
        assert_eq!(find_current_fiber(&store, c2), Ok(Some(c2)));
    }

    #[test]
    #[should_panic(expected = "Child was not found in either parent set")]
    fn missing_child_is_structural_error() {
        let (mut store, r, c, r2, c2) = dual_tree();
        let x = store.create_fiber(WorkTag::HostText);
        let y = store.create_fiber(WorkTag::HostText);
        store.set_first_child(r, Some(x));
        store.set_first_child(r2, Some(y));
        store.set_return(c, Some(r));
        store.set_return(c2, Some(r));
        let _ = find_current_fiber(&store, c);
    }

    #[test]
    #[should_panic(expected = "Return fibers should always be each others' alternates")]
    fn asymmetric_alternates_are_structural_error() {
        let (mut store, r, c, r2, c2) = dual_tree();
        store.set_first_child(r, Some(c2));
        store.set_first_child(r2, Some(c));
        store.set_return(c, Some(r));
        store.set_return(c2, Some(r));
        let impostor = store.create_fiber(WorkTag::HostRoot);
        // r -> r2, but r2 -> impostor.
        store.alternate[r2.idx as usize] = impostor.idx;
        let _ = find_current_fiber(&store, c);
    }

    #[test]
    fn host_lookup_skips_components() {
        let (mut store, _, c) = mounted_pair();
        store.tag[c.idx as usize] = WorkTag::FunctionComponent;
        let inner = store.create_fiber(WorkTag::ClassComponent);
        store.append_child(c, inner);
        assert_eq!(find_current_host_fiber(&mut store, c), Ok(None));
    }

    #[test]
    fn host_lookup_finds_first_host_in_preorder() {
        let mut store = FiberStore::new();
        let r = store.create_host_root();
        let fragment = store.create_fiber(WorkTag::Fragment);
        let empty = store.create_fiber(WorkTag::FunctionComponent);
        let host = store.create_fiber(WorkTag::HostComponent);
        let later = store.create_fiber(WorkTag::HostText);
        store.append_child(r, fragment);
        store.append_child(fragment, empty);
        store.append_child(fragment, host);
        store.append_child(r, later);

        assert_eq!(find_current_host_fiber(&mut store, r), Ok(Some(host)));
        assert_eq!(find_current_host_fiber(&mut store, empty), Ok(None));
    }

    #[test]
    fn host_lookup_repairs_return_links() {
        let (mut store, r, c) = mounted_pair();
        store.tag[c.idx as usize] = WorkTag::Fragment;
        let leaf = store.create_fiber(WorkTag::HostText);
        store.append_child(c, leaf);
        let stray = store.create_fiber(WorkTag::Fragment);
        store.set_return(leaf, Some(stray));

        assert_eq!(find_current_host_fiber(&mut store, r), Ok(Some(leaf)));
        assert_eq!(store.parent(leaf), Some(c));
    }

    #[test]
    fn no_portals_variant_stops_at_portal() {
        let mut store = FiberStore::new();
        let r = store.create_host_root();
        let portal = store.create_fiber(WorkTag::HostPortal);
        let inside = store.create_fiber(WorkTag::HostComponent);
        store.append_child(r, portal);
        store.append_child(portal, inside);

        assert_eq!(find_current_host_fiber(&mut store, r), Ok(Some(inside)));
        assert_eq!(find_current_host_fiber_with_no_portals(&mut store, r), Ok(None));
    }

    #[test]
    fn host_lookup_on_unmounted_fiber_fails() {
        let mut store = FiberStore::new();
        let orphan = store.create_fiber(WorkTag::HostComponent);
        assert_eq!(find_current_host_fiber(&mut store, orphan), Err(Error::NotFound));
    }

    fn chain(placements: &[bool], rooted: bool) -> (FiberStore, FiberId) {
        let mut store = FiberStore::new();
        let mut parent = if rooted {
            store.create_host_root()
        } else {
            store.create_fiber(WorkTag::HostComponent)
        };
        for &placed in placements {
            let next = store.create_fiber(WorkTag::HostComponent);
            store.append_child(parent, next);
            if placed {
                store.set_effect(next, EffectTag::PLACEMENT);
            }
            parent = next;
        }
        (store, parent)
    }

    proptest! {
        #[test]
        fn prop_mount_status_of_unpaired_chain(
            placements in proptest::collection::vec(any::<bool>(), 1..12),
            rooted in any::<bool>(),
        ) {
            let (store, leaf) = chain(&placements, rooted);
            let expected = if placements.iter().any(|p| *p) {
                MountStatus::Mounting
            } else if rooted {
                MountStatus::Mounted
            } else {
                MountStatus::Unmounted
            };
            prop_assert_eq!(mount_status(&store, leaf), expected);
            prop_assert_eq!(is_fiber_mounted(&store, leaf), expected == MountStatus::Mounted);
            let resolved = find_current_fiber(&store, leaf);
            match expected {
                MountStatus::Mounting => prop_assert_eq!(resolved, Ok(None)),
                MountStatus::Mounted => prop_assert_eq!(resolved, Ok(Some(leaf))),
                MountStatus::Unmounted => prop_assert_eq!(resolved, Err(Error::NotFound)),
            }
        }
    }
}
