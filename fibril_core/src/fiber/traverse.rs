// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use alloc::vec::Vec;

use super::id::{FiberId, INVALID};
use super::store::FiberStore;

/// An iterator over the direct children of a fiber.
///
/// Created by [`FiberStore::children`].
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a FiberStore,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a FiberStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = FiberId;

    fn next(&mut self) -> Option<FiberId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.sibling[idx as usize];
        Some(self.store.id_at(idx))
    }
}

/// A pre-order iterator over a fiber and all of its descendants, yielding
/// each fiber with its depth relative to the start.
///
/// Created by [`FiberStore::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    store: &'a FiberStore,
    stack: Vec<(u32, usize)>,
}

impl<'a> Descendants<'a> {
    pub(crate) fn new(store: &'a FiberStore, start: u32) -> Self {
        let mut stack = Vec::new();
        stack.push((start, 0));
        Self { store, stack }
    }
}

impl Iterator for Descendants<'_> {
    type Item = (FiberId, usize);

    fn next(&mut self) -> Option<(FiberId, usize)> {
        let (idx, depth) = self.stack.pop()?;
        let first = self.stack.len();
        let mut child = self.store.child[idx as usize];
        while child != INVALID {
            self.stack.push((child, depth + 1));
            child = self.store.sibling[child as usize];
        }
        self.stack[first..].reverse();
        Some((self.store.id_at(idx), depth))
    }
}
