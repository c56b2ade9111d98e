// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Completion handles for scheduled updates.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

/// A completion callback.
pub type Callback = Box<dyn FnOnce()>;

/// The completion contract of one scheduled update.
///
/// Callbacks registered with [`then`](Self::then) fire exactly once, in
/// registration order, when the update commits. Registering after the commit
/// fires the callback immediately. Cloning a `Work` yields another handle to
/// the same contract.
#[derive(Clone, Default)]
pub struct Work {
    state: Rc<RefCell<WorkState>>,
}

#[derive(Default)]
struct WorkState {
    did_commit: bool,
    callbacks: Vec<Callback>,
}

impl Work {
    /// Creates a handle whose update has not committed yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `on_commit` to run when the update commits.
    pub fn then(&self, on_commit: impl FnOnce() + 'static) {
        self.then_boxed(Box::new(on_commit));
    }

    pub(crate) fn then_boxed(&self, on_commit: Callback) {
        let mut state = self.state.borrow_mut();
        if state.did_commit {
            drop(state);
            on_commit();
            return;
        }
        state.callbacks.push(on_commit);
    }

    /// Returns whether the update has committed.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.state.borrow().did_commit
    }

    /// Marks the update as committed and fires the queued callbacks.
    ///
    /// Later calls are no-ops.
    pub(crate) fn on_commit(&self) {
        let callbacks = {
            let mut state = self.state.borrow_mut();
            if state.did_commit {
                return;
            }
            state.did_commit = true;
            core::mem::take(&mut state.callbacks)
        };
        for callback in callbacks {
            callback();
        }
    }
}

impl fmt::Debug for Work {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Work")
            .field("did_commit", &state.did_commit)
            .field("callbacks", &state.callbacks.len())
            .finish()
    }
}
