// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the work loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! reconciler calls as updates are scheduled, rendered, and committed. All
//! method bodies default to no-ops, so implementing only the events you care
//! about is fine.
//!
//! [`Tracer`] owns an optional boxed [`TraceSink`]. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! Sinks are moved into the reconciler. To read a sink back after a run,
//! install an `Rc<RefCell<S>>` clone; it forwards every event to `S`.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`FiberEffect`] records and the
//!   corresponding `TraceSink` method.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;

use crate::expiration::ExpirationTime;
#[cfg(feature = "trace-rich")]
use crate::tag::{EffectTag, WorkTag};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of the work loop is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Building the work-in-progress tree (interruptible).
    Render,
    /// Applying effects to the host and flipping `current`.
    Commit,
}

/// What happened to a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BatchEventKind {
    /// Inserted into its root's batch list.
    Created,
    /// Children were rendered into it.
    Rendered,
    /// A completed render was held back because the batch has not committed.
    Blocked,
    /// Its render completed.
    Completed,
    /// Committed and unlinked.
    Committed,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when an update is enqueued on a root.
#[derive(Clone, Copy, Debug)]
pub struct UpdateScheduledEvent {
    /// Root slot index.
    pub root: u32,
    /// Expiration time of the update.
    pub expiration: ExpirationTime,
    /// Host time in milliseconds.
    pub timestamp_ms: u64,
}

/// Marks the beginning of a work-loop phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Root slot index.
    pub root: u32,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Expiration time being worked on.
    pub expiration: ExpirationTime,
    /// Host time in milliseconds.
    pub timestamp_ms: u64,
}

/// Marks the end of a work-loop phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Root slot index.
    pub root: u32,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Expiration time being worked on.
    pub expiration: ExpirationTime,
    /// Host time in milliseconds.
    pub timestamp_ms: u64,
}

/// Emitted when a render runs out of budget and yields.
#[derive(Clone, Copy, Debug)]
pub struct YieldEvent {
    /// Root slot index.
    pub root: u32,
    /// Expiration time of the suspended render.
    pub expiration: ExpirationTime,
    /// Units of work performed before yielding.
    pub units: u32,
}

/// Emitted when an unfinished or uncommitted render is discarded.
#[derive(Clone, Copy, Debug)]
pub struct InterruptEvent {
    /// Root slot index.
    pub root: u32,
    /// Expiration time of the discarded render.
    pub expiration: ExpirationTime,
    /// Fibers released by the rollback.
    pub freed: u32,
}

/// Per-commit summary.
#[derive(Clone, Copy, Debug, Default)]
pub struct CommitSummary {
    /// Root slot index.
    pub root: u32,
    /// Expiration time of the committed render.
    pub expiration: ExpirationTime,
    /// Fibers inserted or moved.
    pub placements: u32,
    /// Fibers whose host node was patched.
    pub updates: u32,
    /// Subtrees removed.
    pub deletions: u32,
    /// Host time in milliseconds when the commit finished.
    pub timestamp_ms: u64,
}

/// Emitted on batch lifecycle transitions.
#[derive(Clone, Copy, Debug)]
pub struct BatchEvent {
    /// Root slot index.
    pub root: u32,
    /// Expiration time of the batch at the time of the event.
    pub expiration: ExpirationTime,
    /// What happened.
    pub kind: BatchEventKind,
}

/// A per-commit fiber effect record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct FiberEffect {
    /// Slot index of the fiber.
    pub fiber: u32,
    /// Kind of the fiber.
    pub tag: WorkTag,
    /// Effects applied.
    pub effect: EffectTag,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the work loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when an update is enqueued.
    fn on_update_scheduled(&mut self, e: &UpdateScheduledEvent) {
        _ = e;
    }

    /// Called at the beginning of a phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when a render yields.
    fn on_yield(&mut self, e: &YieldEvent) {
        _ = e;
    }

    /// Called when a render is discarded.
    fn on_interrupt(&mut self, e: &InterruptEvent) {
        _ = e;
    }

    /// Called with a per-commit summary.
    fn on_commit_summary(&mut self, s: &CommitSummary) {
        _ = s;
    }

    /// Called on batch lifecycle transitions.
    fn on_batch(&mut self, e: &BatchEvent) {
        _ = e;
    }

    /// Called with the effects of one commit (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_fiber_effects(&mut self, root: u32, effects: &[FiberEffect]) {
        _ = (root, effects);
    }
}

impl<T: TraceSink> TraceSink for Rc<RefCell<T>> {
    fn on_update_scheduled(&mut self, e: &UpdateScheduledEvent) {
        self.borrow_mut().on_update_scheduled(e);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.borrow_mut().on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.borrow_mut().on_phase_end(e);
    }

    fn on_yield(&mut self, e: &YieldEvent) {
        self.borrow_mut().on_yield(e);
    }

    fn on_interrupt(&mut self, e: &InterruptEvent) {
        self.borrow_mut().on_interrupt(e);
    }

    fn on_commit_summary(&mut self, s: &CommitSummary) {
        self.borrow_mut().on_commit_summary(s);
    }

    fn on_batch(&mut self, e: &BatchEvent) {
        self.borrow_mut().on_batch(e);
    }

    #[cfg(feature = "trace-rich")]
    fn on_fiber_effects(&mut self, root: u32, effects: &[FiberEffect]) {
        self.borrow_mut().on_fiber_effects(root, effects);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional owned [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
#[derive(Default)]
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Tracer {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            drop(sink);
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Removes and returns the sink, if any.
    pub fn take(&mut self) -> Option<Box<dyn TraceSink>> {
        #[cfg(feature = "trace")]
        {
            self.sink.take()
        }
        #[cfg(not(feature = "trace"))]
        {
            None
        }
    }

    /// Emits an [`UpdateScheduledEvent`].
    #[inline]
    pub fn update_scheduled(&mut self, e: &UpdateScheduledEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_update_scheduled(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`YieldEvent`].
    #[inline]
    pub fn yielded(&mut self, e: &YieldEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_yield(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`InterruptEvent`].
    #[inline]
    pub fn interrupted(&mut self, e: &InterruptEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_interrupt(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CommitSummary`].
    #[inline]
    pub fn commit_summary(&mut self, summary: &CommitSummary) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_commit_summary(summary);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = summary;
        }
    }

    /// Emits a [`BatchEvent`].
    #[inline]
    pub fn batch(&mut self, e: &BatchEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_batch(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits fiber effect records (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn fiber_effects(&mut self, root: u32, effects: &[FiberEffect]) {
        if let Some(s) = &mut self.sink {
            s.on_fiber_effects(root, effects);
        }
    }

    /// Returns whether events would reach a sink.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_summary() -> CommitSummary {
        CommitSummary {
            root: 0,
            expiration: ExpirationTime::SYNC,
            placements: 2,
            updates: 1,
            deletions: 0,
            timestamp_ms: 16,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_commit_summary(&sample_summary());
        sink.on_batch(&BatchEvent {
            root: 0,
            expiration: ExpirationTime(30),
            kind: BatchEventKind::Created,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        assert!(!tracer.is_active());
        tracer.commit_summary(&sample_summary());
        assert!(tracer.take().is_none());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_shared_sink() {
        use alloc::vec::Vec;

        #[derive(Default)]
        struct RecordingSink {
            placements: Vec<u32>,
        }
        impl TraceSink for RecordingSink {
            fn on_commit_summary(&mut self, s: &CommitSummary) {
                self.placements.push(s.placements);
            }
        }

        let sink = Rc::new(RefCell::new(RecordingSink::default()));
        let mut tracer = Tracer::new(Box::new(sink.clone()));
        assert!(tracer.is_active());
        tracer.commit_summary(&sample_summary());
        drop(tracer);
        assert_eq!(sink.borrow().placements, &[2]);
    }
}
