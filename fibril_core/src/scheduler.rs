// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Expiration-time scheduling of root updates.
//!
//! Every update gets an [`ExpirationTime`]: [`SYNC`](ExpirationTime::SYNC)
//! for legacy roots and synchronous contexts, otherwise a bucketed deadline
//! in the future (short for interactive updates, long for everything else).
//! Roots with pending work are kept in a schedule; the most urgent one (the
//! lowest non-zero remaining expiration time) is worked on first.
//!
//! ```text
//!   schedule_work ──► request_work ──┬─ sync ──────► perform_work(SYNC)
//!                                    ├─ batching ──► (flushed when the batch ends)
//!                                    └─ async ─────► Host::request_deferred_work
//!                                                      └─► run_deferred(budget)
//! ```
//!
//! Sync work and expired work always run to completion. Other work runs in
//! slices bounded by a [`WorkBudget`] and resumes where it left off, unless a
//! new update that it would have included arrives in between.
//!
//! Completion notifications (batches first, then work handles) are delivered
//! after the outermost flush returns, never while the tree is being mutated.

use alloc::vec::Vec;
use core::mem;

use crate::batch::{Batch, BatchPhase};
use crate::expiration::ExpirationTime;
use crate::handle::Work;
use crate::host::Host;
use crate::reconciler::Reconciler;
use crate::root::RootId;
use crate::trace::{BatchEvent, BatchEventKind, InterruptEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, YieldEvent};
use crate::work::RenderState;

/// Timing parameters of the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SchedulerConfig {
    /// How far in the future ordinary asynchronous updates expire.
    pub low_priority_expiration_ms: u64,
    /// Bucket size that asynchronous expirations are rounded up to.
    pub low_priority_bucket_ms: u64,
    /// How far in the future interactive updates expire.
    pub interactive_expiration_ms: u64,
    /// Bucket size that interactive expirations are rounded up to.
    pub interactive_bucket_ms: u64,
    /// Whether this is a development build, as reported to devtools.
    pub development: bool,
}

impl SchedulerConfig {
    /// Production timings.
    #[must_use]
    pub const fn production() -> Self {
        Self {
            low_priority_expiration_ms: 5000,
            low_priority_bucket_ms: 250,
            interactive_expiration_ms: 150,
            interactive_bucket_ms: 100,
            development: false,
        }
    }

    /// Development timings: interactive updates get a longer deadline.
    #[must_use]
    pub const fn development() -> Self {
        Self {
            interactive_expiration_ms: 500,
            development: true,
            ..Self::production()
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::production()
    }
}

/// How much deferred work one call to
/// [`run_deferred`](Reconciler::run_deferred) may perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkBudget {
    /// At most this many units of work (one fiber each).
    Units(u32),
    /// Run until no deferred work is left.
    Unlimited,
}

/// Scheduler bookkeeping owned by the reconciler.
#[derive(Debug, Default)]
pub(crate) struct SchedulerState {
    /// Roots with pending work, in scheduling order.
    pub(crate) scheduled: Vec<RootId>,
    pub(crate) is_rendering: bool,
    pub(crate) is_committing: bool,
    pub(crate) is_batching: bool,
    pub(crate) is_unbatching: bool,
    pub(crate) is_batching_interactive: bool,
    /// Forced expiration time for updates scheduled inside
    /// [`sync_updates`](Reconciler::sync_updates) and
    /// [`deferred_updates`](Reconciler::deferred_updates).
    pub(crate) expiration_context: ExpirationTime,
    pub(crate) lowest_pending_interactive: ExpirationTime,
    pub(crate) last_unique_async: ExpirationTime,
    /// A render that yielded and can be resumed.
    pub(crate) render: Option<RenderState>,
    pub(crate) completed_batches: Vec<Batch>,
    pub(crate) committed_work: Vec<Work>,
    pub(crate) deferred_requested: bool,
}

impl<H: Host> Reconciler<H> {
    // -- Expiration times --

    /// Returns the current time as an expiration time.
    #[must_use]
    pub fn current_time(&self) -> ExpirationTime {
        ExpirationTime::from_ms(self.host.now().saturating_sub(self.start_ms))
    }

    fn async_expiration(&self, now: ExpirationTime) -> ExpirationTime {
        ExpirationTime::bucket(
            now,
            self.config.low_priority_expiration_ms,
            self.config.low_priority_bucket_ms,
        )
    }

    fn interactive_expiration(&self, now: ExpirationTime) -> ExpirationTime {
        ExpirationTime::bucket(
            now,
            self.config.interactive_expiration_ms,
            self.config.interactive_bucket_ms,
        )
    }

    /// Returns an asynchronous expiration time later than every one handed
    /// out by this function before.
    pub(crate) fn compute_unique_async_expiration(&mut self) -> ExpirationTime {
        let mut result = self.async_expiration(self.current_time());
        if result <= self.scheduler.last_unique_async {
            result = ExpirationTime(self.scheduler.last_unique_async.0 + 1);
        }
        self.scheduler.last_unique_async = result;
        result
    }

    /// Returns the expiration time of an update scheduled now on a root.
    pub(crate) fn compute_expiration_for_root(&mut self, concurrent: bool) -> ExpirationTime {
        let scheduler = &self.scheduler;
        let expiration = if !scheduler.expiration_context.is_no_work() {
            scheduler.expiration_context
        } else if scheduler.is_rendering {
            if scheduler.is_committing {
                ExpirationTime::SYNC
            } else {
                scheduler
                    .render
                    .as_ref()
                    .map_or(ExpirationTime::SYNC, |render| render.expiration)
            }
        } else if concurrent {
            let now = self.current_time();
            if scheduler.is_batching_interactive {
                self.interactive_expiration(now)
            } else {
                self.async_expiration(now)
            }
        } else {
            ExpirationTime::SYNC
        };

        let lowest = self.scheduler.lowest_pending_interactive;
        if self.scheduler.is_batching_interactive && (lowest.is_no_work() || expiration > lowest) {
            self.scheduler.lowest_pending_interactive = expiration;
        }
        expiration
    }

    // -- Scheduling --

    /// Records that `root` has an update at `expiration` and requests work.
    ///
    /// A render of the root that this update would have been part of is
    /// discarded, whether it is still in progress or finished and waiting on
    /// a batch.
    pub(crate) fn schedule_work(&mut self, root: RootId, expiration: ExpirationTime) {
        let includes = |render: &RenderState| render.root == root && expiration.within(render.expiration);
        if !self.scheduler.is_rendering
            && let Some(render) = self.scheduler.render.take_if(|render| includes(render))
        {
            self.interrupt(render);
        }
        let Some(state) = self.roots.get_mut(root) else {
            return;
        };
        if let Some(finished) = state.finished.take_if(|render| includes(render)) {
            state.remaining = state.queue.remaining();
            self.interrupt(finished);
        } else if state.finished.is_some() {
            state.remaining = state.remaining.most_urgent(expiration);
        } else {
            state.remaining = state.queue.remaining();
        }
        self.request_work(root, expiration);
    }

    fn interrupt(&mut self, render: RenderState) {
        let root = render.root.idx;
        let expiration = render.expiration;
        let freed = self.discard_render(render);
        self.tracer.interrupted(&InterruptEvent {
            root,
            expiration,
            freed,
        });
    }

    pub(crate) fn add_root_to_schedule(&mut self, root: RootId) {
        if !self.scheduler.scheduled.contains(&root) {
            self.scheduler.scheduled.push(root);
        }
    }

    fn request_work(&mut self, root: RootId, expiration: ExpirationTime) {
        self.add_root_to_schedule(root);
        if self.scheduler.is_rendering {
            // The running flush picks it up.
            return;
        }
        if self.scheduler.is_batching {
            if self.scheduler.is_unbatching {
                self.perform_work_on_root(root, ExpirationTime::SYNC, true, &mut None);
            }
            return;
        }
        if expiration.is_sync() {
            self.perform_sync_work();
        } else {
            self.request_deferred_work();
        }
    }

    fn request_deferred_work(&mut self) {
        if !self.scheduler.deferred_requested {
            self.scheduler.deferred_requested = true;
            self.host.request_deferred_work();
        }
    }

    /// Returns the most urgent scheduled root, dropping roots that have
    /// nothing left to do.
    fn find_highest_priority_root(&mut self) -> Option<(RootId, ExpirationTime)> {
        let roots = &self.roots;
        self.scheduler
            .scheduled
            .retain(|id| roots.get(*id).is_some_and(|state| !state.remaining.is_no_work()));
        let mut best: Option<(RootId, ExpirationTime)> = None;
        for &id in &self.scheduler.scheduled {
            let Some(state) = roots.get(id) else {
                continue;
            };
            if best.is_none_or(|(_, expiration)| state.remaining < expiration) {
                best = Some((id, state.remaining));
            }
        }
        best
    }

    // -- Performing work --

    fn perform_sync_work(&mut self) {
        self.perform_work(ExpirationTime::SYNC, None);
    }

    /// Works on scheduled roots, most urgent first.
    ///
    /// A non-zero `min` stops at roots whose work is less urgent than it.
    /// `budget` bounds work that has not expired yet; `None` is unlimited.
    fn perform_work(&mut self, min: ExpirationTime, mut budget: Option<u32>) {
        while let Some((root, expiration)) = self.find_highest_priority_root() {
            if !min.is_no_work() && expiration > min {
                break;
            }
            let expired = expiration.is_sync() || expiration.has_expired(self.current_time());
            if budget == Some(0) && !expired {
                break;
            }
            self.perform_work_on_root(root, expiration, expired, &mut budget);
        }
        if self.has_pending_work() {
            self.request_deferred_work();
        }
        self.finish_rendering();
    }

    fn perform_work_on_root(
        &mut self,
        root: RootId,
        expiration: ExpirationTime,
        expired: bool,
        budget: &mut Option<u32>,
    ) {
        assert!(
            !self.scheduler.is_rendering,
            "perform_work_on_root was called recursively. This error is likely caused by a bug in the reconciler."
        );
        self.scheduler.is_rendering = true;

        let finished = self.roots.get_mut(root).and_then(|state| state.finished.take());
        if let Some(finished) = finished {
            self.complete_root(finished);
        } else {
            let mut limit = if expired { None } else { *budget };
            if let Some(finished) = self.render_root(root, expiration, &mut limit) {
                if expired || limit != Some(0) {
                    self.complete_root(finished);
                } else if let Some(state) = self.roots.get_mut(root) {
                    // Out of time: commit in the next slice.
                    state.finished = Some(finished);
                } else {
                    self.discard_render(finished);
                }
            }
            if !expired {
                *budget = limit;
            }
        }

        self.scheduler.is_rendering = false;
    }

    /// Renders `root` at `expiration`, resuming a yielded render when it is
    /// for the same root and expiration time. Returns the finished render, or
    /// `None` if it yielded.
    fn render_root(
        &mut self,
        root: RootId,
        expiration: ExpirationTime,
        budget: &mut Option<u32>,
    ) -> Option<RenderState> {
        let resumable = self
            .scheduler
            .render
            .take_if(|render| render.root == root && render.expiration == expiration);
        let mut render = match resumable {
            Some(render) => render,
            None => {
                if let Some(stale) = self.scheduler.render.take() {
                    self.interrupt(stale);
                }
                let render = self.prepare_render(root, expiration).ok()?;
                let timestamp_ms = self.host.now();
                self.tracer.phase_begin(&PhaseBeginEvent {
                    root: root.idx,
                    phase: PhaseKind::Render,
                    expiration,
                    timestamp_ms,
                });
                render
            }
        };

        if self.work_loop(&mut render, budget) {
            let timestamp_ms = self.host.now();
            self.tracer.phase_end(&PhaseEndEvent {
                root: root.idx,
                phase: PhaseKind::Render,
                expiration,
                timestamp_ms,
            });
            Some(render)
        } else {
            self.tracer.yielded(&YieldEvent {
                root: root.idx,
                expiration,
                units: render.units,
            });
            self.scheduler.render = Some(render);
            None
        }
    }

    /// Commits a finished render unless the root's first batch covers it
    /// and has not been committed yet; then the render waits for it.
    fn complete_root(&mut self, finished: RenderState) {
        let root = finished.root;
        let Some(state) = self.roots.get_mut(root) else {
            self.discard_render(finished);
            return;
        };
        let first = state
            .batches
            .first()
            .filter(|batch| batch.expiration() <= finished.expiration)
            .cloned();
        if let Some(first) = first {
            let expiration = first.expiration();
            let blocked = first.phase() != BatchPhase::Committed;
            if !self.scheduler.completed_batches.iter().any(|b| b.ptr_eq(&first)) {
                self.scheduler.completed_batches.push(first);
            }
            if blocked {
                state.finished = Some(finished);
                state.remaining = ExpirationTime::NO_WORK;
                self.tracer.batch(&BatchEvent {
                    root: root.idx,
                    expiration,
                    kind: BatchEventKind::Blocked,
                });
                return;
            }
        }
        self.commit_root(finished);
    }

    /// Delivers completion notifications: completed batches first, then
    /// committed work handles.
    fn finish_rendering(&mut self) {
        let batches = mem::take(&mut self.scheduler.completed_batches);
        for batch in batches {
            if batch.on_complete() {
                self.tracer.batch(&BatchEvent {
                    root: batch.root().idx,
                    expiration: batch.expiration(),
                    kind: BatchEventKind::Completed,
                });
            }
        }
        let works = mem::take(&mut self.scheduler.committed_work);
        for work in works {
            work.on_commit();
        }
    }

    // -- Entry points --

    /// Renders and commits `root` up to `expiration` right away, then flushes
    /// remaining sync work.
    ///
    /// # Panics
    ///
    /// Panics if called while the reconciler is rendering.
    pub fn flush_root(&mut self, root: RootId, expiration: ExpirationTime) {
        assert!(
            !self.scheduler.is_rendering,
            "work.commit(): Cannot commit while already rendering. This likely means you attempted to commit from inside a lifecycle method."
        );
        self.perform_work_on_root(root, expiration, true, &mut None);
        self.perform_sync_work();
    }

    /// Performs deferred work within `budget`.
    ///
    /// Returns whether deferred work is still pending afterwards; if so, the
    /// host has been asked again through
    /// [`Host::request_deferred_work`].
    pub fn run_deferred(&mut self, budget: WorkBudget) -> bool {
        self.scheduler.deferred_requested = false;
        let units = match budget {
            WorkBudget::Units(units) => Some(units),
            WorkBudget::Unlimited => None,
        };
        self.perform_work(ExpirationTime::NO_WORK, units);
        self.has_pending_work()
    }

    /// Renders and commits every pending update, regardless of priority.
    pub fn flush_all(&mut self) {
        self.perform_work(ExpirationTime::NO_WORK, None);
    }

    /// Returns whether any root has work left to do.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.scheduler.render.is_some()
            || self.scheduler.scheduled.iter().any(|id| {
                self.roots
                    .get(*id)
                    .is_some_and(|state| !state.remaining.is_no_work())
            })
    }

    /// Runs `f` with updates batched: sync work scheduled inside is flushed
    /// once, when the outermost batch ends.
    pub fn batched_updates<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = mem::replace(&mut self.scheduler.is_batching, true);
        let result = f(self);
        self.scheduler.is_batching = previous;
        if !previous && !self.scheduler.is_rendering {
            self.perform_sync_work();
        }
        result
    }

    /// Runs `f` with batching suspended: inside a batch, sync work scheduled
    /// by `f` is performed immediately.
    pub fn unbatched_updates<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        if self.scheduler.is_batching && !self.scheduler.is_unbatching {
            self.scheduler.is_unbatching = true;
            let result = f(self);
            self.scheduler.is_unbatching = false;
            return result;
        }
        f(self)
    }

    /// Runs `f` as an interactive batch: concurrent updates inside get the
    /// short interactive deadline.
    ///
    /// Pending interactive work from an earlier batch is flushed first.
    pub fn interactive_updates<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        if self.scheduler.is_batching_interactive {
            return f(self);
        }
        if !self.scheduler.is_batching && !self.scheduler.is_rendering {
            self.flush_interactive_updates();
        }
        let previous_interactive = mem::replace(&mut self.scheduler.is_batching_interactive, true);
        let previous_batching = mem::replace(&mut self.scheduler.is_batching, true);
        let result = f(self);
        self.scheduler.is_batching_interactive = previous_interactive;
        self.scheduler.is_batching = previous_batching;
        if !previous_batching && !self.scheduler.is_rendering {
            self.perform_sync_work();
        }
        result
    }

    /// Flushes interactive updates scheduled by earlier interactive batches.
    pub fn flush_interactive_updates(&mut self) {
        let lowest = self.scheduler.lowest_pending_interactive;
        if !self.scheduler.is_rendering && !lowest.is_no_work() {
            self.perform_work(lowest, None);
            self.scheduler.lowest_pending_interactive = ExpirationTime::NO_WORK;
        }
    }

    /// Runs `f` with every update inside it scheduled at low priority.
    pub fn deferred_updates<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let expiration = self.async_expiration(self.current_time());
        let previous = mem::replace(&mut self.scheduler.expiration_context, expiration);
        let result = f(self);
        self.scheduler.expiration_context = previous;
        result
    }

    /// Runs `f` with every update inside it scheduled as sync.
    pub fn sync_updates<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = mem::replace(&mut self.scheduler.expiration_context, ExpirationTime::SYNC);
        let result = f(self);
        self.scheduler.expiration_context = previous;
        result
    }

    /// Runs `f` with sync updates and flushes them before returning.
    ///
    /// # Panics
    ///
    /// Panics if called while the reconciler is rendering.
    pub fn flush_sync<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        assert!(
            !self.scheduler.is_rendering,
            "flush_sync was called while the reconciler is already rendering."
        );
        let previous = mem::replace(&mut self.scheduler.is_batching, true);
        let result = self.sync_updates(f);
        self.scheduler.is_batching = previous;
        self.perform_sync_work();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_only_stretches_interactive_deadline() {
        let production = SchedulerConfig::production();
        let development = SchedulerConfig::development();
        assert_eq!(development.interactive_expiration_ms, 500);
        assert_eq!(
            development.low_priority_expiration_ms,
            production.low_priority_expiration_ms
        );
        assert_eq!(development.interactive_bucket_ms, production.interactive_bucket_ms);
        assert!(development.development);
        assert_eq!(SchedulerConfig::default(), production);
    }
}
