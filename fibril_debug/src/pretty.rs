// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Host
//! timestamps are printed in milliseconds, expiration times as raw units.

use std::io::Write;

use fibril_core::trace::{
    BatchEvent, BatchEventKind, CommitSummary, FiberEffect, InterruptEvent, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, TraceSink, UpdateScheduledEvent, YieldEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Render => "render",
        PhaseKind::Commit => "commit",
    }
}

fn batch_kind_name(kind: BatchEventKind) -> &'static str {
    match kind {
        BatchEventKind::Created => "created",
        BatchEventKind::Rendered => "rendered",
        BatchEventKind::Blocked => "blocked",
        BatchEventKind::Completed => "completed",
        BatchEventKind::Committed => "committed",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_update_scheduled(&mut self, e: &UpdateScheduledEvent) {
        let _ = writeln!(
            self.writer,
            "[update] root={} expiration={} at {}ms",
            e.root, e.expiration.0, e.timestamp_ms,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] root={} {} expiration={} at {}ms",
            e.root,
            phase_name(e.phase),
            e.expiration.0,
            e.timestamp_ms,
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] root={} {} expiration={} at {}ms",
            e.root,
            phase_name(e.phase),
            e.expiration.0,
            e.timestamp_ms,
        );
    }

    fn on_yield(&mut self, e: &YieldEvent) {
        let _ = writeln!(
            self.writer,
            "[yield] root={} expiration={} units={}",
            e.root, e.expiration.0, e.units,
        );
    }

    fn on_interrupt(&mut self, e: &InterruptEvent) {
        let _ = writeln!(
            self.writer,
            "[interrupt] root={} expiration={} freed={}",
            e.root, e.expiration.0, e.freed,
        );
    }

    fn on_commit_summary(&mut self, s: &CommitSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] root={} expiration={} placements={} updates={} deletions={} at {}ms",
            s.root, s.expiration.0, s.placements, s.updates, s.deletions, s.timestamp_ms,
        );
    }

    fn on_batch(&mut self, e: &BatchEvent) {
        let _ = writeln!(
            self.writer,
            "[batch:{}] root={} expiration={}",
            batch_kind_name(e.kind),
            e.root,
            e.expiration.0,
        );
    }

    fn on_fiber_effects(&mut self, root: u32, effects: &[FiberEffect]) {
        let _ = writeln!(self.writer, "[effects] root={root} fibers={}", effects.len());
    }
}
