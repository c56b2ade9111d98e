// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binary recording of reconciler trace events.
//!
//! Each event becomes a one-byte tag followed by its fields in little-endian
//! order, so a whole render can be kept in one `Vec<u8>` and inspected after
//! the fact. [`decode`] yields the events back as [`RecordedEvent`]s.
//!
//! Rich events ([`on_fiber_effects`](TraceSink::on_fiber_effects)) store only
//! the count.

use fibril_core::expiration::ExpirationTime;
use fibril_core::trace::{
    BatchEvent, BatchEventKind, CommitSummary, FiberEffect, InterruptEvent, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, TraceSink, UpdateScheduledEvent, YieldEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_UPDATE_SCHEDULED: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_YIELD: u8 = 4;
const TAG_INTERRUPT: u8 = 5;
const TAG_COMMIT_SUMMARY: u8 = 6;
const TAG_BATCH: u8 = 7;
const TAG_FIBER_EFFECTS_COUNT: u8 = 8;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_expiration(&mut self, e: ExpirationTime) {
        self.write_u32(e.0);
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Render => 0,
            PhaseKind::Commit => 1,
        });
    }

    fn write_batch_kind(&mut self, k: BatchEventKind) {
        self.write_u8(match k {
            BatchEventKind::Created => 0,
            BatchEventKind::Rendered => 1,
            BatchEventKind::Blocked => 2,
            BatchEventKind::Completed => 3,
            BatchEventKind::Committed => 4,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_update_scheduled(&mut self, e: &UpdateScheduledEvent) {
        self.write_u8(TAG_UPDATE_SCHEDULED);
        self.write_u32(e.root);
        self.write_expiration(e.expiration);
        self.write_u64(e.timestamp_ms);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u32(e.root);
        self.write_phase(e.phase);
        self.write_expiration(e.expiration);
        self.write_u64(e.timestamp_ms);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u32(e.root);
        self.write_phase(e.phase);
        self.write_expiration(e.expiration);
        self.write_u64(e.timestamp_ms);
    }

    fn on_yield(&mut self, e: &YieldEvent) {
        self.write_u8(TAG_YIELD);
        self.write_u32(e.root);
        self.write_expiration(e.expiration);
        self.write_u32(e.units);
    }

    fn on_interrupt(&mut self, e: &InterruptEvent) {
        self.write_u8(TAG_INTERRUPT);
        self.write_u32(e.root);
        self.write_expiration(e.expiration);
        self.write_u32(e.freed);
    }

    fn on_commit_summary(&mut self, s: &CommitSummary) {
        self.write_u8(TAG_COMMIT_SUMMARY);
        self.write_u32(s.root);
        self.write_expiration(s.expiration);
        self.write_u32(s.placements);
        self.write_u32(s.updates);
        self.write_u32(s.deletions);
        self.write_u64(s.timestamp_ms);
    }

    fn on_batch(&mut self, e: &BatchEvent) {
        self.write_u8(TAG_BATCH);
        self.write_u32(e.root);
        self.write_expiration(e.expiration);
        self.write_batch_kind(e.kind);
    }

    fn on_fiber_effects(&mut self, root: u32, effects: &[FiberEffect]) {
        self.write_u8(TAG_FIBER_EFFECTS_COUNT);
        self.write_u32(root);
        self.write_u32(u32::try_from(effects.len()).unwrap_or(u32::MAX));
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// An [`UpdateScheduledEvent`].
    UpdateScheduled(UpdateScheduledEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`YieldEvent`].
    Yield(YieldEvent),
    /// An [`InterruptEvent`].
    Interrupt(InterruptEvent),
    /// A [`CommitSummary`].
    CommitSummary(CommitSummary),
    /// A [`BatchEvent`].
    Batch(BatchEvent),
    /// Fiber-effect count of one commit.
    FiberEffectsCount {
        /// Root slot index.
        root: u32,
        /// Number of fibers with effects.
        count: u32,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter { data: bytes, pos: 0 }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn read<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.read::<1>().map(|[v]| v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.read().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.read().map(u64::from_le_bytes)
    }

    fn read_expiration(&mut self) -> Option<ExpirationTime> {
        self.read_u32().map(ExpirationTime)
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Render,
            _ => PhaseKind::Commit,
        })
    }

    fn read_batch_kind(&mut self) -> Option<BatchEventKind> {
        Some(match self.read_u8()? {
            0 => BatchEventKind::Created,
            1 => BatchEventKind::Rendered,
            2 => BatchEventKind::Blocked,
            3 => BatchEventKind::Completed,
            _ => BatchEventKind::Committed,
        })
    }

    fn decode_update_scheduled(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::UpdateScheduled(UpdateScheduledEvent {
            root: self.read_u32()?,
            expiration: self.read_expiration()?,
            timestamp_ms: self.read_u64()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            root: self.read_u32()?,
            phase: self.read_phase()?,
            expiration: self.read_expiration()?,
            timestamp_ms: self.read_u64()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            root: self.read_u32()?,
            phase: self.read_phase()?,
            expiration: self.read_expiration()?,
            timestamp_ms: self.read_u64()?,
        }))
    }

    fn decode_yield(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Yield(YieldEvent {
            root: self.read_u32()?,
            expiration: self.read_expiration()?,
            units: self.read_u32()?,
        }))
    }

    fn decode_interrupt(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Interrupt(InterruptEvent {
            root: self.read_u32()?,
            expiration: self.read_expiration()?,
            freed: self.read_u32()?,
        }))
    }

    fn decode_commit_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::CommitSummary(CommitSummary {
            root: self.read_u32()?,
            expiration: self.read_expiration()?,
            placements: self.read_u32()?,
            updates: self.read_u32()?,
            deletions: self.read_u32()?,
            timestamp_ms: self.read_u64()?,
        }))
    }

    fn decode_batch(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Batch(BatchEvent {
            root: self.read_u32()?,
            expiration: self.read_expiration()?,
            kind: self.read_batch_kind()?,
        }))
    }

    fn decode_fiber_effects_count(&mut self) -> Option<RecordedEvent> {
        let root = self.read_u32()?;
        let count = self.read_u32()?;
        Some(RecordedEvent::FiberEffectsCount { root, count })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_u8()? {
            TAG_UPDATE_SCHEDULED => self.decode_update_scheduled(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_YIELD => self.decode_yield(),
            TAG_INTERRUPT => self.decode_interrupt(),
            TAG_COMMIT_SUMMARY => self.decode_commit_summary(),
            TAG_BATCH => self.decode_batch(),
            TAG_FIBER_EFFECTS_COUNT => self.decode_fiber_effects_count(),
            // Unknown tag: stop.
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
