// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//! Each root is a separate thread of process 0, so render and commit slices
//! of different roots do not nest.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Events without a timestamp of their own (yields, interruptions, batch
/// transitions, effect counts) are placed at the last timestamp seen.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut last_us = 0_u64;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::UpdateScheduled(e) => {
                last_us = ms_to_us(e.timestamp_ms);
                events.push(json!({
                    "ph": "i",
                    "name": "UpdateScheduled",
                    "cat": "Scheduler",
                    "ts": last_us,
                    "pid": 0,
                    "tid": e.root,
                    "s": "t",
                    "args": {
                        "expiration": e.expiration.0,
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                last_us = ms_to_us(e.timestamp_ms);
                events.push(json!({
                    "ph": "B",
                    "name": format!("{:?}", e.phase),
                    "cat": "WorkLoop",
                    "ts": last_us,
                    "pid": 0,
                    "tid": e.root,
                    "args": {
                        "expiration": e.expiration.0,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                last_us = ms_to_us(e.timestamp_ms);
                events.push(json!({
                    "ph": "E",
                    "name": format!("{:?}", e.phase),
                    "cat": "WorkLoop",
                    "ts": last_us,
                    "pid": 0,
                    "tid": e.root,
                    "args": {
                        "expiration": e.expiration.0,
                    }
                }));
            }
            RecordedEvent::Yield(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Yield",
                    "cat": "WorkLoop",
                    "ts": last_us,
                    "pid": 0,
                    "tid": e.root,
                    "s": "t",
                    "args": {
                        "expiration": e.expiration.0,
                        "units": e.units,
                    }
                }));
            }
            RecordedEvent::Interrupt(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Interrupt",
                    "cat": "WorkLoop",
                    "ts": last_us,
                    "pid": 0,
                    "tid": e.root,
                    "s": "t",
                    "args": {
                        "expiration": e.expiration.0,
                        "freed": e.freed,
                    }
                }));
            }
            RecordedEvent::CommitSummary(s) => {
                last_us = ms_to_us(s.timestamp_ms);
                events.push(json!({
                    "ph": "i",
                    "name": "CommitSummary",
                    "cat": "Summary",
                    "ts": last_us,
                    "pid": 0,
                    "tid": s.root,
                    "s": "t",
                    "args": {
                        "expiration": s.expiration.0,
                        "placements": s.placements,
                        "updates": s.updates,
                        "deletions": s.deletions,
                    }
                }));
            }
            RecordedEvent::Batch(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("Batch{:?}", e.kind),
                    "cat": "Batch",
                    "ts": last_us,
                    "pid": 0,
                    "tid": e.root,
                    "s": "t",
                    "args": {
                        "expiration": e.expiration.0,
                    }
                }));
            }
            RecordedEvent::FiberEffectsCount { root, count } => {
                events.push(json!({
                    "ph": "i",
                    "name": "FiberEffects",
                    "cat": "Rich",
                    "ts": last_us,
                    "pid": 0,
                    "tid": root,
                    "s": "t",
                    "args": {
                        "count": count,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ms_to_us(ms: u64) -> u64 {
    ms.saturating_mul(1000)
}
