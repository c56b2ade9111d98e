// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sinks attached to a reconciler driving the in-memory host.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use fibril_backend_memory::MemoryDocument;
use fibril_core::Reconciler;
use fibril_core::node::Element;
use fibril_core::root::RootOptions;
use fibril_core::scheduler::{SchedulerConfig, WorkBudget};
use fibril_core::trace::{
    BatchEvent, BatchEventKind, CommitSummary, FiberEffect, InterruptEvent, PhaseBeginEvent,
    PhaseEndEvent, TraceSink, UpdateScheduledEvent, YieldEvent,
};
use fibril_debug::chrome;
use fibril_debug::pretty::PrettyPrintSink;
use fibril_debug::recorder::{RecordedEvent, RecorderSink, decode};

#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Forwards to a recorder the test keeps a handle to.
struct SharedRecorder(Rc<RefCell<RecorderSink>>);

impl TraceSink for SharedRecorder {
    fn on_update_scheduled(&mut self, e: &UpdateScheduledEvent) {
        self.0.borrow_mut().on_update_scheduled(e);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.0.borrow_mut().on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.0.borrow_mut().on_phase_end(e);
    }

    fn on_yield(&mut self, e: &YieldEvent) {
        self.0.borrow_mut().on_yield(e);
    }

    fn on_interrupt(&mut self, e: &InterruptEvent) {
        self.0.borrow_mut().on_interrupt(e);
    }

    fn on_commit_summary(&mut self, s: &CommitSummary) {
        self.0.borrow_mut().on_commit_summary(s);
    }

    fn on_batch(&mut self, e: &BatchEvent) {
        self.0.borrow_mut().on_batch(e);
    }

    fn on_fiber_effects(&mut self, root: u32, effects: &[FiberEffect]) {
        self.0.borrow_mut().on_fiber_effects(root, effects);
    }
}

fn paragraphs() -> Element {
    Element::new("div").children([
        Element::new("p").into(),
        Element::new("p").into(),
    ])
}

#[test]
fn pretty_output_follows_an_interrupted_render() {
    let mut doc = MemoryDocument::new();
    let container = doc.create_element_container("div");
    let mut r = Reconciler::new(doc, SchedulerConfig::default());
    let buffer = SharedBuffer::default();
    r.set_trace_sink(Box::new(PrettyPrintSink::with_writer(buffer.clone())));
    let root = r.create_root(container, RootOptions::default()).unwrap();

    r.render(root, paragraphs().into(), None).unwrap();
    assert!(r.run_deferred(WorkBudget::Units(1)));
    r.render(root, Element::new("span").into(), None).unwrap();
    r.flush_all();
    assert_eq!(r.host().to_html(container), "<span></span>");

    let output = String::from_utf8(buffer.0.borrow().clone()).unwrap();
    let kinds: Vec<&str> = output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    assert_eq!(
        kinds,
        [
            "[update]",
            "[phase:begin]",
            "[yield]",
            "[update]",
            "[interrupt]",
            "[phase:begin]",
            "[phase:end]",
            "[phase:begin]",
            "[effects]",
            "[summary]",
            "[phase:end]",
        ],
        "got:\n{output}"
    );
    assert!(output.contains("[yield] root=0 expiration=527 units=1"), "got:\n{output}");
    assert!(output.contains("[interrupt] root=0 expiration=527 freed=1"), "got:\n{output}");
    assert!(output.contains("placements=1 updates=0 deletions=0"), "got:\n{output}");
}

#[test]
fn recorded_batch_lifecycle_exports_to_chrome_json() {
    let mut doc = MemoryDocument::new();
    let container = doc.create_element_container("div");
    let mut r = Reconciler::new(doc, SchedulerConfig::default());
    let recorder = Rc::new(RefCell::new(RecorderSink::new()));
    r.set_trace_sink(Box::new(SharedRecorder(recorder.clone())));
    let root = r.create_root(container, RootOptions::default()).unwrap();

    let batch = r.create_batch(root).unwrap();
    batch.render(&mut r, paragraphs().into()).unwrap();
    r.flush_all();
    batch.commit(&mut r).unwrap();
    assert_eq!(r.host().to_html(container), "<div><p></p><p></p></div>");

    let recorder = recorder.borrow();
    let events: Vec<RecordedEvent> = decode(recorder.as_bytes()).collect();
    let batch_kinds: Vec<BatchEventKind> = events
        .iter()
        .filter_map(|e| match e {
            RecordedEvent::Batch(b) => Some(b.kind),
            _ => None,
        })
        .collect();
    assert_eq!(
        batch_kinds,
        [
            BatchEventKind::Created,
            BatchEventKind::Rendered,
            BatchEventKind::Blocked,
            BatchEventKind::Completed,
            BatchEventKind::Committed,
        ]
    );
    assert!(events.iter().any(|e| matches!(
        e,
        RecordedEvent::FiberEffectsCount { root: 0, count: 1 }
    )));

    let mut out = Vec::new();
    chrome::export(recorder.as_bytes(), &mut out).unwrap();
    let parsed: Vec<serde_json::Value> = serde_json::from_slice(&out).unwrap();
    assert_eq!(parsed.len(), events.len());
}
