// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Explicitly committed batches.

use std::cell::Cell;
use std::rc::Rc;

use fibril_backend_memory::MemoryDocument;
use fibril_core::Reconciler;
use fibril_core::batch::BatchPhase;
use fibril_core::expiration::ExpirationTime;
use fibril_core::fiber::ContainerId;
use fibril_core::node::{Element, Node};
use fibril_core::root::{RootId, RootOptions};
use fibril_core::scheduler::SchedulerConfig;

fn setup() -> (Reconciler<MemoryDocument>, ContainerId, RootId) {
    let mut doc = MemoryDocument::new();
    let container = doc.create_element_container("div");
    let mut r = Reconciler::new(doc, SchedulerConfig::default());
    let root = r.create_root(container, RootOptions::default()).unwrap();
    (r, container, root)
}

#[test]
fn completed_batch_waits_for_commit() {
    let (mut r, c, root) = setup();
    let batch = r.create_batch(root).unwrap();
    assert_eq!(batch.expiration(), ExpirationTime(527));
    assert_eq!(batch.phase(), BatchPhase::PendingEmpty);

    let completed = Rc::new(Cell::new(false));
    let done = completed.clone();
    batch.then(move || done.set(true));

    let work = batch.render(&mut r, Element::new("p").into()).unwrap();
    assert_eq!(batch.phase(), BatchPhase::PendingWithChildren);

    r.flush_all();
    assert!(completed.get(), "the render completed");
    assert!(batch.is_complete());
    assert!(!work.is_committed(), "but the batch holds the commit");
    assert_eq!(r.host().to_html(c), "");
    assert!(!r.has_pending_work());

    batch.commit(&mut r).unwrap();
    assert_eq!(batch.phase(), BatchPhase::Committed);
    assert!(work.is_committed());
    assert_eq!(r.host().to_html(c), "<p></p>");
    assert!(r.batches(root).unwrap().is_empty());
}

#[test]
fn committing_an_empty_batch_only_unlinks_it() {
    let (mut r, c, root) = setup();
    let batch = r.create_batch(root).unwrap();
    assert_eq!(r.batches(root).unwrap().len(), 1);

    batch.commit(&mut r).unwrap();
    assert_eq!(batch.phase(), BatchPhase::Committed);
    assert!(r.batches(root).unwrap().is_empty());
    assert!(!r.has_pending_work());
    assert!(r.host().mutations().is_empty());
    assert_eq!(r.host().to_html(c), "");
}

#[test]
fn unrelated_updates_are_held_by_a_pending_batch() {
    let (mut r, c, root) = setup();
    let batch = r.create_batch(root).unwrap();
    batch.render(&mut r, Node::text("batched")).unwrap();

    // Same bucket as the batch, so the batch covers it.
    let work = r.render(root, Node::text("plain"), None).unwrap();
    r.flush_all();
    assert!(!work.is_committed());
    assert_eq!(r.host().to_html(c), "");

    batch.commit(&mut r).unwrap();
    assert!(work.is_committed());
    assert_eq!(r.host().to_html(c), "plain", "the later update wins");
}

#[test]
fn committing_out_of_order_promotes_the_batch() {
    let (mut r, c, root) = setup();
    let a = r.create_batch(root).unwrap();
    let b = r.create_batch(root).unwrap();
    assert_eq!(a.expiration(), ExpirationTime(527));
    assert_eq!(b.expiration(), ExpirationTime(528), "expirations are unique");

    let a_work = a.render(&mut r, Node::text("a")).unwrap();
    let b_work = b.render(&mut r, Node::text("b")).unwrap();

    b.commit(&mut r).unwrap();
    assert_eq!(b.expiration(), a.expiration(), "promoted to the head");
    assert_eq!(b.phase(), BatchPhase::Committed);
    assert_eq!(r.host().to_html(c), "b");
    assert!(a_work.is_committed(), "work queued ahead was flushed along");
    assert!(!b_work.is_committed(), "b's first render is still queued at its own priority");

    let pending = r.batches(root).unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].ptr_eq(&a));
    assert_eq!(a.phase(), BatchPhase::PendingWithChildren);

    a.commit(&mut r).unwrap();
    assert_eq!(r.host().to_html(c), "a");
    assert!(r.batches(root).unwrap().is_empty());

    r.flush_all();
    assert!(b_work.is_committed());
    assert_eq!(r.host().to_html(c), "a");
    assert!(!r.has_pending_work());
}

#[test]
#[should_panic(expected = "Cannot commit a batch multiple times")]
fn double_commit_panics() {
    let (mut r, _, root) = setup();
    let batch = r.create_batch(root).unwrap();
    batch.commit(&mut r).unwrap();
    let _ = batch.commit(&mut r);
}

#[test]
#[should_panic(expected = "Cannot render a batch that already committed")]
fn render_after_commit_panics() {
    let (mut r, _, root) = setup();
    let batch = r.create_batch(root).unwrap();
    batch.render(&mut r, Node::text("once")).unwrap();
    batch.commit(&mut r).unwrap();
    let _ = batch.render(&mut r, Node::text("twice"));
}
