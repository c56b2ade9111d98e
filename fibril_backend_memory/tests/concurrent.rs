// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Concurrent roots: deferred work, budgets, expiration, and interruption.

use std::cell::Cell;
use std::rc::Rc;

use fibril_backend_memory::{MemoryDocument, Mutation};
use fibril_core::Reconciler;
use fibril_core::expiration::ExpirationTime;
use fibril_core::fiber::ContainerId;
use fibril_core::handle::Callback;
use fibril_core::node::{Element, Node};
use fibril_core::root::{RootId, RootOptions};
use fibril_core::scheduler::{SchedulerConfig, WorkBudget};

fn setup() -> (Reconciler<MemoryDocument>, ContainerId, RootId) {
    let mut doc = MemoryDocument::new();
    let container = doc.create_element_container("div");
    let mut r = Reconciler::new(doc, SchedulerConfig::default());
    let root = r.create_root(container, RootOptions::default()).unwrap();
    (r, container, root)
}

fn counter() -> (Rc<Cell<u32>>, Callback) {
    let hits = Rc::new(Cell::new(0));
    let h = hits.clone();
    (hits, Box::new(move || h.set(h.get() + 1)))
}

fn three_paragraphs() -> Node {
    Element::new("div")
        .children([
            Element::new("p").into(),
            Element::new("p").into(),
            Element::new("p").into(),
        ])
        .into()
}

#[test]
fn callback_fires_once_after_the_scheduler_flushes() {
    let (mut r, c, root) = setup();
    assert!(r.is_concurrent(root).unwrap());

    let (hits, callback) = counter();
    let work = r.render(root, Element::new("p").into(), Some(callback)).unwrap();
    assert_eq!(hits.get(), 0, "not fired synchronously");
    assert!(!work.is_committed());
    assert_eq!(r.host().to_html(c), "");
    assert_eq!(r.host().deferred_requests(), 1);
    // 5000ms rounded up to a 250ms bucket, measured from time zero.
    assert_eq!(r.remaining_expiration(root).unwrap(), ExpirationTime(527));

    assert!(!r.run_deferred(WorkBudget::Unlimited));
    assert_eq!(hits.get(), 1);
    assert!(work.is_committed());
    assert_eq!(r.host().to_html(c), "<p></p>");

    r.flush_all();
    assert_eq!(hits.get(), 1, "fires exactly once");

    // Late registration runs immediately.
    let late = Rc::new(Cell::new(false));
    let l = late.clone();
    work.then(move || l.set(true));
    assert!(late.get());
}

#[test]
fn budget_slices_resume_where_they_left_off() {
    let (mut r, c, root) = setup();
    r.render(root, three_paragraphs(), None).unwrap();

    assert!(r.run_deferred(WorkBudget::Units(2)), "still pending");
    assert_eq!(r.host().to_html(c), "");
    assert_eq!(r.host().deferred_requests(), 2, "asked again for the rest");

    assert!(!r.run_deferred(WorkBudget::Units(100)));
    assert_eq!(r.host().to_html(c), "<div><p></p><p></p><p></p></div>");
    let created = r
        .host()
        .mutations()
        .iter()
        .filter(|m| matches!(m, Mutation::CreateElement { .. }))
        .count();
    assert_eq!(created, 4, "resuming does not redo finished work");
}

#[test]
fn zero_budget_does_nothing_until_work_expires() {
    let (mut r, c, root) = setup();
    r.render(root, three_paragraphs(), None).unwrap();

    assert!(r.run_deferred(WorkBudget::Units(0)));
    assert_eq!(r.host().to_html(c), "");

    r.host_mut().advance(10_000);
    assert!(r.current_time() > ExpirationTime(527));
    assert!(!r.run_deferred(WorkBudget::Units(0)), "expired work ignores the budget");
    assert_eq!(r.host().to_html(c), "<div><p></p><p></p><p></p></div>");
}

#[test]
fn same_priority_update_restarts_a_yielded_render() {
    let (mut r, c, root) = setup();
    let (first_hits, first) = counter();
    let (second_hits, second) = counter();
    r.render(root, three_paragraphs(), Some(first)).unwrap();
    assert!(r.run_deferred(WorkBudget::Units(1)));
    let live_while_yielded = r.fibers().live_count();

    r.render(root, Element::new("span").child("b").into(), Some(second))
        .unwrap();
    assert!(
        r.fibers().live_count() < live_while_yielded,
        "the abandoned render released its fibers"
    );

    r.flush_all();
    assert_eq!(r.host().to_html(c), "<span>b</span>");
    assert_eq!(first_hits.get(), 1, "the superseded update still commits");
    assert_eq!(second_hits.get(), 1);
    assert!(
        !r.host()
            .mutations()
            .iter()
            .any(|m| matches!(m, Mutation::CreateElement { ty, .. } if ty == "p")),
        "nothing of the abandoned tree reached the host"
    );
}

#[test]
fn abandoned_render_returns_its_instances() {
    let (mut r, c, root) = setup();
    let before = r.host().live_node_count();
    r.render(root, three_paragraphs(), None).unwrap();
    // Root, div, then the first paragraph, which completes and gets a node.
    assert!(r.run_deferred(WorkBudget::Units(3)));
    assert_eq!(r.host().live_node_count(), before + 1);

    r.render(root, Element::new("span").into(), None).unwrap();
    assert_eq!(r.host().live_node_count(), before);

    r.flush_all();
    assert_eq!(r.host().to_html(c), "<span></span>");
    assert_eq!(r.host().live_node_count(), before + 1);
    assert_eq!(r.host().node_count(), before + 1, "the released slot was reused");
}

#[test]
fn less_urgent_update_lets_the_yielded_render_finish() {
    let (mut r, c, root) = setup();
    r.render(root, Element::new("div").child("a").into(), None)
        .unwrap();
    assert!(r.run_deferred(WorkBudget::Units(1)));

    r.host_mut().advance(1000);
    r.render(root, Element::new("div").child("b").into(), None)
        .unwrap();
    assert_eq!(r.remaining_expiration(root).unwrap(), ExpirationTime(527));

    assert!(!r.run_deferred(WorkBudget::Unlimited));
    assert_eq!(r.host().to_html(c), "<div>b</div>");
    // "a" committed on its own before "b" patched it.
    assert!(r.host().mutations().contains(&Mutation::UpdateText {
        node: 1,
        text: "b".into(),
    }));
}

#[test]
fn sync_contexts_commit_concurrent_roots_immediately() {
    let (mut r, c, root) = setup();
    let work = r
        .sync_updates(|r| r.render(root, Node::text("sync"), None))
        .unwrap();
    assert!(work.is_committed());
    assert_eq!(r.host().to_html(c), "sync");

    let work = r
        .flush_sync(|r| r.render(root, Node::text("flushed"), None))
        .unwrap();
    assert!(work.is_committed());
    assert_eq!(r.host().to_html(c), "flushed");
    assert!(!r.has_pending_work());
}

#[test]
fn interactive_updates_use_the_short_deadline() {
    let (mut r, c, root) = setup();
    r.interactive_updates(|r| r.render(root, Element::new("p").into(), None))
        .unwrap();
    // 150ms rounded up to a 100ms bucket.
    assert_eq!(r.remaining_expiration(root).unwrap(), ExpirationTime(22));
    assert_eq!(r.host().to_html(c), "");

    // The next interactive batch flushes the previous one first.
    r.interactive_updates(|_| {});
    assert_eq!(r.host().to_html(c), "<p></p>");
}

#[test]
fn most_urgent_root_goes_first() {
    let mut doc = MemoryDocument::new();
    let slow_container = doc.create_element_container("div");
    let fast_container = doc.create_element_container("div");
    let mut r = Reconciler::new(doc, SchedulerConfig::default());
    let slow = r.create_root(slow_container, RootOptions::default()).unwrap();
    let fast = r.create_root(fast_container, RootOptions::default()).unwrap();

    r.render(slow, Node::text("slow"), None).unwrap();
    r.interactive_updates(|r| r.render(fast, Node::text("fast"), None))
        .unwrap();

    // Two units render the interactive root; the third starts the other.
    assert!(r.run_deferred(WorkBudget::Units(3)));
    assert_eq!(r.host().to_html(fast_container), "fast");
    assert_eq!(r.host().to_html(slow_container), "");

    r.flush_all();
    assert_eq!(r.host().to_html(slow_container), "slow");
}
