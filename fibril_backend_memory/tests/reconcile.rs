// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Child reconciliation as seen by the host: moves, inserts, removals,
//! fragments, and portals.

use fibril_backend_memory::{MemoryDocument, Mutation};
use proptest::prelude::*;
use fibril_core::Reconciler;
use fibril_core::fiber::{ContainerId, InstanceId};
use fibril_core::host::HostParent;
use fibril_core::node::{Element, Node};
use fibril_core::root::RootOptions;
use fibril_core::scheduler::SchedulerConfig;

fn setup() -> (Reconciler<MemoryDocument>, ContainerId) {
    let mut doc = MemoryDocument::new();
    let container = doc.create_element_container("div");
    (Reconciler::new(doc, SchedulerConfig::default()), container)
}

fn list(keys: &[&str]) -> Node {
    Element::new("ul")
        .children(
            keys.iter()
                .map(|key| Node::from(Element::new("li").key(key).child(*key))),
        )
        .into()
}

fn items(r: &Reconciler<MemoryDocument>, c: ContainerId) -> (InstanceId, Vec<InstanceId>) {
    let ul = r.host().children(HostParent::Container(c))[0];
    (ul, r.host().children(HostParent::Instance(ul)))
}

#[test]
fn keyed_reorder_moves_existing_nodes() {
    let (mut r, c) = setup();
    r.legacy_render(c, list(&["a", "b", "c"]), None).unwrap();
    let (ul, before) = items(&r, c);
    r.host_mut().take_mutations();

    r.legacy_render(c, list(&["c", "a", "b"]), None).unwrap();
    assert_eq!(
        r.host().to_html(c),
        "<ul><li>c</li><li>a</li><li>b</li></ul>"
    );
    let (_, after) = items(&r, c);
    assert_eq!(after, vec![before[2], before[0], before[1]]);
    // "c" keeps its place; "a" and "b" move behind it.
    assert_eq!(
        r.host().mutations(),
        &[
            Mutation::Append {
                parent: ul.0,
                child: before[0].0,
            },
            Mutation::Append {
                parent: ul.0,
                child: before[1].0,
            },
        ]
    );
}

#[test]
fn insertion_goes_before_the_next_stable_sibling() {
    let (mut r, c) = setup();
    r.legacy_render(c, list(&["a", "c"]), None).unwrap();
    let (ul, before) = items(&r, c);

    r.legacy_render(c, list(&["a", "b", "c"]), None).unwrap();
    assert_eq!(
        r.host().to_html(c),
        "<ul><li>a</li><li>b</li><li>c</li></ul>"
    );
    let (_, after) = items(&r, c);
    assert_eq!(after[0], before[0]);
    assert_eq!(after[2], before[1]);
    assert!(r.host().mutations().contains(&Mutation::InsertBefore {
        parent: ul.0,
        child: after[1].0,
        before: before[1].0,
    }));
}

#[test]
fn missing_keys_are_removed() {
    let (mut r, c) = setup();
    r.legacy_render(c, list(&["a", "b", "c"]), None).unwrap();
    let (ul, before) = items(&r, c);
    r.host_mut().take_mutations();

    r.legacy_render(c, list(&["a", "c"]), None).unwrap();
    assert_eq!(r.host().to_html(c), "<ul><li>a</li><li>c</li></ul>");
    assert_eq!(
        r.host().mutations(),
        &[Mutation::Remove {
            parent: ul.0,
            child: before[1].0,
        }]
    );
    assert!(!r.host().is_attached(before[1]));
}

#[test]
fn duplicate_keys_are_all_removed() {
    let (mut r, c) = setup();
    let twins: Node = Element::new("ul")
        .child(Element::new("li").key("a").child("1"))
        .child(Element::new("li").key("a").child("2"))
        .into();
    r.legacy_render(c, twins, None).unwrap();
    assert_eq!(r.host().to_html(c), "<ul><li>1</li><li>2</li></ul>");

    r.legacy_render(c, list(&[]), None).unwrap();
    assert_eq!(r.host().to_html(c), "<ul></ul>");
    let root = r.root_for_container(c).unwrap();
    let current = r.root_current_fiber(root).unwrap();
    let ul = r.fibers().first_child(current).unwrap();
    assert_eq!(r.fibers().first_child(ul), None);

    r.unmount_component_at_node(c).unwrap();
    assert_eq!(r.fibers().live_count(), 0, "no fiber outlives its root");
}

#[test]
fn type_change_replaces_the_node() {
    let (mut r, c) = setup();
    r.legacy_render(c, Element::new("p").child("x").into(), None)
        .unwrap();
    let old = r.host().children(HostParent::Container(c))[0];

    r.legacy_render(c, Element::new("span").child("x").into(), None)
        .unwrap();
    assert_eq!(r.host().to_html(c), "<span>x</span>");
    assert!(!r.host().is_attached(old));
}

#[test]
fn text_and_element_swap_kinds() {
    let (mut r, c) = setup();
    r.legacy_render(c, Node::text("plain"), None).unwrap();
    r.legacy_render(c, Element::new("b").into(), None).unwrap();
    assert_eq!(r.host().to_html(c), "<b></b>");
    r.legacy_render(c, Node::text("plain again"), None).unwrap();
    assert_eq!(r.host().to_html(c), "plain again");
}

#[test]
fn fragments_group_without_a_host_node() {
    let (mut r, c) = setup();
    r.legacy_render(
        c,
        Node::fragment([
            Node::text("a"),
            Node::keyed_fragment("inner", [Element::new("b").into(), Node::text("c")]),
            Node::Empty,
        ]),
        None,
    )
    .unwrap();
    assert_eq!(r.host().to_html(c), "a<b></b>c");

    // Moving the keyed fragment moves its host nodes.
    r.legacy_render(
        c,
        Node::fragment([
            Node::keyed_fragment("inner", [Element::new("b").into(), Node::text("c")]),
            Node::text("a"),
        ]),
        None,
    )
    .unwrap();
    assert_eq!(r.host().to_html(c), "<b></b>ca");
}

#[test]
fn portal_content_lands_in_its_own_container() {
    let (mut r, c) = setup();
    let overlay = r.host_mut().create_element_container("aside");
    r.legacy_render(
        c,
        Element::new("main")
            .child(Node::portal(overlay, [Element::new("dialog").into()]))
            .child("body")
            .into(),
        None,
    )
    .unwrap();
    assert_eq!(r.host().to_html(c), "<main>body</main>");
    assert_eq!(r.host().to_html(overlay), "<dialog></dialog>");

    assert_eq!(r.unmount_component_at_node(c), Ok(true));
    assert_eq!(r.host().to_html(c), "");
    assert_eq!(r.host().to_html(overlay), "", "portal content is removed too");
}

#[test]
fn unmount_releases_every_child_fiber() {
    let mut doc = MemoryDocument::new();
    let c = doc.create_element_container("div");
    let mut r = Reconciler::new(doc, SchedulerConfig::default());
    let root = r.create_root(c, RootOptions::default()).unwrap();

    r.render(root, list(&["a", "b"]), None).unwrap();
    r.flush_all();
    r.render(root, list(&["b", "a", "c"]), None).unwrap();
    r.flush_all();
    assert!(r.fibers().live_count() > 2);

    r.unmount(root, None).unwrap();
    r.flush_all();
    assert_eq!(r.host().to_html(c), "");
    let current = r.root_current_fiber(root).unwrap();
    assert_eq!(r.fibers().first_child(current), None);
    assert_eq!(r.fibers().live_count(), 2, "only the two root versions remain");

    r.destroy_root(root).unwrap();
    assert_eq!(r.fibers().live_count(), 0);
    assert!(r.render(root, Node::Empty, None).is_err());
}

const POOL: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

fn keys() -> impl Strategy<Value = Vec<&'static str>> {
    proptest::sample::subsequence(POOL.to_vec(), 0..=POOL.len()).prop_shuffle()
}

fn expected_html(keys: &[&str]) -> String {
    let items: String = keys.iter().map(|k| format!("<li>{k}</li>")).collect();
    format!("<ul>{items}</ul>")
}

proptest! {
    #[test]
    fn prop_keyed_children_survive_any_reorder(first in keys(), second in keys()) {
        let (mut r, c) = setup();
        r.legacy_render(c, list(&first), None).unwrap();
        let (ul, before) = items(&r, c);

        r.legacy_render(c, list(&second), None).unwrap();
        prop_assert_eq!(r.host().to_html(c), expected_html(&second));
        let (ul_after, after) = items(&r, c);
        prop_assert_eq!(ul, ul_after);
        for (i, key) in second.iter().enumerate() {
            if let Some(j) = first.iter().position(|k| k == key) {
                prop_assert_eq!(after[i], before[j], "{} kept its host node", key);
            }
        }
        for (j, key) in first.iter().enumerate() {
            if !second.contains(key) {
                prop_assert!(!r.host().is_attached(before[j]));
            }
        }
    }
}
