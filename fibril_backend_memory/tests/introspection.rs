// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identity resolution and host-instance lookups on committed trees.

use fibril_backend_memory::MemoryDocument;
use fibril_core::Reconciler;
use fibril_core::devtools::{BundleType, DevtoolsHook, RendererInfo};
use fibril_core::error::Error;
use fibril_core::fiber::{ContainerId, FiberId};
use fibril_core::host::HostParent;
use fibril_core::node::{Element, Node};
use fibril_core::reflection::{self, MountStatus};
use fibril_core::root::RootOptions;
use fibril_core::scheduler::SchedulerConfig;
use fibril_core::tag::WorkTag;

fn setup() -> (Reconciler<MemoryDocument>, ContainerId) {
    let mut doc = MemoryDocument::new();
    let container = doc.create_element_container("div");
    (Reconciler::new(doc, SchedulerConfig::default()), container)
}

fn top_fiber(r: &Reconciler<MemoryDocument>, c: ContainerId) -> FiberId {
    let root = r.root_for_container(c).unwrap();
    let current = r.root_current_fiber(root).unwrap();
    r.fibers().first_child(current).unwrap()
}

#[test]
fn either_version_resolves_to_the_committed_fiber() {
    let (mut r, c) = setup();
    r.legacy_render(c, Element::new("section").attr("v", "1").into(), None)
        .unwrap();
    r.legacy_render(c, Element::new("section").attr("v", "2").into(), None)
        .unwrap();

    let current = top_fiber(&r, c);
    let previous = r.fibers().alternate(current).unwrap();
    assert_eq!(reflection::find_current_fiber(r.fibers(), current), Ok(Some(current)));
    assert_eq!(reflection::find_current_fiber(r.fibers(), previous), Ok(Some(current)));
    assert_eq!(reflection::mount_status(r.fibers(), previous), MountStatus::Mounted);

    // A third render swaps the roles of the pair.
    r.legacy_render(c, Element::new("section").attr("v", "3").into(), None)
        .unwrap();
    assert_eq!(top_fiber(&r, c), previous);
    assert_eq!(reflection::find_current_fiber(r.fibers(), current), Ok(Some(previous)));
}

#[test]
fn host_instance_lookup() {
    let (mut r, c) = setup();
    r.legacy_render(c, Element::new("section").child("x").into(), None)
        .unwrap();
    let section = r.host().children(HostParent::Container(c))[0];
    let fiber = top_fiber(&r, c);

    assert_eq!(r.find_host_instance(fiber), Ok(Some(section)));
    let root = r.root_for_container(c).unwrap();
    assert_eq!(r.public_root_instance(root), Ok(Some(section)));
    let root_fiber = r.root_current_fiber(root).unwrap();
    assert_eq!(r.find_host_instance(root_fiber), Ok(Some(section)));
}

#[test]
fn component_only_subtree_has_no_host_instance() {
    let (mut r, c) = setup();
    r.legacy_render(
        c,
        Node::keyed_fragment("outer", [Node::keyed_fragment("inner", [])]),
        None,
    )
    .unwrap();
    let fragment = top_fiber(&r, c);
    assert_eq!(r.fibers().tag(fragment), WorkTag::Fragment);
    assert_eq!(r.find_host_instance(fragment), Ok(None));

    let root = r.root_for_container(c).unwrap();
    assert_eq!(r.public_root_instance(root), Ok(None), "not an element");
}

#[test]
fn portal_content_is_skipped_on_request() {
    let (mut r, c) = setup();
    let overlay = r.host_mut().create_element_container("aside");
    r.legacy_render(
        c,
        Node::keyed_fragment(
            "k",
            [
                Node::portal(overlay, [Element::new("dialog").into()]),
                Element::new("b").into(),
            ],
        ),
        None,
    )
    .unwrap();
    let dialog = r.host().children(HostParent::Container(overlay))[0];
    let b = r.host().children(HostParent::Container(c))[0];
    let fragment = top_fiber(&r, c);

    assert_eq!(r.find_host_instance(fragment), Ok(Some(dialog)));
    assert_eq!(r.find_host_instance_with_no_portals(fragment), Ok(Some(b)));
}

#[test]
fn unmounted_fibers_are_not_found() {
    let (mut r, c) = setup();
    r.legacy_render(c, Element::new("p").into(), None).unwrap();
    let fiber = top_fiber(&r, c);
    r.unmount_component_at_node(c).unwrap();

    assert_eq!(reflection::mount_status(r.fibers(), fiber), MountStatus::Unmounted);
    assert_eq!(r.find_host_instance(fiber), Err(Error::NotFound));
}

#[test]
fn subtree_render_records_its_parent() {
    let (mut r, c) = setup();
    let other = r.host_mut().create_element_container("div");
    r.legacy_render(c, Element::new("p").into(), None).unwrap();
    let parent = top_fiber(&r, c);

    let root = r.create_root(other, RootOptions::default()).unwrap();
    r.legacy_render_subtree_into_container(root, parent, Node::text("nested"), None)
        .unwrap();
    assert_eq!(r.root_context(root), Ok(Some(parent)));
    r.flush_all();
    assert_eq!(r.host().to_html(other), "nested");

    r.unmount_component_at_node(c).unwrap();
    assert_eq!(
        r.legacy_render_subtree_into_container(root, parent, Node::Empty, None)
            .unwrap_err(),
        Error::InvalidParentComponent
    );
}

#[derive(Default)]
struct RecordingHook {
    seen: Vec<RendererInfo>,
}

impl DevtoolsHook for RecordingHook {
    fn inject(&mut self, info: &RendererInfo) -> bool {
        self.seen.push(*info);
        true
    }
}

#[test]
fn devtools_injection_reports_the_build() {
    let (r, _) = setup();
    let mut hook = RecordingHook::default();
    assert!(r.inject_into_devtools(&mut hook));
    assert_eq!(hook.seen.len(), 1);
    assert_eq!(hook.seen[0].bundle_type, BundleType::Production);
    assert_eq!(hook.seen[0].renderer_package_name, "fibril");
    assert!(!hook.seen[0].version.is_empty());

    let dev = Reconciler::new(MemoryDocument::new(), SchedulerConfig::development());
    assert_eq!(dev.renderer_info().bundle_type.code(), 1);
}
