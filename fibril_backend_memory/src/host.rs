// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`Host`] implementation for [`MemoryDocument`].

use fibril_core::fiber::{ContainerId, InstanceId};
use fibril_core::host::{ContainerKind, Host, HostParent};
use fibril_core::node::Attributes;

use crate::document::{MOUNT_POINT_COMMENT, MemoryDocument, Mutation, NodeKind};

impl Host for MemoryDocument {
    fn now(&self) -> u64 {
        self.now_ms
    }

    fn create_instance(&mut self, ty: &str, attributes: &Attributes, _root: ContainerId) -> InstanceId {
        let node = self.push(NodeKind::Element {
            ty: ty.into(),
            attributes: attributes.clone(),
        });
        self.mutations.push(Mutation::CreateElement {
            node,
            ty: ty.into(),
        });
        InstanceId(node)
    }

    fn create_text_instance(&mut self, text: &str, _root: ContainerId) -> InstanceId {
        let node = self.push(NodeKind::Text(text.into()));
        self.mutations.push(Mutation::CreateText {
            node,
            text: text.into(),
        });
        InstanceId(node)
    }

    fn append_initial_child(&mut self, parent: InstanceId, child: InstanceId) {
        self.attach(parent.0, child.0, None);
        self.mutations.push(Mutation::AppendInitial {
            parent: parent.0,
            child: child.0,
        });
    }

    fn append_child(&mut self, parent: HostParent, child: InstanceId) {
        let (parent, anchor) = self.resolve(parent);
        self.attach(parent, child.0, anchor);
        self.mutations.push(match anchor {
            Some(before) => Mutation::InsertBefore {
                parent,
                child: child.0,
                before,
            },
            None => Mutation::Append {
                parent,
                child: child.0,
            },
        });
    }

    fn insert_before(&mut self, parent: HostParent, child: InstanceId, before: InstanceId) {
        let (parent, _) = self.resolve(parent);
        self.attach(parent, child.0, Some(before.0));
        self.mutations.push(Mutation::InsertBefore {
            parent,
            child: child.0,
            before: before.0,
        });
    }

    fn remove_child(&mut self, parent: HostParent, child: InstanceId) {
        let (parent, _) = self.resolve(parent);
        assert_eq!(
            self.nodes[child.0 as usize].parent,
            Some(parent),
            "remove_child: node {} is not a child of {parent}",
            child.0
        );
        self.detach(child.0);
        self.mutations.push(Mutation::Remove {
            parent,
            child: child.0,
        });
    }

    fn commit_update(&mut self, instance: InstanceId, _ty: &str, _old: &Attributes, new: &Attributes) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[instance.0 as usize].kind {
            attributes.clone_from(new);
        }
        self.mutations.push(Mutation::UpdateAttributes { node: instance.0 });
    }

    fn commit_text_update(&mut self, instance: InstanceId, _old: &str, new: &str) {
        if let NodeKind::Text(text) = &mut self.nodes[instance.0 as usize].kind {
            new.clone_into(text);
        }
        self.mutations.push(Mutation::UpdateText {
            node: instance.0,
            text: new.into(),
        });
    }

    fn container_kind(&self, container: ContainerId) -> Option<ContainerKind> {
        Some(match &self.nodes.get(container.0 as usize)?.kind {
            NodeKind::Element { .. } => ContainerKind::Element,
            NodeKind::Document => ContainerKind::Document,
            NodeKind::Fragment => ContainerKind::DocumentFragment,
            NodeKind::Comment(text) if text == MOUNT_POINT_COMMENT => ContainerKind::MountPointComment,
            NodeKind::Comment(_) | NodeKind::Text(_) => ContainerKind::Other,
        })
    }

    fn root_element_has_attribute(&self, container: ContainerId, attribute: &str) -> bool {
        let Some(slot) = self.nodes.get(container.0 as usize) else {
            return false;
        };
        let root = if slot.kind == NodeKind::Document {
            slot.children
                .iter()
                .copied()
                .find(|&c| matches!(self.nodes[c as usize].kind, NodeKind::Element { .. }))
        } else {
            slot.children.first().copied()
        };
        root.is_some_and(|root| self.attribute(InstanceId(root), attribute).is_some())
    }

    fn clear_container(&mut self, container: ContainerId) {
        let children = std::mem::take(&mut self.nodes[container.0 as usize].children);
        for child in children {
            self.nodes[child as usize].parent = None;
        }
        self.mutations.push(Mutation::Clear {
            container: container.0,
        });
    }

    fn first_hydratable_child_of_container(&self, container: ContainerId) -> Option<InstanceId> {
        self.first_hydratable_child(InstanceId(container.0))
    }

    fn first_hydratable_child(&self, instance: InstanceId) -> Option<InstanceId> {
        self.nodes
            .get(instance.0 as usize)?
            .children
            .iter()
            .copied()
            .find(|&c| self.is_hydratable(c))
            .map(InstanceId)
    }

    fn next_hydratable_sibling(&self, instance: InstanceId) -> Option<InstanceId> {
        let parent = self.nodes.get(instance.0 as usize)?.parent?;
        let siblings = &self.nodes[parent as usize].children;
        let at = siblings.iter().position(|&c| c == instance.0)?;
        siblings[at + 1..]
            .iter()
            .copied()
            .find(|&c| self.is_hydratable(c))
            .map(InstanceId)
    }

    fn can_hydrate_instance(&self, instance: InstanceId, ty: &str) -> bool {
        matches!(
            self.kind(instance),
            Some(NodeKind::Element { ty: existing, .. }) if existing.eq_ignore_ascii_case(ty)
        )
    }

    fn can_hydrate_text_instance(&self, instance: InstanceId) -> bool {
        matches!(self.kind(instance), Some(NodeKind::Text(_)))
    }

    fn hydrate_text_instance(&mut self, instance: InstanceId, text: &str) -> bool {
        match self.kind(instance) {
            Some(NodeKind::Text(existing)) => existing != text,
            _ => true,
        }
    }

    fn release_instance(&mut self, instance: InstanceId) {
        self.release(instance.0);
    }

    fn request_deferred_work(&mut self) {
        self.deferred_requests += 1;
    }
}
