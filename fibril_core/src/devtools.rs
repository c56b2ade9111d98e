// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Introspection for external tooling.
//!
//! A tool attaches by implementing [`DevtoolsHook`]; the reconciler hands it
//! a [`RendererInfo`] describing this build. The lookups below resolve fibers
//! against the committed tree and return the host instances behind them.

use crate::error::{Error, Result};
use crate::fiber::{FiberId, INVALID, InstanceId, StateNode};
use crate::host::Host;
use crate::reconciler::Reconciler;
use crate::reflection;
use crate::root::RootId;
use crate::tag::WorkTag;

/// Which kind of build a renderer is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BundleType {
    /// Production timings, no development diagnostics.
    Production,
    /// Development timings.
    Development,
}

impl BundleType {
    /// Returns the numeric code tools expect (`0` production, `1`
    /// development).
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Production => 0,
            Self::Development => 1,
        }
    }
}

/// Identification of a renderer, handed to tools on injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RendererInfo {
    /// Build flavor.
    pub bundle_type: BundleType,
    /// Crate version.
    pub version: &'static str,
    /// Renderer name.
    pub renderer_package_name: &'static str,
}

/// Receives renderer registrations.
pub trait DevtoolsHook {
    /// Registers a renderer. Returns whether the hook accepted it.
    fn inject(&mut self, info: &RendererInfo) -> bool;
}

impl<H: Host> Reconciler<H> {
    /// Describes this renderer.
    #[must_use]
    pub fn renderer_info(&self) -> RendererInfo {
        RendererInfo {
            bundle_type: if self.config.development {
                BundleType::Development
            } else {
                BundleType::Production
            },
            version: env!("CARGO_PKG_VERSION"),
            renderer_package_name: "fibril",
        }
    }

    /// Registers this renderer with `hook`.
    pub fn inject_into_devtools(&self, hook: &mut dyn DevtoolsHook) -> bool {
        hook.inject(&self.renderer_info())
    }

    /// Returns the first committed host instance at or below `fiber`.
    ///
    /// Returns `Ok(None)` if the subtree renders no host nodes or is still
    /// being mounted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `fiber` is not mounted.
    pub fn find_host_instance(&mut self, fiber: FiberId) -> Result<Option<InstanceId>> {
        let host = reflection::find_current_host_fiber(&mut self.fibers, fiber)?;
        Ok(host.and_then(|host| self.instance_of(host)))
    }

    /// Like [`find_host_instance`](Self::find_host_instance), but content
    /// rendered through portals is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `fiber` is not mounted.
    pub fn find_host_instance_with_no_portals(&mut self, fiber: FiberId) -> Result<Option<InstanceId>> {
        let host = reflection::find_current_host_fiber_with_no_portals(&mut self.fibers, fiber)?;
        Ok(host.and_then(|host| self.instance_of(host)))
    }

    /// Returns the instance of the committed top-level element of `root`.
    ///
    /// Returns `Ok(None)` if nothing is rendered or the first top-level
    /// fiber is not an element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleRoot`] if the root was destroyed.
    pub fn public_root_instance(&self, root: RootId) -> Result<Option<InstanceId>> {
        let state = self.roots.get(root).ok_or(Error::StaleRoot)?;
        let current = self.fibers.root_current[state.record.0 as usize];
        let child = self.fibers.child[current as usize];
        if child == INVALID || self.fibers.tag[child as usize] != WorkTag::HostComponent {
            return Ok(None);
        }
        Ok(self.instance_of(self.fibers.id_at(child)))
    }

    fn instance_of(&self, fiber: FiberId) -> Option<InstanceId> {
        match self.fibers.state_node(fiber) {
            StateNode::Instance(instance) => Some(instance),
            _ => None,
        }
    }
}
