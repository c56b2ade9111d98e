// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The reconciler: roots, their updates, and the fiber store they share.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;

use crate::batch::Batch;
use crate::error::{Error, Result};
use crate::expiration::ExpirationTime;
use crate::fiber::{ContainerId, FiberId, FiberStore, INVALID};
use crate::handle::{Callback, Work};
use crate::host::Host;
use crate::node::Node;
use crate::reflection;
use crate::root::{RootId, RootOptions, RootState, RootTable, Update};
use crate::scheduler::{SchedulerConfig, SchedulerState};
use crate::trace::{TraceSink, Tracer, UpdateScheduledEvent};

/// Owns every root attached to one [`Host`] and drives their rendering.
///
/// Roots are created with [`create_root`](Self::create_root) (concurrent) or
/// through the container adapter
/// ([`legacy_render`](Self::legacy_render), synchronous). Updates are
/// scheduled with [`render`](Self::render) and committed according to their
/// [`ExpirationTime`]; see [`scheduler`](crate::scheduler).
pub struct Reconciler<H: Host> {
    pub(crate) host: H,
    pub(crate) fibers: FiberStore,
    pub(crate) roots: RootTable,
    pub(crate) scheduler: SchedulerState,
    pub(crate) config: SchedulerConfig,
    pub(crate) tracer: Tracer,
    /// Legacy roots by container.
    pub(crate) containers: BTreeMap<ContainerId, RootId>,
    pub(crate) start_ms: u64,
}

impl<H: Host + core::fmt::Debug> core::fmt::Debug for Reconciler<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Reconciler")
            .field("host", &self.host)
            .field("live_fibers", &self.fibers.live_count())
            .field("config", &self.config)
            .field("containers", &self.containers)
            .finish_non_exhaustive()
    }
}

impl<H: Host> Reconciler<H> {
    /// Creates a reconciler for `host`. Expiration times are measured from
    /// the host's current time.
    pub fn new(host: H, config: SchedulerConfig) -> Self {
        let start_ms = host.now();
        Self {
            host,
            fibers: FiberStore::new(),
            roots: RootTable::default(),
            scheduler: SchedulerState::default(),
            config,
            tracer: Tracer::none(),
            containers: BTreeMap::new(),
            start_ms,
        }
    }

    /// Installs a trace sink, replacing any previous one.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.tracer = Tracer::new(sink);
    }

    /// Removes and returns the installed trace sink.
    pub fn take_trace_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        self.tracer.take()
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Returns the host mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Returns the fiber store shared by all roots.
    #[must_use]
    pub fn fibers(&self) -> &FiberStore {
        &self.fibers
    }

    /// Returns the scheduler configuration.
    #[must_use]
    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    // -- Roots --

    /// Creates a concurrent root over `container`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if `container` cannot hold a tree.
    pub fn create_root(&mut self, container: ContainerId, options: RootOptions) -> Result<RootId> {
        if !self.is_valid_container(container) {
            return Err(Error::InvalidContainer);
        }
        Ok(self.create_root_with(container, true, options.hydrate))
    }

    pub(crate) fn create_root_with(&mut self, container: ContainerId, concurrent: bool, hydrate: bool) -> RootId {
        let record = self.fibers.alloc_host_root();
        self.roots
            .insert(RootState::new(container, record, concurrent, hydrate))
    }

    /// Destroys a root and frees its fibers.
    ///
    /// Host nodes are left alone; unmount the tree first to remove them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleRoot`] if the root was already destroyed.
    pub fn destroy_root(&mut self, root: RootId) -> Result<()> {
        let state = self.roots.remove(root).ok_or(Error::StaleRoot)?;
        if let Some(render) = self.scheduler.render.take_if(|render| render.root == root) {
            self.discard_render(render);
        }
        if let Some(finished) = state.finished {
            self.discard_render(finished);
        }
        let current = self.fibers.root_current[state.record.0 as usize];
        let mut child = self.fibers.child[current as usize];
        while child != INVALID {
            let next = self.fibers.sibling[child as usize];
            self.fibers.free_subtree(child);
            child = next;
        }
        let current = self.fibers.id_at(current);
        self.fibers.destroy_host_root(current);

        self.scheduler.scheduled.retain(|id| *id != root);
        self.containers.retain(|_, id| *id != root);
        Ok(())
    }

    /// Schedules `children` to be rendered into `root`.
    ///
    /// `callback` runs once the update commits; it is also registered on the
    /// returned handle. Legacy (synchronous) roots commit before this
    /// returns unless called inside a batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleRoot`] if the root was destroyed.
    pub fn render(&mut self, root: RootId, children: Node, callback: Option<Callback>) -> Result<Work> {
        let concurrent = self.roots.get(root).ok_or(Error::StaleRoot)?.concurrent;
        let work = Work::new();
        if let Some(callback) = callback {
            work.then_boxed(callback);
        }
        let expiration = self.compute_expiration_for_root(concurrent);
        self.update_container_at_expiration(root, children, expiration, Some(work.clone()))?;
        Ok(work)
    }

    /// Schedules removal of everything rendered into `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleRoot`] if the root was destroyed.
    pub fn unmount(&mut self, root: RootId, callback: Option<Callback>) -> Result<Work> {
        self.render(root, Node::Empty, callback)
    }

    /// Renders `children` into `root` on behalf of the mounted fiber
    /// `parent`, which is recorded as the root's parent context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParentComponent`] if `parent` is not mounted,
    /// or [`Error::StaleRoot`] if the root was destroyed.
    pub fn legacy_render_subtree_into_container(
        &mut self,
        root: RootId,
        parent: FiberId,
        children: Node,
        callback: Option<Callback>,
    ) -> Result<Work> {
        if !reflection::is_fiber_mounted(&self.fibers, parent) {
            return Err(Error::InvalidParentComponent);
        }
        self.roots.get_mut(root).ok_or(Error::StaleRoot)?.context = Some(parent);
        self.render(root, children, callback)
    }

    /// Enqueues an update of `root` at a fixed expiration time.
    pub(crate) fn update_container_at_expiration(
        &mut self,
        root: RootId,
        children: Node,
        expiration: ExpirationTime,
        work: Option<Work>,
    ) -> Result<()> {
        let state = self.roots.get_mut(root).ok_or(Error::StaleRoot)?;
        state.queue.push(Update {
            expiration,
            element: children,
            callback: work,
        });
        let timestamp_ms = self.host.now();
        self.tracer.update_scheduled(&UpdateScheduledEvent {
            root: root.idx,
            expiration,
            timestamp_ms,
        });
        self.schedule_work(root, expiration);
        Ok(())
    }

    // -- Root queries --

    /// Returns the committed host-root fiber of `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleRoot`] if the root was destroyed.
    pub fn root_current_fiber(&self, root: RootId) -> Result<FiberId> {
        let state = self.roots.get(root).ok_or(Error::StaleRoot)?;
        Ok(self.fibers.root_current(state.record))
    }

    /// Returns the container `root` renders into.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleRoot`] if the root was destroyed.
    pub fn root_container(&self, root: RootId) -> Result<ContainerId> {
        Ok(self.roots.get(root).ok_or(Error::StaleRoot)?.container)
    }

    /// Returns the parent context recorded by the last legacy subtree
    /// render into `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleRoot`] if the root was destroyed.
    pub fn root_context(&self, root: RootId) -> Result<Option<FiberId>> {
        Ok(self.roots.get(root).ok_or(Error::StaleRoot)?.context)
    }

    /// Returns whether `root` schedules asynchronously.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleRoot`] if the root was destroyed.
    pub fn is_concurrent(&self, root: RootId) -> Result<bool> {
        Ok(self.roots.get(root).ok_or(Error::StaleRoot)?.concurrent)
    }

    /// Returns the pending batches of `root`, most urgent first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleRoot`] if the root was destroyed.
    pub fn batches(&self, root: RootId) -> Result<&[Batch]> {
        Ok(&self.roots.get(root).ok_or(Error::StaleRoot)?.batches)
    }

    /// Returns the most urgent pending expiration time of `root`, or
    /// [`NO_WORK`](ExpirationTime::NO_WORK).
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleRoot`] if the root was destroyed.
    pub fn remaining_expiration(&self, root: RootId) -> Result<ExpirationTime> {
        Ok(self.roots.get(root).ok_or(Error::StaleRoot)?.remaining)
    }
}
