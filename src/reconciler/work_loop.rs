//! Work loop - drives one cycle forward a fiber at a time.
//!
//! Traversal is depth-first: begin a fiber, descend into its first child,
//! and when a fiber has no children complete it and every ancestor up to the
//! first one with an unvisited sibling.

use crate::component::ComponentRuntime;
use crate::engine::{Fiber, FiberId};
use crate::error::ReconcileError;
use crate::renderer::HostRenderer;
use crate::scheduler::Deadline;
use crate::types::{InstanceId, Props};

use super::journal::CycleJournal;
use super::queue::UpdateRequest;
use super::{Reconciler, SliceReport, SliceStatus};

impl<H: HostRenderer, R: ComponentRuntime> Reconciler<H, R> {
    pub(super) fn work_loop(
        &mut self,
        deadline: &dyn Deadline,
        report: &mut SliceReport,
    ) -> Result<(), ReconcileError> {
        if self.next_unit_of_work.is_none() && self.reset_next_unit_of_work()? {
            report.status |= SliceStatus::STARTED_CYCLE;
        }

        while let Some(unit) = self.next_unit_of_work {
            if deadline.time_remaining() <= self.config.enough_time {
                break;
            }
            self.next_unit_of_work = self.perform_unit_of_work(unit)?;
            report.units_of_work += 1;
        }

        if let Some(root) = self.pending_commit {
            report.commit = Some(self.commit_all_work(root)?);
            report.status |= SliceStatus::COMMITTED;
        } else if self.next_unit_of_work.is_some() {
            report.status |= SliceStatus::YIELDED;
        }
        Ok(())
    }

    /// Pop the next request and build the working root for it.
    ///
    /// Returns `false` when the queue is empty.
    fn reset_next_unit_of_work(&mut self) -> Result<bool, ReconcileError> {
        let Some(request) = self.queue.pop() else {
            return Ok(false);
        };
        self.journal = CycleJournal::default();

        let (container, props, alternate) = match request {
            UpdateRequest::RootRender { container, children } => (
                container,
                Props::with_children(children),
                self.anchors.get(&container).copied(),
            ),
            UpdateRequest::StateUpdate { instance, patch } => {
                let (owner, root) = self
                    .mounted_root_of(instance)
                    .ok_or(ReconcileError::DetachedInstanceUpdate(instance))?;
                let previous = self.fiber(root)?;
                let container = previous
                    .host_node()
                    .ok_or(ReconcileError::StaleFiber(root))?;
                let props = previous.props.clone();

                // The patch rides on the committed fiber until the cycle
                // clones it into the working tree.
                let fiber = self.fiber_mut(owner)?;
                let replaced = fiber.partial_state.replace(patch);
                self.journal.patched = Some((owner, replaced));
                (container, props, Some(root))
            }
        };

        let root = self.alloc_fiber(Fiber::root(container, props, alternate));
        self.next_unit_of_work = Some(root);
        log::debug!(
            "cycle started for {container} ({} queued)",
            self.queue.len()
        );
        Ok(true)
    }

    /// Owning fiber of `instance` and the root above it, if that root is the
    /// committed tree of some container.
    fn mounted_root_of(&self, instance: InstanceId) -> Option<(FiberId, FiberId)> {
        let owner = self.runtime.owner(instance)?;
        let root = self.fibers.root_of(owner)?;
        self.anchors
            .values()
            .any(|&anchor| anchor == root)
            .then_some((owner, root))
    }

    /// Begin `unit`, then pick the next fiber to visit.
    fn perform_unit_of_work(&mut self, unit: FiberId) -> Result<Option<FiberId>, ReconcileError> {
        log::trace!("unit of work {unit:?}");
        self.begin_work(unit)?;

        if let Some(child) = self.fiber(unit)?.child {
            return Ok(Some(child));
        }

        let mut node = Some(unit);
        while let Some(id) = node {
            self.complete_work(id)?;
            let fiber = self.fiber(id)?;
            if let Some(sibling) = fiber.sibling {
                return Ok(Some(sibling));
            }
            node = fiber.parent;
        }
        Ok(None)
    }
}
