//! Cycle journal - undo log for the cycle under construction.
//!
//! Building a working tree writes to very little outside of it:
//! - host nodes created for Placement fibers
//! - component instances (created, re-propped, state merged, re-owned)
//! - Deletion tags on committed fibers
//! - the state patch parked on the committed owner of a state update
//! - host writes made by a commit that has not finished yet
//!
//! Each of those writes is recorded here so an aborted cycle leaves the
//! committed tree and every instance exactly as the last commit left them.
//! The one exception is a host node detached by a failed commit: it is
//! re-appended, which puts it last among its siblings.

use crate::component::ComponentRuntime;
use crate::engine::FiberId;
use crate::renderer::HostRenderer;
use crate::types::{HostNodeId, InstanceId, Props, State};

use super::Reconciler;

#[derive(Debug)]
pub(crate) struct InstanceSnapshot {
    instance: InstanceId,
    props: Props,
    state: State,
}

/// A host mutation applied during commit.
#[derive(Debug)]
pub(crate) enum HostWrite {
    Appended { parent: HostNodeId, child: HostNodeId },
    Removed { parent: HostNodeId, child: HostNodeId },
    Patched { node: HostNodeId, prev: Props, next: Props },
}

#[derive(Debug, Default)]
pub(crate) struct CycleJournal {
    /// Every fiber allocated for the working tree.
    pub fibers: Vec<FiberId>,
    pub created_nodes: Vec<HostNodeId>,
    pub instantiated: Vec<InstanceId>,
    /// Props and state of pre-existing instances, before their first render
    /// this cycle.
    pub snapshots: Vec<InstanceSnapshot>,
    /// Owner back-references in the order they were overwritten.
    pub owners: Vec<(InstanceId, Option<FiberId>)>,
    /// Committed fibers tagged Deletion.
    pub deletions: Vec<FiberId>,
    /// Committed owner fiber and the patch it held before this cycle.
    pub patched: Option<(FiberId, Option<State>)>,
    /// Host writes of the commit in progress, in the order applied.
    pub host_writes: Vec<HostWrite>,
    /// Instances inside deleted subtrees, unmounted once the commit lands.
    pub retiring: Vec<InstanceId>,
}

impl CycleJournal {
    /// Remember `instance` as it was before this cycle touched it.
    pub fn snapshot_instance<R: ComponentRuntime>(&mut self, runtime: &R, instance: InstanceId) {
        let seen = self.instantiated.contains(&instance)
            || self.snapshots.iter().any(|s| s.instance == instance);
        if seen {
            return;
        }
        if let (Some(props), Some(state)) = (runtime.props(instance), runtime.state(instance)) {
            self.snapshots.push(InstanceSnapshot {
                instance,
                props: props.clone(),
                state: state.clone(),
            });
        }
    }
}

impl<H: HostRenderer, R: ComponentRuntime> Reconciler<H, R> {
    /// Discard the cycle in progress and undo its side effects.
    pub(super) fn abort_cycle(&mut self) {
        let journal = std::mem::take(&mut self.journal);

        for write in journal.host_writes.into_iter().rev() {
            let undone = match &write {
                HostWrite::Appended { parent, child } => self.host.remove_child(*parent, *child),
                HostWrite::Removed { parent, child } => self.host.append_child(*parent, *child),
                HostWrite::Patched { node, prev, next } => {
                    self.host.apply_property_diff(*node, next, prev)
                }
            };
            if let Err(err) = undone {
                log::debug!("{write:?} not undone: {err}");
            }
        }

        // Earliest recorded owner wins.
        for (instance, owner) in journal.owners.into_iter().rev() {
            if let Err(err) = self.runtime.set_owner(instance, owner) {
                log::debug!("owner of {instance} not restored: {err}");
            }
        }
        for snapshot in journal.snapshots {
            let restored = self
                .runtime
                .set_props(snapshot.instance, snapshot.props)
                .and_then(|()| self.runtime.replace_state(snapshot.instance, snapshot.state));
            if let Err(err) = restored {
                log::debug!("{} not restored: {err}", snapshot.instance);
            }
        }
        for instance in journal.instantiated {
            self.runtime.unmount(instance);
        }
        for node in journal.created_nodes {
            self.host.discard_node(node);
        }

        for id in journal.deletions {
            if let Some(fiber) = self.fibers.get_mut(id) {
                fiber.effect_tag = None;
            }
        }
        if let Some((owner, previous)) = journal.patched {
            if let Some(fiber) = self.fibers.get_mut(owner) {
                fiber.partial_state = previous;
            }
        }

        let released = journal.fibers.len();
        for id in journal.fibers {
            self.fibers.remove(id);
        }
        self.next_unit_of_work = None;
        self.pending_commit = None;
        log::debug!("cycle discarded, released {released} fibers");
    }
}
