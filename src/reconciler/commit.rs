//! Commit phase - apply the effect list to the host in one pass.
//!
//! Runs to completion inside a single slice. Afterwards the working root is
//! the container's anchor and the replaced tree is released, together with
//! the host nodes and instances of every deleted subtree. Until the last
//! effect is applied each host write is journaled, so a host error mid-commit
//! can be undone like any other aborted cycle.

use crate::component::ComponentRuntime;
use crate::engine::{EffectTag, FiberId, FiberTag};
use crate::error::ReconcileError;
use crate::renderer::HostRenderer;
use crate::types::{ElementType, HostNodeId};

use super::journal::HostWrite;
use super::Reconciler;

// =============================================================================
// Reports
// =============================================================================

/// One entry of a committed effect list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEffect {
    pub effect: EffectTag,
    pub tag: FiberTag,
    pub ty: Option<ElementType>,
    /// Host node touched, for host fibers.
    pub host_node: Option<HostNodeId>,
}

/// What a commit applied, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub container: HostNodeId,
    pub effects: Vec<AppliedEffect>,
    /// Fibers of the replaced tree that were released.
    pub released: usize,
}

impl CommitReport {
    pub fn count(&self, effect: EffectTag) -> usize {
        self.effects.iter().filter(|e| e.effect == effect).count()
    }

    /// Host nodes touched by `effect`, in commit order.
    pub fn host_nodes(&self, effect: EffectTag) -> Vec<HostNodeId> {
        self.effects
            .iter()
            .filter(|e| e.effect == effect)
            .filter_map(|e| e.host_node)
            .collect()
    }
}

// =============================================================================
// Commit
// =============================================================================

impl<H: HostRenderer, R: ComponentRuntime> Reconciler<H, R> {
    pub(super) fn commit_all_work(&mut self, root: FiberId) -> Result<CommitReport, ReconcileError> {
        let container = self
            .fiber(root)?
            .host_node()
            .ok_or(ReconcileError::StaleFiber(root))?;
        let effects = self.fiber(root)?.effects.clone();
        let mut applied = Vec::with_capacity(effects.len());
        for id in effects {
            if let Some(effect) = self.commit_work(id)? {
                applied.push(effect);
            }
        }

        let replaced = self.anchors.insert(container, root);
        self.next_unit_of_work = None;
        self.pending_commit = None;

        let journal = std::mem::take(&mut self.journal);
        for instance in journal.retiring {
            self.runtime.unmount(instance);
        }
        for write in journal.host_writes {
            if let HostWrite::Removed { child, .. } = write {
                self.host.discard_node(child);
            }
        }

        // The committed tree keeps no links into the one it replaced.
        for id in self.fibers.subtree(root) {
            if let Some(fiber) = self.fibers.get_mut(id) {
                fiber.alternate = None;
                fiber.effect_tag = None;
                fiber.effects.clear();
            }
        }
        let released = replaced.map_or(0, |old| self.fibers.remove_subtree(old));

        log::debug!(
            "committed {} effects into {container}, released {released} fibers",
            applied.len()
        );
        Ok(CommitReport {
            container,
            effects: applied,
            released,
        })
    }

    fn commit_work(&mut self, id: FiberId) -> Result<Option<AppliedEffect>, ReconcileError> {
        let fiber = self.fiber(id)?;
        let Some(effect) = fiber.effect_tag else {
            return Ok(None);
        };
        if fiber.tag == FiberTag::RootContainer {
            return Ok(None);
        }
        let applied = AppliedEffect {
            effect,
            tag: fiber.tag,
            ty: fiber.ty.clone(),
            host_node: fiber.host_node(),
        };
        let props = fiber.props.clone();
        let alternate = fiber.alternate;
        let is_host = fiber.tag == FiberTag::HostComponent;

        let parent_node = self.host_parent(id)?;
        match (effect, applied.host_node) {
            (EffectTag::Placement, Some(node)) if is_host => {
                self.host.append_child(parent_node, node)?;
                self.journal.host_writes.push(HostWrite::Appended {
                    parent: parent_node,
                    child: node,
                });
            }
            (EffectTag::Update, Some(node)) if is_host => {
                let alternate = alternate.ok_or(ReconcileError::StaleFiber(id))?;
                let previous = self.fiber(alternate)?.props.clone();
                self.host.apply_property_diff(node, &previous, &props)?;
                self.journal.host_writes.push(HostWrite::Patched {
                    node,
                    prev: previous,
                    next: props,
                });
            }
            (EffectTag::Deletion, _) => self.commit_deletion(id, parent_node)?,
            _ => {}
        }

        log::trace!("applied {effect:?} to {}", describe(&applied));
        Ok(Some(applied))
    }

    /// Nearest host node above `id`, skipping component fibers.
    fn host_parent(&self, id: FiberId) -> Result<HostNodeId, ReconcileError> {
        let mut parent = self.fiber(id)?.parent;
        while let Some(parent_id) = parent {
            let fiber = self.fiber(parent_id)?;
            if fiber.tag != FiberTag::ComponentInstance {
                return fiber.host_node().ok_or(ReconcileError::StaleFiber(parent_id));
            }
            parent = fiber.parent;
        }
        Err(ReconcileError::StaleFiber(id))
    }

    /// Detach the top-level host nodes of a deleted subtree and retire every
    /// instance inside it.
    fn commit_deletion(&mut self, root: FiberId, parent_node: HostNodeId) -> Result<(), ReconcileError> {
        let mut node = root;
        loop {
            let fiber = self.fiber(node)?;
            let (tag, child, host_node) = (fiber.tag, fiber.child, fiber.host_node());
            let descend = match (tag, host_node) {
                (FiberTag::ComponentInstance, _) => child,
                (_, Some(host_node)) => {
                    self.host.remove_child(parent_node, host_node)?;
                    self.journal.host_writes.push(HostWrite::Removed {
                        parent: parent_node,
                        child: host_node,
                    });
                    None
                }
                (_, None) => None,
            };
            if let Some(child) = descend {
                node = child;
                continue;
            }

            if node == root {
                break;
            }
            // Climb until a sibling is left to visit.
            while self.fiber(node)?.sibling.is_none() {
                node = self.fiber(node)?.parent.ok_or(ReconcileError::StaleFiber(node))?;
                if node == root {
                    break;
                }
            }
            if node == root {
                break;
            }
            node = self.fiber(node)?.sibling.ok_or(ReconcileError::StaleFiber(node))?;
        }

        for id in self.fibers.subtree(root) {
            if let Some(instance) = self.fiber(id)?.instance() {
                self.journal.retiring.push(instance);
            }
        }
        Ok(())
    }
}

fn describe(effect: &AppliedEffect) -> String {
    match (&effect.ty, effect.host_node) {
        (Some(ty), Some(node)) => format!("{ty} ({node})"),
        (Some(ty), None) => ty.to_string(),
        (None, _) => "root".to_string(),
    }
}
