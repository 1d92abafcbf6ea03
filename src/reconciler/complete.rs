//! Complete phase - propagate effects toward the root.
//!
//! Children complete before their parent, so a parent's list ends up as
//! its own deletions (queued during begin), then each child's effects
//! followed by the child itself. The root's list is the commit order.

use crate::component::ComponentRuntime;
use crate::engine::{FiberId, FiberTag};
use crate::error::ReconcileError;
use crate::renderer::HostRenderer;

use super::Reconciler;

impl<H: HostRenderer, R: ComponentRuntime> Reconciler<H, R> {
    pub(super) fn complete_work(&mut self, id: FiberId) -> Result<(), ReconcileError> {
        let fiber = self.fiber(id)?;
        let parent = fiber.parent;
        let tagged = fiber.effect_tag.is_some();
        let instance = match fiber.tag {
            FiberTag::ComponentInstance => fiber.instance(),
            _ => None,
        };

        if let Some(instance) = instance {
            let previous = self.runtime.owner(instance);
            self.journal.owners.push((instance, previous));
            self.runtime.set_owner(instance, Some(id))?;
        }

        match parent {
            Some(parent) => {
                let mut effects = std::mem::take(&mut self.fiber_mut(id)?.effects);
                if tagged {
                    effects.push(id);
                }
                self.fiber_mut(parent)?.effects.extend(effects);
            }
            None => {
                log::trace!("working tree complete, commit pending");
                self.pending_commit = Some(id);
            }
        }
        Ok(())
    }
}
