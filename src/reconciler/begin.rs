//! Begin phase - bring one fiber up to date and diff its children.
//!
//! Host and root fibers take their children from `props.children`; component
//! fibers get theirs by rendering the instance. Children are matched to the
//! alternate's children strictly by position:
//!
//! | old fiber | new element    | result                                     |
//! |-----------|----------------|--------------------------------------------|
//! | type T    | type T         | clone of old, new props (Update if changed)|
//! | type T    | type U         | old tagged Deletion, new fiber Placement   |
//! | -         | any            | new fiber Placement                        |
//! | any       | -              | old tagged Deletion                        |

use crate::component::ComponentRuntime;
use crate::engine::{EffectTag, Fiber, FiberId, FiberTag, StateNode};
use crate::error::ReconcileError;
use crate::renderer::HostRenderer;
use crate::types::{Element, ElementType, Props};

use super::Reconciler;

impl<H: HostRenderer, R: ComponentRuntime> Reconciler<H, R> {
    pub(super) fn begin_work(&mut self, id: FiberId) -> Result<(), ReconcileError> {
        match self.fiber(id)?.tag {
            FiberTag::ComponentInstance => self.update_component(id),
            FiberTag::HostComponent | FiberTag::RootContainer => self.update_host(id),
        }
    }

    fn update_host(&mut self, id: FiberId) -> Result<(), ReconcileError> {
        let fiber = self.fiber(id)?;
        let props = fiber.props.clone();
        let missing_tag = match (&fiber.state_node, &fiber.ty) {
            (None, Some(ElementType::Host(tag))) => Some(tag.clone()),
            _ => None,
        };

        if let Some(tag) = missing_tag {
            let node = self.host.create_node(&tag, &props)?;
            self.journal.created_nodes.push(node);
            self.fiber_mut(id)?.state_node = Some(StateNode::Host(node));
        }

        self.reconcile_children(id, props.children().as_slice())
    }

    fn update_component(&mut self, id: FiberId) -> Result<(), ReconcileError> {
        let fiber = self.fiber(id)?;
        let props = fiber.props.clone();
        let has_patch = fiber.partial_state.is_some();
        let existing = fiber.instance();
        let component = match &fiber.ty {
            Some(ElementType::Component(component)) => Some(*component),
            _ => None,
        };

        let instance = match (existing, component) {
            (Some(instance), _) => {
                let unchanged = self
                    .runtime
                    .props(instance)
                    .is_some_and(|current| current.ptr_eq(&props));
                if unchanged && !has_patch {
                    log::trace!("{instance} unchanged, reusing children");
                    return self.clone_child_fibers(id);
                }
                self.journal.snapshot_instance(&self.runtime, instance);
                instance
            }
            (None, Some(component)) => {
                let instance = self.runtime.instantiate(component, &props)?;
                self.journal.instantiated.push(instance);
                self.fiber_mut(id)?.state_node = Some(StateNode::Instance(instance));
                instance
            }
            (None, None) => return Err(ReconcileError::StaleFiber(id)),
        };

        self.runtime.set_props(instance, props)?;
        if let Some(patch) = self.fiber_mut(id)?.partial_state.take() {
            self.runtime.merge_state(instance, &patch)?;
        }

        let children = self.runtime.render(instance)?;
        self.reconcile_children(id, children.as_slice())
    }

    /// Diff `elements` against the children of `wip`'s alternate.
    pub(super) fn reconcile_children(
        &mut self,
        wip: FiberId,
        elements: &[Element],
    ) -> Result<(), ReconcileError> {
        let mut old = match self.fiber(wip)?.alternate {
            Some(alternate) => self.fiber(alternate)?.child,
            None => None,
        };
        let mut previous: Option<FiberId> = None;
        let mut index = 0;

        while index < elements.len() || old.is_some() {
            let element = elements.get(index);
            let mut next_old = None;
            let mut reused = None;
            let mut deleted = None;

            if let Some(old_id) = old {
                let old_fiber = self.fiber(old_id)?;
                next_old = old_fiber.sibling;
                match element {
                    Some(element) if old_fiber.is_type(&element.ty) => {
                        let effect = has_host_changes(old_fiber, &element.props)
                            .then_some(EffectTag::Update);
                        reused = Some(Fiber::clone_of(
                            old_fiber,
                            old_id,
                            element.props.clone(),
                            wip,
                            effect,
                        ));
                    }
                    _ => deleted = Some(old_id),
                }
            }

            if let Some(old_id) = deleted {
                self.mark_deletion(wip, old_id)?;
            }

            let new_fiber = reused.or_else(|| element.map(|element| Fiber::placement(element, wip)));
            if let Some(fiber) = new_fiber {
                let id = self.alloc_fiber(fiber);
                self.link_child(wip, previous, id)?;
                previous = Some(id);
            }

            old = next_old;
            index += 1;
        }
        Ok(())
    }

    /// Copy one level of the alternate's children under `wip` untouched.
    fn clone_child_fibers(&mut self, wip: FiberId) -> Result<(), ReconcileError> {
        let Some(alternate) = self.fiber(wip)?.alternate else {
            return Ok(());
        };

        let mut previous = None;
        for old_id in self.fibers.children(alternate) {
            let old = self.fiber(old_id)?;
            let clone = Fiber::clone_of(old, old_id, old.props.clone(), wip, None);
            let id = self.alloc_fiber(clone);
            self.link_child(wip, previous, id)?;
            previous = Some(id);
        }
        Ok(())
    }

    fn link_child(
        &mut self,
        parent: FiberId,
        previous: Option<FiberId>,
        id: FiberId,
    ) -> Result<(), ReconcileError> {
        match previous {
            Some(previous) => self.fiber_mut(previous)?.sibling = Some(id),
            None => self.fiber_mut(parent)?.child = Some(id),
        }
        Ok(())
    }

    /// Tag a committed fiber for removal and queue it on the working parent.
    fn mark_deletion(&mut self, wip: FiberId, old: FiberId) -> Result<(), ReconcileError> {
        self.fiber_mut(old)?.effect_tag = Some(EffectTag::Deletion);
        self.journal.deletions.push(old);
        self.fiber_mut(wip)?.effects.push(old);
        Ok(())
    }
}

/// Whether reusing `old` with `next` props leaves attribute work for commit.
///
/// Component fibers never do: their host work belongs to their descendants.
fn has_host_changes(old: &Fiber, next: &Props) -> bool {
    old.tag == FiberTag::HostComponent && !old.props.ptr_eq(next) && old.props.attrs() != next.attrs()
}
