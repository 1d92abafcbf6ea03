//! Component Registry - Definitions and live instances.
//!
//! Manages:
//! - Definition storage (`ComponentId` → boxed [`Component`])
//! - Instance records (props, state, owning fiber, render count)
//!
//! Instance handles are never reused. A handle kept past unmount resolves to
//! nothing, which is how detached state updates are detected.

use std::collections::HashMap;

use crate::engine::FiberId;
use crate::error::ReconcileError;
use crate::types::{Children, ComponentId, InstanceId, Props, State};

use super::{Component, ComponentRuntime};

#[derive(Debug)]
struct InstanceRecord {
    component: ComponentId,
    props: Props,
    state: State,
    owner: Option<FiberId>,
    renders: u64,
}

/// The crate's [`ComponentRuntime`].
#[derive(Default)]
pub struct ComponentRegistry {
    definitions: Vec<Box<dyn Component>>,
    instances: HashMap<InstanceId, InstanceRecord>,
    next_instance: u32,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition and get the handle elements refer to it by.
    pub fn register(&mut self, component: impl Component + 'static) -> ComponentId {
        let id = ComponentId(self.definitions.len() as u32);
        self.definitions.push(Box::new(component));
        id
    }

    /// Name of a registered definition.
    pub fn name(&self, component: ComponentId) -> Option<&str> {
        self.definitions
            .get(component.0 as usize)
            .map(|definition| definition.name())
    }

    /// Live instances of `component`, oldest first.
    pub fn instances_of(&self, component: ComponentId) -> Vec<InstanceId> {
        let mut ids: Vec<_> = self
            .instances
            .iter()
            .filter(|(_, record)| record.component == component)
            .map(|(&id, _)| id)
            .collect();
        ids.sort();
        ids
    }

    pub fn is_mounted(&self, instance: InstanceId) -> bool {
        self.instances.contains_key(&instance)
    }

    /// Count of live instances.
    pub fn live_instances(&self) -> usize {
        self.instances.len()
    }

    /// How many times the instance's render capability ran.
    pub fn render_count(&self, instance: InstanceId) -> u64 {
        self.instances.get(&instance).map_or(0, |r| r.renders)
    }

    fn record_mut(&mut self, instance: InstanceId) -> Result<&mut InstanceRecord, ReconcileError> {
        self.instances
            .get_mut(&instance)
            .ok_or(ReconcileError::UnknownInstance(instance))
    }
}

impl ComponentRuntime for ComponentRegistry {
    fn instantiate(
        &mut self,
        component: ComponentId,
        props: &Props,
    ) -> Result<InstanceId, ReconcileError> {
        let definition = self
            .definitions
            .get(component.0 as usize)
            .ok_or(ReconcileError::UnknownComponent(component))?;
        let state = definition.initial_state(props);

        let id = InstanceId(self.next_instance);
        self.next_instance += 1;
        self.instances.insert(
            id,
            InstanceRecord {
                component,
                props: props.clone(),
                state,
                owner: None,
                renders: 0,
            },
        );
        log::trace!("instantiated {} as {}", definition.name(), id);
        Ok(id)
    }

    fn props(&self, instance: InstanceId) -> Option<&Props> {
        self.instances.get(&instance).map(|r| &r.props)
    }

    fn set_props(&mut self, instance: InstanceId, props: Props) -> Result<(), ReconcileError> {
        self.record_mut(instance)?.props = props;
        Ok(())
    }

    fn state(&self, instance: InstanceId) -> Option<&State> {
        self.instances.get(&instance).map(|r| &r.state)
    }

    fn replace_state(&mut self, instance: InstanceId, state: State) -> Result<(), ReconcileError> {
        self.record_mut(instance)?.state = state;
        Ok(())
    }

    fn render(&mut self, instance: InstanceId) -> Result<Children, ReconcileError> {
        let record = self
            .instances
            .get_mut(&instance)
            .ok_or(ReconcileError::UnknownInstance(instance))?;
        let definition = self
            .definitions
            .get(record.component.0 as usize)
            .ok_or(ReconcileError::UnknownComponent(record.component))?;

        record.renders += 1;
        definition
            .render(&record.props, &record.state)
            .map_err(|source| ReconcileError::Render {
                component: definition.name().to_string(),
                source,
            })
    }

    fn owner(&self, instance: InstanceId) -> Option<FiberId> {
        self.instances.get(&instance).and_then(|r| r.owner)
    }

    fn set_owner(
        &mut self,
        instance: InstanceId,
        owner: Option<FiberId>,
    ) -> Result<(), ReconcileError> {
        self.record_mut(instance)?.owner = owner;
        Ok(())
    }

    fn unmount(&mut self, instance: InstanceId) {
        if self.instances.remove(&instance).is_some() {
            log::trace!("unmounted {}", instance);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::component_fn;
    use crate::error::RenderError;
    use crate::types::{prop_map, Element, PropMap, Value};

    fn setup() -> (ComponentRegistry, ComponentId) {
        let mut registry = ComponentRegistry::new();
        let label = registry.register(
            component_fn("Label", |props, state| {
                let text = state
                    .get("text")
                    .or_else(|| props.get("text"))
                    .cloned()
                    .unwrap_or_default();
                Ok(Element::host("span", prop_map([("text", text)]), Children::None).into())
            })
            .with_initial_state(prop_map([("clicks", Value::from(0))])),
        );
        (registry, label)
    }

    #[test]
    fn test_instantiate() {
        let (mut registry, label) = setup();
        let props = Props::from_attrs(prop_map([("text", Value::from("hi"))]));

        let id = registry.instantiate(label, &props).unwrap();

        assert!(registry.props(id).unwrap().ptr_eq(&props));
        assert_eq!(registry.state(id).unwrap().get("clicks"), Some(&Value::Int(0)));
        assert_eq!(registry.owner(id), None);
        assert_eq!(registry.instances_of(label), vec![id]);
        assert_eq!(registry.name(label), Some("Label"));
    }

    #[test]
    fn test_unknown_component() {
        let (mut registry, _) = setup();
        assert_eq!(
            registry.instantiate(ComponentId(42), &Props::default()),
            Err(ReconcileError::UnknownComponent(ComponentId(42)))
        );
    }

    #[test]
    fn test_render_reads_merged_state() {
        let (mut registry, label) = setup();
        let id = registry
            .instantiate(label, &Props::from_attrs(prop_map([("text", Value::from("a"))])))
            .unwrap();

        registry
            .merge_state(id, &prop_map([("text", Value::from("b"))]))
            .unwrap();
        let children = registry.render(id).unwrap().into_vec();

        assert_eq!(children[0].props.get("text"), Some(&Value::from("b")));
        // Untouched keys survive the merge
        assert_eq!(registry.state(id).unwrap().get("clicks"), Some(&Value::Int(0)));
        assert_eq!(registry.render_count(id), 1);
    }

    #[test]
    fn test_render_failure_names_component() {
        let mut registry = ComponentRegistry::new();
        let broken = registry.register(component_fn("Broken", |_, _| Err(RenderError::new("boom"))));
        let id = registry.instantiate(broken, &Props::default()).unwrap();

        match registry.render(id) {
            Err(ReconcileError::Render { component, source }) => {
                assert_eq!(component, "Broken");
                assert_eq!(source.message, "boom");
            }
            other => panic!("expected render error, got {other:?}"),
        }
    }

    #[test]
    fn test_unmount_invalidates_handle() {
        let (mut registry, label) = setup();
        let id = registry.instantiate(label, &Props::from_attrs(PropMap::new())).unwrap();

        registry.unmount(id);

        assert!(!registry.is_mounted(id));
        assert_eq!(registry.owner(id), None);
        assert_eq!(
            registry.set_props(id, Props::default()),
            Err(ReconcileError::UnknownInstance(id))
        );
        // Handles are not recycled
        let next = registry.instantiate(label, &Props::default()).unwrap();
        assert_ne!(next, id);
    }
}
