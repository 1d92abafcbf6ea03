//! Component Runtime - Stateful components behind a trait seam.
//!
//! The reconciler treats components as opaque handles:
//! - a [`ComponentId`] names a definition
//! - an [`InstanceId`] names a live instance with props, state and a
//!   back-reference to the fiber that currently owns it
//!
//! Everything it needs from instances goes through [`ComponentRuntime`].
//! [`ComponentRegistry`] is the runtime shipped with the crate; it drives
//! [`Component`] trait objects, including closures wrapped by
//! [`component_fn`].
//!
//! # Example
//!
//! ```ignore
//! let mut runtime = ComponentRegistry::new();
//! let counter = runtime.register(
//!     component_fn("Counter", |_props, state| {
//!         let count = state.get("count").and_then(Value::as_int).unwrap_or(0);
//!         Ok(Element::host("span", prop_map([("text", count.into())]), Children::None).into())
//!     })
//!     .with_initial_state(prop_map([("count", 0.into())])),
//! );
//! ```

mod registry;

pub use registry::ComponentRegistry;

use crate::engine::FiberId;
use crate::error::{ReconcileError, RenderError};
use crate::types::{merge_state, Children, ComponentId, InstanceId, Props, State};

// =============================================================================
// Component Definitions
// =============================================================================

/// A component definition: turns props and state into child elements.
pub trait Component {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// State of a freshly instantiated component.
    fn initial_state(&self, _props: &Props) -> State {
        State::new()
    }

    /// Describe the children for the current props and state.
    fn render(&self, props: &Props, state: &State) -> Result<Children, RenderError>;
}

/// Closure-backed component. See [`component_fn`].
pub struct FnComponent<F> {
    name: String,
    initial: State,
    render: F,
}

/// Wrap a render closure as a [`Component`].
pub fn component_fn<F>(name: &str, render: F) -> FnComponent<F>
where
    F: Fn(&Props, &State) -> Result<Children, RenderError>,
{
    FnComponent {
        name: name.to_string(),
        initial: State::new(),
        render,
    }
}

impl<F> FnComponent<F> {
    /// Start every instance with a copy of `state`.
    pub fn with_initial_state(mut self, state: State) -> Self {
        self.initial = state;
        self
    }
}

impl<F> Component for FnComponent<F>
where
    F: Fn(&Props, &State) -> Result<Children, RenderError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn initial_state(&self, _props: &Props) -> State {
        self.initial.clone()
    }

    fn render(&self, props: &Props, state: &State) -> Result<Children, RenderError> {
        (self.render)(props, state)
    }
}

// =============================================================================
// Runtime Seam
// =============================================================================

/// Instance operations the reconciler depends on.
pub trait ComponentRuntime {
    /// Create an instance of `component` with initial `props`.
    fn instantiate(&mut self, component: ComponentId, props: &Props)
    -> Result<InstanceId, ReconcileError>;

    /// Props the instance last rendered with.
    fn props(&self, instance: InstanceId) -> Option<&Props>;

    fn set_props(&mut self, instance: InstanceId, props: Props) -> Result<(), ReconcileError>;

    fn state(&self, instance: InstanceId) -> Option<&State>;

    fn replace_state(&mut self, instance: InstanceId, state: State) -> Result<(), ReconcileError>;

    /// Shallow-merge `patch` into the instance state.
    fn merge_state(&mut self, instance: InstanceId, patch: &State) -> Result<(), ReconcileError> {
        let mut state = self
            .state(instance)
            .cloned()
            .ok_or(ReconcileError::UnknownInstance(instance))?;
        merge_state(&mut state, patch);
        self.replace_state(instance, state)
    }

    /// Invoke the render capability with the instance's current props/state.
    ///
    /// Failures are reported as [`ReconcileError::Render`].
    fn render(&mut self, instance: InstanceId) -> Result<Children, ReconcileError>;

    /// Fiber that currently owns the instance (back-reference).
    fn owner(&self, instance: InstanceId) -> Option<FiberId>;

    fn set_owner(&mut self, instance: InstanceId, owner: Option<FiberId>)
    -> Result<(), ReconcileError>;

    /// The instance left the tree. Later lookups must fail.
    fn unmount(&mut self, instance: InstanceId);
}
