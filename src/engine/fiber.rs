//! Fiber - The unit of incremental work and the persistent tree node.
//!
//! A fiber pairs the description for the cycle under construction (type,
//! props, pending state patch) with a link to its counterpart from the last
//! committed cycle (`alternate`). Tree links are arena handles, never owning
//! references, so `parent`/`alternate` back-edges cost nothing.

use crate::types::{Element, ElementType, HostNodeId, InstanceId, Props, State};

use super::arena::FiberId;

// =============================================================================
// Tags
// =============================================================================

/// What kind of tree position a fiber represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FiberTag {
    /// Owns a host node created by the host renderer.
    HostComponent,
    /// Owns a component instance created by the component runtime.
    ComponentInstance,
    /// Top of a tree; owns the container node passed to `render()`.
    RootContainer,
}

impl FiberTag {
    /// Tag for a fiber built from an element of this type.
    pub fn for_type(ty: &ElementType) -> Self {
        match ty {
            ElementType::Host(_) => FiberTag::HostComponent,
            ElementType::Component(_) => FiberTag::ComponentInstance,
        }
    }
}

/// Recorded mutation intent, applied at commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectTag {
    Placement,
    Update,
    Deletion,
}

/// What a fiber owns outside the tree. Exactly one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateNode {
    Host(HostNodeId),
    Instance(InstanceId),
}

impl StateNode {
    pub fn host(self) -> Option<HostNodeId> {
        match self {
            StateNode::Host(node) => Some(node),
            StateNode::Instance(_) => None,
        }
    }

    pub fn instance(self) -> Option<InstanceId> {
        match self {
            StateNode::Instance(instance) => Some(instance),
            StateNode::Host(_) => None,
        }
    }
}

// =============================================================================
// Fiber
// =============================================================================

/// One tree position for one reconciliation cycle.
#[derive(Debug, Clone)]
pub struct Fiber {
    /// Element type. `None` only for root fibers.
    pub ty: Option<ElementType>,
    pub tag: FiberTag,
    /// Host node or component instance, once created.
    pub state_node: Option<StateNode>,
    /// Immutable snapshot for this cycle.
    pub props: Props,
    /// Pending state patch (component fibers), cleared once applied.
    pub partial_state: Option<State>,
    pub effect_tag: Option<EffectTag>,

    pub parent: Option<FiberId>,
    pub child: Option<FiberId>,
    pub sibling: Option<FiberId>,
    /// Counterpart in the last committed tree.
    pub alternate: Option<FiberId>,

    /// Descendants requiring host mutation, in commit order.
    /// Only populated while the complete phase is running.
    pub effects: Vec<FiberId>,
}

impl Fiber {
    /// Working root for a container.
    pub fn root(container: HostNodeId, props: Props, alternate: Option<FiberId>) -> Self {
        Self {
            ty: None,
            tag: FiberTag::RootContainer,
            state_node: Some(StateNode::Host(container)),
            props,
            partial_state: None,
            effect_tag: None,
            parent: None,
            child: None,
            sibling: None,
            alternate,
            effects: Vec::new(),
        }
    }

    /// Fresh fiber for an element with no matching predecessor.
    ///
    /// Tagged Placement, no alternate, nothing created yet.
    pub fn placement(element: &Element, parent: FiberId) -> Self {
        Self {
            ty: Some(element.ty.clone()),
            tag: FiberTag::for_type(&element.ty),
            state_node: None,
            props: element.props.clone(),
            partial_state: None,
            effect_tag: Some(EffectTag::Placement),
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: None,
            effects: Vec::new(),
        }
    }

    /// New record for `old` (living at `old_id`) under `parent`.
    ///
    /// Keeps the state node and any carried-over state patch.
    pub fn clone_of(
        old: &Fiber,
        old_id: FiberId,
        props: Props,
        parent: FiberId,
        effect_tag: Option<EffectTag>,
    ) -> Self {
        Self {
            ty: old.ty.clone(),
            tag: old.tag,
            state_node: old.state_node,
            props,
            partial_state: old.partial_state.clone(),
            effect_tag,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: Some(old_id),
            effects: Vec::new(),
        }
    }

    pub fn host_node(&self) -> Option<HostNodeId> {
        self.state_node.and_then(StateNode::host)
    }

    pub fn instance(&self) -> Option<InstanceId> {
        self.state_node.and_then(StateNode::instance)
    }

    /// Whether this fiber has the given element type.
    pub fn is_type(&self, ty: &ElementType) -> bool {
        self.ty.as_ref() == Some(ty)
    }
}

// =============================================================================
// Tests
// =============================================================================
