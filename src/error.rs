//! Error types.
//!
//! The reconciler defines two conditions of its own (detached updates and
//! render failures) and wraps everything its collaborators can report.
//! Any error raised while a cycle is under construction aborts that cycle
//! only; the previously committed tree stays in place.

use thiserror::Error;

use crate::engine::FiberId;
use crate::types::{ComponentId, HostNodeId, InstanceId};

/// Failure reported by a component's render capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RenderError {
    pub message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors from host renderer operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("unknown host node {0}")]
    UnknownNode(HostNodeId),

    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: HostNodeId, child: HostNodeId },
}

/// Errors surfaced by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// A state update targeted an instance that is no longer mounted under a
    /// live root. The update was dropped.
    #[error("state update for {0} dropped: instance is not mounted")]
    DetachedInstanceUpdate(InstanceId),

    /// A component's render capability failed; the cycle was aborted.
    #[error("render of {component} failed: {source}")]
    Render {
        component: String,
        #[source]
        source: RenderError,
    },

    #[error("unknown component definition {0}")]
    UnknownComponent(ComponentId),

    #[error("unknown component instance {0}")]
    UnknownInstance(InstanceId),

    /// A fiber handle no longer resolves. Indicates a broken tree link.
    #[error("stale fiber handle {0:?}")]
    StaleFiber(FiberId),

    #[error("host renderer error: {0}")]
    Host(#[from] HostError),

    /// The configured slice can never exceed the work threshold.
    #[error("slice of {slice_ms}ms cannot exceed the {enough_ms}ms work threshold")]
    SliceTooShort { slice_ms: u128, enough_ms: u128 },
}
