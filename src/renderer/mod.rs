//! Host Renderer - The boundary to the host tree.
//!
//! The reconciler never touches host nodes itself. It asks a
//! [`HostRenderer`] to:
//! - create a node for a host fiber (begin phase, Placement)
//! - append/remove nodes (commit phase, Placement/Deletion)
//! - apply property differences (commit phase, Update)
//! - release detached nodes (committed Deletion, discarded cycle)
//!
//! [`MemoryHost`] is an in-memory host tree with an operation log, suitable
//! for tests, headless rendering and as a template for real hosts.

mod diff;
mod memory;

pub use diff::{apply_changes, diff_props, PropChange};
pub use memory::{HostOp, HostSnapshot, MemoryHost};

use crate::error::HostError;
use crate::types::{HostNodeId, Props};

/// Host-side operations the reconciler depends on.
pub trait HostRenderer {
    /// Create a detached host node for `tag` with initial `props`.
    fn create_node(&mut self, tag: &str, props: &Props) -> Result<HostNodeId, HostError>;

    /// Append `child` as the last child of `parent`.
    fn append_child(&mut self, parent: HostNodeId, child: HostNodeId) -> Result<(), HostError>;

    /// Detach `child` (and its host subtree) from `parent`.
    fn remove_child(&mut self, parent: HostNodeId, child: HostNodeId) -> Result<(), HostError>;

    /// Apply only the attribute differences between `prev` and `next`.
    fn apply_property_diff(
        &mut self,
        node: HostNodeId,
        prev: &Props,
        next: &Props,
    ) -> Result<(), HostError>;

    /// Release a detached node and its host subtree.
    ///
    /// Called for nodes removed by a committed Deletion and for nodes created
    /// by a cycle that never committed. Either way the node is no longer
    /// attached when this runs. Hosts without explicit node lifetimes can
    /// ignore this.
    fn discard_node(&mut self, _node: HostNodeId) {}
}
