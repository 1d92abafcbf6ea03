//! In-memory host tree.
//!
//! `MemoryHost` keeps host nodes in a flat `Vec` with explicit child lists
//! and records every mutation in an operation log. Tests assert against the
//! log (exact mutation sequences) and against snapshots (tree shape, props,
//! node identity).
//!
//! # Example
//!
//! ```ignore
//! let mut host = MemoryHost::new();
//! let container = host.create_container("root");
//! let mut reconciler = Reconciler::new(host, ComponentRegistry::new());
//! reconciler.render(tree, container);
//! reconciler.flush()?;
//! let snapshot = reconciler.host().snapshot(container);
//! ```

use std::fmt;

use crate::error::HostError;
use crate::types::{HostNodeId, PropMap, Props};

use super::diff::{apply_changes, diff_props, PropChange};
use super::HostRenderer;

// =============================================================================
// Operation Log
// =============================================================================

/// One recorded host mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
    Create { node: HostNodeId, tag: String },
    Append { parent: HostNodeId, child: HostNodeId },
    Remove { parent: HostNodeId, child: HostNodeId },
    SetProp { node: HostNodeId, change: PropChange },
    Discard { node: HostNodeId },
}

impl HostOp {
    /// Whether this op changes what an attached tree looks like.
    ///
    /// Creating or discarding a detached node does not.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, HostOp::Create { .. } | HostOp::Discard { .. })
    }
}

// =============================================================================
// Nodes
// =============================================================================

#[derive(Debug, Clone)]
struct MemoryNode {
    tag: String,
    attrs: PropMap,
    parent: Option<HostNodeId>,
    children: Vec<HostNodeId>,
}

/// Owned copy of a host subtree, for comparisons.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSnapshot {
    pub node: HostNodeId,
    pub tag: String,
    pub attrs: PropMap,
    pub children: Vec<HostSnapshot>,
}

impl HostSnapshot {
    /// Same tags, attributes and child order at every position.
    /// Node identities are ignored.
    pub fn same_shape(&self, other: &HostSnapshot) -> bool {
        self.tag == other.tag
            && self.attrs == other.attrs
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.same_shape(b))
    }

    /// Node handles of the subtree, pre-order.
    pub fn nodes(&self) -> Vec<HostNodeId> {
        let mut out = vec![self.node];
        for child in &self.children {
            out.extend(child.nodes());
        }
        out
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}<{}", "", self.tag, indent = depth * 2)?;
        for (key, value) in &self.attrs {
            write!(f, " {key}={value}")?;
        }
        writeln!(f, ">")?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for HostSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

// =============================================================================
// MemoryHost
// =============================================================================

/// Host renderer backed by plain memory.
#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: Vec<Option<MemoryNode>>,
    ops: Vec<HostOp>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node to render into. Not recorded in the op log.
    pub fn create_container(&mut self, tag: &str) -> HostNodeId {
        self.alloc(tag, PropMap::new())
    }

    fn alloc(&mut self, tag: &str, attrs: PropMap) -> HostNodeId {
        let id = HostNodeId(self.nodes.len() as u32);
        self.nodes.push(Some(MemoryNode {
            tag: tag.to_string(),
            attrs,
            parent: None,
            children: Vec::new(),
        }));
        id
    }

    fn node(&self, id: HostNodeId) -> Result<&MemoryNode, HostError> {
        self.nodes
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(HostError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: HostNodeId) -> Result<&mut MemoryNode, HostError> {
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(HostError::UnknownNode(id))
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Every mutation recorded so far, in order.
    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    /// Drain the op log.
    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn tag(&self, id: HostNodeId) -> Option<&str> {
        self.node(id).ok().map(|n| n.tag.as_str())
    }

    pub fn attrs(&self, id: HostNodeId) -> Option<&PropMap> {
        self.node(id).ok().map(|n| &n.attrs)
    }

    pub fn children(&self, id: HostNodeId) -> &[HostNodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: HostNodeId) -> Option<HostNodeId> {
        self.node(id).ok().and_then(|n| n.parent)
    }

    /// Whether the node still exists (not discarded).
    pub fn is_alive(&self, id: HostNodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Nodes not yet discarded, containers included.
    pub fn live_nodes(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Copy of the subtree under `id`, or `None` for unknown nodes.
    pub fn snapshot(&self, id: HostNodeId) -> Option<HostSnapshot> {
        let node = self.node(id).ok()?;
        Some(HostSnapshot {
            node: id,
            tag: node.tag.clone(),
            attrs: node.attrs.clone(),
            children: node
                .children
                .iter()
                .filter_map(|&child| self.snapshot(child))
                .collect(),
        })
    }
}

impl HostRenderer for MemoryHost {
    fn create_node(&mut self, tag: &str, props: &Props) -> Result<HostNodeId, HostError> {
        let id = self.alloc(tag, props.attrs().clone());
        self.ops.push(HostOp::Create {
            node: id,
            tag: tag.to_string(),
        });
        Ok(id)
    }

    fn append_child(&mut self, parent: HostNodeId, child: HostNodeId) -> Result<(), HostError> {
        self.node(parent)?;

        // Re-appending moves the node
        if let Some(old_parent) = self.node(child)?.parent {
            self.node_mut(old_parent)?.children.retain(|&c| c != child);
        }
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);

        self.ops.push(HostOp::Append { parent, child });
        Ok(())
    }

    fn remove_child(&mut self, parent: HostNodeId, child: HostNodeId) -> Result<(), HostError> {
        let node = self.node_mut(parent)?;
        let Some(position) = node.children.iter().position(|&c| c == child) else {
            return Err(HostError::NotAChild { parent, child });
        };
        node.children.remove(position);
        self.node_mut(child)?.parent = None;

        self.ops.push(HostOp::Remove { parent, child });
        Ok(())
    }

    fn apply_property_diff(
        &mut self,
        node: HostNodeId,
        prev: &Props,
        next: &Props,
    ) -> Result<(), HostError> {
        let changes = diff_props(prev.attrs(), next.attrs());
        apply_changes(&mut self.node_mut(node)?.attrs, &changes);
        self.ops.extend(
            changes
                .into_iter()
                .map(|change| HostOp::SetProp { node, change }),
        );
        Ok(())
    }

    fn discard_node(&mut self, node: HostNodeId) {
        let Some(removed) = self.nodes.get_mut(node.0 as usize).and_then(Option::take) else {
            return;
        };
        if let Some(parent) = removed.parent.and_then(|p| self.node_mut(p).ok()) {
            parent.children.retain(|&c| c != node);
        }
        self.ops.push(HostOp::Discard { node });

        let mut pending = removed.children;
        while let Some(child) = pending.pop() {
            if let Some(child_node) = self.nodes.get_mut(child.0 as usize).and_then(Option::take) {
                pending.extend(child_node.children);
                self.ops.push(HostOp::Discard { node: child });
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{prop_map, Value};

    fn setup() -> (MemoryHost, HostNodeId) {
        let mut host = MemoryHost::new();
        let root = host.create_container("root");
        (host, root)
    }

    #[test]
    fn test_create_and_append() {
        let (mut host, root) = setup();
        let div = host.create_node("div", &Props::default()).unwrap();
        let span = host.create_node("span", &Props::default()).unwrap();

        host.append_child(div, span).unwrap();
        host.append_child(root, div).unwrap();

        assert_eq!(host.children(root), &[div]);
        assert_eq!(host.children(div), &[span]);
        assert_eq!(host.parent(span), Some(div));
        assert_eq!(
            host.ops().last(),
            Some(&HostOp::Append { parent: root, child: div })
        );
    }

    #[test]
    fn test_remove_child() {
        let (mut host, root) = setup();
        let div = host.create_node("div", &Props::default()).unwrap();
        host.append_child(root, div).unwrap();

        host.remove_child(root, div).unwrap();
        assert!(host.children(root).is_empty());
        assert_eq!(host.parent(div), None);

        assert_eq!(
            host.remove_child(root, div),
            Err(HostError::NotAChild { parent: root, child: div })
        );
    }

    #[test]
    fn test_property_diff_logs_only_changes() {
        let (mut host, _) = setup();
        let prev = Props::from_attrs(prop_map([("text", Value::from("a")), ("id", Value::from(1))]));
        let next = Props::from_attrs(prop_map([("text", Value::from("b")), ("id", Value::from(1))]));
        let span = host.create_node("span", &prev).unwrap();
        host.take_ops();

        host.apply_property_diff(span, &prev, &next).unwrap();

        assert_eq!(host.attrs(span), Some(next.attrs()));
        assert_eq!(
            host.ops(),
            &[HostOp::SetProp {
                node: span,
                change: PropChange::Set {
                    key: "text".into(),
                    value: Value::from("b"),
                },
            }]
        );
    }

    #[test]
    fn test_snapshot_and_display() {
        let (mut host, root) = setup();
        let props = Props::from_attrs(prop_map([("text", Value::from("hi"))]));
        let span = host.create_node("span", &props).unwrap();
        host.append_child(root, span).unwrap();

        let snapshot = host.snapshot(root).unwrap();
        assert_eq!(snapshot.nodes(), vec![root, span]);
        assert_eq!(snapshot.to_string(), "<root>\n  <span text=\"hi\">\n");
    }

    #[test]
    fn test_discard_node() {
        let (mut host, _) = setup();
        let div = host.create_node("div", &Props::default()).unwrap();

        host.discard_node(div);
        assert!(!host.is_alive(div));
        assert_eq!(host.ops().last(), Some(&HostOp::Discard { node: div }));
        assert!(!HostOp::Discard { node: div }.is_mutation());
    }

    #[test]
    fn test_discard_releases_subtree() {
        let (mut host, root) = setup();
        let div = host.create_node("div", &Props::default()).unwrap();
        let span = host.create_node("span", &Props::default()).unwrap();
        host.append_child(div, span).unwrap();
        host.append_child(root, div).unwrap();
        host.remove_child(root, div).unwrap();

        host.discard_node(div);
        assert!(!host.is_alive(div));
        assert!(!host.is_alive(span));
        assert_eq!(host.live_nodes(), 1);
    }

    #[test]
    fn test_unknown_node() {
        let (mut host, root) = setup();
        assert_eq!(
            host.append_child(root, HostNodeId(99)),
            Err(HostError::UnknownNode(HostNodeId(99)))
        );
    }
}
