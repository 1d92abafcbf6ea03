//! Property diffing.
//!
//! Compares the previous props of a host node to the next props and yields
//! only the attributes that changed. Host renderers use this to touch as
//! little of the host node as possible during an Update.
//!
//! # Algorithm
//!
//! 1. For each attribute in the previous props that is absent from the next:
//!    emit `Remove`
//! 2. For each attribute in the next props:
//!    - If the previous props hold an equal value: skip
//!    - Otherwise: emit `Set`
//!
//! Both maps are ordered, so the change list is deterministic.

use crate::types::{PropMap, Value};

/// One attribute-level change.
#[derive(Debug, Clone, PartialEq)]
pub enum PropChange {
    Set { key: String, value: Value },
    Remove { key: String },
}

impl PropChange {
    pub fn key(&self) -> &str {
        match self {
            PropChange::Set { key, .. } | PropChange::Remove { key } => key,
        }
    }
}

/// Compute the attribute changes turning `prev` into `next`.
///
/// Removals come first, then sets, each in key order.
pub fn diff_props(prev: &PropMap, next: &PropMap) -> Vec<PropChange> {
    let mut changes = Vec::new();

    for key in prev.keys() {
        if !next.contains_key(key) {
            changes.push(PropChange::Remove { key: key.clone() });
        }
    }

    for (key, value) in next {
        if prev.get(key) != Some(value) {
            changes.push(PropChange::Set {
                key: key.clone(),
                value: value.clone(),
            });
        }
    }

    changes
}

/// Apply changes produced by [`diff_props`] to an attribute map.
pub fn apply_changes(attrs: &mut PropMap, changes: &[PropChange]) {
    for change in changes {
        match change {
            PropChange::Set { key, value } => {
                attrs.insert(key.clone(), value.clone());
            }
            PropChange::Remove { key } => {
                attrs.remove(key);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
