//! Work Queue - FIFO of pending render and state-update requests.
//!
//! One request is consumed per reconciliation cycle. Requests are never
//! merged: two updates to the same instance run as two cycles, in
//! submission order.

use std::collections::VecDeque;

use crate::types::{Children, HostNodeId, InstanceId, State};

/// A request to reconcile.
#[derive(Debug, Clone)]
pub enum UpdateRequest {
    /// Mount or update the tree under a container.
    RootRender {
        container: HostNodeId,
        children: Children,
    },
    /// Re-render an instance with a shallow-merged state patch.
    StateUpdate { instance: InstanceId, patch: State },
}

/// Strict FIFO of [`UpdateRequest`]s.
#[derive(Debug, Default)]
pub struct UpdateQueue {
    requests: VecDeque<UpdateRequest>,
}

impl UpdateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: UpdateRequest) {
        self.requests.push_back(request);
    }

    pub fn pop(&mut self) -> Option<UpdateRequest> {
        self.requests.pop_front()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{prop_map, Value};

    #[test]
    fn test_fifo_without_merging() {
        let mut queue = UpdateQueue::new();
        let instance = InstanceId(1);
        queue.push(UpdateRequest::StateUpdate {
            instance,
            patch: prop_map([("n", Value::from(1))]),
        });
        queue.push(UpdateRequest::StateUpdate {
            instance,
            patch: prop_map([("n", Value::from(2))]),
        });
        assert_eq!(queue.len(), 2);

        let patches: Vec<_> = std::iter::from_fn(|| queue.pop())
            .map(|request| match request {
                UpdateRequest::StateUpdate { patch, .. } => patch["n"].clone(),
                UpdateRequest::RootRender { .. } => Value::Null,
            })
            .collect();
        assert_eq!(patches, vec![Value::Int(1), Value::Int(2)]);
        assert!(queue.is_empty());
    }
}
