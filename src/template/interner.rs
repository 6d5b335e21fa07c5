//! Flyweight store for template nodes
//!
//! Structurally identical nodes parsed from different templates share one
//! allocation. Nodes live in an append-only arena and are addressed by
//! [`NodeId`].

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::template::node::Node;

/// Index of an interned node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
struct NodeArena {
    nodes: Vec<Arc<Node>>,
    index: HashMap<Arc<Node>, NodeId>,
}

/// Thread-safe node interner
#[derive(Debug, Default)]
pub struct NodeInterner {
    arena: RwLock<NodeArena>,
}

impl NodeInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared handle for `node`, adding it if unseen
    pub fn intern(&self, node: Node) -> (NodeId, Arc<Node>) {
        {
            let arena = self.arena.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&id) = arena.index.get(&node) {
                return (id, Arc::clone(&arena.nodes[id.0]));
            }
        }

        let mut arena = self.arena.write().unwrap_or_else(PoisonError::into_inner);
        // another thread may have added it between the two locks
        if let Some(&id) = arena.index.get(&node) {
            return (id, Arc::clone(&arena.nodes[id.0]));
        }
        let id = NodeId(arena.nodes.len());
        let shared = Arc::new(node);
        tracing::trace!(id = id.0, node = %shared, "interned node");
        arena.nodes.push(Arc::clone(&shared));
        arena.index.insert(Arc::clone(&shared), id);
        (id, shared)
    }

    pub fn get(&self, id: NodeId) -> Option<Arc<Node>> {
        self.arena
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .nodes
            .get(id.0)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.arena
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .nodes
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatTemplate;

    #[test]
    fn test_identical_nodes_share_a_handle() {
        let interner = NodeInterner::new();
        let (a, first) = interner.intern(Node::text("x"));
        let (b, second) = interner.intern(Node::text("x"));
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_kind_is_part_of_identity() {
        let interner = NodeInterner::new();
        let (text, _) = interner.intern(Node::text("name"));
        let (constant, _) = interner.intern(Node::constant("name", FormatTemplate::new("name")));
        assert_ne!(text, constant);
        assert_eq!(
            interner.get(constant).as_deref().map(Node::kind),
            Some(crate::template::NodeKind::Constant)
        );
    }

    #[test]
    fn test_format_template_is_part_of_identity() {
        let interner = NodeInterner::new();
        let plain = Node::constant("x", FormatTemplate::new("x"));
        let padded = Node::constant("x", FormatTemplate::new("x").with_spec(Some(">4".to_string())));
        let (a, _) = interner.intern(plain);
        let (b, _) = interner.intern(padded);
        assert_ne!(a, b);
        assert_eq!(interner.get(NodeId(7)), None);
    }
}
