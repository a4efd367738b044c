//! Ordered multi-way tree of items
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Parent links are
//! plain handles used for lookups; ownership flows strictly from the arena.
//! Removed slots are left empty so outstanding handles never alias a
//! different node. Slots are never reclaimed: the arena grows by one per
//! insert for the lifetime of the model, which is bounded by one editing
//! session.

use std::fmt;

use crate::error::{ModestError, Result};
use crate::models::Item;

/// Stable handle to a node of a [`TreeModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena slot of the node
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One slot of the arena: the item plus its links
#[derive(Debug, Clone)]
pub struct TreeNode {
    item: Item,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl TreeNode {
    /// Item held by the node
    pub fn item(&self) -> &Item {
        &self.item
    }

    /// Parent handle; `None` only for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child handles in sibling order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// The project tree, always rooted at a single root item
#[derive(Debug, Clone)]
pub struct TreeModel {
    nodes: Vec<Option<TreeNode>>,
    root: NodeId,
    live: usize,
}

impl TreeModel {
    /// Creates a model holding only the given root item
    pub fn new(root_item: Item) -> Self {
        Self {
            nodes: vec![Some(TreeNode {
                item: root_item,
                parent: None,
                children: Vec::new(),
            })],
            root: NodeId(0),
            live: 1,
        }
    }

    /// Handle of the root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node at `id`, or `None` once it has been removed
    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut TreeNode> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(ModestError::UnknownNode(id.0))
    }

    fn require(&self, id: NodeId) -> Result<&TreeNode> {
        self.node(id).ok_or(ModestError::UnknownNode(id.0))
    }

    /// Whether `id` still refers to a node of this model
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Item at `id`
    pub fn item(&self, id: NodeId) -> Option<&Item> {
        self.node(id).map(TreeNode::item)
    }

    /// Mutable item at `id`, for renames and field edits
    pub fn item_mut(&mut self, id: NodeId) -> Option<&mut Item> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .map(|n| &mut n.item)
    }

    /// Parent of `id`; `None` for the root and removed nodes
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(TreeNode::parent)
    }

    /// Children of `id` in sibling order; empty for removed nodes
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(TreeNode::children).unwrap_or(&[])
    }

    /// Number of direct children of `id`
    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    /// Child `index` of `id`
    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    /// Position of `child` among the children of `parent`
    pub fn index_of_child(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|c| *c == child)
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.live
    }

    /// Always false: a model has at least its root
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Inserts `item` as child `index` of `parent`; indexes past the end append
    pub fn insert(&mut self, parent: NodeId, index: usize, item: Item) -> Result<NodeId> {
        self.require(parent)?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(TreeNode {
            item,
            parent: Some(parent),
            children: Vec::new(),
        }));
        self.live += 1;

        let siblings = &mut self.node_mut(parent)?.children;
        let index = index.min(siblings.len());
        siblings.insert(index, id);
        Ok(id)
    }

    /// Appends `item` as the last child of `parent`
    pub fn append(&mut self, parent: NodeId, item: Item) -> Result<NodeId> {
        let count = self.child_count(parent);
        self.insert(parent, count, item)
    }

    /// Detaches `id` and drops its whole subtree
    ///
    /// Returns the number of nodes removed. Removing the root is a no-op.
    /// The freed slots stay empty; handles to removed nodes keep failing
    /// with [`ModestError::UnknownNode`].
    pub fn remove(&mut self, id: NodeId) -> Result<usize> {
        let Some(parent) = self.require(id)?.parent else {
            return Ok(0);
        };

        self.node_mut(parent)?.children.retain(|c| *c != id);

        let doomed = self.descendants(id);
        for node in &doomed {
            self.nodes[node.0] = None;
        }
        self.live -= doomed.len();
        Ok(doomed.len())
    }

    /// Moves `id` to position `index` under `new_parent`
    pub fn move_node(&mut self, id: NodeId, new_parent: NodeId, index: usize) -> Result<()> {
        self.require(new_parent)?;
        let invalid = ModestError::InvalidMove {
            node: id.0,
            target: new_parent.0,
        };
        let Some(old_parent) = self.require(id)?.parent else {
            return Err(invalid);
        };
        if self.path_to(new_parent).contains(&id) {
            return Err(invalid);
        }

        self.node_mut(old_parent)?.children.retain(|c| *c != id);
        let siblings = &mut self.node_mut(new_parent)?.children;
        let index = index.min(siblings.len());
        siblings.insert(index, id);
        self.node_mut(id)?.parent = Some(new_parent);
        Ok(())
    }

    /// Pre-order list of `id` and everything below it
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.iter_from(id).collect()
    }

    /// Number of nodes in the subtree rooted at `id`
    pub fn subtree_size(&self, id: NodeId) -> usize {
        self.iter_from(id).count()
    }

    /// Depth-first pre-order walk of the whole tree
    pub fn iter(&self) -> PreOrder<'_> {
        self.iter_from(self.root)
    }

    /// Pre-order walk of the subtree rooted at `id`
    pub fn iter_from(&self, id: NodeId) -> PreOrder<'_> {
        let stack = if self.contains(id) { vec![id] } else { Vec::new() };
        PreOrder { model: self, stack }
    }

    /// Chain of handles from the root down to `id`, both included
    pub fn path_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = self.node(id).map(|_| id);
        while let Some(node) = current {
            path.push(node);
            current = self.parent(node);
        }
        path.reverse();
        path
    }

    /// Number of edges between the root and `id`
    pub fn depth(&self, id: NodeId) -> usize {
        self.path_to(id).len().saturating_sub(1)
    }

    /// Node holding the item with this id
    pub fn find_by_item_id(&self, item_id: &str) -> Option<NodeId> {
        self.iter()
            .find(|n| self.item(*n).is_some_and(|item| item.id() == item_id))
    }

    /// Whether any node holds an item with this id
    pub fn contains_item_id(&self, item_id: &str) -> bool {
        self.find_by_item_id(item_id).is_some()
    }
}

/// Pre-order iterator over node handles
pub struct PreOrder<'a> {
    model: &'a TreeModel,
    stack: Vec<NodeId>,
}

impl Iterator for PreOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.model.children(id).iter().rev().copied());
        Some(id)
    }
}
