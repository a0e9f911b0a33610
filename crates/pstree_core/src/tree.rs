//! Materialized product tree.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Children keep
//! the order in which they were attached, which for a loaded structure is the
//! document order.

use pstree_math::{DVec3, Transform};

use crate::asset::AssetHandle;

/// Index of a node inside its [`ProductTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// What a node stands for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Plain grouping node
    Container,

    /// Placement of a referenced asset
    Reference,

    /// Stand-in for a subtree that could not be materialized
    Placeholder { reason: String },
}

/// One node of the product tree.
#[derive(Debug)]
pub struct TreeNode {
    pub name: String,

    /// Transform relative to the parent
    pub transform: Transform,

    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,

    /// Bound asset for reference nodes
    pub asset: Option<AssetHandle>,

    pub kind: NodeKind,

    /// Set once the node and all of its descendants are attached
    pub complete: bool,
}

impl TreeNode {
    /// A plain container.
    pub fn container(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            parent: None,
            children: Vec::new(),
            asset: None,
            kind: NodeKind::Container,
            complete: false,
        }
    }

    /// A node placing `asset`.
    pub fn reference(name: impl Into<String>, asset: AssetHandle) -> Self {
        Self {
            asset: Some(asset),
            kind: NodeKind::Reference,
            ..Self::container(name)
        }
    }

    /// A marked stand-in for a subtree that failed to load.
    pub fn placeholder(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Placeholder {
                reason: reason.into(),
            },
            ..Self::container(name)
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, NodeKind::Placeholder { .. })
    }

    /// `true` when this node places an instance (not the canonical asset).
    pub fn is_instance(&self) -> bool {
        self.asset.as_ref().is_some_and(AssetHandle::is_instance)
    }

    /// Triangles of the bound geometry, 0 when unbound or not loaded.
    pub fn triangle_count(&self) -> usize {
        self.asset
            .as_ref()
            .and_then(AssetHandle::geometry)
            .map_or(0, |geometry| geometry.triangle_count())
    }
}

/// Arena holding every node of a product structure.
#[derive(Debug, Default)]
pub struct ProductTree {
    nodes: Vec<TreeNode>,
}

impl ProductTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node without a parent.
    pub fn add_root(&mut self, node: TreeNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode {
            parent: None,
            ..node
        });
        id
    }

    /// Append `node` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this tree.
    pub fn attach(&mut self, parent: NodeId, node: TreeNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode {
            parent: Some(parent),
            ..node
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    pub fn set_transform(&mut self, id: NodeId, transform: Transform) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.transform = transform;
        }
    }

    pub fn mark_complete(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.complete = true;
        }
    }

    /// Children of `id` in attachment order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Names of the children of `id` in attachment order.
    pub fn child_names(&self, id: NodeId) -> Vec<&str> {
        self.children(id)
            .iter()
            .filter_map(|child| self.get(*child))
            .map(|node| node.name.as_str())
            .collect()
    }

    /// First node named `name` in depth-first order below and including `from`.
    pub fn find_by_name(&self, from: NodeId, name: &str) -> Option<NodeId> {
        self.iter_depth_first(from)
            .find(|(_, id)| self.nodes[id.0].name == name)
            .map(|(_, id)| id)
    }

    /// Depth-first, pre-order walk yielding `(depth, id)`; `from` has depth 0.
    pub fn iter_depth_first(&self, from: NodeId) -> impl Iterator<Item = (usize, NodeId)> + '_ {
        let mut stack = Vec::new();
        if from.0 < self.nodes.len() {
            stack.push((0, from));
        }
        std::iter::from_fn(move || {
            let (depth, id) = stack.pop()?;
            for child in self.nodes[id.0].children.iter().rev() {
                stack.push((depth + 1, *child));
            }
            Some((depth, id))
        })
    }

    /// Transform of `id` relative to the tree root, composing every ancestor.
    pub fn world_transform(&self, id: NodeId) -> Transform {
        let mut chain = Vec::new();
        let mut current = self.get(id);
        while let Some(node) = current {
            chain.push(node.transform);
            current = node.parent.and_then(|parent| self.get(parent));
        }
        chain
            .iter()
            .rev()
            .fold(Transform::IDENTITY, |world, local| world.mul(local))
    }

    /// World-space position of the origin of `id`.
    pub fn world_position(&self, id: NodeId) -> DVec3 {
        self.world_transform(id).translation
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes bound to an asset, canonical or instanced.
    pub fn reference_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.asset.is_some()).count()
    }

    /// Nodes bound to an instance of an asset placed earlier.
    pub fn instance_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_instance()).count()
    }

    pub fn placeholder_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_placeholder()).count()
    }

    /// Triangles over every placement, instances included.
    pub fn total_triangle_count(&self) -> usize {
        self.nodes.iter().map(TreeNode::triangle_count).sum()
    }
}
