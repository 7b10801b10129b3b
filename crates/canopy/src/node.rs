//! Local mirror of remote tree items.
//!
//! Nodes live in an arena owned by the [`TreeViewDataProvider`](crate::TreeViewDataProvider)
//! and refer to each other through [`NodeKey`] handles. A parent link is a
//! plain key, never an owning edge, so there are no reference cycles.

use std::cmp::Ordering;

use slotmap::new_key_type;

use crate::protocol::TreeItemCommand;

new_key_type! {
    /// Handle to a node in a provider's arena.
    ///
    /// Keys of released nodes are never reused for a different live node
    /// lookup; resolving a stale key yields nothing.
    pub struct NodeKey;
}

/// Node variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Synthetic top of a view. Always expandable, never sent to the extension.
    Root,
    /// An item that may have children.
    Composite,
    /// An item that never has children.
    Leaf,
}

/// Expansion lifecycle of a composite node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeState {
    /// Not expanded. Any previously resolved children stay cached.
    Collapsed,
    /// Expanded, children requested but not delivered yet.
    ChildrenPending,
    /// Expanded with resolved children.
    Expanded,
}

/// One node in the local mirror.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub kind: NodeKind,
    /// Extension id of the item. For the root this is the view id.
    pub tree_item_id: String,
    pub label: String,
    pub description: Option<String>,
    /// Resolved icon class, empty when the renderer's default applies.
    pub icon: String,
    pub tooltip: Option<String>,
    pub command: Option<TreeItemCommand>,
    pub context_value: String,
    /// Back-reference to the parent, `None` for the root.
    pub parent: Option<NodeKey>,
    pub(crate) expanded: bool,
    pub(crate) children: Option<Vec<NodeKey>>,
    pub(crate) pending: Option<u64>,
    pub(crate) stale: bool,
}

impl TreeNode {
    /// Create the root node of a view.
    pub fn root(view_id: impl Into<String>) -> Self {
        let view_id = view_id.into();
        Self {
            kind: NodeKind::Root,
            label: view_id.clone(),
            tree_item_id: view_id,
            description: None,
            icon: String::new(),
            tooltip: None,
            command: None,
            context_value: String::new(),
            parent: None,
            expanded: true,
            children: None,
            pending: None,
            stale: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.kind == NodeKind::Root
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    /// Root and composite nodes can have children.
    pub fn is_expandable(&self) -> bool {
        self.kind != NodeKind::Leaf
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Children in extension order, `None` until first resolved.
    pub fn children(&self) -> Option<&[NodeKey]> {
        self.children.as_deref()
    }

    /// Returns `true` if a refresh invalidated the cached children.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Returns `true` if the next read must ask the extension for children.
    pub fn needs_children(&self) -> bool {
        self.is_expandable() && (self.children.is_none() || self.stale)
    }

    /// Lifecycle state for expandable nodes; `None` for leaves.
    pub fn composite_state(&self) -> Option<CompositeState> {
        if self.is_leaf() {
            return None;
        }
        Some(if !self.expanded {
            CompositeState::Collapsed
        } else if self.pending.is_some() || self.children.is_none() {
            CompositeState::ChildrenPending
        } else {
            CompositeState::Expanded
        })
    }
}

/// Ordering used by generic tree renderers.
///
/// Nodes are never reordered: any two present nodes compare equal, so a
/// stable sort keeps the extension's order. A missing node sorts after a
/// present one.
pub fn sort_comparator(a: Option<&TreeNode>, b: Option<&TreeNode>) -> Ordering {
    match (a, b) {
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
