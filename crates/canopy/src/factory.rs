//! Translation of wire descriptors into local nodes.

use std::sync::Arc;

use crate::host::{IconKind, IconResolver};
use crate::node::{NodeKey, NodeKind, TreeNode};
use crate::protocol::{CollapsibleState, TreeItemDescriptor};

/// Builds [`TreeNode`]s from [`TreeItemDescriptor`]s.
///
/// Construction is total: every descriptor produces a node, and absent
/// optional fields map to defaults. The icon is resolved once per node.
#[derive(Clone)]
pub struct NodeFactory {
    icons: Arc<dyn IconResolver>,
    namespace: String,
}

impl NodeFactory {
    /// Create a factory resolving icons within `namespace`.
    pub fn new(icons: Arc<dyn IconResolver>, namespace: impl Into<String>) -> Self {
        Self {
            icons,
            namespace: namespace.into(),
        }
    }

    /// Build a node for `descriptor`, the `position`-th child of `parent`.
    ///
    /// `parent_item_id` is only used to derive an id when the descriptor
    /// carries none.
    pub async fn create_node(
        &self,
        descriptor: &TreeItemDescriptor,
        parent: NodeKey,
        parent_item_id: &str,
        position: usize,
    ) -> TreeNode {
        let icon = self.resolve_icon(descriptor).await;
        let (kind, expanded) = match descriptor.collapsible_state {
            CollapsibleState::None => (NodeKind::Leaf, false),
            CollapsibleState::Collapsed => (NodeKind::Composite, false),
            CollapsibleState::Expanded => (NodeKind::Composite, true),
        };
        let tree_item_id = match &descriptor.id {
            Some(id) => id.clone(),
            None => synthesize_item_id(parent_item_id, position, &descriptor.label),
        };

        TreeNode {
            kind,
            tree_item_id,
            label: descriptor.label.clone(),
            description: descriptor.description.clone(),
            icon,
            tooltip: descriptor.tooltip.clone(),
            command: descriptor.command.clone(),
            context_value: descriptor.context_value.clone().unwrap_or_default(),
            parent: Some(parent),
            expanded,
            children: None,
            pending: None,
            stale: false,
        }
    }

    async fn resolve_icon(&self, descriptor: &TreeItemDescriptor) -> String {
        match descriptor.icon_source() {
            Some(source) => {
                self.icons
                    .resolve(&self.namespace, &source, IconKind::Background)
                    .await
            }
            None => String::new(),
        }
    }
}

/// Stable id for an item the extension did not name.
///
/// Derived from the parent id, the position in the response and the label,
/// so reordering the response changes the id.
pub fn synthesize_item_id(parent_item_id: &str, position: usize, label: &str) -> String {
    format!("{parent_item_id}/{position}:{label}")
}
