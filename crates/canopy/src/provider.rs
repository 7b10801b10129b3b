//! Tree data provider.
//!
//! A [`TreeViewDataProvider`] owns the local mirror of one view: the node
//! arena, the `treeItemId` index, and the root. Children are fetched lazily
//! through the [`ExtHostTreeView`] proxy and committed only if the request is
//! still current when the reply arrives.
//!
//! # Stale replies
//!
//! The proxy call is awaited without holding the state lock, so replies can
//! race with refresh, newer requests for the same parent, and teardown. Each
//! request captures the provider generation and stamps the parent with a
//! ticket; a reply is dropped unless the provider was not disposed since, the
//! parent still exists, and the parent's ticket is still the captured one.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use canopy_core::logging::targets;
use canopy_core::{AsyncRuntime, Signal};
use futures_util::future::join_all;
use parking_lot::Mutex;
use slotmap::SlotMap;

use crate::factory::NodeFactory;
use crate::node::{self, NodeKey, NodeKind, TreeNode};
use crate::protocol::{RevealOptions, TreeItemDescriptor};
use crate::proxy::ExtHostTreeView;

/// Payload of the reveal stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealRequest {
    pub tree_item_id: String,
    pub options: RevealOptions,
}

impl RevealRequest {
    /// Create a reveal request.
    pub fn new(tree_item_id: impl Into<String>, options: RevealOptions) -> Self {
        Self {
            tree_item_id: tree_item_id.into(),
            options,
        }
    }
}

#[derive(Default)]
struct ProviderState {
    nodes: SlotMap<NodeKey, TreeNode>,
    /// Non-root nodes by extension id. The root is tracked separately.
    index: HashMap<String, NodeKey>,
    root: Option<NodeKey>,
    next_ticket: u64,
    generation: u64,
    disposed: bool,
}

impl ProviderState {
    /// Remove `key` and its descendants from the arena and the index.
    ///
    /// An index entry is only removed if it still points at the released
    /// node, so a newer node with the same id keeps its entry.
    fn release_subtree(&mut self, key: NodeKey) -> usize {
        let mut stack = vec![key];
        let mut released = 0;
        while let Some(key) = stack.pop() {
            let Some(node) = self.nodes.remove(key) else {
                continue;
            };
            if self.index.get(&node.tree_item_id) == Some(&key) {
                self.index.remove(&node.tree_item_id);
            }
            if let Some(children) = node.children {
                stack.extend(children);
            }
            released += 1;
        }
        released
    }
}

/// Owns the mirrored tree of one view.
pub struct TreeViewDataProvider {
    tree_view_id: String,
    proxy: Arc<dyn ExtHostTreeView>,
    factory: NodeFactory,
    runtime: AsyncRuntime,
    state: Mutex<ProviderState>,
    /// Emitted by [`refresh`](Self::refresh). `None` means the whole tree.
    pub tree_data_changed: Signal<Option<TreeItemDescriptor>>,
    /// Emitted by [`reveal`](Self::reveal).
    pub reveal_requested: Signal<RevealRequest>,
}

impl TreeViewDataProvider {
    /// Create a provider for `tree_view_id`.
    pub fn new(
        tree_view_id: impl Into<String>,
        proxy: Arc<dyn ExtHostTreeView>,
        factory: NodeFactory,
        runtime: AsyncRuntime,
    ) -> Self {
        Self {
            tree_view_id: tree_view_id.into(),
            proxy,
            factory,
            runtime,
            state: Mutex::new(ProviderState::default()),
            tree_data_changed: Signal::new(),
            reveal_requested: Signal::new(),
        }
    }

    pub fn tree_view_id(&self) -> &str {
        &self.tree_view_id
    }

    /// Resolve the children of `parent`.
    ///
    /// With `None`, creates a fresh root, releases the previous root's
    /// subtree, and returns the new root alone. With the root, asks the
    /// extension for the top-level items; with a composite, for that item's
    /// children. Leaves are never queried.
    ///
    /// A failed or empty reply yields no children. A reply that went stale
    /// while in flight is discarded and yields an empty result.
    #[tracing::instrument(
        skip_all,
        target = "canopy::provider",
        level = "trace",
        fields(view_id = %self.tree_view_id)
    )]
    pub async fn resolve_children(&self, parent: Option<NodeKey>) -> Vec<NodeKey> {
        let Some(parent) = parent else {
            return self.create_root().into_iter().collect();
        };

        let (ticket, generation, request_id, parent_item_id) = {
            let mut state = self.state.lock();
            if state.disposed {
                tracing::debug!(target: targets::PROVIDER, "resolve on disposed provider ignored");
                return Vec::new();
            }
            let ticket = state.next_ticket;
            let generation = state.generation;
            let Some(node) = state.nodes.get_mut(parent) else {
                tracing::debug!(target: targets::PROVIDER, "resolve for released node ignored");
                return Vec::new();
            };
            if node.is_leaf() {
                return Vec::new();
            }
            node.pending = Some(ticket);
            let request_id = (!node.is_root()).then(|| node.tree_item_id.clone());
            let parent_item_id = node.tree_item_id.clone();
            state.next_ticket += 1;
            (ticket, generation, request_id, parent_item_id)
        };

        let descriptors = match self
            .proxy
            .get_children(&self.tree_view_id, request_id.as_deref())
            .await
        {
            Ok(Some(descriptors)) => descriptors,
            Ok(None) => {
                tracing::debug!(
                    target: targets::PROVIDER,
                    parent = %parent_item_id,
                    "extension returned no children"
                );
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(
                    target: targets::PROVIDER,
                    parent = %parent_item_id,
                    error = %err,
                    "children request failed, treating as empty"
                );
                Vec::new()
            }
        };

        let built = join_all(
            descriptors
                .iter()
                .enumerate()
                .map(|(position, descriptor)| {
                    self.factory
                        .create_node(descriptor, parent, &parent_item_id, position)
                }),
        )
        .await;

        let mut state = self.state.lock();
        let current = !state.disposed
            && state.generation == generation
            && state
                .nodes
                .get(parent)
                .is_some_and(|node| node.pending == Some(ticket));
        if !current {
            tracing::debug!(
                target: targets::PROVIDER,
                parent = %parent_item_id,
                ticket,
                "discarding stale children reply"
            );
            return Vec::new();
        }

        // Replace, never merge, the previous children.
        let previous = state
            .nodes
            .get_mut(parent)
            .and_then(|node| node.children.take())
            .unwrap_or_default();
        for key in previous {
            state.release_subtree(key);
        }

        let mut keys = Vec::with_capacity(built.len());
        for node in built {
            let tree_item_id = node.tree_item_id.clone();
            let key = state.nodes.insert(node);
            if let Some(replaced) = state.index.insert(tree_item_id, key) {
                tracing::debug!(
                    target: targets::PROVIDER,
                    ?replaced,
                    "tree item id reused, index now points at the newest node"
                );
            }
            keys.push(key);
        }

        if let Some(node) = state.nodes.get_mut(parent) {
            node.children = Some(keys.clone());
            node.pending = None;
            node.stale = false;
        }

        tracing::trace!(
            target: targets::PROVIDER,
            parent = %parent_item_id,
            count = keys.len(),
            "children committed"
        );
        keys
    }

    fn create_root(&self) -> Option<NodeKey> {
        let mut state = self.state.lock();
        if state.disposed {
            return None;
        }
        if let Some(previous) = state.root.take() {
            state.release_subtree(previous);
        }
        let key = state.nodes.insert(TreeNode::root(self.tree_view_id.as_str()));
        state.root = Some(key);
        Some(key)
    }

    /// The current root, if one was resolved.
    pub fn root(&self) -> Option<NodeKey> {
        self.state.lock().root
    }

    /// The current root, creating one only if none exists.
    pub(crate) fn ensure_root(&self) -> Option<NodeKey> {
        let mut state = self.state.lock();
        if state.disposed {
            return None;
        }
        if let Some(root) = state.root {
            return Some(root);
        }
        let key = state.nodes.insert(TreeNode::root(self.tree_view_id.as_str()));
        state.root = Some(key);
        Some(key)
    }

    pub(crate) fn runtime(&self) -> &AsyncRuntime {
        &self.runtime
    }

    /// A snapshot of the node at `key`.
    pub fn node(&self, key: NodeKey) -> Option<TreeNode> {
        self.state.lock().nodes.get(key).cloned()
    }

    /// The resolved children of `key`, `None` if never resolved.
    pub fn children_of(&self, key: NodeKey) -> Option<Vec<NodeKey>> {
        self.state
            .lock()
            .nodes
            .get(key)
            .and_then(|node| node.children.clone())
    }

    /// Look up a materialized node by extension id.
    pub fn get_node_by_tree_item_id(&self, tree_item_id: &str) -> Option<TreeNode> {
        let state = self.state.lock();
        let key = state.index.get(tree_item_id)?;
        state.nodes.get(*key).cloned()
    }

    /// Look up the arena key of a materialized node by extension id.
    pub fn get_tree_node_id_by_tree_item_id(&self, tree_item_id: &str) -> Option<NodeKey> {
        self.state.lock().index.get(tree_item_id).copied()
    }

    /// See [`node::sort_comparator`].
    pub fn sort_comparator(&self, a: Option<&TreeNode>, b: Option<&TreeNode>) -> Ordering {
        node::sort_comparator(a, b)
    }

    /// Number of indexed nodes.
    pub fn index_len(&self) -> usize {
        self.state.lock().index.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Tell the extension the selection changed. Ids are sent as given.
    pub fn set_selection(&self, tree_item_ids: Vec<String>) {
        if self.is_disposed() {
            return;
        }
        tracing::trace!(
            target: targets::PROXY,
            view_id = %self.tree_view_id,
            ?tree_item_ids,
            "set_selection"
        );
        let call = self.proxy.set_selection(&self.tree_view_id, tree_item_ids);
        self.runtime.spawn_detached("set_selection", call);
    }

    /// Tell the extension an item was expanded or collapsed.
    pub fn set_expanded(&self, tree_item_id: &str, expanded: bool) {
        if self.is_disposed() {
            return;
        }
        tracing::trace!(
            target: targets::PROXY,
            view_id = %self.tree_view_id,
            tree_item_id,
            expanded,
            "set_expanded"
        );
        let call = self
            .proxy
            .set_expanded(&self.tree_view_id, tree_item_id, expanded);
        self.runtime.spawn_detached("set_expanded", call);
    }

    /// Tell the extension the view was shown or hidden.
    pub fn set_visible(&self, visible: bool) {
        if self.is_disposed() {
            return;
        }
        tracing::trace!(
            target: targets::PROXY,
            view_id = %self.tree_view_id,
            visible,
            "set_visible"
        );
        let call = self.proxy.set_visible(&self.tree_view_id, visible);
        self.runtime.spawn_detached("set_visible", call);
    }

    /// Publish a refresh on [`tree_data_changed`](Self::tree_data_changed).
    ///
    /// Nothing is re-fetched here; the model acts on the signal.
    pub fn refresh(&self, item: Option<TreeItemDescriptor>) {
        tracing::debug!(
            target: targets::PROVIDER,
            view_id = %self.tree_view_id,
            scoped = item.is_some(),
            "refresh requested"
        );
        self.tree_data_changed.emit(item);
    }

    /// Publish a reveal on [`reveal_requested`](Self::reveal_requested).
    pub fn reveal(&self, request: RevealRequest) {
        self.reveal_requested.emit(request);
    }

    /// Drop every node and clear the index.
    ///
    /// Replies still in flight are discarded when they arrive. The extension
    /// is not notified.
    pub fn dispose(&self) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.generation += 1;
        state.nodes.clear();
        state.index.clear();
        state.root = None;
        tracing::debug!(
            target: targets::PROVIDER,
            view_id = %self.tree_view_id,
            "provider disposed"
        );
    }

    /// Set the local expansion flag. Returns `true` if it changed.
    pub(crate) fn set_node_expanded(&self, key: NodeKey, expanded: bool) -> bool {
        let mut state = self.state.lock();
        match state.nodes.get_mut(key) {
            Some(node) if node.kind == NodeKind::Composite && node.expanded != expanded => {
                node.expanded = expanded;
                true
            }
            _ => false,
        }
    }

    /// Invalidate the cached children of `key`, or of its parent when `key`
    /// is a leaf. Returns `false` for released keys.
    ///
    /// A request already in flight for the invalidated node is orphaned, so
    /// its reply cannot commit data older than the refresh.
    pub(crate) fn mark_stale(&self, key: NodeKey) -> bool {
        let mut state = self.state.lock();
        let target = match state.nodes.get(key) {
            Some(node) if node.is_leaf() => node.parent,
            Some(_) => Some(key),
            None => None,
        };
        match target.and_then(|target| state.nodes.get_mut(target)) {
            Some(node) => {
                node.stale = true;
                node.pending = None;
                true
            }
            None => false,
        }
    }

    /// Ancestors of `key`, root first, excluding `key` itself.
    pub(crate) fn ancestors(&self, key: NodeKey) -> Vec<NodeKey> {
        let state = self.state.lock();
        let mut chain = Vec::new();
        let mut cursor = state.nodes.get(key).and_then(|node| node.parent);
        while let Some(parent) = cursor {
            chain.push(parent);
            cursor = state.nodes.get(parent).and_then(|node| node.parent);
        }
        chain.reverse();
        chain
    }

    /// Collapse every expanded composite. Returns the collapsed ids.
    pub(crate) fn collapse_all(&self) -> Vec<String> {
        let mut state = self.state.lock();
        state
            .nodes
            .values_mut()
            .filter(|node| node.kind == NodeKind::Composite && node.expanded)
            .map(|node| {
                node.expanded = false;
                node.tree_item_id.clone()
            })
            .collect()
    }
}

impl std::fmt::Debug for TreeViewDataProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TreeViewDataProvider")
            .field("tree_view_id", &self.tree_view_id)
            .field("nodes", &state.nodes.len())
            .field("generation", &state.generation)
            .field("disposed", &state.disposed)
            .finish_non_exhaustive()
    }
}
