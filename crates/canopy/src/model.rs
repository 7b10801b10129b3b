//! UI-facing tree view model.
//!
//! [`TreeViewModel`] is what a renderer reads: it resolves the root and
//! children lazily through its [`TreeViewDataProvider`], keeps expansion,
//! selection and focus, and acts on the provider's refresh and reveal
//! streams. User interaction is published on the model's signals; the
//! [`ViewController`](crate::ViewController) forwards those to the extension.

use std::sync::{Arc, Weak};

use canopy_core::logging::targets;
use canopy_core::{DisposableStore, Signal};
use parking_lot::Mutex;

use crate::node::{CompositeState, NodeKey, NodeKind};
use crate::protocol::{RevealOptions, TreeItemDescriptor, TreeViewOptions};
use crate::provider::{RevealRequest, TreeViewDataProvider};

/// An item was expanded or collapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionChange {
    pub tree_item_id: String,
    pub expanded: bool,
}

/// Model backing one rendered tree view.
pub struct TreeViewModel {
    provider: Arc<TreeViewDataProvider>,
    options: TreeViewOptions,
    selection: Mutex<Vec<String>>,
    focused: Mutex<Option<String>>,
    subscriptions: Mutex<DisposableStore>,
    /// Emitted with the new selection, in selection order.
    pub selection_changed: Signal<Vec<String>>,
    /// Emitted when an item's local expansion flag flips.
    pub expansion_changed: Signal<ExpansionChange>,
    /// Emitted after a refresh invalidated part of the tree.
    /// Carries the refreshed item id, `None` for the whole tree.
    pub tree_changed: Signal<Option<String>>,
}

impl TreeViewModel {
    /// Create a model over `provider` and subscribe to its streams.
    pub fn new(provider: Arc<TreeViewDataProvider>, options: TreeViewOptions) -> Arc<Self> {
        let model = Arc::new(Self {
            provider,
            options,
            selection: Mutex::new(Vec::new()),
            focused: Mutex::new(None),
            subscriptions: Mutex::new(DisposableStore::new()),
            selection_changed: Signal::new(),
            expansion_changed: Signal::new(),
            tree_changed: Signal::new(),
        });

        let weak = Arc::downgrade(&model);
        let refresh = model.provider.tree_data_changed.subscribe(move |item| {
            if let Some(model) = weak.upgrade() {
                model.on_tree_data_changed(item.as_ref());
            }
        });

        let weak = Arc::downgrade(&model);
        let reveal = model.provider.reveal_requested.subscribe(move |request| {
            Self::spawn_reveal(&weak, request.clone());
        });

        let mut subscriptions = model.subscriptions.lock();
        subscriptions.add(refresh);
        subscriptions.add(reveal);
        drop(subscriptions);

        model
    }

    pub fn provider(&self) -> &Arc<TreeViewDataProvider> {
        &self.provider
    }

    pub fn options(&self) -> &TreeViewOptions {
        &self.options
    }

    /// The root node, created on first access.
    pub fn root(&self) -> Option<NodeKey> {
        self.provider.ensure_root()
    }

    /// Children of `key` for rendering.
    ///
    /// An expanded node without children, or with stale children, is
    /// resolved first. A collapsed node returns its cached children, if any,
    /// without asking the extension.
    #[tracing::instrument(skip_all, target = "canopy::model", level = "trace")]
    pub async fn children(&self, key: NodeKey) -> Vec<NodeKey> {
        let Some(node) = self.provider.node(key) else {
            return Vec::new();
        };
        match node.composite_state() {
            None => return Vec::new(),
            Some(CompositeState::Collapsed) => {}
            Some(CompositeState::ChildrenPending | CompositeState::Expanded) => {
                if node.needs_children() {
                    self.provider.resolve_children(Some(key)).await;
                }
            }
        }
        self.provider.children_of(key).unwrap_or_default()
    }

    /// Children of the root, resolving the root first if needed.
    pub async fn root_children(&self) -> Vec<NodeKey> {
        match self.root() {
            Some(root) => self.children(root).await,
            None => Vec::new(),
        }
    }

    /// Expand the item `tree_item_id` and resolve its children if needed.
    ///
    /// Returns `false` for unknown ids and leaves.
    pub async fn expand(&self, tree_item_id: &str) -> bool {
        match self.provider.get_tree_node_id_by_tree_item_id(tree_item_id) {
            Some(key) => self.expand_key(key).await,
            None => false,
        }
    }

    async fn expand_key(&self, key: NodeKey) -> bool {
        let Some(node) = self.provider.node(key) else {
            return false;
        };
        match node.kind {
            NodeKind::Leaf => return false,
            NodeKind::Root => {}
            NodeKind::Composite => {
                if self.provider.set_node_expanded(key, true) {
                    self.expansion_changed.emit(ExpansionChange {
                        tree_item_id: node.tree_item_id.clone(),
                        expanded: true,
                    });
                }
            }
        }
        self.children(key).await;
        true
    }

    /// Collapse the item `tree_item_id`. Its children stay cached.
    ///
    /// Returns `false` for unknown ids and leaves.
    pub fn collapse(&self, tree_item_id: &str) -> bool {
        let Some(key) = self.provider.get_tree_node_id_by_tree_item_id(tree_item_id) else {
            return false;
        };
        let Some(node) = self.provider.node(key) else {
            return false;
        };
        if node.kind != NodeKind::Composite {
            return false;
        }
        if self.provider.set_node_expanded(key, false) {
            self.expansion_changed.emit(ExpansionChange {
                tree_item_id: tree_item_id.to_string(),
                expanded: false,
            });
        }
        true
    }

    /// Collapse every expanded composite node.
    pub fn collapse_all(&self) {
        let collapsed = self.provider.collapse_all();
        tracing::debug!(target: targets::MODEL, count = collapsed.len(), "collapse all");
        for tree_item_id in collapsed {
            self.expansion_changed.emit(ExpansionChange {
                tree_item_id,
                expanded: false,
            });
        }
    }

    /// Replace the selection.
    ///
    /// Without `can_select_many` only the first id is kept. Emits
    /// [`selection_changed`](Self::selection_changed) if the selection differs.
    pub fn set_selection(&self, mut tree_item_ids: Vec<String>) {
        if !self.options.can_select_many() {
            tree_item_ids.truncate(1);
        }
        {
            let mut selection = self.selection.lock();
            if *selection == tree_item_ids {
                return;
            }
            selection.clone_from(&tree_item_ids);
        }
        self.selection_changed.emit(tree_item_ids);
    }

    pub fn selection(&self) -> Vec<String> {
        self.selection.lock().clone()
    }

    /// The item holding keyboard focus.
    pub fn focused(&self) -> Option<String> {
        self.focused.lock().clone()
    }

    pub fn set_focused(&self, tree_item_id: Option<String>) {
        *self.focused.lock() = tree_item_id;
    }

    /// Invalidate the tree, or the subtree below `item`.
    ///
    /// An item that is not materialized falls back to the whole tree.
    /// Nothing is fetched until the next read.
    pub fn refresh(&self, item: Option<&TreeItemDescriptor>) {
        self.on_tree_data_changed(item);
    }

    fn on_tree_data_changed(&self, item: Option<&TreeItemDescriptor>) {
        let scoped = item
            .and_then(|item| item.id.as_deref())
            .and_then(|id| {
                let key = self.provider.get_tree_node_id_by_tree_item_id(id);
                if key.is_none() {
                    tracing::debug!(
                        target: targets::MODEL,
                        tree_item_id = id,
                        "refresh target not materialized, refreshing root"
                    );
                }
                key.map(|key| (key, id.to_string()))
            });

        let changed = match scoped {
            Some((key, id)) if self.provider.mark_stale(key) => Some(id),
            _ => {
                if let Some(root) = self.provider.root() {
                    self.provider.mark_stale(root);
                }
                None
            }
        };
        self.tree_changed.emit(changed);
    }

    /// Bring `tree_item_id` into view.
    ///
    /// Expands every collapsed ancestor, optionally selects and focuses the
    /// item, then expands up to `options.expand` levels below it. Returns
    /// `false` if the item is not materialized, or if expanding a stale
    /// ancestor re-resolved the chain without it.
    #[tracing::instrument(skip_all, target = "canopy::model", level = "trace")]
    pub async fn reveal(&self, tree_item_id: &str, options: RevealOptions) -> bool {
        let Some(key) = self.provider.get_tree_node_id_by_tree_item_id(tree_item_id) else {
            tracing::debug!(target: targets::MODEL, tree_item_id, "reveal target not materialized");
            return false;
        };

        // Expanding a stale node releases its subtree, so the chain is
        // walked by id and every key looked up again after each step.
        let chain: Vec<String> = self
            .provider
            .ancestors(key)
            .into_iter()
            .filter_map(|ancestor| self.provider.node(ancestor))
            .filter(|node| !node.is_root())
            .map(|node| node.tree_item_id)
            .collect();

        if let Some(root) = self.root() {
            self.expand_key(root).await;
        }
        for ancestor_id in &chain {
            let Some(ancestor) = self.provider.get_tree_node_id_by_tree_item_id(ancestor_id) else {
                tracing::debug!(
                    target: targets::MODEL,
                    tree_item_id,
                    ancestor = %ancestor_id,
                    "reveal ancestor gone after refresh"
                );
                return false;
            };
            self.expand_key(ancestor).await;
        }
        let Some(key) = self.provider.get_tree_node_id_by_tree_item_id(tree_item_id) else {
            tracing::debug!(
                target: targets::MODEL,
                tree_item_id,
                "reveal target gone after refresh"
            );
            return false;
        };

        if options.should_select() {
            self.set_selection(vec![tree_item_id.to_string()]);
        }
        if options.should_focus() {
            self.set_focused(Some(tree_item_id.to_string()));
        }

        let mut frontier = vec![key];
        for _ in 0..options.expand_depth() {
            let mut next = Vec::new();
            for key in frontier {
                if self.expand_key(key).await {
                    next.extend(self.provider.children_of(key).unwrap_or_default());
                }
            }
            frontier = next;
        }
        true
    }

    fn spawn_reveal(weak: &Weak<Self>, request: RevealRequest) {
        let Some(model) = weak.upgrade() else {
            return;
        };
        let runtime = model.provider.runtime().clone();
        let task = runtime.spawn(async move {
            model.reveal(&request.tree_item_id, request.options).await
        });
        tracing::trace!(target: targets::MODEL, task = task.id(), "reveal scheduled");
    }

    /// Drop the subscriptions to the provider's streams.
    pub fn dispose(&self) {
        if let Err(errors) = self.subscriptions.lock().dispose() {
            tracing::warn!(target: targets::MODEL, %errors, "model teardown incomplete");
        }
    }
}

impl std::fmt::Debug for TreeViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeViewModel")
            .field("tree_view_id", &self.provider.tree_view_id())
            .field("selection", &*self.selection.lock())
            .finish_non_exhaustive()
    }
}
