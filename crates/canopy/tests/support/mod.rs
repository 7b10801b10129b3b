//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use canopy::{
    ActivationCallback, BridgeConfig, ChildrenReply, CollapsibleState, Command, CommandRegistry,
    ExtHostTreeView, HostServices, IconKind, IconResolver, IconSource, LayoutHost, MenuId,
    MenuItem, MenuRegistry, NodeFactory, ProxyError, RegistryError, TreeItemDescriptor,
    TreeViewDataProvider, ViewComponent, ViewController, ViewHandler,
};
use canopy_core::{AsyncRuntime, Disposable, DisposeError, Signal, to_disposable, try_to_disposable};
use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};

/// Install a test log writer once. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn leaf(id: &str, label: &str) -> TreeItemDescriptor {
    TreeItemDescriptor::new(id, label)
}

pub fn folder(id: &str, label: &str) -> TreeItemDescriptor {
    TreeItemDescriptor::new(id, label).with_collapsible_state(CollapsibleState::Collapsed)
}

pub fn open_folder(id: &str, label: &str) -> TreeItemDescriptor {
    TreeItemDescriptor::new(id, label).with_collapsible_state(CollapsibleState::Expanded)
}

/// A call received by [`MockExtHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetChildren {
        view_id: String,
        tree_item_id: Option<String>,
    },
    SetSelection {
        view_id: String,
        tree_item_ids: Vec<String>,
    },
    SetExpanded {
        view_id: String,
        tree_item_id: String,
        expanded: bool,
    },
    SetVisible {
        view_id: String,
        visible: bool,
    },
}

struct QueuedReply {
    reply: ChildrenReply,
    gate: Option<oneshot::Receiver<()>>,
}

/// Scripted extension process.
///
/// Children replies are keyed by parent id (`None` for top-level items).
/// Queued replies are used once, in order; after that the standing reply
/// set with [`set_children`](Self::set_children) applies, or an empty list.
#[derive(Default)]
pub struct MockExtHost {
    calls: Mutex<Vec<Call>>,
    standing: Mutex<HashMap<Option<String>, Vec<TreeItemDescriptor>>>,
    queued: Mutex<HashMap<Option<String>, VecDeque<QueuedReply>>>,
    /// Notified when a gated reply is handed out.
    pub started: Notify,
}

impl MockExtHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_children(&self, parent: Option<&str>, items: Vec<TreeItemDescriptor>) {
        self.standing.lock().insert(parent.map(str::to_string), items);
    }

    pub fn push_reply(&self, parent: Option<&str>, reply: ChildrenReply) {
        self.queue(parent, QueuedReply { reply, gate: None });
    }

    /// Queue a reply that is held back until the returned sender fires or drops.
    pub fn push_gated_reply(
        &self,
        parent: Option<&str>,
        reply: ChildrenReply,
    ) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.queue(parent, QueuedReply { reply, gate: Some(rx) });
        tx
    }

    fn queue(&self, parent: Option<&str>, reply: QueuedReply) {
        self.queued
            .lock()
            .entry(parent.map(str::to_string))
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Parents whose children were requested, in request order.
    pub fn children_requests(&self) -> Vec<Option<String>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::GetChildren { tree_item_id, .. } => Some(tree_item_id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn selections(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::SetSelection { tree_item_ids, .. } => Some(tree_item_ids.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn expansions(&self) -> Vec<(String, bool)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::SetExpanded {
                    tree_item_id,
                    expanded,
                    ..
                } => Some((tree_item_id.clone(), *expanded)),
                _ => None,
            })
            .collect()
    }

    pub fn visibility(&self) -> Vec<bool> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::SetVisible { visible, .. } => Some(*visible),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl ExtHostTreeView for MockExtHost {
    fn get_children(
        &self,
        view_id: &str,
        tree_item_id: Option<&str>,
    ) -> BoxFuture<'static, ChildrenReply> {
        let key = tree_item_id.map(str::to_string);
        self.record(Call::GetChildren {
            view_id: view_id.to_string(),
            tree_item_id: key.clone(),
        });

        let queued = self.queued.lock().get_mut(&key).and_then(VecDeque::pop_front);
        let (reply, gate) = match queued {
            Some(QueuedReply { reply, gate }) => (reply, gate),
            None => {
                let items = self.standing.lock().get(&key).cloned().unwrap_or_default();
                (Ok(Some(items)), None)
            }
        };
        if gate.is_some() {
            self.started.notify_one();
        }

        async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            reply
        }
        .boxed()
    }

    fn set_selection(
        &self,
        view_id: &str,
        tree_item_ids: Vec<String>,
    ) -> BoxFuture<'static, Result<(), ProxyError>> {
        self.record(Call::SetSelection {
            view_id: view_id.to_string(),
            tree_item_ids,
        });
        async { Ok(()) }.boxed()
    }

    fn set_expanded(
        &self,
        view_id: &str,
        tree_item_id: &str,
        expanded: bool,
    ) -> BoxFuture<'static, Result<(), ProxyError>> {
        self.record(Call::SetExpanded {
            view_id: view_id.to_string(),
            tree_item_id: tree_item_id.to_string(),
            expanded,
        });
        async { Ok(()) }.boxed()
    }

    fn set_visible(
        &self,
        view_id: &str,
        visible: bool,
    ) -> BoxFuture<'static, Result<(), ProxyError>> {
        self.record(Call::SetVisible {
            view_id: view_id.to_string(),
            visible,
        });
        async { Ok(()) }.boxed()
    }
}

/// Activation hooks for one view, fired by the test.
#[derive(Default)]
pub struct RecordingHandler {
    activated: Signal<()>,
    inactivated: Signal<()>,
    disposed_views: Mutex<Vec<String>>,
}

impl RecordingHandler {
    pub fn activate(&self) {
        self.activated.emit(());
    }

    pub fn deactivate(&self) {
        self.inactivated.emit(());
    }

    pub fn listener_count(&self) -> usize {
        self.activated.connection_count() + self.inactivated.connection_count()
    }

    pub fn disposed_views(&self) -> Vec<String> {
        self.disposed_views.lock().clone()
    }
}

impl ViewHandler for RecordingHandler {
    fn on_activate(&self, callback: ActivationCallback) -> Box<dyn Disposable> {
        Box::new(self.activated.subscribe(move |_| callback()))
    }

    fn on_inactivate(&self, callback: ActivationCallback) -> Box<dyn Disposable> {
        Box::new(self.inactivated.subscribe(move |_| callback()))
    }

    fn dispose_view(&self, view_id: &str) {
        self.disposed_views.lock().push(view_id.to_string());
    }
}

#[derive(Default)]
pub struct RecordingLayout {
    components: Mutex<Vec<ViewComponent>>,
    revealed: Mutex<Vec<String>>,
    handlers: Mutex<HashMap<String, Arc<RecordingHandler>>>,
}

impl RecordingLayout {
    /// Expose activation hooks for `view_id`.
    pub fn add_handler(&self, view_id: &str) -> Arc<RecordingHandler> {
        let handler = Arc::new(RecordingHandler::default());
        self.handlers.lock().insert(view_id.to_string(), handler.clone());
        handler
    }

    pub fn installed(&self) -> Vec<String> {
        self.components
            .lock()
            .iter()
            .map(|component| component.tree_view_id.clone())
            .collect()
    }

    pub fn revealed(&self) -> Vec<String> {
        self.revealed.lock().clone()
    }
}

impl LayoutHost for RecordingLayout {
    fn replace_view_component(&self, component: ViewComponent) {
        self.components.lock().push(component);
    }

    fn handler(&self, view_id: &str) -> Option<Arc<dyn ViewHandler>> {
        self.handlers
            .lock()
            .get(view_id)
            .map(|handler| handler.clone() as Arc<dyn ViewHandler>)
    }

    fn reveal_view(&self, view_id: &str) {
        self.revealed.lock().push(view_id.to_string());
    }
}

/// Command registry rejecting duplicate ids.
#[derive(Default)]
pub struct RecordingCommands {
    commands: Arc<Mutex<HashMap<String, Command>>>,
}

impl RecordingCommands {
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.commands.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Run a registered command. Returns `false` if it is not registered.
    pub fn execute(&self, id: &str) -> bool {
        let command = self.commands.lock().get(id).cloned();
        match command {
            Some(command) => {
                command.execute();
                true
            }
            None => false,
        }
    }
}

impl CommandRegistry for RecordingCommands {
    fn register_command(&self, command: Command) -> Result<Box<dyn Disposable>, RegistryError> {
        let id = command.id.clone();
        {
            let mut commands = self.commands.lock();
            if commands.contains_key(&id) {
                return Err(RegistryError::duplicate(id));
            }
            commands.insert(id.clone(), command);
        }
        let commands = self.commands.clone();
        Ok(to_disposable(move || {
            commands.lock().remove(&id);
        }))
    }
}

/// Menu registry that can be told to reject entries or fail their release.
#[derive(Default)]
pub struct RecordingMenus {
    items: Arc<Mutex<Vec<(MenuId, MenuItem)>>>,
    reject: AtomicBool,
    fail_release: AtomicBool,
}

impl RecordingMenus {
    pub fn items(&self) -> Vec<(MenuId, MenuItem)> {
        self.items.lock().clone()
    }

    pub fn reject_registrations(&self) {
        self.reject.store(true, Ordering::SeqCst);
    }

    pub fn fail_releases(&self) {
        self.fail_release.store(true, Ordering::SeqCst);
    }
}

impl MenuRegistry for RecordingMenus {
    fn register_menu_item(
        &self,
        menu: MenuId,
        item: MenuItem,
    ) -> Result<Box<dyn Disposable>, RegistryError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(RegistryError::Rejected(format!("menu {} is read-only", menu.as_str())));
        }
        let command_id = item.command_id.clone();
        self.items.lock().push((menu, item));

        let items = self.items.clone();
        let fail = self.fail_release.load(Ordering::SeqCst);
        Ok(try_to_disposable(move || {
            items.lock().retain(|(_, item)| item.command_id != command_id);
            if fail {
                return Err(DisposeError::new(command_id, "menu host went away"));
            }
            Ok(())
        }))
    }
}

/// Resolves every icon to `"<namespace>|<key or url>"`.
#[derive(Default)]
pub struct StaticIcons {
    resolved: Mutex<Vec<IconSource>>,
}

impl StaticIcons {
    pub fn resolved(&self) -> Vec<IconSource> {
        self.resolved.lock().clone()
    }
}

impl IconResolver for StaticIcons {
    fn resolve(
        &self,
        namespace: &str,
        source: &IconSource,
        _kind: IconKind,
    ) -> BoxFuture<'static, String> {
        self.resolved.lock().push(source.clone());
        let class = format!("{namespace}|{}", source.as_str());
        async move { class }.boxed()
    }
}

/// One set of collaborators.
pub struct Harness {
    pub ext: Arc<MockExtHost>,
    pub layout: Arc<RecordingLayout>,
    pub commands: Arc<RecordingCommands>,
    pub menus: Arc<RecordingMenus>,
    pub icons: Arc<StaticIcons>,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        Self {
            ext: MockExtHost::new(),
            layout: Arc::new(RecordingLayout::default()),
            commands: Arc::new(RecordingCommands::default()),
            menus: Arc::new(RecordingMenus::default()),
            icons: Arc::new(StaticIcons::default()),
        }
    }

    pub fn services(&self) -> HostServices {
        HostServices {
            proxy: self.ext.clone(),
            layout: self.layout.clone(),
            commands: self.commands.clone(),
            menus: self.menus.clone(),
            icons: self.icons.clone(),
        }
    }

    /// A controller on the current Tokio runtime.
    pub fn controller(&self) -> ViewController {
        self.controller_with(BridgeConfig::default())
    }

    pub fn controller_with(&self, config: BridgeConfig) -> ViewController {
        ViewController::with_current_runtime(self.services(), config)
            .expect("tests run inside a Tokio runtime")
    }

    /// A standalone provider for `view_id` on the current Tokio runtime.
    pub fn provider(&self, view_id: &str) -> Arc<TreeViewDataProvider> {
        let runtime = AsyncRuntime::current().expect("tests run inside a Tokio runtime");
        let factory = NodeFactory::new(self.icons.clone(), "test");
        Arc::new(TreeViewDataProvider::new(view_id, self.ext.clone(), factory, runtime))
    }
}
