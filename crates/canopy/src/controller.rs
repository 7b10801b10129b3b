//! View controller.
//!
//! The [`ViewController`] is the entry point for the extension's requests. It
//! keeps exactly one [`ViewRecord`] per registered view id; the record owns
//! the view's provider, model, and every registration made on its behalf.
//! Operations on unknown view ids are no-ops, since the extension and the
//! UI host observe a view's lifecycle asynchronously.

use std::collections::HashMap;
use std::sync::Arc;

use canopy_core::logging::targets;
use canopy_core::{AsyncRuntime, DisposableStore, DisposeErrors, PerfSpan, to_disposable};
use parking_lot::Mutex;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::factory::NodeFactory;
use crate::host::{
    Command, CommandRegistry, IconResolver, LayoutHost, MenuItem, MenuRegistry, ViewComponent,
};
use crate::model::TreeViewModel;
use crate::protocol::{RevealOptions, TreeItemDescriptor, TreeViewOptions, TreeViewRequest};
use crate::provider::TreeViewDataProvider;
use crate::proxy::ExtHostTreeView;

/// Collaborators the controller talks to.
#[derive(Clone)]
pub struct HostServices {
    /// Handle to the extension process.
    pub proxy: Arc<dyn ExtHostTreeView>,
    pub layout: Arc<dyn LayoutHost>,
    pub commands: Arc<dyn CommandRegistry>,
    pub menus: Arc<dyn MenuRegistry>,
    pub icons: Arc<dyn IconResolver>,
}

/// Everything owned on behalf of one registered view.
struct ViewRecord {
    provider: Arc<TreeViewDataProvider>,
    model: Arc<TreeViewModel>,
    /// Released in registration order on unregistration.
    disposables: DisposableStore,
}

/// Registers tree views and routes traffic between them and the extension.
pub struct ViewController {
    services: HostServices,
    runtime: AsyncRuntime,
    config: BridgeConfig,
    records: Mutex<HashMap<String, ViewRecord>>,
}

impl ViewController {
    /// Create a controller spawning notifications on `runtime`.
    pub fn new(services: HostServices, runtime: AsyncRuntime, config: BridgeConfig) -> Self {
        Self {
            services,
            runtime,
            config,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Create a controller on the Tokio runtime the caller runs on.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Runtime`] outside a Tokio runtime.
    pub fn with_current_runtime(services: HostServices, config: BridgeConfig) -> Result<Self> {
        let runtime = AsyncRuntime::current()?;
        Ok(Self::new(services, runtime, config))
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Register a view. Registering an id that is already registered does
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Registry`] if the command or menu registry
    /// rejects the view's collapse-all contribution. Everything registered
    /// up to that point is released again.
    #[tracing::instrument(skip(self, options), target = "canopy::controller", level = "debug")]
    pub fn register_view(&self, view_id: &str, options: TreeViewOptions) -> Result<()> {
        if self.records.lock().contains_key(view_id) {
            tracing::debug!(target: targets::CONTROLLER, view_id, "view already registered");
            return Ok(());
        }

        let factory = NodeFactory::new(
            self.services.icons.clone(),
            self.config.icon_namespace.as_str(),
        );
        let provider = Arc::new(TreeViewDataProvider::new(
            view_id,
            self.services.proxy.clone(),
            factory,
            self.runtime.clone(),
        ));
        let model = TreeViewModel::new(provider.clone(), options.clone());
        let mut disposables = DisposableStore::new();

        let registered =
            self.collect_registrations(view_id, &options, &provider, &model, &mut disposables);
        {
            let model = model.clone();
            let provider = provider.clone();
            disposables.add_boxed(to_disposable(move || {
                model.dispose();
                provider.dispose();
            }));
        }
        registered?;

        self.services.layout.replace_view_component(ViewComponent {
            tree_view_id: view_id.to_string(),
            model: model.clone(),
        });

        let mut records = self.records.lock();
        if records.contains_key(view_id) {
            drop(records);
            tracing::debug!(
                target: targets::CONTROLLER,
                view_id,
                "lost registration race, releasing duplicate"
            );
            disposables.dispose()?;
            return Ok(());
        }
        records.insert(
            view_id.to_string(),
            ViewRecord {
                provider,
                model,
                disposables,
            },
        );
        tracing::info!(target: targets::CONTROLLER, view_id, "view registered");
        Ok(())
    }

    fn collect_registrations(
        &self,
        view_id: &str,
        options: &TreeViewOptions,
        provider: &Arc<TreeViewDataProvider>,
        model: &Arc<TreeViewModel>,
        disposables: &mut DisposableStore,
    ) -> Result<()> {
        let command_id = self.config.collapse_all_command_id(view_id);
        let weak_model = Arc::downgrade(model);
        let command = Command::new(command_id.clone(), move || {
            if let Some(model) = weak_model.upgrade() {
                model.collapse_all();
            }
        });
        let token = self
            .services
            .commands
            .register_command(command)
            .map_err(|source| BridgeError::registry(view_id, source))?;
        disposables.add_boxed(token);

        if options.show_collapse_all() {
            let item = MenuItem {
                command_id,
                label: self.config.collapse_all_label.clone(),
                when: BridgeConfig::view_when_clause(view_id),
                group: self.config.collapse_all_group.clone(),
                order: self.config.collapse_all_order,
            };
            let token = self
                .services
                .menus
                .register_menu_item(BridgeConfig::COLLAPSE_ALL_MENU, item)
                .map_err(|source| BridgeError::registry(view_id, source))?;
            disposables.add_boxed(token);
        }

        let selection_provider = provider.clone();
        disposables.add(model.selection_changed.subscribe(move |ids| {
            selection_provider.set_selection(ids.clone());
        }));

        let expansion_provider = provider.clone();
        disposables.add(model.expansion_changed.subscribe(move |change| {
            expansion_provider.set_expanded(&change.tree_item_id, change.expanded);
        }));

        if let Some(handler) = self.services.layout.handler(view_id) {
            let shown = provider.clone();
            disposables.add_boxed(handler.on_activate(Box::new(move || shown.set_visible(true))));
            let hidden = provider.clone();
            disposables
                .add_boxed(handler.on_inactivate(Box::new(move || hidden.set_visible(false))));
            let view_id = view_id.to_string();
            disposables.add_boxed(to_disposable(move || handler.dispose_view(&view_id)));
        }

        Ok(())
    }

    /// Unregister a view and release everything registered for it.
    /// Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Dispose`] if some registrations failed to
    /// release. All of them were still attempted.
    #[tracing::instrument(skip(self), target = "canopy::controller", level = "debug")]
    pub fn unregister_view(&self, view_id: &str) -> Result<()> {
        let Some(mut record) = self.records.lock().remove(view_id) else {
            tracing::debug!(
                target: targets::CONTROLLER,
                view_id,
                "unregister for unknown view ignored"
            );
            return Ok(());
        };
        record.disposables.dispose()?;
        tracing::info!(target: targets::CONTROLLER, view_id, "view unregistered");
        Ok(())
    }

    /// Ask a view to refresh, optionally below one item. Unknown ids are
    /// ignored.
    pub fn refresh(&self, view_id: &str, item: Option<TreeItemDescriptor>) {
        match self.provider(view_id) {
            Some(provider) => provider.refresh(item),
            None => {
                tracing::debug!(
                    target: targets::CONTROLLER,
                    view_id,
                    "refresh for unknown view ignored"
                );
            }
        }
    }

    /// Show the view, then reveal `tree_item_id` in it.
    ///
    /// The view is shown even when it is not registered. Returns `true` if
    /// the item was revealed.
    pub async fn reveal(&self, view_id: &str, tree_item_id: &str, options: RevealOptions) -> bool {
        self.services.layout.reveal_view(view_id);
        match self.model(view_id) {
            Some(model) => model.reveal(tree_item_id, options).await,
            None => {
                tracing::debug!(
                    target: targets::CONTROLLER,
                    view_id,
                    "reveal for unknown view ignored"
                );
                false
            }
        }
    }

    /// Dispatch a request from the extension.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`register_view`](Self::register_view) and
    /// [`unregister_view`](Self::unregister_view).
    pub async fn handle_request(&self, request: TreeViewRequest) -> Result<()> {
        match request {
            TreeViewRequest::Register { view_id, options } => self.register_view(&view_id, options),
            TreeViewRequest::Unregister { view_id } => self.unregister_view(&view_id),
            TreeViewRequest::Refresh {
                view_id,
                items_to_refresh,
            } => {
                self.refresh(&view_id, items_to_refresh);
                Ok(())
            }
            TreeViewRequest::Reveal {
                view_id,
                tree_item_id,
                options,
            } => {
                self.reveal(&view_id, &tree_item_id, options).await;
                Ok(())
            }
        }
    }

    /// Unregister every view. Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Returns the release failures of all views together.
    pub fn dispose(&self) -> Result<()> {
        let _span = PerfSpan::new("controller_dispose");
        let records: Vec<(String, ViewRecord)> = self.records.lock().drain().collect();
        let mut errors = DisposeErrors::new();
        for (view_id, mut record) in records {
            if let Err(failed) = record.disposables.dispose() {
                tracing::warn!(
                    target: targets::CONTROLLER,
                    view_id = %view_id,
                    %failed,
                    "view teardown incomplete"
                );
                errors.extend(failed);
            }
        }
        errors.into_result().map_err(BridgeError::from)
    }

    /// Registered view ids, sorted.
    pub fn view_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_registered(&self, view_id: &str) -> bool {
        self.records.lock().contains_key(view_id)
    }

    /// The model of a registered view.
    pub fn model(&self, view_id: &str) -> Option<Arc<TreeViewModel>> {
        self.records.lock().get(view_id).map(|record| record.model.clone())
    }

    /// The provider of a registered view.
    pub fn provider(&self, view_id: &str) -> Option<Arc<TreeViewDataProvider>> {
        self.records
            .lock()
            .get(view_id)
            .map(|record| record.provider.clone())
    }
}

impl Drop for ViewController {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            tracing::warn!(
                target: targets::CONTROLLER,
                error = %err,
                "controller dropped with incomplete teardown"
            );
        }
    }
}

impl std::fmt::Debug for ViewController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewController")
            .field("views", &self.view_ids())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
