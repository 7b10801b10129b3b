//! Collaborators provided by the UI host.
//!
//! The controller never looks these up from process-wide state; the host
//! injects them when constructing a [`ViewController`](crate::ViewController).
//! Every registration hands back a [`Disposable`] token the controller keeps
//! in the view's resource bag.

use std::fmt;
use std::sync::Arc;

use canopy_core::Disposable;
use futures_util::future::BoxFuture;

use crate::error::RegistryError;
use crate::model::TreeViewModel;
use crate::protocol::IconSource;

/// What the layout host mounts into a view slot.
#[derive(Clone)]
pub struct ViewComponent {
    /// The view slot being filled.
    pub tree_view_id: String,
    /// Model the rendered tree reads from.
    pub model: Arc<TreeViewModel>,
}

impl fmt::Debug for ViewComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewComponent")
            .field("tree_view_id", &self.tree_view_id)
            .finish_non_exhaustive()
    }
}

/// Callback fired on a view activation change.
pub type ActivationCallback = Box<dyn Fn() + Send + Sync>;

/// Per-view hooks exposed by the layout host.
pub trait ViewHandler: Send + Sync {
    /// Run `callback` whenever the view is shown.
    fn on_activate(&self, callback: ActivationCallback) -> Box<dyn Disposable>;

    /// Run `callback` whenever the view is hidden.
    fn on_inactivate(&self, callback: ActivationCallback) -> Box<dyn Disposable>;

    /// Remove the view's component from the layout.
    fn dispose_view(&self, view_id: &str);
}

/// The layout/tab-bar host that paints views.
pub trait LayoutHost: Send + Sync {
    /// Mount `component` into the slot named by its view id.
    fn replace_view_component(&self, component: ViewComponent);

    /// Activation hooks for a view, if the host has any.
    fn handler(&self, view_id: &str) -> Option<Arc<dyn ViewHandler>>;

    /// Make the view visible (switch tab, expand container, ...).
    fn reveal_view(&self, view_id: &str);
}

/// A command entry for the command registry.
#[derive(Clone)]
pub struct Command {
    pub id: String,
    pub handler: Arc<dyn Fn() + Send + Sync>,
}

impl Command {
    /// Create a command.
    pub fn new<F>(id: impl Into<String>, handler: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }

    /// Run the handler.
    pub fn execute(&self) {
        (self.handler)();
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Registry of runnable commands.
pub trait CommandRegistry: Send + Sync {
    /// Register a command. Rejects ids that are already taken.
    fn register_command(&self, command: Command) -> Result<Box<dyn Disposable>, RegistryError>;
}

/// Menus the bridge contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuId {
    /// Actions in a view's title bar.
    ViewTitle,
    /// Context menu of a tree item.
    ViewItemContext,
}

impl MenuId {
    /// The host-side menu identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewTitle => "view/title",
            Self::ViewItemContext => "view/item/context",
        }
    }
}

/// One menu contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    /// Command run by the entry.
    pub command_id: String,
    pub label: String,
    /// Context-key expression controlling visibility.
    pub when: String,
    pub group: String,
    /// Position within the group; higher sorts later.
    pub order: u32,
}

/// Registry of menu contributions.
pub trait MenuRegistry: Send + Sync {
    /// Register a menu entry.
    fn register_menu_item(
        &self,
        menu: MenuId,
        item: MenuItem,
    ) -> Result<Box<dyn Disposable>, RegistryError>;
}

/// How a resolved icon is applied by the renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum IconKind {
    /// Drawn as a background image.
    #[default]
    Background,
    /// Used as a CSS-style mask tinted by the theme.
    Mask,
}

/// Turns an icon key or URL into an icon class.
pub trait IconResolver: Send + Sync {
    /// Resolve `source` within `namespace`. Returns an empty string when the
    /// icon cannot be resolved.
    fn resolve(
        &self,
        namespace: &str,
        source: &IconSource,
        kind: IconKind,
    ) -> BoxFuture<'static, String>;
}
