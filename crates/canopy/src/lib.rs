//! Canopy - keeps a tree view rendered by a UI host in sync with the data
//! an extension process owns.
//!
//! The extension owns the items; the UI host owns the rendering. In between,
//! this crate keeps a lazily populated local mirror of the remote tree and
//! routes user interaction back to the extension:
//!
//! - [`ViewController`] registers views and dispatches [`TreeViewRequest`]s
//! - [`TreeViewDataProvider`] fetches children and keeps the `treeItemId` index
//! - [`TreeViewModel`] is what a renderer reads and what user input drives
//! - [`ExtHostTreeView`] is the handle to the extension process
//!
//! # Example
//!
//! ```ignore
//! use canopy::{BridgeConfig, HostServices, TreeViewOptions, ViewController};
//!
//! let controller = ViewController::with_current_runtime(services, BridgeConfig::default())?;
//! controller.register_view("npm", TreeViewOptions::default())?;
//!
//! let model = controller.model("npm").unwrap();
//! for key in model.root_children().await {
//!     println!("{:?}", model.provider().node(key));
//! }
//! ```

pub mod config;
pub mod controller;
mod error;
pub mod factory;
pub mod host;
pub mod model;
pub mod node;
pub mod protocol;
pub mod provider;
pub mod proxy;

pub use config::BridgeConfig;
pub use controller::{HostServices, ViewController};
pub use error::{BridgeError, ProxyError, RegistryError, Result};
pub use factory::NodeFactory;
pub use host::{
    ActivationCallback, Command, CommandRegistry, IconKind, IconResolver, LayoutHost, MenuId,
    MenuItem, MenuRegistry, ViewComponent, ViewHandler,
};
pub use model::{ExpansionChange, TreeViewModel};
pub use node::{CompositeState, NodeKey, NodeKind, TreeNode, sort_comparator};
pub use protocol::{
    CollapsibleState, IconSource, MAX_REVEAL_EXPAND_DEPTH, RevealOptions, TreeItemCommand,
    TreeItemDescriptor, TreeViewOptions, TreeViewRequest,
};
pub use provider::{RevealRequest, TreeViewDataProvider};
pub use proxy::{ChildrenReply, ExtHostTreeView};

pub use canopy_core::{Disposable, DisposableStore, Signal, Subscription};
