//! Handle to the extension process.
//!
//! [`ExtHostTreeView`] is the typed surface of the remote side. Every call is
//! asynchronous and returns a boxed future so the trait stays object safe;
//! the transport that carries the calls lives behind the implementation.

use futures_util::future::BoxFuture;

use crate::error::ProxyError;
use crate::protocol::TreeItemDescriptor;

/// Reply to a children request. `Ok(None)` means the extension returned nothing.
pub type ChildrenReply = Result<Option<Vec<TreeItemDescriptor>>, ProxyError>;

/// Calls the UI host makes into the extension process.
///
/// Implementations must perform any synchronous bookkeeping (such as
/// enqueueing the message on the transport) when the method is called, not
/// when the returned future is first polled; notifications are issued from
/// synchronous contexts and their futures are driven in the background.
pub trait ExtHostTreeView: Send + Sync {
    /// Children of `tree_item_id`, or the top-level items when `None`.
    fn get_children(
        &self,
        view_id: &str,
        tree_item_id: Option<&str>,
    ) -> BoxFuture<'static, ChildrenReply>;

    /// The selection in the UI changed.
    fn set_selection(
        &self,
        view_id: &str,
        tree_item_ids: Vec<String>,
    ) -> BoxFuture<'static, Result<(), ProxyError>>;

    /// An item was expanded or collapsed in the UI.
    fn set_expanded(
        &self,
        view_id: &str,
        tree_item_id: &str,
        expanded: bool,
    ) -> BoxFuture<'static, Result<(), ProxyError>>;

    /// The view became visible or hidden.
    fn set_visible(
        &self,
        view_id: &str,
        visible: bool,
    ) -> BoxFuture<'static, Result<(), ProxyError>>;
}
