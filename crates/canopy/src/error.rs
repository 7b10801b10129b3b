//! Error types for the tree view bridge.

use canopy_core::{DisposeErrors, RuntimeError};

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors surfaced by [`ViewController`](crate::ViewController).
///
/// Unknown views, failed child fetches and stale responses are not errors;
/// they degrade to no-ops and are only logged.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A command or menu registry rejected a per-view registration.
    #[error("Registration for view '{view_id}' rejected: {source}")]
    Registry {
        view_id: String,
        #[source]
        source: RegistryError,
    },

    /// One or more resources failed to release during teardown.
    #[error("Teardown incomplete: {0}")]
    Dispose(#[from] DisposeErrors),

    /// No async runtime available for remote notifications.
    #[error("Async runtime unavailable: {0}")]
    Runtime(#[from] RuntimeError),
}

impl BridgeError {
    /// Create a registry error for a view.
    pub fn registry(view_id: impl Into<String>, source: RegistryError) -> Self {
        Self::Registry {
            view_id: view_id.into(),
            source,
        }
    }
}

/// Failures of a downstream call into the extension process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyError {
    /// The transport failed to deliver the call or its reply.
    #[error("Transport error: {0}")]
    Transport(String),
    /// The extension handled the call and reported an error.
    #[error("Extension error: {0}")]
    Remote(String),
    /// The extension process is gone.
    #[error("Extension process disconnected")]
    Disconnected,
}

/// Rejections from the command and menu registries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Something with this id is already registered.
    #[error("'{id}' is already registered")]
    Duplicate { id: String },
    /// The registry refused the entry for another reason.
    #[error("{0}")]
    Rejected(String),
}

impl RegistryError {
    /// Create a duplicate-id error.
    pub fn duplicate(id: impl Into<String>) -> Self {
        Self::Duplicate { id: id.into() }
    }
}
