//! Logging facilities for Canopy.
//!
//! Canopy uses the `tracing` crate for instrumentation. The library never
//! installs a subscriber; hosts do that themselves:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("canopy=debug,canopy_core=info")
//!     .init();
//! ```
//!
//! Every log statement names one of the [`targets`] explicitly so that a
//! single subsystem can be filtered in or out.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core plumbing target.
    pub const CORE: &str = "canopy_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "canopy_core::signal";
    /// Disposable bookkeeping target.
    pub const DISPOSABLE: &str = "canopy_core::disposable";
    /// Async runtime target.
    pub const RUNTIME: &str = "canopy_core::runtime";
    /// View registration and teardown.
    pub const CONTROLLER: &str = "canopy::controller";
    /// Child resolution and the tree item index.
    pub const PROVIDER: &str = "canopy::provider";
    /// Expansion, selection and reveal handling.
    pub const MODEL: &str = "canopy::model";
    /// Downstream calls into the extension process.
    pub const PROXY: &str = "canopy::proxy";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "canopy::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}
