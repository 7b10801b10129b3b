//! Core plumbing for Canopy.
//!
//! This crate provides the building blocks the tree-view bridge is assembled from:
//!
//! - **Signal/Slot System**: Typed, multi-subscriber event streams with a single producer
//! - **Disposables**: Scoped resource bags released in registration order
//! - **Async Runtime**: A Tokio handle wrapper for fire-and-forget remote calls
//! - **Logging**: Target names shared by every Canopy crate
//!
//! # Signal/Slot Example
//!
//! ```
//! use canopy_core::Signal;
//!
//! let selection_changed = Signal::<Vec<String>>::new();
//!
//! let conn_id = selection_changed.connect(|ids| {
//!     println!("Selected: {:?}", ids);
//! });
//!
//! selection_changed.emit(vec!["a".to_string()]);
//! selection_changed.disconnect(conn_id);
//! ```
//!
//! # Disposable Example
//!
//! ```
//! use canopy_core::{DisposableStore, Signal, to_disposable};
//!
//! let refreshed = Signal::<()>::new();
//! let mut store = DisposableStore::new();
//!
//! store.add(refreshed.subscribe(|_| println!("refreshed")));
//! store.add(to_disposable(|| println!("view closed")));
//!
//! // Releases the subscription, then runs the callback.
//! store.dispose().unwrap();
//! assert_eq!(refreshed.connection_count(), 0);
//! ```

pub mod disposable;
mod error;
pub mod logging;
pub mod runtime;
pub mod signal;

pub use disposable::{Disposable, DisposableStore, to_disposable, try_to_disposable};
pub use error::{DisposeError, DisposeErrors, RuntimeError};
pub use logging::PerfSpan;
pub use runtime::{AsyncRuntime, AsyncTaskHandle};
pub use signal::{ConnectionId, Signal, Subscription};
