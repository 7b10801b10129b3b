//! Async runtime integration for Canopy.
//!
//! Remote calls into the extension process are asynchronous, but many of them
//! are triggered from synchronous signal slots (a selection change, an
//! activation hook). [`AsyncRuntime`] wraps a Tokio [`Handle`] so those slots
//! can issue the call immediately and hand the returned future to the runtime.
//!
//! # Example
//!
//! ```no_run
//! use canopy_core::AsyncRuntime;
//!
//! # async fn notify_extension() -> Result<(), std::io::Error> { Ok(()) }
//! # #[tokio::main] async fn main() {
//! let runtime = AsyncRuntime::current().unwrap();
//!
//! // Failures are logged, nobody waits for the result.
//! runtime.spawn_detached("notify", notify_extension());
//!
//! // Or keep a handle and wait for it.
//! let handle = runtime.spawn(async { 42 });
//! assert_eq!(handle.wait().await, Some(42));
//! # }
//! ```

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::error::RuntimeError;
use crate::logging::targets;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Receives the output of a future spawned with [`AsyncRuntime::spawn`].
#[derive(Debug)]
pub struct AsyncTaskHandle<T> {
    id: u64,
    receiver: oneshot::Receiver<T>,
}

impl<T> AsyncTaskHandle<T> {
    /// Process-wide unique id of the task.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the task to complete.
    ///
    /// Returns `None` if the task panicked or the runtime shut down first.
    pub async fn wait(self) -> Option<T> {
        self.receiver.await.ok()
    }
}

/// Spawn handle for background futures.
///
/// Cloning is cheap; all clones share the same runtime and task counter.
#[derive(Clone)]
pub struct AsyncRuntime {
    handle: Handle,
    active_tasks: Arc<AtomicU64>,
}

impl AsyncRuntime {
    /// Use the runtime the caller is currently running on.
    pub fn current() -> Result<Self, RuntimeError> {
        let handle = Handle::try_current().map_err(|_| RuntimeError::NoRuntime)?;
        Ok(Self::from_handle(handle))
    }

    /// Wrap an existing runtime handle.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            active_tasks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of spawned tasks that have not completed yet.
    pub fn active_tasks(&self) -> u64 {
        self.active_tasks.load(Ordering::SeqCst)
    }

    /// Spawn a future and return a handle to its result.
    pub fn spawn<F, T>(&self, future: F) -> AsyncTaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let active = self.active_tasks.clone();
        active.fetch_add(1, Ordering::SeqCst);

        self.handle.spawn(async move {
            let output = future.await;
            active.fetch_sub(1, Ordering::SeqCst);
            let _ = tx.send(output);
        });

        AsyncTaskHandle { id, receiver: rx }
    }

    /// Spawn a fallible future nobody waits on; an error is logged.
    pub fn spawn_detached<F, E>(&self, label: &'static str, future: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let active = self.active_tasks.clone();
        active.fetch_add(1, Ordering::SeqCst);

        self.handle.spawn(async move {
            if let Err(err) = future.await {
                tracing::warn!(
                    target: targets::RUNTIME,
                    task = label,
                    error = %err,
                    "detached task failed"
                );
            }
            active.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

impl std::fmt::Debug for AsyncRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncRuntime")
            .field("active_tasks", &self.active_tasks())
            .finish()
    }
}
