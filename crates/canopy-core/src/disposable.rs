//! Disposable resources and scoped resource bags.
//!
//! A [`Disposable`] is anything that holds a registration which must be
//! released explicitly: a signal subscription, a registered command, a menu
//! entry, a host-side view. A [`DisposableStore`] collects them so a whole
//! lifetime (for example one registered view) can be released at once.
//!
//! Release runs in registration order and never short-circuits: every entry
//! is released even when an earlier one fails, and all failures are reported
//! together as [`DisposeErrors`].

use crate::error::{DisposeError, DisposeErrors};
use crate::logging::targets;

/// A resource that can be released.
///
/// Implementations must tolerate being disposed more than once; only the
/// first call has an effect.
pub trait Disposable: Send {
    /// Release the resource.
    fn dispose(&mut self) -> Result<(), DisposeError>;
}

impl Disposable for Box<dyn Disposable> {
    fn dispose(&mut self) -> Result<(), DisposeError> {
        (**self).dispose()
    }
}

type ReleaseFn = Box<dyn FnOnce() -> Result<(), DisposeError> + Send>;

/// A disposable backed by a one-shot callback.
struct CallbackDisposable {
    callback: Option<ReleaseFn>,
}

impl Disposable for CallbackDisposable {
    fn dispose(&mut self) -> Result<(), DisposeError> {
        match self.callback.take() {
            Some(callback) => callback(),
            None => Ok(()),
        }
    }
}

/// Wrap an infallible release callback as a [`Disposable`].
pub fn to_disposable<F>(callback: F) -> Box<dyn Disposable>
where
    F: FnOnce() + Send + 'static,
{
    try_to_disposable(move || {
        callback();
        Ok(())
    })
}

/// Wrap a fallible release callback as a [`Disposable`].
pub fn try_to_disposable<F>(callback: F) -> Box<dyn Disposable>
where
    F: FnOnce() -> Result<(), DisposeError> + Send + 'static,
{
    Box::new(CallbackDisposable {
        callback: Some(Box::new(callback)),
    })
}

/// An ordered bag of disposables released together.
///
/// Entries are released in the order they were added. Anything added after
/// the store was disposed is released immediately.
///
/// Dropping a store that was never disposed releases its entries; failures
/// are logged since `Drop` cannot report them.
#[derive(Default)]
pub struct DisposableStore {
    items: Vec<Box<dyn Disposable>>,
    disposed: bool,
}

impl DisposableStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a disposable to the store.
    pub fn add<D: Disposable + 'static>(&mut self, item: D) {
        self.add_boxed(Box::new(item));
    }

    /// Add an already boxed disposable to the store.
    pub fn add_boxed(&mut self, mut item: Box<dyn Disposable>) {
        if self.disposed {
            tracing::warn!(
                target: targets::DISPOSABLE,
                "adding to a disposed store, releasing immediately"
            );
            if let Err(err) = item.dispose() {
                tracing::warn!(target: targets::DISPOSABLE, error = %err, "late release failed");
            }
            return;
        }
        self.items.push(item);
    }

    /// Number of entries still held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns `true` once [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release every entry in registration order.
    ///
    /// All entries are released even if some fail. Calling this again is a
    /// no-op that returns `Ok(())`.
    pub fn dispose(&mut self) -> Result<(), DisposeErrors> {
        self.disposed = true;
        let mut errors = DisposeErrors::new();
        for mut item in self.items.drain(..) {
            if let Err(err) = item.dispose() {
                tracing::debug!(
                    target: targets::DISPOSABLE,
                    error = %err,
                    "release failed, continuing"
                );
                errors.push(err);
            }
        }
        errors.into_result()
    }
}

impl std::fmt::Debug for DisposableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposableStore")
            .field("len", &self.items.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl Drop for DisposableStore {
    fn drop(&mut self) {
        if self.items.is_empty() {
            return;
        }
        if let Err(errors) = self.dispose() {
            tracing::warn!(
                target: targets::DISPOSABLE,
                %errors,
                "store dropped with failing entries"
            );
        }
    }
}
