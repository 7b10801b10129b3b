//! Signal/slot system for Canopy.
//!
//! A [`Signal`] is a typed event stream with a single producer (the owner that
//! calls [`Signal::emit`]) and any number of subscribers. Change, reveal,
//! selection and expansion notifications are all modelled as signals.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - The event stream
//! - [`ConnectionId`] - Identifier returned by [`Signal::connect`]
//! - [`Subscription`] - RAII handle that disconnects when dropped or disposed
//!
//! # Cancellation
//!
//! Subscribers cancel by unsubscribing. Tearing down one subscriber never
//! affects other subscribers of the same signal, and a [`Subscription`] that
//! outlives its signal is harmless: releasing it becomes a no-op.
//!
//! # Example
//!
//! ```
//! use canopy_core::Signal;
//!
//! let expanded = Signal::<(String, bool)>::new();
//!
//! let id = expanded.connect(|(item, open)| {
//!     println!("{item} is now {}", if *open { "open" } else { "closed" });
//! });
//!
//! expanded.emit(("src".to_string(), true));
//! expanded.disconnect(id);
//! ```

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::disposable::Disposable;
use crate::error::DisposeError;
use crate::logging::targets;

new_key_type! {
    /// Handle to one connected slot, valid until that slot is disconnected.
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// Shared connection table. Subscriptions hold it weakly.
struct SignalInner<Args> {
    connections: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
}

/// Type-erased view of a connection table, so a [`Subscription`] does not
/// need to know the argument type of the signal it came from.
trait ConnectionTable: Send + Sync {
    fn disconnect(&self, id: ConnectionId) -> bool;
}

impl<Args: 'static> ConnectionTable for SignalInner<Args> {
    fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }
}

/// A typed event stream with any number of slots.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to connected slots. Use `()` for signals
///   with no arguments, or a tuple/struct for several values.
///
/// # Re-entrancy
///
/// Slots are invoked after the connection table lock is released, so a slot
/// may connect, disconnect, or emit on the same signal without deadlocking.
pub struct Signal<Args> {
    inner: Arc<SignalInner<Args>>,
}

impl<Args: Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Send + 'static> Signal<Args> {
    /// Create a signal without slots.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                connections: Mutex::new(SlotMap::with_key()),
            }),
        }
    }

    /// Add a slot. Keep the returned id to remove it again.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.inner.connections.lock().insert(Arc::new(slot))
    }

    /// Connect a slot and return a [`Subscription`] that owns the connection.
    ///
    /// The connection is removed when the subscription is dropped or disposed.
    ///
    /// # Example
    ///
    /// ```
    /// use canopy_core::Signal;
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicBool, Ordering};
    ///
    /// let visible = Signal::<bool>::new();
    /// let shown = Arc::new(AtomicBool::new(false));
    ///
    /// let flag = shown.clone();
    /// let subscription = visible.subscribe(move |&v| flag.store(v, Ordering::SeqCst));
    /// visible.emit(true);
    /// drop(subscription);
    /// visible.emit(false);
    ///
    /// assert!(shown.load(Ordering::SeqCst));
    /// ```
    pub fn subscribe<F>(&self, slot: F) -> Subscription
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        let table: Weak<dyn ConnectionTable> =
            Arc::downgrade(&self.inner) as Weak<dyn ConnectionTable>;
        Subscription {
            table,
            id: Some(id),
        }
    }

    /// Remove one slot. Returns `false` if it was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.inner.connections.lock().remove(id).is_some()
    }

    /// Number of live slots.
    pub fn connection_count(&self) -> usize {
        self.inner.connections.lock().len()
    }

    /// Emit the signal, invoking all connected slots in the current thread.
    #[tracing::instrument(skip_all, target = "canopy_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        // Snapshot the slots so they run without the table lock held
        let slots: Vec<Slot<Args>> = self.inner.connections.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, connection_count = slots.len(), "emitting signal");

        for slot in slots {
            slot(&args);
        }
    }
}

static_assertions::assert_impl_all!(Signal<Vec<String>>: Send, Sync);

/// An owned signal connection.
///
/// Dropping the subscription disconnects the slot. It can also be released
/// explicitly through [`Disposable::dispose`], which makes it suitable for a
/// [`DisposableStore`](crate::DisposableStore).
pub struct Subscription {
    table: Weak<dyn ConnectionTable>,
    id: Option<ConnectionId>,
}

impl Subscription {
    /// The connection this subscription owns, if still connected.
    pub fn id(&self) -> Option<ConnectionId> {
        self.id
    }

    /// Disconnect now. Returns `true` if a live connection was removed.
    pub fn unsubscribe(&mut self) -> bool {
        let Some(id) = self.id.take() else {
            return false;
        };
        match self.table.upgrade() {
            Some(table) => table.disconnect(id),
            None => false,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Disposable for Subscription {
    fn dispose(&mut self) -> Result<(), DisposeError> {
        self.unsubscribe();
        Ok(())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder<T: Clone + Send + 'static>(
        signal: &Signal<T>,
    ) -> (Arc<Mutex<Vec<T>>>, ConnectionId) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = signal.connect(move |value: &T| sink.lock().push(value.clone()));
        (seen, id)
    }

    #[test]
    fn test_emit_reaches_slot_in_order() {
        let selection = Signal::<Vec<String>>::new();
        let (seen, _) = recorder(&selection);

        selection.emit(vec!["a".into()]);
        selection.emit(vec!["b".into(), "a".into()]);

        assert_eq!(
            *seen.lock(),
            vec![vec!["a".to_string()], vec!["b".to_string(), "a".to_string()]]
        );
    }

    #[test]
    fn test_disconnect_by_id() {
        let expanded = Signal::<(String, bool)>::new();
        let (seen, id) = recorder(&expanded);

        expanded.emit(("b".into(), true));
        assert!(expanded.disconnect(id));
        assert!(!expanded.disconnect(id));
        expanded.emit(("b".into(), false));

        assert_eq!(*seen.lock(), vec![("b".to_string(), true)]);
    }

    #[test]
    fn test_every_subscriber_is_called() {
        let refreshed = Signal::<Option<String>>::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let hits = hits.clone();
            refreshed.connect(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(refreshed.connection_count(), 3);
        refreshed.emit(None);
        assert_eq!(hits.load(Ordering::SeqCst), 3);

    }

    #[test]
    fn test_subscription_drop_disconnects() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        {
            let received_clone = received.clone();
            let _sub = signal.subscribe(move |&value| {
                received_clone.lock().push(value);
            });
            signal.emit(1);
        }

        signal.emit(2);
        assert_eq!(*received.lock(), vec![1]);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_unsubscribe_leaves_siblings() {
        let signal = Signal::<i32>::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let first_clone = first.clone();
        let mut sub = signal.subscribe(move |_| {
            first_clone.fetch_add(1, Ordering::SeqCst);
        });
        let second_clone = second.clone();
        let _other = signal.subscribe(move |_| {
            second_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        signal.emit(7);

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_outlives_signal() {
        let signal = Signal::<()>::new();
        let mut sub = signal.subscribe(|_| {});
        drop(signal);

        assert!(!sub.unsubscribe());
        assert!(sub.dispose().is_ok());
    }

    #[test]
    fn test_slot_may_disconnect_itself() {
        let signal = Arc::new(Signal::<()>::new());
        let id_cell: Arc<Mutex<Option<ConnectionId>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicUsize::new(0));

        let signal_clone = signal.clone();
        let id_clone = id_cell.clone();
        let calls_clone = calls.clone();
        let id = signal.connect(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *id_clone.lock() {
                signal_clone.disconnect(id);
            }
        });
        *id_cell.lock() = Some(id);

        signal.emit(());
        signal.emit(());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_concurrent_producers() {
        let visible = Arc::new(Signal::<usize>::new());
        let (seen, _) = recorder(&visible);

        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let visible = visible.clone();
                std::thread::spawn(move || visible.emit(worker))
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let mut seen = seen.lock().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
    }
}
