//! Signal/slot system for Trellis.
//!
//! A type-safe, Qt-inspired signal/slot mechanism. Objects emit signals when
//! their state changes and connected slots are invoked in response.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - The signal type for emitting notifications
//! - [`ConnectionId`] - Identifier returned when connecting a slot
//! - [`Subscription`] - Disposable token that disconnects when dropped
//!
//! # Re-entrancy
//!
//! Slots are snapshotted before invocation, so a slot may connect, disconnect
//! or emit on the same signal without deadlocking. A slot disconnected during
//! an emission still receives that emission.
//!
//! # Example
//!
//! ```
//! use trellis_core::Signal;
//!
//! let text_changed = Signal::<String>::new();
//! let id = text_changed.connect(|text| println!("text changed to {text}"));
//! text_changed.emit("Hello".to_string());
//! text_changed.disconnect(id);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::dispatch::MainContextHandle;
use crate::error::SignalError;
use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Remains valid until the connection is disconnected or the signal dropped.
    pub struct ConnectionId;
}

/// How a connected slot is invoked when the signal is emitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionType {
    /// Invoke the slot immediately on the emitting thread.
    #[default]
    Direct,
    /// Post the invocation to a main context.
    Queued,
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

struct Connection<Args> {
    slot: Slot<Args>,
    target: Option<MainContextHandle>,
}

impl<Args> Connection<Args> {
    fn connection_type(&self) -> ConnectionType {
        if self.target.is_some() {
            ConnectionType::Queued
        } else {
            ConnectionType::Direct
        }
    }
}

struct SignalState<Args> {
    connections: Mutex<SlotMap<ConnectionId, Connection<Args>>>,
    blocked: AtomicBool,
}

/// Type-erased disconnect used by [`Subscription`].
trait Disconnect: Send + Sync {
    fn disconnect(&self, id: ConnectionId) -> bool;
}

impl<Args: 'static> Disconnect for SignalState<Args> {
    fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }
}

/// A signal that can be connected to slots and emitted.
///
/// `Signal<Args>` is `Send + Sync`. Direct slots run on the emitting thread;
/// queued slots run on the main context they were connected with.
pub struct Signal<Args> {
    state: Arc<SignalState<Args>>,
}

impl<Args: Clone + Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Clone + Send + 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            state: Arc::new(SignalState {
                connections: Mutex::new(SlotMap::with_key()),
                blocked: AtomicBool::new(false),
            }),
        }
    }

    /// Connect a slot invoked directly on the emitting thread.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.insert(Arc::new(slot), None)
    }

    /// Connect a slot whose invocations are posted to `context`.
    pub fn connect_queued<F>(&self, context: &MainContextHandle, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.insert(Arc::new(slot), Some(context.clone()))
    }

    /// Connect a direct slot and return a token that disconnects on drop.
    pub fn connect_scoped<F>(&self, slot: F) -> Subscription
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        self.subscription(id)
    }

    /// Connect a queued slot and return a token that disconnects on drop.
    pub fn connect_queued_scoped<F>(&self, context: &MainContextHandle, slot: F) -> Subscription
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect_queued(context, slot);
        self.subscription(id)
    }

    fn insert(&self, slot: Slot<Args>, target: Option<MainContextHandle>) -> ConnectionId {
        self.state.connections.lock().insert(Connection { slot, target })
    }

    fn subscription(&self, id: ConnectionId) -> Subscription {
        let source: Weak<dyn Disconnect> = Arc::downgrade(&self.state) as Weak<dyn Disconnect>;
        Subscription {
            source: Some(source),
            id,
        }
    }

    /// Disconnect a slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.state.disconnect(id)
    }

    /// Disconnect all slots.
    pub fn disconnect_all(&self) {
        self.state.connections.lock().clear();
    }

    /// Number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.state.connections.lock().len()
    }

    /// The connection type of `id`, if still connected.
    pub fn connection_type(&self, id: ConnectionId) -> Option<ConnectionType> {
        self.state.connections.lock().get(id).map(Connection::connection_type)
    }

    /// Block emission temporarily. While blocked, `emit` does nothing.
    pub fn set_blocked(&self, blocked: bool) {
        self.state.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Whether emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.state.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, invoking all connected slots.
    ///
    /// Returns the number of slots invoked or queued.
    #[tracing::instrument(skip_all, target = "trellis_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) -> usize {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return 0;
        }

        let snapshot: Vec<(Slot<Args>, Option<MainContextHandle>)> = self
            .state
            .connections
            .lock()
            .values()
            .map(|conn| (conn.slot.clone(), conn.target.clone()))
            .collect();
        tracing::trace!(target: targets::SIGNAL, connection_count = snapshot.len(), "emitting signal");

        let mut delivered = 0;
        for (slot, target) in snapshot {
            match target {
                None => {
                    slot(&args);
                    delivered += 1;
                }
                Some(context) => {
                    let args = args.clone();
                    match context.post(move || slot(&args)) {
                        Ok(()) => delivered += 1,
                        Err(err) => {
                            tracing::debug!(target: targets::SIGNAL, %err, "queued slot dropped");
                        }
                    }
                }
            }
        }
        delivered
    }
}

impl<Args> fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.state.connections.lock().len())
            .field("blocked", &self.state.blocked.load(Ordering::Relaxed))
            .finish()
    }
}

/// A disposable connection token.
///
/// Dropping the token disconnects the slot. It holds the signal weakly, so a
/// token may outlive its signal.
#[must_use = "dropping a Subscription disconnects its slot immediately"]
pub struct Subscription {
    source: Option<Weak<dyn Disconnect>>,
    id: ConnectionId,
}

impl Subscription {
    /// The underlying connection ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Whether the signal is still alive and the token not yet disposed.
    pub fn is_active(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| source.strong_count() > 0)
    }

    /// Disconnect now, reporting why it could not be done.
    pub fn try_dispose(mut self) -> Result<(), SignalError> {
        let source = self.source.take().ok_or(SignalError::InvalidConnection)?;
        let state = source.upgrade().ok_or(SignalError::SignalDropped)?;
        if state.disconnect(self.id) {
            Ok(())
        } else {
            Err(SignalError::InvalidConnection)
        }
    }

    /// Disconnect now.
    pub fn dispose(self) {
        drop(self);
    }

    /// Keep the connection alive for the signal's lifetime and return its ID.
    pub fn detach(mut self) -> ConnectionId {
        self.source = None;
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(state) = self.source.take().and_then(|source| source.upgrade()) {
            state.disconnect(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

static_assertions::assert_impl_all!(Signal<()>: Send, Sync);
static_assertions::assert_impl_all!(Signal<String>: Send, Sync);
static_assertions::assert_impl_all!(Subscription: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::MainContext;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn test_basic_signal() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(AtomicI32::new(0));
        let r = received.clone();

        signal.connect(move |&value| {
            r.store(value, Ordering::SeqCst);
        });

        assert_eq!(signal.emit(42), 1);
        assert_eq!(received.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_disconnect() {
        let signal = Signal::<i32>::new();
        let count = Arc::new(AtomicI32::new(0));
        let c = count.clone();

        let id = signal.connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        signal.emit(1);
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_blocked_signal() {
        let signal = Signal::<i32>::new();
        let count = Arc::new(AtomicI32::new(0));
        let c = count.clone();
        signal.connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        signal.set_blocked(true);
        assert_eq!(signal.emit(1), 0);
        signal.set_blocked(false);
        signal.emit(2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_disconnects_on_drop() {
        let signal = Signal::<()>::new();
        let count = Arc::new(AtomicI32::new(0));
        let c = count.clone();

        {
            let subscription = signal.connect_scoped(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            });
            assert!(subscription.is_active());
            signal.emit(());
        }
        signal.emit(());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_subscription_outlives_signal() {
        let signal = Signal::<()>::new();
        let subscription = signal.connect_scoped(|_| {});
        drop(signal);

        assert!(!subscription.is_active());
        assert_eq!(subscription.try_dispose(), Err(SignalError::SignalDropped));
    }

    #[test]
    fn test_subscription_detach_keeps_connection() {
        let signal = Signal::<()>::new();
        let id = signal.connect_scoped(|_| {}).detach();
        assert_eq!(signal.connection_count(), 1);
        assert_eq!(signal.connection_type(id), Some(ConnectionType::Direct));
    }

    #[test]
    fn test_slot_can_disconnect_itself_during_emit() {
        let signal = Arc::new(Signal::<()>::new());
        let id_cell: Arc<parking_lot::Mutex<Option<ConnectionId>>> = Arc::default();
        let count = Arc::new(AtomicI32::new(0));

        let weak = Arc::downgrade(&signal);
        let id_for_slot = id_cell.clone();
        let c = count.clone();
        let id = signal.connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            if let (Some(signal), Some(id)) = (weak.upgrade(), *id_for_slot.lock()) {
                signal.disconnect(id);
            }
        });
        *id_cell.lock() = Some(id);

        signal.emit(());
        signal.emit(());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_queued_connection_runs_on_context() {
        let context = MainContext::new();
        let signal = Arc::new(Signal::<i32>::new());
        let received = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let r = received.clone();

        let id = signal.connect_queued(&context.handle(), move |&v| r.lock().push(v));
        assert_eq!(signal.connection_type(id), Some(ConnectionType::Queued));

        let emitter = signal.clone();
        std::thread::spawn(move || {
            emitter.emit(7);
        })
        .join()
        .unwrap();

        assert!(received.lock().is_empty());
        assert_eq!(context.run_pending(), 1);
        assert_eq!(*received.lock(), vec![7]);
    }

    #[test]
    fn test_multiple_connections_in_connect_order() {
        let signal = Signal::<&'static str>::new();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for name in ["a", "b"] {
            let log = log.clone();
            signal.connect(move |arg| log.lock().push(format!("{name}:{arg}")));
        }
        signal.emit("x");
        assert_eq!(*log.lock(), vec!["a:x", "b:x"]);
    }
}
