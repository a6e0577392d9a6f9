//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is shared between the party that starts some work
//! and the work itself. Cancelling is idempotent; callbacks registered with
//! [`CancellationToken::on_cancel`] run exactly once, on the thread that
//! cancels (or immediately if the token is already cancelled).

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

type CancelCallback = Box<dyn FnOnce() + Send + 'static>;

/// A cancellation token for cooperative task cancellation.
///
/// Clones share state; two tokens are the same request when
/// [`is_same`](Self::is_same) returns `true`.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<CancellationState>,
}

#[derive(Default)]
struct CancellationState {
    cancelled: AtomicBool,
    callbacks: Mutex<Vec<CancelCallback>>,
}

impl CancellationToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        let callbacks = std::mem::take(&mut *self.inner.callbacks.lock());
        for callback in callbacks {
            callback();
        }
        true
    }

    /// Register a callback to run when the token is cancelled.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut callbacks = self.inner.callbacks.lock();
        // Checked under the lock so a concurrent cancel cannot miss the callback.
        if self.is_cancelled() {
            drop(callbacks);
            callback();
        } else {
            callbacks.push(Box::new(callback));
        }
    }

    /// Whether both tokens refer to the same cancellation state.
    #[inline]
    pub fn is_same(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
