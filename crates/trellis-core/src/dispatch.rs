//! Main-context dispatch.
//!
//! All list model state lives on one UI-owning context. A [`MainContext`] is
//! bound to the thread that created it and owns a FIFO queue of closures;
//! [`MainContextHandle`] is the cloneable, thread-safe side used by background
//! work to hop back onto that context.
//!
//! ```
//! use trellis_core::MainContext;
//!
//! let context = MainContext::new();
//! let handle = context.handle();
//!
//! std::thread::spawn(move || {
//!     handle.post(|| println!("runs on the main context")).unwrap();
//! })
//! .join()
//! .unwrap();
//!
//! assert_eq!(context.run_pending(), 1);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::error::DispatchError;
use crate::logging::targets;
use crate::thread_check::ThreadAffinity;

/// A boxed closure queued for the main context.
type Job = Box<dyn FnOnce() + Send + 'static>;

/// The single-threaded context that owns list model state.
///
/// `MainContext` is neither `Send` nor `Sync`; it drains its queue on the
/// thread that created it.
pub struct MainContext {
    sender: Sender<Job>,
    receiver: Receiver<Job>,
    affinity: ThreadAffinity,
    _not_send: PhantomData<*const ()>,
}

impl MainContext {
    /// Create a context bound to the current thread.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        tracing::debug!(target: targets::DISPATCH, thread = ?std::thread::current().id(), "main context created");
        Self {
            sender,
            receiver,
            affinity: ThreadAffinity::current(),
            _not_send: PhantomData,
        }
    }

    /// A handle for posting work to this context from any thread.
    pub fn handle(&self) -> MainContextHandle {
        MainContextHandle {
            sender: self.sender.clone(),
            affinity: self.affinity,
        }
    }

    /// The thread affinity of this context.
    pub fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }

    /// Number of closures waiting to run.
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Run every closure queued at the time of the call.
    ///
    /// Closures posted while draining run on the next call. Returns the
    /// number of closures executed.
    pub fn run_pending(&self) -> usize {
        self.affinity.assert_same_thread_with_msg("MainContext drained from a foreign thread");

        let budget = self.receiver.len();
        let mut executed = 0;
        while executed < budget {
            match self.receiver.try_recv() {
                Ok(job) => {
                    job();
                    executed += 1;
                }
                Err(_) => break,
            }
        }
        if executed > 0 {
            tracing::trace!(target: targets::DISPATCH, executed, "drained main context");
        }
        executed
    }

    /// Block up to `timeout` for at least one closure, then drain the queue.
    ///
    /// Returns the number of closures executed (0 on timeout).
    pub fn wait_and_run(&self, timeout: Duration) -> usize {
        self.affinity.assert_same_thread_with_msg("MainContext drained from a foreign thread");

        match self.receiver.recv_timeout(timeout) {
            Ok(job) => {
                job();
                1 + self.run_pending()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }
}

impl Default for MainContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MainContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainContext")
            .field("thread", &self.affinity.thread_id())
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Thread-safe handle to a [`MainContext`].
#[derive(Clone)]
pub struct MainContextHandle {
    sender: Sender<Job>,
    affinity: ThreadAffinity,
}

impl MainContextHandle {
    /// Queue `job` to run on the main context.
    ///
    /// Fails with [`DispatchError::ContextClosed`] once the context is dropped.
    pub fn post<F>(&self, job: F) -> Result<(), DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender.send(Box::new(job)).map_err(|_| {
            tracing::debug!(target: targets::DISPATCH, "post after main context shut down");
            DispatchError::ContextClosed
        })
    }

    /// Run `job` inline when already on the main context, otherwise post it.
    pub fn invoke<F>(&self, job: F) -> Result<(), DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_context_thread() {
            job();
            Ok(())
        } else {
            self.post(job)
        }
    }

    /// Whether the calling thread is the context's thread.
    pub fn is_context_thread(&self) -> bool {
        self.affinity.is_same_thread()
    }

    /// The thread affinity of the target context.
    pub fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }
}

impl fmt::Debug for MainContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainContextHandle")
            .field("thread", &self.affinity.thread_id())
            .finish()
    }
}

static_assertions::assert_impl_all!(MainContextHandle: Send, Sync, Clone);
static_assertions::assert_not_impl_any!(MainContext: Send, Sync);
