//! Tokio integration for async resource fetchers.
//!
//! Requires the `tokio` feature. Futures run on a dedicated multi-threaded
//! runtime; results are posted back to a [`MainContext`](crate::MainContext).
//!
//! ```no_run
//! use trellis_core::MainContext;
//! use trellis_core::async_runtime::{AsyncRuntime, AsyncRuntimeConfig};
//!
//! # async fn fetch_thumbnail() -> Vec<u8> { Vec::new() }
//! let context = MainContext::new();
//! let runtime = AsyncRuntime::new(AsyncRuntimeConfig::default()).unwrap();
//!
//! runtime.spawn_with_callback(&context.handle(), fetch_thumbnail(), |bytes| {
//!     println!("{} bytes on the main context", bytes.len());
//! });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::cancel::CancellationToken;
use crate::dispatch::MainContextHandle;
use crate::error::PoolError;
use crate::logging::targets;

/// Configuration for [`AsyncRuntime`].
#[derive(Debug, Clone)]
pub struct AsyncRuntimeConfig {
    /// Number of worker threads. Defaults to the number of CPU cores.
    pub worker_threads: Option<usize>,
    /// Name prefix for runtime threads.
    pub thread_name: String,
}

impl Default for AsyncRuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            thread_name: "trellis-async".to_string(),
        }
    }
}

impl AsyncRuntimeConfig {
    /// Set the number of worker threads.
    pub fn with_worker_threads(mut self, count: usize) -> Self {
        self.worker_threads = Some(count);
        self
    }
}

/// A tokio runtime that hands results to the main context.
pub struct AsyncRuntime {
    runtime: Runtime,
}

impl AsyncRuntime {
    /// Build a multi-threaded runtime.
    pub fn new(config: AsyncRuntimeConfig) -> Result<Self, PoolError> {
        let mut builder = Builder::new_multi_thread();
        builder.thread_name(config.thread_name).enable_time();
        if let Some(count) = config.worker_threads {
            builder.worker_threads(count);
        }
        let runtime = builder
            .build()
            .map_err(|e| PoolError::CreationFailed(e.to_string()))?;
        tracing::debug!(target: targets::POOL, "async runtime created");
        Ok(Self { runtime })
    }

    /// Handle to the underlying tokio runtime.
    pub fn handle(&self) -> &Handle {
        self.runtime.handle()
    }

    /// Spawn a future.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.spawn(future)
    }

    /// Spawn a future that is abandoned when `token` is cancelled.
    ///
    /// Resolves to `None` if cancellation won the race.
    pub fn spawn_cancellable<F>(&self, token: &CancellationToken, future: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let notify = Arc::new(Notify::new());
        let waker = notify.clone();
        // notify_one stores a permit, so a cancel before the first poll is not lost.
        token.on_cancel(move || waker.notify_one());

        self.runtime.spawn(async move {
            tokio::select! {
                _ = notify.notified() => None,
                output = future => Some(output),
            }
        })
    }

    /// Spawn a future and deliver its output to `context`.
    pub fn spawn_with_callback<F, C>(&self, context: &MainContextHandle, future: F, callback: C)
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
        C: FnOnce(F::Output) + Send + 'static,
    {
        let context = context.clone();
        self.runtime.spawn(async move {
            let output = future.await;
            if context.post(move || callback(output)).is_err() {
                tracing::trace!(target: targets::POOL, "async callback dropped: main context closed");
            }
        });
    }

    /// Block the current thread on a future.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

impl fmt::Debug for AsyncRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncRuntime").finish_non_exhaustive()
    }
}
