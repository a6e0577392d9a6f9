//! Background pool for resource work.
//!
//! Built on rayon. Results are either collected through a [`TaskHandle`] or
//! delivered to a [`MainContext`](crate::MainContext) with
//! [`BackgroundPool::spawn_with_callback`].
//!
//! ```no_run
//! use trellis_core::{BackgroundPool, MainContext, PoolConfig};
//!
//! let context = MainContext::new();
//! let pool = BackgroundPool::new(PoolConfig::with_threads(2)).unwrap();
//!
//! pool.spawn_with_callback(
//!     &context.handle(),
//!     || "decoded".to_string(),
//!     |result| println!("on the main context: {result}"),
//! );
//! context.wait_and_run(std::time::Duration::from_secs(1));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, bounded};
use rayon::{ThreadPool as RayonThreadPool, ThreadPoolBuilder};

use crate::cancel::CancellationToken;
use crate::dispatch::MainContextHandle;
use crate::error::PoolError;
use crate::logging::targets;

/// Configuration for a [`BackgroundPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads. `None` means the number of CPU cores.
    pub num_threads: Option<usize>,
    /// Name prefix for worker threads.
    pub thread_name: String,
    /// Stack size for worker threads in bytes.
    pub stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            thread_name: "trellis-worker".to_string(),
            stack_size: None,
        }
    }
}

impl PoolConfig {
    /// Configuration with a fixed thread count.
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
            ..Default::default()
        }
    }

    /// Set the worker thread name prefix.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

/// A handle to a task's eventual result.
pub struct TaskHandle<T> {
    receiver: Receiver<T>,
    cancellation: Option<CancellationToken>,
}

impl<T> TaskHandle<T> {
    /// Take the result if the task has finished.
    pub fn try_get(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Block until the task completes.
    ///
    /// Returns `None` if the task panicked.
    pub fn wait(self) -> Option<T> {
        self.receiver.recv().ok()
    }

    /// Block up to `timeout` for the result.
    pub fn wait_timeout(self, timeout: Duration) -> Option<T> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Request cancellation if the task was spawned cancellable.
    pub fn cancel(&self) {
        if let Some(token) = &self.cancellation {
            token.cancel();
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("ready", &!self.receiver.is_empty())
            .field("cancellable", &self.cancellation.is_some())
            .finish()
    }
}

/// A work-stealing pool for fetches and decoding.
pub struct BackgroundPool {
    pool: RayonThreadPool,
    active_tasks: Arc<AtomicUsize>,
}

impl BackgroundPool {
    /// Create a pool with the given configuration.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let thread_name = config.thread_name.clone();
        let mut builder = ThreadPoolBuilder::new().thread_name(move |index| format!("{thread_name}-{index}"));

        if let Some(num_threads) = config.num_threads {
            builder = builder.num_threads(num_threads);
        }
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let pool = builder
            .build()
            .map_err(|e| PoolError::CreationFailed(e.to_string()))?;
        tracing::debug!(target: targets::POOL, threads = pool.current_num_threads(), "background pool created");

        Ok(Self {
            pool,
            active_tasks: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Number of worker threads.
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Number of tasks currently queued or running.
    pub fn active_tasks(&self) -> usize {
        self.active_tasks.load(Ordering::Acquire)
    }

    /// Spawn a task and return a handle to its result.
    pub fn spawn<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.spawn_internal(task, None)
    }

    /// Spawn a task that receives a cancellation token.
    ///
    /// The task should poll `token.is_cancelled()` and exit early.
    pub fn spawn_cancellable<F, T>(&self, task: F) -> (TaskHandle<T>, CancellationToken)
    where
        F: FnOnce(CancellationToken) -> T + Send + 'static,
        T: Send + 'static,
    {
        let token = CancellationToken::new();
        let token_for_task = token.clone();
        let handle = self.spawn_internal(move || task(token_for_task), Some(token.clone()));
        (handle, token)
    }

    /// Spawn a task and deliver its result to `context`.
    ///
    /// The callback is dropped without running if the context has shut down.
    pub fn spawn_with_callback<F, T, C>(&self, context: &MainContextHandle, task: F, callback: C)
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
        C: FnOnce(T) + Send + 'static,
    {
        self.active_tasks.fetch_add(1, Ordering::AcqRel);
        let active_tasks = self.active_tasks.clone();
        let context = context.clone();

        self.pool.spawn(move || {
            let result = task();
            if context.post(move || callback(result)).is_err() {
                crate::trellis_trace!("callback dropped: main context closed");
            }
            active_tasks.fetch_sub(1, Ordering::AcqRel);
        });
    }

    fn spawn_internal<F, T>(&self, task: F, cancellation: Option<CancellationToken>) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = bounded(1);
        self.active_tasks.fetch_add(1, Ordering::AcqRel);
        let active_tasks = self.active_tasks.clone();

        self.pool.spawn(move || {
            let result = task();
            let _ = sender.send(result);
            active_tasks.fetch_sub(1, Ordering::AcqRel);
        });

        TaskHandle {
            receiver,
            cancellation,
        }
    }
}

impl fmt::Debug for BackgroundPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundPool")
            .field("num_threads", &self.num_threads())
            .field("active_tasks", &self.active_tasks())
            .finish()
    }
}

static_assertions::assert_impl_all!(BackgroundPool: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::MainContext;
    use parking_lot::Mutex;

    fn pool() -> BackgroundPool {
        BackgroundPool::new(PoolConfig::with_threads(2).thread_name("test-worker")).unwrap()
    }

    #[test]
    fn test_spawn_and_wait() {
        let pool = pool();
        let handle = pool.spawn(|| 42);
        assert_eq!(handle.wait(), Some(42));
    }

    #[test]
    fn test_wait_timeout() {
        let pool = pool();
        let handle = pool.spawn(|| {
            std::thread::sleep(Duration::from_millis(10));
            "done"
        });
        assert_eq!(handle.wait_timeout(Duration::from_secs(5)), Some("done"));
    }

    #[test]
    fn test_cancellable_task() {
        let pool = pool();
        let (handle, token) = pool.spawn_cancellable(|token| {
            for _ in 0..500 {
                if token.is_cancelled() {
                    return None;
                }
                std::thread::sleep(Duration::from_millis(2));
            }
            Some(1)
        });

        handle.cancel();
        assert!(token.is_cancelled());
        assert_eq!(handle.wait(), Some(None));
    }

    #[test]
    fn test_spawn_with_callback_runs_on_context() {
        let context = MainContext::new();
        let pool = pool();
        let result = Arc::new(Mutex::new(None));
        let r = result.clone();

        pool.spawn_with_callback(
            &context.handle(),
            || std::thread::current().name().map(str::to_string),
            move |worker_name| {
                *r.lock() = Some((worker_name, std::thread::current().id()));
            },
        );

        assert_eq!(context.wait_and_run(Duration::from_secs(5)), 1);
        let (worker_name, ran_on) = result.lock().take().unwrap();
        assert!(worker_name.unwrap().starts_with("test-worker"));
        assert_eq!(ran_on, std::thread::current().id());
    }

    #[test]
    fn test_num_threads() {
        assert_eq!(pool().num_threads(), 2);
    }
}
