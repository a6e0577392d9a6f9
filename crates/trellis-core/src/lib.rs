//! Core runtime for Trellis.
//!
//! This crate provides the runtime pieces the list binding engine is built on:
//!
//! - **Signal/Slot System**: type-safe notifications with disposable subscriptions
//! - **Main Context**: the single UI-owning context and a thread-safe handle to post to it
//! - **Thread Affinity**: checks that context-bound state is touched from one thread
//! - **Cancellation**: cooperative cancellation tokens shared with background work
//! - **Background Pool**: rayon-backed workers that report back to the main context
//! - **Async Runtime**: optional tokio integration (`tokio` feature)
//!
//! # Example
//!
//! ```
//! use trellis_core::{MainContext, Signal};
//!
//! let context = MainContext::new();
//! let loaded = Signal::<u32>::new();
//! let _subscription = loaded.connect_queued_scoped(&context.handle(), |id| {
//!     println!("entity {id} loaded");
//! });
//!
//! loaded.emit(7);
//! assert_eq!(context.run_pending(), 1);
//! ```

pub mod cancel;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod pool;
pub mod signal;
pub mod thread_check;

#[cfg(feature = "tokio")]
pub mod async_runtime;

pub use cancel::CancellationToken;
pub use dispatch::{MainContext, MainContextHandle};
pub use error::{CoreError, CoreResult, DispatchError, PoolError, SignalError};
pub use logging::PerfSpan;
pub use pool::{BackgroundPool, PoolConfig, TaskHandle};
pub use signal::{ConnectionId, ConnectionType, Signal, Subscription};
pub use thread_check::ThreadAffinity;
