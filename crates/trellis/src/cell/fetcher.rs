//! The resource fetch collaborator.

use std::fmt;
use std::sync::Arc;

use trellis_core::logging::targets;
use trellis_core::{BackgroundPool, CancellationToken};

use super::EntityId;
use crate::error::ResourceError;
use crate::geometry::Size;

/// Options forwarded to the fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchOptions {
    /// Wait for connectivity instead of failing while offline.
    pub wait_for_connectivity: bool,
}

/// One request for an entity's resource.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub entity: EntityId,
    pub version: Option<String>,
    pub size: Size,
    pub options: FetchOptions,
    /// Cancelled when the requesting cell no longer wants the result.
    pub token: CancellationToken,
}

/// Fetched content tagged with the version it was produced from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource<C> {
    pub content: C,
    pub version: Option<String>,
}

/// Receives the outcome of a request. May be called on any thread.
pub type Completion<C> = Box<dyn FnOnce(Result<Resource<C>, ResourceError>) + Send>;

/// Produces resources for entities.
///
/// Implementations should stop work once `request.token` is cancelled. The
/// completion must be called at most once; after cancellation it may be
/// dropped without being called.
pub trait ResourceFetcher<C>: Send + Sync {
    fn request(&self, request: ResourceRequest, completion: Completion<C>) -> RequestHandle;
}

/// Handle to an in-flight request.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    token: CancellationToken,
}

impl RequestHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Request cancellation. Returns `true` on the first call.
    pub fn cancel(&self) -> bool {
        self.token.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

type Loader<C> = dyn Fn(&ResourceRequest) -> Result<C, ResourceError> + Send + Sync;

/// A fetcher that runs a blocking loader on a [`BackgroundPool`].
///
/// Requests cancelled before a worker picks them up complete with
/// [`ResourceError::Cancelled`] without running the loader.
pub struct PoolFetcher<C> {
    pool: Arc<BackgroundPool>,
    loader: Arc<Loader<C>>,
}

impl<C> PoolFetcher<C> {
    pub fn new<L>(pool: Arc<BackgroundPool>, loader: L) -> Self
    where
        L: Fn(&ResourceRequest) -> Result<C, ResourceError> + Send + Sync + 'static,
    {
        Self {
            pool,
            loader: Arc::new(loader),
        }
    }
}

impl<C: Send + 'static> ResourceFetcher<C> for PoolFetcher<C> {
    fn request(&self, request: ResourceRequest, completion: Completion<C>) -> RequestHandle {
        let handle = RequestHandle::new(request.token.clone());
        let loader = self.loader.clone();

        let _task = self.pool.spawn(move || {
            if request.token.is_cancelled() {
                tracing::trace!(target: targets::CELL, entity = %request.entity, "request cancelled before start");
                completion(Err(ResourceError::Cancelled));
                return;
            }
            let result = loader(&request).map(|content| Resource {
                content,
                version: request.version.clone(),
            });
            completion(result);
        });
        handle
    }
}

impl<C> fmt::Debug for PoolFetcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolFetcher").field("pool", &self.pool).finish_non_exhaustive()
    }
}

#[cfg(feature = "tokio")]
pub use self::async_fetcher::AsyncFetcher;

#[cfg(feature = "tokio")]
mod async_fetcher {
    use std::future::Future;
    use std::pin::Pin;

    use trellis_core::async_runtime::AsyncRuntime;

    use super::*;

    type LoadFuture<C> = Pin<Box<dyn Future<Output = Result<C, ResourceError>> + Send>>;
    type AsyncLoader<C> = dyn Fn(ResourceRequest) -> LoadFuture<C> + Send + Sync;

    /// A fetcher that runs an async loader on an [`AsyncRuntime`].
    ///
    /// Cancelling the request abandons the loader future at its next await point.
    pub struct AsyncFetcher<C> {
        runtime: Arc<AsyncRuntime>,
        loader: Arc<AsyncLoader<C>>,
    }

    impl<C> AsyncFetcher<C> {
        pub fn new<L, F>(runtime: Arc<AsyncRuntime>, loader: L) -> Self
        where
            L: Fn(ResourceRequest) -> F + Send + Sync + 'static,
            F: Future<Output = Result<C, ResourceError>> + Send + 'static,
        {
            Self {
                runtime,
                loader: Arc::new(move |request| Box::pin(loader(request)) as LoadFuture<C>),
            }
        }
    }

    impl<C: Send + 'static> ResourceFetcher<C> for AsyncFetcher<C> {
        fn request(&self, request: ResourceRequest, completion: Completion<C>) -> RequestHandle {
            let token = request.token.clone();
            let entity = request.entity.clone();
            let version = request.version.clone();
            let task = self.runtime.spawn_cancellable(&token, (self.loader)(request));

            let _delivery = self.runtime.spawn(async move {
                let result = match task.await {
                    Ok(Some(loaded)) => loaded.map(|content| Resource { content, version }),
                    Ok(None) => Err(ResourceError::Cancelled),
                    Err(err) => {
                        tracing::debug!(target: targets::CELL, %entity, %err, "loader task failed");
                        Err(ResourceError::Failed(err.to_string()))
                    }
                };
                completion(result);
            });
            RequestHandle::new(token)
        }
    }

    impl<C> fmt::Debug for AsyncFetcher<C> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("AsyncFetcher").finish_non_exhaustive()
        }
    }
}
