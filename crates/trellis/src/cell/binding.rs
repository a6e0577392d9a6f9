//! Per-cell resource binding.
//!
//! # Identity check
//!
//! Each request captures the id of the entity it was started for. Results
//! hop to the main context and are applied only if that id is still bound,
//! the request was not cancelled, and the resource version matches the bound
//! entity's version. Anything else is a stale result from a reused cell and
//! is dropped.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use trellis_core::logging::{span_names, targets};
use trellis_core::{CancellationToken, MainContextHandle, PerfSpan, Subscription};

use super::fetcher::{Completion, FetchOptions, RequestHandle, Resource, ResourceFetcher, ResourceRequest};
use super::progress::{ProgressCenter, ProgressEvent};
use super::{Availability, BindingOptions, CellContent, CellView, Entity, EntityId};
use crate::error::ResourceError;

struct BoundEntity {
    id: EntityId,
    version: Option<String>,
    local_id: Option<String>,
}

struct ActiveRequest {
    token: CancellationToken,
    handle: RequestHandle,
}

impl ActiveRequest {
    fn cancel(&self) {
        self.token.cancel();
        self.handle.cancel();
    }
}

struct BindingState<C> {
    bound: Option<BoundEntity>,
    active: Option<ActiveRequest>,
    progress_subscription: Option<Subscription>,
    content: CellContent<C>,
    progress: Option<f32>,
}

impl<C> Default for BindingState<C> {
    fn default() -> Self {
        Self {
            bound: None,
            active: None,
            progress_subscription: None,
            content: CellContent::Empty,
            progress: None,
        }
    }
}

struct BindingInner<C> {
    context: MainContextHandle,
    fetcher: Arc<dyn ResourceFetcher<C>>,
    view: Arc<dyn CellView<C>>,
    progress_center: Option<Arc<ProgressCenter>>,
    options: BindingOptions,
    state: Mutex<BindingState<C>>,
}

impl<C> Drop for BindingInner<C> {
    fn drop(&mut self) {
        if let Some(active) = self.state.get_mut().active.take() {
            active.cancel();
        }
    }
}

/// Binds one reusable cell to one entity at a time.
///
/// Create it on the main context; results are delivered there through the
/// context handle. Dropping the binding cancels its request.
pub struct CellBinding<C: Clone + Send + Sync + 'static> {
    inner: Arc<BindingInner<C>>,
}

impl<C: Clone + Send + Sync + 'static> CellBinding<C> {
    /// Start configuring a binding.
    pub fn builder(
        context: MainContextHandle,
        fetcher: Arc<dyn ResourceFetcher<C>>,
        view: Arc<dyn CellView<C>>,
    ) -> CellBindingBuilder<C> {
        CellBindingBuilder {
            context,
            fetcher,
            view,
            progress_center: None,
            options: BindingOptions::default(),
        }
    }

    /// Show `entity`, replacing whatever the cell showed before.
    ///
    /// Any in-flight request is cancelled first. Depending on the entity's
    /// availability the cell shows cached content, keeps the placeholder, or
    /// shows the placeholder and starts a fetch.
    pub fn bind(&self, entity: Entity<C>) {
        self.inner.context.affinity().debug_assert_same_thread();
        let _span = PerfSpan::new(span_names::BIND);

        let Entity {
            id,
            version,
            local_id,
            availability,
        } = entity;
        tracing::trace!(target: targets::CELL, entity = %id, "binding cell");

        let (previous, old_subscription, had_badge) = {
            let mut state = self.inner.state.lock();
            let previous = state.active.take();
            let old_subscription = state.progress_subscription.take();
            state.bound = Some(BoundEntity {
                id: id.clone(),
                version: version.clone(),
                local_id: local_id.clone(),
            });
            let had_badge = state.progress.take().is_some();
            (previous, old_subscription, had_badge)
        };
        if let Some(previous) = previous {
            previous.cancel();
        }
        drop(old_subscription);
        // The badge belongs to the previous entity.
        if had_badge {
            self.inner.view.show_progress(None);
        }

        match availability {
            Availability::Available(content) => self.display(CellContent::Resource(content)),
            Availability::None => self.display(CellContent::Placeholder),
            Availability::Fetchable => {
                self.display(CellContent::Placeholder);
                self.start_request(id, version);
            }
        }

        if let Some(local_id) = local_id {
            self.subscribe_progress(local_id);
        }
    }

    /// Detach from the current entity and cancel its request.
    pub fn unbind(&self) {
        let (active, subscription) = {
            let mut state = self.inner.state.lock();
            let active = state.active.take();
            let subscription = state.progress_subscription.take();
            *state = BindingState::default();
            (active, subscription)
        };
        if let Some(active) = active {
            active.cancel();
        }
        drop(subscription);
        self.inner.view.clear();
    }

    /// The id of the currently bound entity.
    pub fn bound_entity(&self) -> Option<EntityId> {
        self.inner.state.lock().bound.as_ref().map(|bound| bound.id.clone())
    }

    /// What the cell currently displays.
    pub fn content(&self) -> CellContent<C> {
        self.inner.state.lock().content.clone()
    }

    /// The last progress value shown, if a transfer is running.
    pub fn progress(&self) -> Option<f32> {
        self.inner.state.lock().progress
    }

    pub fn has_active_request(&self) -> bool {
        self.inner.state.lock().active.is_some()
    }

    pub fn options(&self) -> &BindingOptions {
        &self.inner.options
    }

    fn start_request(&self, id: EntityId, version: Option<String>) {
        let token = CancellationToken::new();
        let request = ResourceRequest {
            entity: id.clone(),
            version,
            size: self.inner.options.size,
            options: FetchOptions {
                wait_for_connectivity: self.inner.options.wait_for_connectivity,
            },
            token: token.clone(),
        };

        let weak = Arc::downgrade(&self.inner);
        let context = self.inner.context.clone();
        let request_token = token.clone();
        let completion: Completion<C> = Box::new(move |result| {
            let posted = context.post(move || {
                if let Some(binding) = Self::upgrade(&weak) {
                    binding.finish(&id, &request_token, result);
                }
            });
            if posted.is_err() {
                tracing::trace!(target: targets::CELL, "result dropped: main context closed");
            }
        });

        let handle = self.inner.fetcher.request(request, completion);
        self.inner.state.lock().active = Some(ActiveRequest { token, handle });
    }

    fn finish(&self, captured: &EntityId, token: &CancellationToken, result: Result<Resource<C>, ResourceError>) {
        let bound_version = {
            let mut state = self.inner.state.lock();
            if state.active.as_ref().is_some_and(|active| active.token.is_same(token)) {
                state.active = None;
            }
            match &state.bound {
                Some(bound) if &bound.id == captured && !token.is_cancelled() => bound.version.clone(),
                _ => {
                    tracing::trace!(target: targets::CELL, entity = %captured, "stale result discarded");
                    return;
                }
            }
        };

        match result {
            Ok(resource) if resource.version == bound_version => {
                self.display(CellContent::Resource(resource.content));
            }
            Ok(resource) => {
                tracing::trace!(
                    target: targets::CELL,
                    entity = %captured,
                    expected = ?bound_version,
                    received = ?resource.version,
                    "result for another version discarded"
                );
            }
            Err(err) => {
                tracing::debug!(target: targets::CELL, entity = %captured, %err, "resource fetch failed");
                if self.inner.options.fallback_to_placeholder {
                    self.display(CellContent::Placeholder);
                }
            }
        }
    }

    fn subscribe_progress(&self, local_id: String) {
        let Some(center) = &self.inner.progress_center else {
            return;
        };
        let weak = Arc::downgrade(&self.inner);
        let subscription = center.subscribe(&self.inner.context, move |event| {
            if event.local_id == local_id {
                if let Some(binding) = Self::upgrade(&weak) {
                    binding.apply_progress(event);
                }
            }
        });
        self.inner.state.lock().progress_subscription = Some(subscription);
    }

    fn apply_progress(&self, event: &ProgressEvent) {
        {
            let mut state = self.inner.state.lock();
            let is_current = state
                .bound
                .as_ref()
                .is_some_and(|bound| bound.local_id.as_deref() == Some(event.local_id.as_str()));
            if !is_current {
                return;
            }
            state.progress = event.progress;
        }
        self.inner.view.show_progress(event.progress);
    }

    fn display(&self, content: CellContent<C>) {
        self.inner.state.lock().content = content.clone();
        match &content {
            CellContent::Resource(resource) => self.inner.view.show_content(resource),
            CellContent::Placeholder => self.inner.view.show_placeholder(),
            CellContent::Empty => self.inner.view.clear(),
        }
    }

    fn upgrade(weak: &Weak<BindingInner<C>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }
}

impl<C: Clone + Send + Sync + 'static> fmt::Debug for CellBinding<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("CellBinding")
            .field("bound", &state.bound.as_ref().map(|bound| &bound.id))
            .field("active_request", &state.active.is_some())
            .field("progress", &state.progress)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CellBinding`].
#[must_use = "call build() to create the binding"]
pub struct CellBindingBuilder<C> {
    context: MainContextHandle,
    fetcher: Arc<dyn ResourceFetcher<C>>,
    view: Arc<dyn CellView<C>>,
    progress_center: Option<Arc<ProgressCenter>>,
    options: BindingOptions,
}

impl<C: Clone + Send + Sync + 'static> CellBindingBuilder<C> {
    pub fn options(mut self, options: BindingOptions) -> Self {
        self.options = options;
        self
    }

    /// Show progress badges published on `center`.
    pub fn progress_center(mut self, center: Arc<ProgressCenter>) -> Self {
        self.progress_center = Some(center);
        self
    }

    pub fn build(self) -> CellBinding<C> {
        CellBinding {
            inner: Arc::new(BindingInner {
                context: self.context,
                fetcher: self.fetcher,
                view: self.view,
                progress_center: self.progress_center,
                options: self.options,
                state: Mutex::new(BindingState::default()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use trellis_core::MainContext;

    /// Fetcher that parks completions until the test resolves them.
    #[derive(Default)]
    struct ManualFetcher {
        pending: Mutex<HashMap<String, (ResourceRequest, Completion<String>)>>,
    }

    impl ManualFetcher {
        fn resolve(&self, entity: &str, result: Result<String, ResourceError>) {
            let Some((request, completion)) = self.pending.lock().remove(entity) else {
                panic!("no pending request for {entity}");
            };
            completion(result.map(|content| Resource {
                content,
                version: request.version.clone(),
            }));
        }

        fn resolve_with_version(&self, entity: &str, content: &str, version: &str) {
            let (_, completion) = self.pending.lock().remove(entity).unwrap();
            completion(Ok(Resource {
                content: content.to_string(),
                version: Some(version.to_string()),
            }));
        }

        fn token(&self, entity: &str) -> CancellationToken {
            self.pending.lock()[entity].0.token.clone()
        }
    }

    impl ResourceFetcher<String> for ManualFetcher {
        fn request(&self, request: ResourceRequest, completion: Completion<String>) -> RequestHandle {
            let handle = RequestHandle::new(request.token.clone());
            self.pending
                .lock()
                .insert(request.entity.as_str().to_string(), (request, completion));
            handle
        }
    }

    #[derive(Default)]
    struct RecordingView {
        log: Mutex<Vec<String>>,
    }

    impl CellView<String> for RecordingView {
        fn show_placeholder(&self) {
            self.log.lock().push("placeholder".into());
        }

        fn show_content(&self, content: &String) {
            self.log.lock().push(format!("content {content}"));
        }

        fn show_progress(&self, progress: Option<f32>) {
            self.log.lock().push(format!("progress {progress:?}"));
        }

        fn clear(&self) {
            self.log.lock().push("clear".into());
        }
    }

    struct Fixture {
        context: MainContext,
        fetcher: Arc<ManualFetcher>,
        view: Arc<RecordingView>,
        center: Arc<ProgressCenter>,
        binding: CellBinding<String>,
    }

    fn fixture() -> Fixture {
        let context = MainContext::new();
        let fetcher = Arc::new(ManualFetcher::default());
        let view = Arc::new(RecordingView::default());
        let center = Arc::new(ProgressCenter::new());
        let binding = CellBinding::builder(context.handle(), fetcher.clone(), view.clone())
            .progress_center(center.clone())
            .build();
        Fixture {
            context,
            fetcher,
            view,
            center,
            binding,
        }
    }

    #[test]
    fn test_bind_fetches_and_displays() {
        let f = fixture();
        f.binding.bind(Entity::new("a"));
        assert_eq!(f.binding.content(), CellContent::Placeholder);
        assert!(f.binding.has_active_request());

        f.fetcher.resolve("a", Ok("A".into()));
        assert_eq!(f.binding.content(), CellContent::Placeholder);
        assert_eq!(f.context.run_pending(), 1);

        assert_eq!(f.binding.content(), CellContent::Resource("A".to_string()));
        assert!(!f.binding.has_active_request());
        assert_eq!(*f.view.log.lock(), vec!["placeholder", "content A"]);
    }

    #[test]
    fn test_rebind_discards_stale_result() {
        let f = fixture();
        f.binding.bind(Entity::new("a"));
        let token_a = f.fetcher.token("a");
        f.binding.bind(Entity::new("b"));
        assert!(token_a.is_cancelled());

        f.fetcher.resolve("a", Ok("A".into()));
        f.fetcher.resolve("b", Ok("B".into()));
        f.context.run_pending();

        assert_eq!(f.binding.bound_entity(), Some(EntityId::from("b")));
        assert_eq!(f.binding.content().resource().map(String::as_str), Some("B"));
        assert!(!f.view.log.lock().contains(&"content A".to_string()));
    }

    #[test]
    fn test_rebind_same_entity_ignores_cancelled_request() {
        let f = fixture();
        f.binding.bind(Entity::new("a"));
        let (first_request, first_completion) = f.fetcher.pending.lock().remove("a").unwrap();
        f.binding.bind(Entity::new("a"));
        assert!(first_request.token.is_cancelled());

        first_completion(Ok(Resource {
            content: "old".into(),
            version: None,
        }));
        f.context.run_pending();
        assert_eq!(f.binding.content(), CellContent::Placeholder);
        assert!(f.binding.has_active_request());

        f.fetcher.resolve("a", Ok("new".into()));
        f.context.run_pending();
        assert_eq!(f.binding.content(), CellContent::Resource("new".to_string()));
    }

    #[test]
    fn test_failure_falls_back_to_placeholder() {
        let f = fixture();
        f.binding.bind(Entity::new("a"));
        f.fetcher.resolve("a", Err(ResourceError::Offline));
        f.context.run_pending();

        assert_eq!(f.binding.content(), CellContent::Placeholder);
        assert_eq!(*f.view.log.lock(), vec!["placeholder", "placeholder"]);
    }

    #[test]
    fn test_availability_policy() {
        let f = fixture();
        f.binding
            .bind(Entity::new("cached").with_availability(Availability::Available("C".to_string())));
        assert_eq!(f.binding.content(), CellContent::Resource("C".to_string()));
        assert!(!f.binding.has_active_request());

        f.binding.bind(Entity::new("none").with_availability(Availability::None));
        assert_eq!(f.binding.content(), CellContent::Placeholder);
        assert!(!f.binding.has_active_request());
        assert!(f.fetcher.pending.lock().is_empty());
    }

    #[test]
    fn test_version_mismatch_discarded() {
        let f = fixture();
        f.binding.bind(Entity::new("a").with_version("v2"));
        f.fetcher.resolve_with_version("a", "old thumbnail", "v1");
        f.context.run_pending();
        assert_eq!(f.binding.content(), CellContent::Placeholder);
    }

    #[test]
    fn test_unbind_cancels_and_clears() {
        let f = fixture();
        f.binding.bind(Entity::new("a").with_local_id("local-a"));
        let token = f.fetcher.token("a");

        f.binding.unbind();
        assert!(token.is_cancelled());
        assert_eq!(f.binding.bound_entity(), None);
        assert_eq!(f.binding.content(), CellContent::Empty);

        f.fetcher.resolve("a", Ok("A".into()));
        f.center.post("local-a", Some(0.5));
        f.context.run_pending();
        assert_eq!(f.binding.content(), CellContent::Empty);
        assert_eq!(f.binding.progress(), None);
        assert_eq!(f.center.changed.connection_count(), 0);
    }

    #[test]
    fn test_drop_cancels_request() {
        let f = fixture();
        f.binding.bind(Entity::new("a"));
        let token = f.fetcher.token("a");

        let Fixture {
            context,
            fetcher,
            binding,
            ..
        } = f;
        drop(binding);
        assert!(token.is_cancelled());

        fetcher.resolve("a", Ok("A".into()));
        assert_eq!(context.run_pending(), 1);
    }

    #[test]
    fn test_progress_identity_check() {
        let f = fixture();
        f.binding.bind(Entity::new("a").with_local_id("local-a"));
        f.center.post("local-a", Some(0.25));
        f.center.post("local-b", Some(0.75));
        f.context.run_pending();
        assert_eq!(f.binding.progress(), Some(0.25));

        f.binding.bind(Entity::new("b").with_local_id("local-b"));
        f.center.post("local-a", Some(0.5));
        f.center.post("local-b", None);
        f.context.run_pending();
        assert_eq!(f.binding.progress(), None);
        assert_eq!(
            f.view
                .log
                .lock()
                .iter()
                .filter(|entry| entry.starts_with("progress"))
                .cloned()
                .collect::<Vec<_>>(),
            vec!["progress Some(0.25)", "progress None", "progress None"]
        );
    }

    #[test]
    fn test_rebind_clears_previous_badge() {
        let f = fixture();
        f.binding.bind(Entity::new("a").with_local_id("la"));
        f.center.post("la", Some(0.5));
        f.context.run_pending();
        assert_eq!(f.binding.progress(), Some(0.5));

        f.binding.bind(Entity::new("b").with_local_id("lb"));
        f.context.run_pending();

        assert_eq!(f.binding.progress(), None);
        let log = f.view.log.lock();
        let last_badge = log.iter().rev().find(|entry| entry.starts_with("progress"));
        assert_eq!(last_badge.map(String::as_str), Some("progress None"));
    }

    #[test]
    fn test_rebind_without_badge_leaves_view_alone() {
        let f = fixture();
        f.binding.bind(Entity::new("a").with_local_id("la"));
        f.binding.bind(Entity::new("b").with_local_id("lb"));
        assert!(!f.view.log.lock().iter().any(|entry| entry.starts_with("progress")));
    }
}
