//! Progress notifications keyed by local entity id.

use trellis_core::logging::targets;
use trellis_core::{MainContextHandle, Signal, Subscription};

/// A progress update for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub local_id: String,
    /// Fraction complete in `0.0..=1.0`; `None` when the transfer ended.
    pub progress: Option<f32>,
}

/// Broadcasts transfer progress to interested cells.
///
/// Publishers may post from any thread; subscribers receive events on the
/// main context they subscribed with.
#[derive(Debug, Default)]
pub struct ProgressCenter {
    pub changed: Signal<ProgressEvent>,
}

impl ProgressCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish progress for `local_id`.
    pub fn post(&self, local_id: impl Into<String>, progress: Option<f32>) {
        let event = ProgressEvent {
            local_id: local_id.into(),
            progress: progress.map(|p| p.clamp(0.0, 1.0)),
        };
        tracing::trace!(target: targets::CELL, local_id = %event.local_id, progress = ?event.progress, "progress posted");
        self.changed.emit(event);
    }

    /// Receive events on `context` until the subscription is dropped.
    pub fn subscribe<F>(&self, context: &MainContextHandle, handler: F) -> Subscription
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.changed.connect_queued_scoped(context, handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use trellis_core::MainContext;

    #[test]
    fn test_events_delivered_on_context() {
        let context = MainContext::new();
        let center = Arc::new(ProgressCenter::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let subscription = center.subscribe(&context.handle(), move |event| s.lock().push(event.clone()));

        let publisher = center.clone();
        std::thread::spawn(move || publisher.post("file-1", Some(1.5)))
            .join()
            .unwrap();
        assert!(seen.lock().is_empty());

        assert_eq!(context.run_pending(), 1);
        assert_eq!(
            *seen.lock(),
            vec![ProgressEvent {
                local_id: "file-1".into(),
                progress: Some(1.0),
            }]
        );

        drop(subscription);
        center.post("file-1", None);
        assert_eq!(context.run_pending(), 0);
    }
}
