//! Theme propagation.
//!
//! A [`ThemeContext`] holds the current theme value and notifies appliers when
//! it changes. The theme type is opaque here; color computation belongs to
//! the application.

use parking_lot::RwLock;
use trellis_core::logging::targets;
use trellis_core::{Signal, Subscription};

/// Publishes a theme value to subscribed appliers.
pub struct ThemeContext<T: Clone + Send + Sync + 'static> {
    current: RwLock<T>,
    changed: Signal<T>,
}

impl<T: Clone + Send + Sync + 'static> ThemeContext<T> {
    pub fn new(theme: T) -> Self {
        Self {
            current: RwLock::new(theme),
            changed: Signal::new(),
        }
    }

    /// A copy of the current theme.
    pub fn current(&self) -> T {
        self.current.read().clone()
    }

    /// Replace the theme and notify every applier.
    pub fn set_theme(&self, theme: T) {
        *self.current.write() = theme.clone();
        let notified = self.changed.emit(theme);
        tracing::debug!(target: targets::THEME, notified, "theme changed");
    }

    /// Call `applier` on every theme change until the subscription is dropped.
    ///
    /// With `apply_immediately` the applier also runs once with the current
    /// theme before this returns.
    pub fn subscribe<F>(&self, applier: F, apply_immediately: bool) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        if apply_immediately {
            applier(&self.current());
        }
        self.changed.connect_scoped(applier)
    }

    pub fn subscriber_count(&self) -> usize {
        self.changed.connection_count()
    }
}

impl<T: Clone + Send + Sync + Default + 'static> Default for ThemeContext<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
