//! Prefetch windows for proactive asset caching.
//!
//! While a list scrolls, assets slightly outside the visible area are worth
//! caching ahead of time. [`PrefetchWindowDiffer`] tracks a "preheat" rect
//! (the visible rect grown vertically) and reports which bands entered or
//! left it since the last recomputation.

use trellis_core::logging::targets;

use crate::config::PrefetchConfig;
use crate::geometry::Rect;

/// Regions that entered and left the preheat window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RectDiff {
    pub added: Vec<Rect>,
    pub removed: Vec<Rect>,
}

impl RectDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compute the bands added and removed when moving from `old` to `new`.
///
/// For overlapping rects this yields at most two added and two removed
/// horizontal bands, all spanning the new rect's x range. Disjoint rects are
/// replaced wholesale.
pub fn differences_between_rects(old: Rect, new: Rect) -> RectDiff {
    if !old.intersects(&new) {
        return RectDiff {
            added: vec![new],
            removed: vec![old],
        };
    }

    let x = new.min_x();
    let width = new.width();
    let mut diff = RectDiff::default();

    if new.max_y() > old.max_y() {
        diff.added.push(Rect::new(x, old.max_y(), width, new.max_y() - old.max_y()));
    }
    if old.min_y() > new.min_y() {
        diff.added.push(Rect::new(x, new.min_y(), width, old.min_y() - new.min_y()));
    }
    if new.max_y() < old.max_y() {
        diff.removed.push(Rect::new(x, new.max_y(), width, old.max_y() - new.max_y()));
    }
    if old.min_y() < new.min_y() {
        diff.removed.push(Rect::new(x, old.min_y(), width, new.min_y() - old.min_y()));
    }
    diff
}

/// A cache that can warm and evict assets by on-screen region.
pub trait AssetCache {
    fn start_caching(&self, rects: &[Rect]);

    fn stop_caching(&self, rects: &[Rect]);

    fn stop_all(&self);
}

/// Tracks the preheat window across scroll updates.
#[derive(Debug, Clone)]
pub struct PrefetchWindowDiffer {
    previous: Rect,
    config: PrefetchConfig,
}

impl Default for PrefetchWindowDiffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefetchWindowDiffer {
    pub fn new() -> Self {
        Self::with_config(PrefetchConfig::default())
    }

    pub fn with_config(config: PrefetchConfig) -> Self {
        Self {
            previous: Rect::ZERO,
            config,
        }
    }

    /// The preheat rect of the last recomputation.
    pub fn previous(&self) -> Rect {
        self.previous
    }

    /// The visible rect grown by the margin above and below.
    pub fn preheat_rect(&self, visible: Rect) -> Rect {
        visible.inset_by(0.0, -self.config.margin_factor * visible.height())
    }

    /// Recompute the preheat window for a new visible rect.
    ///
    /// Returns `None` while the window has moved less than the throttle
    /// distance; the stored window is then left unchanged. Empty bands are
    /// dropped from the result.
    pub fn update(&mut self, visible: Rect, viewport_height: f32) -> Option<RectDiff> {
        let preheat = self.preheat_rect(visible);
        let delta = (preheat.mid_y() - self.previous.mid_y()).abs();
        if delta <= viewport_height * self.config.throttle_fraction {
            return None;
        }

        let mut diff = differences_between_rects(self.previous, preheat);
        diff.added.retain(|rect| !rect.is_empty());
        diff.removed.retain(|rect| !rect.is_empty());
        tracing::trace!(
            target: targets::PREFETCH,
            delta,
            added = diff.added.len(),
            removed = diff.removed.len(),
            "preheat window moved"
        );

        self.previous = preheat;
        Some(diff)
    }

    /// Run [`update`](Self::update) and forward the result to `cache`.
    ///
    /// Returns whether the window was recomputed.
    pub fn update_cache(&mut self, visible: Rect, viewport_height: f32, cache: &dyn AssetCache) -> bool {
        let Some(diff) = self.update(visible, viewport_height) else {
            return false;
        };
        if !diff.added.is_empty() {
            cache.start_caching(&diff.added);
        }
        if !diff.removed.is_empty() {
            cache.stop_caching(&diff.removed);
        }
        true
    }

    /// Stop all caching and forget the previous window.
    pub fn reset(&mut self, cache: &dyn AssetCache) {
        cache.stop_all();
        self.previous = Rect::ZERO;
    }
}
