//! List controllers.
//!
//! A [`ListController`] owns an ordered list of [`Section`]s and bridges them
//! to a platform [`ListSurface`]. It answers the surface's data-source queries,
//! routes selection to row actions, and decides whether a model change is
//! applied live or deferred to the next appearance.
//!
//! # Live and deferred updates
//!
//! Changes reach the surface only while it is attached and the list has been
//! shown at least once. Otherwise the model is updated, the controller marks
//! itself as needing a reload, and the next [`view_will_appear`] reloads the
//! surface once.
//!
//! # Batching
//!
//! Mutations inside [`perform_updates`] are collected into one
//! [`ChangeBatch`] and handed to the surface in a single
//! [`ListSurface::apply`] call when the outermost batch closes:
//!
//! ```
//! use std::sync::Arc;
//! use trellis::controller::{ListController, ListSurface};
//! use trellis::model::{ChangeBatch, Row, Section};
//!
//! struct Log;
//! impl ListSurface for Log {
//!     fn apply(&self, batch: &ChangeBatch) {
//!         assert_eq!(batch.len(), 2);
//!     }
//!     fn reload_data(&self) {}
//! }
//!
//! let controller = ListController::new();
//! let section = Section::new();
//! controller.add_section(section.clone(), false);
//! controller.attach_surface(Arc::new(Log));
//! controller.view_will_appear();
//!
//! controller.perform_updates(|| {
//!     section.add_row(Row::button("Sign in").build(), true);
//!     section.add_row(Row::button("Help").build(), true);
//! });
//! ```
//!
//! [`view_will_appear`]: ListController::view_will_appear
//! [`perform_updates`]: ListController::perform_updates

mod signals;
mod surface;

pub use signals::ListSignals;
pub use surface::ListSurface;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use trellis_core::logging::{span_names, targets};
use trellis_core::{PerfSpan, ThreadAffinity};

use crate::config::ListConfig;
use crate::model::{ChangeBatch, IndexPath, ListChange, Row, RowAnimation, RowEvent, Section};

/// Closes a batch level on drop, including during unwinding.
struct BatchLevel<'a> {
    controller: &'a ListController,
}

impl Drop for BatchLevel<'_> {
    fn drop(&mut self) {
        self.controller.close_batch_level();
    }
}

/// Whether, and how, the hosting list is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentationState {
    /// The list has not appeared yet.
    #[default]
    NeverShown,
    /// The list is visible.
    Foreground,
    /// The list was shown before and is currently off screen.
    Background,
}

struct PendingBatch {
    depth: usize,
    batch: ChangeBatch,
}

pub(crate) struct ControllerInner {
    affinity: ThreadAffinity,
    config: ListConfig,
    sections: RwLock<Vec<Section>>,
    surface: RwLock<Option<Arc<dyn ListSurface>>>,
    presentation: Mutex<PresentationState>,
    needs_reload: AtomicBool,
    pending: Mutex<Option<PendingBatch>>,
    signals: ListSignals,
}

/// A handle to a list's section model and its surface bridge.
///
/// Clones refer to the same controller.
#[derive(Clone)]
pub struct ListController {
    pub(crate) inner: Arc<ControllerInner>,
}

impl Default for ListController {
    fn default() -> Self {
        Self::new()
    }
}

impl ListController {
    /// Create an empty controller with default configuration.
    pub fn new() -> Self {
        Self::with_config(ListConfig::default())
    }

    pub fn with_config(config: ListConfig) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                affinity: ThreadAffinity::current(),
                config,
                sections: RwLock::new(Vec::new()),
                surface: RwLock::new(None),
                presentation: Mutex::new(PresentationState::NeverShown),
                needs_reload: AtomicBool::new(true),
                pending: Mutex::new(None),
                signals: ListSignals::new(),
            }),
        }
    }

    pub fn config(&self) -> &ListConfig {
        &self.inner.config
    }

    /// Signals describing model changes and selection.
    pub fn signals(&self) -> &ListSignals {
        &self.inner.signals
    }

    pub fn presentation_state(&self) -> PresentationState {
        *self.inner.presentation.lock()
    }

    /// Whether the next appearance will fully reload the surface.
    pub fn needs_reload(&self) -> bool {
        self.inner.needs_reload.load(Ordering::Acquire)
    }

    /// Whether changes are currently forwarded to the surface.
    pub fn needs_live_updates(&self) -> bool {
        self.live_surface().is_some()
    }

    // =========================================================================
    // Surface and lifecycle
    // =========================================================================

    /// Attach the surface that renders this controller.
    ///
    /// The surface always starts from a full reload: immediately if the list
    /// has been shown, otherwise on the next appearance.
    pub fn attach_surface(&self, surface: Arc<dyn ListSurface>) {
        self.inner.affinity.debug_assert_same_thread();
        *self.inner.surface.write() = Some(surface);
        self.inner.needs_reload.store(true, Ordering::Release);
        if self.presentation_state() != PresentationState::NeverShown {
            self.reload_if_needed();
        }
    }

    /// Detach and return the current surface.
    pub fn detach_surface(&self) -> Option<Arc<dyn ListSurface>> {
        self.inner.surface.write().take()
    }

    pub fn has_surface(&self) -> bool {
        self.inner.surface.read().is_some()
    }

    /// The hosting list is about to appear.
    pub fn view_will_appear(&self) {
        self.set_presentation(PresentationState::Foreground);
        self.reload_if_needed();
        self.dispatch_event(RowEvent::ListWillAppear);
    }

    pub fn view_will_disappear(&self) {
        self.dispatch_event(RowEvent::ListWillDisappear);
    }

    pub fn view_did_disappear(&self) {
        self.set_presentation(PresentationState::Background);
        self.dispatch_event(RowEvent::ListDidDisappear);
    }

    /// The application returned to the foreground.
    pub fn app_did_become_active(&self) {
        self.dispatch_event(RowEvent::AppBecameActive);
    }

    /// The application moved to the background.
    pub fn enter_background(&self) {
        if self.presentation_state() == PresentationState::Foreground {
            self.set_presentation(PresentationState::Background);
        }
    }

    /// Reload the surface now, or on the next appearance if there is none.
    pub fn reload_data(&self) {
        self.inner.needs_reload.store(true, Ordering::Release);
        self.reload_if_needed();
    }

    /// Deliver `event` to every row of every section.
    pub fn dispatch_event(&self, event: RowEvent) {
        for section in self.sections() {
            section.dispatch_event(event);
        }
    }

    fn set_presentation(&self, state: PresentationState) {
        let previous = std::mem::replace(&mut *self.inner.presentation.lock(), state);
        if previous != state {
            tracing::trace!(target: targets::CONTROLLER, ?previous, ?state, "presentation changed");
        }
    }

    fn reload_if_needed(&self) {
        let Some(surface) = self.surface() else {
            return;
        };
        if self.inner.needs_reload.swap(false, Ordering::AcqRel) {
            tracing::debug!(target: targets::CONTROLLER, sections = self.number_of_sections(), "reloading surface");
            surface.reload_data();
            self.inner.signals.reloaded.emit(());
        }
    }

    fn surface(&self) -> Option<Arc<dyn ListSurface>> {
        self.inner.surface.read().clone()
    }

    fn live_surface(&self) -> Option<Arc<dyn ListSurface>> {
        if self.presentation_state() == PresentationState::NeverShown {
            return None;
        }
        self.surface()
    }

    // =========================================================================
    // Change submission
    // =========================================================================

    /// Group every model change made by `f` into one surface update.
    ///
    /// Calls nest; the surface sees the batch when the outermost call returns.
    /// If `f` panics the batch level is still closed; an unwinding outermost
    /// batch is dropped and the next commit reloads the surface instead.
    pub fn perform_updates<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.inner.affinity.debug_assert_same_thread();
        let _span = PerfSpan::new(span_names::BATCH);

        {
            let mut pending = self.inner.pending.lock();
            match pending.as_mut() {
                Some(open) => open.depth += 1,
                None => {
                    *pending = Some(PendingBatch {
                        depth: 1,
                        batch: ChangeBatch::new(),
                    })
                }
            }
        }

        let _level = BatchLevel { controller: self };
        f()
    }

    /// Close one `perform_updates` level, committing when it was the last.
    fn close_batch_level(&self) {
        let finished = {
            let mut pending = self.inner.pending.lock();
            match pending.as_mut() {
                Some(open) if open.depth > 1 => {
                    open.depth -= 1;
                    None
                }
                _ => pending.take().map(|open| open.batch),
            }
        };
        let Some(batch) = finished.filter(|batch| !batch.is_empty()) else {
            return;
        };
        if std::thread::panicking() {
            tracing::warn!(target: targets::CONTROLLER, changes = batch.len(), "batch abandoned by panic; reload scheduled");
            self.inner.needs_reload.store(true, Ordering::Release);
            return;
        }
        self.commit(batch);
    }

    /// Record a change the model has already made.
    pub(crate) fn submit(&self, change: ListChange, animated: bool) {
        let animation = if animated {
            self.inner.config.animation
        } else {
            RowAnimation::None
        };

        let batched = {
            let mut pending = self.inner.pending.lock();
            match pending.as_mut() {
                Some(open) => {
                    open.batch.push(change.clone(), animation);
                    true
                }
                None => false,
            }
        };
        if !batched {
            self.commit(ChangeBatch::single(change.clone(), animation));
        }
        self.inner.signals.emit_change(&change);
    }

    fn commit(&self, batch: ChangeBatch) {
        match self.live_surface() {
            Some(surface) if self.inner.needs_reload.swap(false, Ordering::AcqRel) => {
                tracing::debug!(target: targets::CONTROLLER, changes = batch.len(), "surface out of sync; reloading instead");
                surface.reload_data();
                self.inner.signals.reloaded.emit(());
            }
            Some(surface) => {
                tracing::trace!(target: targets::CONTROLLER, changes = batch.len(), animated = batch.is_animated(), "applying batch");
                surface.apply(&batch);
            }
            None => {
                tracing::trace!(target: targets::CONTROLLER, changes = batch.len(), "surface not live; deferring to reload");
                self.inner.needs_reload.store(true, Ordering::Release);
            }
        }
    }

    // =========================================================================
    // Section mutation
    // =========================================================================

    /// Append a section.
    pub fn add_section(&self, section: Section, animated: bool) {
        self.insert_sections([section], usize::MAX, animated);
    }

    pub fn add_sections(&self, sections: impl IntoIterator<Item = Section>, animated: bool) {
        self.insert_sections(sections, usize::MAX, animated);
    }

    /// Insert a section at `at`, clamped to the end.
    pub fn insert_section(&self, section: Section, at: usize, animated: bool) {
        self.insert_sections([section], at, animated);
    }

    /// Insert a contiguous block of sections starting at `at`.
    ///
    /// Sections already owned by a controller are skipped.
    pub fn insert_sections(&self, sections: impl IntoIterator<Item = Section>, at: usize, animated: bool) {
        self.inner.affinity.debug_assert_same_thread();

        let mut claimed = Vec::new();
        for section in sections {
            if section.is_attached() {
                tracing::debug!(target: targets::MODEL, ?section, "section already in a controller; ignoring");
                continue;
            }
            section.set_controller(&self.inner);
            claimed.push(section);
        }
        if claimed.is_empty() {
            return;
        }

        let indices: Vec<usize> = {
            let mut current = self.inner.sections.write();
            let start = at.min(current.len());
            current.splice(start..start, claimed.iter().cloned());
            (start..start + claimed.len()).collect()
        };
        tracing::trace!(target: targets::MODEL, ?indices, "sections inserted");
        self.submit(ListChange::InsertSections { sections: indices }, animated);
    }

    /// Remove a section. Returns `false` if it is not in this controller.
    pub fn remove_section(&self, section: &Section, animated: bool) -> bool {
        self.remove_sections(std::slice::from_ref(section), animated) > 0
    }

    /// Remove every listed section that is present; others are ignored.
    ///
    /// Returns the number of sections removed.
    pub fn remove_sections(&self, sections: &[Section], animated: bool) -> usize {
        self.inner.affinity.debug_assert_same_thread();

        let removed: Vec<(usize, Section)> = {
            let mut current = self.inner.sections.write();
            let mut indices: Vec<usize> = sections
                .iter()
                .filter_map(|section| {
                    let index = current.iter().position(|s| s == section);
                    if index.is_none() {
                        tracing::debug!(target: targets::MODEL, ?section, "section not in controller; ignoring removal");
                    }
                    index
                })
                .collect();
            indices.sort_unstable();
            indices.dedup();

            let mut removed: Vec<(usize, Section)> = indices
                .iter()
                .rev()
                .map(|&index| (index, current.remove(index)))
                .collect();
            removed.reverse();
            removed
        };
        if removed.is_empty() {
            return 0;
        }

        for (_, section) in &removed {
            section.clear_controller();
        }
        let indices: Vec<usize> = removed.iter().map(|(index, _)| *index).collect();
        tracing::trace!(target: targets::MODEL, ?indices, "sections removed");
        self.submit(ListChange::DeleteSections { sections: indices }, animated);
        removed.len()
    }

    // =========================================================================
    // Data-source queries
    // =========================================================================

    pub fn number_of_sections(&self) -> usize {
        self.inner.sections.read().len()
    }

    /// Row count of `section`; zero when out of range.
    pub fn number_of_rows(&self, section: usize) -> usize {
        self.section_at(section).map_or(0, |s| s.row_count())
    }

    pub fn header_title(&self, section: usize) -> Option<String> {
        self.section_at(section)?.header_title()
    }

    pub fn footer_title(&self, section: usize) -> Option<String> {
        self.section_at(section)?.footer_title()
    }

    pub fn section_at(&self, index: usize) -> Option<Section> {
        self.inner.sections.read().get(index).cloned()
    }

    pub fn row_at(&self, path: IndexPath) -> Option<Row> {
        self.section_at(path.section)?.row_at(path.row)
    }

    /// A copy of the current sections, in order.
    pub fn sections(&self) -> Vec<Section> {
        self.inner.sections.read().clone()
    }

    pub fn index_of_section(&self, section: &Section) -> Option<usize> {
        self.inner.sections.read().iter().position(|s| s == section)
    }

    /// First section whose identifier equals `identifier`.
    pub fn section_for_identifier(&self, identifier: &str) -> Option<Section> {
        self.inner
            .sections
            .read()
            .iter()
            .find(|section| section.identifier() == Some(identifier))
            .cloned()
    }

    /// Look a row up by identifier within `section`, or across all sections.
    pub fn row_in_section(&self, section: Option<&Section>, identifier: &str) -> Option<Row> {
        match section {
            Some(section) => section.row_with_identifier(identifier),
            None => self.row_with_identifier(identifier),
        }
    }

    /// First row, in section order, whose identifier equals `identifier`.
    pub fn row_with_identifier(&self, identifier: &str) -> Option<Row> {
        self.sections()
            .iter()
            .find_map(|section| section.row_with_identifier(identifier))
    }

    /// Position of `row` in this controller.
    pub fn index_path_of(&self, row: &Row) -> Option<IndexPath> {
        let section = row.section()?;
        let section_index = self.index_of_section(&section)?;
        Some(IndexPath::new(section_index, section.index_of_row(row)?))
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Route a selection at `path` to its row.
    ///
    /// Runs the row's action when it is enabled and selectable, then asks the
    /// surface to clear the highlight. Returns whether the row was activated.
    pub fn select(&self, path: IndexPath) -> bool {
        self.inner.affinity.debug_assert_same_thread();

        let Some(row) = self.row_at(path) else {
            tracing::debug!(target: targets::CONTROLLER, %path, "selection outside the model");
            return false;
        };
        if !row.activate() {
            return false;
        }

        self.inner.signals.row_selected.emit(path);
        if let Some(surface) = self.surface() {
            surface.deselect(path, self.inner.config.deselect_animated);
        }
        true
    }
}

impl PartialEq for ListController {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ListController {}

impl fmt::Debug for ListController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListController")
            .field("sections", &self.number_of_sections())
            .field("presentation", &self.presentation_state())
            .field("needs_reload", &self.needs_reload())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(ListController: Send, Sync, Clone);
