//! Sections: ordered groups of rows.
//!
//! A [`Section`] owns its rows and holds a weak reference to the
//! [`ListController`] it is attached to. Row mutations update the model
//! first and then describe the change to the controller, which forwards it
//! to the list surface when live.
//!
//! ```
//! use trellis::model::{Row, Section};
//!
//! let section = Section::new().with_header("Account");
//! let a = Row::button("A").build();
//! let b = Row::button("B").build();
//! let c = Row::button("C").build();
//! section.add_rows([a.clone(), b.clone(), c.clone()], false);
//!
//! section.remove_row(&b, true);
//! assert_eq!(section.rows(), vec![a, c.clone()]);
//! assert_eq!(c.index(), Some(1));
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use trellis_core::ThreadAffinity;
use trellis_core::logging::targets;

use super::change::ListChange;
use super::radio::RadioGroupCoordinator;
use super::row::{Row, RowEvent, RowSnapshot};
use super::value::RowValue;
use crate::controller::{ControllerInner, ListController};

struct SectionState {
    header: Option<String>,
    footer: Option<String>,
    rows: Vec<Row>,
}

pub(crate) struct SectionInner {
    identifier: Option<String>,
    affinity: ThreadAffinity,
    state: RwLock<SectionState>,
    controller: Mutex<Weak<ControllerInner>>,
    radio: RadioGroupCoordinator,
}

/// A handle to an ordered group of rows with optional header and footer.
#[derive(Clone)]
pub struct Section {
    pub(crate) inner: Arc<SectionInner>,
}

impl Default for Section {
    fn default() -> Self {
        Self::new()
    }
}

impl Section {
    /// Create an empty, detached section bound to the current thread.
    pub fn new() -> Self {
        Self::create(None)
    }

    /// Create an empty section with a lookup identifier.
    pub fn with_identifier(identifier: impl Into<String>) -> Self {
        Self::create(Some(identifier.into()))
    }

    fn create(identifier: Option<String>) -> Self {
        Self {
            inner: Arc::new(SectionInner {
                identifier,
                affinity: ThreadAffinity::current(),
                state: RwLock::new(SectionState {
                    header: None,
                    footer: None,
                    rows: Vec::new(),
                }),
                controller: Mutex::new(Weak::new()),
                radio: RadioGroupCoordinator::new(),
            }),
        }
    }

    /// Builder method to set the header title.
    pub fn with_header(self, header: impl Into<String>) -> Self {
        self.set_header_title(Some(header.into()));
        self
    }

    /// Builder method to set the footer title.
    pub fn with_footer(self, footer: impl Into<String>) -> Self {
        self.set_footer_title(Some(footer.into()));
        self
    }

    pub fn identifier(&self) -> Option<&str> {
        self.inner.identifier.as_deref()
    }

    pub fn header_title(&self) -> Option<String> {
        self.inner.state.read().header.clone()
    }

    pub fn set_header_title(&self, header: Option<String>) {
        self.inner.state.write().header = header;
    }

    pub fn footer_title(&self) -> Option<String> {
        self.inner.state.read().footer.clone()
    }

    pub fn set_footer_title(&self, footer: Option<String>) {
        self.inner.state.write().footer = footer;
    }

    /// A copy of the current rows, in order.
    pub fn rows(&self) -> Vec<Row> {
        self.inner.state.read().rows.clone()
    }

    pub fn row_count(&self) -> usize {
        self.inner.state.read().rows.len()
    }

    pub fn row_at(&self, index: usize) -> Option<Row> {
        self.inner.state.read().rows.get(index).cloned()
    }

    /// Position of `row` in this section.
    pub fn index_of_row(&self, row: &Row) -> Option<usize> {
        self.inner.state.read().rows.iter().position(|r| r == row)
    }

    pub fn contains(&self, row: &Row) -> bool {
        self.index_of_row(row).is_some()
    }

    /// First row whose identifier equals `identifier`.
    pub fn row_with_identifier(&self, identifier: &str) -> Option<Row> {
        self.inner
            .state
            .read()
            .rows
            .iter()
            .find(|row| row.identifier() == Some(identifier))
            .cloned()
    }

    /// Plain-data copies of every row, safe to hand to background work.
    pub fn snapshot(&self) -> Vec<RowSnapshot> {
        self.rows().iter().map(Row::snapshot).collect()
    }

    /// The controller this section is attached to.
    pub fn controller(&self) -> Option<ListController> {
        self.inner
            .controller
            .lock()
            .upgrade()
            .map(|inner| ListController { inner })
    }

    /// Position of this section in its controller.
    pub fn index(&self) -> Option<usize> {
        self.controller()?.index_of_section(self)
    }

    /// Whether the section is part of a controller's model.
    pub fn is_attached(&self) -> bool {
        self.controller().is_some()
    }

    /// Append one row.
    pub fn add_row(&self, row: Row, animated: bool) {
        self.add_rows([row], animated);
    }

    /// Append rows in order.
    ///
    /// Rows already owned by a section are skipped.
    #[tracing::instrument(skip_all, target = "trellis::model", level = "trace")]
    pub fn add_rows(&self, rows: impl IntoIterator<Item = Row>, animated: bool) {
        let end = usize::MAX;
        self.insert_rows(rows, end, animated);
    }

    /// Insert one row at `at`, clamped to the end of the section.
    pub fn insert_row(&self, row: Row, at: usize, animated: bool) {
        self.insert_rows([row], at, animated);
    }

    /// Insert a contiguous block of rows starting at `at`.
    ///
    /// `at` past the end appends. Rows already owned by a section are
    /// skipped. Radio groups stay exclusive: an existing selection wins over
    /// selected rows being inserted, and among those the first one wins.
    pub fn insert_rows(&self, rows: impl IntoIterator<Item = Row>, at: usize, animated: bool) {
        self.inner.affinity.debug_assert_same_thread();

        let claimed = self.claim(rows);
        if claimed.is_empty() {
            return;
        }

        let indices: Vec<usize> = {
            let mut state = self.inner.state.write();
            let start = at.min(state.rows.len());
            state.rows.splice(start..start, claimed.iter().cloned());
            (start..start + claimed.len()).collect()
        };
        tracing::trace!(target: targets::MODEL, ?indices, "rows inserted");

        self.inner.radio.normalize_inserted(&self.rows(), &claimed);
        for row in &claimed {
            row.fire_initial_once();
        }
        self.publish(move |section| ListChange::InsertRows { section, rows: indices }, animated);
    }

    /// Remove one row. Returns `false` if it is not in this section.
    pub fn remove_row(&self, row: &Row, animated: bool) -> bool {
        self.remove_rows(std::slice::from_ref(row), animated) > 0
    }

    /// Remove every listed row that is present; others are ignored.
    ///
    /// Indices are resolved before anything is removed and rows are taken
    /// out from the back, so the reported delete indices refer to the
    /// section as it was. Returns the number of rows removed.
    #[tracing::instrument(skip_all, target = "trellis::model", level = "trace")]
    pub fn remove_rows(&self, rows: &[Row], animated: bool) -> usize {
        self.inner.affinity.debug_assert_same_thread();

        let removed: Vec<(usize, Row)> = {
            let mut state = self.inner.state.write();
            let mut indices: Vec<usize> = rows
                .iter()
                .filter_map(|row| {
                    let index = state.rows.iter().position(|r| r == row);
                    if index.is_none() {
                        tracing::debug!(target: targets::MODEL, row = row.id().as_u64(), "row not in section; ignoring removal");
                    }
                    index
                })
                .collect();
            indices.sort_unstable();
            indices.dedup();

            let mut removed: Vec<(usize, Row)> = indices
                .iter()
                .rev()
                .map(|&index| (index, state.rows.remove(index)))
                .collect();
            removed.reverse();
            removed
        };
        if removed.is_empty() {
            return 0;
        }

        for (_, row) in &removed {
            row.clear_parent();
        }
        let indices: Vec<usize> = removed.iter().map(|(index, _)| *index).collect();
        tracing::trace!(target: targets::MODEL, ?indices, "rows removed");
        self.publish(move |section| ListChange::DeleteRows { section, rows: indices }, animated);
        removed.len()
    }

    /// Build radio rows from `(label, value)` pairs and append them.
    ///
    /// The first option whose value equals `selected` starts out selected,
    /// unless the section already has a selected row in `group`. Returns the new rows so callers can attach actions.
    pub fn add_radio_group<L, V>(
        &self,
        options: impl IntoIterator<Item = (L, V)>,
        group: &str,
        selected: Option<&RowValue>,
        animated: bool,
    ) -> Vec<Row>
    where
        L: Into<String>,
        V: Into<RowValue>,
    {
        let mut has_selection = false;
        let rows: Vec<Row> = options
            .into_iter()
            .map(|(label, value)| {
                let value = value.into();
                let is_selected = !has_selection && selected == Some(&value);
                has_selection |= is_selected;
                Row::radio(label, value, group).selected(is_selected).build()
            })
            .collect();
        self.add_rows(rows.iter().cloned(), animated);
        rows
    }

    /// Select the option of `group` whose value is `value`.
    pub fn set_selected(&self, value: &RowValue, group: &str) -> Option<Row> {
        self.inner.affinity.debug_assert_same_thread();
        self.inner.radio.select_value(&self.rows(), group, value)
    }

    /// The value of the selected option of `group`.
    pub fn selected_value(&self, group: &str) -> Option<RowValue> {
        self.inner.radio.selected_value(&self.rows(), group)
    }

    /// The selected option of `group`.
    pub fn selected_row(&self, group: &str) -> Option<Row> {
        self.inner.radio.selected_row(&self.rows(), group)
    }

    /// The coordinator enforcing radio exclusivity for this section.
    pub fn radio_groups(&self) -> &RadioGroupCoordinator {
        &self.inner.radio
    }

    pub(crate) fn select_radio_row(&self, row: &Row) -> bool {
        self.inner.radio.select_row(&self.rows(), row)
    }

    pub(crate) fn dispatch_event(&self, event: RowEvent) {
        for row in self.rows() {
            row.dispatch_event(event);
        }
    }

    pub(crate) fn set_controller(&self, controller: &Arc<ControllerInner>) {
        *self.inner.controller.lock() = Arc::downgrade(controller);
    }

    pub(crate) fn clear_controller(&self) {
        *self.inner.controller.lock() = Weak::new();
    }

    /// Take ownership of rows that are not already in a section.
    fn claim(&self, rows: impl IntoIterator<Item = Row>) -> Vec<Row> {
        let mut claimed = Vec::new();
        for row in rows {
            if row.section().is_some() {
                tracing::debug!(target: targets::MODEL, row = row.id().as_u64(), "row already in a section; ignoring");
                continue;
            }
            row.set_parent(&self.inner);
            claimed.push(row);
        }
        claimed
    }

    /// Forward a change to the controller if this section is attached.
    fn publish<F>(&self, change: F, animated: bool)
    where
        F: FnOnce(usize) -> ListChange,
    {
        let Some(controller) = self.controller() else {
            return;
        };
        if let Some(section) = controller.index_of_section(self) {
            controller.submit(change(section), animated);
        }
    }
}

impl PartialEq for Section {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Section {}

impl fmt::Debug for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Section")
            .field("identifier", &self.inner.identifier)
            .field("header", &state.header)
            .field("rows", &state.rows.len())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(Section: Send, Sync, Clone);
