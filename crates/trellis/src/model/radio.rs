//! Radio group coordination.
//!
//! Rows sharing a group identifier form a radio group. The coordinator keeps
//! at most one of them marked selected: selecting one option unmarks every
//! other row of the same group. Rows are scanned linearly, which is fine at
//! settings-screen scale.
//!
//! The coordinator does not own rows; each [`Section`](super::Section) passes
//! its current rows in.

use trellis_core::Signal;
use trellis_core::logging::targets;

use super::row::Row;
use super::value::RowValue;

/// Enforces exclusive selection within radio groups.
pub struct RadioGroupCoordinator {
    /// Emitted after a selection with `(group, selected value)`.
    pub selection_changed: Signal<(String, RowValue)>,
}

impl Default for RadioGroupCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioGroupCoordinator {
    pub fn new() -> Self {
        Self {
            selection_changed: Signal::new(),
        }
    }

    /// Make `target` the selected option of its group.
    ///
    /// Returns `false` if `target` has no group or is not among `rows`.
    pub fn select_row(&self, rows: &[Row], target: &Row) -> bool {
        let Some(group) = target.group_identifier() else {
            return false;
        };
        if !rows.contains(target) {
            tracing::debug!(target: targets::MODEL, group, "radio row not in section; ignoring");
            return false;
        }

        for row in Self::members(rows, group) {
            row.set_selected_mark(row == target);
        }
        if let Some(value) = target.value() {
            self.selection_changed.emit((group.to_string(), value));
        }
        true
    }

    /// Select the first option of `group` whose value equals `value`.
    ///
    /// Every other option is unmarked; if nothing matches, the group ends up
    /// with no selection.
    pub fn select_value(&self, rows: &[Row], group: &str, value: &RowValue) -> Option<Row> {
        let target = Self::members(rows, group)
            .find(|row| row.value().as_ref() == Some(value))
            .cloned();

        for row in Self::members(rows, group) {
            row.set_selected_mark(Some(row) == target.as_ref());
        }
        if target.is_some() {
            self.selection_changed.emit((group.to_string(), value.clone()));
        } else {
            tracing::debug!(target: targets::MODEL, group, ?value, "no radio option with value");
        }
        target
    }

    /// Restore exclusivity after `inserted` joined `rows`.
    ///
    /// A selection that was already in `rows` before the insert wins;
    /// otherwise the first selected row of `inserted` does. Every other
    /// member of an affected group is unmarked. Returns how many rows were
    /// unmarked. No `selection_changed` is emitted.
    pub fn normalize_inserted(&self, rows: &[Row], inserted: &[Row]) -> usize {
        let mut groups: Vec<&str> = Vec::new();
        for row in inserted.iter().filter(|row| row.is_selected()) {
            if let Some(group) = row.group_identifier() {
                if !groups.contains(&group) {
                    groups.push(group);
                }
            }
        }

        let mut unmarked = 0;
        for group in groups {
            let keeper = Self::members(rows, group)
                .find(|row| row.is_selected() && !inserted.contains(row))
                .or_else(|| {
                    inserted
                        .iter()
                        .find(|row| row.group_identifier() == Some(group) && row.is_selected())
                })
                .cloned();
            let count = Self::members(rows, group)
                .filter(|row| Some(*row) != keeper.as_ref())
                .filter(|row| row.set_selected_mark(false))
                .count();
            if count > 0 {
                tracing::debug!(target: targets::MODEL, group, count, "duplicate radio selection unmarked");
            }
            unmarked += count;
        }
        unmarked
    }

    /// The selected option of `group`.
    pub fn selected_row(&self, rows: &[Row], group: &str) -> Option<Row> {
        Self::members(rows, group).find(|row| row.is_selected()).cloned()
    }

    /// The value of the selected option of `group`.
    pub fn selected_value(&self, rows: &[Row], group: &str) -> Option<RowValue> {
        self.selected_row(rows, group).and_then(|row| row.value())
    }

    fn members<'a>(rows: &'a [Row], group: &'a str) -> impl Iterator<Item = &'a Row> + 'a {
        rows.iter()
            .filter(move |row| row.group_identifier() == Some(group))
    }
}
