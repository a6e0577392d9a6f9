//! Observer signals for list controllers.

use trellis_core::Signal;

use crate::model::{IndexPath, ListChange};

/// Signals a [`ListController`](super::ListController) emits as its model changes.
///
/// Change signals fire once the model is updated, whether or not the surface
/// is live. Index arguments follow [`ListChange`] semantics.
pub struct ListSignals {
    /// Emitted after rows have been inserted.
    /// Args: (section, post-change row indices)
    pub rows_inserted: Signal<(usize, Vec<usize>)>,

    /// Emitted after rows have been removed.
    /// Args: (section, pre-change row indices)
    pub rows_removed: Signal<(usize, Vec<usize>)>,

    /// Emitted after sections have been inserted.
    pub sections_inserted: Signal<Vec<usize>>,

    /// Emitted after sections have been removed.
    pub sections_removed: Signal<Vec<usize>>,

    /// Emitted after the surface performed a full reload.
    pub reloaded: Signal<()>,

    /// Emitted after a row was activated through selection.
    pub row_selected: Signal<IndexPath>,
}

impl Default for ListSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl ListSignals {
    pub fn new() -> Self {
        Self {
            rows_inserted: Signal::new(),
            rows_removed: Signal::new(),
            sections_inserted: Signal::new(),
            sections_removed: Signal::new(),
            reloaded: Signal::new(),
            row_selected: Signal::new(),
        }
    }

    pub(crate) fn emit_change(&self, change: &ListChange) {
        match change {
            ListChange::InsertRows { section, rows } => {
                self.rows_inserted.emit((*section, rows.clone()));
            }
            ListChange::DeleteRows { section, rows } => {
                self.rows_removed.emit((*section, rows.clone()));
            }
            ListChange::InsertSections { sections } => {
                self.sections_inserted.emit(sections.clone());
            }
            ListChange::DeleteSections { sections } => {
                self.sections_removed.emit(sections.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_emit_change_routes_by_kind() {
        let signals = ListSignals::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l = log.clone();
        signals
            .rows_removed
            .connect(move |(section, rows)| l.lock().push(format!("rows- {section} {rows:?}")));
        let l = log.clone();
        signals
            .sections_inserted
            .connect(move |sections| l.lock().push(format!("sections+ {sections:?}")));

        signals.emit_change(&ListChange::DeleteRows { section: 1, rows: vec![0, 2] });
        signals.emit_change(&ListChange::InsertSections { sections: vec![3] });
        signals.emit_change(&ListChange::InsertRows { section: 0, rows: vec![0] });

        assert_eq!(*log.lock(), vec!["rows- 1 [0, 2]", "sections+ [3]"]);
    }
}
