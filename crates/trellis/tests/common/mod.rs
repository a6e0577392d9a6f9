//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use trellis::controller::{ListController, ListSurface};
use trellis::model::{ChangeBatch, IndexPath, ListChange, Row, Section};
use trellis::trellis_core::Subscription;

/// A surface that records every call and mirrors the model from batches.
#[derive(Default)]
pub struct RecordingSurface {
    pub batches: Mutex<Vec<ChangeBatch>>,
    pub reloads: Mutex<usize>,
    pub deselected: Mutex<Vec<IndexPath>>,
}

impl ListSurface for RecordingSurface {
    fn apply(&self, batch: &ChangeBatch) {
        self.batches.lock().push(batch.clone());
    }

    fn reload_data(&self) {
        *self.reloads.lock() += 1;
    }

    fn deselect(&self, path: IndexPath, _animated: bool) {
        self.deselected.lock().push(path);
    }
}

impl RecordingSurface {
    pub fn reload_count(&self) -> usize {
        *self.reloads.lock()
    }

    pub fn change_count(&self) -> usize {
        self.batches.lock().iter().map(ChangeBatch::len).sum()
    }
}

/// Controller with a surface attached and already on screen.
pub fn live_controller() -> (ListController, Arc<RecordingSurface>) {
    let controller = ListController::new();
    let surface = Arc::new(RecordingSurface::default());
    controller.attach_surface(surface.clone());
    controller.view_will_appear();
    (controller, surface)
}

pub fn row(name: &str) -> Row {
    Row::button(name).identifier(name).build()
}

pub fn identifiers(section: &Section) -> Vec<String> {
    section
        .rows()
        .iter()
        .filter_map(|row| row.identifier().map(str::to_string))
        .collect()
}

/// A view-side copy of a single section, updated only through changes.
pub struct Mirror {
    pub rows: Vec<String>,
}

impl Mirror {
    pub fn new(rows: Vec<String>) -> Self {
        Self { rows }
    }

    /// Replay `batch` the way a list view would.
    ///
    /// Inserted positions are filled from `model`, the model's final order,
    /// which is what a view reads back for inserted index paths.
    pub fn replay(&mut self, batch: &ChangeBatch, model: &[String]) {
        for change in batch.iter() {
            match change {
                ListChange::DeleteRows { rows, .. } => {
                    for &index in rows.iter().rev() {
                        self.rows.remove(index);
                    }
                }
                ListChange::InsertRows { rows, .. } => {
                    for &index in rows {
                        self.rows.insert(index, model[index].clone());
                    }
                }
                other => panic!("unexpected change in single-section mirror: {other:?}"),
            }
        }
    }
}

/// Row identifiers of every section, in controller order.
pub fn layout(controller: &ListController) -> Vec<Vec<String>> {
    controller.sections().iter().map(identifiers).collect()
}

/// Capture the controller's layout right after each change is made.
///
/// Snapshots line up one-to-one with the changes the controller reports,
/// batched or not. Drop the subscriptions to stop recording.
pub fn record_layouts(controller: &ListController) -> (Arc<Mutex<Vec<Vec<Vec<String>>>>>, Vec<Subscription>) {
    let snapshots = Arc::new(Mutex::new(Vec::new()));
    let signals = controller.signals();

    let record = |snapshots: &Arc<Mutex<Vec<Vec<Vec<String>>>>>| {
        let snapshots = snapshots.clone();
        let controller = controller.clone();
        move || snapshots.lock().push(layout(&controller))
    };
    let on_rows_inserted = record(&snapshots);
    let on_rows_removed = record(&snapshots);
    let on_sections_inserted = record(&snapshots);
    let on_sections_removed = record(&snapshots);
    let subscriptions = vec![
        signals.rows_inserted.connect_scoped(move |_| on_rows_inserted()),
        signals.rows_removed.connect_scoped(move |_| on_rows_removed()),
        signals.sections_inserted.connect_scoped(move |_| on_sections_inserted()),
        signals.sections_removed.connect_scoped(move |_| on_sections_removed()),
    ];
    (snapshots, subscriptions)
}

/// A view-side copy of every section, updated only through changes.
#[derive(Debug, Default)]
pub struct LayoutMirror {
    pub sections: Vec<Vec<String>>,
}

impl LayoutMirror {
    /// Apply one change. `after` is the model layout once that change was
    /// made; inserted rows and sections read their content from it.
    pub fn apply(&mut self, change: &ListChange, after: &[Vec<String>]) {
        match change {
            ListChange::DeleteRows { section, rows } => {
                for &index in rows.iter().rev() {
                    self.sections[*section].remove(index);
                }
            }
            ListChange::InsertRows { section, rows } => {
                for &index in rows {
                    self.sections[*section].insert(index, after[*section][index].clone());
                }
            }
            ListChange::DeleteSections { sections } => {
                for &index in sections.iter().rev() {
                    self.sections.remove(index);
                }
            }
            ListChange::InsertSections { sections } => {
                for &index in sections {
                    self.sections.insert(index, after[index].clone());
                }
            }
        }
    }
}
