//! View-level change descriptions.
//!
//! Every model mutation is described as a [`ListChange`]. Changes produced
//! inside one [`ListController::perform_updates`](crate::controller::ListController::perform_updates)
//! call are grouped into a single [`ChangeBatch`] that the surface applies
//! atomically.
//!
//! # Index semantics
//!
//! Changes in a batch are ordered. Delete indices refer to positions before
//! that change is applied; insert indices refer to positions after it. Replaying
//! a batch change by change on a plain `Vec` yields the model's order.

use serde::{Deserialize, Serialize};

/// Animation used when the surface applies a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowAnimation {
    /// Cross-fade rows in and out.
    #[default]
    Fade,
    /// Slide rows from or to the top.
    Top,
    /// Let the surface pick a style.
    Automatic,
    /// Apply without animation.
    None,
}

/// One view-level change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChange {
    /// Rows inserted into `section` at the given post-change indices.
    InsertRows { section: usize, rows: Vec<usize> },
    /// Rows deleted from `section` at the given pre-change indices.
    DeleteRows { section: usize, rows: Vec<usize> },
    /// Sections inserted at the given post-change indices.
    InsertSections { sections: Vec<usize> },
    /// Sections deleted at the given pre-change indices.
    DeleteSections { sections: Vec<usize> },
}

/// An ordered group of changes committed as one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeBatch {
    changes: Vec<(ListChange, RowAnimation)>,
}

impl ChangeBatch {
    /// An empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// A batch holding a single change.
    pub fn single(change: ListChange, animation: RowAnimation) -> Self {
        Self {
            changes: vec![(change, animation)],
        }
    }

    pub(crate) fn push(&mut self, change: ListChange, animation: RowAnimation) {
        self.changes.push((change, animation));
    }

    /// The changes in application order.
    pub fn changes(&self) -> &[(ListChange, RowAnimation)] {
        &self.changes
    }

    /// Iterate over the changes without their animations.
    pub fn iter(&self) -> impl Iterator<Item = &ListChange> {
        self.changes.iter().map(|(change, _)| change)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Whether any change in the batch is animated.
    pub fn is_animated(&self) -> bool {
        self.changes
            .iter()
            .any(|(_, animation)| *animation != RowAnimation::None)
    }
}
