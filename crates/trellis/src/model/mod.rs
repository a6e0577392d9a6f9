//! The list model: sections of rows and the changes they produce.
//!
//! Ownership runs one way. A [`ListController`](crate::controller::ListController)
//! owns its [`Section`]s and a section owns its [`Row`]s; children point back
//! at their parent with weak references only, so dropping the controller frees
//! the whole graph.
//!
//! Index positions are derived, never stored: a row's [`IndexPath`] is looked
//! up through its parents and is `None` while anything on the way is detached.

mod change;
mod index;
pub mod radio;
mod row;
mod section;
mod value;

pub use change::{ChangeBatch, ListChange, RowAnimation};
pub use index::IndexPath;
pub use radio::RadioGroupCoordinator;
pub use row::{Row, RowAction, RowBuilder, RowEvent, RowFlags, RowId, RowKind, RowSnapshot};
pub use section::Section;
pub use value::RowValue;
