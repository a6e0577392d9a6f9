//! The platform list surface a controller drives.

use crate::model::{ChangeBatch, IndexPath};

/// A scrollable list view that renders a controller's model.
///
/// Implementations live on the platform side. All methods are called on the
/// main context.
pub trait ListSurface: Send + Sync {
    /// Apply an ordered batch of changes in one update transaction.
    ///
    /// The model already reflects the batch when this is called.
    fn apply(&self, batch: &ChangeBatch);

    /// Discard all displayed rows and re-query the controller.
    fn reload_data(&self);

    /// Clear the selection highlight at `path`.
    fn deselect(&self, path: IndexPath, animated: bool) {
        let _ = (path, animated);
    }
}
