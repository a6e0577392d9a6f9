//! Resource-bound cells.
//!
//! List cells are reused: the same cell shows one entity, scrolls away, and
//! is handed a different entity while a fetch for the first may still be in
//! flight. A [`CellBinding`] owns the cell's single active request and only
//! applies a result while the entity it was started for is still bound.
//!
//! The pieces:
//!
//! - [`ResourceFetcher`]: the collaborator that produces content
//! - [`CellView`]: the cell's display surface
//! - [`ProgressCenter`]: a side channel for transfer progress badges
//! - [`CellBinding`]: the per-cell state machine tying them together

mod binding;
mod fetcher;
mod progress;

pub use binding::{CellBinding, CellBindingBuilder};
pub use fetcher::{
    Completion, FetchOptions, PoolFetcher, RequestHandle, Resource, ResourceFetcher, ResourceRequest,
};
pub use progress::{ProgressCenter, ProgressEvent};

#[cfg(feature = "tokio")]
pub use fetcher::AsyncFetcher;

use std::fmt;

use crate::geometry::Size;

/// Stable identifier of a fetchable entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Whether an entity's resource exists and where to get it.
#[derive(Debug, Clone, PartialEq)]
pub enum Availability<C> {
    /// Already cached; shown without a request.
    Available(C),
    /// The entity has no resource; the placeholder stays.
    None,
    /// Must be requested from the fetcher.
    Fetchable,
}

impl<C> Default for Availability<C> {
    fn default() -> Self {
        Availability::Fetchable
    }
}

/// An entity a cell can be bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity<C> {
    pub id: EntityId,
    /// Version of the entity's content. Results for another version are ignored.
    pub version: Option<String>,
    /// Key used for progress notifications.
    pub local_id: Option<String>,
    pub availability: Availability<C>,
}

impl<C> Entity<C> {
    /// A fetchable entity with no version or progress key.
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            version: None,
            local_id: None,
            availability: Availability::Fetchable,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_local_id(mut self, local_id: impl Into<String>) -> Self {
        self.local_id = Some(local_id.into());
        self
    }

    pub fn with_availability(mut self, availability: Availability<C>) -> Self {
        self.availability = availability;
        self
    }
}

/// What a cell currently displays.
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent<C> {
    Empty,
    Placeholder,
    Resource(C),
}

impl<C> Default for CellContent<C> {
    fn default() -> Self {
        CellContent::Empty
    }
}

impl<C> CellContent<C> {
    pub fn resource(&self) -> Option<&C> {
        match self {
            CellContent::Resource(content) => Some(content),
            _ => None,
        }
    }
}

/// The display side of a cell.
///
/// Called only on the main context.
pub trait CellView<C>: Send + Sync {
    fn show_placeholder(&self);

    fn show_content(&self, content: &C);

    /// Show or hide the progress badge. `None` hides it.
    fn show_progress(&self, progress: Option<f32>);

    /// The cell was unbound.
    fn clear(&self) {}
}

/// Per-binding request parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindingOptions {
    /// Size requested from the fetcher.
    pub size: Size,
    pub wait_for_connectivity: bool,
    /// Show the placeholder when a fetch fails.
    pub fallback_to_placeholder: bool,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            size: Size::new(64.0, 64.0),
            wait_for_connectivity: true,
            fallback_to_placeholder: true,
        }
    }
}

impl BindingOptions {
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }
}
