//! Trellis: declarative list binding.
//!
//! Trellis keeps three things consistent: a mutable in-memory model of
//! sections and rows, the list surface that renders it, and the asynchronous
//! resource fetches started by reusable cells.
//!
//! - [`model`]: [`Row`](model::Row)s grouped into [`Section`](model::Section)s,
//!   radio groups, and the [`ChangeBatch`](model::ChangeBatch)es mutations produce
//! - [`controller`]: the [`ListController`](controller::ListController) that owns
//!   the sections and drives a [`ListSurface`](controller::ListSurface)
//! - [`cell`]: [`CellBinding`](cell::CellBinding), a per-cell cancellable fetch
//!   with identity-checked result delivery
//! - [`prefetch`]: viewport diffing for proactive asset caching
//! - [`theme`] and [`registry`]: theme propagation and weak per-account registries
//!
//! All model and cell state lives on one main context; see
//! [`trellis_core::MainContext`].
//!
//! # Example
//!
//! ```
//! use trellis::controller::ListController;
//! use trellis::model::{Row, Section};
//!
//! let controller = ListController::new();
//! let section = Section::with_identifier("general").with_header("General");
//! controller.add_section(section.clone(), false);
//!
//! let a = Row::button("A").identifier("a").build();
//! let b = Row::button("B").identifier("b").build();
//! let c = Row::button("C").identifier("c").build();
//! section.add_rows([a, b.clone(), c.clone()], false);
//!
//! section.remove_row(&b, true);
//! assert_eq!(controller.number_of_rows(0), 2);
//! assert_eq!(c.index(), Some(1));
//! assert_eq!(controller.row_with_identifier("c"), Some(c));
//! ```

pub mod cell;
pub mod config;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod model;
pub mod prefetch;
pub mod registry;
pub mod theme;

pub use trellis_core;

pub use cell::{CellBinding, CellView, Entity, EntityId, ResourceFetcher};
pub use config::TrellisConfig;
pub use controller::{ListController, ListSurface};
pub use error::{ConfigError, ResourceError, Result, TrellisError};
pub use model::{IndexPath, Row, RowValue, Section};
pub use prefetch::PrefetchWindowDiffer;
pub use registry::AccountRegistry;
pub use theme::ThemeContext;
