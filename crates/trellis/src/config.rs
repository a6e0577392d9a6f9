//! Configuration.
//!
//! [`TrellisConfig`] collects the tunables of the list engine. Every field has
//! a default, so a config file only needs the keys it changes:
//!
//! ```
//! use trellis::config::TrellisConfig;
//! use trellis::model::RowAnimation;
//!
//! let config = TrellisConfig::from_toml_str(r#"
//! [list]
//! animation = "top"
//!
//! [prefetch]
//! margin_factor = 1.0
//! "#).unwrap();
//!
//! assert_eq!(config.list.animation, RowAnimation::Top);
//! assert_eq!(config.prefetch.throttle_fraction, 1.0 / 3.0);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use trellis_core::PoolConfig;
use trellis_core::logging::targets;

use crate::cell::BindingOptions;
use crate::error::ConfigError;
use crate::geometry::Size;
use crate::model::RowAnimation;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrellisConfig {
    pub list: ListConfig,
    pub prefetch: PrefetchConfig,
    pub resources: ResourceConfig,
}

/// List controller behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Animation used for animated row and section changes.
    pub animation: RowAnimation,
    /// Whether the selection highlight is cleared with animation.
    pub deselect_animated: bool,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            animation: RowAnimation::Fade,
            deselect_animated: true,
        }
    }
}

/// Prefetch window tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    /// How far the preheat rect extends above and below the visible rect,
    /// as a fraction of the visible height.
    pub margin_factor: f32,
    /// Minimum scroll distance, as a fraction of the viewport height, before
    /// the preheat window is recomputed.
    pub throttle_fraction: f32,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            margin_factor: 0.5,
            throttle_fraction: 1.0 / 3.0,
        }
    }
}

/// Resource binding defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Size requested for thumbnails.
    pub thumbnail_size: Size,
    /// Whether requests wait for connectivity instead of failing offline.
    pub wait_for_connectivity: bool,
    /// Whether a failed fetch shows the placeholder.
    pub fallback_to_placeholder: bool,
    /// Background pool size. `None` uses one thread per core.
    pub pool_threads: Option<usize>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            thumbnail_size: Size::new(64.0, 64.0),
            wait_for_connectivity: true,
            fallback_to_placeholder: true,
            pool_threads: None,
        }
    }
}

impl ResourceConfig {
    /// Pool configuration for resource fetch workers.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            num_threads: self.pool_threads,
            ..PoolConfig::default()
        }
        .thread_name("trellis-fetch")
    }

    /// Default options for new cell bindings.
    pub fn binding_options(&self) -> BindingOptions {
        BindingOptions {
            size: self.thumbnail_size,
            wait_for_connectivity: self.wait_for_connectivity,
            fallback_to_placeholder: self.fallback_to_placeholder,
        }
    }
}

impl TrellisConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(target: targets::CONFIG, path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Builder method to replace the list section.
    pub fn with_list(mut self, list: ListConfig) -> Self {
        self.list = list;
        self
    }

    /// Builder method to replace the prefetch section.
    pub fn with_prefetch(mut self, prefetch: PrefetchConfig) -> Self {
        self.prefetch = prefetch;
        self
    }

    /// Builder method to replace the resources section.
    pub fn with_resources(mut self, resources: ResourceConfig) -> Self {
        self.resources = resources;
        self
    }

    /// Check value ranges serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefetch = &self.prefetch;
        if !prefetch.margin_factor.is_finite() || prefetch.margin_factor < 0.0 {
            return Err(ConfigError::Invalid {
                field: "prefetch.margin_factor",
                reason: format!("must be finite and non-negative, got {}", prefetch.margin_factor),
            });
        }
        if !prefetch.throttle_fraction.is_finite() || prefetch.throttle_fraction < 0.0 {
            return Err(ConfigError::Invalid {
                field: "prefetch.throttle_fraction",
                reason: format!("must be finite and non-negative, got {}", prefetch.throttle_fraction),
            });
        }

        let size = self.resources.thumbnail_size;
        if size.is_empty() {
            return Err(ConfigError::Invalid {
                field: "resources.thumbnail_size",
                reason: format!("must be positive, got {}x{}", size.width, size.height),
            });
        }
        if self.resources.pool_threads == Some(0) {
            return Err(ConfigError::Invalid {
                field: "resources.pool_threads",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
