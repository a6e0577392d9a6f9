//! Logging facilities for Trellis.
//!
//! Trellis uses the `tracing` crate for instrumentation. Install a subscriber
//! in the host application to see output:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("trellis::model=debug,trellis::cell=trace")
//!     .init();
//! ```
//!
//! The constants in [`targets`] name every subsystem so logs can be filtered
//! per concern.

use std::time::{Duration, Instant};

/// Span names used throughout Trellis.
pub mod span_names {
    /// Signal emission span.
    pub const SIGNAL: &str = "trellis::signal";
    /// Model mutation batch span.
    pub const BATCH: &str = "trellis::batch";
    /// Cell bind span.
    pub const BIND: &str = "trellis::bind";
    /// Prefetch window evaluation span.
    pub const PREFETCH: &str = "trellis::prefetch";
}

/// Target names for log filtering.
pub mod targets {
    /// Runtime crate target.
    pub const CORE: &str = "trellis_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "trellis_core::signal";
    /// Main-context dispatch target.
    pub const DISPATCH: &str = "trellis_core::dispatch";
    /// Background pool and async runtime target.
    pub const POOL: &str = "trellis_core::pool";
    /// Performance spans.
    pub const PERF: &str = "trellis::perf";
    /// Section/row model target.
    pub const MODEL: &str = "trellis::model";
    /// List controller target.
    pub const CONTROLLER: &str = "trellis::controller";
    /// Cell resource binding target.
    pub const CELL: &str = "trellis::cell";
    /// Prefetch window target.
    pub const PREFETCH: &str = "trellis::prefetch";
    /// Theme context target.
    pub const THEME: &str = "trellis::theme";
    /// Account registry target.
    pub const REGISTRY: &str = "trellis::registry";
    /// Configuration loading target.
    pub const CONFIG: &str = "trellis::config";
}

/// A guard that keeps a tracing span entered and reports its duration on drop.
///
/// Durations above the optional warn threshold are logged at `warn`.
#[derive(Debug)]
pub struct PerfSpan {
    name: &'static str,
    start: Instant,
    warn_after: Option<Duration>,
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::trace_span!(target: targets::PERF, "perf", operation = name);
        Self {
            name,
            start: Instant::now(),
            warn_after: None,
            span: span.entered(),
        }
    }

    /// Log at `warn` when the span outlives `threshold`.
    pub fn with_warn_threshold(mut self, threshold: Duration) -> Self {
        self.warn_after = Some(threshold);
        self
    }

    /// Time elapsed since the span was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfSpan {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        match self.warn_after {
            Some(threshold) if elapsed > threshold => {
                tracing::warn!(target: targets::PERF, operation = self.name, ?elapsed, "slow operation");
            }
            _ => {
                tracing::trace!(target: targets::PERF, operation = self.name, ?elapsed, "operation finished");
            }
        }
    }
}

/// `tracing::trace!` under the runtime crate's target.
#[macro_export]
macro_rules! trellis_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "trellis_core", $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        let span = PerfSpan::new("test_operation").with_warn_threshold(Duration::from_secs(60));
        assert!(span.elapsed() < Duration::from_secs(60));
    }

    #[test]
    fn test_perf_span_with_subscriber() {
        let subscriber = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::TRACE).finish();
        tracing::subscriber::with_default(subscriber, || {
            let _span = PerfSpan::new("with_subscriber");
            crate::trellis_trace!(value = 1, "inside span");
        });
    }

    #[test]
    fn test_targets_are_namespaced() {
        for target in [targets::MODEL, targets::CONTROLLER, targets::CELL, targets::PREFETCH] {
            assert!(target.starts_with("trellis::"));
        }
        assert!(targets::SIGNAL.starts_with(targets::CORE));
    }
}
