// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reactive window dimensions.
//!
//! Window-dependent sizes are read through [`DimensionProvider`] instead of
//! a global window object. [`WindowMetrics`] is the shared source, written by
//! the event loop on resize and bumped to a new revision on every change.

use crate::config::{Dimension, WindowMetric};
use parking_lot::RwLock;
use std::sync::Arc;

/// A value that can be queried now and may change later
pub trait DimensionProvider: Send + Sync {
    /// Current value
    fn current(&self) -> f32;

    /// Incremented whenever the value may have changed
    fn revision(&self) -> u64 {
        0
    }
}

impl DimensionProvider for f32 {
    fn current(&self) -> f32 {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MetricsState {
    width: f32,
    height: f32,
    scale_factor: f32,
    revision: u64,
}

/// Shared logical window size and scale factor
#[derive(Debug, Clone)]
pub struct WindowMetrics {
    state: Arc<RwLock<MetricsState>>,
}

impl WindowMetrics {
    /// Create metrics for a window of the given logical size
    pub fn new(width: f32, height: f32, scale_factor: f32) -> Self {
        Self {
            state: Arc::new(RwLock::new(MetricsState {
                width: width.max(1.0),
                height: height.max(1.0),
                scale_factor: scale_factor.max(f32::EPSILON),
                revision: 0,
            })),
        }
    }

    /// Record a new window size. Returns `true` if anything changed.
    pub fn update(&self, width: f32, height: f32, scale_factor: f32) -> bool {
        let mut state = self.state.write();
        let width = width.max(1.0);
        let height = height.max(1.0);
        let scale_factor = scale_factor.max(f32::EPSILON);
        if state.width == width && state.height == height && state.scale_factor == scale_factor {
            return false;
        }
        state.width = width;
        state.height = height;
        state.scale_factor = scale_factor;
        state.revision += 1;
        true
    }

    /// Logical width
    pub fn width(&self) -> f32 {
        self.state.read().width
    }

    /// Logical height
    pub fn height(&self) -> f32 {
        self.state.read().height
    }

    /// Width divided by height
    pub fn aspect(&self) -> f32 {
        let state = self.state.read();
        state.width / state.height
    }

    /// Window scale factor
    pub fn scale_factor(&self) -> f32 {
        self.state.read().scale_factor
    }

    /// Current revision
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Provider tracking one metric
    pub fn provider(&self, metric: WindowMetric) -> MetricProvider {
        MetricProvider {
            metrics: self.clone(),
            metric,
        }
    }

    /// Bind a configured dimension to these metrics
    pub fn bind(&self, dimension: Dimension) -> Box<dyn DimensionProvider> {
        match dimension {
            Dimension::Fixed(value) => Box::new(value),
            Dimension::Window(metric) => Box::new(self.provider(metric)),
        }
    }

    /// Evaluate a configured dimension now
    pub fn resolve(&self, dimension: Dimension) -> f32 {
        self.bind(dimension).current()
    }
}

/// Provider following one window metric
#[derive(Debug, Clone)]
pub struct MetricProvider {
    metrics: WindowMetrics,
    metric: WindowMetric,
}

impl DimensionProvider for MetricProvider {
    fn current(&self) -> f32 {
        match self.metric {
            WindowMetric::Width => self.metrics.width(),
            WindowMetric::Height => self.metrics.height(),
            WindowMetric::Aspect => self.metrics.aspect(),
        }
    }

    fn revision(&self) -> u64 {
        self.metrics.revision()
    }
}
