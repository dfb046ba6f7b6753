// SPDX-License-Identifier: MIT OR Apache-2.0
//! Drawing lifecycle.
//!
//! A drawing is composed rather than inherited: [`DrawingContext`] owns what
//! every drawing shares (configuration, scene graph, camera, window metrics),
//! and a type implementing [`Drawing`] supplies the behavior. The
//! [`DrawingRunner`] ties both together and enforces the lifecycle:
//! initialize once, then frames, UI passes and resizes.

use crate::camera::Camera;
use crate::config::{ConfigError, DrawingConfig, RendererConfig};
use crate::metrics::WindowMetrics;
use crate::scene::SceneGraph;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use vignette_timeline::{Timeline, TimelineError};

/// Timeline shared between a drawing and its control panel actions
pub type TimelineHandle = Arc<Mutex<Timeline>>;

/// Drawing errors
#[derive(Debug, Error)]
pub enum DrawingError {
    /// Animation was set up before any objects exist
    #[error("No objects to animate; initialize objects first")]
    ObjectsMissing,

    /// The control panel was set up before the timeline exists
    #[error("No timeline to control; initialize the animation first")]
    TimelineMissing,

    /// `initialize` ran twice
    #[error("Drawing is already initialized")]
    AlreadyInitialized,

    /// A frame was requested before `initialize`
    #[error("Drawing is not initialized")]
    NotInitialized,

    /// The control panel has no command with this name
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Timeline failure
    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),
}

/// State shared by every drawing
#[derive(Debug)]
pub struct DrawingContext {
    /// Configuration the drawing was built from
    pub config: DrawingConfig,
    /// Objects drawn each frame
    pub scene: SceneGraph,
    /// Active camera
    pub camera: Camera,
    /// Window dimensions
    pub metrics: WindowMetrics,
}

impl DrawingContext {
    /// Validate `config` and build the camera against `metrics`
    pub fn new(config: DrawingConfig, metrics: WindowMetrics) -> Result<Self, DrawingError> {
        config.validate()?;
        let camera = Camera::from_config(&config.camera, &metrics)?;
        Ok(Self {
            config,
            scene: SceneGraph::new(),
            camera,
            metrics,
        })
    }

    /// Renderer options
    pub fn renderer(&self) -> &RendererConfig {
        &self.config.renderer
    }
}

/// Behavior of a concrete drawing
pub trait Drawing {
    /// Build objects, animations and controls
    fn init(&mut self, ctx: &mut DrawingContext) -> Result<(), DrawingError>;

    /// Advance one frame
    fn update(&mut self, ctx: &mut DrawingContext, delta_time: f32) -> Result<(), DrawingError>;

    /// Draw immediate-mode UI
    fn ui(&mut self, _egui_ctx: &egui::Context) {}

    /// React to a window resize, after metrics and camera have been updated
    fn on_resize(&mut self, _ctx: &mut DrawingContext) -> Result<(), DrawingError> {
        Ok(())
    }

    /// Timeline driving the drawing, if any
    fn timeline(&self) -> Option<TimelineHandle> {
        None
    }
}

/// Runs a [`Drawing`] through its lifecycle
#[derive(Debug)]
pub struct DrawingRunner<D: Drawing> {
    context: DrawingContext,
    drawing: D,
    initialized: bool,
}

impl<D: Drawing> DrawingRunner<D> {
    /// Create a runner. The drawing is not initialized yet.
    pub fn new(config: DrawingConfig, metrics: WindowMetrics, drawing: D) -> Result<Self, DrawingError> {
        Ok(Self {
            context: DrawingContext::new(config, metrics)?,
            drawing,
            initialized: false,
        })
    }

    /// Initialize the drawing. Allowed exactly once.
    pub fn initialize(&mut self) -> Result<(), DrawingError> {
        if self.initialized {
            return Err(DrawingError::AlreadyInitialized);
        }
        if self.context.renderer().post_processing {
            tracing::warn!("Post-processing is enabled but no passes are available");
        }

        self.drawing.init(&mut self.context)?;
        self.initialized = true;
        tracing::info!(
            "Drawing '{}' initialized with {} object(s)",
            self.context.renderer().canvas_id,
            self.context.scene.len()
        );
        Ok(())
    }

    /// Advance the drawing by `delta_time` seconds
    pub fn frame(&mut self, delta_time: f32) -> Result<(), DrawingError> {
        if !self.initialized {
            return Err(DrawingError::NotInitialized);
        }
        self.drawing.update(&mut self.context, delta_time)
    }

    /// Draw the drawing's UI
    pub fn ui(&mut self, egui_ctx: &egui::Context) {
        if self.initialized {
            self.drawing.ui(egui_ctx);
        }
    }

    /// Record a new logical window size and scale factor
    pub fn resize(&mut self, width: f32, height: f32, scale_factor: f32) -> Result<(), DrawingError> {
        if !self.context.metrics.update(width, height, scale_factor) {
            return Ok(());
        }
        tracing::debug!("Drawing resized to {:.0}x{:.0} @ {:.2}", width, height, scale_factor);
        self.context.camera.resize();
        if self.initialized {
            self.drawing.on_resize(&mut self.context)?;
        }
        Ok(())
    }

    /// Shared drawing state
    pub fn context(&self) -> &DrawingContext {
        &self.context
    }

    /// The drawing
    pub fn drawing(&self) -> &D {
        &self.drawing
    }

    /// The drawing, mutably
    #[cfg(test)]
    pub fn drawing_mut(&mut self) -> &mut D {
        &mut self.drawing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraConfig, PerspectiveConfig};
    use crate::scene::{Mesh, SceneObject};

    #[derive(Debug, Default)]
    struct Counting {
        inits: usize,
        updates: usize,
        resizes: usize,
        elapsed: f32,
    }

    impl Drawing for Counting {
        fn init(&mut self, ctx: &mut DrawingContext) -> Result<(), DrawingError> {
            self.inits += 1;
            ctx.scene.add(SceneObject::new("Cube", Mesh::cube()));
            Ok(())
        }

        fn update(&mut self, _ctx: &mut DrawingContext, delta_time: f32) -> Result<(), DrawingError> {
            self.updates += 1;
            self.elapsed += delta_time;
            Ok(())
        }

        fn on_resize(&mut self, _ctx: &mut DrawingContext) -> Result<(), DrawingError> {
            self.resizes += 1;
            Ok(())
        }
    }

    fn runner() -> DrawingRunner<Counting> {
        let metrics = WindowMetrics::new(800.0, 600.0, 1.0);
        DrawingRunner::new(DrawingConfig::default(), metrics, Counting::default()).unwrap()
    }

    #[test]
    fn test_initialize_runs_once() {
        let mut runner = runner();
        assert!(!runner.initialized);
        runner.initialize().unwrap();
        assert!(runner.initialized);
        assert!(matches!(runner.initialize(), Err(DrawingError::AlreadyInitialized)));
        assert_eq!(runner.drawing().inits, 1);
        assert_eq!(runner.context().scene.len(), 1);
    }

    #[test]
    fn test_frame_requires_initialize() {
        let mut runner = runner();
        assert!(matches!(runner.frame(0.016), Err(DrawingError::NotInitialized)));

        runner.initialize().unwrap();
        runner.frame(0.25).unwrap();
        runner.frame(0.25).unwrap();
        assert_eq!(runner.drawing().updates, 2);
        assert_eq!(runner.drawing().elapsed, 0.5);
    }

    #[test]
    fn test_resize_updates_metrics_and_camera() {
        let mut runner = runner();
        runner.initialize().unwrap();
        let aspect = runner.context().camera.aspect();

        runner.resize(1200.0, 600.0, 1.0).unwrap();
        assert_eq!(runner.context().metrics.width(), 1200.0);
        assert_eq!(runner.context().camera.aspect(), 2.0);
        assert_ne!(runner.context().camera.aspect(), aspect);
        assert_eq!(runner.drawing().resizes, 1);

        // Same size is not a resize
        runner.resize(1200.0, 600.0, 1.0).unwrap();
        assert_eq!(runner.drawing().resizes, 1);
    }

    #[test]
    fn test_resize_before_initialize_skips_drawing() {
        let mut runner = runner();
        runner.resize(640.0, 480.0, 2.0).unwrap();
        assert_eq!(runner.drawing().resizes, 0);
        assert_eq!(runner.context().metrics.scale_factor(), 2.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DrawingConfig {
            camera: CameraConfig::Perspective(PerspectiveConfig {
                near: 0.0,
                ..Default::default()
            }),
            ..Default::default()
        };
        let metrics = WindowMetrics::new(800.0, 600.0, 1.0);
        let result = DrawingRunner::new(config, metrics, Counting::default());
        assert!(matches!(result, Err(DrawingError::Config(_))));
    }
}
