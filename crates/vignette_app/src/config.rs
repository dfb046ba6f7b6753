// SPDX-License-Identifier: MIT OR Apache-2.0
//! Drawing configuration.
//!
//! This module holds the declarative option structures a drawing is built
//! from:
//! - Renderer options (surface, clearing, size, pixel ratio, toggles)
//! - Camera options (perspective or orthographic)
//!
//! Every field is optional in a RON file; missing fields fall back to the
//! defaults below. Sizes can be fixed numbers or follow the window.

use crate::metrics::WindowMetrics;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "VIGNETTE_CONFIG";

/// Window size used when both renderer dimensions follow the window
pub const DEFAULT_WINDOW_SIZE: [f64; 2] = [1280.0, 720.0];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid RON for a drawing config
    #[error("Failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// A value is out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// RGB color stored as `0xRRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    /// Channels in `[0, 1]`, sRGB encoded
    pub fn rgb(&self) -> [f32; 3] {
        let channel = |shift: u32| ((self.0 >> shift) & 0xff) as f32 / 255.0;
        [channel(16), channel(8), channel(0)]
    }

    /// Channels converted to linear light, for sRGB render targets
    pub fn linear_rgb(&self) -> [f32; 3] {
        self.rgb().map(srgb_to_linear)
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Window-derived quantity a dimension can follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowMetric {
    /// Logical window width
    Width,
    /// Logical window height
    Height,
    /// Width divided by height
    Aspect,
}

/// A size that is either fixed or re-evaluated from the window on resize
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Dimension {
    /// Constant value
    Fixed(f32),
    /// Follows the window
    Window(WindowMetric),
}

impl Dimension {
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        match self {
            Dimension::Fixed(value) if !value.is_finite() || *value <= 0.0 => Err(
                ConfigError::Invalid(format!("{name} must be positive, got {value}")),
            ),
            _ => Ok(()),
        }
    }

    fn fixed(&self) -> Option<f32> {
        match self {
            Dimension::Fixed(value) => Some(*value),
            Dimension::Window(_) => None,
        }
    }
}

/// Renderer options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Surface identifier, shown as the window title
    pub canvas_id: String,
    /// Multisample anti-aliasing
    pub antialias: bool,
    /// Transparent surface, when the platform supports it
    pub alpha: bool,
    /// Clear the frame before drawing the scene
    pub auto_clear: bool,
    /// Background color
    pub clear_color: Color,
    /// Background alpha
    pub clear_alpha: f32,
    /// Surface width
    pub width: Dimension,
    /// Surface height
    pub height: Dimension,
    /// Device pixel ratio; `None` uses the window's scale factor
    pub pixel_ratio: Option<f32>,
    /// Post-processing passes
    pub post_processing: bool,
    /// Advance timelines every frame
    pub use_timeline: bool,
    /// Show the frame statistics overlay
    pub show_stats: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            canvas_id: "exampleDrawing".to_string(),
            antialias: true,
            alpha: true,
            auto_clear: true,
            clear_color: Color(0x6858bb),
            clear_alpha: 1.0,
            width: Dimension::Window(WindowMetric::Width),
            height: Dimension::Window(WindowMetric::Height),
            pixel_ratio: None,
            post_processing: false,
            use_timeline: true,
            show_stats: true,
        }
    }
}

impl RendererConfig {
    /// Check all values are in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas_id.trim().is_empty() {
            return Err(ConfigError::Invalid("canvas_id must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.clear_alpha) {
            return Err(ConfigError::Invalid(format!(
                "clear_alpha must be within [0, 1], got {}",
                self.clear_alpha
            )));
        }
        if let Some(ratio) = self.pixel_ratio {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "pixel_ratio must be positive, got {ratio}"
                )));
            }
        }
        self.width.validate("width")?;
        self.height.validate("height")?;
        Ok(())
    }

    /// Logical window size to request at startup
    pub fn initial_window_size(&self) -> [f64; 2] {
        [
            self.width.fixed().map_or(DEFAULT_WINDOW_SIZE[0], f64::from),
            self.height.fixed().map_or(DEFAULT_WINDOW_SIZE[1], f64::from),
        ]
    }

    /// Both dimensions are fixed, so the window is not resizable
    pub fn is_fixed_size(&self) -> bool {
        self.width.fixed().is_some() && self.height.fixed().is_some()
    }

    /// Drawing buffer size in device pixels for the current window metrics.
    ///
    /// Window-bound dimensions follow the latest metrics, so this is
    /// re-evaluated on every resize.
    pub fn buffer_size(&self, metrics: &WindowMetrics) -> [u32; 2] {
        let scale = metrics.scale_factor();
        let pixels = |dimension: Dimension| (metrics.resolve(dimension) * scale).round().max(1.0) as u32;
        [pixels(self.width), pixels(self.height)]
    }
}

/// Perspective projection options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerspectiveConfig {
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Camera position
    pub position: [f32; 3],
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Aspect ratio
    pub aspect: Dimension,
}

impl Default for PerspectiveConfig {
    fn default() -> Self {
        Self {
            near: 10.0,
            far: 1000.0,
            position: [0.0, 0.0, 100.0],
            fov: 45.0,
            aspect: Dimension::Window(WindowMetric::Aspect),
        }
    }
}

/// Orthographic projection options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrthographicConfig {
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Camera position
    pub position: [f32; 3],
    /// View volume width
    pub width: Dimension,
    /// View volume height
    pub height: Dimension,
}

impl Default for OrthographicConfig {
    fn default() -> Self {
        Self {
            near: 10.0,
            far: -10.0,
            position: [0.0, 0.0, 100.0],
            width: Dimension::Window(WindowMetric::Width),
            height: Dimension::Window(WindowMetric::Height),
        }
    }
}

/// Camera options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CameraConfig {
    /// Perspective camera
    Perspective(PerspectiveConfig),
    /// Orthographic camera
    Orthographic(OrthographicConfig),
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig::Perspective(PerspectiveConfig::default())
    }
}

impl CameraConfig {
    /// Near and far clipping planes
    pub fn clip_planes(&self) -> (f32, f32) {
        match self {
            CameraConfig::Perspective(p) => (p.near, p.far),
            CameraConfig::Orthographic(o) => (o.near, o.far),
        }
    }

    /// Configured camera position
    pub fn position(&self) -> [f32; 3] {
        match self {
            CameraConfig::Perspective(p) => p.position,
            CameraConfig::Orthographic(o) => o.position,
        }
    }

    /// Check all values are in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (near, far) = self.clip_planes();
        if !near.is_finite() || !far.is_finite() {
            return Err(ConfigError::Invalid("clip planes must be finite".to_string()));
        }
        if self.position().iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::Invalid("camera position must be finite".to_string()));
        }

        match self {
            CameraConfig::Perspective(p) => {
                if p.near <= 0.0 || p.far <= p.near {
                    return Err(ConfigError::Invalid(format!(
                        "perspective camera needs 0 < near < far, got near {} far {}",
                        p.near, p.far
                    )));
                }
                if !(p.fov > 0.0 && p.fov < 180.0) {
                    return Err(ConfigError::Invalid(format!(
                        "fov must be within (0, 180), got {}",
                        p.fov
                    )));
                }
                p.aspect.validate("aspect")
            }
            CameraConfig::Orthographic(o) => {
                if o.near == o.far {
                    return Err(ConfigError::Invalid(
                        "orthographic camera needs near != far".to_string(),
                    ));
                }
                o.width.validate("width")?;
                o.height.validate("height")
            }
        }
    }
}

/// Complete drawing configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingConfig {
    /// Renderer options
    pub renderer: RendererConfig,
    /// Camera options
    pub camera: CameraConfig,
}

impl DrawingConfig {
    /// Parse and validate a RON document
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&content)?;
        tracing::info!("Loaded drawing config from {}", path.display());
        Ok(config)
    }

    /// Load from `path` if given, else from `VIGNETTE_CONFIG`, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load(Path::new(&path)),
            None => {
                tracing::debug!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check renderer and camera options
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.renderer.validate()?;
        self.camera.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DrawingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.renderer.canvas_id, "exampleDrawing");
        assert_eq!(config.renderer.clear_color, Color(0x6858bb));
        assert!(config.renderer.show_stats);
        assert!(matches!(config.camera, CameraConfig::Perspective(ref p) if p.fov == 45.0));
    }

    #[test]
    fn test_color_channels() {
        let [r, g, b] = Color(0xff8000).rgb();
        assert_eq!(r, 1.0);
        assert!((g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(b, 0.0);

        let [lr, _, lb] = Color(0xff0000).linear_rgb();
        assert!((lr - 1.0).abs() < 1e-6);
        assert_eq!(lb, 0.0);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let source = r#"(
            renderer: (
                canvas_id: "cube",
                clear_color: 0x112233,
                width: Fixed(800.0),
            ),
        )"#;
        let config = DrawingConfig::from_ron(source).unwrap();
        assert_eq!(config.renderer.canvas_id, "cube");
        assert_eq!(config.renderer.clear_color, Color(0x112233));
        assert_eq!(config.renderer.width, Dimension::Fixed(800.0));
        assert_eq!(config.renderer.height, Dimension::Window(WindowMetric::Height));
        assert!(config.renderer.antialias);
        assert_eq!(config.camera, CameraConfig::default());
        assert_eq!(config.renderer.initial_window_size(), [800.0, DEFAULT_WINDOW_SIZE[1]]);
    }

    #[test]
    fn test_orthographic_camera_from_ron() {
        let source = r#"(
            camera: Orthographic((
                near: 1.0,
                far: -1.0,
                width: Fixed(200.0),
            )),
        )"#;
        let config = DrawingConfig::from_ron(source).unwrap();
        match config.camera {
            CameraConfig::Orthographic(o) => {
                assert_eq!(o.width, Dimension::Fixed(200.0));
                assert_eq!(o.height, Dimension::Window(WindowMetric::Height));
                assert_eq!(o.position, [0.0, 0.0, 100.0]);
            }
            other => panic!("expected orthographic camera, got {other:?}"),
        }
    }

    #[test]
    fn test_serialization() {
        let mut config = DrawingConfig::default();
        config.renderer.pixel_ratio = Some(2.0);
        let ron_str = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default()).unwrap();
        let loaded = DrawingConfig::from_ron(&ron_str).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut renderer = RendererConfig {
            clear_alpha: 1.5,
            ..Default::default()
        };
        assert!(matches!(renderer.validate(), Err(ConfigError::Invalid(_))));

        renderer.clear_alpha = 1.0;
        renderer.pixel_ratio = Some(0.0);
        assert!(renderer.validate().is_err());

        renderer.pixel_ratio = None;
        renderer.width = Dimension::Fixed(-5.0);
        assert!(renderer.validate().is_err());

        renderer.width = Dimension::Fixed(640.0);
        renderer.canvas_id = "  ".to_string();
        assert!(renderer.validate().is_err());

        let camera = CameraConfig::Perspective(PerspectiveConfig {
            near: 10.0,
            far: -10.0,
            ..Default::default()
        });
        assert!(camera.validate().is_err());

        let camera = CameraConfig::Orthographic(OrthographicConfig {
            near: 5.0,
            far: 5.0,
            ..Default::default()
        });
        assert!(camera.validate().is_err());
    }

    #[test]
    fn test_buffer_size_follows_resizes() {
        let metrics = WindowMetrics::new(800.0, 600.0, 2.0);
        let renderer = RendererConfig::default();
        assert!(!renderer.is_fixed_size());
        assert_eq!(renderer.buffer_size(&metrics), [1600, 1200]);

        metrics.update(1024.0, 300.0, 1.0);
        assert_eq!(renderer.buffer_size(&metrics), [1024, 300]);

        // a fixed width stays put while the height tracks the window
        let renderer = RendererConfig {
            width: Dimension::Fixed(640.0),
            ..Default::default()
        };
        metrics.update(1920.0, 1080.0, 1.5);
        assert_eq!(renderer.buffer_size(&metrics), [960, 1620]);
        assert!(!renderer.is_fixed_size());

        let renderer = RendererConfig {
            width: Dimension::Fixed(640.0),
            height: Dimension::Fixed(480.0),
            ..Default::default()
        };
        assert!(renderer.is_fixed_size());
        assert_eq!(renderer.initial_window_size(), [640.0, 480.0]);
    }

    #[test]
    fn test_parse_error_surfaces() {
        let result = DrawingConfig::from_ron("(renderer: (antialias: \"yes\"))");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = DrawingConfig::load(Path::new("does/not/exist.ron"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
