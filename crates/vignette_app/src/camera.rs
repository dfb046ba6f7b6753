// SPDX-License-Identifier: MIT OR Apache-2.0
//! Camera built from a [`CameraConfig`].

use crate::config::{CameraConfig, ConfigError};
use crate::math::{self, Mat4};
use crate::metrics::{DimensionProvider, WindowMetrics};

enum Projection {
    Perspective {
        fov_degrees: f32,
        aspect: Box<dyn DimensionProvider>,
    },
    Orthographic {
        width: Box<dyn DimensionProvider>,
        height: Box<dyn DimensionProvider>,
    },
}

/// Scene camera looking at `target`
pub struct Camera {
    config: CameraConfig,
    /// Eye position
    pub position: [f32; 3],
    /// Look-at point
    pub target: [f32; 3],
    /// Up vector
    pub up: [f32; 3],
    near: f32,
    far: f32,
    projection: Projection,
    projection_matrix: Mat4,
    /// Revision of the dimension providers the projection was built from
    revision: u64,
}

impl Camera {
    /// Create a camera, binding window-dependent dimensions to `metrics`
    pub fn from_config(config: &CameraConfig, metrics: &WindowMetrics) -> Result<Self, ConfigError> {
        config.validate()?;
        let (near, far) = config.clip_planes();

        let projection = match config {
            CameraConfig::Perspective(p) => Projection::Perspective {
                fov_degrees: p.fov,
                aspect: metrics.bind(p.aspect),
            },
            CameraConfig::Orthographic(o) => Projection::Orthographic {
                width: metrics.bind(o.width),
                height: metrics.bind(o.height),
            },
        };

        let mut camera = Self {
            config: config.clone(),
            position: config.position(),
            target: [0.0; 3],
            up: [0.0, 1.0, 0.0],
            near,
            far,
            projection,
            projection_matrix: math::IDENTITY,
            revision: 0,
        };
        camera.rebuild_projection();
        Ok(camera)
    }

    /// Near clipping plane
    pub fn near(&self) -> f32 {
        self.near
    }

    /// Far clipping plane
    pub fn far(&self) -> f32 {
        self.far
    }

    /// Vertical field of view in degrees, for perspective cameras
    pub fn fov(&self) -> Option<f32> {
        match &self.projection {
            Projection::Perspective { fov_degrees, .. } => Some(*fov_degrees),
            Projection::Orthographic { .. } => None,
        }
    }

    /// Current aspect ratio
    pub fn aspect(&self) -> f32 {
        match &self.projection {
            Projection::Perspective { aspect, .. } => aspect.current(),
            Projection::Orthographic { width, height } => width.current() / height.current(),
        }
    }

    fn provider_revision(&self) -> u64 {
        match &self.projection {
            Projection::Perspective { aspect, .. } => aspect.revision(),
            Projection::Orthographic { width, height } => width.revision().max(height.revision()),
        }
    }

    fn rebuild_projection(&mut self) {
        self.projection_matrix = match &self.projection {
            Projection::Perspective { fov_degrees, aspect } => math::perspective(
                fov_degrees.to_radians(),
                aspect.current().max(f32::EPSILON),
                self.near,
                self.far,
            ),
            Projection::Orthographic { width, height } => math::orthographic(
                width.current().max(f32::EPSILON),
                height.current().max(f32::EPSILON),
                self.near,
                self.far,
            ),
        };
        self.revision = self.provider_revision();
    }

    /// Re-evaluate window-dependent dimensions. Returns `true` if the projection changed.
    pub fn resize(&mut self) -> bool {
        if self.provider_revision() == self.revision {
            return false;
        }
        self.rebuild_projection();
        tracing::debug!("Camera projection updated, aspect {:.3}", self.aspect());
        true
    }

    /// Projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    /// View matrix
    pub fn view_matrix(&self) -> Mat4 {
        math::look_at(self.position, self.target, self.up)
    }

    /// Combined view-projection matrix
    pub fn view_projection(&self) -> Mat4 {
        math::mul(&self.projection_matrix, &self.view_matrix())
    }
}

impl std::fmt::Debug for Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Camera")
            .field("config", &self.config)
            .field("position", &self.position)
            .field("target", &self.target)
            .field("aspect", &self.aspect())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Dimension, OrthographicConfig, PerspectiveConfig};

    #[test]
    fn test_perspective_reads_back_config() {
        let metrics = WindowMetrics::new(1600.0, 800.0, 1.0);
        let config = CameraConfig::Perspective(PerspectiveConfig {
            fov: 60.0,
            position: [0.0, 5.0, 50.0],
            ..Default::default()
        });
        let camera = Camera::from_config(&config, &metrics).unwrap();

        assert_eq!(camera.fov(), Some(60.0));
        assert_eq!(camera.near(), 10.0);
        assert_eq!(camera.far(), 1000.0);
        assert_eq!(camera.position, [0.0, 5.0, 50.0]);
        assert_eq!(camera.aspect(), 2.0);
        assert_eq!(camera.config, config);
    }

    #[test]
    fn test_refresh_follows_window() {
        let metrics = WindowMetrics::new(800.0, 800.0, 1.0);
        let mut camera = Camera::from_config(&CameraConfig::default(), &metrics).unwrap();
        let before = camera.projection_matrix();
        assert!(!camera.resize());

        metrics.update(1600.0, 800.0, 1.0);
        assert!(camera.resize());
        assert_eq!(camera.aspect(), 2.0);
        assert!((camera.projection_matrix()[0][0] - before[0][0] / 2.0).abs() < 1e-5);
        assert!(!camera.resize());
    }

    #[test]
    fn test_fixed_aspect_ignores_resize() {
        let metrics = WindowMetrics::new(800.0, 600.0, 1.0);
        let config = CameraConfig::Perspective(PerspectiveConfig {
            aspect: Dimension::Fixed(1.5),
            ..Default::default()
        });
        let mut camera = Camera::from_config(&config, &metrics).unwrap();
        metrics.update(100.0, 100.0, 1.0);
        assert!(!camera.resize());
        assert_eq!(camera.aspect(), 1.5);
    }

    #[test]
    fn test_orthographic_camera() {
        let metrics = WindowMetrics::new(400.0, 200.0, 1.0);
        let config = CameraConfig::Orthographic(OrthographicConfig {
            near: 1.0,
            far: 500.0,
            ..Default::default()
        });
        let camera = Camera::from_config(&config, &metrics).unwrap();
        assert!(camera.fov().is_none());
        assert_eq!(camera.fov(), None);
        assert_eq!(camera.aspect(), 2.0);
        assert!((camera.projection_matrix()[0][0] - 2.0 / 400.0).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_config_fails_construction() {
        let metrics = WindowMetrics::new(800.0, 600.0, 1.0);
        let config = CameraConfig::Perspective(PerspectiveConfig {
            fov: 0.0,
            ..Default::default()
        });
        assert!(Camera::from_config(&config, &metrics).is_err());
    }
}
