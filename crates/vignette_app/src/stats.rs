// SPDX-License-Identifier: MIT OR Apache-2.0
//! Frame statistics overlay.

use crate::camera::Camera;
use std::collections::VecDeque;
use vignette_timeline::Timeline;

/// Frames averaged for the FPS readout
const FRAME_WINDOW: usize = 120;

/// Rolling frame time statistics
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    frame_times: VecDeque<f32>,
    total: f32,
}

impl FrameStats {
    /// Create empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame's duration in seconds
    pub fn record(&mut self, delta_time: f32) {
        if !delta_time.is_finite() || delta_time < 0.0 {
            return;
        }
        if self.frame_times.len() == FRAME_WINDOW {
            if let Some(oldest) = self.frame_times.pop_front() {
                self.total -= oldest;
            }
        }
        self.frame_times.push_back(delta_time);
        self.total += delta_time;
    }

    /// Mean frame time in seconds over the window
    pub fn average_frame_time(&self) -> f32 {
        if self.frame_times.is_empty() {
            0.0
        } else {
            self.total / self.frame_times.len() as f32
        }
    }

    /// Frames per second over the window
    pub fn fps(&self) -> f32 {
        let average = self.average_frame_time();
        if average > 0.0 {
            1.0 / average
        } else {
            0.0
        }
    }

    /// Draw the overlay in the top-left corner
    pub fn show(&self, ctx: &egui::Context, camera: &Camera, timeline: Option<&Timeline>) {
        egui::Area::new(egui::Id::new("frame_stats"))
            .anchor(egui::Align2::LEFT_TOP, [8.0, 8.0])
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.monospace(format!(
                        "{:5.1} fps  {:5.2} ms",
                        self.fps(),
                        self.average_frame_time() * 1000.0
                    ));
                    ui.monospace(camera_summary(camera));
                    if let Some(timeline) = timeline {
                        ui.monospace(format!(
                            "{:<9} {:5.1}%",
                            timeline.state().name(),
                            timeline.progress() * 100.0
                        ));
                    }
                });
            });
    }
}

/// One-line description of the camera projection
fn camera_summary(camera: &Camera) -> String {
    let projection = match camera.fov() {
        Some(fov) => format!("persp {fov:.0}°"),
        None => "ortho".to_string(),
    };
    format!(
        "{projection} {:.2}:1  z {}..{}",
        camera.aspect(),
        camera.near(),
        camera.far()
    )
}
