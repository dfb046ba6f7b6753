// SPDX-License-Identifier: MIT OR Apache-2.0
//! The falling cube drawing.
//!
//! One cube drops onto an invisible floor with a bounce while it rotates
//! upright. Both tracks share a paused timeline that the control panel
//! drives with `play`, `stop`, `reset` and `reverse`.
//!
//! Panel buttons queue a [`PlaybackCommand`]; the next update applies the
//! queue in order against the scene before advancing the timeline.

use crate::control_panel::ControlPanel;
use crate::drawing::{Drawing, DrawingContext, DrawingError, TimelineHandle};
use crate::scene::{Mesh, SceneGraph, SceneObject};
use parking_lot::Mutex;
use std::sync::Arc;
use vignette_timeline::{
    Axis, Easing, ObjectId, Property, Timeline, TimelineError, TimelineOptions, Tween,
};

/// Cube starting position
pub const CUBE_POSITION: [f32; 3] = [0.0, 30.0, 0.0];
/// Cube starting rotation in radians
pub const CUBE_ROTATION: [f32; 3] = [-2.0, 2.0, 0.0];
/// Height the cube lands at
pub const FLOOR_Y: f32 = -20.0;
/// Length of both tweens in seconds
pub const ANIMATION_DURATION: f32 = 3.5;

const PANEL_TITLE: &str = "Timeline";

/// Playback command issued from the control panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    /// Play forward
    Play,
    /// Halt, keeping the position
    Stop,
    /// Pause at progress 0 and restore start values
    Reset,
    /// Play backward
    Reverse,
}

impl PlaybackCommand {
    /// Panel button label
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackCommand::Play => "play",
            PlaybackCommand::Stop => "stop",
            PlaybackCommand::Reset => "reset",
            PlaybackCommand::Reverse => "reverse",
        }
    }

    fn apply(self, timeline: &mut Timeline, scene: &mut SceneGraph) -> Result<(), TimelineError> {
        tracing::debug!("Timeline command: {}", self.name());
        match self {
            PlaybackCommand::Play => timeline.play(),
            PlaybackCommand::Stop => timeline.stop(),
            PlaybackCommand::Reset => timeline.reset(scene)?,
            PlaybackCommand::Reverse => timeline.reverse(),
        }
        Ok(())
    }
}

type CommandQueue = Arc<Mutex<Vec<PlaybackCommand>>>;

/// Falling cube drawing
#[derive(Debug, Default)]
pub struct CubeDrawing {
    cube: Option<ObjectId>,
    timeline: Option<TimelineHandle>,
    control_panel: Option<ControlPanel>,
    pending: CommandQueue,
}

impl CubeDrawing {
    /// Create an uninitialized drawing
    pub fn new() -> Self {
        Self::default()
    }

    /// Objects, then animation, then controls
    pub fn initialize(&mut self, ctx: &mut DrawingContext) -> Result<(), DrawingError> {
        self.initialize_objects(ctx);
        self.initialize_animation()?;
        self.initialize_control_panel()
    }

    /// Add the cube to the scene. Each call adds another cube and animates the newest.
    pub fn initialize_objects(&mut self, ctx: &mut DrawingContext) -> ObjectId {
        let cube = SceneObject::new("Cube", Mesh::cube())
            .with_rotation(CUBE_ROTATION)
            .with_position(CUBE_POSITION);
        let id = ctx.scene.add(cube);
        self.cube = Some(id);
        id
    }

    /// Build the paused fall and rotate timeline for the cube
    pub fn initialize_animation(&mut self) -> Result<(), DrawingError> {
        let cube = self.cube.ok_or(DrawingError::ObjectsMissing)?;

        let mut timeline = Timeline::new(TimelineOptions {
            paused: true,
            ..Default::default()
        });

        let fall = Tween::to(cube, ANIMATION_DURATION)
            .named("fall")
            .property(Property::Position(Axis::Y), FLOOR_Y)
            .ease(Easing::BounceOut);
        timeline.add(fall, None)?;

        let rotate = Tween::to(cube, ANIMATION_DURATION)
            .named("rotate")
            .property(Property::Rotation(Axis::X), 0.0)
            .property(Property::Rotation(Axis::Y), 0.0)
            .ease(Easing::SineInOut);
        timeline.add(rotate, Some(0.0))?;

        tracing::info!(
            "Cube animation ready: {} tracks, {:.1}s",
            timeline.track_count(),
            timeline.duration()
        );

        // Panel actions hold the handle, so swap the contents rather than the handle
        match &self.timeline {
            Some(handle) => *handle.lock() = timeline,
            None => self.timeline = Some(Arc::new(Mutex::new(timeline))),
        }
        Ok(())
    }

    /// Create the control panel unless it already exists
    pub fn initialize_control_panel(&mut self) -> Result<(), DrawingError> {
        if self.control_panel.is_some() {
            return Ok(());
        }
        if self.timeline.is_none() {
            return Err(DrawingError::TimelineMissing);
        }

        let mut panel = ControlPanel::new(PANEL_TITLE);
        for command in [
            PlaybackCommand::Play,
            PlaybackCommand::Stop,
            PlaybackCommand::Reset,
            PlaybackCommand::Reverse,
        ] {
            let pending = self.pending.clone();
            panel.add(command.name(), move || pending.lock().push(command));
        }

        self.control_panel = Some(panel);
        Ok(())
    }
}

impl Drawing for CubeDrawing {
    fn init(&mut self, ctx: &mut DrawingContext) -> Result<(), DrawingError> {
        self.initialize(ctx)
    }

    fn update(&mut self, ctx: &mut DrawingContext, delta_time: f32) -> Result<(), DrawingError> {
        let Some(timeline) = &self.timeline else {
            return Ok(());
        };
        let commands = std::mem::take(&mut *self.pending.lock());
        let mut timeline = timeline.lock();
        for command in commands {
            command.apply(&mut timeline, &mut ctx.scene)?;
        }

        if ctx.renderer().use_timeline {
            timeline.tick(delta_time, &mut ctx.scene)?;
        }
        Ok(())
    }

    fn ui(&mut self, egui_ctx: &egui::Context) {
        if let Some(panel) = &mut self.control_panel {
            panel.show(egui_ctx);
        }
    }

    fn on_resize(&mut self, _ctx: &mut DrawingContext) -> Result<(), DrawingError> {
        self.initialize_control_panel()
    }

    fn timeline(&self) -> Option<TimelineHandle> {
        self.timeline.clone()
    }
}
