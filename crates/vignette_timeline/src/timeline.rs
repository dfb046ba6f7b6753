// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline composing tweens under a single play/stop/reverse/seek surface.

use crate::binding::AnimationTarget;
use crate::tween::Tween;
use crate::TimelineError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a track in a timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub Uuid);

impl TrackId {
    /// Create a new random track ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Not advancing, position retained
    #[default]
    Paused,
    /// Playing forward
    Playing,
    /// Playing backward
    Reversing,
}

impl PlaybackState {
    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackState::Paused => "Paused",
            PlaybackState::Playing => "Playing",
            PlaybackState::Reversing => "Reversing",
        }
    }
}

/// Construction options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineOptions {
    /// Start in the paused state
    pub paused: bool,
    /// Playback speed multiplier
    pub time_scale: f32,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            paused: false,
            time_scale: 1.0,
        }
    }
}

/// A tween placed on the timeline
#[derive(Debug, Clone)]
pub struct TimelineTrack {
    /// Track ID
    pub id: TrackId,
    /// Start time within the timeline, in seconds
    pub offset: f32,
    /// The tween
    pub tween: Tween,
}

impl TimelineTrack {
    /// Time at which the track finishes
    pub fn end(&self) -> f32 {
        self.offset + self.tween.duration
    }
}

/// Ordered collection of tweens sharing one clock.
///
/// `play`, `stop` and `reverse` only change the state. Everything that moves
/// the playhead (`tick`, `seek`, `seek_progress`, `reset`) writes the tracks
/// at the new time into the target before returning.
#[derive(Debug, Clone)]
pub struct Timeline {
    tracks: IndexMap<TrackId, TimelineTrack>,
    time: f32,
    state: PlaybackState,
    time_scale: f32,
}

impl Timeline {
    /// Create an empty timeline
    pub fn new(options: TimelineOptions) -> Self {
        Self {
            tracks: IndexMap::new(),
            time: 0.0,
            state: if options.paused {
                PlaybackState::Paused
            } else {
                PlaybackState::Playing
            },
            time_scale: sanitize_time_scale(options.time_scale),
        }
    }

    /// Add a tween. With no offset it is appended at the current end of the timeline.
    pub fn add(&mut self, tween: Tween, offset: Option<f32>) -> Result<TrackId, TimelineError> {
        tween.validate()?;
        let offset = match offset {
            Some(offset) if !offset.is_finite() || offset < 0.0 => {
                return Err(TimelineError::InvalidOffset(offset));
            }
            Some(offset) => offset,
            None => self.duration(),
        };

        let id = TrackId::new();
        tracing::debug!(
            "Timeline track '{}' added at {:.2}s ({:.2}s, {})",
            tween.name,
            offset,
            tween.duration,
            tween.easing.name()
        );
        self.tracks.insert(id, TimelineTrack { id, offset, tween });
        Ok(id)
    }

    /// Get a track
    pub fn track(&self, id: TrackId) -> Option<&TimelineTrack> {
        self.tracks.get(&id)
    }

    /// Get all tracks in insertion order
    pub fn tracks(&self) -> impl Iterator<Item = &TimelineTrack> {
        self.tracks.values()
    }

    /// Get track count
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Total length: the latest track end
    pub fn duration(&self) -> f32 {
        self.tracks.values().map(TimelineTrack::end).fold(0.0, f32::max)
    }

    /// Playhead position in seconds
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Playhead position as a fraction of the duration
    pub fn progress(&self) -> f32 {
        let duration = self.duration();
        if duration > 0.0 {
            self.time / duration
        } else {
            0.0
        }
    }

    /// Current playback state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Playing forward or backward
    pub fn is_active(&self) -> bool {
        matches!(self.state, PlaybackState::Playing | PlaybackState::Reversing)
    }

    /// Playback speed multiplier
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Set the playback speed multiplier. Negative or non-finite values are rejected.
    pub fn set_time_scale(&mut self, time_scale: f32) -> Result<(), TimelineError> {
        if !time_scale.is_finite() || time_scale < 0.0 {
            return Err(TimelineError::InvalidTimeScale(time_scale));
        }
        self.time_scale = time_scale;
        Ok(())
    }

    /// Play forward from the current position
    pub fn play(&mut self) {
        self.state = PlaybackState::Playing;
    }

    /// Halt without moving the playhead
    pub fn stop(&mut self) {
        self.state = PlaybackState::Paused;
    }

    /// Play backward from the current position
    pub fn reverse(&mut self) {
        self.state = PlaybackState::Reversing;
    }

    /// Move the playhead to `time` seconds, clamped to the timeline, and render
    /// there. State is unchanged.
    pub fn seek<T>(&mut self, time: f32, target: &mut T) -> Result<(), TimelineError>
    where
        T: AnimationTarget + ?Sized,
    {
        let time = if time.is_finite() { time } else { 0.0 };
        self.move_to(time.clamp(0.0, self.duration()), target)
    }

    /// Move the playhead to a fraction of the duration and render there.
    /// State is unchanged.
    pub fn seek_progress<T>(&mut self, fraction: f32, target: &mut T) -> Result<(), TimelineError>
    where
        T: AnimationTarget + ?Sized,
    {
        let fraction = if fraction.is_finite() { fraction } else { 0.0 };
        self.move_to(fraction.clamp(0.0, 1.0) * self.duration(), target)
    }

    /// Pause and rewind to progress 0, writing the start values back.
    pub fn reset<T>(&mut self, target: &mut T) -> Result<(), TimelineError>
    where
        T: AnimationTarget + ?Sized,
    {
        self.state = PlaybackState::Paused;
        self.move_to(0.0, target)
    }

    /// Advance by `delta_time` seconds and write animated values into `target`.
    ///
    /// Reaching either end clamps the playhead and pauses.
    pub fn tick<T>(&mut self, delta_time: f32, target: &mut T) -> Result<(), TimelineError>
    where
        T: AnimationTarget + ?Sized,
    {
        let delta_time = if delta_time.is_finite() { delta_time.max(0.0) } else { 0.0 };
        let step = delta_time * self.time_scale;

        let next = match self.state {
            PlaybackState::Playing => {
                let duration = self.duration();
                let next = self.time + step;
                if next >= duration {
                    self.state = PlaybackState::Paused;
                    tracing::debug!("Timeline reached the end at {:.2}s", duration);
                    duration
                } else {
                    next
                }
            }
            PlaybackState::Reversing => {
                let next = self.time - step;
                if next <= 0.0 {
                    self.state = PlaybackState::Paused;
                    tracing::debug!("Timeline reached the start");
                    0.0
                } else {
                    next
                }
            }
            PlaybackState::Paused => return Ok(()),
        };

        self.move_to(next, target)
    }

    fn move_to<T>(&mut self, time: f32, target: &mut T) -> Result<(), TimelineError>
    where
        T: AnimationTarget + ?Sized,
    {
        let previous = self.time;
        self.time = time;
        if time == previous {
            return Ok(());
        }
        self.render(previous, target)
    }

    /// Write every started track at the playhead.
    ///
    /// Forward moves render tracks in start order, backward moves in reverse
    /// start order, so the earliest track wins when rewinding.
    fn render<T>(&mut self, previous: f32, target: &mut T) -> Result<(), TimelineError>
    where
        T: AnimationTarget + ?Sized,
    {
        let mut order: Vec<usize> = (0..self.tracks.len()).collect();
        order.sort_by(|&a, &b| {
            let a = self.tracks[a].offset;
            let b = self.tracks[b].offset;
            a.total_cmp(&b)
        });
        if self.time < previous {
            order.reverse();
        }

        let time = self.time;
        for index in order {
            let Some((_, track)) = self.tracks.get_index_mut(index) else {
                continue;
            };
            let local = time - track.offset;
            if local < 0.0 && !track.tween.is_started() {
                continue;
            }
            let local = local.clamp(0.0, track.tween.duration);
            track.tween.render(local, target)?;
        }
        Ok(())
    }
}

fn sanitize_time_scale(time_scale: f32) -> f32 {
    if time_scale.is_finite() && time_scale >= 0.0 {
        time_scale
    } else {
        tracing::warn!("Ignoring invalid time scale {time_scale}, using 1.0");
        1.0
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(TimelineOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Axis, ObjectId, Property, PropertyBinding};
    use crate::easing::Easing;

    struct Cube {
        id: ObjectId,
        position: [f32; 3],
        rotation: [f32; 3],
    }

    impl Cube {
        fn new() -> Self {
            Self {
                id: ObjectId::new(),
                position: [0.0, 30.0, 0.0],
                rotation: [-2.0, 2.0, 0.0],
            }
        }
    }

    impl AnimationTarget for Cube {
        fn read(&self, binding: &PropertyBinding) -> Option<f32> {
            if binding.object != self.id {
                return None;
            }
            match binding.property {
                Property::Position(axis) => Some(self.position[axis.index()]),
                Property::Rotation(axis) => Some(self.rotation[axis.index()]),
                Property::Scale(_) => None,
            }
        }

        fn write(&mut self, binding: &PropertyBinding, value: f32) -> bool {
            if binding.object != self.id {
                return false;
            }
            match binding.property {
                Property::Position(axis) => self.position[axis.index()] = value,
                Property::Rotation(axis) => self.rotation[axis.index()] = value,
                Property::Scale(_) => return false,
            }
            true
        }
    }

    fn fall_and_rotate(cube: &Cube) -> Timeline {
        let mut timeline = Timeline::new(TimelineOptions {
            paused: true,
            ..Default::default()
        });
        let fall = Tween::to(cube.id, 3.5)
            .property(Property::Position(Axis::Y), -20.0)
            .ease(Easing::BounceOut);
        let rotate = Tween::to(cube.id, 3.5)
            .property(Property::Rotation(Axis::X), 0.0)
            .property(Property::Rotation(Axis::Y), 0.0)
            .ease(Easing::SineInOut);
        timeline.add(fall, None).unwrap();
        timeline.add(rotate, Some(0.0)).unwrap();
        timeline
    }

    #[test]
    fn test_append_and_explicit_offsets() {
        let id = ObjectId::new();
        let mut timeline = Timeline::default();
        let a = timeline.add(Tween::to(id, 1.0), None).unwrap();
        let b = timeline.add(Tween::to(id, 2.0), None).unwrap();
        let c = timeline.add(Tween::to(id, 0.5), Some(0.0)).unwrap();

        assert_eq!(timeline.track(a).unwrap().offset, 0.0);
        assert_eq!(timeline.track(b).unwrap().offset, 1.0);
        assert_eq!(timeline.track(c).unwrap().offset, 0.0);
        assert_eq!(timeline.duration(), 3.0);
        assert_eq!(timeline.track_count(), 3);
    }

    #[test]
    fn test_invalid_offset_rejected() {
        let mut timeline = Timeline::default();
        let result = timeline.add(Tween::to(ObjectId::new(), 1.0), Some(-1.0));
        assert!(matches!(result, Err(TimelineError::InvalidOffset(_))));
        assert_eq!(timeline.track_count(), 0);
    }

    #[test]
    fn test_concurrent_tracks_share_duration() {
        let cube = Cube::new();
        let timeline = fall_and_rotate(&cube);
        assert_eq!(timeline.state(), PlaybackState::Paused);
        assert_eq!(timeline.duration(), 3.5);
        assert!(timeline.tracks().all(|t| t.offset == 0.0));
    }

    #[test]
    fn test_paused_timeline_does_not_advance() {
        let mut cube = Cube::new();
        let mut timeline = fall_and_rotate(&cube);
        timeline.tick(1.0, &mut cube).unwrap();
        assert_eq!(timeline.time(), 0.0);
        assert_eq!(cube.position, [0.0, 30.0, 0.0]);
    }

    #[test]
    fn test_play_to_completion() {
        let mut cube = Cube::new();
        let mut timeline = fall_and_rotate(&cube);
        timeline.play();
        for _ in 0..60 {
            timeline.tick(0.1, &mut cube).unwrap();
        }
        assert_eq!(timeline.state(), PlaybackState::Paused);
        assert_eq!(timeline.progress(), 1.0);
        assert!((cube.position[1] + 20.0).abs() < 1e-4);
        assert!(cube.rotation[0].abs() < 1e-4);
        assert!(cube.rotation[1].abs() < 1e-4);
        assert_eq!(cube.rotation[2], 0.0);
    }

    #[test]
    fn test_stop_retains_position_and_play_resumes() {
        let mut cube = Cube::new();
        let mut timeline = fall_and_rotate(&cube);
        timeline.play();
        timeline.tick(1.0, &mut cube).unwrap();
        timeline.stop();
        let held = timeline.time();
        assert_eq!(held, 1.0);

        timeline.tick(1.0, &mut cube).unwrap();
        assert_eq!(timeline.time(), held);

        timeline.play();
        timeline.tick(0.5, &mut cube).unwrap();
        assert!((timeline.time() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_reset_from_any_state() {
        let mut cube = Cube::new();
        let mut timeline = fall_and_rotate(&cube);

        timeline.play();
        timeline.tick(2.0, &mut cube).unwrap();
        timeline.reset(&mut cube).unwrap();
        assert_eq!(timeline.progress(), 0.0);
        assert_eq!(timeline.state(), PlaybackState::Paused);

        timeline.seek_progress(0.7, &mut cube).unwrap();
        timeline.reverse();
        timeline.tick(0.2, &mut cube).unwrap();
        timeline.reset(&mut cube).unwrap();
        assert_eq!(timeline.progress(), 0.0);

        timeline.seek_progress(0.3, &mut cube).unwrap();
        timeline.reset(&mut cube).unwrap();
        assert_eq!(timeline.progress(), 0.0);
    }

    #[test]
    fn test_reset_restores_captured_start_values() {
        let mut cube = Cube::new();
        let mut timeline = fall_and_rotate(&cube);
        timeline.play();
        timeline.tick(5.0, &mut cube).unwrap();
        assert!((cube.position[1] + 20.0).abs() < 1e-4);

        // no tick in between: reset writes the start values itself
        timeline.reset(&mut cube).unwrap();
        assert_eq!(cube.position, [0.0, 30.0, 0.0]);
        assert_eq!(cube.rotation, [-2.0, 2.0, 0.0]);
    }

    #[test]
    fn test_reset_while_playing_renders_before_next_tick() {
        let mut cube = Cube::new();
        let mut timeline = fall_and_rotate(&cube);
        timeline.play();
        timeline.tick(1.75, &mut cube).unwrap();
        assert!(cube.position[1] < 30.0);

        timeline.reset(&mut cube).unwrap();
        assert_eq!(timeline.state(), PlaybackState::Paused);
        assert_eq!(cube.position[1], 30.0);

        // a paused tick leaves the restored values alone
        timeline.tick(1.0, &mut cube).unwrap();
        assert_eq!(cube.position[1], 30.0);
    }

    #[test]
    fn test_seek_progress_renders_immediately() {
        let mut cube = Cube::new();
        let mut timeline = fall_and_rotate(&cube);
        timeline.play();
        timeline.tick(0.0, &mut cube).unwrap();
        timeline.tick(0.5, &mut cube).unwrap();

        timeline.seek_progress(1.0, &mut cube).unwrap();
        assert_eq!(timeline.state(), PlaybackState::Playing);
        assert!((cube.position[1] + 20.0).abs() < 1e-4);

        timeline.seek(0.0, &mut cube).unwrap();
        assert_eq!(cube.position, [0.0, 30.0, 0.0]);
    }

    #[test]
    fn test_reverse_runs_back_to_start() {
        let mut cube = Cube::new();
        let mut timeline = fall_and_rotate(&cube);
        timeline.play();
        timeline.tick(2.0, &mut cube).unwrap();
        timeline.reverse();
        assert_eq!(timeline.state(), PlaybackState::Reversing);

        timeline.tick(1.0, &mut cube).unwrap();
        assert!((timeline.time() - 1.0).abs() < 1e-6);

        timeline.tick(5.0, &mut cube).unwrap();
        assert_eq!(timeline.time(), 0.0);
        assert_eq!(timeline.state(), PlaybackState::Paused);
        assert_eq!(cube.position, [0.0, 30.0, 0.0]);
    }

    #[test]
    fn test_sequential_tracks_capture_at_start() {
        let mut cube = Cube::new();
        let mut timeline = Timeline::default();
        let y = Property::Position(Axis::Y);
        timeline.add(Tween::to(cube.id, 1.0).property(y, 0.0), None).unwrap();
        timeline.add(Tween::to(cube.id, 1.0).property(y, 10.0), None).unwrap();

        timeline.tick(0.5, &mut cube).unwrap();
        assert!((cube.position[1] - 15.0).abs() < 1e-4);

        timeline.tick(1.0, &mut cube).unwrap();
        assert!((cube.position[1] - 5.0).abs() < 1e-4);

        // rewinding into the first track: the second writes its start, the first wins
        timeline.seek(0.5, &mut cube).unwrap();
        assert!((cube.position[1] - 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_missing_target_propagates() {
        let mut cube = Cube::new();
        let mut timeline = Timeline::default();
        timeline
            .add(Tween::to(ObjectId::new(), 1.0).property(Property::Position(Axis::X), 1.0), None)
            .unwrap();
        assert!(timeline.tick(0.1, &mut cube).is_err());
    }

    #[test]
    fn test_time_scale() {
        let mut cube = Cube::new();
        let mut timeline = fall_and_rotate(&cube);
        timeline.set_time_scale(2.0).unwrap();
        timeline.play();
        timeline.tick(1.0, &mut cube).unwrap();
        assert!((timeline.time() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_time_scale_rejected() {
        let mut cube = Cube::new();
        let mut timeline = fall_and_rotate(&cube);
        assert!(matches!(
            timeline.set_time_scale(f32::NAN),
            Err(TimelineError::InvalidTimeScale(_))
        ));
        assert!(matches!(
            timeline.set_time_scale(-1.0),
            Err(TimelineError::InvalidTimeScale(_))
        ));
        assert_eq!(timeline.time_scale(), 1.0);

        // options go through the same check
        let timeline = Timeline::new(TimelineOptions {
            paused: true,
            time_scale: f32::INFINITY,
        });
        assert_eq!(timeline.time_scale(), 1.0);

        // the playhead never leaves the timeline
        let mut timeline = fall_and_rotate(&cube);
        timeline.play();
        timeline.tick(f32::NAN, &mut cube).unwrap();
        assert_eq!(timeline.time(), 0.0);
        assert!(timeline.time().is_finite());
    }
}
