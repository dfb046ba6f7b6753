// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tween timelines for Vignette drawings.
//!
//! This crate provides the animation side of a drawing:
//! - Easing curves
//! - Property bindings to scene objects
//! - `to` tweens with lazily captured start values
//! - Timelines with play/stop/reverse/seek control
//!
//! ## Architecture
//!
//! Timelines never own the objects they animate. Whenever the playhead moves
//! they read and write bound properties through the [`AnimationTarget`]
//! trait, which the scene graph implements.

pub mod binding;
pub mod easing;
pub mod timeline;
pub mod tween;

pub use binding::{AnimationTarget, Axis, ObjectId, Property, PropertyBinding};
pub use easing::Easing;
pub use timeline::{PlaybackState, Timeline, TimelineOptions, TimelineTrack, TrackId};
pub use tween::{Tween, TweenProperty};

use thiserror::Error;

/// Timeline errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimelineError {
    /// A tween is bound to an object or property the target does not have
    #[error("No animatable property `{property}` on object {object:?}")]
    MissingTarget {
        /// Object the tween is bound to
        object: ObjectId,
        /// Property path
        property: String,
    },

    /// Tween duration is negative or not finite
    #[error("Invalid tween duration: {0}")]
    InvalidDuration(f32),

    /// Track offset is negative or not finite
    #[error("Invalid track offset: {0}")]
    InvalidOffset(f32),

    /// Playback speed is negative or not finite
    #[error("Invalid time scale: {0}")]
    InvalidTimeScale(f32),
}

impl TimelineError {
    pub(crate) fn missing_target(binding: &PropertyBinding) -> Self {
        Self::MissingTarget {
            object: binding.object,
            property: binding.property.path(),
        }
    }
}
