// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tweens: timed interpolation of object properties toward end values.

use crate::binding::{AnimationTarget, ObjectId, Property, PropertyBinding};
use crate::easing::Easing;
use crate::TimelineError;
use serde::{Deserialize, Serialize};

/// One animated property of a tween
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweenProperty {
    /// Property being driven
    pub property: Property,
    /// Value reached at the end of the tween
    pub end: f32,
    /// Value captured when the tween first rendered
    #[serde(skip)]
    start: Option<f32>,
}

impl TweenProperty {
    /// Start value, once captured
    pub fn start(&self) -> Option<f32> {
        self.start
    }
}

/// Animates properties of one object from their current values to end values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tween {
    /// Display name
    pub name: String,
    /// Animated object
    pub object: ObjectId,
    /// Length in seconds
    pub duration: f32,
    /// Easing curve
    pub easing: Easing,
    properties: Vec<TweenProperty>,
}

impl Tween {
    /// Start building a tween that animates `object` over `duration` seconds
    pub fn to(object: ObjectId, duration: f32) -> Self {
        Self {
            name: String::from("Tween"),
            object,
            duration,
            easing: Easing::default(),
            properties: Vec::new(),
        }
    }

    /// Set the display name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Animate `property` toward `end`. Repeating a property replaces its end value.
    pub fn property(mut self, property: Property, end: f32) -> Self {
        if let Some(existing) = self.properties.iter_mut().find(|p| p.property == property) {
            existing.end = end;
        } else {
            self.properties.push(TweenProperty {
                property,
                end,
                start: None,
            });
        }
        self
    }

    /// Set the easing curve
    pub fn ease(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Animated properties
    pub fn properties(&self) -> &[TweenProperty] {
        &self.properties
    }

    /// Whether start values have been captured
    pub fn is_started(&self) -> bool {
        !self.properties.is_empty() && self.properties.iter().all(|p| p.start.is_some())
    }

    /// Check the duration is usable
    pub fn validate(&self) -> Result<(), TimelineError> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(TimelineError::InvalidDuration(self.duration));
        }
        Ok(())
    }

    /// Render the tween at `local_time` seconds from its start.
    ///
    /// The first render captures the current property values as start values.
    pub fn render<T>(&mut self, local_time: f32, target: &mut T) -> Result<(), TimelineError>
    where
        T: AnimationTarget + ?Sized,
    {
        let object = self.object;

        // All reads must succeed before any start value is committed
        let mut captured = Vec::new();
        for (index, prop) in self.properties.iter().enumerate() {
            if prop.start.is_none() {
                let binding = PropertyBinding::new(object, prop.property);
                let value = target
                    .read(&binding)
                    .ok_or_else(|| TimelineError::missing_target(&binding))?;
                captured.push((index, value));
            }
        }
        for (index, value) in captured {
            self.properties[index].start = Some(value);
        }

        let fraction = if self.duration <= 0.0 {
            1.0
        } else {
            local_time / self.duration
        };
        let eased = self.easing.evaluate(fraction);

        for prop in &self.properties {
            let binding = PropertyBinding::new(object, prop.property);
            let start = prop.start.unwrap_or(prop.end);
            let value = start + (prop.end - start) * eased;
            if !target.write(&binding, value) {
                return Err(TimelineError::missing_target(&binding));
            }
        }

        Ok(())
    }
}
