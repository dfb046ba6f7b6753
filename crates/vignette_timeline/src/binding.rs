// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bindings from tweens to animated object properties.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an animated object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    /// Create a new random object ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

/// Vector component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// X component
    X,
    /// Y component
    Y,
    /// Z component
    Z,
}

impl Axis {
    /// Index into a `[f32; 3]`
    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Numeric property of an object that a tween can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    /// Translation component
    Position(Axis),
    /// Euler rotation component, in radians
    Rotation(Axis),
    /// Scale component
    Scale(Axis),
}

impl Property {
    /// Dotted path, e.g. `position.y`
    pub fn path(&self) -> String {
        let (group, axis) = match self {
            Property::Position(axis) => ("position", axis),
            Property::Rotation(axis) => ("rotation", axis),
            Property::Scale(axis) => ("scale", axis),
        };
        let axis = match axis {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        format!("{group}.{axis}")
    }
}

/// A single property of a single object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyBinding {
    /// Target object
    pub object: ObjectId,
    /// Property on that object
    pub property: Property,
}

impl PropertyBinding {
    /// Bind a property of an object
    pub fn new(object: ObjectId, property: Property) -> Self {
        Self { object, property }
    }
}

/// Something that owns animated objects, typically a scene graph.
///
/// Timelines never hold references to the objects they animate; they read
/// and write through this trait on every render.
pub trait AnimationTarget {
    /// Current value of a bound property, `None` if the object is unknown
    fn read(&self, binding: &PropertyBinding) -> Option<f32>;

    /// Write a bound property. Returns `false` if the object is unknown.
    fn write(&mut self, binding: &PropertyBinding, value: f32) -> bool;
}
