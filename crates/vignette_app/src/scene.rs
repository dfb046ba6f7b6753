// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene graph for a drawing.
//!
//! Objects are owned by the graph once added and addressed by [`ObjectId`].
//! The graph implements [`AnimationTarget`] so timelines can drive object
//! transforms without holding references to them.

use crate::config::Color;
use crate::math::{self, Mat4};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use vignette_timeline::{AnimationTarget, ObjectId, Property, PropertyBinding};

/// Renderable geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Mesh {
    /// Axis-aligned cube centered on the object origin
    Cube {
        /// Edge length
        size: f32,
        /// Base color
        color: Color,
    },
}

impl Mesh {
    /// Cube with the default drawing look
    pub fn cube() -> Self {
        Mesh::Cube {
            size: 20.0,
            color: Color(0xff8c00),
        }
    }
}

/// An object in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Display name
    pub name: String,
    /// Geometry
    pub mesh: Mesh,
    /// Translation
    pub position: [f32; 3],
    /// Euler rotation in radians, XYZ order
    pub rotation: [f32; 3],
    /// Per-axis scale
    pub scale: [f32; 3],
}

impl SceneObject {
    /// Create an object at the origin
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            mesh,
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }

    /// Set the position
    pub fn with_position(mut self, position: [f32; 3]) -> Self {
        self.position = position;
        self
    }

    /// Set the rotation
    pub fn with_rotation(mut self, rotation: [f32; 3]) -> Self {
        self.rotation = rotation;
        self
    }

    /// Model matrix
    pub fn model_matrix(&self) -> Mat4 {
        math::model(self.position, self.rotation, self.scale)
    }

    fn slot(&self, property: Property) -> f32 {
        match property {
            Property::Position(axis) => self.position[axis.index()],
            Property::Rotation(axis) => self.rotation[axis.index()],
            Property::Scale(axis) => self.scale[axis.index()],
        }
    }

    fn slot_mut(&mut self, property: Property) -> &mut f32 {
        match property {
            Property::Position(axis) => &mut self.position[axis.index()],
            Property::Rotation(axis) => &mut self.rotation[axis.index()],
            Property::Scale(axis) => &mut self.scale[axis.index()],
        }
    }
}

/// Collection of objects composed for each frame
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    objects: IndexMap<ObjectId, SceneObject>,
}

impl SceneGraph {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object, returning its ID
    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        let id = ObjectId::new();
        tracing::debug!("Added '{}' to the scene", object.name);
        self.objects.insert(id, object);
        id
    }

    /// Get an object
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    /// All objects in insertion order
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter().map(|(id, object)| (*id, object))
    }

    /// Number of objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }
}

impl AnimationTarget for SceneGraph {
    fn read(&self, binding: &PropertyBinding) -> Option<f32> {
        self.objects
            .get(&binding.object)
            .map(|object| object.slot(binding.property))
    }

    fn write(&mut self, binding: &PropertyBinding, value: f32) -> bool {
        match self.objects.get_mut(&binding.object) {
            Some(object) => {
                *object.slot_mut(binding.property) = value;
                true
            }
            None => false,
        }
    }
}
