//! Camera, grouping, world, and light handles
//!
//! These wrappers follow one idiom throughout: hand a committed child to
//! its parent, then drop the child wrapper. The parent's stored reference
//! keeps the child alive until the parent itself is released.

use crate::api::device::ObjectRef;
use crate::api::error::EngineError;
use crate::api::geometry::GeometricModel;
use crate::backend::params::ParamValue;
use crate::backend::registry::ObjectKey;
use crate::backend::scene::world_bounds;
use crate::foundation::math::{Aabb, Mat4, Vec3};

/// Handle to a perspective camera
#[derive(Debug)]
pub struct Camera {
    inner: ObjectRef,
}

impl Camera {
    pub(crate) fn from_ref(inner: ObjectRef) -> Self {
        Self { inner }
    }

    pub(crate) fn key(&self) -> ObjectKey {
        self.inner.key()
    }

    /// Set a float parameter such as "aspect" or "fovy"
    pub fn set_f32(&mut self, name: &str, value: f32) -> Result<(), EngineError> {
        self.inner.set_f32(name, value)
    }

    /// Set a vector parameter such as "position", "direction", or "up"
    pub fn set_vec3(&mut self, name: &str, value: Vec3) -> Result<(), EngineError> {
        self.inner.set_vec3(name, value)
    }

    /// Finalize the projection; "position", "direction", and "up" are
    /// required
    pub fn commit(&mut self) -> Result<(), EngineError> {
        self.inner.commit()
    }
}

/// Handle to a group of geometric models
#[derive(Debug)]
pub struct Group {
    inner: ObjectRef,
}

impl Group {
    pub(crate) fn from_ref(inner: ObjectRef) -> Self {
        Self { inner }
    }

    pub(crate) fn key(&self) -> ObjectKey {
        self.inner.key()
    }

    /// Store the model list under the group's "geometry" slot
    pub fn set_models(&mut self, models: &[&GeometricModel]) -> Result<(), EngineError> {
        let keys = models.iter().map(|model| model.key()).collect();
        self.inner.set("set_models", "geometry", ParamValue::ObjectList(keys))
    }

    /// Finalize the group; every listed model must be committed
    pub fn commit(&mut self) -> Result<(), EngineError> {
        self.inner.commit()
    }
}

/// Handle to an instance, a placement of a group within a world
#[derive(Debug)]
pub struct Instance {
    inner: ObjectRef,
}

impl Instance {
    pub(crate) fn from_ref(inner: ObjectRef) -> Self {
        Self { inner }
    }

    pub(crate) fn key(&self) -> ObjectKey {
        self.inner.key()
    }

    /// Place the group with a transform instead of the identity default
    pub fn set_transform(&mut self, transform: Mat4) -> Result<(), EngineError> {
        self.inner.set_mat4("transform", transform)
    }

    /// Finalize the placement
    pub fn commit(&mut self) -> Result<(), EngineError> {
        self.inner.commit()
    }
}

/// Handle to a world, the root scene container
#[derive(Debug)]
pub struct World {
    inner: ObjectRef,
}

impl World {
    pub(crate) fn from_ref(inner: ObjectRef) -> Self {
        Self { inner }
    }

    pub(crate) fn key(&self) -> ObjectKey {
        self.inner.key()
    }

    /// Store the instance list
    pub fn set_instances(&mut self, instances: &[&Instance]) -> Result<(), EngineError> {
        let keys = instances.iter().map(|instance| instance.key()).collect();
        self.inner
            .set("set_instances", "instance", ParamValue::ObjectList(keys))
    }

    /// Store the light list
    pub fn set_lights(&mut self, lights: &[&Light]) -> Result<(), EngineError> {
        let keys = lights.iter().map(|light| light.key()).collect();
        self.inner.set("set_lights", "light", ParamValue::ObjectList(keys))
    }

    /// Finalize the world for rendering and queries
    pub fn commit(&mut self) -> Result<(), EngineError> {
        self.inner.commit()
    }

    /// Axis-aligned bounds of the committed world
    pub fn bounds(&self) -> Result<Aabb, EngineError> {
        const OP: &str = "bounds";
        self.inner
            .device()
            .with_state(OP, |state| world_bounds(&state.registry, self.key(), OP))
    }
}

/// Handle to a light
#[derive(Debug)]
pub struct Light {
    inner: ObjectRef,
}

impl Light {
    pub(crate) fn from_ref(inner: ObjectRef) -> Self {
        Self { inner }
    }

    pub(crate) fn key(&self) -> ObjectKey {
        self.inner.key()
    }

    /// Set the light color
    pub fn set_color(&mut self, color: Vec3) -> Result<(), EngineError> {
        self.inner.set_vec3("color", color)
    }

    /// Set the light intensity
    pub fn set_intensity(&mut self, intensity: f32) -> Result<(), EngineError> {
        self.inner.set_f32("intensity", intensity)
    }

    /// Finalize the light
    pub fn commit(&mut self) -> Result<(), EngineError> {
        self.inner.commit()
    }
}
