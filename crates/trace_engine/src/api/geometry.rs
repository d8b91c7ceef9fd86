//! Geometry, material, and geometric model handles

use crate::api::data::Data;
use crate::api::device::ObjectRef;
use crate::api::error::EngineError;
use crate::backend::params::ParamValue;
use crate::backend::registry::ObjectKey;
use crate::foundation::math::Vec3;

/// Handle to a triangle mesh geometry
///
/// A mesh consumes committed data buffers under the slots
/// `vertex.position` (vec3), `vertex.color` (vec4, optional), and `index`
/// (index triples). Attaching a buffer stores a retained reference, so the
/// caller's [`Data`] wrapper can be dropped immediately afterwards.
#[derive(Debug)]
pub struct Geometry {
    inner: ObjectRef,
}

impl Geometry {
    pub(crate) fn from_ref(inner: ObjectRef) -> Self {
        Self { inner }
    }

    pub(crate) fn key(&self) -> ObjectKey {
        self.inner.key()
    }

    /// Attach a data buffer under a named slot
    pub fn set_data(&mut self, name: &str, data: &Data) -> Result<(), EngineError> {
        self.inner.set("set_data", name, ParamValue::Object(data.key()))
    }

    /// Finalize the mesh, validating buffer shapes and index ranges
    pub fn commit(&mut self) -> Result<(), EngineError> {
        self.inner.commit()
    }
}

/// Handle to a material
#[derive(Debug)]
pub struct Material {
    inner: ObjectRef,
}

impl Material {
    pub(crate) fn from_ref(inner: ObjectRef) -> Self {
        Self { inner }
    }

    pub(crate) fn key(&self) -> ObjectKey {
        self.inner.key()
    }

    /// Set the diffuse reflectance
    pub fn set_kd(&mut self, kd: Vec3) -> Result<(), EngineError> {
        self.inner.set_vec3("kd", kd)
    }

    /// Finalize the material
    pub fn commit(&mut self) -> Result<(), EngineError> {
        self.inner.commit()
    }
}

/// Handle to a geometric model, the binding of a geometry to its shading
/// state
///
/// After commit, the model holds retained references to both the geometry
/// and the material; the caller's wrappers for those can be dropped.
#[derive(Debug)]
pub struct GeometricModel {
    inner: ObjectRef,
}

impl GeometricModel {
    pub(crate) fn from_ref(inner: ObjectRef) -> Self {
        Self { inner }
    }

    pub(crate) fn key(&self) -> ObjectKey {
        self.inner.key()
    }

    /// Bind the material shading this model
    pub fn set_material(&mut self, material: &Material) -> Result<(), EngineError> {
        self.inner
            .set("set_material", "material", ParamValue::Object(material.key()))
    }

    /// Finalize the binding; the geometry and material must be committed
    pub fn commit(&mut self) -> Result<(), EngineError> {
        self.inner.commit()
    }
}
