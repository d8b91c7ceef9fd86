//! Shared data buffers
//!
//! A [`Data`] object wraps a caller-owned array behind an [`Arc`] and hands
//! it to the device without copying. The caller may drop its `Data` wrapper
//! as soon as the buffer is attached to a geometry; the geometry's own
//! retained reference keeps the array alive.

use crate::api::device::ObjectRef;
use crate::api::error::EngineError;
use crate::backend::registry::ObjectKey;
use crate::foundation::math::{Vec3, Vec4};
use std::sync::Arc;

/// Typed array content shared with the device
#[derive(Debug, Clone)]
pub enum DataArray {
    /// 3-component float vectors (vertex positions)
    Vec3(Arc<[Vec3]>),
    /// 4-component float vectors (vertex colors)
    Vec4(Arc<[Vec4]>),
    /// Unsigned index triples addressing triangle corners
    UVec3(Arc<[[u32; 3]]>),
}

impl DataArray {
    /// Number of elements in the array
    pub fn len(&self) -> usize {
        match self {
            Self::Vec3(array) => array.len(),
            Self::Vec4(array) => array.len(),
            Self::UVec3(array) => array.len(),
        }
    }

    /// Whether the array has no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type name used in errors and logs
    pub fn element_type(&self) -> &'static str {
        match self {
            Self::Vec3(_) => "vec3f",
            Self::Vec4(_) => "vec4f",
            Self::UVec3(_) => "vec3ui",
        }
    }
}

/// Handle to a shared data object
#[derive(Debug)]
pub struct Data {
    inner: ObjectRef,
}

impl Data {
    pub(crate) fn from_ref(inner: ObjectRef) -> Self {
        Self { inner }
    }

    pub(crate) fn key(&self) -> ObjectKey {
        self.inner.key()
    }

    /// Finalize the buffer so geometries may consume it
    pub fn commit(&mut self) -> Result<(), EngineError> {
        self.inner.commit()
    }
}
