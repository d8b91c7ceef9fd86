//! Staged parameter storage
//!
//! Objects accumulate typed, string-keyed parameters between creation and
//! commit. Parameters are write-many: setting a slot again replaces the old
//! value, and reference counts on any replaced object values are handed
//! back to the registry by the caller (`Registry::set_param`).

use crate::api::error::EngineError;
use crate::backend::registry::ObjectKey;
use crate::foundation::math::{Mat4, Vec3, Vec4};
use std::collections::HashMap;

/// A typed parameter value
#[derive(Debug, Clone)]
pub(crate) enum ParamValue {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
    /// Reference to another engine object (retained while stored)
    Object(ObjectKey),
    /// Ordered list of object references (retained while stored)
    ObjectList(Vec<ObjectKey>),
}

impl ParamValue {
    /// Object keys referenced by this value, for retain/release bookkeeping
    pub(crate) fn referenced_keys(&self) -> Vec<ObjectKey> {
        match self {
            Self::Object(key) => vec![*key],
            Self::ObjectList(keys) => keys.clone(),
            _ => Vec::new(),
        }
    }
}

/// Staged parameters for one object
#[derive(Debug, Clone, Default)]
pub(crate) struct ParamMap {
    values: HashMap<String, ParamValue>,
}

impl ParamMap {
    pub(crate) fn insert(&mut self, name: &str, value: ParamValue) -> Option<ParamValue> {
        self.values.insert(name.to_string(), value)
    }

    /// Untyped access, for parameters that accept more than one type
    pub(crate) fn raw(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// All object keys referenced by any stored value
    pub(crate) fn referenced_keys(&self) -> Vec<ObjectKey> {
        self.values
            .values()
            .flat_map(ParamValue::referenced_keys)
            .collect()
    }

    pub(crate) fn get_f32(
        &self,
        operation: &'static str,
        name: &str,
    ) -> Result<Option<f32>, EngineError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(ParamValue::Float(v)) => Ok(Some(*v)),
            Some(_) => Err(EngineError::TypeMismatch {
                operation,
                name: name.to_string(),
                expected: "float",
            }),
        }
    }

    pub(crate) fn get_i32(
        &self,
        operation: &'static str,
        name: &str,
    ) -> Result<Option<i32>, EngineError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(ParamValue::Int(v)) => Ok(Some(*v)),
            Some(_) => Err(EngineError::TypeMismatch {
                operation,
                name: name.to_string(),
                expected: "int",
            }),
        }
    }

    pub(crate) fn get_vec3(
        &self,
        operation: &'static str,
        name: &str,
    ) -> Result<Option<Vec3>, EngineError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(ParamValue::Vec3(v)) => Ok(Some(*v)),
            Some(_) => Err(EngineError::TypeMismatch {
                operation,
                name: name.to_string(),
                expected: "vec3",
            }),
        }
    }

    pub(crate) fn get_vec4(
        &self,
        operation: &'static str,
        name: &str,
    ) -> Result<Option<Vec4>, EngineError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(ParamValue::Vec4(v)) => Ok(Some(*v)),
            Some(_) => Err(EngineError::TypeMismatch {
                operation,
                name: name.to_string(),
                expected: "vec4",
            }),
        }
    }

    pub(crate) fn get_mat4(
        &self,
        operation: &'static str,
        name: &str,
    ) -> Result<Option<Mat4>, EngineError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(ParamValue::Mat4(v)) => Ok(Some(*v)),
            Some(_) => Err(EngineError::TypeMismatch {
                operation,
                name: name.to_string(),
                expected: "mat4",
            }),
        }
    }

    pub(crate) fn get_object(
        &self,
        operation: &'static str,
        name: &str,
    ) -> Result<Option<ObjectKey>, EngineError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(ParamValue::Object(key)) => Ok(Some(*key)),
            Some(_) => Err(EngineError::TypeMismatch {
                operation,
                name: name.to_string(),
                expected: "object",
            }),
        }
    }

    pub(crate) fn get_object_list(
        &self,
        operation: &'static str,
        name: &str,
    ) -> Result<Option<&[ObjectKey]>, EngineError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(ParamValue::ObjectList(keys)) => Ok(Some(keys)),
            Some(_) => Err(EngineError::TypeMismatch {
                operation,
                name: name.to_string(),
                expected: "object list",
            }),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getter_rejects_wrong_type() {
        let mut params = ParamMap::default();
        params.insert("aspect", ParamValue::Vec3(Vec3::zeros()));

        let err = params.get_f32("commit", "aspect").unwrap_err();
        assert!(matches!(err, EngineError::TypeMismatch { .. }));
    }

    #[test]
    fn test_missing_parameter_is_none() {
        let params = ParamMap::default();
        assert!(params.get_f32("commit", "aspect").unwrap().is_none());
    }

    #[test]
    fn test_replacing_value_returns_old() {
        let mut params = ParamMap::default();
        params.insert("intensity", ParamValue::Float(1.0));
        let old = params.insert("intensity", ParamValue::Float(2.0));
        assert!(matches!(old, Some(ParamValue::Float(v)) if (v - 1.0).abs() < f32::EPSILON));
        assert_eq!(params.get_f32("commit", "intensity").unwrap(), Some(2.0));
    }
}
