//! Engine-side object registry
//!
//! Every scene object lives in one slot keyed by a generational `ObjectKey`.
//! Slots carry a reference count: one count for the caller-held wrapper,
//! plus one per stored reference from another object's parameters or
//! committed state. A slot is destroyed when its count reaches zero, at
//! which point every reference it holds is released in turn. This gives the
//! deferred-destruction behavior the scene graph relies on: a child handed
//! to a parent outlives the caller's wrapper until the parent itself dies.

use crate::api::data::DataArray;
use crate::api::error::EngineError;
use crate::backend::commit::CommittedState;
use crate::backend::framebuffer::FrameBufferState;
use crate::backend::params::{ParamMap, ParamValue};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Generational key identifying one engine-side object
    pub(crate) struct ObjectKey;
}

/// The kind of engine object a slot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ObjectKind {
    Camera,
    Data,
    Geometry,
    Material,
    GeometricModel,
    Group,
    Instance,
    World,
    Light,
    Renderer,
    FrameBuffer,
}

impl ObjectKind {
    /// Lowercase name used in error messages and logs
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Data => "data",
            Self::Geometry => "geometry",
            Self::Material => "material",
            Self::GeometricModel => "geometric model",
            Self::Group => "group",
            Self::Instance => "instance",
            Self::World => "world",
            Self::Light => "light",
            Self::Renderer => "renderer",
            Self::FrameBuffer => "framebuffer",
        }
    }
}

/// Kind-specific storage that is not expressible as parameters
#[derive(Debug)]
pub(crate) enum Payload {
    None,
    /// Shared array content of a data object
    Data(DataArray),
    /// Pixel and accumulation buffers of a framebuffer
    FrameBuffer(FrameBufferState),
}

/// One engine-side object
#[derive(Debug)]
pub(crate) struct ObjectSlot {
    pub(crate) kind: ObjectKind,
    /// Subtype name given at creation, e.g. "perspective" or "mesh"
    pub(crate) type_name: String,
    pub(crate) refcount: u32,
    pub(crate) params: ParamMap,
    pub(crate) committed: Option<CommittedState>,
    pub(crate) payload: Payload,
}

impl ObjectSlot {
    /// Keys this slot keeps alive, from staged params and committed state
    fn referenced_keys(&self) -> Vec<ObjectKey> {
        let mut keys = self.params.referenced_keys();
        if let Some(committed) = &self.committed {
            keys.extend(committed.referenced_keys());
        }
        keys
    }
}

/// Slot storage plus reference-count bookkeeping
#[derive(Debug, Default)]
pub(crate) struct Registry {
    slots: SlotMap<ObjectKey, ObjectSlot>,
}

impl Registry {
    /// Create a slot with an initial count of one (the caller's wrapper)
    pub(crate) fn create(&mut self, kind: ObjectKind, type_name: &str) -> ObjectKey {
        self.slots.insert(ObjectSlot {
            kind,
            type_name: type_name.to_string(),
            refcount: 1,
            params: ParamMap::default(),
            committed: None,
            payload: Payload::None,
        })
    }

    pub(crate) fn slot(
        &self,
        key: ObjectKey,
        operation: &'static str,
    ) -> Result<&ObjectSlot, EngineError> {
        self.slots
            .get(key)
            .ok_or(EngineError::StaleHandle { operation })
    }

    pub(crate) fn slot_mut(
        &mut self,
        key: ObjectKey,
        operation: &'static str,
    ) -> Result<&mut ObjectSlot, EngineError> {
        self.slots
            .get_mut(key)
            .ok_or(EngineError::StaleHandle { operation })
    }

    /// Add a reference to a slot. Missing keys are ignored; callers only
    /// retain keys they just read out of live slots.
    pub(crate) fn retain(&mut self, key: ObjectKey) {
        if let Some(slot) = self.slots.get_mut(key) {
            slot.refcount += 1;
        }
    }

    /// Drop one reference. When the last reference goes, the slot is
    /// destroyed and every reference it held is released as well.
    pub(crate) fn release(&mut self, key: ObjectKey) {
        let mut worklist = vec![key];
        while let Some(key) = worklist.pop() {
            let Some(slot) = self.slots.get_mut(key) else {
                continue;
            };
            if slot.refcount > 1 {
                slot.refcount -= 1;
            } else if let Some(slot) = self.slots.remove(key) {
                log::trace!("destroying {} \"{}\"", slot.kind.name(), slot.type_name);
                worklist.extend(slot.referenced_keys());
            }
        }
    }

    /// Stage a parameter, retaining any objects the new value references
    /// and releasing those referenced by the value it replaces.
    pub(crate) fn set_param(
        &mut self,
        key: ObjectKey,
        operation: &'static str,
        name: &str,
        value: ParamValue,
    ) -> Result<(), EngineError> {
        self.slot(key, operation)?;
        for referenced in value.referenced_keys() {
            self.retain(referenced);
        }
        // Slot existence was checked above; the retain loop cannot remove it.
        let old = match self.slots.get_mut(key) {
            Some(slot) => slot.params.insert(name, value),
            None => return Err(EngineError::StaleHandle { operation }),
        };
        if let Some(old) = old {
            for referenced in old.referenced_keys() {
                self.release(referenced);
            }
        }
        Ok(())
    }

    /// Install a freshly built committed state, swapping reference counts
    /// from the previous committed state to the new one.
    pub(crate) fn install_committed(&mut self, key: ObjectKey, committed: CommittedState) {
        for referenced in committed.referenced_keys() {
            self.retain(referenced);
        }
        let old = match self.slots.get_mut(key) {
            Some(slot) => slot.committed.replace(committed),
            None => None,
        };
        if let Some(old) = old {
            for referenced in old.referenced_keys() {
                self.release(referenced);
            }
        }
    }

    /// Mutable access to a framebuffer's pixel storage
    pub(crate) fn framebuffer_mut(
        &mut self,
        key: ObjectKey,
        operation: &'static str,
    ) -> Result<&mut FrameBufferState, EngineError> {
        match &mut self.slot_mut(key, operation)?.payload {
            Payload::FrameBuffer(state) => Ok(state),
            _ => Err(EngineError::Internal {
                operation,
                reason: "handle does not refer to a framebuffer".to_string(),
            }),
        }
    }

    /// Resolved color bytes of a framebuffer, if the key is live and
    /// actually a framebuffer
    pub(crate) fn framebuffer_bytes(&self, key: ObjectKey) -> Option<&[u8]> {
        match &self.slots.get(key)?.payload {
            Payload::FrameBuffer(state) => Some(state.color_bytes()),
            _ => None,
        }
    }

    /// Number of live engine-side objects, for the shutdown leak audit
    pub(crate) fn live_objects(&self) -> usize {
        self.slots.len()
    }

    /// Destroy every slot regardless of reference counts (shutdown)
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_destroys_at_zero() {
        let mut registry = Registry::default();
        let key = registry.create(ObjectKind::Camera, "perspective");
        assert_eq!(registry.live_objects(), 1);

        registry.release(key);
        assert_eq!(registry.live_objects(), 0);
        assert!(registry.slot(key, "test").is_err());
    }

    #[test]
    fn test_stored_reference_defers_destruction() {
        let mut registry = Registry::default();
        let light = registry.create(ObjectKind::Light, "ambient");
        let world = registry.create(ObjectKind::World, "world");

        registry
            .set_param(world, "set_param", "light", ParamValue::ObjectList(vec![light]))
            .unwrap();

        // The caller's reference goes away, but the world still holds one.
        registry.release(light);
        assert_eq!(registry.live_objects(), 2);
        assert!(registry.slot(light, "test").is_ok());

        // Destroying the world releases the stored reference too.
        registry.release(world);
        assert_eq!(registry.live_objects(), 0);
    }

    #[test]
    fn test_replaced_param_releases_old_reference() {
        let mut registry = Registry::default();
        let first = registry.create(ObjectKind::Material, "obj");
        let second = registry.create(ObjectKind::Material, "obj");
        let model = registry.create(ObjectKind::GeometricModel, "model");

        registry
            .set_param(model, "set_param", "material", ParamValue::Object(first))
            .unwrap();
        registry.release(first);
        assert!(registry.slot(first, "test").is_ok());

        registry
            .set_param(model, "set_param", "material", ParamValue::Object(second))
            .unwrap();
        // Overwriting the slot dropped the last reference to the first material.
        assert!(registry.slot(first, "test").is_err());
        assert!(registry.slot(second, "test").is_ok());

        registry.release(second);
        registry.release(model);
        assert_eq!(registry.live_objects(), 0);
    }

    #[test]
    fn test_stale_key_operations_error() {
        let mut registry = Registry::default();
        let key = registry.create(ObjectKind::Group, "group");
        registry.release(key);

        let err = registry
            .set_param(key, "set_param", "geometry", ParamValue::Float(1.0))
            .unwrap_err();
        assert!(matches!(err, EngineError::StaleHandle { .. }));
        // Double release of a dead key is tolerated.
        registry.release(key);
    }
}
