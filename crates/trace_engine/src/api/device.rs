//! The device context
//!
//! `Device::init` returns an explicit context object that every subsequent
//! call threads through; there is no process-global engine state. Dropping
//! the last wrapper releases the last engine reference, and `shutdown`
//! invalidates the context so later calls fail with a checked error rather
//! than touching torn-down state.

use crate::api::data::{Data, DataArray};
use crate::api::error::EngineError;
use crate::api::framebuffer::{ChannelFlags, FrameBuffer, FrameBufferFormat};
use crate::api::geometry::{GeometricModel, Geometry, Material};
use crate::api::renderer::Renderer;
use crate::api::scene::{Camera, Group, Instance, Light, World};
use crate::backend::commit::commit_object;
use crate::backend::framebuffer::FrameBufferState;
use crate::backend::params::ParamValue;
use crate::backend::registry::{ObjectKey, ObjectKind, Payload, Registry};
use crate::foundation::math::{Mat4, Vec3, Vec4};
use std::cell::{Ref, RefCell};
use std::rc::Rc;

/// Device selection and reproducibility settings
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Which device implementation to start; only "reference" exists
    pub device_type: String,
    /// Base seed for the device's sample streams
    pub seed: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_type: "reference".to_string(),
            seed: 0,
        }
    }
}

#[derive(Debug)]
pub(crate) struct DeviceState {
    pub(crate) registry: Registry,
    pub(crate) seed: u64,
    shut_down: bool,
}

#[derive(Debug)]
struct DeviceInner {
    state: RefCell<DeviceState>,
    /// Releases requested while the state was borrowed (a mapped
    /// framebuffer); drained on the next device operation
    pending_releases: RefCell<Vec<ObjectKey>>,
}

/// Handle to a running device
///
/// Cheap to clone; every object wrapper holds one, so the device outlives
/// all objects created from it.
#[derive(Debug, Clone)]
pub struct Device {
    inner: Rc<DeviceInner>,
}

impl Device {
    /// Start a device. Fails with [`EngineError::InitFailed`] carrying a
    /// nonzero status code if the device cannot start; the caller should
    /// abort without building any scene.
    pub fn init(config: &DeviceConfig) -> Result<Self, EngineError> {
        log::info!("initializing {} device...", config.device_type);
        if config.device_type != "reference" {
            return Err(EngineError::InitFailed {
                code: 2,
                reason: format!("unknown device type \"{}\"", config.device_type),
            });
        }
        Ok(Self {
            inner: Rc::new(DeviceInner {
                state: RefCell::new(DeviceState {
                    registry: Registry::default(),
                    seed: config.seed,
                    shut_down: false,
                }),
                pending_releases: RefCell::new(Vec::new()),
            }),
        })
    }

    /// Release every remaining engine-side object and invalidate the
    /// context. Must be the last device call; anything after fails with
    /// [`EngineError::Shutdown`].
    pub fn shutdown(&self) -> Result<(), EngineError> {
        self.with_state("shutdown", |state| {
            let live = state.registry.live_objects();
            if live > 0 {
                log::warn!("shutting down with {live} live objects; releasing them");
            }
            state.registry.clear();
            state.shut_down = true;
            Ok(())
        })?;
        log::info!("device shut down");
        Ok(())
    }

    /// Number of live engine-side objects, for leak audits in tests and at
    /// shutdown
    pub fn live_object_count(&self) -> usize {
        self.inner
            .state
            .try_borrow()
            .map_or(0, |state| state.registry.live_objects())
    }

    /// Create a perspective camera
    pub fn new_camera(&self, type_name: &str) -> Result<Camera, EngineError> {
        const OP: &str = "new_camera";
        self.check_type(OP, type_name, &["perspective"])?;
        Ok(Camera::from_ref(self.create(OP, ObjectKind::Camera, type_name)?))
    }

    /// Create a triangle mesh geometry
    pub fn new_geometry(&self, type_name: &str) -> Result<Geometry, EngineError> {
        const OP: &str = "new_geometry";
        self.check_type(OP, type_name, &["mesh"])?;
        Ok(Geometry::from_ref(self.create(OP, ObjectKind::Geometry, type_name)?))
    }

    /// Create a material for the named renderer type
    pub fn new_material(
        &self,
        renderer_type: &str,
        material_type: &str,
    ) -> Result<Material, EngineError> {
        const OP: &str = "new_material";
        self.check_type(OP, renderer_type, &["pathtracer"])?;
        self.check_type(OP, material_type, &["obj"])?;
        Ok(Material::from_ref(self.create(OP, ObjectKind::Material, material_type)?))
    }

    /// Create a geometric model binding a geometry to shading state
    pub fn new_geometric_model(&self, geometry: &Geometry) -> Result<GeometricModel, EngineError> {
        const OP: &str = "new_geometric_model";
        let object = self.create(OP, ObjectKind::GeometricModel, "model")?;
        object.set(OP, "geometry", ParamValue::Object(geometry.key()))?;
        Ok(GeometricModel::from_ref(object))
    }

    /// Create an empty group of geometric models
    pub fn new_group(&self) -> Result<Group, EngineError> {
        Ok(Group::from_ref(self.create("new_group", ObjectKind::Group, "group")?))
    }

    /// Create an instance placing a group in the world
    pub fn new_instance(&self, group: &Group) -> Result<Instance, EngineError> {
        const OP: &str = "new_instance";
        let object = self.create(OP, ObjectKind::Instance, "instance")?;
        object.set(OP, "group", ParamValue::Object(group.key()))?;
        Ok(Instance::from_ref(object))
    }

    /// Create an empty world
    pub fn new_world(&self) -> Result<World, EngineError> {
        Ok(World::from_ref(self.create("new_world", ObjectKind::World, "world")?))
    }

    /// Create a light
    pub fn new_light(&self, type_name: &str) -> Result<Light, EngineError> {
        const OP: &str = "new_light";
        self.check_type(OP, type_name, &["ambient"])?;
        Ok(Light::from_ref(self.create(OP, ObjectKind::Light, type_name)?))
    }

    /// Create a renderer
    pub fn new_renderer(&self, type_name: &str) -> Result<Renderer, EngineError> {
        const OP: &str = "new_renderer";
        self.check_type(OP, type_name, &["pathtracer"])?;
        Ok(Renderer::from_ref(self.create(OP, ObjectKind::Renderer, type_name)?))
    }

    /// Wrap a caller-owned array as a shared data object without copying
    /// the contents. The device holds its own clone of the [`Arc`] handle,
    /// not of the memory.
    ///
    /// [`Arc`]: std::sync::Arc
    pub fn new_shared_data(&self, array: DataArray) -> Result<Data, EngineError> {
        const OP: &str = "new_shared_data";
        let key = self.with_state(OP, |state| {
            let key = state.registry.create(ObjectKind::Data, array.element_type());
            state.registry.slot_mut(key, OP)?.payload = Payload::Data(array);
            Ok(key)
        })?;
        Ok(Data::from_ref(ObjectRef { device: self.clone(), key }))
    }

    /// Create a framebuffer. The COLOR channel is mandatory; ACCUM enables
    /// progressive accumulation across render calls.
    pub fn new_framebuffer(
        &self,
        width: u32,
        height: u32,
        format: FrameBufferFormat,
        channels: ChannelFlags,
    ) -> Result<FrameBuffer, EngineError> {
        const OP: &str = "new_framebuffer";
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidParameter {
                operation: OP,
                name: "size".to_string(),
                reason: format!("must be nonzero, got {width}x{height}"),
            });
        }
        if !channels.contains(ChannelFlags::COLOR) {
            return Err(EngineError::InvalidParameter {
                operation: OP,
                name: "channels".to_string(),
                reason: "the COLOR channel is required".to_string(),
            });
        }
        let key = self.with_state(OP, |state| {
            let key = state.registry.create(ObjectKind::FrameBuffer, "framebuffer");
            state.registry.slot_mut(key, OP)?.payload =
                Payload::FrameBuffer(FrameBufferState::new(width, height, format, channels));
            commit_object(&mut state.registry, key)?;
            Ok(key)
        })?;
        Ok(FrameBuffer::from_ref(
            ObjectRef { device: self.clone(), key },
            width,
            height,
            format,
            channels,
        ))
    }

    fn check_type(
        &self,
        operation: &'static str,
        type_name: &str,
        known: &[&str],
    ) -> Result<(), EngineError> {
        if known.contains(&type_name) {
            Ok(())
        } else {
            Err(EngineError::UnknownType {
                operation,
                type_name: type_name.to_string(),
            })
        }
    }

    fn create(
        &self,
        operation: &'static str,
        kind: ObjectKind,
        type_name: &str,
    ) -> Result<ObjectRef, EngineError> {
        let key = self.with_state(operation, |state| Ok(state.registry.create(kind, type_name)))?;
        Ok(ObjectRef { device: self.clone(), key })
    }

    /// Run a mutating operation against the device state. Fails if the
    /// device is shut down or a framebuffer mapping holds the state
    /// borrowed. Deferred releases are drained first so refcounts are
    /// current when `f` runs.
    pub(crate) fn with_state<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut DeviceState) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        let mut state = self
            .inner
            .state
            .try_borrow_mut()
            .map_err(|_| EngineError::FrameBufferMapped { operation })?;
        if state.shut_down {
            return Err(EngineError::Shutdown { operation });
        }
        let pending: Vec<ObjectKey> = self.inner.pending_releases.borrow_mut().drain(..).collect();
        for key in pending {
            state.registry.release(key);
        }
        f(&mut state)
    }

    /// Take a shared borrow of the device state, for scoped read views.
    pub(crate) fn borrow_state(
        &self,
        operation: &'static str,
    ) -> Result<Ref<'_, DeviceState>, EngineError> {
        // Drain deferred releases and run the shutdown check first.
        self.with_state(operation, |_| Ok(()))?;
        self.inner.state.try_borrow().map_err(|_| EngineError::Internal {
            operation,
            reason: "state still mutably borrowed".to_string(),
        })
    }

    /// Release a handle's engine reference, or queue the release if the
    /// state is currently borrowed by a mapping.
    fn release_or_defer(&self, key: ObjectKey) {
        match self.inner.state.try_borrow_mut() {
            Ok(mut state) => {
                if !state.shut_down {
                    state.registry.release(key);
                }
            }
            Err(_) => self.inner.pending_releases.borrow_mut().push(key),
        }
    }
}

/// Shared core of every object wrapper: the owning device plus the slot
/// key. Dropping it releases the caller's engine reference exactly once.
#[derive(Debug)]
pub(crate) struct ObjectRef {
    device: Device,
    key: ObjectKey,
}

impl ObjectRef {
    pub(crate) fn new(device: Device, key: ObjectKey) -> Self {
        Self { device, key }
    }

    pub(crate) fn key(&self) -> ObjectKey {
        self.key
    }

    pub(crate) fn device(&self) -> &Device {
        &self.device
    }

    pub(crate) fn set(
        &self,
        operation: &'static str,
        name: &str,
        value: ParamValue,
    ) -> Result<(), EngineError> {
        self.device
            .with_state(operation, |state| state.registry.set_param(self.key, operation, name, value))
    }

    pub(crate) fn set_f32(&self, name: &str, value: f32) -> Result<(), EngineError> {
        self.set("set_f32", name, ParamValue::Float(value))
    }

    pub(crate) fn set_i32(&self, name: &str, value: i32) -> Result<(), EngineError> {
        self.set("set_i32", name, ParamValue::Int(value))
    }

    pub(crate) fn set_vec3(&self, name: &str, value: Vec3) -> Result<(), EngineError> {
        self.set("set_vec3", name, ParamValue::Vec3(value))
    }

    pub(crate) fn set_vec4(&self, name: &str, value: Vec4) -> Result<(), EngineError> {
        self.set("set_vec4", name, ParamValue::Vec4(value))
    }

    pub(crate) fn set_mat4(&self, name: &str, value: Mat4) -> Result<(), EngineError> {
        self.set("set_mat4", name, ParamValue::Mat4(value))
    }

    /// Finalize the staged parameters, making the object consumable.
    pub(crate) fn commit(&self) -> Result<(), EngineError> {
        self.device
            .with_state("commit", |state| commit_object(&mut state.registry, self.key))
    }
}

impl Drop for ObjectRef {
    fn drop(&mut self) {
        self.device.release_or_defer(self.key);
    }
}
