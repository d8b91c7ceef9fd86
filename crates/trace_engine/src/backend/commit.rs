//! Commit semantics
//!
//! Committing an object validates its staged parameters and snapshots them
//! into a typed, immutable representation. Dependent operations (render,
//! bounds, pick) only ever read committed state; staged parameters have no
//! effect until the next commit. Committed state holds its own references
//! to child objects, so re-parameterizing an object after commit cannot pull
//! data out from under a previous snapshot.

use crate::api::data::DataArray;
use crate::api::error::EngineError;
use crate::backend::params::ParamValue;
use crate::backend::registry::{ObjectKey, ObjectKind, Payload, Registry};
use crate::foundation::math::{Mat4, Vec3, Vec4};
use std::sync::Arc;

/// Default vertical field of view for perspective cameras, in degrees
pub(crate) const DEFAULT_FOVY: f32 = 60.0;

/// Committed perspective camera
#[derive(Debug, Clone)]
pub(crate) struct CameraState {
    pub(crate) position: Vec3,
    pub(crate) direction: Vec3,
    pub(crate) up: Vec3,
    pub(crate) aspect: f32,
    pub(crate) fovy: f32,
}

/// Committed triangle mesh, sharing the caller's buffers
#[derive(Debug, Clone)]
pub(crate) struct MeshState {
    pub(crate) positions: Arc<[Vec3]>,
    pub(crate) colors: Option<Arc<[Vec4]>>,
    pub(crate) indices: Arc<[[u32; 3]]>,
}

/// Committed geometric model binding
#[derive(Debug, Clone)]
pub(crate) struct ModelState {
    pub(crate) geometry: ObjectKey,
    pub(crate) material: Option<ObjectKey>,
}

/// Committed instance placement
#[derive(Debug, Clone)]
pub(crate) struct InstanceState {
    pub(crate) group: ObjectKey,
    pub(crate) transform: Mat4,
}

/// Committed world contents
#[derive(Debug, Clone, Default)]
pub(crate) struct WorldState {
    pub(crate) instances: Vec<ObjectKey>,
    pub(crate) lights: Vec<ObjectKey>,
}

/// Committed light parameters
#[derive(Debug, Clone)]
pub(crate) struct LightState {
    pub(crate) color: Vec3,
    pub(crate) intensity: f32,
}

/// Committed renderer parameters
#[derive(Debug, Clone)]
pub(crate) struct RendererState {
    pub(crate) background: Vec4,
    pub(crate) pixel_samples: u32,
}

/// Typed snapshot installed by a successful commit
#[derive(Debug, Clone)]
pub(crate) enum CommittedState {
    Camera(CameraState),
    Data,
    Geometry(MeshState),
    Material { kd: Vec3 },
    GeometricModel(ModelState),
    Group { models: Vec<ObjectKey> },
    Instance(InstanceState),
    World(WorldState),
    Light(LightState),
    Renderer(RendererState),
    FrameBuffer,
}

impl CommittedState {
    /// Keys this snapshot keeps alive
    pub(crate) fn referenced_keys(&self) -> Vec<ObjectKey> {
        match self {
            Self::GeometricModel(model) => {
                let mut keys = vec![model.geometry];
                keys.extend(model.material);
                keys
            }
            Self::Group { models } => models.clone(),
            Self::Instance(instance) => vec![instance.group],
            Self::World(world) => {
                let mut keys = world.instances.clone();
                keys.extend(&world.lights);
                keys
            }
            _ => Vec::new(),
        }
    }
}

/// Validate and commit the object behind `key`.
pub(crate) fn commit_object(registry: &mut Registry, key: ObjectKey) -> Result<(), EngineError> {
    const OP: &str = "commit";
    let kind = registry.slot(key, OP)?.kind;
    let committed = match kind {
        ObjectKind::Camera => commit_camera(registry, key)?,
        ObjectKind::Data => CommittedState::Data,
        ObjectKind::Geometry => commit_geometry(registry, key)?,
        ObjectKind::Material => commit_material(registry, key)?,
        ObjectKind::GeometricModel => commit_model(registry, key)?,
        ObjectKind::Group => commit_group(registry, key)?,
        ObjectKind::Instance => commit_instance(registry, key)?,
        ObjectKind::World => commit_world(registry, key)?,
        ObjectKind::Light => commit_light(registry, key)?,
        ObjectKind::Renderer => commit_renderer(registry, key)?,
        ObjectKind::FrameBuffer => CommittedState::FrameBuffer,
    };
    log::debug!("committed {}", kind.name());
    registry.install_committed(key, committed);
    Ok(())
}

/// Check that a child consumed by a parent commit has itself been committed.
fn require_committed(
    registry: &Registry,
    key: ObjectKey,
    operation: &'static str,
) -> Result<(), EngineError> {
    let slot = registry.slot(key, operation)?;
    if slot.committed.is_none() {
        return Err(EngineError::NotCommitted {
            operation,
            object: slot.kind.name(),
        });
    }
    Ok(())
}

fn commit_camera(registry: &Registry, key: ObjectKey) -> Result<CommittedState, EngineError> {
    const OP: &str = "commit(camera)";
    let params = &registry.slot(key, OP)?.params;

    let position = params
        .get_vec3(OP, "position")?
        .ok_or(EngineError::MissingParameter { operation: OP, name: "position" })?;
    let direction = params
        .get_vec3(OP, "direction")?
        .ok_or(EngineError::MissingParameter { operation: OP, name: "direction" })?;
    let up = params
        .get_vec3(OP, "up")?
        .ok_or(EngineError::MissingParameter { operation: OP, name: "up" })?;
    let aspect = params.get_f32(OP, "aspect")?.unwrap_or(1.0);
    let fovy = params.get_f32(OP, "fovy")?.unwrap_or(DEFAULT_FOVY);

    if direction.norm_squared() == 0.0 {
        return Err(EngineError::InvalidParameter {
            operation: OP,
            name: "direction".to_string(),
            reason: "must be nonzero".to_string(),
        });
    }
    if !(fovy > 0.0 && fovy < 180.0) {
        return Err(EngineError::InvalidParameter {
            operation: OP,
            name: "fovy".to_string(),
            reason: format!("must be in (0, 180), got {fovy}"),
        });
    }

    Ok(CommittedState::Camera(CameraState { position, direction, up, aspect, fovy }))
}

/// Look up a committed data object and return its array content.
fn committed_data_array(
    registry: &Registry,
    key: ObjectKey,
    operation: &'static str,
) -> Result<DataArray, EngineError> {
    require_committed(registry, key, operation)?;
    let slot = registry.slot(key, operation)?;
    match &slot.payload {
        Payload::Data(array) => Ok(array.clone()),
        _ => Err(EngineError::InvalidParameter {
            operation,
            name: "data".to_string(),
            reason: format!("expected a data object, got {}", slot.kind.name()),
        }),
    }
}

fn commit_geometry(registry: &Registry, key: ObjectKey) -> Result<CommittedState, EngineError> {
    const OP: &str = "commit(geometry)";
    let params = &registry.slot(key, OP)?.params;

    let position_key = params
        .get_object(OP, "vertex.position")?
        .ok_or(EngineError::MissingParameter { operation: OP, name: "vertex.position" })?;
    let positions = match committed_data_array(registry, position_key, OP)? {
        DataArray::Vec3(array) => array,
        other => {
            return Err(EngineError::InvalidParameter {
                operation: OP,
                name: "vertex.position".to_string(),
                reason: format!("expected vec3 data, got {}", other.element_type()),
            })
        }
    };

    let colors = match params.get_object(OP, "vertex.color")? {
        None => None,
        Some(color_key) => match committed_data_array(registry, color_key, OP)? {
            DataArray::Vec4(array) => {
                if array.len() != positions.len() {
                    return Err(EngineError::InvalidParameter {
                        operation: OP,
                        name: "vertex.color".to_string(),
                        reason: format!(
                            "length {} does not match {} vertices",
                            array.len(),
                            positions.len()
                        ),
                    });
                }
                Some(array)
            }
            other => {
                return Err(EngineError::InvalidParameter {
                    operation: OP,
                    name: "vertex.color".to_string(),
                    reason: format!("expected vec4 data, got {}", other.element_type()),
                })
            }
        },
    };

    let index_key = params
        .get_object(OP, "index")?
        .ok_or(EngineError::MissingParameter { operation: OP, name: "index" })?;
    let indices = match committed_data_array(registry, index_key, OP)? {
        DataArray::UVec3(array) => array,
        other => {
            return Err(EngineError::InvalidParameter {
                operation: OP,
                name: "index".to_string(),
                reason: format!("expected uvec3 data, got {}", other.element_type()),
            })
        }
    };

    let vertex_count = positions.len() as u32;
    for (triangle, corners) in indices.iter().enumerate() {
        if corners.iter().any(|&c| c >= vertex_count) {
            return Err(EngineError::InvalidParameter {
                operation: OP,
                name: "index".to_string(),
                reason: format!(
                    "triangle {triangle} references a vertex outside 0..{vertex_count}"
                ),
            });
        }
    }

    Ok(CommittedState::Geometry(MeshState { positions, colors, indices }))
}

fn commit_material(registry: &Registry, key: ObjectKey) -> Result<CommittedState, EngineError> {
    const OP: &str = "commit(material)";
    let params = &registry.slot(key, OP)?.params;
    // The "obj" material reflects 80% gray unless told otherwise.
    let kd = params.get_vec3(OP, "kd")?.unwrap_or_else(|| Vec3::repeat(0.8));
    Ok(CommittedState::Material { kd })
}

fn commit_model(registry: &Registry, key: ObjectKey) -> Result<CommittedState, EngineError> {
    const OP: &str = "commit(geometric model)";
    let params = &registry.slot(key, OP)?.params;

    let geometry = params
        .get_object(OP, "geometry")?
        .ok_or(EngineError::MissingParameter { operation: OP, name: "geometry" })?;
    require_committed(registry, geometry, OP)?;

    let material = params.get_object(OP, "material")?;
    if let Some(material) = material {
        require_committed(registry, material, OP)?;
    }

    Ok(CommittedState::GeometricModel(ModelState { geometry, material }))
}

fn commit_group(registry: &Registry, key: ObjectKey) -> Result<CommittedState, EngineError> {
    const OP: &str = "commit(group)";
    let params = &registry.slot(key, OP)?.params;
    let models = params.get_object_list(OP, "geometry")?.unwrap_or(&[]).to_vec();
    for &model in &models {
        require_committed(registry, model, OP)?;
    }
    Ok(CommittedState::Group { models })
}

fn commit_instance(registry: &Registry, key: ObjectKey) -> Result<CommittedState, EngineError> {
    const OP: &str = "commit(instance)";
    let params = &registry.slot(key, OP)?.params;

    let group = params
        .get_object(OP, "group")?
        .ok_or(EngineError::MissingParameter { operation: OP, name: "group" })?;
    require_committed(registry, group, OP)?;
    let transform = params.get_mat4(OP, "transform")?.unwrap_or_else(Mat4::identity);

    Ok(CommittedState::Instance(InstanceState { group, transform }))
}

fn commit_world(registry: &Registry, key: ObjectKey) -> Result<CommittedState, EngineError> {
    const OP: &str = "commit(world)";
    let params = &registry.slot(key, OP)?.params;

    let instances = params.get_object_list(OP, "instance")?.unwrap_or(&[]).to_vec();
    for &instance in &instances {
        require_committed(registry, instance, OP)?;
    }
    let lights = params.get_object_list(OP, "light")?.unwrap_or(&[]).to_vec();
    for &light in &lights {
        require_committed(registry, light, OP)?;
    }

    Ok(CommittedState::World(WorldState { instances, lights }))
}

fn commit_light(registry: &Registry, key: ObjectKey) -> Result<CommittedState, EngineError> {
    const OP: &str = "commit(light)";
    let params = &registry.slot(key, OP)?.params;
    let color = params.get_vec3(OP, "color")?.unwrap_or_else(|| Vec3::repeat(1.0));
    let intensity = params.get_f32(OP, "intensity")?.unwrap_or(1.0);
    if intensity < 0.0 {
        return Err(EngineError::InvalidParameter {
            operation: OP,
            name: "intensity".to_string(),
            reason: "must be nonnegative".to_string(),
        });
    }
    Ok(CommittedState::Light(LightState { color, intensity }))
}

fn commit_renderer(registry: &Registry, key: ObjectKey) -> Result<CommittedState, EngineError> {
    const OP: &str = "commit(renderer)";
    let params = &registry.slot(key, OP)?.params;

    // backgroundColor accepts a single float splatted across RGBA, or a
    // full vec4.
    let background = match params.raw("backgroundColor") {
        None => Vec4::zeros(),
        Some(ParamValue::Float(splat)) => Vec4::repeat(*splat),
        Some(ParamValue::Vec4(color)) => *color,
        Some(_) => {
            return Err(EngineError::TypeMismatch {
                operation: OP,
                name: "backgroundColor".to_string(),
                expected: "float or vec4",
            })
        }
    };

    let pixel_samples = params.get_i32(OP, "pixelSamples")?.unwrap_or(1);
    if pixel_samples < 1 {
        return Err(EngineError::InvalidParameter {
            operation: OP,
            name: "pixelSamples".to_string(),
            reason: format!("must be at least 1, got {pixel_samples}"),
        });
    }

    Ok(CommittedState::Renderer(RendererState {
        background,
        pixel_samples: pixel_samples as u32,
    }))
}
