//! Committed-world flattening
//!
//! Render, bounds, and pick queries walk the committed object graph
//! (world → instance → group → model → geometry) once and produce a flat
//! triangle list in world space. Each triangle carries its provenance so a
//! pick can report which instance, model, and primitive was hit.

use crate::api::error::EngineError;
use crate::backend::commit::{CameraState, CommittedState, MeshState, RendererState};
use crate::backend::registry::{ObjectKey, Registry};
use crate::foundation::math::{Aabb, Mat4, Point3, Vec3, Vec4};

/// One world-space triangle with interpolation attributes and provenance
#[derive(Debug, Clone)]
pub(crate) struct TrianglePrim {
    pub(crate) v0: Vec3,
    pub(crate) v1: Vec3,
    pub(crate) v2: Vec3,
    pub(crate) c0: Vec4,
    pub(crate) c1: Vec4,
    pub(crate) c2: Vec4,
    /// Diffuse reflectance of the model's material
    pub(crate) kd: Vec3,
    /// Index of the triangle within its geometry
    pub(crate) prim_id: u32,
    pub(crate) model: ObjectKey,
    pub(crate) instance: ObjectKey,
}

/// Flattened scene ready for ray queries
#[derive(Debug, Clone)]
pub(crate) struct RenderScene {
    pub(crate) triangles: Vec<TrianglePrim>,
    /// Summed radiance of all ambient lights
    pub(crate) ambient: Vec3,
    pub(crate) background: Vec4,
    pub(crate) pixel_samples: u32,
}

/// Read a committed snapshot, failing if the object was never committed.
pub(crate) fn committed<'a>(
    registry: &'a Registry,
    key: ObjectKey,
    operation: &'static str,
) -> Result<&'a CommittedState, EngineError> {
    let slot = registry.slot(key, operation)?;
    slot.committed.as_ref().ok_or(EngineError::NotCommitted {
        operation,
        object: slot.kind.name(),
    })
}

pub(crate) fn camera_state(
    registry: &Registry,
    key: ObjectKey,
    operation: &'static str,
) -> Result<CameraState, EngineError> {
    match committed(registry, key, operation)? {
        CommittedState::Camera(state) => Ok(state.clone()),
        other => Err(mismatch(operation, "camera", other)),
    }
}

pub(crate) fn renderer_state(
    registry: &Registry,
    key: ObjectKey,
    operation: &'static str,
) -> Result<RendererState, EngineError> {
    match committed(registry, key, operation)? {
        CommittedState::Renderer(state) => Ok(state.clone()),
        other => Err(mismatch(operation, "renderer", other)),
    }
}

/// Flatten the committed world into triangles plus gathered light.
pub(crate) fn flatten_world(
    registry: &Registry,
    world_key: ObjectKey,
    renderer: &RendererState,
    operation: &'static str,
) -> Result<RenderScene, EngineError> {
    let world = match committed(registry, world_key, operation)? {
        CommittedState::World(world) => world.clone(),
        other => return Err(mismatch(operation, "world", other)),
    };

    let mut triangles = Vec::new();
    for instance_key in &world.instances {
        let instance = match committed(registry, *instance_key, operation)? {
            CommittedState::Instance(instance) => instance.clone(),
            other => return Err(mismatch(operation, "instance", other)),
        };
        let models = match committed(registry, instance.group, operation)? {
            CommittedState::Group { models } => models.clone(),
            other => return Err(mismatch(operation, "group", other)),
        };
        for model_key in models {
            let model = match committed(registry, model_key, operation)? {
                CommittedState::GeometricModel(model) => model.clone(),
                other => return Err(mismatch(operation, "geometric model", other)),
            };
            let kd = match model.material {
                None => Vec3::repeat(0.8),
                Some(material_key) => match committed(registry, material_key, operation)? {
                    CommittedState::Material { kd } => *kd,
                    other => return Err(mismatch(operation, "material", other)),
                },
            };
            let mesh = match committed(registry, model.geometry, operation)? {
                CommittedState::Geometry(mesh) => mesh.clone(),
                other => return Err(mismatch(operation, "geometry", other)),
            };
            append_mesh(
                &mut triangles,
                &mesh,
                &instance.transform,
                kd,
                model_key,
                *instance_key,
            );
        }
    }

    let mut ambient = Vec3::zeros();
    for light_key in &world.lights {
        match committed(registry, *light_key, operation)? {
            CommittedState::Light(light) => ambient += light.color * light.intensity,
            other => return Err(mismatch(operation, "light", other)),
        }
    }

    Ok(RenderScene {
        triangles,
        ambient,
        background: renderer.background,
        pixel_samples: renderer.pixel_samples,
    })
}

/// Axis-aligned bounds of the committed world
pub(crate) fn world_bounds(
    registry: &Registry,
    world_key: ObjectKey,
    operation: &'static str,
) -> Result<Aabb, EngineError> {
    // Bounds ignore shading state, so a default renderer is fine here.
    let renderer = RendererState { background: Vec4::zeros(), pixel_samples: 1 };
    let scene = flatten_world(registry, world_key, &renderer, operation)?;
    let mut bounds = Aabb::empty();
    for triangle in &scene.triangles {
        bounds.extend(triangle.v0);
        bounds.extend(triangle.v1);
        bounds.extend(triangle.v2);
    }
    Ok(bounds)
}

fn append_mesh(
    triangles: &mut Vec<TrianglePrim>,
    mesh: &MeshState,
    transform: &Mat4,
    kd: Vec3,
    model: ObjectKey,
    instance: ObjectKey,
) {
    let position = |index: u32| -> Vec3 {
        let p = mesh.positions[index as usize];
        transform.transform_point(&Point3::from(p)).coords
    };
    let color = |index: u32| -> Vec4 {
        mesh.colors
            .as_ref()
            .map_or_else(|| Vec4::repeat(1.0), |colors| colors[index as usize])
    };

    for (prim_id, corners) in mesh.indices.iter().enumerate() {
        triangles.push(TrianglePrim {
            v0: position(corners[0]),
            v1: position(corners[1]),
            v2: position(corners[2]),
            c0: color(corners[0]),
            c1: color(corners[1]),
            c2: color(corners[2]),
            kd,
            prim_id: prim_id as u32,
            model,
            instance,
        });
    }
}

fn mismatch(operation: &'static str, expected: &str, got: &CommittedState) -> EngineError {
    EngineError::Internal {
        operation,
        reason: format!("expected committed {expected} state, got {got:?}"),
    }
}
