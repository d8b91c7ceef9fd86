//! Renderer handle, frame rendering, and screen-space picking

use crate::api::device::ObjectRef;
use crate::api::error::EngineError;
use crate::api::framebuffer::FrameBuffer;
use crate::api::geometry::GeometricModel;
use crate::api::scene::{Camera, Instance, World};
use crate::backend::scene::{camera_state, flatten_world, renderer_state};
use crate::backend::tracer::{self, CameraBasis};
use crate::foundation::math::{Vec3, Vec4};

/// Handle to a renderer
#[derive(Debug)]
pub struct Renderer {
    inner: ObjectRef,
}

/// Result of a screen-space pick
///
/// On a hit, `instance` and `model` are retained handles released by their
/// own `Drop`; on a miss both are `None` and there is nothing to release.
#[derive(Debug)]
pub struct PickResult {
    /// The instance containing the hit surface
    pub instance: Option<Instance>,
    /// The geometric model containing the hit surface
    pub model: Option<GeometricModel>,
    /// Index of the hit primitive within its geometry (0 on a miss)
    pub prim_id: u32,
    /// World-space hit position
    pub world_position: Option<Vec3>,
}

impl PickResult {
    /// Whether the pick ray hit any surface
    pub fn has_hit(&self) -> bool {
        self.instance.is_some()
    }
}

impl Renderer {
    pub(crate) fn from_ref(inner: ObjectRef) -> Self {
        Self { inner }
    }

    /// Set a float parameter such as "backgroundColor"
    pub fn set_f32(&mut self, name: &str, value: f32) -> Result<(), EngineError> {
        self.inner.set_f32(name, value)
    }

    /// Set an integer parameter such as "pixelSamples"
    pub fn set_i32(&mut self, name: &str, value: i32) -> Result<(), EngineError> {
        self.inner.set_i32(name, value)
    }

    /// Set a full RGBA value for parameters that also accept splatted
    /// floats, such as "backgroundColor"
    pub fn set_vec4(&mut self, name: &str, value: Vec4) -> Result<(), EngineError> {
        self.inner.set_vec4(name, value)
    }

    /// Finalize the renderer settings
    pub fn commit(&mut self) -> Result<(), EngineError> {
        self.inner.commit()
    }

    /// Render one frame, blocking until every pixel is shaded. Adds the
    /// frame's contribution to the framebuffer's accumulation buffer and
    /// refreshes its resolved color buffer. The renderer, camera, and
    /// world must all be committed.
    pub fn render_frame(
        &self,
        framebuffer: &FrameBuffer,
        camera: &Camera,
        world: &World,
    ) -> Result<(), EngineError> {
        const OP: &str = "render_frame";
        self.inner.device().with_state(OP, |state| {
            let renderer = renderer_state(&state.registry, self.inner.key(), OP)?;
            let camera = camera_state(&state.registry, camera.key(), OP)?;
            let scene = flatten_world(&state.registry, world.key(), &renderer, OP)?;
            let basis = CameraBasis::new(&camera);
            let seed = state.seed;

            let fb = state.registry.framebuffer_mut(framebuffer.key(), OP)?;
            let frame_index = fb.frame_count();
            log::debug!(
                "rendering frame {frame_index} over {} triangles",
                scene.triangles.len()
            );
            tracer::render_frame(&scene, &basis, fb, seed, frame_index);
            Ok(())
        })
    }

    /// Trace a single ray through the pixel at normalized screen
    /// coordinates (x, y) in [0, 1]², origin at the bottom-left corner,
    /// and report the nearest surface.
    pub fn pick(
        &self,
        framebuffer: &FrameBuffer,
        camera: &Camera,
        world: &World,
        x: f32,
        y: f32,
    ) -> Result<PickResult, EngineError> {
        const OP: &str = "pick";
        let device = self.inner.device().clone();
        let hit = self.inner.device().with_state(OP, |state| {
            let renderer = renderer_state(&state.registry, self.inner.key(), OP)?;
            let camera = camera_state(&state.registry, camera.key(), OP)?;
            let scene = flatten_world(&state.registry, world.key(), &renderer, OP)?;
            let basis = CameraBasis::new(&camera);

            // Snap to the center of the pixel the coordinates land in.
            let fb = state.registry.framebuffer_mut(framebuffer.key(), OP)?;
            let sx = snap_to_pixel_center(x, fb.width);
            let sy = snap_to_pixel_center(y, fb.height);

            let hit = tracer::pick(&scene, &basis, sx, sy);
            if let Some(hit) = &hit {
                // The result carries retained references the caller's
                // wrappers will release.
                state.registry.retain(hit.instance);
                state.registry.retain(hit.model);
            }
            Ok(hit)
        })?;

        Ok(match hit {
            None => PickResult {
                instance: None,
                model: None,
                prim_id: 0,
                world_position: None,
            },
            Some(hit) => PickResult {
                instance: Some(Instance::from_ref(ObjectRef::new(device.clone(), hit.instance))),
                model: Some(GeometricModel::from_ref(ObjectRef::new(device, hit.model))),
                prim_id: hit.prim_id,
                world_position: Some(hit.position),
            },
        })
    }
}

/// Clamp a normalized coordinate into the image and move it to the center
/// of its pixel.
fn snap_to_pixel_center(coord: f32, extent: u32) -> f32 {
    let extent = extent as f32;
    let pixel = (coord.clamp(0.0, 1.0) * extent).min(extent - 1.0).floor();
    (pixel + 0.5) / extent
}
