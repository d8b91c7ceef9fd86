//! The reference ray tracer
//!
//! A single-threaded, blocking tracer sized to tutorial scenes: perspective
//! ray generation, Möller–Trumbore triangle intersection with no backface
//! culling, and flat shading from barycentric-interpolated vertex colors
//! under ambient light. Stochastic antialiasing comes from per-pixel sample
//! jitter, so successive accumulated frames converge on smooth edges.

use crate::backend::commit::CameraState;
use crate::backend::framebuffer::FrameBufferState;
use crate::backend::registry::ObjectKey;
use crate::backend::sampler::PixelSampler;
use crate::backend::scene::{RenderScene, TrianglePrim};
use crate::foundation::math::Vec3;

const INTERSECT_EPSILON: f32 = 1e-7;

/// A world-space ray
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ray {
    pub(crate) origin: Vec3,
    pub(crate) dir: Vec3,
}

/// Precomputed image-plane basis for a committed perspective camera
#[derive(Debug, Clone)]
pub(crate) struct CameraBasis {
    origin: Vec3,
    dir: Vec3,
    du: Vec3,
    dv: Vec3,
    plane_x: f32,
    plane_y: f32,
}

impl CameraBasis {
    pub(crate) fn new(camera: &CameraState) -> Self {
        let dir = camera.direction.normalize();
        let du = dir.cross(&camera.up).normalize();
        let dv = du.cross(&dir);
        let plane_y = 2.0 * (camera.fovy.to_radians() * 0.5).tan();
        let plane_x = plane_y * camera.aspect;
        Self { origin: camera.position, dir, du, dv, plane_x, plane_y }
    }

    /// Ray through normalized screen position (sx, sy) in [0, 1]²,
    /// origin at the bottom-left corner
    pub(crate) fn ray_through(&self, sx: f32, sy: f32) -> Ray {
        let dir = self.dir
            + self.du * ((sx - 0.5) * self.plane_x)
            + self.dv * ((sy - 0.5) * self.plane_y);
        Ray { origin: self.origin, dir: dir.normalize() }
    }
}

/// Nearest intersection along a ray
#[derive(Debug, Clone, Copy)]
pub(crate) struct Hit<'a> {
    pub(crate) t: f32,
    pub(crate) u: f32,
    pub(crate) v: f32,
    pub(crate) triangle: &'a TrianglePrim,
}

/// Möller–Trumbore ray/triangle test, returning (t, u, v) on hit.
/// Backfaces count as hits; degenerate triangles never do.
fn intersect_triangle(ray: &Ray, triangle: &TrianglePrim) -> Option<(f32, f32, f32)> {
    let edge1 = triangle.v1 - triangle.v0;
    let edge2 = triangle.v2 - triangle.v0;
    let pvec = ray.dir.cross(&edge2);
    let det = edge1.dot(&pvec);
    if det.abs() < INTERSECT_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = ray.origin - triangle.v0;
    let u = tvec.dot(&pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(&edge1);
    let v = ray.dir.dot(&qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(&qvec) * inv_det;
    if t <= INTERSECT_EPSILON {
        return None;
    }
    Some((t, u, v))
}

/// Nearest hit across the whole scene
pub(crate) fn intersect_scene<'a>(scene: &'a RenderScene, ray: &Ray) -> Option<Hit<'a>> {
    let mut nearest: Option<Hit<'a>> = None;
    for triangle in &scene.triangles {
        if let Some((t, u, v)) = intersect_triangle(ray, triangle) {
            if nearest.as_ref().map_or(true, |hit| t < hit.t) {
                nearest = Some(Hit { t, u, v, triangle });
            }
        }
    }
    nearest
}

/// Shade one ray: interpolated vertex color modulated by the material and
/// the gathered ambient radiance; misses return the background splat.
fn shade(scene: &RenderScene, ray: &Ray) -> [f32; 4] {
    match intersect_scene(scene, ray) {
        None => scene.background.into(),
        Some(hit) => {
            let w = 1.0 - hit.u - hit.v;
            let color = hit.triangle.c0 * w + hit.triangle.c1 * hit.u + hit.triangle.c2 * hit.v;
            let radiance = Vec3::new(
                color.x * hit.triangle.kd.x * scene.ambient.x,
                color.y * hit.triangle.kd.y * scene.ambient.y,
                color.z * hit.triangle.kd.z * scene.ambient.z,
            );
            [radiance.x, radiance.y, radiance.z, color.w]
        }
    }
}

/// Render one frame into the framebuffer, blocking until every pixel is
/// shaded. `frame_index` selects the jitter stream so accumulation frames
/// differ while any given frame stays reproducible.
pub(crate) fn render_frame(
    scene: &RenderScene,
    camera: &CameraBasis,
    fb: &mut FrameBufferState,
    seed: u64,
    frame_index: u32,
) {
    let width = fb.width;
    let height = fb.height;
    let mut samples = vec![[0.0_f32; 4]; (width as usize) * (height as usize)];

    for y in 0..height {
        for x in 0..width {
            let mut sampler = PixelSampler::new(seed, frame_index, x, y);
            let mut sum = [0.0_f32; 4];
            for _ in 0..scene.pixel_samples {
                let sx = (x as f32 + sampler.next_f32()) / width as f32;
                let sy = (y as f32 + sampler.next_f32()) / height as f32;
                let sample = shade(scene, &camera.ray_through(sx, sy));
                for c in 0..4 {
                    sum[c] += sample[c];
                }
            }
            let scale = 1.0 / scene.pixel_samples as f32;
            let pixel = (y * width + x) as usize;
            for c in 0..4 {
                samples[pixel][c] = sum[c] * scale;
            }
        }
    }

    fb.add_frame(&samples);
}

/// Result of a screen-space pick against the flattened scene
#[derive(Debug, Clone)]
pub(crate) struct PickHit {
    pub(crate) instance: ObjectKey,
    pub(crate) model: ObjectKey,
    pub(crate) prim_id: u32,
    pub(crate) position: Vec3,
}

/// Trace a single ray through the pixel at normalized (sx, sy) and report
/// the nearest surface, if any.
pub(crate) fn pick(
    scene: &RenderScene,
    camera: &CameraBasis,
    sx: f32,
    sy: f32,
) -> Option<PickHit> {
    let ray = camera.ray_through(sx, sy);
    intersect_scene(scene, &ray).map(|hit| PickHit {
        instance: hit.triangle.instance,
        model: hit.triangle.model,
        prim_id: hit.triangle.prim_id,
        position: ray.origin + ray.dir * hit.t,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::framebuffer::{ChannelFlags, FrameBufferFormat};
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    /// The tutorial's two-triangle scene: a quad corner pair at z = 3 with
    /// one vertex pulled toward the camera.
    fn tutorial_scene() -> RenderScene {
        let positions = [
            Vec3::new(-1.0, -1.0, 3.0),
            Vec3::new(-1.0, 1.0, 3.0),
            Vec3::new(1.0, -1.0, 3.0),
            Vec3::new(0.1, 0.1, 0.3),
        ];
        let colors = [
            Vec4::new(0.9, 0.5, 0.5, 1.0),
            Vec4::new(0.8, 0.8, 0.8, 1.0),
            Vec4::new(0.8, 0.8, 0.8, 1.0),
            Vec4::new(0.5, 0.9, 0.5, 1.0),
        ];
        let indices = [[0_u32, 1, 2], [1, 2, 3]];

        let triangles = indices
            .iter()
            .enumerate()
            .map(|(prim_id, corners)| TrianglePrim {
                v0: positions[corners[0] as usize],
                v1: positions[corners[1] as usize],
                v2: positions[corners[2] as usize],
                c0: colors[corners[0] as usize],
                c1: colors[corners[1] as usize],
                c2: colors[corners[2] as usize],
                kd: Vec3::repeat(0.8),
                prim_id: prim_id as u32,
                model: ObjectKey::default(),
                instance: ObjectKey::default(),
            })
            .collect();

        RenderScene {
            triangles,
            ambient: Vec3::repeat(1.0),
            background: Vec4::repeat(1.0),
            pixel_samples: 1,
        }
    }

    fn tutorial_camera() -> CameraBasis {
        CameraBasis::new(&CameraState {
            position: Vec3::zeros(),
            direction: Vec3::new(0.1, 0.0, 1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            aspect: 1024.0 / 768.0,
            fovy: 60.0,
        })
    }

    fn small_fb() -> FrameBufferState {
        FrameBufferState::new(
            32,
            24,
            FrameBufferFormat::Srgba8,
            ChannelFlags::COLOR | ChannelFlags::ACCUM,
        )
    }

    #[test]
    fn test_triangle_hit_reports_barycentrics() {
        let scene = tutorial_scene();
        let ray = Ray {
            origin: Vec3::new(-0.5, -0.5, 0.0),
            dir: Vec3::new(0.0, 0.0, 1.0),
        };
        let (t, u, v) = intersect_triangle(&ray, &scene.triangles[0]).unwrap();
        assert_relative_eq!(t, 3.0, epsilon = 1e-5);
        assert!(u >= 0.0 && v >= 0.0 && u + v <= 1.0);
    }

    #[test]
    fn test_ray_behind_origin_misses() {
        let scene = tutorial_scene();
        let ray = Ray {
            origin: Vec3::new(-0.5, -0.5, 0.0),
            dir: Vec3::new(0.0, 0.0, -1.0),
        };
        assert!(intersect_triangle(&ray, &scene.triangles[0]).is_none());
    }

    #[test]
    fn test_pick_center_hits_tutorial_triangle() {
        let scene = tutorial_scene();
        let camera = tutorial_camera();
        let hit = pick(&scene, &camera, 0.5, 0.5).unwrap();
        assert!(hit.prim_id == 0 || hit.prim_id == 1);
        // The near-plane corner pulls triangle 1 in front of the quad face.
        assert_eq!(hit.prim_id, 1);
        assert!(hit.position.z > 0.0);
    }

    #[test]
    fn test_pick_far_corner_misses() {
        let scene = tutorial_scene();
        let camera = tutorial_camera();
        assert!(pick(&scene, &camera, 0.02, 0.98).is_none());
    }

    #[test]
    fn test_miss_shades_background() {
        let mut scene = tutorial_scene();
        scene.triangles.clear();
        let camera = tutorial_camera();
        let sample = shade(&scene, &camera.ray_through(0.5, 0.5));
        assert_eq!(sample, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_render_is_reproducible() {
        let scene = tutorial_scene();
        let camera = tutorial_camera();
        let mut first = small_fb();
        let mut second = small_fb();

        render_frame(&scene, &camera, &mut first, 0, 0);
        render_frame(&scene, &camera, &mut second, 0, 0);

        assert_eq!(first.color_bytes(), second.color_bytes());
    }

    #[test]
    fn test_accumulated_image_differs_from_first_frame() {
        let scene = tutorial_scene();
        let camera = tutorial_camera();
        let mut single = small_fb();
        let mut accumulated = small_fb();

        render_frame(&scene, &camera, &mut single, 0, 0);
        for frame in 0..10 {
            render_frame(&scene, &camera, &mut accumulated, 0, frame);
        }

        assert_eq!(accumulated.frame_count(), 10);
        assert_ne!(single.color_bytes(), accumulated.color_bytes());
    }
}
