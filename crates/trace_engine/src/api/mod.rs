//! The retained-mode scene API
//!
//! Callers build a directed acyclic ownership graph of engine-side objects
//! (geometry → model → group → instance → world, plus camera, material,
//! light, renderer, framebuffer), commit each object to finalize its
//! parameters, and drop wrappers as soon as a parent has taken its own
//! reference. Wrappers release their engine reference from `Drop`, so
//! every created object is released exactly once on every control-flow
//! path.

pub mod data;
pub mod error;
pub mod framebuffer;
pub mod geometry;
pub mod renderer;
pub mod scene;

mod device;

pub use data::{Data, DataArray};
pub use device::{Device, DeviceConfig};
pub use error::EngineError;
pub use framebuffer::{ChannelFlags, FrameBuffer, FrameBufferFormat, FrameMap};
pub use geometry::{GeometricModel, Geometry, Material};
pub use renderer::{PickResult, Renderer};
pub use scene::{Camera, Group, Instance, Light, World};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Vec3, Vec4};
    use std::sync::Arc;

    const WIDTH: u32 = 64;
    const HEIGHT: u32 = 48;

    fn device() -> Device {
        Device::init(&DeviceConfig::default()).unwrap()
    }

    /// Build the tutorial's two-triangle world: camera at the origin
    /// looking roughly down +z, a quad at z = 3 with one corner pulled
    /// toward the camera, one ambient light. Intermediate wrappers are
    /// dropped as soon as their parent holds a reference, exactly like the
    /// driver does.
    fn build_scene(device: &Device) -> (Camera, World) {
        let mut camera = device.new_camera("perspective").unwrap();
        camera.set_f32("aspect", WIDTH as f32 / HEIGHT as f32).unwrap();
        camera.set_vec3("position", Vec3::zeros()).unwrap();
        camera.set_vec3("direction", Vec3::new(0.1, 0.0, 1.0)).unwrap();
        camera.set_vec3("up", Vec3::new(0.0, 1.0, 0.0)).unwrap();
        camera.commit().unwrap();

        let positions: Arc<[Vec3]> = Arc::from(vec![
            Vec3::new(-1.0, -1.0, 3.0),
            Vec3::new(-1.0, 1.0, 3.0),
            Vec3::new(1.0, -1.0, 3.0),
            Vec3::new(0.1, 0.1, 0.3),
        ]);
        let colors: Arc<[Vec4]> = Arc::from(vec![
            Vec4::new(0.9, 0.5, 0.5, 1.0),
            Vec4::new(0.8, 0.8, 0.8, 1.0),
            Vec4::new(0.8, 0.8, 0.8, 1.0),
            Vec4::new(0.5, 0.9, 0.5, 1.0),
        ]);
        let indices: Arc<[[u32; 3]]> = Arc::from(vec![[0, 1, 2], [1, 2, 3]]);

        let mut mesh = device.new_geometry("mesh").unwrap();
        for (slot, array) in [
            ("vertex.position", DataArray::Vec3(positions)),
            ("vertex.color", DataArray::Vec4(colors)),
            ("index", DataArray::UVec3(indices)),
        ] {
            let mut data = device.new_shared_data(array).unwrap();
            data.commit().unwrap();
            mesh.set_data(slot, &data).unwrap();
        }
        mesh.commit().unwrap();

        let mut material = device.new_material("pathtracer", "obj").unwrap();
        material.commit().unwrap();

        let mut model = device.new_geometric_model(&mesh).unwrap();
        model.set_material(&material).unwrap();
        model.commit().unwrap();
        drop(mesh);
        drop(material);

        let mut group = device.new_group().unwrap();
        group.set_models(&[&model]).unwrap();
        group.commit().unwrap();
        drop(model);

        let mut instance = device.new_instance(&group).unwrap();
        instance.commit().unwrap();
        drop(group);

        let mut light = device.new_light("ambient").unwrap();
        light.commit().unwrap();

        let mut world = device.new_world().unwrap();
        world.set_instances(&[&instance]).unwrap();
        world.set_lights(&[&light]).unwrap();
        world.commit().unwrap();
        drop(instance);
        drop(light);

        (camera, world)
    }

    fn render_setup(device: &Device) -> (Camera, World, Renderer, FrameBuffer) {
        let (camera, world) = build_scene(device);

        let mut renderer = device.new_renderer("pathtracer").unwrap();
        renderer.set_f32("backgroundColor", 1.0).unwrap();
        renderer.commit().unwrap();

        let mut framebuffer = device
            .new_framebuffer(
                WIDTH,
                HEIGHT,
                FrameBufferFormat::Srgba8,
                ChannelFlags::COLOR | ChannelFlags::ACCUM,
            )
            .unwrap();
        framebuffer.reset_accumulation().unwrap();

        (camera, world, renderer, framebuffer)
    }

    #[test]
    fn test_every_object_is_released() {
        let device = device();
        {
            let _setup = render_setup(&device);
            assert!(device.live_object_count() > 0);
        }
        assert_eq!(device.live_object_count(), 0);
        device.shutdown().unwrap();
    }

    #[test]
    fn test_children_outlive_dropped_wrappers() {
        let device = device();
        // build_scene drops every intermediate wrapper; the world's
        // retained references must keep the scene content alive.
        let (_camera, world) = build_scene(&device);
        let bounds = world.bounds().unwrap();
        assert!(!bounds.is_empty());
    }

    #[test]
    fn test_bounds_contain_all_vertices() {
        let device = device();
        let (_camera, world) = build_scene(&device);
        let bounds = world.bounds().unwrap();

        assert!(bounds.lower.x <= bounds.upper.x);
        assert!(bounds.lower.y <= bounds.upper.y);
        assert!(bounds.lower.z <= bounds.upper.z);
        for vertex in [
            Vec3::new(-1.0, -1.0, 3.0),
            Vec3::new(-1.0, 1.0, 3.0),
            Vec3::new(1.0, -1.0, 3.0),
            Vec3::new(0.1, 0.1, 0.3),
        ] {
            assert!(bounds.contains_point(vertex));
        }
    }

    #[test]
    fn test_mapped_pixels_match_dimensions() {
        let device = device();
        let (camera, world, renderer, mut framebuffer) = render_setup(&device);
        renderer.render_frame(&framebuffer, &camera, &world).unwrap();

        let map = framebuffer.map().unwrap();
        assert_eq!(map.len(), (WIDTH * HEIGHT * 4) as usize);
    }

    #[test]
    fn test_accumulated_image_differs_from_first() {
        let device = device();
        let (camera, world, renderer, mut framebuffer) = render_setup(&device);

        renderer.render_frame(&framebuffer, &camera, &world).unwrap();
        let first: Vec<u8> = framebuffer.map().unwrap().to_vec();

        for _ in 0..9 {
            renderer.render_frame(&framebuffer, &camera, &world).unwrap();
        }
        let accumulated: Vec<u8> = framebuffer.map().unwrap().to_vec();

        assert_eq!(first.len(), accumulated.len());
        assert_ne!(first, accumulated);
    }

    #[test]
    fn test_first_frame_is_reproducible() {
        let render_once = || {
            let device = device();
            let (camera, world, renderer, mut framebuffer) = render_setup(&device);
            renderer.render_frame(&framebuffer, &camera, &world).unwrap();
            let pixels: Vec<u8> = framebuffer.map().unwrap().to_vec();
            pixels
        };
        assert_eq!(render_once(), render_once());
    }

    #[test]
    fn test_pick_center_hits_and_retains() {
        let device = device();
        let (camera, world, renderer, framebuffer) = render_setup(&device);
        let before = device.live_object_count();

        let result = renderer
            .pick(&framebuffer, &camera, &world, 0.5, 0.5)
            .unwrap();
        assert!(result.has_hit());
        assert!(result.prim_id == 0 || result.prim_id == 1);
        assert!(result.instance.is_some());
        assert!(result.model.is_some());
        assert!(result.world_position.is_some());
        // The hit handles are retained references, not new objects.
        assert_eq!(device.live_object_count(), before);

        drop(result);
        assert_eq!(device.live_object_count(), before);
    }

    #[test]
    fn test_pick_miss_carries_no_handles() {
        let device = device();
        let (camera, world, renderer, framebuffer) = render_setup(&device);

        let result = renderer
            .pick(&framebuffer, &camera, &world, 0.02, 0.98)
            .unwrap();
        assert!(!result.has_hit());
        assert!(result.instance.is_none());
        assert!(result.model.is_none());
        assert!(result.world_position.is_none());
    }

    #[test]
    fn test_rendering_uncommitted_world_fails() {
        let device = device();
        let (camera, _world, renderer, framebuffer) = render_setup(&device);
        let uncommitted = device.new_world().unwrap();

        let err = renderer
            .render_frame(&framebuffer, &camera, &uncommitted)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotCommitted { .. }));
    }

    #[test]
    fn test_calls_after_shutdown_fail() {
        let device = device();
        device.shutdown().unwrap();

        let err = device.new_camera("perspective").unwrap_err();
        assert!(matches!(err, EngineError::Shutdown { .. }));
    }

    #[test]
    fn test_unknown_type_names_are_rejected() {
        let device = device();
        let err = device.new_camera("orthographic").unwrap_err();
        assert!(matches!(err, EngineError::UnknownType { .. }));

        let err = Device::init(&DeviceConfig {
            device_type: "gpu".to_string(),
            ..DeviceConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::InitFailed { code: 2, .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_mutating_while_mapped_fails() {
        let device = device();
        let (camera, world, mut renderer, mut framebuffer) = render_setup(&device);
        renderer.render_frame(&framebuffer, &camera, &world).unwrap();

        let map = framebuffer.map().unwrap();
        let err = renderer.set_f32("backgroundColor", 0.0).unwrap_err();
        assert!(matches!(err, EngineError::FrameBufferMapped { .. }));
        drop(map);

        renderer.set_f32("backgroundColor", 0.0).unwrap();
    }

    #[test]
    fn test_release_while_mapped_is_deferred_not_lost() {
        let device = device();
        let (camera, world, renderer, mut framebuffer) = render_setup(&device);
        renderer.render_frame(&framebuffer, &camera, &world).unwrap();

        let mut light = device.new_light("ambient").unwrap();
        light.commit().unwrap();
        let with_light = device.live_object_count();

        let map = framebuffer.map().unwrap();
        drop(light);
        // The release could not run while the buffer was mapped.
        assert_eq!(device.live_object_count(), with_light);
        drop(map);

        // The next device operation drains the deferred release.
        framebuffer.reset_accumulation().unwrap();
        assert_eq!(device.live_object_count(), with_light - 1);
    }
}
