//! Triangle tutorial application
//!
//! Builds a minimal two-triangle scene, renders a single-sample frame and
//! a 10-sample accumulated frame to PNG files, and picks at the center of
//! the screen. Every engine call is checked; the only unusual exit path is
//! device initialization failure, which terminates the process with the
//! device's own status code before any scene state exists.

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use trace_engine::prelude::*;

/// Optional settings override next to the executable
const SETTINGS_PATH: &str = "triangle.toml";

fn main() -> ExitCode {
    trace_engine::foundation::logging::init_with_level(log::LevelFilter::Info);

    let settings = load_settings();

    let device = match Device::init(&DeviceConfig::default()) {
        Ok(device) => device,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1));
        }
    };

    let status = match run(&device, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    };

    log::info!("cleaning up...");
    if let Err(err) = device.shutdown() {
        log::error!("{err}");
        return ExitCode::FAILURE;
    }

    status
}

fn run(device: &Device, settings: &RenderSettings) -> Result<(), Box<dyn Error>> {
    log::info!("setting up camera...");
    let camera = build_camera(device, settings)?;

    log::info!("setting up scene...");
    let geometry = build_geometry(device)?;
    let model = build_model(device, geometry)?;
    let world = assemble_world(device, model)?;

    let bounds = world.bounds()?;
    log::info!(
        "world bounds: ({:.6}, {:.6}, {:.6}) - ({:.6}, {:.6}, {:.6})",
        bounds.lower.x,
        bounds.lower.y,
        bounds.lower.z,
        bounds.upper.x,
        bounds.upper.y,
        bounds.upper.z
    );

    log::info!("setting up renderer...");
    let mut renderer = device.new_renderer("pathtracer")?;
    renderer.set_f32("backgroundColor", settings.background_color)?;
    renderer.commit()?;

    let mut framebuffer = device.new_framebuffer(
        settings.image_width,
        settings.image_height,
        FrameBufferFormat::Srgba8,
        ChannelFlags::COLOR | ChannelFlags::ACCUM,
    )?;
    framebuffer.reset_accumulation()?;

    let writer = PngWriter { flip_vertically: settings.flip_vertically };

    log::info!("rendering initial frame to {}...", settings.first_frame_path);
    renderer.render_frame(&framebuffer, &camera, &world)?;
    write_frame(&writer, &mut framebuffer, settings, &settings.first_frame_path)?;

    log::info!(
        "rendering {} accumulated frames to {}...",
        settings.accumulation_frames,
        settings.accumulated_frame_path
    );
    for _ in 0..settings.accumulation_frames {
        renderer.render_frame(&framebuffer, &camera, &world)?;
    }
    write_frame(&writer, &mut framebuffer, settings, &settings.accumulated_frame_path)?;

    let pick = renderer.pick(&framebuffer, &camera, &world, 0.5, 0.5)?;
    if pick.has_hit() {
        let position = pick.world_position.unwrap_or_else(Vec3::zeros);
        log::info!(
            "pick at screen center hit primitive {} at ({:.3}, {:.3}, {:.3})",
            pick.prim_id,
            position.x,
            position.y,
            position.z
        );
    } else {
        log::info!("pick at screen center hit nothing");
    }

    Ok(())
}

fn build_camera(device: &Device, settings: &RenderSettings) -> Result<Camera, EngineError> {
    let mut camera = device.new_camera("perspective")?;
    camera.set_f32("aspect", settings.aspect())?;
    camera.set_vec3("position", Vec3::new(0.0, 0.0, 0.0))?;
    camera.set_vec3("direction", Vec3::new(0.1, 0.0, 1.0))?;
    camera.set_vec3("up", Vec3::new(0.0, 1.0, 0.0))?;
    camera.commit()?;
    Ok(camera)
}

/// Wrap the triangle data as shared buffers and attach them to a mesh.
/// Each buffer wrapper is dropped right after attachment; the mesh keeps
/// its own reference.
fn build_geometry(device: &Device) -> Result<Geometry, EngineError> {
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

    let mut mesh = device.new_geometry("mesh")?;
    for (slot, array) in [
        ("vertex.position", DataArray::Vec3(positions)),
        ("vertex.color", DataArray::Vec4(colors)),
        ("index", DataArray::UVec3(indices)),
    ] {
        let mut data = device.new_shared_data(array)?;
        data.commit()?;
        mesh.set_data(slot, &data)?;
    }
    mesh.commit()?;
    Ok(mesh)
}

/// Bind the mesh to a path-tracer material. The geometry and material
/// wrappers are consumed; the model's committed state keeps both alive.
fn build_model(device: &Device, geometry: Geometry) -> Result<GeometricModel, EngineError> {
    let mut material = device.new_material("pathtracer", "obj")?;
    material.commit()?;

    let mut model = device.new_geometric_model(&geometry)?;
    model.set_material(&material)?;
    model.commit()?;
    Ok(model)
}

/// Build the group → instance → world chain around the model, lighting the
/// world with a single ambient light. Children are dropped as soon as the
/// parent holds them.
fn assemble_world(device: &Device, model: GeometricModel) -> Result<World, EngineError> {
    let mut group = device.new_group()?;
    group.set_models(&[&model])?;
    group.commit()?;
    drop(model);

    let mut instance = device.new_instance(&group)?;
    instance.commit()?;
    drop(group);

    let mut light = device.new_light("ambient")?;
    light.commit()?;

    let mut world = device.new_world()?;
    world.set_instances(&[&instance])?;
    world.set_lights(&[&light])?;
    world.commit()?;
    Ok(world)
}

/// Map the framebuffer, encode the pixels, and unmap on every path (the
/// mapping is scoped to this function).
fn write_frame(
    writer: &PngWriter,
    framebuffer: &mut FrameBuffer,
    settings: &RenderSettings,
    path: &str,
) -> Result<(), Box<dyn Error>> {
    let map = framebuffer.map()?;
    writer.write(path, settings.image_width, settings.image_height, &map)?;
    Ok(())
}

fn load_settings() -> RenderSettings {
    if std::path::Path::new(SETTINGS_PATH).exists() {
        match RenderSettings::load_from_file(SETTINGS_PATH) {
            Ok(settings) => {
                log::info!("loaded settings from {SETTINGS_PATH}");
                return settings;
            }
            Err(err) => {
                log::warn!("ignoring {SETTINGS_PATH}: {err}");
            }
        }
    }
    RenderSettings::default()
}
