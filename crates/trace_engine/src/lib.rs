//! # Trace Engine
//!
//! A retained-mode path-tracing engine with an RAII scene object lifecycle.
//!
//! ## Features
//!
//! - **Retained-Mode Scene API**: Opaque engine-side objects built from
//!   typed parameters and finalized with an explicit commit step
//! - **Structural Leak Freedom**: Every handle wrapper releases its engine
//!   reference exactly once, from `Drop`
//! - **Checked Calls**: Every engine operation returns a `Result` naming
//!   the failing operation
//! - **Reference Device**: A built-in CPU ray tracer with progressive
//!   accumulation, bounds queries, and screen-space picking
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trace_engine::prelude::*;
//!
//! fn main() -> Result<(), EngineError> {
//!     let device = Device::init(&DeviceConfig::default())?;
//!
//!     let mut camera = device.new_camera("perspective")?;
//!     camera.set_f32("aspect", 4.0 / 3.0)?;
//!     camera.set_vec3("position", Vec3::new(0.0, 0.0, 0.0))?;
//!     camera.set_vec3("direction", Vec3::new(0.0, 0.0, 1.0))?;
//!     camera.set_vec3("up", Vec3::new(0.0, 1.0, 0.0))?;
//!     camera.commit()?;
//!
//!     // ... build geometry, world, renderer, framebuffer ...
//!
//!     device.shutdown()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;

pub mod foundation;
pub mod api;
pub mod output;

mod backend;

pub use api::{Device, DeviceConfig, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        api::{
            Camera, ChannelFlags, Data, DataArray, Device, DeviceConfig, EngineError,
            FrameBuffer, FrameBufferFormat, FrameMap, GeometricModel, Geometry, Group, Instance,
            Light, PickResult, Renderer, World,
        },
        core::config::{ConfigError, RenderSettings},
        foundation::math::{Aabb, Vec3, Vec4},
        output::{OutputError, PngWriter},
    };
}
