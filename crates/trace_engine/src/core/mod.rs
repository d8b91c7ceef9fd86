//! # Core Engine Module
//!
//! Shared abstractions the rest of the engine depends on.
//!
//! ## Organization
//!
//! - **Config**: Render settings loaded from TOML with validated defaults

pub mod config;

pub use config::{ConfigError, RenderSettings};
