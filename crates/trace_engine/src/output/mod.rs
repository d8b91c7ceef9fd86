//! Image output
//!
//! Writes rendered pixels to disk. The only format is PNG, matching what
//! the tutorial driver produces.

mod png;

pub use png::{OutputError, PngWriter};
