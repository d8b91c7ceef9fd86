//! # Render Settings
//!
//! Configuration for the tutorial driver and any other headless render job:
//! image size, accumulation depth, output paths, and framebuffer
//! conventions. Settings are plain data with serde derives so they can be
//! loaded from a TOML file or constructed in code.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// A field failed validation
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Settings for a headless render job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Image width in pixels
    pub image_width: u32,
    /// Image height in pixels
    pub image_height: u32,
    /// Number of frames averaged into the accumulated image
    pub accumulation_frames: u32,
    /// Output path for the single-sample image
    pub first_frame_path: String,
    /// Output path for the accumulated image
    pub accumulated_frame_path: String,
    /// Renderer background color, splatted across RGBA
    pub background_color: f32,
    /// Flip rows on write so row 0 (bottom of the framebuffer) lands at the
    /// bottom of the PNG
    pub flip_vertically: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            image_width: 1024,
            image_height: 768,
            accumulation_frames: 10,
            first_frame_path: "firstFrame.png".to_string(),
            accumulated_frame_path: "accumulatedFrame.png".to_string(),
            background_color: 1.0,
            flip_vertically: true,
        }
    }
}

impl RenderSettings {
    /// Load settings from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let settings: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Aspect ratio of the configured image
    pub fn aspect(&self) -> f32 {
        self.image_width as f32 / self.image_height as f32
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "image size must be nonzero, got {}x{}",
                self.image_width, self.image_height
            )));
        }
        if self.accumulation_frames == 0 {
            return Err(ConfigError::Invalid(
                "accumulation_frames must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_tutorial_output() {
        let settings = RenderSettings::default();
        assert_eq!(settings.image_width, 1024);
        assert_eq!(settings.image_height, 768);
        assert_eq!(settings.accumulation_frames, 10);
        assert!(settings.flip_vertically);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_aspect_is_float_ratio() {
        let settings = RenderSettings::default();
        let expected = 1024.0_f32 / 768.0_f32;
        assert!((settings.aspect() - expected).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: RenderSettings =
            toml::from_str("image_width = 640\nimage_height = 480\n").unwrap();
        assert_eq!(settings.image_width, 640);
        assert_eq!(settings.image_height, 480);
        assert_eq!(settings.accumulation_frames, 10);
    }

    #[test]
    fn test_zero_size_rejected() {
        let settings: RenderSettings = toml::from_str("image_width = 0\n").unwrap();
        assert!(settings.validate().is_err());
    }
}
