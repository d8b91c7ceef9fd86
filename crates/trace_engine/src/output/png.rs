//! PNG encoding of framebuffer pixels

use image::{ImageBuffer, RgbaImage};
use std::path::Path;
use thiserror::Error;

/// Image write errors
#[derive(Debug, Error)]
pub enum OutputError {
    /// The pixel buffer does not match the stated dimensions
    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    SizeMismatch {
        /// Bytes found in the buffer
        actual: usize,
        /// Bytes implied by the dimensions
        expected: usize,
        /// Image width in pixels
        width: u32,
        /// Image height in pixels
        height: u32,
    },

    /// Encoding or filesystem failure from the image codec
    #[error("image write failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// PNG writer for RGBA8 pixel buffers
///
/// Framebuffers store row 0 at the bottom while PNG rows run top-down;
/// with `flip_vertically` set the writer reverses row order so the image
/// appears upright.
#[derive(Debug, Clone, Copy)]
pub struct PngWriter {
    /// Reverse row order on write
    pub flip_vertically: bool,
}

impl Default for PngWriter {
    fn default() -> Self {
        Self { flip_vertically: true }
    }
}

impl PngWriter {
    /// Write `pixels` (packed RGBA, 4-byte stride per pixel) as a PNG file.
    pub fn write<P: AsRef<Path>>(
        &self,
        path: P,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), OutputError> {
        let expected = (width as usize) * (height as usize) * 4;
        if pixels.len() != expected {
            return Err(OutputError::SizeMismatch {
                actual: pixels.len(),
                expected,
                width,
                height,
            });
        }

        let row_bytes = (width as usize) * 4;
        let data = if self.flip_vertically {
            let mut flipped = Vec::with_capacity(expected);
            for row in pixels.chunks_exact(row_bytes).rev() {
                flipped.extend_from_slice(row);
            }
            flipped
        } else {
            pixels.to_vec()
        };

        // from_raw only fails on a length mismatch, which was checked above.
        let image: RgbaImage = ImageBuffer::from_raw(width, height, data).ok_or_else(|| {
            OutputError::SizeMismatch { actual: expected, expected, width, height }
        })?;
        log::info!("writing {}x{} PNG to {:?}", width, height, path.as_ref());
        image.save(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(name)
    }

    #[test]
    fn test_writes_readable_png() {
        let path = temp_path("trace_engine_write_test.png");
        let pixels = vec![255u8; 4 * 4 * 4];

        PngWriter::default().write(&path, 4, 4, &pixels).unwrap();

        let read_back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(read_back.dimensions(), (4, 4));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_flip_reverses_row_order() {
        let path = temp_path("trace_engine_flip_test.png");
        // 1x2 image: bottom row red, top row blue.
        let pixels = [255, 0, 0, 255, 0, 0, 255, 255];

        PngWriter { flip_vertically: true }.write(&path, 1, 2, &pixels).unwrap();

        let read_back = image::open(&path).unwrap().to_rgba8();
        // PNG row 0 is the top, which held the blue pixel.
        assert_eq!(read_back.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(read_back.get_pixel(0, 1).0, [255, 0, 0, 255]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let err = PngWriter::default()
            .write(temp_path("trace_engine_bad.png"), 2, 2, &[0u8; 3])
            .unwrap_err();
        assert!(matches!(err, OutputError::SizeMismatch { .. }));
    }
}
