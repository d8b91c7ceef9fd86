//! Framebuffer storage and accumulation
//!
//! The accumulation buffer holds linear RGBA sums across frames; the color
//! buffer holds the resolved 8-bit image (the running mean, sRGB-encoded
//! when the framebuffer format asks for it). Row 0 is the bottom row of the
//! image.

use crate::api::framebuffer::{ChannelFlags, FrameBufferFormat};

/// Pixel and accumulation storage for one framebuffer object
#[derive(Debug)]
pub(crate) struct FrameBufferState {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) format: FrameBufferFormat,
    pub(crate) channels: ChannelFlags,
    /// Linear RGBA sums, one entry per pixel
    accum: Vec<[f32; 4]>,
    /// Resolved 8-bit RGBA image
    color: Vec<u8>,
    /// Frames accumulated since the last reset
    frames: u32,
}

impl FrameBufferState {
    pub(crate) fn new(width: u32, height: u32, format: FrameBufferFormat, channels: ChannelFlags) -> Self {
        let pixels = (width as usize) * (height as usize);
        Self {
            width,
            height,
            format,
            channels,
            accum: vec![[0.0; 4]; pixels],
            color: vec![0; pixels * 4],
            frames: 0,
        }
    }

    /// Clear accumulation history
    pub(crate) fn reset(&mut self) {
        self.accum.fill([0.0; 4]);
        self.color.fill(0);
        self.frames = 0;
    }

    /// Number of frames accumulated since the last reset
    pub(crate) fn frame_count(&self) -> u32 {
        self.frames
    }

    /// Fold one frame of linear samples into the buffer and refresh the
    /// resolved color image. Without the ACCUM channel the new frame simply
    /// replaces the previous one.
    pub(crate) fn add_frame(&mut self, samples: &[[f32; 4]]) {
        debug_assert_eq!(samples.len(), self.accum.len());
        if self.channels.contains(ChannelFlags::ACCUM) && self.frames > 0 {
            for (sum, sample) in self.accum.iter_mut().zip(samples) {
                for c in 0..4 {
                    sum[c] += sample[c];
                }
            }
        } else {
            self.accum.copy_from_slice(samples);
            self.frames = 0;
        }
        self.frames += 1;
        self.resolve();
    }

    /// Resolved 8-bit image, row 0 at the bottom
    pub(crate) fn color_bytes(&self) -> &[u8] {
        &self.color
    }

    fn resolve(&mut self) {
        let scale = 1.0 / self.frames as f32;
        let srgb = self.format == FrameBufferFormat::Srgba8;
        for (pixel, sum) in self.accum.iter().enumerate() {
            for c in 0..4 {
                let mean = sum[c] * scale;
                // Alpha stays linear in both formats.
                let encoded = if srgb && c < 3 { linear_to_srgb(mean) } else { mean };
                self.color[pixel * 4 + c] = quantize(encoded);
            }
        }
    }
}

/// Standard sRGB transfer function on a linear value in [0, 1]
fn linear_to_srgb(linear: f32) -> f32 {
    if linear <= 0.003_130_8 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

fn quantize(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(channels: ChannelFlags) -> FrameBufferState {
        FrameBufferState::new(2, 1, FrameBufferFormat::Rgba8, channels)
    }

    #[test]
    fn test_accumulation_averages_frames() {
        let mut fb = state(ChannelFlags::COLOR | ChannelFlags::ACCUM);
        fb.add_frame(&[[1.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0]]);
        fb.add_frame(&[[0.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0]]);

        assert_eq!(fb.frame_count(), 2);
        // Red channel of pixel 0 is the mean of 1.0 and 0.0.
        assert_eq!(fb.color_bytes()[0], 128);
    }

    #[test]
    fn test_without_accum_frames_replace() {
        let mut fb = state(ChannelFlags::COLOR);
        fb.add_frame(&[[1.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0]]);
        fb.add_frame(&[[0.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0]]);

        assert_eq!(fb.color_bytes()[0], 0);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut fb = state(ChannelFlags::COLOR | ChannelFlags::ACCUM);
        fb.add_frame(&[[1.0; 4], [1.0; 4]]);
        fb.reset();
        assert_eq!(fb.frame_count(), 0);
        assert!(fb.color_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_srgb_encoding_brightens_midtones() {
        let mut fb = FrameBufferState::new(
            1,
            1,
            FrameBufferFormat::Srgba8,
            ChannelFlags::COLOR | ChannelFlags::ACCUM,
        );
        fb.add_frame(&[[0.5, 0.5, 0.5, 0.5]]);
        // Linear 0.5 encodes to roughly 188 in sRGB; alpha stays linear.
        assert_eq!(fb.color_bytes()[0], 188);
        assert_eq!(fb.color_bytes()[3], 128);
    }
}
