//! Framebuffer handle and the scoped pixel mapping

use crate::api::device::{DeviceState, ObjectRef};
use crate::api::error::EngineError;
use crate::backend::registry::ObjectKey;
use bitflags::bitflags;
use std::cell::Ref;
use std::ops::Deref;

/// Pixel encoding of the resolved color buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBufferFormat {
    /// 8-bit RGBA, linear
    Rgba8,
    /// 8-bit RGBA with sRGB-encoded color channels
    Srgba8,
}

bitflags! {
    /// Channels a framebuffer allocates
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChannelFlags: u32 {
        /// The resolved color buffer (always required)
        const COLOR = 1;
        /// Progressive accumulation across render calls
        const ACCUM = 1 << 1;
    }
}

/// Handle to a framebuffer
#[derive(Debug)]
pub struct FrameBuffer {
    inner: ObjectRef,
    width: u32,
    height: u32,
    format: FrameBufferFormat,
    channels: ChannelFlags,
}

impl FrameBuffer {
    pub(crate) fn from_ref(
        inner: ObjectRef,
        width: u32,
        height: u32,
        format: FrameBufferFormat,
        channels: ChannelFlags,
    ) -> Self {
        Self { inner, width, height, format, channels }
    }

    pub(crate) fn key(&self) -> ObjectKey {
        self.inner.key()
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel encoding of the color buffer
    pub fn format(&self) -> FrameBufferFormat {
        self.format
    }

    /// Channels this framebuffer allocates
    pub fn channels(&self) -> ChannelFlags {
        self.channels
    }

    /// Clear accumulation history. Call once before the first frame of an
    /// accumulation sequence so output does not depend on prior state.
    pub fn reset_accumulation(&mut self) -> Result<(), EngineError> {
        const OP: &str = "reset_accumulation";
        self.inner.device().with_state(OP, |state| {
            state.registry.framebuffer_mut(self.inner.key(), OP)?.reset();
            Ok(())
        })
    }

    /// Map the resolved color buffer as a scoped read-only byte view,
    /// row 0 at the bottom, 4 bytes per pixel.
    ///
    /// The mapping unmaps itself when dropped, on every path. While it
    /// lives, mutating device operations fail with
    /// [`EngineError::FrameBufferMapped`]; the borrow of `self` prevents
    /// remapping or resetting this framebuffer.
    pub fn map(&mut self) -> Result<FrameMap<'_>, EngineError> {
        const OP: &str = "map";
        let state = self.inner.device().borrow_state(OP)?;
        let pixels = Ref::filter_map(state, |state: &DeviceState| {
            state.registry.framebuffer_bytes(self.inner.key())
        })
        .map_err(|_| EngineError::StaleHandle { operation: OP })?;
        Ok(FrameMap { pixels })
    }
}

/// Scoped read-only view of a framebuffer's resolved pixels
///
/// Dereferences to `&[u8]` (RGBA, row 0 at the bottom). Dropping the view
/// unmaps the framebuffer.
#[derive(Debug)]
pub struct FrameMap<'a> {
    pixels: Ref<'a, [u8]>,
}

impl Deref for FrameMap<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.pixels
    }
}
