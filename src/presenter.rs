//! Per-frame presentation targets.
//!
//! The [`Presenter`] owns the back-buffer/depth-buffer pair and the
//! viewport for one render surface. The windowing layer is an external
//! collaborator: it delivers resize events as plain pixel dimensions and
//! consumes the back buffer for presentation.

use std::sync::Arc;

use crate::device::{DeviceShared, RenderDevice};
use crate::error::GraphicsError;
use crate::resources::Texture;
use crate::types::{ScissorRect, TextureDescriptor, TextureFormat, Viewport};

/// Back buffer, depth buffer, and viewport for one render surface.
pub struct Presenter {
    shared: Arc<DeviceShared>,
    back_buffer: Texture,
    depth_buffer: Texture,
    viewport: Viewport,
    scissor: ScissorRect,
    color_format: TextureFormat,
    depth_format: TextureFormat,
}

impl Presenter {
    /// Create presentation targets at the given size.
    pub fn new(
        device: &RenderDevice,
        width: u32,
        height: u32,
        color_format: TextureFormat,
        depth_format: TextureFormat,
    ) -> Result<Self, GraphicsError> {
        if !depth_format.is_depth_stencil() {
            return Err(GraphicsError::InvalidParameter(format!(
                "{depth_format:?} is not a depth/stencil format"
            )));
        }

        let width = width.max(1);
        let height = height.max(1);
        let shared = Arc::clone(device.shared());

        let (back_buffer, depth_buffer) =
            Self::create_targets(&shared, width, height, color_format, depth_format)?;

        Ok(Self {
            shared,
            back_buffer,
            depth_buffer,
            viewport: Viewport::from_dimensions(width, height),
            scissor: ScissorRect::from_dimensions(width, height),
            color_format,
            depth_format,
        })
    }

    fn create_targets(
        shared: &Arc<DeviceShared>,
        width: u32,
        height: u32,
        color_format: TextureFormat,
        depth_format: TextureFormat,
    ) -> Result<(Texture, Texture), GraphicsError> {
        let back_buffer = Texture::create(
            Arc::clone(shared),
            &TextureDescriptor::render_target(width, height, color_format)
                .with_label("back buffer"),
        )?;
        let depth_buffer = Texture::create(
            Arc::clone(shared),
            &TextureDescriptor::depth_stencil(width, height, depth_format)
                .with_label("depth buffer"),
        )?;
        Ok((back_buffer, depth_buffer))
    }

    /// Get the back buffer.
    pub fn back_buffer(&self) -> &Texture {
        &self.back_buffer
    }

    /// Get the depth buffer.
    pub fn depth_buffer(&self) -> &Texture {
        &self.depth_buffer
    }

    /// Get the current viewport.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Get the current scissor rectangle.
    pub fn scissor(&self) -> ScissorRect {
        self.scissor
    }

    /// Current back-buffer width in pixels.
    pub fn width(&self) -> u32 {
        self.back_buffer.width()
    }

    /// Current back-buffer height in pixels.
    pub fn height(&self) -> u32 {
        self.back_buffer.height()
    }

    /// Recreate the targets at a new size.
    ///
    /// Dimensions are clamped to at least 1 (windows minimize to 0x0).
    /// Firing order is fixed: `DeviceChangeBegin`, wait for the device to
    /// go idle, destroy and recreate both buffers, `DeviceChangeEnd`.
    /// A resize to the current size does nothing.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), GraphicsError> {
        let width = width.max(1);
        let height = height.max(1);
        if width == self.width() && height == self.height() {
            return Ok(());
        }

        self.shared.events().fire_change_begin();
        self.shared.wait_idle()?;

        // Create the new targets before releasing the old pair so a failed
        // resize leaves the presenter with usable buffers.
        let (back_buffer, depth_buffer) = Self::create_targets(
            &self.shared,
            width,
            height,
            self.color_format,
            self.depth_format,
        )?;
        self.back_buffer.destroy();
        self.depth_buffer.destroy();
        self.back_buffer = back_buffer;
        self.depth_buffer = depth_buffer;
        self.viewport = Viewport::from_dimensions(width, height);
        self.scissor = ScissorRect::from_dimensions(width, height);

        self.shared.events().fire_change_end();
        log::debug!("presenter resized to {width}x{height}");
        Ok(())
    }
}

impl std::fmt::Debug for Presenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presenter")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("color_format", &self.color_format)
            .field("depth_format", &self.depth_format)
            .finish()
    }
}
