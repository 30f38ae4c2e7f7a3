//! GPU texture resource with tracked image layout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ash::vk;
use parking_lot::Mutex;

use crate::device::DeviceShared;
use crate::error::GraphicsError;
use crate::layout::{record_transition, transition_masks, TextureLayout};
use crate::memory;
use crate::resources::Buffer;
use crate::types::{
    BufferDescriptor, Extent3d, TextureDescriptor, TextureDimension, TextureFormat, TextureUsage,
};

/// A GPU texture with its own memory allocation and image view.
///
/// The texture tracks the image layout it is currently in; every operation
/// that needs a specific layout transitions through
/// [`Texture::transition_layout`] or records its barriers inline, and the
/// tracked state is updated as each barrier is recorded so it always
/// matches what the command stream will execute.
pub struct Texture {
    shared: Arc<DeviceShared>,
    id: u64,
    image: vk::Image,
    view: vk::ImageView,
    memory: vk::DeviceMemory,
    descriptor: TextureDescriptor,
    aspect_mask: vk::ImageAspectFlags,
    layout: Mutex<TextureLayout>,
    destroyed: AtomicBool,
}

impl Texture {
    /// Create a new texture (called by `RenderDevice::create_texture`).
    pub(crate) fn create(
        shared: Arc<DeviceShared>,
        descriptor: &TextureDescriptor,
    ) -> Result<Self, GraphicsError> {
        descriptor.validate()?;

        let device = shared.raw();
        let format = descriptor.format.to_vk();

        let (image_type, extent, array_layers, flags) = match descriptor.dimension {
            TextureDimension::D1 => (
                vk::ImageType::TYPE_1D,
                vk::Extent3D {
                    width: descriptor.width,
                    height: 1,
                    depth: 1,
                },
                descriptor.array_layers,
                vk::ImageCreateFlags::empty(),
            ),
            TextureDimension::D2 => (
                vk::ImageType::TYPE_2D,
                vk::Extent3D {
                    width: descriptor.width,
                    height: descriptor.height,
                    depth: 1,
                },
                descriptor.array_layers,
                vk::ImageCreateFlags::empty(),
            ),
            TextureDimension::D3 => (
                vk::ImageType::TYPE_3D,
                vk::Extent3D {
                    width: descriptor.width,
                    height: descriptor.height,
                    depth: descriptor.depth,
                },
                1,
                vk::ImageCreateFlags::empty(),
            ),
            TextureDimension::Cube => (
                vk::ImageType::TYPE_2D,
                vk::Extent3D {
                    width: descriptor.width,
                    height: descriptor.height,
                    depth: 1,
                },
                descriptor.array_layers,
                vk::ImageCreateFlags::CUBE_COMPATIBLE,
            ),
        };

        let image_info = vk::ImageCreateInfo::default()
            .flags(flags)
            .image_type(image_type)
            .format(format)
            .extent(extent)
            .mip_levels(descriptor.mip_levels)
            .array_layers(array_layers)
            .samples(descriptor.vk_sample_count())
            .tiling(descriptor.tiling.to_vk())
            .usage(descriptor.usage.to_vk(descriptor.format))
            .sharing_mode(descriptor.sharing.to_vk())
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { device.create_image(&image_info, None) }
            .map_err(|e| GraphicsError::from_alloc(e, "image creation"))?;

        let requirements = unsafe { device.get_image_memory_requirements(image) };

        let allocation = memory::allocate(
            device,
            shared.memory_properties(),
            requirements,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        );
        let allocation = match allocation {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(e);
            }
        };

        if let Err(e) = unsafe { device.bind_image_memory(image, allocation, 0) } {
            unsafe {
                device.destroy_image(image, None);
                device.free_memory(allocation, None);
            }
            return Err(GraphicsError::from_alloc(e, "image memory bind"));
        }

        let aspect_mask = descriptor.format.aspect_mask();

        let (view_type, layer_count) = match descriptor.dimension {
            TextureDimension::D1 if array_layers > 1 => {
                (vk::ImageViewType::TYPE_1D_ARRAY, array_layers)
            }
            TextureDimension::D1 => (vk::ImageViewType::TYPE_1D, 1),
            TextureDimension::D2 if array_layers > 1 => {
                (vk::ImageViewType::TYPE_2D_ARRAY, array_layers)
            }
            TextureDimension::D2 => (vk::ImageViewType::TYPE_2D, 1),
            TextureDimension::D3 => (vk::ImageViewType::TYPE_3D, 1),
            TextureDimension::Cube if array_layers > 6 => {
                (vk::ImageViewType::CUBE_ARRAY, array_layers)
            }
            TextureDimension::Cube => (vk::ImageViewType::CUBE, 6),
        };

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(view_type)
            .format(format)
            .components(vk::ComponentMapping::default())
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: descriptor.mip_levels,
                base_array_layer: 0,
                layer_count,
            });

        let view = match unsafe { device.create_image_view(&view_info, None) } {
            Ok(view) => view,
            Err(e) => {
                unsafe {
                    device.destroy_image(image, None);
                    device.free_memory(allocation, None);
                }
                return Err(GraphicsError::from_alloc(e, "image view creation"));
            }
        };

        let id = shared.register_resource("texture");
        log::trace!(
            "created texture #{id} {:?}, {}x{}",
            descriptor.label,
            descriptor.width,
            descriptor.height
        );

        let texture = Self {
            shared,
            id,
            image,
            view,
            memory: allocation,
            descriptor: descriptor.clone(),
            aspect_mask,
            layout: Mutex::new(TextureLayout::Undefined),
            destroyed: AtomicBool::new(false),
        };

        if descriptor.initial_layout != TextureLayout::Undefined {
            texture.transition_layout(descriptor.initial_layout)?;
        }

        Ok(texture)
    }

    /// Get the texture width.
    pub fn width(&self) -> u32 {
        self.descriptor.width
    }

    /// Get the texture height.
    pub fn height(&self) -> u32 {
        self.descriptor.height
    }

    /// Get the texture depth.
    pub fn depth(&self) -> u32 {
        self.descriptor.depth
    }

    /// Get the texture size as an extent.
    pub fn size(&self) -> Extent3d {
        Extent3d::new_3d(
            self.descriptor.width,
            self.descriptor.height,
            self.descriptor.depth,
        )
    }

    /// Get the texture format.
    pub fn format(&self) -> TextureFormat {
        self.descriptor.format
    }

    /// Get the mip level count.
    pub fn mip_levels(&self) -> u32 {
        self.descriptor.mip_levels
    }

    /// Get the array layer count.
    pub fn array_layers(&self) -> u32 {
        self.descriptor.array_layers
    }

    /// Get the sample count.
    pub fn sample_count(&self) -> u32 {
        self.descriptor.sample_count
    }

    /// Get the full descriptor.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    /// Get the texture label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Get the image layout the texture is currently in.
    pub fn layout(&self) -> TextureLayout {
        *self.layout.lock()
    }

    /// Get the raw Vulkan image handle.
    pub fn raw_image(&self) -> vk::Image {
        self.image
    }

    /// Get the raw Vulkan image view handle.
    pub fn raw_view(&self) -> vk::ImageView {
        self.view
    }

    /// Get the image aspect mask.
    pub fn aspect_mask(&self) -> vk::ImageAspectFlags {
        self.aspect_mask
    }

    /// Get the owning device core.
    pub fn device(&self) -> &Arc<DeviceShared> {
        &self.shared
    }

    fn ensure_alive(&self) -> Result<(), GraphicsError> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(GraphicsError::InvalidOperation(
                "texture has been destroyed".to_string(),
            ));
        }
        Ok(())
    }

    /// Bytes in a full mip-0 upload of every array layer.
    fn upload_size(&self) -> u64 {
        u64::from(self.descriptor.width)
            * u64::from(self.descriptor.height)
            * u64::from(self.descriptor.depth)
            * u64::from(self.descriptor.array_layers)
            * u64::from(self.descriptor.format.block_size())
    }

    /// Transition the image to `new_layout`.
    ///
    /// A transition to the current layout is a no-op and records nothing;
    /// validation layers flag needless barriers. The barrier runs in its
    /// own single-use command buffer and has executed by the time this
    /// returns.
    pub fn transition_layout(&self, new_layout: TextureLayout) -> Result<(), GraphicsError> {
        self.ensure_alive()?;

        let mut current = self.layout.lock();
        if *current == new_layout {
            return Ok(());
        }
        // Validate the pair before allocating a command buffer.
        transition_masks(*current, new_layout)?;

        let cmd = self.shared.begin_single_time_commands()?;
        record_transition(
            self.shared.raw(),
            cmd,
            self.image,
            self.aspect_mask,
            *current,
            new_layout,
        )?;
        *current = new_layout;
        self.shared.end_single_time_commands(cmd)
    }

    /// Upload pixel data for mip level 0 of every array layer.
    ///
    /// Runs through a staging buffer and one single-use command buffer:
    /// transition to `TransferDst`, copy, transition to the final layout.
    /// The final layout is `ShaderReadOnly` for sampleable textures,
    /// otherwise the layout the texture was in before the upload.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::OutOfRange`] when `data` does not match the
    /// texture's size exactly; [`GraphicsError::InvalidOperation`] when the
    /// texture was created without `COPY_DST` usage.
    pub fn set_data(&self, data: &[u8]) -> Result<(), GraphicsError> {
        self.ensure_alive()?;

        let expected = self.upload_size();
        if data.len() as u64 != expected {
            return Err(GraphicsError::OutOfRange(format!(
                "texture upload expects {expected} bytes, got {}",
                data.len()
            )));
        }
        if !self.descriptor.usage.contains(TextureUsage::COPY_DST) {
            return Err(GraphicsError::InvalidOperation(
                "texture was created without COPY_DST usage".to_string(),
            ));
        }

        let mut current = self.layout.lock();
        let before = *current;
        let target = if self.descriptor.usage.contains(TextureUsage::TEXTURE_BINDING) {
            TextureLayout::ShaderReadOnly
        } else if before != TextureLayout::Undefined {
            before
        } else {
            TextureLayout::TransferDst
        };

        // Validate both transitions before any GPU object is created.
        if before != TextureLayout::TransferDst {
            transition_masks(before, TextureLayout::TransferDst)?;
        }
        if target != TextureLayout::TransferDst {
            transition_masks(TextureLayout::TransferDst, target)?;
        }

        let staging = Buffer::create(
            Arc::clone(&self.shared),
            &BufferDescriptor::staging(expected).with_label("texture upload"),
        )?;
        staging.set_data(0, data)?;

        let device = self.shared.raw();
        let cmd = self.shared.begin_single_time_commands()?;

        record_transition(
            device,
            cmd,
            self.image,
            self.aspect_mask,
            *current,
            TextureLayout::TransferDst,
        )?;
        *current = TextureLayout::TransferDst;

        let region = vk::BufferImageCopy::default()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: self.aspect_mask,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: self.descriptor.array_layers,
            })
            .image_offset(vk::Offset3D::default())
            .image_extent(vk::Extent3D {
                width: self.descriptor.width,
                height: self.descriptor.height,
                depth: self.descriptor.depth,
            });

        unsafe {
            device.cmd_copy_buffer_to_image(
                cmd,
                staging.raw(),
                self.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }

        record_transition(
            device,
            cmd,
            self.image,
            self.aspect_mask,
            *current,
            target,
        )?;
        *current = target;

        self.shared.end_single_time_commands(cmd)?;
        staging.destroy();
        Ok(())
    }

    /// Copy the full contents of `source` into this texture.
    ///
    /// Records one single-use command buffer with the barriers in a fixed
    /// order: source to `TransferSrc`, destination to `TransferDst`, the
    /// copy, source back to the layout it came from, destination to
    /// `ShaderReadOnly`. The copy must not run before both lead-in barriers
    /// are recorded, so the ordering here is load-bearing.
    pub fn copy_from(&self, source: &Texture) -> Result<(), GraphicsError> {
        self.ensure_alive()?;
        source.ensure_alive()?;

        if std::ptr::eq(self, source) {
            return Err(GraphicsError::InvalidParameter(
                "cannot copy a texture onto itself".to_string(),
            ));
        }
        if self.descriptor.format != source.descriptor.format
            || self.descriptor.width != source.descriptor.width
            || self.descriptor.height != source.descriptor.height
            || self.descriptor.depth != source.descriptor.depth
            || self.descriptor.array_layers != source.descriptor.array_layers
        {
            return Err(GraphicsError::InvalidParameter(
                "copy requires matching formats and dimensions".to_string(),
            ));
        }
        if !source.descriptor.usage.contains(TextureUsage::COPY_SRC) {
            return Err(GraphicsError::InvalidOperation(
                "source texture was created without COPY_SRC usage".to_string(),
            ));
        }
        if !self.descriptor.usage.contains(TextureUsage::COPY_DST) {
            return Err(GraphicsError::InvalidOperation(
                "destination texture was created without COPY_DST usage".to_string(),
            ));
        }

        let mut src_layout = source.layout.lock();
        let mut dst_layout = self.layout.lock();

        let src_before = *src_layout;
        let dst_before = *dst_layout;

        if src_before == TextureLayout::Undefined {
            return Err(GraphicsError::InvalidOperation(
                "source texture contents are undefined".to_string(),
            ));
        }

        // Validate all four transitions before recording anything.
        if src_before != TextureLayout::TransferSrc {
            transition_masks(src_before, TextureLayout::TransferSrc)?;
            transition_masks(TextureLayout::TransferSrc, src_before)?;
        }
        if dst_before != TextureLayout::TransferDst {
            transition_masks(dst_before, TextureLayout::TransferDst)?;
        }
        transition_masks(TextureLayout::TransferDst, TextureLayout::ShaderReadOnly)?;

        let device = self.shared.raw();
        let cmd = self.shared.begin_single_time_commands()?;

        record_transition(
            device,
            cmd,
            source.image,
            source.aspect_mask,
            *src_layout,
            TextureLayout::TransferSrc,
        )?;
        *src_layout = TextureLayout::TransferSrc;

        record_transition(
            device,
            cmd,
            self.image,
            self.aspect_mask,
            *dst_layout,
            TextureLayout::TransferDst,
        )?;
        *dst_layout = TextureLayout::TransferDst;

        let region = vk::ImageCopy::default()
            .src_subresource(vk::ImageSubresourceLayers {
                aspect_mask: source.aspect_mask,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: source.descriptor.array_layers,
            })
            .dst_subresource(vk::ImageSubresourceLayers {
                aspect_mask: self.aspect_mask,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: self.descriptor.array_layers,
            })
            .extent(vk::Extent3D {
                width: self.descriptor.width,
                height: self.descriptor.height,
                depth: self.descriptor.depth,
            });

        unsafe {
            device.cmd_copy_image(
                cmd,
                source.image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                self.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }

        record_transition(
            device,
            cmd,
            source.image,
            source.aspect_mask,
            *src_layout,
            src_before,
        )?;
        *src_layout = src_before;

        record_transition(
            device,
            cmd,
            self.image,
            self.aspect_mask,
            *dst_layout,
            TextureLayout::ShaderReadOnly,
        )?;
        *dst_layout = TextureLayout::ShaderReadOnly;

        self.shared.end_single_time_commands(cmd)
    }

    /// Read back the full mip-0 contents of every array layer.
    ///
    /// The texture is transitioned to `TransferSrc` for the copy and back
    /// to its prior layout afterwards.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::InvalidOperation`] when the texture was never
    /// written (still in `Undefined`) or lacks `COPY_SRC` usage.
    pub fn read_data(&self) -> Result<Vec<u8>, GraphicsError> {
        self.ensure_alive()?;

        if !self.descriptor.usage.contains(TextureUsage::COPY_SRC) {
            return Err(GraphicsError::InvalidOperation(
                "texture was created without COPY_SRC usage".to_string(),
            ));
        }

        let mut current = self.layout.lock();
        let before = *current;
        if before == TextureLayout::Undefined {
            return Err(GraphicsError::InvalidOperation(
                "texture contents are undefined; it was never written".to_string(),
            ));
        }

        if before != TextureLayout::TransferSrc {
            transition_masks(before, TextureLayout::TransferSrc)?;
            transition_masks(TextureLayout::TransferSrc, before)?;
        }

        let size = self.upload_size();
        let staging = Buffer::create(
            Arc::clone(&self.shared),
            &BufferDescriptor::readback(size).with_label("texture readback"),
        )?;

        let device = self.shared.raw();
        let cmd = self.shared.begin_single_time_commands()?;

        record_transition(
            device,
            cmd,
            self.image,
            self.aspect_mask,
            *current,
            TextureLayout::TransferSrc,
        )?;
        *current = TextureLayout::TransferSrc;

        let region = vk::BufferImageCopy::default()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: self.aspect_mask,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: self.descriptor.array_layers,
            })
            .image_offset(vk::Offset3D::default())
            .image_extent(vk::Extent3D {
                width: self.descriptor.width,
                height: self.descriptor.height,
                depth: self.descriptor.depth,
            });

        unsafe {
            device.cmd_copy_image_to_buffer(
                cmd,
                self.image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                staging.raw(),
                &[region],
            );
        }

        record_transition(
            device,
            cmd,
            self.image,
            self.aspect_mask,
            *current,
            before,
        )?;
        *current = before;

        self.shared.end_single_time_commands(cmd)?;

        let result = staging.get_data(0, size)?;
        staging.destroy();
        Ok(result)
    }

    /// Destroy the texture and free its memory. Calling this twice is a
    /// no-op.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }

        unsafe {
            self.shared.raw().destroy_image_view(self.view, None);
            self.shared.raw().destroy_image(self.image, None);
            self.shared.raw().free_memory(self.memory, None);
        }

        self.shared.unregister_resource(self.id);
        log::trace!("destroyed texture #{}", self.id);
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("width", &self.descriptor.width)
            .field("height", &self.descriptor.height)
            .field("format", &self.descriptor.format)
            .field("layout", &self.layout())
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(Texture: Send, Sync);
