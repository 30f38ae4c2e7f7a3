//! Texture descriptors, formats, and usage flags.

use ash::vk;
use bitflags::bitflags;

use crate::error::GraphicsError;
use crate::layout::TextureLayout;

/// Texture format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TextureFormat {
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,
    /// 8-bit RG channels, unsigned normalized.
    Rg8Unorm,
    /// 16-bit red channel, float.
    R16Float,
    /// 32-bit red channel, float.
    R32Float,
    /// 32-bit red channel, unsigned integer.
    R32Uint,
    /// 16-bit RG channels, float.
    Rg16Float,
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// 8-bit BGRA channels, sRGB.
    Bgra8UnormSrgb,
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 32-bit RG channels, float.
    Rg32Float,
    /// 32-bit RGBA channels, float.
    Rgba32Float,
    /// 16-bit depth.
    Depth16Unorm,
    /// 24-bit depth with 8-bit stencil.
    Depth24UnormStencil8,
    /// 32-bit depth, float.
    Depth32Float,
    /// 32-bit depth float with 8-bit stencil.
    Depth32FloatStencil8,
}

impl TextureFormat {
    /// Returns true if this is a depth or stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        matches!(
            self,
            Self::Depth16Unorm
                | Self::Depth24UnormStencil8
                | Self::Depth32Float
                | Self::Depth32FloatStencil8
        )
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::Depth24UnormStencil8 | Self::Depth32FloatStencil8)
    }

    /// Returns the size in bytes per pixel.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::R8Unorm => 1,
            Self::Rg8Unorm | Self::R16Float | Self::Depth16Unorm => 2,
            Self::R32Float
            | Self::R32Uint
            | Self::Rg16Float
            | Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Bgra8Unorm
            | Self::Bgra8UnormSrgb
            | Self::Depth24UnormStencil8
            | Self::Depth32Float => 4,
            Self::Rgba16Float | Self::Rg32Float | Self::Depth32FloatStencil8 => 8,
            Self::Rgba32Float => 16,
        }
    }

    /// The image aspect this format exposes.
    pub fn aspect_mask(&self) -> vk::ImageAspectFlags {
        if self.is_depth_stencil() {
            if self.has_stencil() {
                vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
            } else {
                vk::ImageAspectFlags::DEPTH
            }
        } else {
            vk::ImageAspectFlags::COLOR
        }
    }

    /// Convert to the Vulkan format.
    pub fn to_vk(self) -> vk::Format {
        match self {
            Self::R8Unorm => vk::Format::R8_UNORM,
            Self::Rg8Unorm => vk::Format::R8G8_UNORM,
            Self::R16Float => vk::Format::R16_SFLOAT,
            Self::R32Float => vk::Format::R32_SFLOAT,
            Self::R32Uint => vk::Format::R32_UINT,
            Self::Rg16Float => vk::Format::R16G16_SFLOAT,
            Self::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
            Self::Rgba8UnormSrgb => vk::Format::R8G8B8A8_SRGB,
            Self::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
            Self::Bgra8UnormSrgb => vk::Format::B8G8R8A8_SRGB,
            Self::Rgba16Float => vk::Format::R16G16B16A16_SFLOAT,
            Self::Rg32Float => vk::Format::R32G32_SFLOAT,
            Self::Rgba32Float => vk::Format::R32G32B32A32_SFLOAT,
            Self::Depth16Unorm => vk::Format::D16_UNORM,
            Self::Depth24UnormStencil8 => vk::Format::D24_UNORM_S8_UINT,
            Self::Depth32Float => vk::Format::D32_SFLOAT,
            Self::Depth32FloatStencil8 => vk::Format::D32_SFLOAT_S8_UINT,
        }
    }
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be copied from.
        const COPY_SRC = 1 << 0;
        /// Texture can be copied to.
        const COPY_DST = 1 << 1;
        /// Texture can be sampled in a shader.
        const TEXTURE_BINDING = 1 << 2;
        /// Texture can be used as a storage texture.
        const STORAGE_BINDING = 1 << 3;
        /// Texture can be used as a render attachment.
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::empty()
    }
}

impl TextureUsage {
    /// Convert to Vulkan image usage flags.
    ///
    /// The format decides whether `RENDER_ATTACHMENT` maps to the color or
    /// the depth/stencil attachment bit.
    pub fn to_vk(self, format: TextureFormat) -> vk::ImageUsageFlags {
        let mut result = vk::ImageUsageFlags::empty();
        if self.contains(Self::COPY_SRC) {
            result |= vk::ImageUsageFlags::TRANSFER_SRC;
        }
        if self.contains(Self::COPY_DST) {
            result |= vk::ImageUsageFlags::TRANSFER_DST;
        }
        if self.contains(Self::TEXTURE_BINDING) {
            result |= vk::ImageUsageFlags::SAMPLED;
        }
        if self.contains(Self::STORAGE_BINDING) {
            result |= vk::ImageUsageFlags::STORAGE;
        }
        if self.contains(Self::RENDER_ATTACHMENT) {
            if format.is_depth_stencil() {
                result |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
            } else {
                result |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
            }
        }
        result
    }
}

/// Dimensionality of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    /// One-dimensional texture.
    D1,
    /// Two-dimensional texture.
    #[default]
    D2,
    /// Three-dimensional texture.
    D3,
    /// Cube map (six 2D faces).
    Cube,
}

/// Memory tiling of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureTiling {
    /// Implementation-defined optimal tiling.
    #[default]
    Optimal,
    /// Row-major linear tiling (required for direct host access).
    Linear,
}

impl TextureTiling {
    /// Convert to the Vulkan tiling enum.
    pub fn to_vk(self) -> vk::ImageTiling {
        match self {
            Self::Optimal => vk::ImageTiling::OPTIMAL,
            Self::Linear => vk::ImageTiling::LINEAR,
        }
    }
}

/// Queue-family sharing mode of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SharingMode {
    /// Owned by one queue family at a time.
    #[default]
    Exclusive,
    /// Usable from multiple queue families without ownership transfers.
    Concurrent,
}

impl SharingMode {
    /// Convert to the Vulkan sharing mode.
    pub fn to_vk(self) -> vk::SharingMode {
        match self {
            Self::Exclusive => vk::SharingMode::EXCLUSIVE,
            Self::Concurrent => vk::SharingMode::CONCURRENT,
        }
    }
}

/// Descriptor for creating a texture.
///
/// All dimension fields must be at least 1 and the sample count must be a
/// power of two no larger than 64; [`TextureDescriptor::validate`] enforces
/// this before any GPU object is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Depth in pixels (1 unless `dimension` is `D3`).
    pub depth: u32,
    /// Dimensionality.
    pub dimension: TextureDimension,
    /// Array layer count (6 for cube maps).
    pub array_layers: u32,
    /// Mip level count.
    pub mip_levels: u32,
    /// Sample count for multisampling (1, 2, 4, 8, 16, 32, or 64).
    pub sample_count: u32,
    /// Texture format.
    pub format: TextureFormat,
    /// Usage flags.
    pub usage: TextureUsage,
    /// Memory tiling.
    pub tiling: TextureTiling,
    /// Queue-family sharing mode.
    pub sharing: SharingMode,
    /// Layout the texture is transitioned to right after creation.
    /// `Undefined` leaves the image untouched until its first use.
    pub initial_layout: TextureLayout,
}

impl TextureDescriptor {
    /// Create a new 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            width,
            height,
            depth: 1,
            dimension: TextureDimension::D2,
            array_layers: 1,
            mip_levels: 1,
            sample_count: 1,
            format,
            usage,
            tiling: TextureTiling::Optimal,
            sharing: SharingMode::Exclusive,
            initial_layout: TextureLayout::Undefined,
        }
    }

    /// Descriptor for a sampleable color render target.
    pub fn render_target(width: u32, height: u32, format: TextureFormat) -> Self {
        let mut desc = Self::new_2d(
            width,
            height,
            format,
            TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_SRC,
        );
        desc.initial_layout = TextureLayout::ColorAttachment;
        desc
    }

    /// Descriptor for a depth/stencil buffer.
    pub fn depth_stencil(width: u32, height: u32, format: TextureFormat) -> Self {
        let mut desc = Self::new_2d(width, height, format, TextureUsage::RENDER_ATTACHMENT);
        desc.initial_layout = TextureLayout::DepthStencilAttachment;
        desc
    }

    /// Descriptor for a cube map with square faces.
    pub fn cube(size: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        let mut desc = Self::new_2d(size, size, format, usage);
        desc.dimension = TextureDimension::Cube;
        desc.array_layers = 6;
        desc
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the mip level count.
    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_levels = count;
        self
    }

    /// Set the sample count for multisampling.
    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }

    /// Set the layout the texture is transitioned to after creation.
    pub fn with_initial_layout(mut self, layout: TextureLayout) -> Self {
        self.initial_layout = layout;
        self
    }

    /// Check the descriptor invariants.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(GraphicsError::OutOfRange(format!(
                "texture dimensions must be at least 1, got {}x{}x{}",
                self.width, self.height, self.depth
            )));
        }
        if self.array_layers == 0 || self.mip_levels == 0 {
            return Err(GraphicsError::OutOfRange(
                "array layer and mip level counts must be at least 1".to_string(),
            ));
        }
        if self.dimension == TextureDimension::Cube && self.array_layers % 6 != 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "cube textures need a multiple of 6 array layers, got {}",
                self.array_layers
            )));
        }
        if !self.sample_count.is_power_of_two() || self.sample_count > 64 {
            return Err(GraphicsError::OutOfRange(format!(
                "sample count must be a power of two <= 64, got {}",
                self.sample_count
            )));
        }
        Ok(())
    }

    /// Vulkan sample count flag for this descriptor.
    pub(crate) fn vk_sample_count(&self) -> vk::SampleCountFlags {
        match self.sample_count {
            2 => vk::SampleCountFlags::TYPE_2,
            4 => vk::SampleCountFlags::TYPE_4,
            8 => vk::SampleCountFlags::TYPE_8,
            16 => vk::SampleCountFlags::TYPE_16,
            32 => vk::SampleCountFlags::TYPE_32,
            64 => vk::SampleCountFlags::TYPE_64,
            _ => vk::SampleCountFlags::TYPE_1,
        }
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self::new_2d(1, 1, TextureFormat::default(), TextureUsage::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_zero_dimension() {
        let desc = TextureDescriptor::new_2d(0, 512, TextureFormat::Rgba8Unorm, TextureUsage::empty());
        assert!(matches!(
            desc.validate(),
            Err(GraphicsError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_sample_count() {
        let desc = TextureDescriptor::new_2d(4, 4, TextureFormat::Rgba8Unorm, TextureUsage::empty())
            .with_sample_count(3);
        assert!(desc.validate().is_err());

        let desc = TextureDescriptor::new_2d(4, 4, TextureFormat::Rgba8Unorm, TextureUsage::empty())
            .with_sample_count(128);
        assert!(desc.validate().is_err());
    }

    #[test]
    fn test_cube_descriptor() {
        let desc = TextureDescriptor::cube(64, TextureFormat::Rgba8Unorm, TextureUsage::TEXTURE_BINDING);
        assert_eq!(desc.array_layers, 6);
        assert_eq!(desc.dimension, TextureDimension::Cube);
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn test_depth_format_aspect() {
        assert_eq!(
            TextureFormat::Depth32Float.aspect_mask(),
            vk::ImageAspectFlags::DEPTH
        );
        assert_eq!(
            TextureFormat::Depth24UnormStencil8.aspect_mask(),
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        );
        assert_eq!(
            TextureFormat::Rgba8Unorm.aspect_mask(),
            vk::ImageAspectFlags::COLOR
        );
    }

    #[test]
    fn test_render_attachment_usage_follows_format() {
        let color = TextureUsage::RENDER_ATTACHMENT.to_vk(TextureFormat::Rgba8Unorm);
        assert!(color.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));

        let depth = TextureUsage::RENDER_ATTACHMENT.to_vk(TextureFormat::Depth32Float);
        assert!(depth.contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT));
    }
}
