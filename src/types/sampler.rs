//! Sampler descriptors.

use std::hash::{Hash, Hasher};

use ash::vk;

use super::CompareFunction;

/// Texture filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest-neighbor filtering.
    #[default]
    Nearest,
    /// Linear interpolation.
    Linear,
}

impl FilterMode {
    /// Convert to the Vulkan filter.
    pub fn to_vk(self) -> vk::Filter {
        match self {
            Self::Nearest => vk::Filter::NEAREST,
            Self::Linear => vk::Filter::LINEAR,
        }
    }

    /// Convert to the Vulkan mipmap filter mode.
    pub fn to_vk_mipmap(self) -> vk::SamplerMipmapMode {
        match self {
            Self::Nearest => vk::SamplerMipmapMode::NEAREST,
            Self::Linear => vk::SamplerMipmapMode::LINEAR,
        }
    }
}

/// Texture coordinate addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Clamp coordinates to the edge texel.
    #[default]
    ClampToEdge,
    /// Repeat the texture.
    Repeat,
    /// Repeat with mirroring.
    MirrorRepeat,
    /// Clamp to the border color.
    ClampToBorder,
}

impl AddressMode {
    /// Convert to the Vulkan address mode.
    pub fn to_vk(self) -> vk::SamplerAddressMode {
        match self {
            Self::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
            Self::Repeat => vk::SamplerAddressMode::REPEAT,
            Self::MirrorRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
            Self::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
        }
    }
}

/// Immutable sampler configuration.
///
/// Equality and hashing cover the full configuration so samplers can be
/// deduplicated by what they do rather than by handle identity. LOD clamp
/// floats are hashed through their bit patterns.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDesc {
    /// Debug label for the sampler.
    pub label: Option<String>,
    /// Address mode for the U coordinate.
    pub address_mode_u: AddressMode,
    /// Address mode for the V coordinate.
    pub address_mode_v: AddressMode,
    /// Address mode for the W coordinate.
    pub address_mode_w: AddressMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Mipmap filter.
    pub mipmap_filter: FilterMode,
    /// Minimum LOD clamp.
    pub lod_min_clamp: f32,
    /// Maximum LOD clamp.
    pub lod_max_clamp: f32,
    /// Comparison function for depth sampling.
    pub compare: Option<CompareFunction>,
    /// Maximum anisotropy level; 1 disables anisotropic filtering.
    pub anisotropy_clamp: u16,
}

impl Eq for SamplerDesc {}

impl Hash for SamplerDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label.hash(state);
        self.address_mode_u.hash(state);
        self.address_mode_v.hash(state);
        self.address_mode_w.hash(state);
        self.mag_filter.hash(state);
        self.min_filter.hash(state);
        self.mipmap_filter.hash(state);
        self.lod_min_clamp.to_bits().hash(state);
        self.lod_max_clamp.to_bits().hash(state);
        self.compare.hash(state);
        self.anisotropy_clamp.hash(state);
    }
}

impl SamplerDesc {
    /// Create a sampler descriptor with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a linear filtering sampler.
    pub fn linear() -> Self {
        Self {
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Linear,
            ..Default::default()
        }
    }

    /// Create a nearest-neighbor filtering sampler.
    pub fn nearest() -> Self {
        Self {
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            mipmap_filter: FilterMode::Nearest,
            ..Default::default()
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the address mode for all coordinates.
    pub fn with_address_mode(mut self, mode: AddressMode) -> Self {
        self.address_mode_u = mode;
        self.address_mode_v = mode;
        self.address_mode_w = mode;
        self
    }

    /// Set the comparison function for depth sampling.
    pub fn with_compare(mut self, compare: CompareFunction) -> Self {
        self.compare = Some(compare);
        self
    }

    /// Set the anisotropic filtering level.
    pub fn with_anisotropy(mut self, level: u16) -> Self {
        self.anisotropy_clamp = level;
        self
    }

    /// Build the Vulkan create info for this configuration.
    pub(crate) fn to_create_info(&self) -> vk::SamplerCreateInfo<'static> {
        vk::SamplerCreateInfo::default()
            .mag_filter(self.mag_filter.to_vk())
            .min_filter(self.min_filter.to_vk())
            .mipmap_mode(self.mipmap_filter.to_vk_mipmap())
            .address_mode_u(self.address_mode_u.to_vk())
            .address_mode_v(self.address_mode_v.to_vk())
            .address_mode_w(self.address_mode_w.to_vk())
            .mip_lod_bias(0.0)
            .anisotropy_enable(self.anisotropy_clamp > 1)
            .max_anisotropy(f32::from(self.anisotropy_clamp))
            .compare_enable(self.compare.is_some())
            .compare_op(
                self.compare
                    .map(CompareFunction::to_vk)
                    .unwrap_or(vk::CompareOp::ALWAYS),
            )
            .min_lod(self.lod_min_clamp)
            .max_lod(self.lod_max_clamp)
            .border_color(vk::BorderColor::FLOAT_TRANSPARENT_BLACK)
            .unnormalized_coordinates(false)
    }
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            label: None,
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            mipmap_filter: FilterMode::Nearest,
            lod_min_clamp: 0.0,
            lod_max_clamp: 32.0,
            compare: None,
            anisotropy_clamp: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(desc: &SamplerDesc) -> u64 {
        let mut hasher = DefaultHasher::new();
        desc.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equal_configuration_equal_hash() {
        let a = SamplerDesc::linear().with_address_mode(AddressMode::Repeat);
        let b = SamplerDesc::linear().with_address_mode(AddressMode::Repeat);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_different_configuration_not_equal() {
        let a = SamplerDesc::linear();
        let b = SamplerDesc::nearest();
        assert_ne!(a, b);
    }
}
