//! Blend states.

use ash::vk;
use bitflags::bitflags;

use super::StateCollection;

/// Blend factor for blending operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendFactor {
    /// 0.0
    #[default]
    Zero,
    /// 1.0
    One,
    /// Source color
    SrcColor,
    /// 1 - source color
    OneMinusSrcColor,
    /// Source alpha
    SrcAlpha,
    /// 1 - source alpha
    OneMinusSrcAlpha,
    /// Destination color
    DstColor,
    /// 1 - destination color
    OneMinusDstColor,
    /// Destination alpha
    DstAlpha,
    /// 1 - destination alpha
    OneMinusDstAlpha,
    /// min(source alpha, 1 - destination alpha)
    SrcAlphaSaturate,
}

impl BlendFactor {
    /// Convert to the Vulkan blend factor.
    pub fn to_vk(self) -> vk::BlendFactor {
        match self {
            Self::Zero => vk::BlendFactor::ZERO,
            Self::One => vk::BlendFactor::ONE,
            Self::SrcColor => vk::BlendFactor::SRC_COLOR,
            Self::OneMinusSrcColor => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
            Self::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
            Self::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
            Self::DstColor => vk::BlendFactor::DST_COLOR,
            Self::OneMinusDstColor => vk::BlendFactor::ONE_MINUS_DST_COLOR,
            Self::DstAlpha => vk::BlendFactor::DST_ALPHA,
            Self::OneMinusDstAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
            Self::SrcAlphaSaturate => vk::BlendFactor::SRC_ALPHA_SATURATE,
        }
    }
}

/// Blend operation for combining colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendOperation {
    /// source + destination
    #[default]
    Add,
    /// source - destination
    Subtract,
    /// destination - source
    ReverseSubtract,
    /// min(source, destination)
    Min,
    /// max(source, destination)
    Max,
}

impl BlendOperation {
    /// Convert to the Vulkan blend op.
    pub fn to_vk(self) -> vk::BlendOp {
        match self {
            Self::Add => vk::BlendOp::ADD,
            Self::Subtract => vk::BlendOp::SUBTRACT,
            Self::ReverseSubtract => vk::BlendOp::REVERSE_SUBTRACT,
            Self::Min => vk::BlendOp::MIN,
            Self::Max => vk::BlendOp::MAX,
        }
    }
}

/// Logical operation applied instead of blending when enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogicOp {
    /// Clear to zero.
    Clear,
    /// Pass source through unchanged.
    #[default]
    Copy,
    /// Keep the destination.
    NoOp,
    /// source XOR destination
    Xor,
    /// source OR destination
    Or,
    /// source AND destination
    And,
    /// Set all bits.
    Set,
}

impl LogicOp {
    /// Convert to the Vulkan logic op.
    pub fn to_vk(self) -> vk::LogicOp {
        match self {
            Self::Clear => vk::LogicOp::CLEAR,
            Self::Copy => vk::LogicOp::COPY,
            Self::NoOp => vk::LogicOp::NO_OP,
            Self::Xor => vk::LogicOp::XOR,
            Self::Or => vk::LogicOp::OR,
            Self::And => vk::LogicOp::AND,
            Self::Set => vk::LogicOp::SET,
        }
    }
}

bitflags! {
    /// Which color channels a blend attachment writes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWriteMask: u32 {
        /// Red channel.
        const RED = 1 << 0;
        /// Green channel.
        const GREEN = 1 << 1;
        /// Blue channel.
        const BLUE = 1 << 2;
        /// Alpha channel.
        const ALPHA = 1 << 3;
        /// All channels.
        const ALL = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}

impl Default for ColorWriteMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl ColorWriteMask {
    /// Convert to the Vulkan color component flags.
    pub fn to_vk(self) -> vk::ColorComponentFlags {
        let mut result = vk::ColorComponentFlags::empty();
        if self.contains(Self::RED) {
            result |= vk::ColorComponentFlags::R;
        }
        if self.contains(Self::GREEN) {
            result |= vk::ColorComponentFlags::G;
        }
        if self.contains(Self::BLUE) {
            result |= vk::ColorComponentFlags::B;
        }
        if self.contains(Self::ALPHA) {
            result |= vk::ColorComponentFlags::A;
        }
        result
    }
}

/// Per-attachment blend configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetBlend {
    /// Whether blending is enabled for this attachment.
    pub blend_enable: bool,
    /// Source factor for the color components.
    pub src_color_factor: BlendFactor,
    /// Destination factor for the color components.
    pub dst_color_factor: BlendFactor,
    /// Operation combining the color components.
    pub color_op: BlendOperation,
    /// Source factor for alpha.
    pub src_alpha_factor: BlendFactor,
    /// Destination factor for alpha.
    pub dst_alpha_factor: BlendFactor,
    /// Operation combining alpha.
    pub alpha_op: BlendOperation,
    /// Channels written to the attachment.
    pub write_mask: ColorWriteMask,
}

impl Default for RenderTargetBlend {
    fn default() -> Self {
        Self {
            blend_enable: false,
            src_color_factor: BlendFactor::One,
            dst_color_factor: BlendFactor::Zero,
            color_op: BlendOperation::Add,
            src_alpha_factor: BlendFactor::One,
            dst_alpha_factor: BlendFactor::Zero,
            alpha_op: BlendOperation::Add,
            write_mask: ColorWriteMask::ALL,
        }
    }
}

/// Immutable blend state for a single color attachment.
///
/// Equality and hashing cover every field, so two states with the same
/// configuration compare equal regardless of where they came from. This is
/// the property pipeline caches key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlendState {
    /// Whether the logical operation replaces blending.
    pub logic_op_enable: bool,
    /// Logical operation used when enabled.
    pub logic_op: LogicOp,
    /// The single color-attachment configuration.
    pub render_target: RenderTargetBlend,
}

impl BlendState {
    /// Opaque blending: source replaces destination, (One, Zero).
    pub fn opaque() -> Self {
        Self::default()
    }

    /// Standard alpha blending, (SrcAlpha, OneMinusSrcAlpha).
    pub fn alpha_blend() -> Self {
        Self {
            render_target: RenderTargetBlend {
                blend_enable: true,
                src_color_factor: BlendFactor::SrcAlpha,
                dst_color_factor: BlendFactor::OneMinusSrcAlpha,
                src_alpha_factor: BlendFactor::SrcAlpha,
                dst_alpha_factor: BlendFactor::OneMinusSrcAlpha,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Additive blending, (SrcAlpha, One).
    pub fn additive() -> Self {
        Self {
            render_target: RenderTargetBlend {
                blend_enable: true,
                src_color_factor: BlendFactor::SrcAlpha,
                dst_color_factor: BlendFactor::One,
                src_alpha_factor: BlendFactor::SrcAlpha,
                dst_alpha_factor: BlendFactor::One,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Premultiplied alpha blending, (One, OneMinusSrcAlpha).
    pub fn premultiplied() -> Self {
        Self {
            render_target: RenderTargetBlend {
                blend_enable: true,
                src_color_factor: BlendFactor::One,
                dst_color_factor: BlendFactor::OneMinusSrcAlpha,
                src_alpha_factor: BlendFactor::One,
                dst_alpha_factor: BlendFactor::OneMinusSrcAlpha,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Build the Vulkan per-attachment blend state.
    pub fn to_vk_attachment(&self) -> vk::PipelineColorBlendAttachmentState {
        vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(self.render_target.blend_enable)
            .src_color_blend_factor(self.render_target.src_color_factor.to_vk())
            .dst_color_blend_factor(self.render_target.dst_color_factor.to_vk())
            .color_blend_op(self.render_target.color_op.to_vk())
            .src_alpha_blend_factor(self.render_target.src_alpha_factor.to_vk())
            .dst_alpha_blend_factor(self.render_target.dst_alpha_factor.to_vk())
            .alpha_blend_op(self.render_target.alpha_op.to_vk())
            .color_write_mask(self.render_target.write_mask.to_vk())
    }
}

/// Build the canonical blend state collection.
pub fn built_in_blend_states() -> StateCollection<BlendState> {
    StateCollection::new(vec![
        ("Opaque", BlendState::opaque()),
        ("AlphaBlend", BlendState::alpha_blend()),
        ("Additive", BlendState::additive()),
        ("Premultiplied", BlendState::premultiplied()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_state() {
        let states = built_in_blend_states();
        let opaque = states.get("Opaque").unwrap();

        assert!(!opaque.logic_op_enable);
        assert!(!opaque.render_target.blend_enable);
        assert_eq!(opaque.render_target.src_color_factor, BlendFactor::One);
        assert_eq!(opaque.render_target.dst_color_factor, BlendFactor::Zero);
    }

    #[test]
    fn test_alpha_blend_state() {
        let states = built_in_blend_states();
        let alpha = states.get("AlphaBlend").unwrap();

        assert!(alpha.render_target.blend_enable);
        assert_eq!(alpha.render_target.src_color_factor, BlendFactor::SrcAlpha);
        assert_eq!(
            alpha.render_target.dst_color_factor,
            BlendFactor::OneMinusSrcAlpha
        );
    }

    #[test]
    fn test_equal_configuration_equal_value() {
        assert_eq!(BlendState::alpha_blend(), BlendState::alpha_blend());
        assert_ne!(BlendState::alpha_blend(), BlendState::additive());
    }

    #[test]
    fn test_to_vk_attachment() {
        let attachment = BlendState::additive().to_vk_attachment();
        assert_eq!(attachment.blend_enable, vk::TRUE);
        assert_eq!(attachment.src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);
        assert_eq!(attachment.dst_color_blend_factor, vk::BlendFactor::ONE);
    }

    #[test]
    fn test_collection_order() {
        let states = built_in_blend_states();
        assert_eq!(states.index_of("Opaque"), Some(0));
        assert_eq!(states.get_index(0), Some(BlendState::opaque()));
        assert_eq!(states.len(), 4);
    }
}
