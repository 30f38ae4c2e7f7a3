//! Image layout states and the barrier transition table.
//!
//! Every texture tracks the layout its image is currently in. Before any
//! GPU operation that needs a specific layout, the texture is transitioned
//! through a pipeline barrier whose access masks and stages come from a
//! fixed per-pair table. The table covers only transitions that make sense
//! for the resource roles this crate creates; an unknown pair is an error
//! rather than a catch-all full barrier, so that a missing entry shows up
//! during development instead of hiding as a pipeline stall.

use ash::vk;

use crate::error::GraphicsError;

/// Image layout states a texture can be in.
///
/// These correspond to `VkImageLayout` values. A freshly created image is
/// always in `Undefined`; there is no terminal state and layouts may cycle
/// for the lifetime of the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureLayout {
    /// Initial state, contents undefined. Can transition to any layout.
    #[default]
    Undefined,
    /// General layout (least optimal but most flexible; storage images).
    General,
    /// Optimal for color attachment writes.
    ColorAttachment,
    /// Optimal for depth/stencil attachment writes.
    DepthStencilAttachment,
    /// Optimal for depth read-only (sampling + depth testing).
    DepthStencilReadOnly,
    /// Optimal for shader sampling.
    ShaderReadOnly,
    /// Optimal for transfer source operations.
    TransferSrc,
    /// Optimal for transfer destination operations.
    TransferDst,
    /// Ready for presentation.
    PresentSrc,
}

impl TextureLayout {
    /// Convert to the Vulkan image layout.
    pub fn to_vk(self) -> vk::ImageLayout {
        match self {
            Self::Undefined => vk::ImageLayout::UNDEFINED,
            Self::General => vk::ImageLayout::GENERAL,
            Self::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            Self::DepthStencilAttachment => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            Self::DepthStencilReadOnly => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
            Self::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            Self::TransferSrc => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            Self::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            Self::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
        }
    }

    /// Access mask for work that ran while the image was in this layout.
    fn src_access_mask(self) -> vk::AccessFlags {
        match self {
            Self::Undefined => vk::AccessFlags::empty(),
            Self::General => vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
            Self::ColorAttachment => vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            Self::DepthStencilAttachment => vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            Self::DepthStencilReadOnly => vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
            Self::ShaderReadOnly => vk::AccessFlags::SHADER_READ,
            Self::TransferSrc => vk::AccessFlags::TRANSFER_READ,
            Self::TransferDst => vk::AccessFlags::TRANSFER_WRITE,
            Self::PresentSrc => vk::AccessFlags::empty(),
        }
    }

    /// Access mask for work that will run once the image is in this layout.
    fn dst_access_mask(self) -> vk::AccessFlags {
        match self {
            Self::Undefined => vk::AccessFlags::empty(),
            Self::General => vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
            Self::ColorAttachment => vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            Self::DepthStencilAttachment => vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            Self::DepthStencilReadOnly => vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
            Self::ShaderReadOnly => vk::AccessFlags::SHADER_READ,
            Self::TransferSrc => vk::AccessFlags::TRANSFER_READ,
            Self::TransferDst => vk::AccessFlags::TRANSFER_WRITE,
            Self::PresentSrc => vk::AccessFlags::empty(),
        }
    }

    /// Pipeline stage that produced the contents in this layout.
    fn src_stage(self) -> vk::PipelineStageFlags {
        match self {
            Self::Undefined => vk::PipelineStageFlags::TOP_OF_PIPE,
            Self::General => vk::PipelineStageFlags::COMPUTE_SHADER,
            Self::ColorAttachment => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            Self::DepthStencilAttachment => vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
            Self::DepthStencilReadOnly => vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            Self::ShaderReadOnly => vk::PipelineStageFlags::FRAGMENT_SHADER,
            Self::TransferSrc => vk::PipelineStageFlags::TRANSFER,
            Self::TransferDst => vk::PipelineStageFlags::TRANSFER,
            Self::PresentSrc => vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        }
    }

    /// Pipeline stage that will consume the contents in this layout.
    fn dst_stage(self) -> vk::PipelineStageFlags {
        match self {
            Self::Undefined => vk::PipelineStageFlags::TOP_OF_PIPE,
            Self::General => vk::PipelineStageFlags::COMPUTE_SHADER,
            Self::ColorAttachment => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            Self::DepthStencilAttachment => vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            Self::DepthStencilReadOnly => vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            Self::ShaderReadOnly => vk::PipelineStageFlags::FRAGMENT_SHADER,
            Self::TransferSrc => vk::PipelineStageFlags::TRANSFER,
            Self::TransferDst => vk::PipelineStageFlags::TRANSFER,
            Self::PresentSrc => vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        }
    }

    /// Check if this is a depth/stencil layout.
    pub fn is_depth_stencil(self) -> bool {
        matches!(
            self,
            Self::DepthStencilAttachment | Self::DepthStencilReadOnly
        )
    }
}

/// Access masks and pipeline stages for one layout transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierMasks {
    /// Accesses that must complete before the transition.
    pub src_access: vk::AccessFlags,
    /// Accesses that wait for the transition.
    pub dst_access: vk::AccessFlags,
    /// Stage producing the old contents.
    pub src_stage: vk::PipelineStageFlags,
    /// Stage consuming the new contents.
    pub dst_stage: vk::PipelineStageFlags,
}

/// Whether a transition between two distinct layouts is in the table.
fn is_supported(from: TextureLayout, to: TextureLayout) -> bool {
    use TextureLayout::*;
    match (from, to) {
        // Nothing transitions back to Undefined.
        (_, Undefined) => false,
        // A fresh image can move to any concrete layout.
        (Undefined, _) => true,
        (ColorAttachment, ShaderReadOnly | TransferSrc | TransferDst | PresentSrc) => true,
        (DepthStencilAttachment, ShaderReadOnly | DepthStencilReadOnly | TransferSrc) => true,
        (DepthStencilReadOnly, DepthStencilAttachment | ShaderReadOnly | TransferSrc) => true,
        (ShaderReadOnly, ColorAttachment | DepthStencilAttachment | TransferSrc | TransferDst) => {
            true
        }
        (
            TransferSrc,
            ShaderReadOnly | ColorAttachment | DepthStencilAttachment | DepthStencilReadOnly
            | TransferDst | PresentSrc | General,
        ) => true,
        (
            TransferDst,
            ShaderReadOnly | ColorAttachment | DepthStencilAttachment | DepthStencilReadOnly
            | TransferSrc | PresentSrc | General,
        ) => true,
        (PresentSrc, ColorAttachment | TransferSrc | TransferDst) => true,
        (General, ShaderReadOnly | TransferSrc | TransferDst) => true,
        _ => false,
    }
}

/// Look up the barrier parameters for a layout transition.
///
/// The table returns narrowly scoped masks for each known pair. Policy:
/// a pair outside the table fails with
/// [`GraphicsError::UnsupportedLayoutTransition`] instead of emitting an
/// all-stages barrier, which would be correct but would hide the missing
/// entry behind a performance cliff. Callers must skip same-layout
/// transitions before consulting the table; an equal pair is reported as
/// unsupported.
pub fn transition_masks(
    from: TextureLayout,
    to: TextureLayout,
) -> Result<BarrierMasks, GraphicsError> {
    if from == to || !is_supported(from, to) {
        return Err(GraphicsError::UnsupportedLayoutTransition { from, to });
    }
    Ok(BarrierMasks {
        src_access: from.src_access_mask(),
        dst_access: to.dst_access_mask(),
        src_stage: from.src_stage(),
        dst_stage: to.dst_stage(),
    })
}

/// Record a layout transition barrier into `cmd`.
///
/// Returns `Ok(false)` without recording anything when `from == to`;
/// validation layers flag needless barriers, so the skip is part of the
/// contract, not an optimization. The caller updates its tracked layout
/// only after this returns `Ok`, which keeps the tracked state in step
/// with what the command stream will execute.
pub(crate) fn record_transition(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    aspect_mask: vk::ImageAspectFlags,
    from: TextureLayout,
    to: TextureLayout,
) -> Result<bool, GraphicsError> {
    if from == to {
        return Ok(false);
    }

    let masks = transition_masks(from, to)?;

    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(from.to_vk())
        .new_layout(to.to_vk())
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: vk::REMAINING_MIP_LEVELS,
            base_array_layer: 0,
            layer_count: vk::REMAINING_ARRAY_LAYERS,
        })
        .src_access_mask(masks.src_access)
        .dst_access_mask(masks.dst_access);

    unsafe {
        device.cmd_pipeline_barrier(
            cmd,
            masks.src_stage,
            masks.dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_layout_to_vk() {
        assert_eq!(TextureLayout::Undefined.to_vk(), vk::ImageLayout::UNDEFINED);
        assert_eq!(
            TextureLayout::ShaderReadOnly.to_vk(),
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
        );
        assert_eq!(
            TextureLayout::PresentSrc.to_vk(),
            vk::ImageLayout::PRESENT_SRC_KHR
        );
    }

    #[rstest]
    #[case(TextureLayout::Undefined, TextureLayout::TransferDst)]
    #[case(TextureLayout::Undefined, TextureLayout::ColorAttachment)]
    #[case(TextureLayout::ColorAttachment, TextureLayout::TransferSrc)]
    #[case(TextureLayout::TransferDst, TextureLayout::ShaderReadOnly)]
    #[case(TextureLayout::TransferSrc, TextureLayout::ColorAttachment)]
    #[case(TextureLayout::DepthStencilAttachment, TextureLayout::TransferSrc)]
    #[case(TextureLayout::ShaderReadOnly, TextureLayout::TransferDst)]
    #[case(TextureLayout::PresentSrc, TextureLayout::ColorAttachment)]
    fn test_supported_pairs(#[case] from: TextureLayout, #[case] to: TextureLayout) {
        assert!(transition_masks(from, to).is_ok());
    }

    #[rstest]
    #[case(TextureLayout::PresentSrc, TextureLayout::DepthStencilAttachment)]
    #[case(TextureLayout::ShaderReadOnly, TextureLayout::PresentSrc)]
    #[case(TextureLayout::ColorAttachment, TextureLayout::Undefined)]
    #[case(TextureLayout::General, TextureLayout::ColorAttachment)]
    fn test_unsupported_pairs(#[case] from: TextureLayout, #[case] to: TextureLayout) {
        assert_eq!(
            transition_masks(from, to),
            Err(GraphicsError::UnsupportedLayoutTransition { from, to })
        );
    }

    #[test]
    fn test_same_layout_not_in_table() {
        // Callers skip equal pairs before consulting the table.
        assert!(transition_masks(
            TextureLayout::ShaderReadOnly,
            TextureLayout::ShaderReadOnly
        )
        .is_err());
    }

    #[test]
    fn test_upload_transition_masks() {
        let masks =
            transition_masks(TextureLayout::Undefined, TextureLayout::TransferDst).unwrap();
        assert_eq!(masks.src_access, vk::AccessFlags::empty());
        assert_eq!(masks.dst_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(masks.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(masks.dst_stage, vk::PipelineStageFlags::TRANSFER);
    }

    #[test]
    fn test_sample_transition_masks() {
        let masks =
            transition_masks(TextureLayout::TransferDst, TextureLayout::ShaderReadOnly).unwrap();
        assert_eq!(masks.src_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(masks.dst_access, vk::AccessFlags::SHADER_READ);
        assert_eq!(masks.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }
}
