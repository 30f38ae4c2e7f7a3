//! Depth-stencil states.

use ash::vk;

use super::StateCollection;
use crate::types::CompareFunction;

/// Operation applied to a stencil value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilOperation {
    /// Keep the current value.
    #[default]
    Keep,
    /// Set the value to zero.
    Zero,
    /// Replace with the reference value.
    Replace,
    /// Increment, clamping at the maximum.
    IncrementClamp,
    /// Decrement, clamping at zero.
    DecrementClamp,
    /// Bitwise invert.
    Invert,
    /// Increment with wrap-around.
    IncrementWrap,
    /// Decrement with wrap-around.
    DecrementWrap,
}

impl StencilOperation {
    /// Convert to the Vulkan stencil op.
    pub fn to_vk(self) -> vk::StencilOp {
        match self {
            Self::Keep => vk::StencilOp::KEEP,
            Self::Zero => vk::StencilOp::ZERO,
            Self::Replace => vk::StencilOp::REPLACE,
            Self::IncrementClamp => vk::StencilOp::INCREMENT_AND_CLAMP,
            Self::DecrementClamp => vk::StencilOp::DECREMENT_AND_CLAMP,
            Self::Invert => vk::StencilOp::INVERT,
            Self::IncrementWrap => vk::StencilOp::INCREMENT_AND_WRAP,
            Self::DecrementWrap => vk::StencilOp::DECREMENT_AND_WRAP,
        }
    }
}

/// Stencil behavior for one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilFaceDesc {
    /// Applied when the stencil test fails.
    pub fail_op: StencilOperation,
    /// Applied when both stencil and depth tests pass.
    pub pass_op: StencilOperation,
    /// Applied when the stencil test passes but depth fails.
    pub depth_fail_op: StencilOperation,
    /// Stencil comparison function.
    pub compare: CompareFunction,
}

impl Default for StencilFaceDesc {
    fn default() -> Self {
        Self {
            fail_op: StencilOperation::Keep,
            pass_op: StencilOperation::Keep,
            depth_fail_op: StencilOperation::Keep,
            compare: CompareFunction::Always,
        }
    }
}

impl StencilFaceDesc {
    fn to_vk(self, read_mask: u32, write_mask: u32) -> vk::StencilOpState {
        vk::StencilOpState {
            fail_op: self.fail_op.to_vk(),
            pass_op: self.pass_op.to_vk(),
            depth_fail_op: self.depth_fail_op.to_vk(),
            compare_op: self.compare.to_vk(),
            compare_mask: read_mask,
            write_mask,
            reference: 0,
        }
    }
}

/// Immutable depth-stencil state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    /// Whether the depth test runs.
    pub depth_enable: bool,
    /// Whether passing fragments write their depth.
    pub depth_write_enable: bool,
    /// Depth comparison function.
    pub depth_compare: CompareFunction,
    /// Whether the stencil test runs.
    pub stencil_enable: bool,
    /// Bits of the stencil value read by the test.
    pub stencil_read_mask: u32,
    /// Bits of the stencil value the test may write.
    pub stencil_write_mask: u32,
    /// Stencil behavior for front-facing primitives.
    pub front: StencilFaceDesc,
    /// Stencil behavior for back-facing primitives.
    pub back: StencilFaceDesc,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self::less_equal()
    }
}

impl DepthStencilState {
    /// Depth and stencil testing fully disabled.
    pub fn none() -> Self {
        Self {
            depth_enable: false,
            depth_write_enable: false,
            depth_compare: CompareFunction::Always,
            stencil_enable: false,
            stencil_read_mask: 0xFF,
            stencil_write_mask: 0xFF,
            front: StencilFaceDesc::default(),
            back: StencilFaceDesc::default(),
        }
    }

    /// Depth test and write enabled with a `LessEqual` compare; stencil
    /// test enabled.
    pub fn less_equal() -> Self {
        Self {
            depth_enable: true,
            depth_write_enable: true,
            depth_compare: CompareFunction::LessEqual,
            stencil_enable: true,
            ..Self::none()
        }
    }

    /// Depth test and write enabled with a `GreaterEqual` compare (for
    /// reverse-Z); stencil test enabled.
    pub fn greater_equal() -> Self {
        Self {
            depth_compare: CompareFunction::GreaterEqual,
            ..Self::less_equal()
        }
    }

    /// Depth test without depth writes; stencil disabled.
    pub fn read_only() -> Self {
        Self {
            depth_enable: true,
            depth_write_enable: false,
            depth_compare: CompareFunction::LessEqual,
            ..Self::none()
        }
    }

    /// Build the Vulkan depth-stencil create info.
    pub fn to_vk(&self) -> vk::PipelineDepthStencilStateCreateInfo<'static> {
        vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(self.depth_enable)
            .depth_write_enable(self.depth_write_enable)
            .depth_compare_op(self.depth_compare.to_vk())
            .depth_bounds_test_enable(false)
            .stencil_test_enable(self.stencil_enable)
            .front(
                self.front
                    .to_vk(self.stencil_read_mask, self.stencil_write_mask),
            )
            .back(
                self.back
                    .to_vk(self.stencil_read_mask, self.stencil_write_mask),
            )
    }
}

/// Build the canonical depth-stencil state collection.
pub fn built_in_depth_stencil_states() -> StateCollection<DepthStencilState> {
    StateCollection::new(vec![
        ("None", DepthStencilState::none()),
        ("DepthEnableLessEqual", DepthStencilState::less_equal()),
        ("DepthEnableGreaterEqual", DepthStencilState::greater_equal()),
        ("DepthReadOnly", DepthStencilState::read_only()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greater_equal_state() {
        let states = built_in_depth_stencil_states();
        let state = states.get("DepthEnableGreaterEqual").unwrap();

        assert_eq!(state.depth_compare, CompareFunction::GreaterEqual);
        assert!(state.depth_enable);
        assert!(state.depth_write_enable);
        assert!(state.stencil_enable);
    }

    #[test]
    fn test_read_only_state() {
        let states = built_in_depth_stencil_states();
        let state = states.get("DepthReadOnly").unwrap();

        assert!(state.depth_enable);
        assert!(!state.depth_write_enable);
        assert!(!state.stencil_enable);
    }

    #[test]
    fn test_none_state_disables_everything() {
        let state = DepthStencilState::none();
        assert!(!state.depth_enable);
        assert!(!state.depth_write_enable);
        assert!(!state.stencil_enable);
    }

    #[test]
    fn test_to_vk() {
        let info = DepthStencilState::greater_equal().to_vk();
        assert_eq!(info.depth_test_enable, vk::TRUE);
        assert_eq!(info.depth_compare_op, vk::CompareOp::GREATER_OR_EQUAL);
        assert_eq!(info.stencil_test_enable, vk::TRUE);
    }

    #[test]
    fn test_configuration_equality() {
        assert_eq!(
            DepthStencilState::greater_equal(),
            DepthStencilState::greater_equal()
        );
        assert_ne!(DepthStencilState::less_equal(), DepthStencilState::none());
    }
}
