//! Graphics error types.

use ash::vk;
use thiserror::Error;

use crate::layout::TextureLayout;

/// Errors raised while allocating GPU memory or creating GPU objects.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// No reported memory type satisfies both the resource's type bitmask
    /// and the required property flags.
    #[error("no suitable memory type (type bits {type_bits:#034b}, required {required:?})")]
    NoSuitableMemoryType {
        /// `memoryTypeBits` from the resource's memory requirements.
        type_bits: u32,
        /// The property flags the caller asked for.
        required: vk::MemoryPropertyFlags,
    },
    /// The underlying API rejected buffer/image/sampler creation.
    #[error("resource creation failed: {0}")]
    CreationFailed(String),
    /// Device memory is exhausted.
    #[error("out of device memory")]
    OutOfDeviceMemory,
    /// Host memory is exhausted.
    #[error("out of host memory")]
    OutOfHostMemory,
}

/// Errors that can occur in the graphics system.
///
/// Every failure is surfaced to the immediate caller; nothing here is
/// retried internally. The one recoverable condition, a state-collection
/// name miss, is reported as `None` from the lookup rather than an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to initialize the Vulkan instance or device.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// Failed to allocate memory for, or create, a GPU resource.
    #[error("allocation failed: {0}")]
    Allocation(#[from] AllocationError),
    /// The requested image layout pair has no known barrier mapping.
    #[error("unsupported layout transition: {from:?} -> {to:?}")]
    UnsupportedLayoutTransition {
        /// Layout the image is currently in.
        from: TextureLayout,
        /// Layout that was requested.
        to: TextureLayout,
    },
    /// A caller-supplied size, offset, count, or raw enumeration value
    /// violates the valid range.
    #[error("argument out of range: {0}")]
    OutOfRange(String),
    /// The operation requires state that is not present (unwritten texture,
    /// double map, release of an unheld lock).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// The GPU device was lost.
    #[error("GPU device lost")]
    DeviceLost,
}

impl GraphicsError {
    /// Map a raw Vulkan result from an allocation call site.
    pub(crate) fn from_alloc(result: vk::Result, what: &str) -> Self {
        match result {
            vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
                Self::Allocation(AllocationError::OutOfDeviceMemory)
            }
            vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
                Self::Allocation(AllocationError::OutOfHostMemory)
            }
            vk::Result::ERROR_DEVICE_LOST => Self::DeviceLost,
            other => Self::Allocation(AllocationError::CreationFailed(format!(
                "{what}: {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::DeviceLost;
        assert_eq!(err.to_string(), "GPU device lost");

        let err = GraphicsError::InitializationFailed("no GPU found".to_string());
        assert_eq!(err.to_string(), "initialization failed: no GPU found");

        let err = GraphicsError::UnsupportedLayoutTransition {
            from: TextureLayout::PresentSrc,
            to: TextureLayout::DepthStencilAttachment,
        };
        assert!(err.to_string().contains("PresentSrc"));
    }

    #[test]
    fn test_alloc_error_mapping() {
        assert_eq!(
            GraphicsError::from_alloc(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY, "buffer"),
            GraphicsError::Allocation(AllocationError::OutOfDeviceMemory)
        );
        assert_eq!(
            GraphicsError::from_alloc(vk::Result::ERROR_DEVICE_LOST, "buffer"),
            GraphicsError::DeviceLost
        );
    }
}
