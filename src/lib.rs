//! # Vermilion GPU
//!
//! Mid-level Vulkan resource and rendering-state management built on
//! [`ash`].
//!
//! ## Overview
//!
//! This crate provides:
//! - [`RenderDevice`] - owns the logical device, command pool, and every
//!   resource created from it
//! - [`Buffer`]/[`Texture`]/[`SamplerState`] - GPU resources with explicit
//!   memory placement and tracked image layouts
//! - [`state`] - immutable, named pipeline-state collections
//!   (blend / depth-stencil / rasterizer / sampler)
//! - [`Presenter`] - the per-frame back-buffer/depth-buffer pair
//!
//! ## Example
//!
//! ```ignore
//! use vermilion_gpu::{BufferDescriptor, DeviceDescriptor, RenderDevice};
//!
//! let device = RenderDevice::new(&DeviceDescriptor::default())?;
//! let uniforms = device.create_buffer(&BufferDescriptor::uniform(256))?;
//! uniforms.set_data(0, bytemuck::bytes_of(&camera))?;
//! ```
//!
//! ## Concurrency
//!
//! One submitting thread per device: command recording and submission are
//! not internally synchronized and every upload blocks until its GPU copy
//! has executed. Cross-process coordination goes through
//! [`SyncObject`]; cross-thread sharing of one device is the caller's
//! responsibility.

pub mod device;
pub mod error;
pub mod layout;
pub mod memory;
pub mod presenter;
pub mod resources;
pub mod state;
pub mod sync_object;
pub mod types;
pub mod vertex;

// Re-export main types for convenience
pub use device::{DeviceDescriptor, DeviceEvents, DeviceShared, QueueFamilyIndices, RenderDevice};
pub use error::{AllocationError, GraphicsError};
pub use layout::{transition_masks, BarrierMasks, TextureLayout};
pub use memory::find_memory_type_index;
pub use presenter::Presenter;
pub use resources::{Buffer, SamplerState, Texture, TypedBuffer};
pub use state::{BlendState, DepthStencilState, RasterizerState, SamplerStates, StateCollection};
pub use sync_object::SyncObject;
pub use types::{
    dxgi_to_vulkan, BufferDescriptor, BufferUsage, DxgiFormat, Extent3d, MemoryFlags, SamplerDesc,
    ScissorRect, TextureDescriptor, TextureFormat, TextureUsage, Viewport,
};
pub use vertex::{layout_of, VertexElement, VertexLayout, VertexPosition, VertexType};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This only announces the library through the logging facade; it is safe
/// to skip.
pub fn init() {
    log::info!("vermilion-gpu v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_built_in_collections_standalone() {
        let blend = state::built_in_blend_states();
        assert!(blend.get("Opaque").is_some());

        let depth = state::built_in_depth_stencil_states();
        assert!(depth.get("DepthEnableGreaterEqual").is_some());

        let raster = state::built_in_rasterizer_states();
        assert!(raster.get("Wireframe").is_some());
    }
}
