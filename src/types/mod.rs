//! Descriptor and value types shared across the graphics system.

mod buffer;
mod common;
mod dxgi;
mod sampler;
mod texture;

pub use buffer::{BufferDescriptor, BufferUsage, MemoryFlags};
pub use common::{CompareFunction, Extent3d, ScissorRect, Viewport};
pub use dxgi::{dxgi_to_vulkan, DxgiFormat};
pub use sampler::{AddressMode, FilterMode, SamplerDesc};
pub use texture::{
    SharingMode, TextureDescriptor, TextureDimension, TextureFormat, TextureTiling, TextureUsage,
};
