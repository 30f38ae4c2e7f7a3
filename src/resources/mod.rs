//! GPU resources: buffers, textures, samplers.
//!
//! Every resource registers itself with its device on creation and removes
//! itself on destruction. Destruction is explicit, idempotent, and never
//! surfaces errors; `Drop` falls back to it so teardown order stays
//! order-independent.

mod buffer;
mod sampler;
mod texture;

pub use buffer::{Buffer, TypedBuffer};
pub use sampler::SamplerState;
pub use texture::Texture;
