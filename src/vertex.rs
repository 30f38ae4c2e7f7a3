//! Vertex attribute metadata.
//!
//! Vertex types declare their attributes as (semantic, format, offset)
//! triples; the derived binding layout (stride plus per-attribute
//! location/format/offset) is computed once per type and memoized
//! process-wide, since the set of vertex types is bounded and known at
//! startup.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use ash::vk;
use bytemuck::{Pod, Zeroable};
use parking_lot::RwLock;

use crate::error::GraphicsError;

/// Data format of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// One 32-bit float.
    Float32,
    /// Two 32-bit floats.
    Float32x2,
    /// Three 32-bit floats.
    Float32x3,
    /// Four 32-bit floats.
    Float32x4,
    /// One 32-bit unsigned integer.
    Uint32,
    /// Four 8-bit unsigned normalized values.
    Unorm8x4,
}

impl VertexFormat {
    /// Size of one attribute of this format in bytes.
    pub fn size(self) -> u32 {
        match self {
            Self::Float32 | Self::Uint32 | Self::Unorm8x4 => 4,
            Self::Float32x2 => 8,
            Self::Float32x3 => 12,
            Self::Float32x4 => 16,
        }
    }

    /// Convert to the Vulkan format.
    pub fn to_vk(self) -> vk::Format {
        match self {
            Self::Float32 => vk::Format::R32_SFLOAT,
            Self::Float32x2 => vk::Format::R32G32_SFLOAT,
            Self::Float32x3 => vk::Format::R32G32B32_SFLOAT,
            Self::Float32x4 => vk::Format::R32G32B32A32_SFLOAT,
            Self::Uint32 => vk::Format::R32_UINT,
            Self::Unorm8x4 => vk::Format::R8G8B8A8_UNORM,
        }
    }
}

/// One declared vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexElement {
    /// Semantic name ("POSITION", "NORMAL", "TEXCOORD", ...).
    pub semantic: &'static str,
    /// Data format.
    pub format: VertexFormat,
    /// Byte offset within the vertex.
    pub offset: u32,
}

impl VertexElement {
    /// Create a vertex element.
    pub fn new(semantic: &'static str, format: VertexFormat, offset: u32) -> Self {
        Self {
            semantic,
            format,
            offset,
        }
    }
}

/// A plain-data vertex type with declared attributes.
///
/// The `Pod` bound guarantees a fixed layout with no reference fields, so
/// vertex bytes can be copied verbatim into GPU buffers.
pub trait VertexType: Pod {
    /// The attribute declarations for this type.
    fn elements() -> Vec<VertexElement>;
}

/// A resolved attribute with its shader location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader input location, in declaration order.
    pub location: u32,
    /// Semantic name carried over from the declaration.
    pub semantic: &'static str,
    /// Data format.
    pub format: VertexFormat,
    /// Byte offset within the vertex.
    pub offset: u32,
}

/// Binding layout derived from a vertex type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    /// Bytes between consecutive vertices.
    pub stride: u32,
    /// Attributes in declaration order.
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Build the Vulkan attribute descriptions for binding 0.
    pub fn vk_attributes(&self) -> Vec<vk::VertexInputAttributeDescription> {
        self.attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: 0,
                format: attribute.format.to_vk(),
                offset: attribute.offset,
            })
            .collect()
    }

    /// Build the Vulkan binding description for binding 0.
    pub fn vk_binding(&self) -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: self.stride,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }
}

fn layout_cache() -> &'static RwLock<HashMap<TypeId, Arc<VertexLayout>>> {
    static CACHE: OnceLock<RwLock<HashMap<TypeId, Arc<VertexLayout>>>> = OnceLock::new();
    CACHE.get_or_init(Default::default)
}

/// Get the memoized layout of a vertex type.
///
/// The first request for a type derives and validates the layout; later
/// requests return the cached value.
///
/// # Errors
///
/// [`GraphicsError::OutOfRange`] when a declared attribute extends past
/// the type's stride, or the type declares no attributes.
pub fn layout_of<V: VertexType>() -> Result<Arc<VertexLayout>, GraphicsError> {
    let key = TypeId::of::<V>();

    if let Some(layout) = layout_cache().read().get(&key) {
        return Ok(Arc::clone(layout));
    }

    let stride = std::mem::size_of::<V>() as u32;
    let elements = V::elements();
    if elements.is_empty() {
        return Err(GraphicsError::OutOfRange(
            "vertex type declares no attributes".to_string(),
        ));
    }

    let mut attributes = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        let end = element.offset + element.format.size();
        if end > stride {
            return Err(GraphicsError::OutOfRange(format!(
                "attribute {} ({}) ends at byte {end}, past the vertex stride {stride}",
                index, element.semantic
            )));
        }
        attributes.push(VertexAttribute {
            location: index as u32,
            semantic: element.semantic,
            format: element.format,
            offset: element.offset,
        });
    }

    let layout = Arc::new(VertexLayout { stride, attributes });

    let mut cache = layout_cache().write();
    Ok(Arc::clone(cache.entry(key).or_insert(layout)))
}

/// A vertex carrying only a position.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPosition {
    /// Object-space position.
    pub position: [f32; 3],
}

impl VertexType for VertexPosition {
    fn elements() -> Vec<VertexElement> {
        vec![VertexElement::new("POSITION", VertexFormat::Float32x3, 0)]
    }
}

/// A vertex carrying a position and a texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPositionTexture {
    /// Object-space position.
    pub position: [f32; 3],
    /// Texture coordinate.
    pub tex_coord: [f32; 2],
}

impl VertexType for VertexPositionTexture {
    fn elements() -> Vec<VertexElement> {
        vec![
            VertexElement::new("POSITION", VertexFormat::Float32x3, 0),
            VertexElement::new("TEXCOORD", VertexFormat::Float32x2, 12),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_position_layout() {
        let layout = layout_of::<VertexPosition>().unwrap();
        assert_eq!(layout.stride, 12);
        assert_eq!(layout.attributes.len(), 1);
        assert_eq!(layout.attributes[0].location, 0);
        assert_eq!(layout.attributes[0].format, VertexFormat::Float32x3);
    }

    #[test]
    fn test_layout_is_memoized() {
        let first = layout_of::<VertexPositionTexture>().unwrap();
        let second = layout_of::<VertexPositionTexture>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_locations_follow_declaration_order() {
        let layout = layout_of::<VertexPositionTexture>().unwrap();
        assert_eq!(layout.stride, 20);
        assert_eq!(layout.attributes[0].semantic, "POSITION");
        assert_eq!(layout.attributes[1].semantic, "TEXCOORD");
        assert_eq!(layout.attributes[1].location, 1);
        assert_eq!(layout.attributes[1].offset, 12);
    }

    #[test]
    fn test_out_of_bounds_attribute_fails() {
        #[repr(C)]
        #[derive(Debug, Clone, Copy, Pod, Zeroable)]
        struct Broken {
            position: [f32; 2],
        }

        impl VertexType for Broken {
            fn elements() -> Vec<VertexElement> {
                // Declares 12 bytes starting at 0 in an 8-byte vertex.
                vec![VertexElement::new("POSITION", VertexFormat::Float32x3, 0)]
            }
        }

        assert!(matches!(
            layout_of::<Broken>(),
            Err(GraphicsError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_vk_conversion() {
        let layout = layout_of::<VertexPosition>().unwrap();
        let binding = layout.vk_binding();
        assert_eq!(binding.stride, 12);

        let attributes = layout.vk_attributes();
        assert_eq!(attributes[0].format, vk::Format::R32G32B32_SFLOAT);
    }
}
