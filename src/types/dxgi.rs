//! DXGI pixel-format interop.
//!
//! Content pipelines hand textures over with DXGI format codes; this module
//! maps the supported codes onto Vulkan formats. The mapping is total over
//! the declared cases, and raw values outside the declared set are rejected
//! up front by [`DxgiFormat::from_u32`].

use ash::vk;

use crate::error::GraphicsError;

/// Supported DXGI pixel formats.
///
/// Discriminants are the actual `DXGI_FORMAT` values so raw codes read from
/// asset headers round-trip without a translation table on the caller side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DxgiFormat {
    /// DXGI_FORMAT_R32G32B32A32_FLOAT
    R32G32B32A32Float = 2,
    /// DXGI_FORMAT_R32G32B32_FLOAT
    R32G32B32Float = 6,
    /// DXGI_FORMAT_R16G16B16A16_FLOAT
    R16G16B16A16Float = 10,
    /// DXGI_FORMAT_R32G32_FLOAT
    R32G32Float = 16,
    /// DXGI_FORMAT_R8G8B8A8_UNORM
    R8G8B8A8Unorm = 28,
    /// DXGI_FORMAT_R8G8B8A8_UNORM_SRGB
    R8G8B8A8UnormSrgb = 29,
    /// DXGI_FORMAT_R16G16_FLOAT
    R16G16Float = 34,
    /// DXGI_FORMAT_D32_FLOAT
    D32Float = 40,
    /// DXGI_FORMAT_R32_FLOAT
    R32Float = 41,
    /// DXGI_FORMAT_D24_UNORM_S8_UINT
    D24UnormS8Uint = 45,
    /// DXGI_FORMAT_R8G8_UNORM
    R8G8Unorm = 49,
    /// DXGI_FORMAT_R16_FLOAT
    R16Float = 54,
    /// DXGI_FORMAT_D16_UNORM
    D16Unorm = 55,
    /// DXGI_FORMAT_R8_UNORM
    R8Unorm = 61,
    /// DXGI_FORMAT_B8G8R8A8_UNORM
    B8G8R8A8Unorm = 87,
    /// DXGI_FORMAT_B8G8R8A8_UNORM_SRGB
    B8G8R8A8UnormSrgb = 91,
}

impl DxgiFormat {
    /// Parse a raw DXGI format code.
    ///
    /// Values outside the declared set fail with an out-of-range error that
    /// names the offending value.
    pub fn from_u32(value: u32) -> Result<Self, GraphicsError> {
        Ok(match value {
            2 => Self::R32G32B32A32Float,
            6 => Self::R32G32B32Float,
            10 => Self::R16G16B16A16Float,
            16 => Self::R32G32Float,
            28 => Self::R8G8B8A8Unorm,
            29 => Self::R8G8B8A8UnormSrgb,
            34 => Self::R16G16Float,
            40 => Self::D32Float,
            41 => Self::R32Float,
            45 => Self::D24UnormS8Uint,
            49 => Self::R8G8Unorm,
            54 => Self::R16Float,
            55 => Self::D16Unorm,
            61 => Self::R8Unorm,
            87 => Self::B8G8R8A8Unorm,
            91 => Self::B8G8R8A8UnormSrgb,
            other => {
                return Err(GraphicsError::OutOfRange(format!(
                    "unsupported DXGI format value {other}"
                )))
            }
        })
    }

    /// Convert to the Vulkan format. Total over the declared cases.
    pub fn to_vulkan(self) -> vk::Format {
        match self {
            Self::R32G32B32A32Float => vk::Format::R32G32B32A32_SFLOAT,
            Self::R32G32B32Float => vk::Format::R32G32B32_SFLOAT,
            Self::R16G16B16A16Float => vk::Format::R16G16B16A16_SFLOAT,
            Self::R32G32Float => vk::Format::R32G32_SFLOAT,
            Self::R8G8B8A8Unorm => vk::Format::R8G8B8A8_UNORM,
            Self::R8G8B8A8UnormSrgb => vk::Format::R8G8B8A8_SRGB,
            Self::R16G16Float => vk::Format::R16G16_SFLOAT,
            Self::D32Float => vk::Format::D32_SFLOAT,
            Self::R32Float => vk::Format::R32_SFLOAT,
            Self::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
            Self::R8G8Unorm => vk::Format::R8G8_UNORM,
            Self::R16Float => vk::Format::R16_SFLOAT,
            Self::D16Unorm => vk::Format::D16_UNORM,
            Self::R8Unorm => vk::Format::R8_UNORM,
            Self::B8G8R8A8Unorm => vk::Format::B8G8R8A8_UNORM,
            Self::B8G8R8A8UnormSrgb => vk::Format::B8G8R8A8_SRGB,
        }
    }
}

/// Convert a raw DXGI format code to a Vulkan format.
pub fn dxgi_to_vulkan(value: u32) -> Result<vk::Format, GraphicsError> {
    Ok(DxgiFormat::from_u32(value)?.to_vulkan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(28, vk::Format::R8G8B8A8_UNORM)]
    #[case(87, vk::Format::B8G8R8A8_UNORM)]
    #[case(40, vk::Format::D32_SFLOAT)]
    #[case(45, vk::Format::D24_UNORM_S8_UINT)]
    #[case(2, vk::Format::R32G32B32A32_SFLOAT)]
    fn test_known_formats(#[case] raw: u32, #[case] expected: vk::Format) {
        assert_eq!(dxgi_to_vulkan(raw).unwrap(), expected);
    }

    #[test]
    fn test_unmapped_value_names_input() {
        // DXGI_FORMAT_BC7_UNORM (98) is deliberately not in the table.
        let err = dxgi_to_vulkan(98).unwrap_err();
        match err {
            GraphicsError::OutOfRange(msg) => assert!(msg.contains("98")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_discriminant() {
        let format = DxgiFormat::from_u32(DxgiFormat::B8G8R8A8UnormSrgb as u32).unwrap();
        assert_eq!(format, DxgiFormat::B8G8R8A8UnormSrgb);
    }
}
