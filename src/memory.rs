//! GPU memory-type selection and raw allocation.
//!
//! Every resource allocation picks its memory type explicitly: the type
//! bitmask from the resource's memory requirements is intersected with the
//! property flags its role demands, and the first (lowest-index) matching
//! type wins. A mismatch is an error, never a silent fallback to type 0,
//! which would mask an allocation-requirement bug at the call site.

use ash::vk;

use crate::error::{AllocationError, GraphicsError};

/// Select the memory type index for an allocation.
///
/// Iterates the reported memory types in ascending index order and returns
/// the first index that is both set in `type_bits` and whose property flags
/// are a superset of `required`.
///
/// # Errors
///
/// [`AllocationError::NoSuitableMemoryType`] when no reported type
/// satisfies both conditions.
pub fn find_memory_type_index(
    properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> Result<u32, GraphicsError> {
    for index in 0..properties.memory_type_count {
        let type_supported = type_bits & (1 << index) != 0;
        let flags_supported = properties.memory_types[index as usize]
            .property_flags
            .contains(required);
        if type_supported && flags_supported {
            return Ok(index);
        }
    }

    Err(GraphicsError::Allocation(
        AllocationError::NoSuitableMemoryType {
            type_bits,
            required,
        },
    ))
}

/// Allocate device memory satisfying `requirements` with the given
/// property flags.
pub(crate) fn allocate(
    device: &ash::Device,
    properties: &vk::PhysicalDeviceMemoryProperties,
    requirements: vk::MemoryRequirements,
    required: vk::MemoryPropertyFlags,
) -> Result<vk::DeviceMemory, GraphicsError> {
    let memory_type_index =
        find_memory_type_index(properties, requirements.memory_type_bits, required)?;

    let alloc_info = vk::MemoryAllocateInfo::default()
        .allocation_size(requirements.size)
        .memory_type_index(memory_type_index);

    unsafe { device.allocate_memory(&alloc_info, None) }
        .map_err(|e| GraphicsError::from_alloc(e, "memory allocation"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties_with(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: types.len() as u32,
            ..Default::default()
        };
        for (i, flags) in types.iter().enumerate() {
            properties.memory_types[i] = vk::MemoryType {
                property_flags: *flags,
                heap_index: 0,
            };
        }
        properties
    }

    #[test]
    fn test_returns_lowest_matching_index() {
        let properties = properties_with(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);

        // Both index 1 and 2 qualify; the lowest must win.
        let index = find_memory_type_index(
            &properties,
            0b111,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
        )
        .unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_bitmask_excludes_types() {
        let properties = properties_with(&[
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
        ]);

        // Index 0 matches the flags but is masked out of the type bits.
        let index =
            find_memory_type_index(&properties, 0b10, vk::MemoryPropertyFlags::HOST_VISIBLE)
                .unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_superset_flag_match() {
        let properties = properties_with(&[
            vk::MemoryPropertyFlags::HOST_VISIBLE
                | vk::MemoryPropertyFlags::HOST_COHERENT
                | vk::MemoryPropertyFlags::HOST_CACHED,
        ]);

        // A type with extra flags still satisfies the requirement.
        let index = find_memory_type_index(
            &properties,
            0b1,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )
        .unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_no_match_is_explicit_error() {
        let properties = properties_with(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);

        let result = find_memory_type_index(
            &properties,
            0b1,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
        );
        assert_eq!(
            result,
            Err(GraphicsError::Allocation(
                AllocationError::NoSuitableMemoryType {
                    type_bits: 0b1,
                    required: vk::MemoryPropertyFlags::HOST_VISIBLE,
                }
            ))
        );
    }

    #[test]
    fn test_empty_bitmask_never_matches() {
        let properties = properties_with(&[
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ]);

        let result =
            find_memory_type_index(&properties, 0, vk::MemoryPropertyFlags::HOST_VISIBLE);
        assert!(result.is_err());
    }
}
