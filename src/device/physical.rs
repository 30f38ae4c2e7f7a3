//! Physical device selection, queue family discovery, and logical device
//! creation.

use std::ffi::CStr;

use ash::vk;

use crate::error::GraphicsError;

/// Queue family indices discovered from a physical device.
///
/// Discovered once during device creation and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QueueFamilyIndices {
    /// Family that supports graphics operations.
    pub graphics: Option<u32>,
    /// Family that can present to a surface.
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    /// Complete only when both a graphics- and a present-capable family
    /// have been found.
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }
}

/// Select the best physical device for rendering.
///
/// Prefers discrete GPUs over integrated GPUs.
pub(super) fn select_physical_device(
    instance: &ash::Instance,
) -> Result<vk::PhysicalDevice, GraphicsError> {
    let devices = unsafe { instance.enumerate_physical_devices() }.map_err(|e| {
        GraphicsError::InitializationFailed(format!(
            "Failed to enumerate physical devices: {:?}",
            e
        ))
    })?;

    if devices.is_empty() {
        return Err(GraphicsError::InitializationFailed(
            "No Vulkan-capable GPU found".to_string(),
        ));
    }

    let mut best_device = None;
    let mut best_score = 0;

    for device in devices {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let features = unsafe { instance.get_physical_device_features(device) };

        if features.sampler_anisotropy == vk::FALSE {
            continue;
        }

        let mut score = 0;
        if properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
            score += 1000;
        } else if properties.device_type == vk::PhysicalDeviceType::INTEGRATED_GPU {
            score += 100;
        }
        score += properties.limits.max_image_dimension2_d / 1024;

        if score > best_score {
            best_score = score;
            best_device = Some(device);
        }

        let device_name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) };
        log::info!(
            "Found GPU: {:?} (type: {:?}, score: {})",
            device_name,
            properties.device_type,
            score
        );
    }

    best_device
        .ok_or_else(|| GraphicsError::InitializationFailed("No suitable GPU found".to_string()))
}

/// Discover graphics- and present-capable queue families.
///
/// Presentation itself lives in the windowing collaborator; without a
/// surface to test against, a graphics-capable family is taken as
/// present-capable, which holds on every desktop driver this crate targets.
pub(super) fn find_queue_families(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> QueueFamilyIndices {
    let queue_families =
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

    let mut indices = QueueFamilyIndices::default();

    for (index, family) in queue_families.iter().enumerate() {
        if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            if indices.graphics.is_none() {
                indices.graphics = Some(index as u32);
            }
            if indices.present.is_none() {
                indices.present = Some(index as u32);
            }
        }
        if indices.is_complete() {
            break;
        }
    }

    indices
}

/// Create a logical device with the features this crate relies on.
pub(super) fn create_logical_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    graphics_queue_family: u32,
) -> Result<ash::Device, GraphicsError> {
    let queue_priorities = [1.0f32];
    let queue_create_info = vk::DeviceQueueCreateInfo::default()
        .queue_family_index(graphics_queue_family)
        .queue_priorities(&queue_priorities);

    let queue_create_infos = [queue_create_info];

    let features = vk::PhysicalDeviceFeatures::default()
        .sampler_anisotropy(true)
        .fill_mode_non_solid(true);

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_features(&features);

    let device =
        unsafe { instance.create_device(physical_device, &create_info, None) }.map_err(|e| {
            GraphicsError::InitializationFailed(format!("Failed to create logical device: {:?}", e))
        })?;

    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_family_completeness() {
        let mut indices = QueueFamilyIndices::default();
        assert!(!indices.is_complete());

        indices.graphics = Some(0);
        assert!(!indices.is_complete());

        indices.present = Some(0);
        assert!(indices.is_complete());
    }
}
