//! Built-in sampler set with GPU handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ash::vk;

use crate::device::DeviceShared;
use crate::error::GraphicsError;
use crate::types::{AddressMode, SamplerDesc};

/// The canonical sampler configurations, in collection order.
pub fn built_in_sampler_descs() -> Vec<(&'static str, SamplerDesc)> {
    let point = SamplerDesc::nearest();
    let linear = SamplerDesc::linear();
    let anisotropic = SamplerDesc::linear().with_anisotropy(16);

    vec![
        (
            "PointWrap",
            point.clone().with_address_mode(AddressMode::Repeat),
        ),
        ("PointClamp", point),
        (
            "LinearWrap",
            linear.clone().with_address_mode(AddressMode::Repeat),
        ),
        ("LinearClamp", linear),
        (
            "AnisotropicWrap",
            anisotropic.clone().with_address_mode(AddressMode::Repeat),
        ),
        ("AnisotropicClamp", anisotropic),
    ]
}

struct SamplerEntry {
    name: &'static str,
    descriptor: SamplerDesc,
    sampler: vk::Sampler,
}

/// The built-in samplers of a device, created once at device creation.
///
/// Unlike the pure state collections, each entry owns a `vk::Sampler`.
/// The handles are destroyed with the collection, which holds its own
/// reference to the device core and therefore always outlives them.
pub struct SamplerStates {
    shared: Arc<DeviceShared>,
    entries: Vec<SamplerEntry>,
    destroyed: AtomicBool,
}

impl SamplerStates {
    /// Create the built-in samplers.
    pub(crate) fn new(shared: Arc<DeviceShared>) -> Result<Self, GraphicsError> {
        let mut entries: Vec<SamplerEntry> = Vec::new();

        for (name, descriptor) in built_in_sampler_descs() {
            let create_info = descriptor.to_create_info();
            let sampler = unsafe { shared.raw().create_sampler(&create_info, None) };
            let sampler = match sampler {
                Ok(sampler) => sampler,
                Err(e) => {
                    // Roll back the ones we already created.
                    for entry in &entries {
                        unsafe { shared.raw().destroy_sampler(entry.sampler, None) };
                    }
                    return Err(GraphicsError::from_alloc(e, "built-in sampler creation"));
                }
            };
            entries.push(SamplerEntry {
                name,
                descriptor,
                sampler,
            });
        }

        log::debug!("created {} built-in samplers", entries.len());

        Ok(Self {
            shared,
            entries,
            destroyed: AtomicBool::new(false),
        })
    }

    /// Look up a sampler handle by name (case-sensitive).
    pub fn get(&self, name: &str) -> Option<vk::Sampler> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.sampler)
    }

    /// Look up a sampler handle by index in collection order.
    pub fn get_index(&self, index: usize) -> Option<vk::Sampler> {
        self.entries.get(index).map(|entry| entry.sampler)
    }

    /// Look up the configuration behind a name.
    pub fn descriptor(&self, name: &str) -> Option<&SamplerDesc> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.descriptor)
    }

    /// Number of built-in samplers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry names in collection order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.name).collect()
    }

    /// Destroy all sampler handles. Calling this twice is a no-op.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        for entry in &self.entries {
            unsafe { self.shared.raw().destroy_sampler(entry.sampler, None) };
        }
    }
}

impl Drop for SamplerStates {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for SamplerStates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerStates")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FilterMode;

    #[test]
    fn test_built_in_descs() {
        let descs = built_in_sampler_descs();
        assert_eq!(descs.len(), 6);

        let (_, linear_wrap) = descs.iter().find(|(n, _)| *n == "LinearWrap").unwrap();
        assert_eq!(linear_wrap.mag_filter, FilterMode::Linear);
        assert_eq!(linear_wrap.address_mode_u, AddressMode::Repeat);

        let (_, point_clamp) = descs.iter().find(|(n, _)| *n == "PointClamp").unwrap();
        assert_eq!(point_clamp.mag_filter, FilterMode::Nearest);
        assert_eq!(point_clamp.address_mode_u, AddressMode::ClampToEdge);

        let (_, aniso) = descs.iter().find(|(n, _)| *n == "AnisotropicClamp").unwrap();
        assert_eq!(aniso.anisotropy_clamp, 16);
    }
}
