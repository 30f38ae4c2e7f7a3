//! GPU sampler resource.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ash::vk;

use crate::device::DeviceShared;
use crate::error::GraphicsError;
use crate::types::SamplerDesc;

/// A GPU sampler with a lifetime tied to its device.
///
/// Created by `RenderDevice::create_sampler`; must be destroyed (or
/// dropped) before the device goes away, which the tracked-resource
/// registry enforces.
pub struct SamplerState {
    shared: Arc<DeviceShared>,
    id: u64,
    sampler: vk::Sampler,
    descriptor: SamplerDesc,
    destroyed: AtomicBool,
}

impl SamplerState {
    /// Create a new sampler (called by `RenderDevice::create_sampler`).
    pub(crate) fn create(
        shared: Arc<DeviceShared>,
        descriptor: SamplerDesc,
    ) -> Result<Self, GraphicsError> {
        let create_info = descriptor.to_create_info();
        let sampler = unsafe { shared.raw().create_sampler(&create_info, None) }
            .map_err(|e| GraphicsError::from_alloc(e, "sampler creation"))?;

        let id = shared.register_resource("sampler");
        log::trace!("created sampler #{id} {:?}", descriptor.label);

        Ok(Self {
            shared,
            id,
            sampler,
            descriptor,
            destroyed: AtomicBool::new(false),
        })
    }

    /// Get the raw Vulkan sampler handle.
    pub fn raw(&self) -> vk::Sampler {
        self.sampler
    }

    /// Get the sampler configuration.
    pub fn descriptor(&self) -> &SamplerDesc {
        &self.descriptor
    }

    /// Get the sampler label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Destroy the sampler. Calling this twice is a no-op.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        unsafe { self.shared.raw().destroy_sampler(self.sampler, None) };
        self.shared.unregister_resource(self.id);
        log::trace!("destroyed sampler #{}", self.id);
    }
}

impl Drop for SamplerState {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for SamplerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerState")
            .field("mag_filter", &self.descriptor.mag_filter)
            .field("min_filter", &self.descriptor.min_filter)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(SamplerState: Send, Sync);
