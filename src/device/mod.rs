//! The rendering device.
//!
//! [`RenderDevice`] owns the Vulkan instance, logical device, command pool,
//! and the built-in pipeline-state collections. Resources created from it
//! hold an `Arc` to the shared core, so the underlying handles are
//! destroyed strictly after the last resource releases them: wait-idle,
//! then the command pool, then the device, then the instance.
//!
//! # Thread safety
//!
//! One submitting thread per device. Command recording and submission are
//! not internally synchronized; callers that share a device across threads
//! must serialize access themselves. The resource registry and observer
//! lists use locks only for bookkeeping.

mod commands;
mod debug;
mod events;
mod instance;
mod physical;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ash::vk;
use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::resources::{Buffer, SamplerState, Texture};
use crate::state::{
    built_in_blend_states, built_in_depth_stencil_states, built_in_rasterizer_states, BlendState,
    DepthStencilState, RasterizerState, SamplerStates, StateCollection,
};
use crate::types::{BufferDescriptor, SamplerDesc, TextureDescriptor};

pub use events::DeviceEvents;
pub use physical::QueueFamilyIndices;

/// Parameters for creating a [`RenderDevice`].
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    /// Application name reported to the driver.
    pub app_name: String,
    /// Enable the Khronos validation layer when available.
    pub validation: bool,
}

impl Default for DeviceDescriptor {
    fn default() -> Self {
        Self {
            app_name: "vermilion".to_string(),
            validation: cfg!(debug_assertions),
        }
    }
}

/// Shared device core held by every resource.
///
/// Dropping the last `Arc<DeviceShared>` tears the device down in a fixed
/// order: wait for the device to go idle, destroy the command pool, destroy
/// the logical device, then the debug messenger and instance.
pub struct DeviceShared {
    entry: ash::Entry,
    instance: ash::Instance,
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    physical_device: vk::PhysicalDevice,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    queue_families: QueueFamilyIndices,
    device: ash::Device,
    graphics_queue: vk::Queue,
    command_pool: vk::CommandPool,
    next_resource_id: AtomicU64,
    registry: Mutex<HashMap<u64, &'static str>>,
    events: DeviceEvents,
}

impl DeviceShared {
    /// Get the Vulkan entry points.
    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    /// Get the Vulkan instance.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Get the physical device.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Get the logical device.
    pub fn raw(&self) -> &ash::Device {
        &self.device
    }

    /// Get the memory properties reported by the physical device.
    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }

    /// Get the discovered queue family indices.
    pub fn queue_families(&self) -> QueueFamilyIndices {
        self.queue_families
    }

    /// Get the graphics queue.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Get the command pool for transient command buffers.
    pub fn command_pool(&self) -> vk::CommandPool {
        self.command_pool
    }

    /// Get the device lifecycle observer lists.
    pub fn events(&self) -> &DeviceEvents {
        &self.events
    }

    /// Block until the device is idle.
    pub fn wait_idle(&self) -> Result<(), GraphicsError> {
        unsafe { self.device.device_wait_idle() }.map_err(|e| {
            if e == vk::Result::ERROR_DEVICE_LOST {
                self.events.fire_device_lost();
                GraphicsError::DeviceLost
            } else {
                GraphicsError::InvalidOperation(format!("device wait idle failed: {e:?}"))
            }
        })
    }

    /// Register a live resource; returns its tracking id.
    pub(crate) fn register_resource(&self, kind: &'static str) -> u64 {
        let id = self.next_resource_id.fetch_add(1, Ordering::Relaxed);
        self.registry.lock().insert(id, kind);
        log::trace!("registered {kind} resource #{id}");
        id
    }

    /// Remove a resource from the tracked set. Idempotent.
    pub(crate) fn unregister_resource(&self, id: u64) {
        self.registry.lock().remove(&id);
    }

    /// Number of live resources created from this device.
    pub fn live_resources(&self) -> usize {
        self.registry.lock().len()
    }
}

impl std::fmt::Debug for DeviceShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceShared")
            .field("queue_families", &self.queue_families)
            .field("live_resources", &self.live_resources())
            .finish()
    }
}

impl Drop for DeviceShared {
    fn drop(&mut self) {
        unsafe {
            // Destruction must not propagate errors; an already-lost device
            // is logged and the teardown continues.
            if let Err(e) = self.device.device_wait_idle() {
                log::error!("wait idle during device teardown failed: {e:?}");
            }
            self.device.destroy_command_pool(self.command_pool, None);
            self.device.destroy_device(None);
            if let (Some(debug_utils), Some(messenger)) =
                (&self.debug_utils, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        log::debug!("device destroyed");
    }
}

/// A rendering device for creating GPU resources.
///
/// Resources returned by the `create_*` methods register themselves in the
/// device's tracked set and remove themselves when destroyed. Destroying
/// the device while resources are live is a design error: it is logged,
/// asserted in debug builds, and the shared core stays alive until the last
/// resource lets go.
pub struct RenderDevice {
    shared: Arc<DeviceShared>,
    blend_states: StateCollection<BlendState>,
    depth_stencil_states: StateCollection<DepthStencilState>,
    rasterizer_states: StateCollection<RasterizerState>,
    sampler_states: SamplerStates,
}

impl RenderDevice {
    /// Create a device on the best available GPU.
    pub fn new(descriptor: &DeviceDescriptor) -> Result<Self, GraphicsError> {
        let entry = unsafe { ash::Entry::load() }.map_err(|e| {
            GraphicsError::InitializationFailed(format!("Failed to load Vulkan: {}", e))
        })?;

        let (instance, debug_messenger, debug_utils) =
            instance::create_instance(&entry, &descriptor.app_name, descriptor.validation)?;

        let physical_device = physical::select_physical_device(&instance)?;

        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };

        let queue_families = physical::find_queue_families(&instance, physical_device);
        let graphics_family = queue_families.graphics.ok_or_else(|| {
            GraphicsError::InitializationFailed("No graphics queue family found".to_string())
        })?;

        let device = physical::create_logical_device(&instance, physical_device, graphics_family)?;
        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };

        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(graphics_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let command_pool =
            unsafe { device.create_command_pool(&pool_info, None) }.map_err(|e| {
                GraphicsError::InitializationFailed(format!(
                    "Failed to create command pool: {:?}",
                    e
                ))
            })?;

        let shared = Arc::new(DeviceShared {
            entry,
            instance,
            debug_utils,
            debug_messenger,
            physical_device,
            memory_properties,
            queue_families,
            device,
            graphics_queue,
            command_pool,
            next_resource_id: AtomicU64::new(1),
            registry: Mutex::new(HashMap::new()),
            events: DeviceEvents::new(),
        });

        let sampler_states = SamplerStates::new(Arc::clone(&shared))?;

        let device = Self {
            shared,
            blend_states: built_in_blend_states(),
            depth_stencil_states: built_in_depth_stencil_states(),
            rasterizer_states: built_in_rasterizer_states(),
            sampler_states,
        };

        log::info!(
            "render device initialized (validation: {})",
            descriptor.validation
        );
        device.shared.events().fire_created();

        Ok(device)
    }

    /// Get the shared device core.
    pub fn shared(&self) -> &Arc<DeviceShared> {
        &self.shared
    }

    /// Get the device lifecycle observer lists.
    pub fn events(&self) -> &DeviceEvents {
        self.shared.events()
    }

    /// Create a GPU buffer.
    ///
    /// # Errors
    ///
    /// Fails on a zero-byte size, when no memory type satisfies the
    /// descriptor's placement flags, or when the underlying API rejects
    /// creation.
    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<Buffer, GraphicsError> {
        Buffer::create(Arc::clone(&self.shared), descriptor)
    }

    /// Create a GPU texture.
    ///
    /// # Errors
    ///
    /// Fails when the descriptor is invalid (any dimension below 1, bad
    /// sample count) or allocation fails.
    pub fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<Texture, GraphicsError> {
        Texture::create(Arc::clone(&self.shared), descriptor)
    }

    /// Create a texture sampler.
    pub fn create_sampler(&self, descriptor: &SamplerDesc) -> Result<SamplerState, GraphicsError> {
        SamplerState::create(Arc::clone(&self.shared), descriptor.clone())
    }

    /// Built-in blend states, looked up by name or index.
    pub fn blend_states(&self) -> &StateCollection<BlendState> {
        &self.blend_states
    }

    /// Built-in depth-stencil states.
    pub fn depth_stencil_states(&self) -> &StateCollection<DepthStencilState> {
        &self.depth_stencil_states
    }

    /// Built-in rasterizer states.
    pub fn rasterizer_states(&self) -> &StateCollection<RasterizerState> {
        &self.rasterizer_states
    }

    /// Built-in samplers with their GPU handles.
    pub fn sampler_states(&self) -> &SamplerStates {
        &self.sampler_states
    }

    /// Block until the device is idle.
    pub fn wait_idle(&self) -> Result<(), GraphicsError> {
        self.shared.wait_idle()
    }

    /// Number of live resources created from this device.
    pub fn live_resources(&self) -> usize {
        self.shared.live_resources()
    }
}

impl std::fmt::Debug for RenderDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderDevice")
            .field("shared", &self.shared)
            .finish()
    }
}

impl Drop for RenderDevice {
    fn drop(&mut self) {
        if let Err(e) = self.wait_idle() {
            log::error!("wait idle on device drop failed: {e}");
        }
        let live = self.shared.live_resources();
        if live > 0 {
            log::error!(
                "render device dropped with {live} live resources; \
                 the underlying device stays alive until they are released"
            );
            debug_assert_eq!(live, 0, "render device dropped with live resources");
        }
    }
}

static_assertions::assert_impl_all!(DeviceShared: Send, Sync);
static_assertions::assert_impl_all!(RenderDevice: Send, Sync);
