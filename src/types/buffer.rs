//! Buffer descriptors and usage flags.

use ash::vk;
use bitflags::bitflags;

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 1;
        /// Buffer can be used as a uniform buffer.
        const UNIFORM = 1 << 2;
        /// Buffer can be used as a storage buffer.
        const STORAGE = 1 << 3;
        /// Buffer can be copied from.
        const COPY_SRC = 1 << 4;
        /// Buffer can be copied to.
        const COPY_DST = 1 << 5;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

impl BufferUsage {
    /// Convert to Vulkan buffer usage flags.
    pub fn to_vk(self) -> vk::BufferUsageFlags {
        let mut result = vk::BufferUsageFlags::empty();
        if self.contains(Self::VERTEX) {
            result |= vk::BufferUsageFlags::VERTEX_BUFFER;
        }
        if self.contains(Self::INDEX) {
            result |= vk::BufferUsageFlags::INDEX_BUFFER;
        }
        if self.contains(Self::UNIFORM) {
            result |= vk::BufferUsageFlags::UNIFORM_BUFFER;
        }
        if self.contains(Self::STORAGE) {
            result |= vk::BufferUsageFlags::STORAGE_BUFFER;
        }
        if self.contains(Self::COPY_SRC) {
            result |= vk::BufferUsageFlags::TRANSFER_SRC;
        }
        if self.contains(Self::COPY_DST) {
            result |= vk::BufferUsageFlags::TRANSFER_DST;
        }
        result
    }
}

bitflags! {
    /// Memory property flags requested for a resource allocation.
    ///
    /// These mirror the Vulkan memory property flags that matter for
    /// placement decisions. A resource's flags must be a superset of what
    /// any CPU access it exposes requires: direct `set_data`/`get_data`
    /// needs `HOST_VISIBLE`, everything else goes through a staging copy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryFlags: u32 {
        /// Fastest memory for GPU access; generally not CPU-mappable.
        const DEVICE_LOCAL = 1 << 0;
        /// Mappable into the CPU address space.
        const HOST_VISIBLE = 1 << 1;
        /// Host writes are visible without explicit flushes.
        const HOST_COHERENT = 1 << 2;
        /// Cached on the host; faster CPU reads.
        const HOST_CACHED = 1 << 3;
    }
}

impl Default for MemoryFlags {
    fn default() -> Self {
        Self::DEVICE_LOCAL
    }
}

impl MemoryFlags {
    /// Convert to Vulkan memory property flags.
    pub fn to_vk(self) -> vk::MemoryPropertyFlags {
        let mut result = vk::MemoryPropertyFlags::empty();
        if self.contains(Self::DEVICE_LOCAL) {
            result |= vk::MemoryPropertyFlags::DEVICE_LOCAL;
        }
        if self.contains(Self::HOST_VISIBLE) {
            result |= vk::MemoryPropertyFlags::HOST_VISIBLE;
        }
        if self.contains(Self::HOST_COHERENT) {
            result |= vk::MemoryPropertyFlags::HOST_COHERENT;
        }
        if self.contains(Self::HOST_CACHED) {
            result |= vk::MemoryPropertyFlags::HOST_CACHED;
        }
        result
    }

    /// Whether this memory can be mapped for direct CPU access.
    pub fn is_host_visible(self) -> bool {
        self.contains(Self::HOST_VISIBLE)
    }
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size in bytes. Must be greater than zero.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
    /// Requested memory placement.
    pub memory: MemoryFlags,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage, memory: MemoryFlags) -> Self {
        Self {
            label: None,
            size,
            usage,
            memory,
        }
    }

    /// Descriptor for a vertex buffer.
    ///
    /// Always carries `COPY_DST` so the buffer can be filled through a
    /// staging copy in addition to direct mapping.
    pub fn vertex(size: u64) -> Self {
        Self::new(
            size,
            BufferUsage::VERTEX | BufferUsage::COPY_DST,
            MemoryFlags::DEVICE_LOCAL,
        )
    }

    /// Descriptor for an index buffer. Always carries `COPY_DST`.
    pub fn index(size: u64) -> Self {
        Self::new(
            size,
            BufferUsage::INDEX | BufferUsage::COPY_DST,
            MemoryFlags::DEVICE_LOCAL,
        )
    }

    /// Descriptor for a uniform buffer.
    ///
    /// Uniforms are updated every frame, so they live in host-visible,
    /// host-coherent memory and never take the staging path.
    pub fn uniform(size: u64) -> Self {
        Self::new(
            size,
            BufferUsage::UNIFORM,
            MemoryFlags::HOST_VISIBLE | MemoryFlags::HOST_COHERENT,
        )
    }

    /// Descriptor for a CPU-side staging buffer used as a copy source.
    pub fn staging(size: u64) -> Self {
        Self::new(
            size,
            BufferUsage::COPY_SRC,
            MemoryFlags::HOST_VISIBLE | MemoryFlags::HOST_COHERENT,
        )
    }

    /// Descriptor for a readback buffer used as a copy destination.
    pub fn readback(size: u64) -> Self {
        Self::new(
            size,
            BufferUsage::COPY_DST,
            MemoryFlags::HOST_VISIBLE | MemoryFlags::HOST_COHERENT,
        )
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Override the requested memory placement.
    pub fn with_memory(mut self, memory: MemoryFlags) -> Self {
        self.memory = memory;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_descriptor_flags() {
        let desc = BufferDescriptor::vertex(36);
        assert!(desc.usage.contains(BufferUsage::VERTEX));
        assert!(desc.usage.contains(BufferUsage::COPY_DST));
        assert_eq!(desc.memory, MemoryFlags::DEVICE_LOCAL);
    }

    #[test]
    fn test_uniform_descriptor_is_host_visible() {
        let desc = BufferDescriptor::uniform(256);
        assert!(desc.memory.is_host_visible());
        assert!(desc.memory.contains(MemoryFlags::HOST_COHERENT));
        assert!(!desc.usage.contains(BufferUsage::COPY_DST));
    }

    #[test]
    fn test_usage_to_vk() {
        let usage = BufferUsage::VERTEX | BufferUsage::COPY_DST;
        let vk_usage = usage.to_vk();
        assert!(vk_usage.contains(vk::BufferUsageFlags::VERTEX_BUFFER));
        assert!(vk_usage.contains(vk::BufferUsageFlags::TRANSFER_DST));
        assert!(!vk_usage.contains(vk::BufferUsageFlags::INDEX_BUFFER));
    }
}
