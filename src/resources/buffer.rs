//! GPU buffer resource.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ash::vk;
use bytemuck::Pod;
use parking_lot::Mutex;

use crate::device::{DeviceShared, RenderDevice};
use crate::error::GraphicsError;
use crate::memory;
use crate::types::{BufferDescriptor, BufferUsage, MemoryFlags};

/// Check that `[offset, offset + len)` lies inside a buffer of `size` bytes.
pub(crate) fn check_range(offset: u64, len: u64, size: u64) -> Result<(), GraphicsError> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(GraphicsError::OutOfRange(format!(
            "range [{offset}, {offset}+{len}) exceeds buffer size {size}"
        ))),
    }
}

/// A GPU buffer with its own memory allocation.
///
/// Created by [`RenderDevice::create_buffer`]. Host-visible buffers support
/// direct `set_data`/`get_data` through mapped memory; device-local buffers
/// with the matching copy usage go through a staging buffer and a
/// synchronous single-use command submission instead.
///
/// # Example
///
/// ```ignore
/// let buffer = device.create_buffer(&BufferDescriptor::uniform(256))?;
/// buffer.set_data(0, bytemuck::bytes_of(&view_matrix))?;
/// ```
pub struct Buffer {
    shared: Arc<DeviceShared>,
    id: u64,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: u64,
    usage: BufferUsage,
    memory_flags: MemoryFlags,
    label: Option<String>,
    mapped: Mutex<Option<*mut u8>>,
    destroyed: AtomicBool,
}

// SAFETY: the raw handles are owned by this struct and the mapped pointer
// is only touched under the mutex. Vulkan handles themselves are
// thread-safe to pass around.
unsafe impl Send for Buffer {}
unsafe impl Sync for Buffer {}

impl Buffer {
    /// Create a new buffer (called by [`RenderDevice::create_buffer`]).
    pub(crate) fn create(
        shared: Arc<DeviceShared>,
        descriptor: &BufferDescriptor,
    ) -> Result<Self, GraphicsError> {
        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer size cannot be zero".to_string(),
            ));
        }

        let device = shared.raw();

        let buffer_info = vk::BufferCreateInfo::default()
            .size(descriptor.size)
            .usage(descriptor.usage.to_vk())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.create_buffer(&buffer_info, None) }
            .map_err(|e| GraphicsError::from_alloc(e, "buffer creation"))?;

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

        let allocation = memory::allocate(
            device,
            shared.memory_properties(),
            requirements,
            descriptor.memory.to_vk(),
        );
        let allocation = match allocation {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        if let Err(e) = unsafe { device.bind_buffer_memory(buffer, allocation, 0) } {
            unsafe {
                device.destroy_buffer(buffer, None);
                device.free_memory(allocation, None);
            }
            return Err(GraphicsError::from_alloc(e, "buffer memory bind"));
        }

        let id = shared.register_resource("buffer");
        log::trace!(
            "created buffer #{id} {:?}, size={}",
            descriptor.label,
            descriptor.size
        );

        Ok(Self {
            shared,
            id,
            buffer,
            memory: allocation,
            size: descriptor.size,
            usage: descriptor.usage,
            memory_flags: descriptor.memory,
            label: descriptor.label.clone(),
            mapped: Mutex::new(None),
            destroyed: AtomicBool::new(false),
        })
    }

    /// Get the buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Get the usage flags.
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Get the memory placement flags.
    pub fn memory_flags(&self) -> MemoryFlags {
        self.memory_flags
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Get the raw Vulkan buffer handle.
    pub fn raw(&self) -> vk::Buffer {
        self.buffer
    }

    /// Get the owning device core.
    pub fn device(&self) -> &Arc<DeviceShared> {
        &self.shared
    }

    fn ensure_alive(&self) -> Result<(), GraphicsError> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(GraphicsError::InvalidOperation(
                "buffer has been destroyed".to_string(),
            ));
        }
        Ok(())
    }

    /// Map the allocation into CPU address space.
    ///
    /// The mapping is scoped and non-reentrant: mapping twice without an
    /// intervening [`Buffer::unmap_memory`] fails.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::InvalidOperation`] when the memory is not
    /// host-visible or is already mapped.
    pub fn map_memory(&self) -> Result<*mut u8, GraphicsError> {
        self.ensure_alive()?;
        if !self.memory_flags.is_host_visible() {
            return Err(GraphicsError::InvalidOperation(
                "buffer memory is not host-visible".to_string(),
            ));
        }

        let mut mapped = self.mapped.lock();
        if mapped.is_some() {
            return Err(GraphicsError::InvalidOperation(
                "buffer memory is already mapped".to_string(),
            ));
        }

        let ptr = unsafe {
            self.shared.raw().map_memory(
                self.memory,
                0,
                vk::WHOLE_SIZE,
                vk::MemoryMapFlags::empty(),
            )
        }
        .map_err(|e| GraphicsError::from_alloc(e, "memory map"))? as *mut u8;

        *mapped = Some(ptr);
        Ok(ptr)
    }

    /// Unmap a previously mapped allocation.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::InvalidOperation`] when the memory is not mapped.
    pub fn unmap_memory(&self) -> Result<(), GraphicsError> {
        self.ensure_alive()?;
        let mut mapped = self.mapped.lock();
        if mapped.take().is_none() {
            return Err(GraphicsError::InvalidOperation(
                "buffer memory is not mapped".to_string(),
            ));
        }
        unsafe { self.shared.raw().unmap_memory(self.memory) };
        Ok(())
    }

    /// Make device writes visible before a CPU read of non-coherent memory.
    fn invalidate_if_needed(&self) -> Result<(), GraphicsError> {
        if self.memory_flags.contains(MemoryFlags::HOST_COHERENT) {
            return Ok(());
        }
        let range = vk::MappedMemoryRange::default()
            .memory(self.memory)
            .offset(0)
            .size(vk::WHOLE_SIZE);
        unsafe { self.shared.raw().invalidate_mapped_memory_ranges(&[range]) }
            .map_err(|e| GraphicsError::from_alloc(e, "memory invalidate"))
    }

    /// Make CPU writes visible to the device for non-coherent memory.
    fn flush_if_needed(&self) -> Result<(), GraphicsError> {
        if self.memory_flags.contains(MemoryFlags::HOST_COHERENT) {
            return Ok(());
        }
        let range = vk::MappedMemoryRange::default()
            .memory(self.memory)
            .offset(0)
            .size(vk::WHOLE_SIZE);
        unsafe { self.shared.raw().flush_mapped_memory_ranges(&[range]) }
            .map_err(|e| GraphicsError::from_alloc(e, "memory flush"))
    }

    /// Run `f` over the mapped bytes of `[offset, offset + len)`.
    ///
    /// Reuses an existing mapping when the caller holds one; otherwise maps
    /// for the duration of the call. Non-coherent memory is invalidated
    /// before and flushed after `f`.
    fn with_mapped<R>(
        &self,
        offset: u64,
        f: impl FnOnce(*mut u8) -> R,
    ) -> Result<R, GraphicsError> {
        let mapped = self.mapped.lock();
        if let Some(base) = *mapped {
            self.invalidate_if_needed()?;
            // SAFETY: offset was bounds-checked by the caller.
            let result = f(unsafe { base.add(offset as usize) });
            self.flush_if_needed()?;
            return Ok(result);
        }
        drop(mapped);

        let base = unsafe {
            self.shared.raw().map_memory(
                self.memory,
                0,
                vk::WHOLE_SIZE,
                vk::MemoryMapFlags::empty(),
            )
        }
        .map_err(|e| GraphicsError::from_alloc(e, "memory map"))? as *mut u8;

        if let Err(e) = self.invalidate_if_needed() {
            unsafe { self.shared.raw().unmap_memory(self.memory) };
            return Err(e);
        }
        // SAFETY: offset was bounds-checked by the caller.
        let result = f(unsafe { base.add(offset as usize) });
        let flushed = self.flush_if_needed();
        unsafe { self.shared.raw().unmap_memory(self.memory) };
        flushed?;
        Ok(result)
    }

    /// Write `data` at `offset` bytes into the buffer.
    ///
    /// Host-visible buffers are written through mapped memory. Device-local
    /// buffers with `COPY_DST` usage go through a staging buffer and a
    /// single-use command submission; the call blocks until the copy has
    /// executed on the GPU.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::OutOfRange`] when `offset + data.len()` exceeds the
    /// buffer size; [`GraphicsError::InvalidOperation`] when the buffer is
    /// neither host-visible nor a transfer destination.
    pub fn set_data(&self, offset: u64, data: &[u8]) -> Result<(), GraphicsError> {
        self.ensure_alive()?;
        check_range(offset, data.len() as u64, self.size)?;
        if data.is_empty() {
            return Ok(());
        }

        if self.memory_flags.is_host_visible() {
            self.with_mapped(offset, |dst| unsafe {
                std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
            })
        } else if self.usage.contains(BufferUsage::COPY_DST) {
            self.upload_via_staging(offset, data)
        } else {
            Err(GraphicsError::InvalidOperation(
                "buffer is neither host-visible nor a transfer destination".to_string(),
            ))
        }
    }

    /// Read `len` bytes starting at `offset`.
    ///
    /// Mirror of [`Buffer::set_data`]: mapped read for host-visible memory,
    /// staging readback for device-local buffers with `COPY_SRC` usage.
    pub fn get_data(&self, offset: u64, len: u64) -> Result<Vec<u8>, GraphicsError> {
        self.ensure_alive()?;
        check_range(offset, len, self.size)?;
        if len == 0 {
            return Ok(Vec::new());
        }

        if self.memory_flags.is_host_visible() {
            let mut result = vec![0u8; len as usize];
            self.with_mapped(offset, |src| unsafe {
                std::ptr::copy_nonoverlapping(src as *const u8, result.as_mut_ptr(), len as usize);
            })?;
            Ok(result)
        } else if self.usage.contains(BufferUsage::COPY_SRC) {
            self.readback_via_staging(offset, len)
        } else {
            Err(GraphicsError::InvalidOperation(
                "buffer is neither host-visible nor a transfer source".to_string(),
            ))
        }
    }

    fn upload_via_staging(&self, offset: u64, data: &[u8]) -> Result<(), GraphicsError> {
        let staging = Buffer::create(
            Arc::clone(&self.shared),
            &BufferDescriptor::staging(data.len() as u64).with_label("staging upload"),
        )?;
        staging.set_data(0, data)?;

        let cmd = self.shared.begin_single_time_commands()?;
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: offset,
            size: data.len() as u64,
        };
        unsafe {
            self.shared
                .raw()
                .cmd_copy_buffer(cmd, staging.raw(), self.buffer, &[region]);
        }
        self.shared.end_single_time_commands(cmd)?;

        staging.destroy();
        Ok(())
    }

    fn readback_via_staging(&self, offset: u64, len: u64) -> Result<Vec<u8>, GraphicsError> {
        let staging = Buffer::create(
            Arc::clone(&self.shared),
            &BufferDescriptor::readback(len).with_label("staging readback"),
        )?;

        let cmd = self.shared.begin_single_time_commands()?;
        let region = vk::BufferCopy {
            src_offset: offset,
            dst_offset: 0,
            size: len,
        };
        unsafe {
            self.shared
                .raw()
                .cmd_copy_buffer(cmd, self.buffer, staging.raw(), &[region]);
        }
        self.shared.end_single_time_commands(cmd)?;

        let result = staging.get_data(0, len)?;
        staging.destroy();
        Ok(result)
    }

    /// Destroy the buffer and free its memory.
    ///
    /// Unmaps first if still mapped, then removes the buffer from the
    /// device's tracked set. Calling this twice is a no-op.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }

        if self.mapped.lock().take().is_some() {
            unsafe { self.shared.raw().unmap_memory(self.memory) };
        }

        unsafe {
            self.shared.raw().destroy_buffer(self.buffer, None);
            self.shared.raw().free_memory(self.memory, None);
        }

        self.shared.unregister_resource(self.id);
        log::trace!("destroyed buffer #{}", self.id);
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("size", &self.size)
            .field("usage", &self.usage)
            .field("memory", &self.memory_flags)
            .field("label", &self.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(Buffer: Send, Sync);

/// A typed view over a [`Buffer`].
///
/// The element type must be plain data (`bytemuck::Pod`) so its bytes can
/// be copied verbatim to and from GPU memory. The total size in bytes is
/// `size_of::<T>() * len`.
pub struct TypedBuffer<T: Pod> {
    inner: Buffer,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod> TypedBuffer<T> {
    fn element_size() -> Result<u64, GraphicsError> {
        let size = std::mem::size_of::<T>() as u64;
        if size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "zero-sized element type".to_string(),
            ));
        }
        Ok(size)
    }

    /// Create a typed buffer from an explicit descriptor shape.
    ///
    /// `make_descriptor` receives the computed byte size.
    pub fn with_descriptor(
        device: &RenderDevice,
        len: usize,
        make_descriptor: impl FnOnce(u64) -> BufferDescriptor,
    ) -> Result<Self, GraphicsError> {
        let size = Self::element_size()? * len as u64;
        let inner = device.create_buffer(&make_descriptor(size))?;
        Ok(Self {
            inner,
            len,
            _marker: PhantomData,
        })
    }

    /// Create a device-local vertex buffer for `len` elements.
    pub fn vertex(device: &RenderDevice, len: usize) -> Result<Self, GraphicsError> {
        Self::with_descriptor(device, len, BufferDescriptor::vertex)
    }

    /// Create a device-local index buffer for `len` elements.
    pub fn index(device: &RenderDevice, len: usize) -> Result<Self, GraphicsError> {
        Self::with_descriptor(device, len, BufferDescriptor::index)
    }

    /// Create a host-visible uniform buffer for `len` elements.
    pub fn uniform(device: &RenderDevice, len: usize) -> Result<Self, GraphicsError> {
        Self::with_descriptor(device, len, BufferDescriptor::uniform)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds zero elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total size in bytes.
    pub fn size(&self) -> u64 {
        self.inner.size()
    }

    /// The underlying untyped buffer.
    pub fn buffer(&self) -> &Buffer {
        &self.inner
    }

    /// Write `elements` starting at element index `first`.
    pub fn set_data(&self, first: usize, elements: &[T]) -> Result<(), GraphicsError> {
        let offset = Self::element_size()? * first as u64;
        self.inner.set_data(offset, bytemuck::cast_slice(elements))
    }

    /// Read `count` elements starting at element index `first`.
    pub fn get_data(&self, first: usize, count: usize) -> Result<Vec<T>, GraphicsError> {
        let element_size = Self::element_size()?;
        let bytes = self
            .inner
            .get_data(element_size * first as u64, element_size * count as u64)?;
        // pod_collect_to_vec copies, so the byte vector's alignment does
        // not have to match T's.
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    /// Destroy the underlying buffer. Idempotent.
    pub fn destroy(&self) {
        self.inner.destroy();
    }
}

impl<T: Pod> std::fmt::Debug for TypedBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedBuffer")
            .field("len", &self.len)
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, 0, true)]
    #[case(0, 36, 36, true)]
    #[case(12, 24, 36, true)]
    #[case(12, 25, 36, false)]
    #[case(36, 1, 36, false)]
    #[case(u64::MAX, 2, 36, false)]
    fn test_check_range(
        #[case] offset: u64,
        #[case] len: u64,
        #[case] size: u64,
        #[case] ok: bool,
    ) {
        assert_eq!(check_range(offset, len, size).is_ok(), ok);
    }

    #[test]
    fn test_check_range_error_kind() {
        assert!(matches!(
            check_range(8, 16, 16),
            Err(GraphicsError::OutOfRange(_))
        ));
    }
}
