//! Single-use command buffer helpers.
//!
//! Every CPU-to-GPU upload and copy in this crate runs through one
//! transient command buffer that is submitted and waited on before control
//! returns to the caller. This trades batching efficiency for a simple
//! contract: by the time [`DeviceShared::end_single_time_commands`] returns,
//! the GPU side effects are visible.

use ash::vk;

use crate::error::{AllocationError, GraphicsError};

use super::DeviceShared;

impl DeviceShared {
    /// Allocate a transient command buffer from the pool and begin
    /// recording with ONE_TIME_SUBMIT.
    pub fn begin_single_time_commands(&self) -> Result<vk::CommandBuffer, GraphicsError> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let buffers = unsafe { self.device.allocate_command_buffers(&alloc_info) }
            .map_err(|e| GraphicsError::from_alloc(e, "command buffer allocation"))?;
        let cmd = buffers[0];

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        if let Err(e) = unsafe { self.device.begin_command_buffer(cmd, &begin_info) } {
            unsafe { self.device.free_command_buffers(self.command_pool, &buffers) };
            return Err(GraphicsError::Allocation(AllocationError::CreationFailed(
                format!("begin command buffer: {e:?}"),
            )));
        }

        Ok(cmd)
    }

    /// End recording, submit to the graphics queue, block until the queue
    /// is idle, then free the command buffer.
    ///
    /// The command buffer is freed on every path, including submission
    /// failure. A hung queue hangs the calling thread; no timeout is
    /// modeled.
    pub fn end_single_time_commands(&self, cmd: vk::CommandBuffer) -> Result<(), GraphicsError> {
        let result = self.submit_and_wait(cmd);
        unsafe { self.device.free_command_buffers(self.command_pool, &[cmd]) };
        result
    }

    fn submit_and_wait(&self, cmd: vk::CommandBuffer) -> Result<(), GraphicsError> {
        unsafe { self.device.end_command_buffer(cmd) }
            .map_err(|e| self.map_queue_error(e, "end command buffer"))?;

        let buffers = [cmd];
        let submit_info = vk::SubmitInfo::default().command_buffers(&buffers);

        unsafe {
            self.device
                .queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
        }
        .map_err(|e| self.map_queue_error(e, "queue submit"))?;

        unsafe { self.device.queue_wait_idle(self.graphics_queue) }
            .map_err(|e| self.map_queue_error(e, "queue wait idle"))?;

        Ok(())
    }

    fn map_queue_error(&self, result: vk::Result, what: &str) -> GraphicsError {
        if result == vk::Result::ERROR_DEVICE_LOST {
            self.events.fire_device_lost();
        }
        GraphicsError::from_alloc(result, what)
    }
}
