/// VulkanBuffer - Vulkan implementation of the Buffer trait
///
/// Host-visible buffers stay persistently mapped by the allocator and are
/// written in place. Device-local buffers are filled and read back through a
/// temporary `StagingBuffer`.

use crate::vulkan_format::buffer_usage_to_vk;
use crate::vulkan_gpu_context::GpuContext;
use crate::vulkan_result::VkResultExt;
use ash::vk;
use gfx_context::gfx::{check_buffer_range, Buffer, BufferUsage, Error, MemoryProperty, Result};
use gfx_context::gfx_trace;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::any::Any;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const SOURCE: &str = "gfx::vulkan::buffer";

/// Allocator location for the requested memory properties
pub fn memory_location(memory: MemoryProperty) -> MemoryLocation {
    if !memory.is_host_visible() {
        MemoryLocation::GpuOnly
    } else if memory.contains(MemoryProperty::HOST_CACHED) {
        MemoryLocation::GpuToCpu
    } else {
        MemoryLocation::CpuToGpu
    }
}

/// Native usage flags; device-local buffers also need both transfer directions
pub fn vk_buffer_usage(usage: BufferUsage, memory: MemoryProperty) -> vk::BufferUsageFlags {
    let flags = buffer_usage_to_vk(usage);
    if memory.is_host_visible() {
        flags
    } else {
        flags | vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST
    }
}

/// Create a buffer and bind fresh memory to it
fn create_raw_buffer(
    ctx: &GpuContext,
    name: &str,
    size: u64,
    usage: vk::BufferUsageFlags,
    location: MemoryLocation,
) -> Result<(vk::Buffer, Allocation)> {
    let device = ctx.device();
    let create_info = vk::BufferCreateInfo::default()
        .size(size)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);

    let buffer = unsafe { device.create_buffer(&create_info, None) }.native(SOURCE, "vkCreateBuffer")?;
    let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

    let allocation = match ctx.allocate(&AllocationCreateDesc {
        name,
        requirements,
        location,
        linear: true,
        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
    }) {
        Ok(allocation) => allocation,
        Err(e) => {
            unsafe { device.destroy_buffer(buffer, None) };
            return Err(e);
        }
    };

    let bound = unsafe { device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) }
        .native(SOURCE, "vkBindBufferMemory");
    if let Err(e) = bound {
        ctx.free(allocation);
        unsafe { device.destroy_buffer(buffer, None) };
        return Err(e);
    }

    Ok((buffer, allocation))
}

fn mapped_ptr(allocation: Option<&Allocation>) -> Result<NonNull<u8>> {
    allocation
        .and_then(|a| a.mapped_ptr())
        .map(|ptr| ptr.cast::<u8>())
        .ok_or_else(|| Error::NullHandle("buffer memory is not mapped".to_string()))
}

// ============================================================================
// STAGING
// ============================================================================

/// Short-lived host-visible buffer used for copies to and from the GPU
pub(crate) struct StagingBuffer {
    ctx: Arc<GpuContext>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
}

impl StagingBuffer {
    /// Staging buffer for uploads (CPU writes, GPU reads)
    pub(crate) fn for_upload(ctx: &Arc<GpuContext>, data: &[u8]) -> Result<Self> {
        let staging = Self::new(
            ctx,
            "staging upload",
            data.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
        )?;
        let ptr = mapped_ptr(staging.allocation.as_ref())?;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr(), data.len());
        }
        Ok(staging)
    }

    /// Staging buffer for readbacks (GPU writes, CPU reads)
    pub(crate) fn for_download(ctx: &Arc<GpuContext>, size: u64) -> Result<Self> {
        Self::new(
            ctx,
            "staging download",
            size,
            vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuToCpu,
        )
    }

    fn new(
        ctx: &Arc<GpuContext>,
        name: &str,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
    ) -> Result<Self> {
        let (buffer, allocation) = create_raw_buffer(ctx, name, size, usage, location)?;
        Ok(Self {
            ctx: ctx.clone(),
            buffer,
            allocation: Some(allocation),
            size,
        })
    }

    pub(crate) fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Copy the whole buffer out; call after the GPU copy has completed
    pub(crate) fn read_all(&self) -> Result<Vec<u8>> {
        let ptr = mapped_ptr(self.allocation.as_ref())?;
        let mut data = vec![0u8; self.size as usize];
        unsafe {
            std::ptr::copy_nonoverlapping(ptr.as_ptr(), data.as_mut_ptr(), data.len());
        }
        Ok(data)
    }
}

impl Drop for StagingBuffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
        }
        unsafe {
            self.ctx.device().destroy_buffer(self.buffer, None);
        }
    }
}

// ============================================================================
// BUFFER
// ============================================================================

pub struct VulkanBuffer {
    ctx: Arc<GpuContext>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
    usage: BufferUsage,
    memory: MemoryProperty,
    mapped: AtomicBool,
}

impl VulkanBuffer {
    pub fn new(
        ctx: Arc<GpuContext>,
        size: u64,
        usage: BufferUsage,
        memory: MemoryProperty,
    ) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidResource("buffer size must be non-zero".to_string()));
        }
        if usage.is_empty() {
            return Err(Error::InvalidResource("buffer usage must not be empty".to_string()));
        }

        let (buffer, allocation) = create_raw_buffer(
            &ctx,
            "buffer",
            size,
            vk_buffer_usage(usage, memory),
            memory_location(memory),
        )?;

        gfx_trace!(SOURCE, "Created {} byte buffer ({:?}, {:?})", size, usage, memory);

        Ok(Self {
            ctx,
            buffer,
            allocation: Some(allocation),
            size,
            usage,
            memory,
            mapped: AtomicBool::new(false),
        })
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    fn check_unmapped(&self, operation: &str) -> Result<()> {
        if self.mapped.load(Ordering::Acquire) {
            return Err(Error::InvalidOperation(format!(
                "{} on a mapped buffer",
                operation
            )));
        }
        Ok(())
    }

    fn copy_from_staging(&self, staging: &StagingBuffer, offset: u64, len: u64) -> Result<()> {
        let (src, dst) = (staging.handle(), self.buffer);
        self.ctx.command_pool().submit_immediate(|device, cmd| unsafe {
            let region = vk::BufferCopy {
                src_offset: 0,
                dst_offset: offset,
                size: len,
            };
            device.cmd_copy_buffer(cmd, src, dst, &[region]);
        })
    }

    fn copy_to_staging(&self, staging: &StagingBuffer, offset: u64, len: u64) -> Result<()> {
        let (src, dst) = (self.buffer, staging.handle());
        self.ctx.command_pool().submit_immediate(|device, cmd| unsafe {
            let region = vk::BufferCopy {
                src_offset: offset,
                dst_offset: 0,
                size: len,
            };
            device.cmd_copy_buffer(cmd, src, dst, &[region]);
        })
    }
}

impl Buffer for VulkanBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn memory_properties(&self) -> MemoryProperty {
        self.memory
    }

    fn upload(&self, offset: u64, data: &[u8]) -> Result<()> {
        check_buffer_range(self.size, offset, data.len() as u64)?;
        self.check_unmapped("upload")?;
        if data.is_empty() {
            return Ok(());
        }

        if self.memory.is_host_visible() {
            let ptr = mapped_ptr(self.allocation.as_ref())?;
            unsafe {
                std::ptr::copy_nonoverlapping(
                    data.as_ptr(),
                    ptr.as_ptr().add(offset as usize),
                    data.len(),
                );
            }
            return Ok(());
        }

        let staging = StagingBuffer::for_upload(&self.ctx, data)?;
        self.copy_from_staging(&staging, offset, data.len() as u64)
    }

    fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        check_buffer_range(self.size, offset, len)?;
        self.check_unmapped("read")?;
        if len == 0 {
            return Ok(Vec::new());
        }

        if self.memory.is_host_visible() {
            // Host writes from earlier GPU work are visible once the queue drained
            self.ctx.wait_idle()?;
            let ptr = mapped_ptr(self.allocation.as_ref())?;
            let mut data = vec![0u8; len as usize];
            unsafe {
                std::ptr::copy_nonoverlapping(
                    ptr.as_ptr().add(offset as usize),
                    data.as_mut_ptr(),
                    data.len(),
                );
            }
            return Ok(data);
        }

        let staging = StagingBuffer::for_download(&self.ctx, len)?;
        self.copy_to_staging(&staging, offset, len)?;
        staging.read_all()
    }

    fn map_raw(&self) -> Result<NonNull<u8>> {
        if !self.memory.is_host_visible() {
            return Err(Error::InvalidOperation(
                "only host-visible buffers can be mapped".to_string(),
            ));
        }
        if self
            .mapped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::InvalidOperation("buffer is already mapped".to_string()));
        }
        mapped_ptr(self.allocation.as_ref()).inspect_err(|_| {
            self.mapped.store(false, Ordering::Release);
        })
    }

    fn unmap(&self) {
        self.mapped.store(false, Ordering::Release);
    }

    fn is_mapped(&self) -> bool {
        self.mapped.load(Ordering::Acquire)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
        }
        unsafe {
            self.ctx.device().destroy_buffer(self.buffer, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_buffer_tests.rs"]
mod tests;
