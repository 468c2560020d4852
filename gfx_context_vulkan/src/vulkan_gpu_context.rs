/// GpuContext - Shared GPU state for all Vulkan resources
///
/// Contains everything a resource needs after creation:
/// - Device and queue for Vulkan API calls
/// - Allocator for memory management
/// - Command pool for immediate submissions
///
/// Every resource holds an `Arc<GpuContext>`, so the device outlives the last
/// texture or buffer even if the owning context was disposed first.

use crate::vulkan_command_pool::VulkanCommandPool;
use crate::vulkan_device::VulkanDevice;
use gfx_context::gfx::{Error, Result};
use gfx_context::gfx_debug;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, Allocator, AllocatorCreateDesc};
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};

const SOURCE: &str = "gfx::vulkan";

pub struct GpuContext {
    /// Dropped before the device is destroyed
    allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Dropped before the device is destroyed
    command_pool: ManuallyDrop<VulkanCommandPool>,

    device: VulkanDevice,
}

impl GpuContext {
    pub fn new(device: VulkanDevice) -> Result<Self> {
        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: device.instance().handle().clone(),
            device: device.handle().clone(),
            physical_device: device.physical_device(),
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| {
            gfx_context::gfx_error!(SOURCE, "Failed to create GPU allocator: {:?}", e);
            Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
        })?;

        let command_pool =
            VulkanCommandPool::new(device.handle(), device.queue(), device.queue_family())?;

        Ok(Self {
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            command_pool: ManuallyDrop::new(command_pool),
            device,
        })
    }

    pub fn device(&self) -> &ash::Device {
        self.device.handle()
    }

    pub fn vulkan_device(&self) -> &VulkanDevice {
        &self.device
    }

    pub fn command_pool(&self) -> &VulkanCommandPool {
        &self.command_pool
    }

    pub fn queue_family(&self) -> u32 {
        self.device.queue_family()
    }

    pub fn lock_allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| Error::BackendError("allocator lock poisoned".to_string()))
    }

    /// Allocate memory, mapping exhaustion to `OutOfMemory`
    pub fn allocate(&self, desc: &AllocationCreateDesc<'_>) -> Result<Allocation> {
        self.lock_allocator()?.allocate(desc).map_err(|e| {
            let size_mb = desc.requirements.size as f64 / (1024.0 * 1024.0);
            gfx_context::gfx_error!(SOURCE, "Allocation '{}' failed ({:.2} MB): {:?}", desc.name, size_mb, e);
            match e {
                gpu_allocator::AllocationError::OutOfMemory => Error::OutOfMemory,
                other => Error::BackendError(format!("Allocation '{}' failed: {:?}", desc.name, other)),
            }
        })
    }

    /// Return memory to the allocator; never fails
    pub fn free(&self, allocation: Allocation) {
        if let Ok(mut allocator) = self.allocator.lock() {
            allocator.free(allocation).ok();
        }
    }

    pub fn wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().device_wait_idle().ok();
            ManuallyDrop::drop(&mut self.command_pool);
            ManuallyDrop::drop(&mut self.allocator);
        }
        gfx_debug!(SOURCE, "GPU context released");
    }
}
