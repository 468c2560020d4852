//! Immediate command submission for transfers, layout transitions and passes
//!
//! Every submission is synchronous: reset the pool's fence, submit, wait on it,
//! free the command buffer. Consecutive submissions are additionally chained through
//! one semaphore so the queue orders them even when the host does not wait.

use crate::vulkan_format::to_vk_layout;
use crate::vulkan_result::VkResultExt;
use ash::vk;
use gfx_context::gfx::{Error, Result, TextureLayout};
use gfx_context::{gfx_debug, gfx_err};
use std::ops::Range;
use std::sync::Mutex;

const SOURCE: &str = "gfx::vulkan::command_pool";

/// Stage and access masks of one layout transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierMasks {
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
}

/// Masks for `old -> new`; unknown pairs get a full memory barrier
pub fn barrier_for(old: TextureLayout, new: TextureLayout) -> BarrierMasks {
    use TextureLayout as L;
    type S = vk::PipelineStageFlags;
    type A = vk::AccessFlags;

    let shader_stages = S::FRAGMENT_SHADER | S::COMPUTE_SHADER;
    let fragment_tests = S::EARLY_FRAGMENT_TESTS | S::LATE_FRAGMENT_TESTS;
    let depth_rw = A::DEPTH_STENCIL_ATTACHMENT_READ | A::DEPTH_STENCIL_ATTACHMENT_WRITE;

    let (src_stage, dst_stage, src_access, dst_access) = match (old, new) {
        (L::Undefined, L::ColorAttachment) => {
            (S::TOP_OF_PIPE, S::COLOR_ATTACHMENT_OUTPUT, A::empty(), A::COLOR_ATTACHMENT_WRITE)
        }
        (L::ColorAttachment, L::ShaderReadOnly) => {
            (S::COLOR_ATTACHMENT_OUTPUT, shader_stages, A::COLOR_ATTACHMENT_WRITE, A::SHADER_READ)
        }
        (L::ShaderReadOnly, L::ColorAttachment) => {
            (shader_stages, S::COLOR_ATTACHMENT_OUTPUT, A::SHADER_READ, A::COLOR_ATTACHMENT_WRITE)
        }
        (L::ColorAttachment, L::TransferSrc) => {
            (S::COLOR_ATTACHMENT_OUTPUT, S::TRANSFER, A::COLOR_ATTACHMENT_WRITE, A::TRANSFER_READ)
        }
        (L::TransferSrc, L::ColorAttachment) => {
            (S::TRANSFER, S::COLOR_ATTACHMENT_OUTPUT, A::TRANSFER_READ, A::COLOR_ATTACHMENT_WRITE)
        }
        (L::Undefined, L::DepthStencilAttachment) => {
            (S::TOP_OF_PIPE, fragment_tests, A::empty(), depth_rw)
        }
        (L::DepthStencilAttachment, L::ShaderReadOnly) => {
            (fragment_tests, S::FRAGMENT_SHADER, A::DEPTH_STENCIL_ATTACHMENT_WRITE, A::SHADER_READ)
        }
        (L::ShaderReadOnly, L::DepthStencilAttachment) => {
            (S::FRAGMENT_SHADER, fragment_tests, A::SHADER_READ, depth_rw)
        }
        (L::Undefined, L::TransferDst) => {
            (S::TOP_OF_PIPE, S::TRANSFER, A::empty(), A::TRANSFER_WRITE)
        }
        (L::TransferDst, L::ShaderReadOnly) => {
            (S::TRANSFER, S::FRAGMENT_SHADER, A::TRANSFER_WRITE, A::SHADER_READ)
        }
        _ => (
            S::ALL_COMMANDS,
            S::ALL_COMMANDS,
            A::MEMORY_WRITE,
            A::MEMORY_READ | A::MEMORY_WRITE,
        ),
    };

    BarrierMasks {
        src_stage,
        dst_stage,
        src_access,
        dst_access,
    }
}

/// Record one image barrier moving `layers` from `old` to `new`
pub fn record_layout_transition(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    aspect_mask: vk::ImageAspectFlags,
    layers: Range<u32>,
    old: TextureLayout,
    new: TextureLayout,
) {
    let masks = barrier_for(old, new);
    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(to_vk_layout(old))
        .new_layout(to_vk_layout(new))
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: layers.start,
            layer_count: layers.end - layers.start,
        })
        .src_access_mask(masks.src_access)
        .dst_access_mask(masks.dst_access);

    unsafe {
        device.cmd_pipeline_barrier(
            command_buffer,
            masks.src_stage,
            masks.dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}

struct SubmitState {
    /// The chain semaphore was signalled by the previous submission
    signal_pending: bool,
}

/// Command pool with one fence and one chaining semaphore
pub struct VulkanCommandPool {
    device: ash::Device,
    queue: vk::Queue,
    pool: vk::CommandPool,
    fence: vk::Fence,
    semaphore: vk::Semaphore,
    /// Serializes pool access and submissions
    state: Mutex<SubmitState>,
}

impl VulkanCommandPool {
    pub fn new(device: &ash::Device, queue: vk::Queue, queue_family: u32) -> Result<Self> {
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(
                vk::CommandPoolCreateFlags::TRANSIENT
                    | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            );

        unsafe {
            let pool = device
                .create_command_pool(&pool_info, None)
                .native(SOURCE, "vkCreateCommandPool")?;

            let fence = match device.create_fence(&vk::FenceCreateInfo::default(), None) {
                Ok(fence) => fence,
                Err(e) => {
                    device.destroy_command_pool(pool, None);
                    return Err(crate::vulkan_result::native_error(SOURCE, "vkCreateFence", e));
                }
            };

            let semaphore = match device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) {
                Ok(semaphore) => semaphore,
                Err(e) => {
                    device.destroy_fence(fence, None);
                    device.destroy_command_pool(pool, None);
                    return Err(crate::vulkan_result::native_error(SOURCE, "vkCreateSemaphore", e));
                }
            };

            gfx_debug!(SOURCE, "Command pool created for queue family {}", queue_family);

            Ok(Self {
                device: device.clone(),
                queue,
                pool,
                fence,
                semaphore,
                state: Mutex::new(SubmitState {
                    signal_pending: false,
                }),
            })
        }
    }

    /// Allocate a primary command buffer; hand it back via `submit_command_buffer`
    pub fn allocate_command_buffer(&self) -> Result<vk::CommandBuffer> {
        let _state = self
            .state
            .lock()
            .map_err(|_| Error::BackendError("command pool lock poisoned".to_string()))?;

        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let buffers = unsafe {
            self.device
                .allocate_command_buffers(&info)
                .native(SOURCE, "vkAllocateCommandBuffers")?
        };
        buffers
            .into_iter()
            .next()
            .ok_or_else(|| gfx_err!(SOURCE, "vkAllocateCommandBuffers returned no buffer"))
    }

    /// Submit a recorded command buffer, wait for it and free it
    pub fn submit_command_buffer(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::BackendError("command pool lock poisoned".to_string()))?;

        let command_buffers = [command_buffer];
        let semaphores = [self.semaphore];
        let wait_stages = [vk::PipelineStageFlags::ALL_COMMANDS];

        let mut submit_info = vk::SubmitInfo::default()
            .command_buffers(&command_buffers)
            .signal_semaphores(&semaphores);
        if state.signal_pending {
            submit_info = submit_info
                .wait_semaphores(&semaphores)
                .wait_dst_stage_mask(&wait_stages);
        }

        // The fence is reset before each submit, never after the wait
        let result = unsafe {
            self.device
                .reset_fences(&[self.fence])
                .native(SOURCE, "vkResetFences")
                .and_then(|_| {
                    self.device
                        .queue_submit(self.queue, &[submit_info], self.fence)
                        .native(SOURCE, "vkQueueSubmit")
                })
                .and_then(|_| {
                    state.signal_pending = true;
                    self.device
                        .wait_for_fences(&[self.fence], true, u64::MAX)
                        .native(SOURCE, "vkWaitForFences")
                })
        };

        unsafe {
            self.device.free_command_buffers(self.pool, &command_buffers);
        }
        result
    }

    /// Record with `record`, submit and wait
    pub fn submit_immediate<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let command_buffer = self.allocate_command_buffer()?;
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        let recorded = unsafe {
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .native(SOURCE, "vkBeginCommandBuffer")
                .and_then(|_| {
                    record(&self.device, command_buffer);
                    self.device
                        .end_command_buffer(command_buffer)
                        .native(SOURCE, "vkEndCommandBuffer")
                })
        };

        if let Err(e) = recorded {
            self.free(command_buffer);
            return Err(e);
        }
        self.submit_command_buffer(command_buffer)
    }

    /// Free a command buffer that will not be submitted
    pub fn free(&self, command_buffer: vk::CommandBuffer) {
        if let Ok(_state) = self.state.lock() {
            unsafe {
                self.device.free_command_buffers(self.pool, &[command_buffer]);
            }
        }
    }

    pub fn transition_image_layout(
        &self,
        image: vk::Image,
        aspect_mask: vk::ImageAspectFlags,
        layers: Range<u32>,
        old: TextureLayout,
        new: TextureLayout,
    ) -> Result<()> {
        if old == new {
            return Ok(());
        }
        self.submit_immediate(|device, cmd| {
            record_layout_transition(device, cmd, image, aspect_mask, layers, old, new);
        })
    }
}

impl Drop for VulkanCommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
            self.device.destroy_fence(self.fence, None);
            self.device.destroy_command_pool(self.pool, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_command_pool_tests.rs"]
mod tests;
