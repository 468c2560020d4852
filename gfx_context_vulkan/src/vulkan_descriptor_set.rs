/// VulkanDescriptorSet - Vulkan implementation of DescriptorSet
///
/// Each set owns a small pool sized by the caller and is allocated against
/// the pipeline's set 0 layout. Writes are tracked in `DescriptorWrites` so
/// binding an incomplete set fails before any command is recorded.

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_format::descriptor_type_to_vk;
use crate::vulkan_gpu_context::GpuContext;
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_result::VkResultExt;
use crate::vulkan_sampler::VulkanSampler;
use crate::vulkan_texture::image_of;
use ash::vk;
use gfx_context::gfx::{
    Buffer, DescriptorPoolSize, DescriptorSet, DescriptorWrites, Error, Pipeline3D,
    Result, SampledTexture, Sampler,
};
use std::any::Any;
use std::sync::Arc;

const SOURCE: &str = "gfx::vulkan::descriptor_set";

/// Native pool sizes, skipping empty entries
pub fn vk_pool_sizes(pool_sizes: &[DescriptorPoolSize]) -> Vec<vk::DescriptorPoolSize> {
    pool_sizes
        .iter()
        .filter(|size| size.count > 0)
        .map(|size| vk::DescriptorPoolSize {
            ty: descriptor_type_to_vk(size.descriptor_type),
            descriptor_count: size.count,
        })
        .collect()
}

pub struct VulkanDescriptorSet {
    ctx: Arc<GpuContext>,
    pool: vk::DescriptorPool,
    set: vk::DescriptorSet,
    writes: DescriptorWrites,
}

impl VulkanDescriptorSet {
    pub fn new(
        ctx: Arc<GpuContext>,
        pipeline: &VulkanPipeline,
        pool_sizes: &[DescriptorPoolSize],
    ) -> Result<Self> {
        let writes = DescriptorWrites::new(pipeline.bindings());
        let pool_sizes = DescriptorPoolSize::resolve(pool_sizes, pipeline.bindings());
        writes.check_pool(&pool_sizes)?;

        let device = ctx.device();
        let sizes = vk_pool_sizes(&pool_sizes);
        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&sizes)
            .max_sets(1);
        let pool = unsafe { device.create_descriptor_pool(&pool_info, None) }
            .native(SOURCE, "vkCreateDescriptorPool")?;

        let set_layouts = [pipeline.set_layout()];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&set_layouts);
        let set = match unsafe { device.allocate_descriptor_sets(&alloc_info) }
            .native(SOURCE, "vkAllocateDescriptorSets")
        {
            Ok(sets) => sets.into_iter().next(),
            Err(e) => {
                unsafe { device.destroy_descriptor_pool(pool, None) };
                return Err(e);
            }
        };
        let Some(set) = set else {
            unsafe { device.destroy_descriptor_pool(pool, None) };
            return Err(Error::BackendError(
                "vkAllocateDescriptorSets returned no set".to_string(),
            ));
        };

        Ok(Self {
            ctx,
            pool,
            set,
            writes,
        })
    }

    pub fn handle(&self) -> vk::DescriptorSet {
        self.set
    }
}

impl DescriptorSet for VulkanDescriptorSet {
    fn update_buffer(&mut self, binding: u32, buffer: &dyn Buffer) -> Result<()> {
        let vulkan_buffer = buffer
            .as_any()
            .downcast_ref::<VulkanBuffer>()
            .ok_or_else(|| {
                Error::InvalidResource("buffer was not created by the Vulkan context".to_string())
            })?;
        let descriptor_type = self.writes.record_buffer(binding, buffer)?;

        let buffer_info = vk::DescriptorBufferInfo::default()
            .buffer(vulkan_buffer.handle())
            .offset(0)
            .range(vk::WHOLE_SIZE);
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.set)
            .dst_binding(binding)
            .dst_array_element(0)
            .descriptor_type(descriptor_type_to_vk(descriptor_type))
            .buffer_info(std::slice::from_ref(&buffer_info));
        unsafe { self.ctx.device().update_descriptor_sets(&[write], &[]) };
        Ok(())
    }

    fn update_texture(
        &mut self,
        binding: u32,
        texture: SampledTexture<'_>,
        sampler: &dyn Sampler,
    ) -> Result<()> {
        let sampler = sampler
            .as_any()
            .downcast_ref::<VulkanSampler>()
            .ok_or_else(|| {
                Error::InvalidResource("sampler was not created by the Vulkan context".to_string())
            })?;
        let image = image_of(texture.as_any()).ok_or_else(|| {
            Error::InvalidResource("texture was not created by the Vulkan context".to_string())
        })?;
        self.writes.record_texture(binding, texture)?;

        let image_info = vk::DescriptorImageInfo::default()
            .sampler(sampler.handle())
            .image_view(image.view())
            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.set)
            .dst_binding(binding)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(std::slice::from_ref(&image_info));
        unsafe { self.ctx.device().update_descriptor_sets(&[write], &[]) };
        Ok(())
    }

    fn writes(&self) -> &DescriptorWrites {
        &self.writes
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanDescriptorSet {
    fn drop(&mut self) {
        // Frees the set with it
        unsafe {
            self.ctx.device().destroy_descriptor_pool(self.pool, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_descriptor_set_tests.rs"]
mod tests;
