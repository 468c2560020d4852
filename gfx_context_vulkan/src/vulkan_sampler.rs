/// VulkanSampler - immutable VkSampler built from a SamplerDesc

use crate::vulkan_format::{address_mode_to_vk, filter_to_vk, mipmap_mode_to_vk};
use crate::vulkan_gpu_context::GpuContext;
use crate::vulkan_result::VkResultExt;
use ash::vk;
use gfx_context::gfx::{Result, Sampler, SamplerAddressMode, SamplerDesc};
use std::any::Any;
use std::sync::Arc;

const SOURCE: &str = "gfx::vulkan::sampler";

/// Native create info for `desc`; single mip level, no anisotropy, no compare
pub fn sampler_create_info(desc: &SamplerDesc) -> vk::SamplerCreateInfo<'static> {
    let uses_border = [desc.address_u, desc.address_v, desc.address_w]
        .contains(&SamplerAddressMode::ClampToBorder);

    vk::SamplerCreateInfo::default()
        .mag_filter(filter_to_vk(desc.mag_filter))
        .min_filter(filter_to_vk(desc.min_filter))
        .mipmap_mode(mipmap_mode_to_vk(desc.min_filter))
        .address_mode_u(address_mode_to_vk(desc.address_u))
        .address_mode_v(address_mode_to_vk(desc.address_v))
        .address_mode_w(address_mode_to_vk(desc.address_w))
        .mip_lod_bias(0.0)
        .min_lod(0.0)
        .max_lod(vk::LOD_CLAMP_NONE)
        .border_color(if uses_border {
            vk::BorderColor::FLOAT_TRANSPARENT_BLACK
        } else {
            vk::BorderColor::FLOAT_OPAQUE_BLACK
        })
        .anisotropy_enable(false)
        .max_anisotropy(1.0)
        .compare_enable(false)
        .compare_op(vk::CompareOp::ALWAYS)
        .unnormalized_coordinates(false)
}

pub struct VulkanSampler {
    ctx: Arc<GpuContext>,
    sampler: vk::Sampler,
    desc: SamplerDesc,
}

impl VulkanSampler {
    pub fn new(ctx: Arc<GpuContext>, desc: &SamplerDesc) -> Result<Self> {
        let sampler = unsafe { ctx.device().create_sampler(&sampler_create_info(desc), None) }
            .native(SOURCE, "vkCreateSampler")?;
        Ok(Self {
            ctx,
            sampler,
            desc: *desc,
        })
    }

    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Sampler for VulkanSampler {
    fn desc(&self) -> &SamplerDesc {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanSampler {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device().destroy_sampler(self.sampler, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_sampler_tests.rs"]
mod tests;
