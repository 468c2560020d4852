/*!
# gfx_context_vulkan - native backends for gfx_context

Vulkan implementation of the `gfx_context` traits, built on ash for the
bindings and gpu-allocator for memory. On macOS the Vulkan device runs on
MoltenVK and the composite context adds a Metal device for Skia, sharing
textures through `VK_EXT_metal_objects`.

```no_run
use gfx_context::gfx::ContextConfig;
use gfx_context_vulkan::gfx::create_factory;

let factory = create_factory(ContextConfig::default());
if let Some(context) = factory.get_or_create_shared()? {
    println!("{}", context.gpu_info().to_json_pretty()?);
}
factory.shutdown()?;
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

// Loader and driver discovery
mod vulkan_macos_setup;
mod vulkan_setup;

// Core Vulkan objects
mod debug;
mod vulkan_command_pool;
mod vulkan_device;
mod vulkan_format;
mod vulkan_gpu_context;
mod vulkan_instance;
mod vulkan_result;
mod vulkan_skia;

// Resources
mod vulkan_buffer;
mod vulkan_descriptor_set;
mod vulkan_frame_buffer;
mod vulkan_image;
mod vulkan_pipeline;
mod vulkan_render_pass;
mod vulkan_sampler;
mod vulkan_texture;
mod vulkan_texture_layered;

// Contexts
mod vulkan_backend;
mod vulkan_context;

#[cfg(target_os = "macos")]
pub mod metal;

// Main gfx namespace module
pub mod gfx {
    pub use crate::vulkan_backend::{
        create_factory, resolve_context_kind, NativeContextBackend, ResolvedKind,
    };
    pub use crate::vulkan_context::VulkanContext;
    pub use crate::vulkan_gpu_context::GpuContext;
    pub use crate::vulkan_instance::VulkanInstance;
    pub use crate::vulkan_macos_setup::{MacOSVulkanSetup, MoltenVkLocation};
    pub use crate::vulkan_setup::{EnvUpdate, VulkanSetup};

    // Resources
    pub use crate::vulkan_buffer::VulkanBuffer;
    pub use crate::vulkan_descriptor_set::VulkanDescriptorSet;
    pub use crate::vulkan_frame_buffer::VulkanFramebuffer;
    pub use crate::vulkan_pipeline::VulkanPipeline;
    pub use crate::vulkan_render_pass::VulkanRenderPass;
    pub use crate::vulkan_sampler::VulkanSampler;
    pub use crate::vulkan_texture::{VulkanSharedTexture, VulkanTexture2D};
    pub use crate::vulkan_texture_layered::{
        VulkanTextureArray, VulkanTextureCube, VulkanTextureCubeArray,
    };

    #[cfg(target_os = "macos")]
    pub use crate::metal::{CompositeContext, MetalContext, MetalVulkanSharedTexture};

    // Validation statistics
    pub use crate::debug::{print_validation_stats_report, validation_stats, ValidationStats};
}

pub use gfx::create_factory;
