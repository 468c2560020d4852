/// CompositeContext - Skia on Metal, 3D on Vulkan (MoltenVK)
///
/// Shared textures are exported from Vulkan into Metal; every other resource
/// is plain Vulkan.

use super::metal_context::{same_gpu_name, MetalContext};
use super::metal_shared_texture::MetalVulkanSharedTexture;
use crate::vulkan_context::VulkanContext;
use crate::vulkan_instance::VulkanInstance;
use ash::vk;
use gfx_context::gfx::{
    AttachmentView, Buffer, BufferUsage, DescriptorPoolSize, DescriptorSet, Error, Framebuffer3D,
    GpuInfo, GraphicsBackend, GraphicsContext, GraphicsDeviceInfo, MemoryProperty, Pipeline3D,
    PipelineDesc, RenderPass3D, RenderPassDesc, Result, Sampler, SamplerDesc, SharedTexture,
    Texture2D, TextureArray, TextureCube, TextureCubeArray, TextureFormat,
};
use gfx_context::{gfx_debug, gfx_warn};
use skia_safe::gpu::DirectContext;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const SOURCE: &str = "gfx::composite";

pub struct CompositeContext {
    vulkan: VulkanContext,
    metal: Arc<MetalContext>,
    disposed: AtomicBool,
}

impl CompositeContext {
    pub fn new(
        instance: Arc<VulkanInstance>,
        physical_device: vk::PhysicalDevice,
        selected: GraphicsDeviceInfo,
        available: Vec<GraphicsDeviceInfo>,
    ) -> Result<Self> {
        let metal = Arc::new(MetalContext::new()?);

        if !same_gpu_name(&selected.name, metal.device_name()) {
            gfx_warn!(
                SOURCE,
                "Vulkan selected '{}' but Metal uses '{}'; shared textures may cross devices",
                selected.name,
                metal.device_name()
            );
        }

        let vulkan = VulkanContext::create(
            instance,
            physical_device,
            selected,
            available,
            GraphicsBackend::Metal,
        )?;

        Ok(Self {
            vulkan,
            metal,
            disposed: AtomicBool::new(false),
        })
    }

    pub fn metal(&self) -> &Arc<MetalContext> {
        &self.metal
    }

    pub fn vulkan(&self) -> &VulkanContext {
        &self.vulkan
    }

    fn check_alive(&self, operation: &str) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(Error::ObjectDisposed(format!(
                "{} called on a disposed composite context",
                operation
            )));
        }
        Ok(())
    }
}

impl GraphicsContext for CompositeContext {
    fn backend(&self) -> GraphicsBackend {
        GraphicsBackend::Metal
    }

    fn skia_context(&self) -> Result<DirectContext> {
        self.check_alive("skia_context")?;
        self.metal.direct_context()
    }

    fn gpu_info(&self) -> &GpuInfo {
        self.vulkan.gpu_info()
    }

    fn create_texture(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn SharedTexture>> {
        self.check_alive("create_texture")?;
        let gpu = self.vulkan.gpu_context()?;
        Ok(Box::new(MetalVulkanSharedTexture::new(
            gpu,
            self.metal.clone(),
            width,
            height,
            format,
        )?))
    }

    fn create_texture_2d(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn Texture2D>> {
        self.vulkan.create_texture_2d(width, height, format)
    }

    fn create_texture_array(
        &self,
        width: u32,
        height: u32,
        array_size: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn TextureArray>> {
        self.vulkan.create_texture_array(width, height, array_size, format)
    }

    fn create_texture_cube(&self, size: u32, format: TextureFormat) -> Result<Box<dyn TextureCube>> {
        self.vulkan.create_texture_cube(size, format)
    }

    fn create_texture_cube_array(
        &self,
        size: u32,
        array_size: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn TextureCubeArray>> {
        self.vulkan.create_texture_cube_array(size, array_size, format)
    }

    fn create_buffer(
        &self,
        size: u64,
        usage: BufferUsage,
        memory: MemoryProperty,
    ) -> Result<Box<dyn Buffer>> {
        self.vulkan.create_buffer(size, usage, memory)
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Box<dyn Sampler>> {
        self.vulkan.create_sampler(desc)
    }

    fn create_render_pass_3d(&self, desc: &RenderPassDesc) -> Result<Box<dyn RenderPass3D>> {
        self.vulkan.create_render_pass_3d(desc)
    }

    fn create_framebuffer_3d(
        &self,
        render_pass: &dyn RenderPass3D,
        color_attachments: &[AttachmentView<'_>],
        depth_attachment: Option<AttachmentView<'_>>,
    ) -> Result<Box<dyn Framebuffer3D>> {
        self.vulkan
            .create_framebuffer_3d(render_pass, color_attachments, depth_attachment)
    }

    fn create_pipeline_3d(
        &self,
        render_pass: &dyn RenderPass3D,
        desc: &PipelineDesc,
    ) -> Result<Box<dyn Pipeline3D>> {
        self.vulkan.create_pipeline_3d(render_pass, desc)
    }

    fn create_descriptor_set(
        &self,
        pipeline: &dyn Pipeline3D,
        pool_sizes: &[DescriptorPoolSize],
    ) -> Result<Box<dyn DescriptorSet>> {
        self.vulkan.create_descriptor_set(pipeline, pool_sizes)
    }

    /// Vulkan first, then Metal
    fn wait_idle(&self) -> Result<()> {
        self.check_alive("wait_idle")?;
        self.vulkan.wait_idle()?;
        self.metal.wait_idle()
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.vulkan.dispose();
        self.metal.dispose();
        gfx_debug!(SOURCE, "Composite context disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Drop for CompositeContext {
    fn drop(&mut self) {
        self.dispose();
    }
}
