/// VulkanContext - GraphicsContext on a single Vulkan device
///
/// Owns the shared `GpuContext` and, off macOS, the Skia Vulkan bridge.
/// Resources keep their own `Arc<GpuContext>`, so disposing the context only
/// drops its reference; the device goes away with the last resource.

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_descriptor_set::VulkanDescriptorSet;
use crate::vulkan_device::VulkanDevice;
use crate::vulkan_frame_buffer::VulkanFramebuffer;
use crate::vulkan_gpu_context::GpuContext;
use crate::vulkan_instance::VulkanInstance;
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_sampler::VulkanSampler;
use crate::vulkan_skia::SkiaBridge;
use crate::vulkan_texture::VulkanTexture2D;
use crate::vulkan_texture_layered::{VulkanTextureArray, VulkanTextureCube, VulkanTextureCubeArray};
use ash::vk;
use gfx_context::gfx::{
    AttachmentView, Buffer, BufferUsage, DescriptorPoolSize, DescriptorSet, Error, Framebuffer3D,
    GpuInfo, GraphicsBackend, GraphicsContext, GraphicsDeviceInfo, MemoryProperty, Pipeline3D,
    PipelineDesc, RenderPass3D, RenderPassDesc, Result, Sampler, SamplerDesc, SharedTexture,
    Texture2D, TextureArray, TextureCube, TextureCubeArray, TextureFormat,
};
use gfx_context::{gfx_debug, gfx_info, gfx_warn};
use skia_safe::gpu::DirectContext;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

const SOURCE: &str = "gfx::vulkan";

/// Snapshot logged once when a context is created
pub fn build_gpu_info(
    backend: GraphicsBackend,
    available: Vec<GraphicsDeviceInfo>,
    selected: &GraphicsDeviceInfo,
    instance_extensions: &[String],
    device_extensions: &[String],
) -> GpuInfo {
    let mut extensions: Vec<String> = instance_extensions.to_vec();
    for name in device_extensions {
        if !extensions.contains(name) {
            extensions.push(name.clone());
        }
    }
    GpuInfo {
        backend,
        available_gpus: available,
        selected_gpu: Some(selected.clone()),
        extensions,
        api_version: selected.api_version.clone(),
        memory: selected.memory,
    }
}

fn downcast<'a, T: 'static>(any: &'a dyn Any, what: &str) -> Result<&'a T> {
    any.downcast_ref::<T>().ok_or_else(|| {
        Error::InvalidResource(format!("{} was not created by the Vulkan context", what))
    })
}

pub struct VulkanContext {
    gpu: Mutex<Option<Arc<GpuContext>>>,
    skia: Option<Arc<SkiaBridge>>,
    gpu_info: GpuInfo,
    disposed: AtomicBool,
}

impl VulkanContext {
    /// Create the device on `physical_device`; run on the render thread
    pub fn new(
        instance: Arc<VulkanInstance>,
        physical_device: vk::PhysicalDevice,
        selected: GraphicsDeviceInfo,
        available: Vec<GraphicsDeviceInfo>,
    ) -> Result<Self> {
        Self::create(instance, physical_device, selected, available, GraphicsBackend::Vulkan)
    }

    /// `backend` is what the owning context reports in its `GpuInfo`
    pub(crate) fn create(
        instance: Arc<VulkanInstance>,
        physical_device: vk::PhysicalDevice,
        selected: GraphicsDeviceInfo,
        available: Vec<GraphicsDeviceInfo>,
        backend: GraphicsBackend,
    ) -> Result<Self> {
        let device = VulkanDevice::new(instance, physical_device, selected.clone())?;

        let gpu_info = build_gpu_info(
            backend,
            available,
            &selected,
            device.instance().enabled_extensions(),
            device.enabled_extensions(),
        );

        // Skia has no Vulkan backend on macOS
        let skia = if cfg!(target_os = "macos") {
            None
        } else {
            Some(Arc::new(SkiaBridge::new(&device)?))
        };

        let gpu = Arc::new(GpuContext::new(device)?);

        match gpu_info.to_json_pretty() {
            Ok(json) => gfx_info!(SOURCE, "GPU info:\n{}", json),
            Err(e) => gfx_warn!(SOURCE, "Could not serialize GPU info: {}", e),
        }

        Ok(Self {
            gpu: Mutex::new(Some(gpu)),
            skia,
            gpu_info,
            disposed: AtomicBool::new(false),
        })
    }

    /// The shared device state, for resources built outside this context
    pub fn gpu_context(&self) -> Result<Arc<GpuContext>> {
        self.gpu("gpu_context")
    }

    fn check_alive(&self, operation: &str) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(Error::ObjectDisposed(format!(
                "{} called on a disposed context",
                operation
            )));
        }
        Ok(())
    }

    fn gpu(&self, operation: &str) -> Result<Arc<GpuContext>> {
        self.check_alive(operation)?;
        self.gpu
            .lock()
            .map_err(|_| Error::BackendError("GPU context lock poisoned".to_string()))?
            .clone()
            .ok_or_else(|| Error::ObjectDisposed(format!("{} called on a disposed context", operation)))
    }
}

impl GraphicsContext for VulkanContext {
    fn backend(&self) -> GraphicsBackend {
        GraphicsBackend::Vulkan
    }

    fn skia_context(&self) -> Result<DirectContext> {
        self.check_alive("skia_context")?;
        match &self.skia {
            Some(skia) => skia.direct_context(),
            None => Err(Error::UnsupportedPlatform(
                "Skia has no Vulkan backend on this platform; use the composite context".to_string(),
            )),
        }
    }

    fn gpu_info(&self) -> &GpuInfo {
        &self.gpu_info
    }

    fn create_texture(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn SharedTexture>> {
        let gpu = self.gpu("create_texture")?;
        Ok(Box::new(VulkanTexture2D::new(gpu, width, height, format, self.skia.clone())?))
    }

    fn create_texture_2d(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn Texture2D>> {
        let gpu = self.gpu("create_texture_2d")?;
        Ok(Box::new(VulkanTexture2D::new(gpu, width, height, format, self.skia.clone())?))
    }

    fn create_texture_array(
        &self,
        width: u32,
        height: u32,
        array_size: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn TextureArray>> {
        let gpu = self.gpu("create_texture_array")?;
        Ok(Box::new(VulkanTextureArray::new(gpu, width, height, array_size, format)?))
    }

    fn create_texture_cube(&self, size: u32, format: TextureFormat) -> Result<Box<dyn TextureCube>> {
        let gpu = self.gpu("create_texture_cube")?;
        Ok(Box::new(VulkanTextureCube::new(gpu, size, format)?))
    }

    fn create_texture_cube_array(
        &self,
        size: u32,
        array_size: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn TextureCubeArray>> {
        let gpu = self.gpu("create_texture_cube_array")?;
        Ok(Box::new(VulkanTextureCubeArray::new(gpu, size, array_size, format)?))
    }

    fn create_buffer(
        &self,
        size: u64,
        usage: BufferUsage,
        memory: MemoryProperty,
    ) -> Result<Box<dyn Buffer>> {
        let gpu = self.gpu("create_buffer")?;
        Ok(Box::new(VulkanBuffer::new(gpu, size, usage, memory)?))
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Box<dyn Sampler>> {
        let gpu = self.gpu("create_sampler")?;
        Ok(Box::new(VulkanSampler::new(gpu, desc)?))
    }

    fn create_render_pass_3d(&self, desc: &RenderPassDesc) -> Result<Box<dyn RenderPass3D>> {
        let gpu = self.gpu("create_render_pass_3d")?;
        Ok(Box::new(VulkanRenderPass::new(gpu, desc)?))
    }

    fn create_framebuffer_3d(
        &self,
        render_pass: &dyn RenderPass3D,
        color_attachments: &[AttachmentView<'_>],
        depth_attachment: Option<AttachmentView<'_>>,
    ) -> Result<Box<dyn Framebuffer3D>> {
        let gpu = self.gpu("create_framebuffer_3d")?;
        let render_pass = downcast::<VulkanRenderPass>(render_pass.as_any(), "render pass")?;
        Ok(Box::new(VulkanFramebuffer::new(
            gpu,
            render_pass,
            color_attachments,
            depth_attachment,
        )?))
    }

    fn create_pipeline_3d(
        &self,
        render_pass: &dyn RenderPass3D,
        desc: &PipelineDesc,
    ) -> Result<Box<dyn Pipeline3D>> {
        let gpu = self.gpu("create_pipeline_3d")?;
        let render_pass = downcast::<VulkanRenderPass>(render_pass.as_any(), "render pass")?;
        Ok(Box::new(VulkanPipeline::new(gpu, render_pass, desc)?))
    }

    fn create_descriptor_set(
        &self,
        pipeline: &dyn Pipeline3D,
        pool_sizes: &[DescriptorPoolSize],
    ) -> Result<Box<dyn DescriptorSet>> {
        let gpu = self.gpu("create_descriptor_set")?;
        let pipeline = downcast::<VulkanPipeline>(pipeline.as_any(), "pipeline")?;
        Ok(Box::new(VulkanDescriptorSet::new(gpu, pipeline, pool_sizes)?))
    }

    fn wait_idle(&self) -> Result<()> {
        self.gpu("wait_idle")?.wait_idle()
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let gpu = match self.gpu.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => {
                gfx_warn!(SOURCE, "GPU context lock poisoned during dispose");
                None
            }
        };
        if let Some(gpu) = &gpu {
            if let Err(e) = gpu.wait_idle() {
                gfx_warn!(SOURCE, "wait_idle failed during dispose: {}", e);
            }
        }
        if let Some(skia) = &self.skia {
            skia.release();
        }
        drop(gpu);
        gfx_debug!(SOURCE, "Vulkan context disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
#[path = "vulkan_context_tests.rs"]
mod tests;
