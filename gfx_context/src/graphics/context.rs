/// The graphics context trait: root of every GPU resource

use crate::error::{Error, Result};
use crate::graphics::buffer::{Buffer, BufferUsage, MemoryProperty};
use crate::graphics::descriptor_set::{DescriptorPoolSize, DescriptorSet};
use crate::graphics::format::TextureFormat;
use crate::graphics::gpu_info::GpuInfo;
use crate::graphics::pipeline::{Pipeline3D, PipelineDesc};
use crate::graphics::render_pass::{Framebuffer3D, RenderPass3D, RenderPassDesc};
use crate::graphics::sampler::{Sampler, SamplerDesc};
use crate::graphics::texture::{
    AttachmentView, SharedTexture, Texture2D, TextureArray, TextureCube, TextureCubeArray,
};
use serde::{Deserialize, Serialize};
use skia_safe::gpu::DirectContext;
use std::fmt;

/// Native API a context wraps
///
/// The composite context reports Metal: Skia renders through Metal there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphicsBackend {
    Vulkan,
    Metal,
}

impl fmt::Display for GraphicsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsBackend::Vulkan => f.write_str("Vulkan"),
            GraphicsBackend::Metal => f.write_str("Metal"),
        }
    }
}

/// Backend-agnostic GPU context
///
/// Resources created here must be dropped before the context is disposed.
/// All calls are synchronous for the caller; `wait_idle` is the only explicit
/// barrier. Construction, teardown and Skia access belong to the render thread.
pub trait GraphicsContext: Send + Sync {
    fn backend(&self) -> GraphicsBackend;

    /// Skia GPU context for the 2D layer
    ///
    /// Fails on the Vulkan context on macOS (no Skia Vulkan backend there),
    /// after dispose, and off the render thread.
    fn skia_context(&self) -> Result<DirectContext>;

    /// Snapshot captured at creation
    fn gpu_info(&self) -> &GpuInfo;

    /// Texture shared between the 2D layer and the 3D pipeline
    fn create_texture(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn SharedTexture>>;

    fn create_texture_2d(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn Texture2D>>;

    fn create_texture_array(
        &self,
        width: u32,
        height: u32,
        array_size: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn TextureArray>>;

    fn create_texture_cube(&self, size: u32, format: TextureFormat) -> Result<Box<dyn TextureCube>>;

    fn create_texture_cube_array(
        &self,
        size: u32,
        array_size: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn TextureCubeArray>>;

    fn create_buffer(
        &self,
        size: u64,
        usage: BufferUsage,
        memory: MemoryProperty,
    ) -> Result<Box<dyn Buffer>>;

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Box<dyn Sampler>>;

    fn create_render_pass_3d(&self, desc: &RenderPassDesc) -> Result<Box<dyn RenderPass3D>>;

    /// Framebuffer for `render_pass`; attachments must match its formats in order
    fn create_framebuffer_3d(
        &self,
        render_pass: &dyn RenderPass3D,
        color_attachments: &[AttachmentView<'_>],
        depth_attachment: Option<AttachmentView<'_>>,
    ) -> Result<Box<dyn Framebuffer3D>>;

    fn create_pipeline_3d(
        &self,
        render_pass: &dyn RenderPass3D,
        desc: &PipelineDesc,
    ) -> Result<Box<dyn Pipeline3D>>;

    /// Descriptor set laid out like `pipeline`'s bindings, with its own pool
    fn create_descriptor_set(
        &self,
        pipeline: &dyn Pipeline3D,
        pool_sizes: &[DescriptorPoolSize],
    ) -> Result<Box<dyn DescriptorSet>>;

    /// Block until the GPU has finished all submitted work
    fn wait_idle(&self) -> Result<()>;

    /// Release native objects; later calls are no-ops
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// Check a framebuffer's attachments against a render pass description
pub fn validate_framebuffer_attachments(
    desc: &RenderPassDesc,
    color_attachments: &[AttachmentView<'_>],
    depth_attachment: Option<&AttachmentView<'_>>,
) -> Result<(u32, u32)> {
    if color_attachments.len() != desc.color_formats.len() {
        return Err(Error::ValidationFailed(format!(
            "render pass declares {} color attachments, framebuffer got {}",
            desc.color_formats.len(),
            color_attachments.len()
        )));
    }
    if depth_attachment.is_some() != desc.depth_format.is_some() {
        return Err(Error::ValidationFailed(
            "depth attachment does not match the render pass".to_string(),
        ));
    }

    let mut extent: Option<(u32, u32)> = None;
    let formats = desc
        .color_formats
        .iter()
        .copied()
        .map(Some)
        .chain(std::iter::once(desc.depth_format).filter(Option::is_some));
    let views = color_attachments.iter().chain(depth_attachment);

    for (index, (view, expected)) in views.zip(formats).enumerate() {
        if Some(view.format()) != expected {
            return Err(Error::ValidationFailed(format!(
                "attachment {} is {:?}, render pass expects {:?}",
                index,
                view.format(),
                expected
            )));
        }
        let size = (view.width(), view.height());
        match extent {
            None => extent = Some(size),
            Some(e) if e != size => {
                return Err(Error::ValidationFailed(format!(
                    "attachment {} is {}x{}, expected {}x{}",
                    index, size.0, size.1, e.0, e.1
                )))
            }
            _ => {}
        }
    }

    extent.ok_or_else(|| Error::ValidationFailed("framebuffer without attachments".to_string()))
}
