/// VulkanFramebuffer - Vulkan implementation of Framebuffer3D
///
/// Wraps a VkFramebuffer over per-layer views of the attached textures and
/// remembers each attachment's layout tracker so `begin` can check layouts.
/// The attached textures must outlive the framebuffer.

use crate::vulkan_gpu_context::GpuContext;
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_result::VkResultExt;
use crate::vulkan_texture::image_of;
use ash::vk;
use gfx_context::gfx::{
    validate_framebuffer_attachments, AttachmentView, Error, Framebuffer3D, LayoutTracker,
    RenderPassDesc, Result, TextureLayout,
};
use std::any::Any;
use std::sync::Arc;

const SOURCE: &str = "gfx::vulkan::framebuffer";

/// One attached layer and the layout it must be in during the pass
#[derive(Clone)]
pub struct FramebufferAttachment {
    pub tracker: Arc<LayoutTracker>,
    pub layer: u32,
    pub required: TextureLayout,
}

impl FramebufferAttachment {
    pub fn expect_layout(&self, what: &str) -> Result<()> {
        self.tracker
            .expect(self.layer..self.layer + 1, self.required, what)
    }
}

pub struct VulkanFramebuffer {
    ctx: Arc<GpuContext>,
    framebuffer: vk::Framebuffer,
    width: u32,
    height: u32,
    desc: RenderPassDesc,
    colors: Vec<FramebufferAttachment>,
    depth: Option<FramebufferAttachment>,
}

impl VulkanFramebuffer {
    pub fn new(
        ctx: Arc<GpuContext>,
        render_pass: &VulkanRenderPass,
        color_attachments: &[AttachmentView<'_>],
        depth_attachment: Option<AttachmentView<'_>>,
    ) -> Result<Self> {
        let desc = render_pass.desc_ref();
        let (width, height) =
            validate_framebuffer_attachments(desc, color_attachments, depth_attachment.as_ref())?;

        let mut views = Vec::with_capacity(color_attachments.len() + 1);
        let mut attach = |view: &AttachmentView<'_>| -> Result<FramebufferAttachment> {
            let image = image_of(view.as_any()).ok_or_else(|| {
                Error::InvalidResource("attachment was not created by the Vulkan context".to_string())
            })?;
            views.push(image.layer_view(view.layer_index())?);
            Ok(FramebufferAttachment {
                tracker: view.layout_tracker().clone(),
                layer: view.layer_index(),
                required: view.required_layout(),
            })
        };
        let colors = color_attachments
            .iter()
            .map(&mut attach)
            .collect::<Result<Vec<_>>>()?;
        let depth = depth_attachment.as_ref().map(&mut attach).transpose()?;

        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.handle())
            .attachments(&views)
            .width(width)
            .height(height)
            .layers(1);
        let framebuffer = unsafe { ctx.device().create_framebuffer(&create_info, None) }
            .native(SOURCE, "vkCreateFramebuffer")?;

        Ok(Self {
            ctx,
            framebuffer,
            width,
            height,
            desc: desc.clone(),
            colors,
            depth,
        })
    }

    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }

    /// Same attachment formats as `desc`, hence usable with that render pass
    pub fn is_compatible(&self, desc: &RenderPassDesc) -> bool {
        self.desc.color_formats == desc.color_formats && self.desc.depth_format == desc.depth_format
    }

    /// Fail unless every attachment is in its attachment layout
    pub fn check_layouts(&self) -> Result<()> {
        for (index, attachment) in self.colors.iter().enumerate() {
            attachment.expect_layout(&format!("color attachment {}", index))?;
        }
        if let Some(depth) = &self.depth {
            depth.expect_layout("depth attachment")?;
        }
        Ok(())
    }
}

impl Framebuffer3D for VulkanFramebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn color_attachment_count(&self) -> u32 {
        self.colors.len() as u32
    }

    fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanFramebuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device().destroy_framebuffer(self.framebuffer, None);
        }
    }
}
