/// VulkanRenderPass - Vulkan implementation of RenderPass3D
///
/// Owns the VkRenderPass (one subpass, N color attachments, optional depth)
/// and records one command buffer between `begin` and `end`. `end` submits
/// through the shared command pool and waits.

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_descriptor_set::VulkanDescriptorSet;
use crate::vulkan_format::{index_type_to_vk, load_op_to_vk, to_vk_format};
use crate::vulkan_frame_buffer::VulkanFramebuffer;
use crate::vulkan_gpu_context::GpuContext;
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_result::VkResultExt;
use ash::vk;
use gfx_context::gfx::{
    not_recording, validate_clear_colors, validate_push_constants, Buffer,
    BufferUsage, ClearColor, DescriptorSet, Error, Framebuffer3D, IndexType, Pipeline3D,
    RenderPass3D, RenderPassDesc, Result,
};
use gfx_context::gfx_trace;
use std::any::Any;
use std::sync::Arc;

const SOURCE: &str = "gfx::vulkan::render_pass";

/// Attachment descriptions: colors first, then depth
///
/// Attachments stay in their attachment layout across the pass
/// (initial = final), so the layout tracker needs no update on `end`.
pub fn attachment_descriptions(desc: &RenderPassDesc) -> Vec<vk::AttachmentDescription> {
    let color = desc.color_formats.iter().map(|format| {
        vk::AttachmentDescription::default()
            .format(to_vk_format(*format))
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(load_op_to_vk(desc.color_load_op))
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
    });

    let depth = desc.depth_format.map(|format| {
        let (stencil_load, stencil_store) = if format.has_stencil() {
            (load_op_to_vk(desc.depth_load_op), vk::AttachmentStoreOp::STORE)
        } else {
            (vk::AttachmentLoadOp::DONT_CARE, vk::AttachmentStoreOp::DONT_CARE)
        };
        vk::AttachmentDescription::default()
            .format(to_vk_format(format))
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(load_op_to_vk(desc.depth_load_op))
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(stencil_load)
            .stencil_store_op(stencil_store)
            .initial_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
    });

    color.chain(depth).collect()
}

/// Clear values in attachment order
pub fn clear_values(clear_colors: &[ClearColor], clear_depth: f32, has_depth: bool) -> Vec<vk::ClearValue> {
    let colors = clear_colors.iter().map(|c| vk::ClearValue {
        color: vk::ClearColorValue {
            float32: c.to_array(),
        },
    });
    let depth = has_depth.then_some(vk::ClearValue {
        depth_stencil: vk::ClearDepthStencilValue {
            depth: clear_depth,
            stencil: 0,
        },
    });
    colors.chain(depth).collect()
}

struct Recording {
    command_buffer: vk::CommandBuffer,
    pipeline_bound: bool,
    index_buffer_bound: bool,
    draws: u64,
}

pub struct VulkanRenderPass {
    ctx: Arc<GpuContext>,
    render_pass: vk::RenderPass,
    desc: RenderPassDesc,
    recording: Option<Recording>,
}

impl VulkanRenderPass {
    pub fn new(ctx: Arc<GpuContext>, desc: &RenderPassDesc) -> Result<Self> {
        desc.validate()?;

        let attachments = attachment_descriptions(desc);
        let color_refs: Vec<vk::AttachmentReference> = (0..desc.color_formats.len() as u32)
            .map(|attachment| vk::AttachmentReference {
                attachment,
                layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            })
            .collect();
        let depth_ref = vk::AttachmentReference {
            attachment: desc.color_formats.len() as u32,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs);
        if desc.depth_format.is_some() {
            subpass = subpass.depth_stencil_attachment(&depth_ref);
        }

        let stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
            | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stages)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(stages)
            .dst_access_mask(
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            );

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency));

        let render_pass = unsafe { ctx.device().create_render_pass(&create_info, None) }
            .native(SOURCE, "vkCreateRenderPass")?;

        Ok(Self {
            ctx,
            render_pass,
            desc: desc.clone(),
            recording: None,
        })
    }

    pub fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }

    pub(crate) fn desc_ref(&self) -> &RenderPassDesc {
        &self.desc
    }

    fn recording(&mut self, operation: &str) -> Result<&mut Recording> {
        self.recording
            .as_mut()
            .ok_or_else(|| not_recording(operation))
    }

    fn record_begin(
        &self,
        command_buffer: vk::CommandBuffer,
        framebuffer: &VulkanFramebuffer,
        clear_colors: &[ClearColor],
        clear_depth: f32,
    ) -> Result<()> {
        let device = self.ctx.device();
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { device.begin_command_buffer(command_buffer, &begin_info) }
            .native(SOURCE, "vkBeginCommandBuffer")?;

        let extent = vk::Extent2D {
            width: framebuffer.width(),
            height: framebuffer.height(),
        };
        let clears = clear_values(clear_colors, clear_depth, self.desc.depth_format.is_some());
        let pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(self.render_pass)
            .framebuffer(framebuffer.handle())
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clears);

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };

        unsafe {
            device.cmd_begin_render_pass(command_buffer, &pass_info, vk::SubpassContents::INLINE);
            device.cmd_set_viewport(command_buffer, 0, &[viewport]);
            device.cmd_set_scissor(command_buffer, 0, &[scissor]);
        }
        Ok(())
    }
}

fn downcast_pipeline(pipeline: &dyn Pipeline3D) -> Result<&VulkanPipeline> {
    pipeline
        .as_any()
        .downcast_ref::<VulkanPipeline>()
        .ok_or_else(|| Error::InvalidResource("pipeline was not created by the Vulkan context".to_string()))
}

fn downcast_buffer(buffer: &dyn Buffer) -> Result<&VulkanBuffer> {
    buffer
        .as_any()
        .downcast_ref::<VulkanBuffer>()
        .ok_or_else(|| Error::InvalidResource("buffer was not created by the Vulkan context".to_string()))
}

impl RenderPass3D for VulkanRenderPass {
    fn desc(&self) -> &RenderPassDesc {
        &self.desc
    }

    fn begin(
        &mut self,
        framebuffer: &dyn Framebuffer3D,
        clear_colors: &[ClearColor],
        clear_depth: f32,
    ) -> Result<()> {
        if self.recording.is_some() {
            return Err(Error::InvalidOperation(
                "begin called while the render pass is already recording".to_string(),
            ));
        }
        validate_clear_colors(self.desc.color_formats.len(), clear_colors.len())?;

        let framebuffer = framebuffer
            .as_any()
            .downcast_ref::<VulkanFramebuffer>()
            .ok_or_else(|| {
                Error::InvalidResource("framebuffer was not created by the Vulkan context".to_string())
            })?;
        if !framebuffer.is_compatible(&self.desc) {
            return Err(Error::ValidationFailed(
                "framebuffer is not compatible with this render pass".to_string(),
            ));
        }
        framebuffer.check_layouts()?;

        let command_buffer = self.ctx.command_pool().allocate_command_buffer()?;
        if let Err(e) = self.record_begin(command_buffer, framebuffer, clear_colors, clear_depth) {
            self.ctx.command_pool().free(command_buffer);
            return Err(e);
        }

        self.recording = Some(Recording {
            command_buffer,
            pipeline_bound: false,
            index_buffer_bound: false,
            draws: 0,
        });
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &dyn Pipeline3D) -> Result<()> {
        let expected = self.desc.color_formats.len() as u32;
        let ctx = self.ctx.clone();
        let recording = self.recording("bind_pipeline")?;
        let pipeline = downcast_pipeline(pipeline)?;
        if pipeline.color_attachment_count() != expected {
            return Err(Error::ValidationFailed(format!(
                "pipeline writes {} color attachments, render pass has {}",
                pipeline.color_attachment_count(),
                expected
            )));
        }
        unsafe {
            ctx.device().cmd_bind_pipeline(
                recording.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.handle(),
            );
        }
        recording.pipeline_bound = true;
        Ok(())
    }

    fn bind_descriptor_set(&mut self, pipeline: &dyn Pipeline3D, set: &dyn DescriptorSet) -> Result<()> {
        let ctx = self.ctx.clone();
        let recording = self.recording("bind_descriptor_set")?;
        if !recording.pipeline_bound {
            return Err(Error::InvalidOperation(
                "bind_descriptor_set before bind_pipeline".to_string(),
            ));
        }
        set.writes().validate_for_bind()?;

        let pipeline = downcast_pipeline(pipeline)?;
        let set = set
            .as_any()
            .downcast_ref::<VulkanDescriptorSet>()
            .ok_or_else(|| {
                Error::InvalidResource("descriptor set was not created by the Vulkan context".to_string())
            })?;
        unsafe {
            ctx.device().cmd_bind_descriptor_sets(
                recording.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.layout(),
                0,
                &[set.handle()],
                &[],
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, binding: u32, buffer: &dyn Buffer) -> Result<()> {
        let ctx = self.ctx.clone();
        let recording = self.recording("bind_vertex_buffer")?;
        if !buffer.usage().contains(BufferUsage::VERTEX) {
            return Err(Error::ValidationFailed(
                "buffer bound as vertex buffer lacks VERTEX usage".to_string(),
            ));
        }
        let buffer = downcast_buffer(buffer)?;
        unsafe {
            ctx.device()
                .cmd_bind_vertex_buffers(recording.command_buffer, binding, &[buffer.handle()], &[0]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, index_type: IndexType) -> Result<()> {
        let ctx = self.ctx.clone();
        let recording = self.recording("bind_index_buffer")?;
        if !buffer.usage().contains(BufferUsage::INDEX) {
            return Err(Error::ValidationFailed(
                "buffer bound as index buffer lacks INDEX usage".to_string(),
            ));
        }
        let buffer = downcast_buffer(buffer)?;
        unsafe {
            ctx.device().cmd_bind_index_buffer(
                recording.command_buffer,
                buffer.handle(),
                0,
                index_type_to_vk(index_type),
            );
        }
        recording.index_buffer_bound = true;
        Ok(())
    }

    fn push_constants(&mut self, pipeline: &dyn Pipeline3D, data: &[u8]) -> Result<()> {
        let ctx = self.ctx.clone();
        let recording = self.recording("push_constants")?;
        validate_push_constants(data.len())?;
        if data.len() > pipeline.push_constant_size() as usize {
            return Err(Error::ValidationFailed(format!(
                "{} bytes of push constants exceed the pipeline's {} byte block",
                data.len(),
                pipeline.push_constant_size()
            )));
        }
        let pipeline = downcast_pipeline(pipeline)?;
        unsafe {
            ctx.device().cmd_push_constants(
                recording.command_buffer,
                pipeline.layout(),
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                0,
                data,
            );
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32) -> Result<()> {
        let ctx = self.ctx.clone();
        let recording = self.recording("draw")?;
        if !recording.pipeline_bound {
            return Err(Error::InvalidOperation("draw without a bound pipeline".to_string()));
        }
        unsafe {
            ctx.device()
                .cmd_draw(recording.command_buffer, vertex_count, instance_count, 0, 0);
        }
        recording.draws += 1;
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32) -> Result<()> {
        let ctx = self.ctx.clone();
        let recording = self.recording("draw_indexed")?;
        if !recording.pipeline_bound {
            return Err(Error::InvalidOperation(
                "draw_indexed without a bound pipeline".to_string(),
            ));
        }
        if !recording.index_buffer_bound {
            return Err(Error::InvalidOperation(
                "draw_indexed without an index buffer".to_string(),
            ));
        }
        unsafe {
            ctx.device()
                .cmd_draw_indexed(recording.command_buffer, index_count, instance_count, 0, 0, 0);
        }
        recording.draws += 1;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let recording = self.recording.take().ok_or_else(|| not_recording("end"))?;
        let device = self.ctx.device();
        let pool = self.ctx.command_pool();

        unsafe {
            device.cmd_end_render_pass(recording.command_buffer);
        }
        if let Err(e) = unsafe { device.end_command_buffer(recording.command_buffer) }
            .native(SOURCE, "vkEndCommandBuffer")
        {
            pool.free(recording.command_buffer);
            return Err(e);
        }
        pool.submit_command_buffer(recording.command_buffer)?;

        gfx_trace!(SOURCE, "Render pass submitted with {} draws", recording.draws);
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanRenderPass {
    fn drop(&mut self) {
        if let Some(recording) = self.recording.take() {
            // Abandoned between begin and end: never submitted
            self.ctx.command_pool().free(recording.command_buffer);
        }
        unsafe {
            self.ctx.device().destroy_render_pass(self.render_pass, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_render_pass_tests.rs"]
mod tests;
