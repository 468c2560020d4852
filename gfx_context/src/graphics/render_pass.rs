/// Render pass and framebuffer traits with multiple render targets

use crate::error::{Error, Result};
use crate::graphics::buffer::Buffer;
use crate::graphics::descriptor_set::DescriptorSet;
use crate::graphics::format::TextureFormat;
use crate::graphics::pipeline::Pipeline3D;
use std::any::Any;

/// What happens to an attachment's contents when the pass begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentLoadOp {
    Load,
    Clear,
    DontCare,
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Linear RGBA clear value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ClearColor {
    pub const TRANSPARENT: ClearColor = ClearColor::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: ClearColor = ClearColor::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: ClearColor = ClearColor::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Rounded 8-bit RGBA, as stored in an Rgba8Unorm target
    pub fn to_rgba8(&self) -> [u8; 4] {
        self.to_array()
            .map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}

impl From<glam::Vec4> for ClearColor {
    fn from(v: glam::Vec4) -> Self {
        Self::new(v.x, v.y, v.z, v.w)
    }
}

/// Attachment formats and load behaviour of a render pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPassDesc {
    pub color_formats: Vec<TextureFormat>,
    pub depth_format: Option<TextureFormat>,
    pub color_load_op: AttachmentLoadOp,
    pub depth_load_op: AttachmentLoadOp,
}

impl RenderPassDesc {
    /// Clear every attachment
    pub fn new(color_formats: Vec<TextureFormat>, depth_format: Option<TextureFormat>) -> Self {
        Self {
            color_formats,
            depth_format,
            color_load_op: AttachmentLoadOp::Clear,
            depth_load_op: AttachmentLoadOp::Clear,
        }
    }

    pub fn with_load_ops(mut self, color: AttachmentLoadOp, depth: AttachmentLoadOp) -> Self {
        self.color_load_op = color;
        self.depth_load_op = depth;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.color_formats.is_empty() && self.depth_format.is_none() {
            return Err(Error::ValidationFailed(
                "render pass needs at least one attachment".to_string(),
            ));
        }
        if let Some(format) = self.color_formats.iter().find(|f| f.is_depth()) {
            return Err(Error::ValidationFailed(format!(
                "{:?} cannot be a color attachment",
                format
            )));
        }
        if let Some(format) = self.depth_format.filter(|f| !f.is_depth()) {
            return Err(Error::ValidationFailed(format!(
                "{:?} cannot be a depth attachment",
                format
            )));
        }
        Ok(())
    }
}

/// One clear color is required per color attachment
pub fn validate_clear_colors(expected: usize, given: usize) -> Result<()> {
    if expected != given {
        return Err(Error::ValidationFailed(format!(
            "render pass has {} color attachments but {} clear colors were given",
            expected, given
        )));
    }
    Ok(())
}

/// Immutable set of attachments tied to one render pass layout
pub trait Framebuffer3D: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn color_attachment_count(&self) -> u32;
    fn has_depth(&self) -> bool;
    fn as_any(&self) -> &dyn Any;
}

/// Render pass with command recording
///
/// `begin` .. `end` records one command buffer; `end` submits it and waits.
pub trait RenderPass3D: Send + Sync {
    fn desc(&self) -> &RenderPassDesc;

    /// Start recording into `framebuffer`
    ///
    /// `clear_colors` must hold exactly one entry per color attachment, and
    /// every attachment must be in its attachment layout.
    fn begin(
        &mut self,
        framebuffer: &dyn Framebuffer3D,
        clear_colors: &[ClearColor],
        clear_depth: f32,
    ) -> Result<()>;

    fn bind_pipeline(&mut self, pipeline: &dyn Pipeline3D) -> Result<()>;

    /// Bind a fully populated set whose sampled textures are ShaderReadOnly
    fn bind_descriptor_set(
        &mut self,
        pipeline: &dyn Pipeline3D,
        set: &dyn DescriptorSet,
    ) -> Result<()>;

    fn bind_vertex_buffer(&mut self, binding: u32, buffer: &dyn Buffer) -> Result<()>;

    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, index_type: IndexType) -> Result<()>;

    /// Raw push constant bytes; see `<dyn Pipeline3D>::set_push_constants`
    fn push_constants(&mut self, pipeline: &dyn Pipeline3D, data: &[u8]) -> Result<()>;

    fn draw(&mut self, vertex_count: u32, instance_count: u32) -> Result<()>;

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32) -> Result<()>;

    /// Finish recording, submit and wait for completion
    fn end(&mut self) -> Result<()>;

    fn is_recording(&self) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// Error returned by recording calls outside begin/end
pub fn not_recording(operation: &str) -> Error {
    Error::InvalidOperation(format!("{} called outside begin/end", operation))
}

#[cfg(test)]
#[path = "render_pass_tests.rs"]
mod tests;
