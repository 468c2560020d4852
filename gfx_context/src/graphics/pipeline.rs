/// 3D pipeline trait, pipeline descriptor and fixed-function state

use crate::error::{Error, Result};
use crate::graphics::render_pass::RenderPass3D;
use bitflags::bitflags;
use rustc_hash::FxHashSet;
use std::any::Any;

/// Push constant block size visible to vertex and fragment stages
pub const MAX_PUSH_CONSTANT_SIZE: u32 = 128;

/// Shader stage of a single shader module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

bitflags! {
    /// Stages a descriptor binding is visible to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
        const VERTEX_FRAGMENT = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

impl From<ShaderStage> for ShaderStages {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => ShaderStages::VERTEX,
            ShaderStage::Fragment => ShaderStages::FRAGMENT,
            ShaderStage::Compute => ShaderStages::COMPUTE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    UniformBuffer,
    StorageBuffer,
    CombinedImageSampler,
}

impl DescriptorType {
    pub fn is_buffer(&self) -> bool {
        matches!(self, DescriptorType::UniformBuffer | DescriptorType::StorageBuffer)
    }
}

/// One binding of descriptor set 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorBinding {
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    pub count: u32,
    pub stages: ShaderStages,
}

impl DescriptorBinding {
    pub fn new(binding: u32, descriptor_type: DescriptorType, stages: ShaderStages) -> Self {
        Self {
            binding,
            descriptor_type,
            count: 1,
            stages,
        }
    }
}

// ===== VERTEX INPUT =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float,
    Float2,
    Float3,
    Float4,
    UInt,
    Int,
    UByte4Norm,
}

impl VertexFormat {
    pub fn size_bytes(&self) -> u32 {
        match self {
            VertexFormat::Float | VertexFormat::UInt | VertexFormat::Int => 4,
            VertexFormat::Float2 => 8,
            VertexFormat::Float3 => 12,
            VertexFormat::Float4 => 16,
            VertexFormat::UByte4Norm => 4,
        }
    }
}

/// Vertex input rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexInputRate {
    /// Data is per-vertex
    Vertex,
    /// Data is per-instance
    Instance,
}

/// Vertex binding description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBinding {
    pub binding: u32,
    /// Stride in bytes between consecutive elements
    pub stride: u32,
    pub input_rate: VertexInputRate,
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute location in shader
    pub location: u32,
    pub binding: u32,
    pub format: VertexFormat,
    /// Offset in bytes from the start of the vertex
    pub offset: u32,
}

/// Vertex buffer layout; empty for full-screen passes generating vertices in the shader
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexInputDescription {
    pub bindings: Vec<VertexBinding>,
    pub attributes: Vec<VertexAttribute>,
}

// ===== RASTERIZATION / BLEND =====

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Front face winding order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

/// Blend factor for color blending equations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Blend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Blend equation applied to every color attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendState {
    pub src_color: BlendFactor,
    pub dst_color: BlendFactor,
    pub color_op: BlendOp,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub alpha_op: BlendOp,
}

impl BlendState {
    /// src * 1 + dst * 0 (blending enabled but equivalent to a write)
    pub const REPLACE: BlendState = BlendState {
        src_color: BlendFactor::One,
        dst_color: BlendFactor::Zero,
        color_op: BlendOp::Add,
        src_alpha: BlendFactor::One,
        dst_alpha: BlendFactor::Zero,
        alpha_op: BlendOp::Add,
    };

    pub const ALPHA_BLEND: BlendState = BlendState {
        src_color: BlendFactor::SrcAlpha,
        dst_color: BlendFactor::OneMinusSrcAlpha,
        color_op: BlendOp::Add,
        src_alpha: BlendFactor::One,
        dst_alpha: BlendFactor::OneMinusSrcAlpha,
        alpha_op: BlendOp::Add,
    };

    /// Light accumulation
    pub const ADDITIVE: BlendState = BlendState {
        src_color: BlendFactor::One,
        dst_color: BlendFactor::One,
        color_op: BlendOp::Add,
        src_alpha: BlendFactor::One,
        dst_alpha: BlendFactor::One,
        alpha_op: BlendOp::Add,
    };
}

// ===== PIPELINE DESC =====

/// Everything baked into an immutable 3D pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDesc {
    pub vertex_spirv: Vec<u32>,
    pub fragment_spirv: Vec<u32>,
    pub bindings: Vec<DescriptorBinding>,
    pub vertex_input: VertexInputDescription,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub depth_test: bool,
    pub depth_write: bool,
    /// None disables blending
    pub blend: Option<BlendState>,
}

impl PipelineDesc {
    /// Defaults: back-face culling, CCW front faces, depth test+write, no blending
    pub fn new(vertex_spirv: Vec<u32>, fragment_spirv: Vec<u32>) -> Self {
        Self {
            vertex_spirv,
            fragment_spirv,
            bindings: Vec::new(),
            vertex_input: VertexInputDescription::default(),
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            depth_test: true,
            depth_write: true,
            blend: None,
        }
    }

    pub fn with_bindings(mut self, bindings: Vec<DescriptorBinding>) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn with_vertex_input(mut self, vertex_input: VertexInputDescription) -> Self {
        self.vertex_input = vertex_input;
        self
    }

    pub fn with_blend(mut self, blend: BlendState) -> Self {
        self.blend = Some(blend);
        self
    }

    pub fn binding(&self, binding: u32) -> Option<&DescriptorBinding> {
        self.bindings.iter().find(|b| b.binding == binding)
    }

    /// Backend-independent checks run before any native object is created
    pub fn validate(&self) -> Result<()> {
        if self.vertex_spirv.is_empty() || self.fragment_spirv.is_empty() {
            return Err(Error::ValidationFailed(
                "pipeline needs both vertex and fragment SPIR-V".to_string(),
            ));
        }

        let mut seen = FxHashSet::default();
        for binding in &self.bindings {
            if !seen.insert(binding.binding) {
                return Err(Error::ValidationFailed(format!(
                    "descriptor binding {} declared twice",
                    binding.binding
                )));
            }
            if binding.count == 0 {
                return Err(Error::ValidationFailed(format!(
                    "descriptor binding {} has count 0",
                    binding.binding
                )));
            }
        }

        let vertex_bindings: FxHashSet<u32> =
            self.vertex_input.bindings.iter().map(|b| b.binding).collect();
        for attribute in &self.vertex_input.attributes {
            if !vertex_bindings.contains(&attribute.binding) {
                return Err(Error::ValidationFailed(format!(
                    "vertex attribute at location {} uses undeclared binding {}",
                    attribute.location, attribute.binding
                )));
            }
        }
        Ok(())
    }
}

/// Check a push constant payload against the pipeline's block
pub fn validate_push_constants(size: usize) -> Result<()> {
    if size == 0 || size > MAX_PUSH_CONSTANT_SIZE as usize || size % 4 != 0 {
        return Err(Error::ValidationFailed(format!(
            "push constants must be 4-byte aligned and 4..={} bytes, got {}",
            MAX_PUSH_CONSTANT_SIZE, size
        )));
    }
    Ok(())
}

// ===== PIPELINE TRAIT =====

/// Immutable graphics pipeline bound to one render pass layout
pub trait Pipeline3D: Send + Sync {
    /// Descriptor layout baked into the pipeline (set 0)
    fn bindings(&self) -> &[DescriptorBinding];

    fn color_attachment_count(&self) -> u32;

    fn push_constant_size(&self) -> u32 {
        MAX_PUSH_CONSTANT_SIZE
    }

    fn as_any(&self) -> &dyn Any;
}

impl dyn Pipeline3D + '_ {
    /// Push a plain-old-data value for the next draws of `pass`
    pub fn set_push_constants<T: bytemuck::Pod>(
        &self,
        pass: &mut dyn RenderPass3D,
        value: &T,
    ) -> Result<()> {
        pass.push_constants(self, bytemuck::bytes_of(value))
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
