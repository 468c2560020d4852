/// VulkanPipeline - Vulkan implementation of Pipeline3D
///
/// Both shader stages are reflected with spirq before anything native is
/// created: every descriptor a shader reads must be declared in the pipeline
/// descriptor with a compatible type, and push constant blocks must fit the
/// 128 byte range shared by the vertex and fragment stages.

use crate::vulkan_format::{
    blend_factor_to_vk, blend_op_to_vk, cull_mode_to_vk, descriptor_type_to_vk,
    front_face_to_vk, input_rate_to_vk, stages_to_vk, vertex_format_to_vk,
};
use crate::vulkan_gpu_context::GpuContext;
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_result::VkResultExt;
use ash::vk;
use gfx_context::gfx::{
    BlendState, DescriptorBinding, DescriptorType, Error, Pipeline3D, PipelineDesc, Result,
    ShaderStage, ShaderStages, MAX_PUSH_CONSTANT_SIZE,
};
use gfx_context::{gfx_debug, gfx_warn};
use std::any::Any;
use std::ffi::CStr;
use std::sync::Arc;

const SOURCE: &str = "gfx::vulkan::pipeline";

const SPIRV_MAGIC: u32 = 0x0723_0203;
const ENTRY_POINT: &CStr = c"main";

// ===== REFLECTION =====

/// A descriptor a shader stage reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedDescriptor {
    pub set: u32,
    pub binding: u32,
    /// None when the shader uses a descriptor kind the context cannot bind
    pub descriptor_type: Option<DescriptorType>,
}

/// What one shader stage expects from the pipeline layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderReflection {
    pub stage: ShaderStage,
    pub descriptors: Vec<ReflectedDescriptor>,
    /// Largest push constant block, 0 when the stage has none
    pub push_constant_size: u32,
}

fn reflected_descriptor_type(desc_ty: &spirq::ty::DescriptorType) -> Option<DescriptorType> {
    use spirq::ty::DescriptorType as Spirq;
    match desc_ty {
        Spirq::UniformBuffer() => Some(DescriptorType::UniformBuffer),
        Spirq::StorageBuffer(..) => Some(DescriptorType::StorageBuffer),
        Spirq::CombinedImageSampler() | Spirq::SampledImage() | Spirq::Sampler() => {
            Some(DescriptorType::CombinedImageSampler)
        }
        _ => None,
    }
}

/// Parse a SPIR-V module and collect its descriptors and push constant size
pub fn reflect_shader(code: &[u32], stage: ShaderStage) -> Result<ShaderReflection> {
    if code.first() != Some(&SPIRV_MAGIC) {
        return Err(Error::ValidationFailed(format!(
            "{:?} shader is not SPIR-V",
            stage
        )));
    }

    let entry_points = spirq::ReflectConfig::new()
        .spv(code)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| {
            Error::ValidationFailed(format!("{:?} shader reflection failed: {:?}", stage, e))
        })?;

    let mut reflection = ShaderReflection {
        stage,
        descriptors: Vec::new(),
        push_constant_size: 0,
    };

    for entry_point in &entry_points {
        for var in entry_point.vars.iter() {
            match var {
                spirq::var::Variable::Descriptor {
                    desc_bind, desc_ty, ..
                } => {
                    let descriptor = ReflectedDescriptor {
                        set: desc_bind.set(),
                        binding: desc_bind.bind(),
                        descriptor_type: reflected_descriptor_type(desc_ty),
                    };
                    if !reflection.descriptors.contains(&descriptor) {
                        reflection.descriptors.push(descriptor);
                    }
                }
                spirq::var::Variable::PushConstant { ty, .. } => {
                    let size = ty.nbyte().unwrap_or(0) as u32;
                    reflection.push_constant_size = reflection.push_constant_size.max(size);
                }
                _ => {}
            }
        }
    }

    Ok(reflection)
}

fn rejected(message: String) -> Error {
    gfx_warn!(SOURCE, "{}", message);
    Error::ValidationFailed(message)
}

/// Check a stage's expectations against the declared descriptor layout
pub fn validate_reflection(
    reflection: &ShaderReflection,
    bindings: &[DescriptorBinding],
) -> Result<()> {
    let stage = reflection.stage;

    if reflection.push_constant_size > MAX_PUSH_CONSTANT_SIZE {
        return Err(rejected(format!(
            "{:?} shader push constants use {} bytes, the limit is {}",
            stage,
            reflection.push_constant_size,
            MAX_PUSH_CONSTANT_SIZE
        )));
    }

    for descriptor in &reflection.descriptors {
        if descriptor.set != 0 {
            return Err(rejected(format!(
                "{:?} shader reads set {} binding {}; only set 0 is available",
                stage,
                descriptor.set,
                descriptor.binding
            )));
        }

        let Some(reflected_type) = descriptor.descriptor_type else {
            return Err(rejected(format!(
                "{:?} shader binding {} has an unsupported descriptor type",
                stage,
                descriptor.binding
            )));
        };

        let Some(declared) = bindings.iter().find(|b| b.binding == descriptor.binding) else {
            return Err(rejected(format!(
                "{:?} shader reads binding {} which the pipeline does not declare",
                stage,
                descriptor.binding
            )));
        };

        if declared.descriptor_type != reflected_type {
            return Err(rejected(format!(
                "binding {} is declared {:?} but the {:?} shader reads {:?}",
                descriptor.binding,
                declared.descriptor_type,
                stage,
                reflected_type
            )));
        }

        if !declared.stages.contains(ShaderStages::from(stage)) {
            return Err(rejected(format!(
                "binding {} is not visible to the {:?} stage",
                descriptor.binding,
                stage
            )));
        }
    }
    Ok(())
}

// ===== FIXED STATE =====

/// One blend state per color attachment
pub fn color_blend_attachments(
    blend: Option<BlendState>,
    color_attachment_count: u32,
) -> Vec<vk::PipelineColorBlendAttachmentState> {
    let attachment = match blend {
        Some(state) => vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(true)
            .src_color_blend_factor(blend_factor_to_vk(state.src_color))
            .dst_color_blend_factor(blend_factor_to_vk(state.dst_color))
            .color_blend_op(blend_op_to_vk(state.color_op))
            .src_alpha_blend_factor(blend_factor_to_vk(state.src_alpha))
            .dst_alpha_blend_factor(blend_factor_to_vk(state.dst_alpha))
            .alpha_blend_op(blend_op_to_vk(state.alpha_op)),
        None => vk::PipelineColorBlendAttachmentState::default().blend_enable(false),
    }
    .color_write_mask(vk::ColorComponentFlags::RGBA);

    vec![attachment; color_attachment_count as usize]
}

pub fn set_layout_bindings(bindings: &[DescriptorBinding]) -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
    bindings
        .iter()
        .map(|binding| {
            vk::DescriptorSetLayoutBinding::default()
                .binding(binding.binding)
                .descriptor_type(descriptor_type_to_vk(binding.descriptor_type))
                .descriptor_count(binding.count)
                .stage_flags(stages_to_vk(binding.stages))
        })
        .collect()
}

/// Push constant range shared by every pipeline
pub fn push_constant_range() -> vk::PushConstantRange {
    vk::PushConstantRange {
        stage_flags: vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
        offset: 0,
        size: MAX_PUSH_CONSTANT_SIZE,
    }
}

// ===== PIPELINE =====

pub struct VulkanPipeline {
    ctx: Arc<GpuContext>,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    set_layout: vk::DescriptorSetLayout,
    bindings: Vec<DescriptorBinding>,
    color_attachment_count: u32,
}

impl VulkanPipeline {
    pub fn new(ctx: Arc<GpuContext>, render_pass: &VulkanRenderPass, desc: &PipelineDesc) -> Result<Self> {
        desc.validate()?;
        for (code, stage) in [
            (&desc.vertex_spirv, ShaderStage::Vertex),
            (&desc.fragment_spirv, ShaderStage::Fragment),
        ] {
            validate_reflection(&reflect_shader(code, stage)?, &desc.bindings)?;
        }

        let device = ctx.device();
        let color_attachment_count = render_pass.desc_ref().color_formats.len() as u32;

        let layout_bindings = set_layout_bindings(&desc.bindings);
        let set_layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&layout_bindings);
        let set_layout = unsafe { device.create_descriptor_set_layout(&set_layout_info, None) }
            .native(SOURCE, "vkCreateDescriptorSetLayout")?;

        let set_layouts = [set_layout];
        let push_ranges = [push_constant_range()];
        let layout_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&push_ranges);
        let layout = match unsafe { device.create_pipeline_layout(&layout_info, None) }
            .native(SOURCE, "vkCreatePipelineLayout")
        {
            Ok(layout) => layout,
            Err(e) => {
                unsafe { device.destroy_descriptor_set_layout(set_layout, None) };
                return Err(e);
            }
        };

        let pipeline = Self::create_pipeline(&ctx, render_pass.handle(), layout, desc, color_attachment_count);
        let pipeline = match pipeline {
            Ok(pipeline) => pipeline,
            Err(e) => {
                unsafe {
                    device.destroy_pipeline_layout(layout, None);
                    device.destroy_descriptor_set_layout(set_layout, None);
                }
                return Err(e);
            }
        };

        gfx_debug!(
            SOURCE,
            "Pipeline created: {} bindings, {} color attachments",
            desc.bindings.len(),
            color_attachment_count
        );

        Ok(Self {
            ctx,
            pipeline,
            layout,
            set_layout,
            bindings: desc.bindings.clone(),
            color_attachment_count,
        })
    }

    fn create_shader_module(ctx: &GpuContext, code: &[u32]) -> Result<vk::ShaderModule> {
        let info = vk::ShaderModuleCreateInfo::default().code(code);
        unsafe { ctx.device().create_shader_module(&info, None) }.native(SOURCE, "vkCreateShaderModule")
    }

    fn create_pipeline(
        ctx: &GpuContext,
        render_pass: vk::RenderPass,
        layout: vk::PipelineLayout,
        desc: &PipelineDesc,
        color_attachment_count: u32,
    ) -> Result<vk::Pipeline> {
        let device = ctx.device();
        let vertex_module = Self::create_shader_module(ctx, &desc.vertex_spirv)?;
        let fragment_module = match Self::create_shader_module(ctx, &desc.fragment_spirv) {
            Ok(module) => module,
            Err(e) => {
                unsafe { device.destroy_shader_module(vertex_module, None) };
                return Err(e);
            }
        };

        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_module)
                .name(ENTRY_POINT),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment_module)
                .name(ENTRY_POINT),
        ];

        let vertex_bindings: Vec<vk::VertexInputBindingDescription> = desc
            .vertex_input
            .bindings
            .iter()
            .map(|binding| vk::VertexInputBindingDescription {
                binding: binding.binding,
                stride: binding.stride,
                input_rate: input_rate_to_vk(binding.input_rate),
            })
            .collect();
        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc
            .vertex_input
            .attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: attribute.binding,
                format: vertex_format_to_vk(attribute.format),
                offset: attribute.offset,
            })
            .collect();
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Viewport and scissor are set per pass
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(cull_mode_to_vk(desc.cull_mode))
            .front_face(front_face_to_vk(desc.front_face))
            .depth_bias_enable(false);

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(desc.depth_test)
            .depth_write_enable(desc.depth_write)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let blend_attachments = color_blend_attachments(desc.blend, color_attachment_count);
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .depth_stencil_state(&depth_stencil_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let result = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
        };

        unsafe {
            device.destroy_shader_module(vertex_module, None);
            device.destroy_shader_module(fragment_module, None);
        }

        let pipelines = result
            .map_err(|(_, e)| e)
            .native(SOURCE, "vkCreateGraphicsPipelines")?;
        pipelines
            .into_iter()
            .next()
            .ok_or_else(|| Error::BackendError("vkCreateGraphicsPipelines returned no pipeline".to_string()))
    }

    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    pub fn set_layout(&self) -> vk::DescriptorSetLayout {
        self.set_layout
    }
}

impl Pipeline3D for VulkanPipeline {
    fn bindings(&self) -> &[DescriptorBinding] {
        &self.bindings
    }

    fn color_attachment_count(&self) -> u32 {
        self.color_attachment_count
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        let device = self.ctx.device();
        unsafe {
            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.layout, None);
            device.destroy_descriptor_set_layout(self.set_layout, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
