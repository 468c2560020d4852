/// Shader source to SPIR-V compilation
///
/// `NagaShaderCompiler` runs entirely on the CPU, so shaders can be compiled
/// (and tested) without a GPU.

use crate::error::{Error, Result};
use crate::graphics::pipeline::ShaderStage;

/// Entry point name every compiled module exposes
pub const SHADER_ENTRY_POINT: &str = "main";

/// Source language accepted by the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaderLanguage {
    /// GLSL 450 (Vulkan flavour), entry point `main`
    #[default]
    Glsl,
    /// WGSL, entry point `main`
    Wgsl,
}

/// Compiles shader source into SPIR-V words
pub trait ShaderCompiler: Send + Sync {
    fn compile_to_spirv(&self, source: &str, stage: ShaderStage) -> Result<Vec<u32>>;
}

/// naga-based compiler (GLSL or WGSL in, SPIR-V 1.3 out)
#[derive(Debug, Clone, Default)]
pub struct NagaShaderCompiler {
    language: ShaderLanguage,
}

impl NagaShaderCompiler {
    pub fn new(language: ShaderLanguage) -> Self {
        Self { language }
    }

    pub fn language(&self) -> ShaderLanguage {
        self.language
    }

    fn parse(&self, source: &str, stage: naga::ShaderStage) -> Result<naga::Module> {
        match self.language {
            ShaderLanguage::Glsl => {
                let options = naga::front::glsl::Options {
                    stage,
                    defines: naga::FastHashMap::default(),
                };
                let mut frontend = naga::front::glsl::Frontend::default();
                frontend
                    .parse(&options, source)
                    .map_err(|errors| Error::ShaderCompilation(format!("GLSL parse error:\n{errors}")))
            }
            ShaderLanguage::Wgsl => naga::front::wgsl::parse_str(source)
                .map_err(|e| Error::ShaderCompilation(format!("WGSL parse error: {e}"))),
        }
    }
}

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
        ShaderStage::Compute => naga::ShaderStage::Compute,
    }
}

impl ShaderCompiler for NagaShaderCompiler {
    fn compile_to_spirv(&self, source: &str, stage: ShaderStage) -> Result<Vec<u32>> {
        let stage = naga_stage(stage);
        let module = self.parse(source, stage)?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        let info = validator
            .validate(&module)
            .map_err(|e| Error::ShaderCompilation(format!("Validation error: {e}")))?;

        if !module
            .entry_points
            .iter()
            .any(|ep| ep.name == SHADER_ENTRY_POINT && ep.stage == stage)
        {
            return Err(Error::ShaderCompilation(format!(
                "no '{}' entry point for stage {:?}",
                SHADER_ENTRY_POINT, stage
            )));
        }

        let options = naga::back::spv::Options {
            lang_version: (1, 3),
            flags: naga::back::spv::WriterFlags::empty(),
            capabilities: None,
            bounds_check_policies: naga::proc::BoundsCheckPolicies::default(),
            binding_map: Default::default(),
            debug_info: None,
            zero_initialize_workgroup_memory: naga::back::spv::ZeroInitializeWorkgroupMemoryMode::None,
        };
        let pipeline_options = naga::back::spv::PipelineOptions {
            shader_stage: stage,
            entry_point: SHADER_ENTRY_POINT.to_string(),
        };

        naga::back::spv::write_vec(&module, &info, &options, Some(&pipeline_options))
            .map_err(|e| Error::ShaderCompilation(format!("SPIR-V generation error: {e}")))
    }
}

#[cfg(test)]
#[path = "shader_compiler_tests.rs"]
mod tests;
