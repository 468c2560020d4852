/// Descriptor sets and the write tracker shared by all backends

use crate::error::{Error, Result};
use crate::graphics::buffer::{Buffer, BufferUsage};
use crate::graphics::layout::{LayoutTracker, TextureLayout};
use crate::graphics::pipeline::{DescriptorBinding, DescriptorType};
use crate::graphics::sampler::Sampler;
use crate::graphics::texture::SampledTexture;
use rustc_hash::{FxHashMap, FxHashSet};
use std::any::Any;
use std::sync::Arc;

/// Capacity of one descriptor type in a set's pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorPoolSize {
    pub descriptor_type: DescriptorType,
    pub count: u32,
}

impl DescriptorPoolSize {
    pub fn new(descriptor_type: DescriptorType, count: u32) -> Self {
        Self {
            descriptor_type,
            count,
        }
    }

    /// Pool sizes exactly covering `bindings`
    pub fn for_bindings(bindings: &[DescriptorBinding]) -> Vec<DescriptorPoolSize> {
        let mut sizes: Vec<DescriptorPoolSize> = Vec::new();
        for binding in bindings {
            match sizes
                .iter_mut()
                .find(|s| s.descriptor_type == binding.descriptor_type)
            {
                Some(size) => size.count += binding.count,
                None => sizes.push(DescriptorPoolSize::new(binding.descriptor_type, binding.count)),
            }
        }
        sizes
    }

    /// `requested`, or sizes covering `bindings` when it holds no descriptors
    pub fn resolve(
        requested: &[DescriptorPoolSize],
        bindings: &[DescriptorBinding],
    ) -> Vec<DescriptorPoolSize> {
        if requested.iter().all(|size| size.count == 0) {
            Self::for_bindings(bindings)
        } else {
            requested.to_vec()
        }
    }
}

/// Which declared bindings of a set have been written, and with what
#[derive(Debug, Clone)]
pub struct DescriptorWrites {
    declared: FxHashMap<u32, DescriptorBinding>,
    written: FxHashSet<u32>,
    sampled: FxHashMap<u32, Arc<LayoutTracker>>,
}

impl DescriptorWrites {
    pub fn new(bindings: &[DescriptorBinding]) -> Self {
        Self {
            declared: bindings.iter().map(|b| (b.binding, *b)).collect(),
            written: FxHashSet::default(),
            sampled: FxHashMap::default(),
        }
    }

    /// The pool must have room for every declared binding
    pub fn check_pool(&self, pool_sizes: &[DescriptorPoolSize]) -> Result<()> {
        for size in DescriptorPoolSize::for_bindings(&self.declared.values().copied().collect::<Vec<_>>()) {
            let available: u32 = pool_sizes
                .iter()
                .filter(|p| p.descriptor_type == size.descriptor_type)
                .map(|p| p.count)
                .sum();
            if available < size.count {
                return Err(Error::ValidationFailed(format!(
                    "pool has {} {:?} descriptors, pipeline declares {}",
                    available, size.descriptor_type, size.count
                )));
            }
        }
        Ok(())
    }

    fn declared(&self, binding: u32) -> Result<&DescriptorBinding> {
        self.declared.get(&binding).ok_or_else(|| {
            Error::InvalidResource(format!("binding {} is not declared by the pipeline", binding))
        })
    }

    /// Validate and record a buffer write; returns the declared type
    pub fn record_buffer(&mut self, binding: u32, buffer: &dyn Buffer) -> Result<DescriptorType> {
        let descriptor_type = self.declared(binding)?.descriptor_type;
        let required_usage = match descriptor_type {
            DescriptorType::UniformBuffer => BufferUsage::UNIFORM,
            DescriptorType::StorageBuffer => BufferUsage::STORAGE,
            DescriptorType::CombinedImageSampler => {
                return Err(Error::ValidationFailed(format!(
                    "binding {} expects a texture, got a buffer",
                    binding
                )))
            }
        };
        if !buffer.usage().contains(required_usage) {
            return Err(Error::ValidationFailed(format!(
                "binding {} is {:?} but the buffer lacks {:?} usage",
                binding, descriptor_type, required_usage
            )));
        }
        self.sampled.remove(&binding);
        self.written.insert(binding);
        Ok(descriptor_type)
    }

    /// Validate and record a texture write
    pub fn record_texture(&mut self, binding: u32, texture: SampledTexture<'_>) -> Result<()> {
        let descriptor_type = self.declared(binding)?.descriptor_type;
        if descriptor_type != DescriptorType::CombinedImageSampler {
            return Err(Error::ValidationFailed(format!(
                "binding {} is {:?}, got a texture",
                binding, descriptor_type
            )));
        }
        self.sampled.insert(binding, texture.layout_tracker().clone());
        self.written.insert(binding);
        Ok(())
    }

    /// Declared bindings not written yet, ascending
    pub fn missing(&self) -> Vec<u32> {
        let mut missing: Vec<u32> = self
            .declared
            .keys()
            .filter(|b| !self.written.contains(b))
            .copied()
            .collect();
        missing.sort_unstable();
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.written.len() == self.declared.len()
    }

    /// Checks run when the set is bound: populated, and sampled textures readable
    pub fn validate_for_bind(&self) -> Result<()> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(Error::ValidationFailed(format!(
                "descriptor set bound with unwritten bindings {:?}",
                missing
            )));
        }
        for (binding, tracker) in &self.sampled {
            tracker.expect(
                0..tracker.layer_count(),
                TextureLayout::ShaderReadOnly,
                &format!("texture at binding {}", binding),
            )?;
        }
        Ok(())
    }
}

/// Bundle of buffer/texture bindings matching a pipeline's layout
pub trait DescriptorSet: Send + Sync {
    fn update_buffer(&mut self, binding: u32, buffer: &dyn Buffer) -> Result<()>;

    fn update_texture(
        &mut self,
        binding: u32,
        texture: SampledTexture<'_>,
        sampler: &dyn Sampler,
    ) -> Result<()>;

    fn writes(&self) -> &DescriptorWrites;

    fn is_complete(&self) -> bool {
        self.writes().is_complete()
    }

    fn missing_bindings(&self) -> Vec<u32> {
        self.writes().missing()
    }

    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
#[path = "descriptor_set_tests.rs"]
mod tests;
