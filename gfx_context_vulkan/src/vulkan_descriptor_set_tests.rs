//! Unit tests for vulkan_descriptor_set.rs

use super::*;
use gfx_context::gfx::{DescriptorBinding, DescriptorType, ShaderStages};

#[test]
fn test_pool_sizes_map_types() {
    let sizes = vk_pool_sizes(&[
        DescriptorPoolSize::new(DescriptorType::UniformBuffer, 2),
        DescriptorPoolSize::new(DescriptorType::CombinedImageSampler, 4),
    ]);
    assert_eq!(sizes.len(), 2);
    assert_eq!(sizes[0].ty, vk::DescriptorType::UNIFORM_BUFFER);
    assert_eq!(sizes[0].descriptor_count, 2);
    assert_eq!(sizes[1].ty, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
    assert_eq!(sizes[1].descriptor_count, 4);
}

#[test]
fn test_pool_sizes_skip_empty() {
    let sizes = vk_pool_sizes(&[
        DescriptorPoolSize::new(DescriptorType::StorageBuffer, 0),
        DescriptorPoolSize::new(DescriptorType::StorageBuffer, 1),
    ]);
    assert_eq!(sizes.len(), 1);
    assert_eq!(sizes[0].ty, vk::DescriptorType::STORAGE_BUFFER);
}

#[test]
fn test_pool_sizes_resolved_from_bindings_when_empty() {
    let bindings = [
        DescriptorBinding::new(0, DescriptorType::UniformBuffer, ShaderStages::VERTEX),
        DescriptorBinding::new(1, DescriptorType::CombinedImageSampler, ShaderStages::FRAGMENT),
    ];
    let sizes = vk_pool_sizes(&DescriptorPoolSize::resolve(&[], &bindings));
    assert_eq!(sizes.len(), 2);
    assert!(sizes.iter().all(|s| s.descriptor_count == 1));
    assert!(vk_pool_sizes(&[]).is_empty());
}
