//! Unit tests for descriptor_set.rs

use crate::error::Error;
use crate::graphics::buffer::{BufferUsage, MemoryProperty};
use crate::graphics::context::GraphicsContext;
use crate::graphics::descriptor_set::{DescriptorPoolSize, DescriptorSet, DescriptorWrites};
use crate::graphics::format::TextureFormat;
use crate::graphics::pipeline::{
    DescriptorBinding, DescriptorType, PipelineDesc, ShaderStages,
};
use crate::graphics::render_pass::{ClearColor, RenderPassDesc};
use crate::graphics::sampler::SamplerDesc;
use crate::graphics::texture::{AttachmentView, SampledTexture};
use crate::mock::MockGraphicsContext;

fn fake_spirv() -> Vec<u32> {
    vec![0x0723_0203, 0x0001_0300, 0, 1, 0]
}

fn bindings() -> Vec<DescriptorBinding> {
    vec![
        DescriptorBinding::new(0, DescriptorType::UniformBuffer, ShaderStages::VERTEX_FRAGMENT),
        DescriptorBinding::new(1, DescriptorType::CombinedImageSampler, ShaderStages::FRAGMENT),
        DescriptorBinding::new(2, DescriptorType::StorageBuffer, ShaderStages::VERTEX),
    ]
}

// ============================================================================
// POOL SIZES
// ============================================================================

#[test]
fn test_pool_sizes_for_bindings_aggregates() {
    let mut list = bindings();
    list.push(DescriptorBinding::new(
        3,
        DescriptorType::UniformBuffer,
        ShaderStages::FRAGMENT,
    ));
    let sizes = DescriptorPoolSize::for_bindings(&list);
    assert_eq!(sizes.len(), 3);
    assert!(sizes.contains(&DescriptorPoolSize::new(DescriptorType::UniformBuffer, 2)));
    assert!(sizes.contains(&DescriptorPoolSize::new(DescriptorType::StorageBuffer, 1)));
}

#[test]
fn test_check_pool_too_small() {
    let writes = DescriptorWrites::new(&bindings());
    let pool = [
        DescriptorPoolSize::new(DescriptorType::UniformBuffer, 1),
        DescriptorPoolSize::new(DescriptorType::StorageBuffer, 1),
    ];
    assert!(matches!(writes.check_pool(&pool), Err(Error::ValidationFailed(_))));
    assert!(writes
        .check_pool(&DescriptorPoolSize::for_bindings(&bindings()))
        .is_ok());
}

#[test]
fn test_resolve_pool_sizes_falls_back_to_bindings() {
    let expected = DescriptorPoolSize::for_bindings(&bindings());
    assert_eq!(DescriptorPoolSize::resolve(&[], &bindings()), expected);
    let zeroed = [DescriptorPoolSize::new(DescriptorType::UniformBuffer, 0)];
    assert_eq!(DescriptorPoolSize::resolve(&zeroed, &bindings()), expected);

    let requested = [DescriptorPoolSize::new(DescriptorType::UniformBuffer, 4)];
    assert_eq!(DescriptorPoolSize::resolve(&requested, &bindings()), requested.to_vec());
}

#[test]
fn test_descriptor_set_with_empty_pool_sizes() {
    let ctx = MockGraphicsContext::new();
    let pass = ctx
        .create_render_pass_3d(&RenderPassDesc::new(vec![TextureFormat::Rgba8Unorm], None))
        .unwrap();
    let pipeline = ctx
        .create_pipeline_3d(
            pass.as_ref(),
            &PipelineDesc::new(fake_spirv(), fake_spirv()).with_bindings(bindings()),
        )
        .unwrap();

    let set = ctx.create_descriptor_set(pipeline.as_ref(), &[]).unwrap();
    assert!(!set.is_complete());
    assert_eq!(set.missing_bindings().len(), 3);

    let zeroed = [DescriptorPoolSize::new(DescriptorType::StorageBuffer, 0)];
    assert!(ctx.create_descriptor_set(pipeline.as_ref(), &zeroed).is_ok());

    let too_small = [DescriptorPoolSize::new(DescriptorType::UniformBuffer, 1)];
    assert!(matches!(
        ctx.create_descriptor_set(pipeline.as_ref(), &too_small),
        Err(Error::ValidationFailed(_))
    ));
}

// ============================================================================
// WRITE TRACKING
// ============================================================================

#[test]
fn test_missing_bindings_sorted() {
    let ctx = MockGraphicsContext::new();
    let mut writes = DescriptorWrites::new(&bindings());
    assert_eq!(writes.missing(), vec![0, 1, 2]);

    let storage = ctx
        .create_buffer(64, BufferUsage::STORAGE, MemoryProperty::DEVICE_LOCAL)
        .unwrap();
    assert_eq!(
        writes.record_buffer(2, storage.as_ref()).unwrap(),
        DescriptorType::StorageBuffer
    );
    assert_eq!(writes.missing(), vec![0, 1]);
    assert!(!writes.is_complete());
}

#[test]
fn test_buffer_usage_must_match_binding() {
    let ctx = MockGraphicsContext::new();
    let mut writes = DescriptorWrites::new(&bindings());
    let vertex = ctx
        .create_buffer(64, BufferUsage::VERTEX, MemoryProperty::DEVICE_LOCAL)
        .unwrap();
    assert!(matches!(
        writes.record_buffer(0, vertex.as_ref()),
        Err(Error::ValidationFailed(_))
    ));
}

#[test]
fn test_wrong_resource_kind_rejected() {
    let ctx = MockGraphicsContext::new();
    let mut writes = DescriptorWrites::new(&bindings());
    let uniform = ctx
        .create_buffer(64, BufferUsage::UNIFORM, MemoryProperty::HOST_VISIBLE)
        .unwrap();
    let texture = ctx.create_texture_2d(4, 4, TextureFormat::Rgba8Unorm).unwrap();

    assert!(writes.record_buffer(1, uniform.as_ref()).is_err());
    assert!(writes
        .record_texture(0, SampledTexture::Texture2D(texture.as_ref()))
        .is_err());
    assert!(matches!(
        writes.record_buffer(9, uniform.as_ref()),
        Err(Error::InvalidResource(_))
    ));
}

#[test]
fn test_bind_requires_sampled_layout() {
    let ctx = MockGraphicsContext::new();
    let mut writes = DescriptorWrites::new(&bindings()[1..2]);
    let texture = ctx.create_texture_2d(4, 4, TextureFormat::Rgba8Unorm).unwrap();
    writes
        .record_texture(1, SampledTexture::Texture2D(texture.as_ref()))
        .unwrap();

    assert!(matches!(
        writes.validate_for_bind(),
        Err(Error::InvalidOperation(_))
    ));
    texture.prepare_for_sampling().unwrap();
    assert!(writes.validate_for_bind().is_ok());
}

// ============================================================================
// BINDING THROUGH A PASS (mock context)
// ============================================================================

#[test]
fn test_incomplete_set_cannot_be_bound() {
    let ctx = MockGraphicsContext::new();
    let mut pass = ctx
        .create_render_pass_3d(&RenderPassDesc::new(vec![TextureFormat::Rgba8Unorm], None))
        .unwrap();
    let pipeline = ctx
        .create_pipeline_3d(
            pass.as_ref(),
            &PipelineDesc::new(fake_spirv(), fake_spirv()).with_bindings(bindings()),
        )
        .unwrap();
    let mut set = ctx
        .create_descriptor_set(pipeline.as_ref(), &DescriptorPoolSize::for_bindings(&bindings()))
        .unwrap();

    let uniform = ctx
        .create_buffer(64, BufferUsage::UNIFORM, MemoryProperty::HOST_VISIBLE)
        .unwrap();
    let storage = ctx
        .create_buffer(64, BufferUsage::STORAGE, MemoryProperty::DEVICE_LOCAL)
        .unwrap();
    let albedo = ctx.create_texture_2d(4, 4, TextureFormat::Rgba8Unorm).unwrap();
    albedo.upload(&[255u8; 64]).unwrap();
    let sampler = ctx.create_sampler(&SamplerDesc::linear_clamp()).unwrap();

    set.update_buffer(0, uniform.as_ref()).unwrap();
    set.update_buffer(2, storage.as_ref()).unwrap();
    assert_eq!(set.missing_bindings(), vec![1]);

    let target = ctx.create_texture_2d(4, 4, TextureFormat::Rgba8Unorm).unwrap();
    target.prepare_for_render().unwrap();
    let framebuffer = ctx
        .create_framebuffer_3d(pass.as_ref(), &[AttachmentView::texture(target.as_ref())], None)
        .unwrap();
    pass.begin(framebuffer.as_ref(), &[ClearColor::BLACK], 1.0).unwrap();
    pass.bind_pipeline(pipeline.as_ref()).unwrap();

    match pass.bind_descriptor_set(pipeline.as_ref(), set.as_ref()) {
        Err(Error::ValidationFailed(msg)) => assert!(msg.contains("[1]")),
        other => panic!("unexpected {:?}", other),
    }

    set.update_texture(1, SampledTexture::Texture2D(albedo.as_ref()), sampler.as_ref())
        .unwrap();
    assert!(set.is_complete());
    pass.bind_descriptor_set(pipeline.as_ref(), set.as_ref()).unwrap();
    pass.draw(3, 1).unwrap();
    pass.end().unwrap();
}

#[test]
fn test_descriptor_set_pool_checked_at_creation() {
    let ctx = MockGraphicsContext::new();
    let pass = ctx
        .create_render_pass_3d(&RenderPassDesc::new(vec![TextureFormat::Rgba8Unorm], None))
        .unwrap();
    let pipeline = ctx
        .create_pipeline_3d(
            pass.as_ref(),
            &PipelineDesc::new(fake_spirv(), fake_spirv()).with_bindings(bindings()),
        )
        .unwrap();
    let result = ctx.create_descriptor_set(
        pipeline.as_ref(),
        &[DescriptorPoolSize::new(DescriptorType::UniformBuffer, 1)],
    );
    assert!(matches!(result, Err(Error::ValidationFailed(_))));
}
