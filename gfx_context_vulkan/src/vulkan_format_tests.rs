//! Unit tests for Vulkan format conversion functions
//!
//! Pure mappings, no GPU required.

use super::*;

// ============================================================================
// TEXTURE FORMAT TESTS
// ============================================================================

#[test]
fn test_texture_format_to_vk_color_formats() {
    assert_eq!(to_vk_format(TextureFormat::Rgba8Unorm), vk::Format::R8G8B8A8_UNORM);
    assert_eq!(to_vk_format(TextureFormat::Bgra8Unorm), vk::Format::B8G8R8A8_UNORM);
    assert_eq!(to_vk_format(TextureFormat::Rgba16Float), vk::Format::R16G16B16A16_SFLOAT);
    assert_eq!(to_vk_format(TextureFormat::Rgba32Float), vk::Format::R32G32B32A32_SFLOAT);
    assert_eq!(to_vk_format(TextureFormat::R8Unorm), vk::Format::R8_UNORM);
    assert_eq!(to_vk_format(TextureFormat::R16Float), vk::Format::R16_SFLOAT);
    assert_eq!(to_vk_format(TextureFormat::R32Float), vk::Format::R32_SFLOAT);
}

#[test]
fn test_texture_format_to_vk_depth_formats() {
    assert_eq!(to_vk_format(TextureFormat::Depth32Float), vk::Format::D32_SFLOAT);
    assert_eq!(
        to_vk_format(TextureFormat::Depth24UnormStencil8),
        vk::Format::D24_UNORM_S8_UINT
    );
}

/// Vulkan format, depth classification and Skia color type agree for every format
#[test]
fn test_format_round_trip_consistency() {
    for format in TextureFormat::ALL {
        let vk_format = to_vk_format(format);
        assert_eq!(vk_format_channel_count(vk_format), Some(format.channel_count()), "{:?}", format);
        assert_eq!(is_vk_depth_format(vk_format), format.is_depth(), "{:?}", format);

        match format.to_skia_color_type() {
            Some(color_type) => {
                assert!(!format.is_depth());
                assert_eq!(color_type.bytes_per_pixel(), format.bytes_per_pixel() as usize, "{:?}", format);
            }
            None => assert!(
                format.is_depth() || format.channel_count() == 1,
                "{:?} should map to a Skia color type",
                format
            ),
        }
    }
}

#[test]
fn test_skia_vk_format_matches_raw_value() {
    for format in TextureFormat::ALL {
        assert_eq!(
            to_skia_vk_format(format) as i32,
            to_vk_format(format).as_raw(),
            "{:?}",
            format
        );
    }
}

#[test]
fn test_unknown_vk_format_has_no_channel_count() {
    assert_eq!(vk_format_channel_count(vk::Format::BC1_RGB_UNORM_BLOCK), None);
    assert!(!is_vk_depth_format(vk::Format::R8G8B8A8_SRGB));
}

#[test]
fn test_aspect_mask() {
    assert_eq!(aspect_mask(TextureFormat::Rgba8Unorm), vk::ImageAspectFlags::COLOR);
    assert_eq!(aspect_mask(TextureFormat::Depth32Float), vk::ImageAspectFlags::DEPTH);
    assert_eq!(
        aspect_mask(TextureFormat::Depth24UnormStencil8),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
}

#[test]
fn test_image_usage_by_format_class() {
    let color = image_usage(TextureFormat::Rgba8Unorm);
    assert!(color.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED));
    assert!(color.contains(vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST));
    assert!(!color.contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT));

    let depth = image_usage(TextureFormat::Depth32Float);
    assert!(depth.contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT));
    assert!(!depth.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));
}

#[test]
fn test_layout_mapping() {
    assert_eq!(to_vk_layout(TextureLayout::Undefined), vk::ImageLayout::UNDEFINED);
    assert_eq!(
        to_vk_layout(TextureLayout::ColorAttachment),
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
    );
    assert_eq!(
        to_vk_layout(TextureLayout::DepthStencilAttachment),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    );
    assert_eq!(
        to_vk_layout(TextureLayout::ShaderReadOnly),
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
    );
    assert_eq!(to_vk_layout(TextureLayout::TransferSrc), vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
    assert_eq!(to_vk_layout(TextureLayout::TransferDst), vk::ImageLayout::TRANSFER_DST_OPTIMAL);
}

// ============================================================================
// PIPELINE STATE TESTS
// ============================================================================

#[test]
fn test_vertex_format_to_vk() {
    assert_eq!(vertex_format_to_vk(VertexFormat::Float), vk::Format::R32_SFLOAT);
    assert_eq!(vertex_format_to_vk(VertexFormat::Float3), vk::Format::R32G32B32_SFLOAT);
    assert_eq!(vertex_format_to_vk(VertexFormat::Int), vk::Format::R32_SINT);
    assert_eq!(vertex_format_to_vk(VertexFormat::UByte4Norm), vk::Format::R8G8B8A8_UNORM);
}

#[test]
fn test_blend_and_raster_state() {
    assert_eq!(
        blend_factor_to_vk(BlendFactor::OneMinusSrcAlpha),
        vk::BlendFactor::ONE_MINUS_SRC_ALPHA
    );
    assert_eq!(blend_op_to_vk(BlendOp::ReverseSubtract), vk::BlendOp::REVERSE_SUBTRACT);
    assert_eq!(cull_mode_to_vk(CullMode::None), vk::CullModeFlags::NONE);
    assert_eq!(front_face_to_vk(FrontFace::CounterClockwise), vk::FrontFace::COUNTER_CLOCKWISE);
    assert_eq!(load_op_to_vk(AttachmentLoadOp::DontCare), vk::AttachmentLoadOp::DONT_CARE);
    assert_eq!(index_type_to_vk(IndexType::U16), vk::IndexType::UINT16);
}

#[test]
fn test_stage_flags_to_vk() {
    assert_eq!(
        stages_to_vk(ShaderStages::VERTEX_FRAGMENT),
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
    );
    assert_eq!(stages_to_vk(ShaderStages::COMPUTE), vk::ShaderStageFlags::COMPUTE);
    assert_eq!(stages_to_vk(ShaderStages::empty()), vk::ShaderStageFlags::empty());
}

#[test]
fn test_descriptor_type_to_vk() {
    assert_eq!(
        descriptor_type_to_vk(DescriptorType::CombinedImageSampler),
        vk::DescriptorType::COMBINED_IMAGE_SAMPLER
    );
    assert_eq!(
        descriptor_type_to_vk(DescriptorType::StorageBuffer),
        vk::DescriptorType::STORAGE_BUFFER
    );
}

// ============================================================================
// SAMPLER / BUFFER TESTS
// ============================================================================

#[test]
fn test_sampler_mappings() {
    assert_eq!(filter_to_vk(SamplerFilter::Linear), vk::Filter::LINEAR);
    assert_eq!(mipmap_mode_to_vk(SamplerFilter::Nearest), vk::SamplerMipmapMode::NEAREST);
    assert_eq!(
        address_mode_to_vk(SamplerAddressMode::ClampToBorder),
        vk::SamplerAddressMode::CLAMP_TO_BORDER
    );
}

#[test]
fn test_buffer_usage_to_vk() {
    let flags = buffer_usage_to_vk(BufferUsage::VERTEX | BufferUsage::TRANSFER_DST);
    assert_eq!(
        flags,
        vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
    );
    assert_eq!(buffer_usage_to_vk(BufferUsage::empty()), vk::BufferUsageFlags::empty());
}
