//! Unit tests for vulkan_render_pass.rs
//!
//! Attachment and clear value construction; recording needs a device.

use super::*;
use gfx_context::gfx::{AttachmentLoadOp, TextureFormat};

fn gbuffer_desc() -> RenderPassDesc {
    RenderPassDesc::new(
        vec![
            TextureFormat::Rgba8Unorm,
            TextureFormat::Rgba16Float,
            TextureFormat::R32Float,
        ],
        Some(TextureFormat::Depth32Float),
    )
}

// ============================================================================
// ATTACHMENT TESTS
// ============================================================================

#[test]
fn test_mrt_attachments_in_order() {
    let attachments = attachment_descriptions(&gbuffer_desc());
    assert_eq!(attachments.len(), 4);
    assert_eq!(attachments[0].format, vk::Format::R8G8B8A8_UNORM);
    assert_eq!(attachments[1].format, vk::Format::R16G16B16A16_SFLOAT);
    assert_eq!(attachments[2].format, vk::Format::R32_SFLOAT);
    assert_eq!(attachments[3].format, vk::Format::D32_SFLOAT);
}

#[test]
fn test_attachments_keep_their_layout() {
    let attachments = attachment_descriptions(&gbuffer_desc());
    for color in &attachments[..3] {
        assert_eq!(color.initial_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(color.final_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(color.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(color.load_op, vk::AttachmentLoadOp::CLEAR);
    }
    let depth = &attachments[3];
    assert_eq!(depth.initial_layout, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
    assert_eq!(depth.final_layout, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
    assert_eq!(depth.stencil_load_op, vk::AttachmentLoadOp::DONT_CARE);
}

#[test]
fn test_load_ops_and_stencil() {
    let desc = RenderPassDesc::new(
        vec![TextureFormat::Bgra8Unorm],
        Some(TextureFormat::Depth24UnormStencil8),
    )
    .with_load_ops(AttachmentLoadOp::Load, AttachmentLoadOp::DontCare);
    let attachments = attachment_descriptions(&desc);
    assert_eq!(attachments[0].load_op, vk::AttachmentLoadOp::LOAD);
    assert_eq!(attachments[1].load_op, vk::AttachmentLoadOp::DONT_CARE);
    assert_eq!(attachments[1].stencil_load_op, vk::AttachmentLoadOp::DONT_CARE);
    assert_eq!(attachments[1].stencil_store_op, vk::AttachmentStoreOp::STORE);
}

#[test]
fn test_depth_only_pass() {
    let desc = RenderPassDesc::new(vec![], Some(TextureFormat::Depth32Float));
    let attachments = attachment_descriptions(&desc);
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].format, vk::Format::D32_SFLOAT);
}

// ============================================================================
// CLEAR VALUE TESTS
// ============================================================================

#[test]
fn test_clear_values_colors_then_depth() {
    let colors = [ClearColor::new(1.0, 0.0, 0.0, 1.0), ClearColor::BLACK];
    let values = clear_values(&colors, 0.5, true);
    assert_eq!(values.len(), 3);
    unsafe {
        assert_eq!(values[0].color.float32, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(values[1].color.float32, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(values[2].depth_stencil.depth, 0.5);
        assert_eq!(values[2].depth_stencil.stencil, 0);
    }
}

#[test]
fn test_clear_values_without_depth() {
    let values = clear_values(&[ClearColor::WHITE], 1.0, false);
    assert_eq!(values.len(), 1);
}
