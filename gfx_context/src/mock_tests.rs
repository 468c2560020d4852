//! Unit tests for mock.rs

use crate::error::Error;
use crate::graphics::buffer::{BufferUsage, MemoryProperty};
use crate::graphics::context::GraphicsContext;
use crate::graphics::format::TextureFormat;
use crate::graphics::layout::TextureLayout;
use crate::graphics::texture::CubeFace;
use crate::mock::MockGraphicsContext;

// ============================================================================
// CONTEXT LIFECYCLE
// ============================================================================

#[test]
fn test_mock_gpu_info() {
    let ctx = MockGraphicsContext::new();
    let info = ctx.gpu_info();
    assert_eq!(info.available_gpus.len(), 1);
    assert_eq!(info.selected_gpu.as_ref().unwrap().name, "Mock GPU");
    assert!(info.to_json_pretty().unwrap().contains("Mock GPU"));
}

#[test]
fn test_skia_context_unsupported() {
    let ctx = MockGraphicsContext::new();
    assert!(matches!(ctx.skia_context(), Err(Error::UnsupportedPlatform(_))));
}

#[test]
fn test_double_dispose_is_noop() {
    let ctx = MockGraphicsContext::new();
    ctx.dispose();
    ctx.dispose();
    assert!(ctx.is_disposed());
    assert_eq!(ctx.dispose_count(), 1);
}

#[test]
fn test_create_after_dispose_fails() {
    let ctx = MockGraphicsContext::new();
    ctx.dispose();
    assert!(matches!(
        ctx.create_texture(4, 4, TextureFormat::Rgba8Unorm),
        Err(Error::ObjectDisposed(_))
    ));
    assert!(matches!(ctx.wait_idle(), Err(Error::ObjectDisposed(_))));
}

#[test]
fn test_wait_idle_counts() {
    let ctx = MockGraphicsContext::new();
    ctx.wait_idle().unwrap();
    ctx.wait_idle().unwrap();
    assert_eq!(ctx.wait_idle_count(), 2);
}

// ============================================================================
// TEXTURES
// ============================================================================

#[test]
fn test_zero_sized_texture_rejected() {
    let ctx = MockGraphicsContext::new();
    assert!(matches!(
        ctx.create_texture_2d(0, 16, TextureFormat::Rgba8Unorm),
        Err(Error::InvalidResource(_))
    ));
    assert!(matches!(
        ctx.create_texture_array(16, 16, 0, TextureFormat::Rgba8Unorm),
        Err(Error::InvalidResource(_))
    ));
}

#[test]
fn test_upload_download_ends_shader_read_only() {
    let ctx = MockGraphicsContext::new();
    let texture = ctx.create_texture(2, 2, TextureFormat::Rgba8Unorm).unwrap();
    assert_eq!(texture.layout(), TextureLayout::Undefined);

    let pixels: Vec<u8> = (0..16).collect();
    texture.upload(&pixels).unwrap();
    assert_eq!(texture.layout(), TextureLayout::ShaderReadOnly);
    assert_eq!(texture.download_pixels().unwrap(), pixels);
    assert_eq!(texture.layout(), TextureLayout::ShaderReadOnly);
}

#[test]
fn test_upload_wrong_size_rejected() {
    let ctx = MockGraphicsContext::new();
    let texture = ctx.create_texture_2d(2, 2, TextureFormat::Rgba8Unorm).unwrap();
    assert!(matches!(texture.upload(&[0u8; 15]), Err(Error::InvalidResource(_))));
    assert_eq!(texture.layout(), TextureLayout::Undefined);
}

#[test]
fn test_transition_to_undefined_rejected() {
    let ctx = MockGraphicsContext::new();
    let texture = ctx.create_texture_2d(2, 2, TextureFormat::Rgba8Unorm).unwrap();
    assert!(matches!(
        texture.transition_to(TextureLayout::Undefined),
        Err(Error::InvalidOperation(_))
    ));
}

#[test]
fn test_depth_texture_prepare_for_render() {
    let ctx = MockGraphicsContext::new();
    let depth = ctx.create_texture_2d(8, 8, TextureFormat::Depth32Float).unwrap();
    depth.prepare_for_render().unwrap();
    assert_eq!(depth.layout(), TextureLayout::DepthStencilAttachment);
}

#[test]
fn test_skia_surface_matches_texture_size() {
    let ctx = MockGraphicsContext::new();
    let texture = ctx.create_texture(32, 16, TextureFormat::Rgba8Unorm).unwrap();
    let surface = texture.create_skia_surface().unwrap();
    assert_eq!(surface.width(), 32);
    assert_eq!(surface.height(), 16);
}

#[test]
fn test_skia_surface_needs_color_type() {
    let ctx = MockGraphicsContext::new();
    let texture = ctx.create_texture(4, 4, TextureFormat::Depth32Float).unwrap();
    assert!(matches!(
        texture.create_skia_surface(),
        Err(Error::InvalidOperation(_))
    ));
}

#[test]
fn test_array_layers_tracked_independently() {
    let ctx = MockGraphicsContext::new();
    let array = ctx
        .create_texture_array(4, 4, 3, TextureFormat::Rgba8Unorm)
        .unwrap();

    array.transition_layer_to_attachment(1).unwrap();
    assert_eq!(array.layer_layout(0).unwrap(), TextureLayout::Undefined);
    assert_eq!(array.layer_layout(1).unwrap(), TextureLayout::ColorAttachment);

    array.upload_layer(2, &[7u8; 64]).unwrap();
    assert_eq!(array.layer_layout(2).unwrap(), TextureLayout::ShaderReadOnly);

    array.transition_all_to_sampled().unwrap();
    assert_eq!(
        array.layout_tracker().uniform_layout(),
        Some(TextureLayout::ShaderReadOnly)
    );
    assert!(matches!(
        array.transition_layer_to_attachment(3),
        Err(Error::InvalidResource(_))
    ));
}

#[test]
fn test_cube_faces() {
    let ctx = MockGraphicsContext::new();
    let cube = ctx.create_texture_cube(8, TextureFormat::Rgba16Float).unwrap();

    cube.transition_face_to_attachment(CubeFace::NegativeY).unwrap();
    assert_eq!(
        cube.face_layout(CubeFace::NegativeY).unwrap(),
        TextureLayout::ColorAttachment
    );
    assert_eq!(cube.face_layout(CubeFace::PositiveX).unwrap(), TextureLayout::Undefined);

    cube.transition_to_sampled().unwrap();
    for face in CubeFace::ALL {
        assert_eq!(cube.face_layout(face).unwrap(), TextureLayout::ShaderReadOnly);
    }
}

#[test]
fn test_cube_array_cube_transition() {
    let ctx = MockGraphicsContext::new();
    let atlas = ctx
        .create_texture_cube_array(16, 4, TextureFormat::Depth32Float)
        .unwrap();
    assert_eq!(atlas.array_size(), 4);
    assert_eq!(atlas.layout_tracker().layer_count(), 24);

    atlas.transition_cube_to_attachment(2).unwrap();
    for face in CubeFace::ALL {
        assert_eq!(
            atlas.face_layout(2, face).unwrap(),
            TextureLayout::DepthStencilAttachment
        );
        assert_eq!(atlas.face_layout(1, face).unwrap(), TextureLayout::Undefined);
    }
    assert!(matches!(
        atlas.transition_cube_to_attachment(4),
        Err(Error::InvalidResource(_))
    ));
}

// ============================================================================
// BUFFERS
// ============================================================================

#[test]
fn test_zero_sized_buffer_rejected() {
    let ctx = MockGraphicsContext::new();
    assert!(matches!(
        ctx.create_buffer(0, BufferUsage::VERTEX, MemoryProperty::DEVICE_LOCAL),
        Err(Error::InvalidResource(_))
    ));
}

#[test]
fn test_device_local_buffer_cannot_map() {
    let ctx = MockGraphicsContext::new();
    let buffer = ctx
        .create_buffer(64, BufferUsage::VERTEX, MemoryProperty::DEVICE_LOCAL)
        .unwrap();
    assert!(matches!(buffer.map(), Err(Error::InvalidOperation(_))));
    buffer.upload(0, &[1, 2, 3, 4]).unwrap();
    assert_eq!(buffer.read(0, 4).unwrap(), vec![1, 2, 3, 4]);
}
