//! End-to-end rendering tests against the CPU mock context
//!
//! These tests walk the same sequence an application runs on a GPU context:
//! factory, textures, render pass, framebuffer, pipeline, descriptors,
//! submit, readback. No GPU required.
//!
//! Run with: cargo test --test mock_rendering_integration_tests

use gfx_context::gfx::mock::{MockBackend, MockGraphicsContext};
use gfx_context::gfx::*;

const FULLSCREEN_VERT: &str = r#"#version 450
layout(location = 0) out vec2 v_uv;
void main() {
    vec2 uv = vec2(float((gl_VertexIndex << 1) & 2), float(gl_VertexIndex & 2));
    v_uv = uv;
    gl_Position = vec4(uv * 2.0 - 1.0, 0.0, 1.0);
}
"#;

const COMPOSITE_FRAG: &str = r#"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;
void main() {
    out_color = vec4(v_uv, 0.0, 1.0);
}
"#;

// ============================================================================
// CLEAR + READBACK
// ============================================================================

#[test]
fn test_integration_clear_and_download() {
    let factory = GraphicsContextFactory::new(MockBackend::with_default_gpus());
    let ctx = factory.get_or_create_shared().unwrap().unwrap();

    let target = ctx.create_texture(256, 256, TextureFormat::Rgba8Unorm).unwrap();
    let mut pass = ctx
        .create_render_pass_3d(&RenderPassDesc::new(vec![TextureFormat::Rgba8Unorm], None))
        .unwrap();
    target.prepare_for_render().unwrap();
    let framebuffer = ctx
        .create_framebuffer_3d(
            pass.as_ref(),
            &[AttachmentView::texture(target.as_texture_2d())],
            None,
        )
        .unwrap();
    assert_eq!((framebuffer.width(), framebuffer.height()), (256, 256));

    pass.begin(framebuffer.as_ref(), &[ClearColor::from_rgba8(255, 0, 0, 255)], 1.0)
        .unwrap();
    pass.end().unwrap();

    let pixels = target.download_pixels().unwrap();
    assert_eq!(pixels.len(), 256 * 256 * 4);
    assert!(pixels.chunks_exact(4).all(|p| p == [255, 0, 0, 255]));
    assert_eq!(target.layout(), TextureLayout::ShaderReadOnly);

    drop(framebuffer);
    drop(pass);
    drop(target);
    factory.shutdown().unwrap();
    assert!(ctx.is_disposed());
}

#[test]
fn test_integration_mrt_gbuffer_clear() {
    let ctx = MockGraphicsContext::new();
    let formats = [
        TextureFormat::Rgba8Unorm,
        TextureFormat::Bgra8Unorm,
        TextureFormat::Rgba32Float,
    ];
    let targets: Vec<_> = formats
        .iter()
        .map(|f| ctx.create_texture_2d(8, 8, *f).unwrap())
        .collect();
    let depth = ctx.create_texture_2d(8, 8, TextureFormat::Depth32Float).unwrap();
    for t in &targets {
        t.prepare_for_render().unwrap();
    }
    depth.prepare_for_render().unwrap();

    let mut pass = ctx
        .create_render_pass_3d(&RenderPassDesc::new(
            formats.to_vec(),
            Some(TextureFormat::Depth32Float),
        ))
        .unwrap();
    let views: Vec<_> = targets.iter().map(|t| AttachmentView::texture(t.as_ref())).collect();
    let framebuffer = ctx
        .create_framebuffer_3d(pass.as_ref(), &views, Some(AttachmentView::texture(depth.as_ref())))
        .unwrap();
    assert!(framebuffer.has_depth());

    let clears = [
        ClearColor::from_rgba8(0, 0, 255, 255),
        ClearColor::from_rgba8(0, 0, 255, 255),
        ClearColor::new(0.25, 0.5, 0.75, 1.0),
    ];
    pass.begin(framebuffer.as_ref(), &clears, 0.5).unwrap();
    pass.end().unwrap();

    assert_eq!(&targets[0].download_pixels().unwrap()[..4], &[0, 0, 255, 255]);
    // BGRA stores blue first
    assert_eq!(&targets[1].download_pixels().unwrap()[..4], &[255, 0, 0, 255]);

    let hdr = targets[2].download_pixels().unwrap();
    let first = f32::from_ne_bytes([hdr[8], hdr[9], hdr[10], hdr[11]]);
    assert_eq!(first, 0.75);

    let depth_pixels = depth.download_pixels().unwrap();
    assert_eq!(f32::from_ne_bytes([depth_pixels[0], depth_pixels[1], depth_pixels[2], depth_pixels[3]]), 0.5);
}

#[test]
fn test_integration_load_op_preserves_contents() {
    let ctx = MockGraphicsContext::new();
    let target = ctx.create_texture_2d(2, 2, TextureFormat::Rgba8Unorm).unwrap();
    target.upload(&[9u8; 16]).unwrap();
    target.prepare_for_render().unwrap();

    let mut pass = ctx
        .create_render_pass_3d(
            &RenderPassDesc::new(vec![TextureFormat::Rgba8Unorm], None)
                .with_load_ops(AttachmentLoadOp::Load, AttachmentLoadOp::DontCare),
        )
        .unwrap();
    let framebuffer = ctx
        .create_framebuffer_3d(pass.as_ref(), &[AttachmentView::texture(target.as_ref())], None)
        .unwrap();
    pass.begin(framebuffer.as_ref(), &[ClearColor::WHITE], 1.0).unwrap();
    pass.end().unwrap();

    assert_eq!(target.download_pixels().unwrap(), vec![9u8; 16]);
}

// ============================================================================
// SHADOW ATLAS + SAMPLING
// ============================================================================

#[test]
fn test_integration_shadow_cascades_then_sample() {
    let ctx = MockGraphicsContext::new();
    let compiler = NagaShaderCompiler::default();
    let vertex = compiler
        .compile_to_spirv(FULLSCREEN_VERT, ShaderStage::Vertex)
        .unwrap();
    let fragment = compiler
        .compile_to_spirv(COMPOSITE_FRAG, ShaderStage::Fragment)
        .unwrap();

    let cascades = ctx
        .create_texture_array(64, 64, 4, TextureFormat::Rgba8Unorm)
        .unwrap();
    let mut shadow_pass = ctx
        .create_render_pass_3d(&RenderPassDesc::new(vec![TextureFormat::Rgba8Unorm], None))
        .unwrap();

    for layer in 0..cascades.array_size() {
        cascades.transition_layer_to_attachment(layer).unwrap();
        let framebuffer = ctx
            .create_framebuffer_3d(
                shadow_pass.as_ref(),
                &[AttachmentView::layer(cascades.as_ref(), layer).unwrap()],
                None,
            )
            .unwrap();
        shadow_pass
            .begin(framebuffer.as_ref(), &[ClearColor::WHITE], 1.0)
            .unwrap();
        shadow_pass.end().unwrap();
    }

    let bindings = vec![DescriptorBinding::new(
        0,
        DescriptorType::CombinedImageSampler,
        ShaderStages::FRAGMENT,
    )];
    let output = ctx.create_texture_2d(64, 64, TextureFormat::Rgba8Unorm).unwrap();
    let mut composite = ctx
        .create_render_pass_3d(&RenderPassDesc::new(vec![TextureFormat::Rgba8Unorm], None))
        .unwrap();
    let pipeline = ctx
        .create_pipeline_3d(
            composite.as_ref(),
            &PipelineDesc::new(vertex, fragment).with_bindings(bindings.clone()),
        )
        .unwrap();
    let mut set = ctx
        .create_descriptor_set(pipeline.as_ref(), &DescriptorPoolSize::for_bindings(&bindings))
        .unwrap();
    let sampler = ctx.create_sampler(&SamplerDesc::linear_clamp()).unwrap();
    set.update_texture(0, SampledTexture::Array(cascades.as_ref()), sampler.as_ref())
        .unwrap();

    output.prepare_for_render().unwrap();
    let framebuffer = ctx
        .create_framebuffer_3d(composite.as_ref(), &[AttachmentView::texture(output.as_ref())], None)
        .unwrap();
    composite
        .begin(framebuffer.as_ref(), &[ClearColor::BLACK], 1.0)
        .unwrap();
    composite.bind_pipeline(pipeline.as_ref()).unwrap();

    // Cascades still in attachment layout
    assert!(matches!(
        composite.bind_descriptor_set(pipeline.as_ref(), set.as_ref()),
        Err(Error::InvalidOperation(_))
    ));

    cascades.transition_all_to_sampled().unwrap();
    composite
        .bind_descriptor_set(pipeline.as_ref(), set.as_ref())
        .unwrap();
    composite.draw(3, 1).unwrap();
    composite.end().unwrap();

    assert_eq!(ctx.submitted_passes(), 5);
    assert_eq!(ctx.draw_calls(), 1);
}

#[test]
fn test_integration_point_light_cube_array_faces() {
    let ctx = MockGraphicsContext::new();
    let atlas = ctx
        .create_texture_cube_array(32, 2, TextureFormat::R32Float)
        .unwrap();
    let mut pass = ctx
        .create_render_pass_3d(&RenderPassDesc::new(vec![TextureFormat::R32Float], None))
        .unwrap();

    atlas.transition_cube_to_attachment(1).unwrap();
    for face in CubeFace::ALL {
        let view = AttachmentView::cube_array_face(atlas.as_ref(), 1, face).unwrap();
        assert_eq!(view.layer_index(), 6 + face.index());
        let framebuffer = ctx.create_framebuffer_3d(pass.as_ref(), &[view], None).unwrap();
        pass.begin(framebuffer.as_ref(), &[ClearColor::new(100.0, 0.0, 0.0, 0.0)], 1.0)
            .unwrap();
        pass.end().unwrap();
    }

    assert!(AttachmentView::cube_array_face(atlas.as_ref(), 2, CubeFace::PositiveX).is_err());
    // Cube 0 was never an attachment
    let view = AttachmentView::cube_array_face(atlas.as_ref(), 0, CubeFace::PositiveX).unwrap();
    let framebuffer = ctx.create_framebuffer_3d(pass.as_ref(), &[view], None).unwrap();
    assert!(pass
        .begin(framebuffer.as_ref(), &[ClearColor::BLACK], 1.0)
        .is_err());
}
