//! Unit tests for vulkan_command_pool.rs
//!
//! Only the barrier table; submission needs a device.

use super::*;

type S = vk::PipelineStageFlags;
type A = vk::AccessFlags;

// ============================================================================
// COLOR TRANSITIONS
// ============================================================================

#[test]
fn test_undefined_to_color_attachment() {
    let masks = barrier_for(TextureLayout::Undefined, TextureLayout::ColorAttachment);
    assert_eq!(masks.src_stage, S::TOP_OF_PIPE);
    assert_eq!(masks.dst_stage, S::COLOR_ATTACHMENT_OUTPUT);
    assert_eq!(masks.src_access, A::empty());
    assert_eq!(masks.dst_access, A::COLOR_ATTACHMENT_WRITE);
}

#[test]
fn test_color_attachment_to_sampled_and_back() {
    let to_sampled = barrier_for(TextureLayout::ColorAttachment, TextureLayout::ShaderReadOnly);
    assert_eq!(to_sampled.src_stage, S::COLOR_ATTACHMENT_OUTPUT);
    assert_eq!(to_sampled.dst_stage, S::FRAGMENT_SHADER | S::COMPUTE_SHADER);
    assert_eq!(to_sampled.src_access, A::COLOR_ATTACHMENT_WRITE);
    assert_eq!(to_sampled.dst_access, A::SHADER_READ);

    let back = barrier_for(TextureLayout::ShaderReadOnly, TextureLayout::ColorAttachment);
    assert_eq!(back.src_stage, to_sampled.dst_stage);
    assert_eq!(back.dst_stage, to_sampled.src_stage);
    assert_eq!(back.src_access, A::SHADER_READ);
    assert_eq!(back.dst_access, A::COLOR_ATTACHMENT_WRITE);
}

#[test]
fn test_color_attachment_readback_pair() {
    let to_src = barrier_for(TextureLayout::ColorAttachment, TextureLayout::TransferSrc);
    assert_eq!(to_src.dst_stage, S::TRANSFER);
    assert_eq!(to_src.dst_access, A::TRANSFER_READ);

    let back = barrier_for(TextureLayout::TransferSrc, TextureLayout::ColorAttachment);
    assert_eq!(back.src_stage, S::TRANSFER);
    assert_eq!(back.src_access, A::TRANSFER_READ);
    assert_eq!(back.dst_access, A::COLOR_ATTACHMENT_WRITE);
}

// ============================================================================
// DEPTH TRANSITIONS
// ============================================================================

#[test]
fn test_depth_transitions() {
    let tests = S::EARLY_FRAGMENT_TESTS | S::LATE_FRAGMENT_TESTS;
    let rw = A::DEPTH_STENCIL_ATTACHMENT_READ | A::DEPTH_STENCIL_ATTACHMENT_WRITE;

    let init = barrier_for(TextureLayout::Undefined, TextureLayout::DepthStencilAttachment);
    assert_eq!((init.src_stage, init.dst_stage), (S::TOP_OF_PIPE, tests));
    assert_eq!(init.dst_access, rw);

    let sampled = barrier_for(TextureLayout::DepthStencilAttachment, TextureLayout::ShaderReadOnly);
    assert_eq!((sampled.src_stage, sampled.dst_stage), (tests, S::FRAGMENT_SHADER));
    assert_eq!(sampled.src_access, A::DEPTH_STENCIL_ATTACHMENT_WRITE);

    let back = barrier_for(TextureLayout::ShaderReadOnly, TextureLayout::DepthStencilAttachment);
    assert_eq!((back.src_stage, back.dst_stage), (S::FRAGMENT_SHADER, tests));
    assert_eq!(back.dst_access, rw);
}

// ============================================================================
// UPLOAD + FALLBACK
// ============================================================================

#[test]
fn test_upload_transitions() {
    let to_dst = barrier_for(TextureLayout::Undefined, TextureLayout::TransferDst);
    assert_eq!((to_dst.src_stage, to_dst.dst_stage), (S::TOP_OF_PIPE, S::TRANSFER));
    assert_eq!(to_dst.dst_access, A::TRANSFER_WRITE);

    let to_sampled = barrier_for(TextureLayout::TransferDst, TextureLayout::ShaderReadOnly);
    assert_eq!((to_sampled.src_stage, to_sampled.dst_stage), (S::TRANSFER, S::FRAGMENT_SHADER));
    assert_eq!(to_sampled.src_access, A::TRANSFER_WRITE);
    assert_eq!(to_sampled.dst_access, A::SHADER_READ);
}

#[test]
fn test_unlisted_pair_uses_full_barrier() {
    for (old, new) in [
        (TextureLayout::ShaderReadOnly, TextureLayout::TransferSrc),
        (TextureLayout::TransferSrc, TextureLayout::ShaderReadOnly),
        (TextureLayout::ShaderReadOnly, TextureLayout::TransferDst),
    ] {
        let masks = barrier_for(old, new);
        assert_eq!(masks.src_stage, S::ALL_COMMANDS, "{:?} -> {:?}", old, new);
        assert_eq!(masks.dst_stage, S::ALL_COMMANDS);
        assert_eq!(masks.src_access, A::MEMORY_WRITE);
        assert_eq!(masks.dst_access, A::MEMORY_READ | A::MEMORY_WRITE);
    }
}
