//! Unit tests for vulkan_image.rs

use super::*;

// ============================================================================
// IMAGE KIND TESTS
// ============================================================================

#[test]
fn test_layer_counts() {
    assert_eq!(ImageKind::Texture2D.layer_count().unwrap(), 1);
    assert_eq!(ImageKind::Array { layers: 4 }.layer_count().unwrap(), 4);
    assert_eq!(ImageKind::Cube.layer_count().unwrap(), 6);
    assert_eq!(ImageKind::CubeArray { cubes: 3 }.layer_count().unwrap(), 18);
}

#[test]
fn test_cube_array_overflow() {
    let result = ImageKind::CubeArray { cubes: u32::MAX }.layer_count();
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

#[test]
fn test_view_types_and_flags() {
    assert_eq!(ImageKind::Texture2D.view_type(), vk::ImageViewType::TYPE_2D);
    assert_eq!(ImageKind::Array { layers: 2 }.view_type(), vk::ImageViewType::TYPE_2D_ARRAY);
    assert_eq!(ImageKind::Cube.view_type(), vk::ImageViewType::CUBE);
    assert_eq!(ImageKind::CubeArray { cubes: 2 }.view_type(), vk::ImageViewType::CUBE_ARRAY);

    assert!(ImageKind::Cube.create_flags().contains(vk::ImageCreateFlags::CUBE_COMPATIBLE));
    assert!(ImageKind::CubeArray { cubes: 1 }
        .create_flags()
        .contains(vk::ImageCreateFlags::CUBE_COMPATIBLE));
    assert!(ImageKind::Texture2D.create_flags().is_empty());
    assert!(ImageKind::Array { layers: 2 }.create_flags().is_empty());
}

// ============================================================================
// DESC VALIDATION TESTS
// ============================================================================

#[test]
fn test_validate_accepts_square_cube() {
    let desc = ImageDesc::new(64, 64, TextureFormat::Rgba8Unorm, ImageKind::Cube);
    assert_eq!(desc.validate().unwrap(), 6);
    assert!(!desc.export_metal);
}

#[test]
fn test_validate_rejects_zero_extent() {
    let desc = ImageDesc::new(0, 16, TextureFormat::Rgba8Unorm, ImageKind::Texture2D);
    assert!(matches!(desc.validate(), Err(Error::InvalidResource(_))));

    let desc = ImageDesc::new(16, 16, TextureFormat::Rgba8Unorm, ImageKind::Array { layers: 0 });
    assert!(matches!(desc.validate(), Err(Error::InvalidResource(_))));
}

#[test]
fn test_validate_rejects_non_square_cube() {
    let desc = ImageDesc::new(64, 32, TextureFormat::Depth32Float, ImageKind::CubeArray { cubes: 2 });
    assert!(matches!(desc.validate(), Err(Error::InvalidResource(_))));
}

// ============================================================================
// COPY REGION TESTS
// ============================================================================

#[test]
fn test_copy_region_targets_one_layer() {
    let region = layer_copy_region(128, 64, TextureFormat::Rgba8Unorm, 5);
    assert_eq!(region.image_subresource.base_array_layer, 5);
    assert_eq!(region.image_subresource.layer_count, 1);
    assert_eq!(region.image_subresource.aspect_mask, vk::ImageAspectFlags::COLOR);
    assert_eq!((region.image_extent.width, region.image_extent.height), (128, 64));
    assert_eq!(region.buffer_row_length, 0);
}

#[test]
fn test_depth_copies_use_depth_aspect_only() {
    let region = layer_copy_region(8, 8, TextureFormat::Depth24UnormStencil8, 0);
    assert_eq!(region.image_subresource.aspect_mask, vk::ImageAspectFlags::DEPTH);
    assert_eq!(sample_aspect(TextureFormat::Depth32Float), vk::ImageAspectFlags::DEPTH);
    assert_eq!(sample_aspect(TextureFormat::R16Float), vk::ImageAspectFlags::COLOR);
}
