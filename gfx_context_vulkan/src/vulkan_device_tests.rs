//! Unit tests for vulkan_device.rs

use super::*;

fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
    vk::QueueFamilyProperties {
        queue_flags: flags,
        queue_count: 1,
        ..Default::default()
    }
}

// ============================================================================
// QUEUE FAMILY TESTS
// ============================================================================

#[test]
fn test_first_graphics_family_wins() {
    let families = [
        family(vk::QueueFlags::TRANSFER),
        family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
        family(vk::QueueFlags::GRAPHICS),
    ];
    assert_eq!(find_graphics_queue_family(&families), Some(1));
}

#[test]
fn test_no_graphics_family() {
    let families = [family(vk::QueueFlags::COMPUTE), family(vk::QueueFlags::TRANSFER)];
    assert_eq!(find_graphics_queue_family(&families), None);
    assert_eq!(find_graphics_queue_family(&[]), None);
}

// ============================================================================
// EXTENSION TESTS
// ============================================================================

#[test]
fn test_device_wishlist() {
    let wishlist = device_extension_wishlist();
    assert_eq!(wishlist[0], ash::khr::swapchain::NAME);
    assert_eq!(
        wishlist.contains(&ash::ext::metal_objects::NAME),
        cfg!(target_os = "macos")
    );
    assert_eq!(
        wishlist.contains(&ash::khr::portability_subset::NAME),
        cfg!(target_os = "macos")
    );
}
