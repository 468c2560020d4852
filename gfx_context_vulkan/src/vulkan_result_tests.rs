//! Unit tests for vulkan_result.rs

use super::*;

// ============================================================================
// NATIVE ERROR TESTS
// ============================================================================

#[test]
fn test_native_error_carries_result_code() {
    let error = native_error("gfx::vulkan", "vkCreateImage", vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
    assert_eq!(
        error,
        Error::NativeCallFailed {
            call: "vkCreateImage".to_string(),
            code: -2,
        }
    );
    assert_eq!(error.native_code(), Some(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY.as_raw()));
}

#[test]
fn test_native_ext_passes_success_through() {
    let ok: std::result::Result<u32, vk::Result> = Ok(7);
    assert_eq!(ok.native("gfx::vulkan", "vkTest").unwrap(), 7);

    let failed: std::result::Result<u32, vk::Result> = Err(vk::Result::ERROR_DEVICE_LOST);
    let error = failed.native("gfx::vulkan", "vkQueueSubmit").unwrap_err();
    assert_eq!(error.native_code(), Some(-4));
}

#[test]
fn test_incompatible_driver_keeps_code() {
    let failed: std::result::Result<(), vk::Result> = Err(vk::Result::ERROR_INCOMPATIBLE_DRIVER);
    let error = failed.native("gfx::vulkan::instance", "vkCreateInstance").unwrap_err();
    assert_eq!(
        error,
        Error::NativeCallFailed {
            call: "vkCreateInstance".to_string(),
            code: -9,
        }
    );
}
