//! Mapping of failing `VkResult`s to `Error::NativeCallFailed`

use ash::vk;
use gfx_context::gfx::Error;
use gfx_context::gfx_error;

/// Log a failed native call and build the matching error
pub fn native_error(source: &str, call: &str, result: vk::Result) -> Error {
    gfx_error!(source, "{} failed: {:?}", call, result);
    Error::NativeCallFailed {
        call: call.to_string(),
        code: result.as_raw(),
    }
}

/// `.native(source, "vkCreateImage")?` on any ash call
pub trait VkResultExt<T> {
    fn native(self, source: &str, call: &str) -> gfx_context::gfx::Result<T>;
}

impl<T> VkResultExt<T> for std::result::Result<T, vk::Result> {
    fn native(self, source: &str, call: &str) -> gfx_context::gfx::Result<T> {
        self.map_err(|result| native_error(source, call, result))
    }
}

#[cfg(test)]
#[path = "vulkan_result_tests.rs"]
mod tests;
