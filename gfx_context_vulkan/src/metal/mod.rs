//! macOS Metal path
//!
//! Skia renders through Metal while the 3D pipeline runs on Vulkan
//! (MoltenVK). Shared textures are one allocation seen by both APIs.
//! Nothing here synchronises the two queues: call `wait_idle` on the side
//! that last wrote before the other API reads.

mod composite_context;
mod metal_context;
mod metal_shared_texture;

pub use composite_context::CompositeContext;
pub use metal_context::MetalContext;
pub use metal_shared_texture::MetalVulkanSharedTexture;
