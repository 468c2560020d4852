/// VulkanTexture2D - Vulkan implementation of Texture2D and SharedTexture
///
/// Also hosts `image_of`, the downcast used by framebuffers and descriptor
/// sets to reach the `VulkanImage` behind any texture trait object.

use crate::vulkan_image::{ImageDesc, ImageKind, VulkanImage};
use crate::vulkan_gpu_context::GpuContext;
use crate::vulkan_skia::SkiaBridge;
use crate::vulkan_texture_layered::{VulkanTextureArray, VulkanTextureCube, VulkanTextureCubeArray};
use gfx_context::gfx::{
    Error, LayoutTracker, Result, SharedTexture, Texture2D, TextureFormat, TextureLayout,
};
use std::any::Any;
use std::sync::Arc;

/// The Vulkan image behind a texture created by this backend
pub fn image_of(any: &dyn Any) -> Option<&VulkanImage> {
    if let Some(t) = any.downcast_ref::<VulkanTexture2D>() {
        return Some(&t.image);
    }
    if let Some(t) = any.downcast_ref::<VulkanTextureArray>() {
        return Some(t.image());
    }
    if let Some(t) = any.downcast_ref::<VulkanTextureCube>() {
        return Some(t.image());
    }
    if let Some(t) = any.downcast_ref::<VulkanTextureCubeArray>() {
        return Some(t.image());
    }
    #[cfg(target_os = "macos")]
    if let Some(t) = any.downcast_ref::<crate::metal::MetalVulkanSharedTexture>() {
        return Some(t.image());
    }
    None
}

pub struct VulkanTexture2D {
    image: VulkanImage,
    /// None where Skia has no Vulkan backend (macOS)
    skia: Option<Arc<SkiaBridge>>,
}

/// The shared (2D + 3D) texture of the plain Vulkan context
pub type VulkanSharedTexture = VulkanTexture2D;

impl VulkanTexture2D {
    pub fn new(
        ctx: Arc<GpuContext>,
        width: u32,
        height: u32,
        format: TextureFormat,
        skia: Option<Arc<SkiaBridge>>,
    ) -> Result<Self> {
        let image = VulkanImage::new(ctx, ImageDesc::new(width, height, format, ImageKind::Texture2D))?;
        Ok(Self { image, skia })
    }

    pub fn image(&self) -> &VulkanImage {
        &self.image
    }
}

impl Texture2D for VulkanTexture2D {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn format(&self) -> TextureFormat {
        self.image.format()
    }

    fn layout_tracker(&self) -> &Arc<LayoutTracker> {
        self.image.tracker()
    }

    fn upload(&self, pixels: &[u8]) -> Result<()> {
        self.image.upload_layer(0, pixels)
    }

    fn download_pixels(&self) -> Result<Vec<u8>> {
        self.image.download_layer(0)
    }

    fn transition_to(&self, layout: TextureLayout) -> Result<()> {
        self.image.transition(0..1, layout)
    }

    fn create_skia_surface(&self) -> Result<skia_safe::Surface> {
        let skia = self.skia.as_ref().ok_or_else(|| {
            Error::UnsupportedPlatform(
                "Skia has no Vulkan backend on this platform; use the composite context".to_string(),
            )
        })?;
        if self.image.format().to_skia_color_type().is_none() {
            return Err(Error::InvalidOperation(format!(
                "{:?} has no Skia color type",
                self.image.format()
            )));
        }
        self.prepare_for_render()?;
        skia.wrap_render_target(
            self.image.handle(),
            self.image.format(),
            self.image.width(),
            self.image.height(),
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl SharedTexture for VulkanTexture2D {
    fn as_texture_2d(&self) -> &dyn Texture2D {
        self
    }
}
