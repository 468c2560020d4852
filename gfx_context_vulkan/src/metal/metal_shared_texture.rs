/// MetalVulkanSharedTexture - one allocation, two APIs
///
/// The Vulkan image is created exportable (`VK_EXT_metal_objects`) on a
/// dedicated allocation, then exported as the `MTLTexture` aliasing the same
/// memory. The 3D side goes through the Vulkan image and its layout tracker;
/// Skia draws into the Metal texture. No barrier is inserted between the two.

use super::metal_context::MetalContext;
use crate::vulkan_gpu_context::GpuContext;
use crate::vulkan_image::{ImageDesc, ImageKind, VulkanImage};
use ash::vk::{self, Handle};
use gfx_context::gfx::{
    Error, LayoutTracker, Result, SharedTexture, Texture2D, TextureFormat, TextureLayout,
};
use gfx_context::{gfx_error, gfx_warn};
use std::any::Any;
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::Arc;

const SOURCE: &str = "gfx::metal::shared_texture";

/// `id<MTLTexture>` owned by the driver for as long as the image lives
struct ExportedTexture(NonNull<c_void>);

// The handle is only passed to Skia on the render thread
unsafe impl Send for ExportedTexture {}
unsafe impl Sync for ExportedTexture {}

pub struct MetalVulkanSharedTexture {
    exported: ExportedTexture,
    image: VulkanImage,
    metal: Arc<MetalContext>,
}

impl MetalVulkanSharedTexture {
    pub fn new(
        ctx: Arc<GpuContext>,
        metal: Arc<MetalContext>,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Self> {
        if !ctx.vulkan_device().has_extension(ash::ext::metal_objects::NAME) {
            return Err(Error::UnsupportedPlatform(
                "VK_EXT_metal_objects is not enabled on this device".to_string(),
            ));
        }

        let mut desc = ImageDesc::new(width, height, format, ImageKind::Texture2D);
        desc.export_metal = true;
        let image = VulkanImage::new(ctx.clone(), desc)?;

        let (texture, device) = export_metal_texture(&ctx, image.handle());
        let texture = NonNull::new(texture).ok_or_else(|| {
            gfx_error!(SOURCE, "vkExportMetalObjectsEXT returned no MTLTexture");
            Error::NullHandle("exported MTLTexture is nil".to_string())
        })?;

        if device as usize != metal.device_id() {
            gfx_warn!(
                SOURCE,
                "Exported texture lives on another MTLDevice than the Metal context ({})",
                metal.device_name()
            );
        }

        Ok(Self {
            exported: ExportedTexture(texture),
            image,
            metal,
        })
    }

    pub fn image(&self) -> &VulkanImage {
        &self.image
    }

    /// Raw `id<MTLTexture>`
    pub fn metal_texture(&self) -> *mut c_void {
        self.exported.0.as_ptr()
    }
}

/// Export plane 0 of `image` and the device it lives on
fn export_metal_texture(ctx: &GpuContext, image: vk::Image) -> (*mut c_void, *mut c_void) {
    let device = ctx.device();
    let loader = ash::ext::metal_objects::Device::new(ctx.vulkan_device().instance().handle(), device);

    let mut texture_info = vk::ExportMetalTextureInfoEXT::default()
        .image(image)
        .plane(vk::ImageAspectFlags::PLANE_0);
    let mut device_info = vk::ExportMetalDeviceInfoEXT::default();
    let mut export_info = vk::ExportMetalObjectsInfoEXT::default()
        .push_next(&mut texture_info)
        .push_next(&mut device_info);

    unsafe {
        (loader.fp().export_metal_objects_ext)(device.handle(), &mut export_info);
    }

    gfx_context::gfx_trace!(SOURCE, "Exported image 0x{:x} to Metal", image.as_raw());
    (texture_info.mtl_texture, device_info.mtl_device)
}

impl Texture2D for MetalVulkanSharedTexture {
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
        self.prepare_for_render()?;
        self.metal.wrap_texture(
            self.metal_texture(),
            self.image.format(),
            self.image.width(),
            self.image.height(),
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl SharedTexture for MetalVulkanSharedTexture {
    fn as_texture_2d(&self) -> &dyn Texture2D {
        self
    }

    fn is_cross_api(&self) -> bool {
        true
    }
}
