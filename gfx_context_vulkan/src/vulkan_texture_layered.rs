//! Layered textures: 2D arrays, cube maps and cube map arrays
//!
//! All three are one `VulkanImage` with several layers; the traits only
//! differ in how layers are addressed (index, face, cube + face).

use crate::vulkan_gpu_context::GpuContext;
use crate::vulkan_image::{ImageDesc, ImageKind, VulkanImage};
use gfx_context::gfx::{
    cube_array_layer, CubeFace, Error, LayoutTracker, Result, TextureArray, TextureCube,
    TextureCubeArray, TextureFormat, TextureLayout,
};
use std::any::Any;
use std::sync::Arc;

// ============================================================================
// TEXTURE ARRAY
// ============================================================================

pub struct VulkanTextureArray {
    image: VulkanImage,
}

impl VulkanTextureArray {
    pub fn new(
        ctx: Arc<GpuContext>,
        width: u32,
        height: u32,
        array_size: u32,
        format: TextureFormat,
    ) -> Result<Self> {
        let desc = ImageDesc::new(width, height, format, ImageKind::Array { layers: array_size });
        Ok(Self {
            image: VulkanImage::new(ctx, desc)?,
        })
    }

    pub fn image(&self) -> &VulkanImage {
        &self.image
    }
}

impl TextureArray for VulkanTextureArray {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn array_size(&self) -> u32 {
        self.image.layer_count()
    }

    fn format(&self) -> TextureFormat {
        self.image.format()
    }

    fn layout_tracker(&self) -> &Arc<LayoutTracker> {
        self.image.tracker()
    }

    fn upload_layer(&self, layer: u32, pixels: &[u8]) -> Result<()> {
        self.image.upload_layer(layer, pixels)
    }

    fn transition_layer_to_attachment(&self, layer: u32) -> Result<()> {
        self.image.check_layer(layer)?;
        self.image
            .transition(layer..layer + 1, TextureLayout::attachment_for(self.image.format()))
    }

    fn transition_layer_to_sampled(&self, layer: u32) -> Result<()> {
        self.image.check_layer(layer)?;
        self.image.transition(layer..layer + 1, TextureLayout::ShaderReadOnly)
    }

    fn transition_all_to_sampled(&self) -> Result<()> {
        self.image
            .transition(0..self.image.layer_count(), TextureLayout::ShaderReadOnly)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// CUBE
// ============================================================================

pub struct VulkanTextureCube {
    image: VulkanImage,
}

impl VulkanTextureCube {
    pub fn new(ctx: Arc<GpuContext>, size: u32, format: TextureFormat) -> Result<Self> {
        let desc = ImageDesc::new(size, size, format, ImageKind::Cube);
        Ok(Self {
            image: VulkanImage::new(ctx, desc)?,
        })
    }

    pub fn image(&self) -> &VulkanImage {
        &self.image
    }
}

impl TextureCube for VulkanTextureCube {
    fn size(&self) -> u32 {
        self.image.width()
    }

    fn format(&self) -> TextureFormat {
        self.image.format()
    }

    fn layout_tracker(&self) -> &Arc<LayoutTracker> {
        self.image.tracker()
    }

    fn upload_face(&self, face: CubeFace, pixels: &[u8]) -> Result<()> {
        self.image.upload_layer(face.index(), pixels)
    }

    fn transition_face_to_attachment(&self, face: CubeFace) -> Result<()> {
        let layer = face.index();
        self.image
            .transition(layer..layer + 1, TextureLayout::attachment_for(self.image.format()))
    }

    fn transition_to_attachment(&self) -> Result<()> {
        self.image
            .transition(0..6, TextureLayout::attachment_for(self.image.format()))
    }

    fn transition_to_sampled(&self) -> Result<()> {
        self.image.transition(0..6, TextureLayout::ShaderReadOnly)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// CUBE ARRAY
// ============================================================================

pub struct VulkanTextureCubeArray {
    image: VulkanImage,
    cubes: u32,
}

impl VulkanTextureCubeArray {
    pub fn new(ctx: Arc<GpuContext>, size: u32, array_size: u32, format: TextureFormat) -> Result<Self> {
        let desc = ImageDesc::new(size, size, format, ImageKind::CubeArray { cubes: array_size });
        Ok(Self {
            image: VulkanImage::new(ctx, desc)?,
            cubes: array_size,
        })
    }

    pub fn image(&self) -> &VulkanImage {
        &self.image
    }

    fn check_cube(&self, cube_index: u32) -> Result<()> {
        if cube_index >= self.cubes {
            return Err(Error::InvalidResource(format!(
                "cube {} outside cube array of {} cubes",
                cube_index, self.cubes
            )));
        }
        Ok(())
    }
}

impl TextureCubeArray for VulkanTextureCubeArray {
    fn size(&self) -> u32 {
        self.image.width()
    }

    fn array_size(&self) -> u32 {
        self.cubes
    }

    fn format(&self) -> TextureFormat {
        self.image.format()
    }

    fn layout_tracker(&self) -> &Arc<LayoutTracker> {
        self.image.tracker()
    }

    fn transition_cube_to_attachment(&self, cube_index: u32) -> Result<()> {
        self.check_cube(cube_index)?;
        let first = cube_array_layer(cube_index, CubeFace::PositiveX);
        self.image
            .transition(first..first + 6, TextureLayout::attachment_for(self.image.format()))
    }

    fn transition_face_to_attachment(&self, cube_index: u32, face: CubeFace) -> Result<()> {
        self.check_cube(cube_index)?;
        let layer = cube_array_layer(cube_index, face);
        self.image
            .transition(layer..layer + 1, TextureLayout::attachment_for(self.image.format()))
    }

    fn transition_to_sampled(&self) -> Result<()> {
        self.image
            .transition(0..self.image.layer_count(), TextureLayout::ShaderReadOnly)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
