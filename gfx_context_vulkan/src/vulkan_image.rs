//! Image core shared by every texture kind
//!
//! A `VulkanImage` owns the image, its memory, one view over the whole
//! resource (2D, 2D array, cube or cube array) and one 2D view per layer for
//! use as a framebuffer attachment. Layer layouts live in a `LayoutTracker`;
//! every transition goes through `transition` so the tracker and the GPU
//! never disagree.

use crate::vulkan_buffer::StagingBuffer;
use crate::vulkan_command_pool::record_layout_transition;
use crate::vulkan_format::{aspect_mask, image_usage, to_vk_format, to_vk_layout};
use crate::vulkan_gpu_context::GpuContext;
use crate::vulkan_result::VkResultExt;
use ash::vk;
use gfx_context::gfx::{Error, LayoutTracker, Result, TextureFormat, TextureLayout};
use gfx_context::gfx_trace;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::ops::Range;
use std::sync::Arc;

const SOURCE: &str = "gfx::vulkan::image";

/// Shape of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Texture2D,
    Array { layers: u32 },
    Cube,
    CubeArray { cubes: u32 },
}

impl ImageKind {
    /// Total array layers (six per cube)
    pub fn layer_count(&self) -> Result<u32> {
        match *self {
            ImageKind::Texture2D => Ok(1),
            ImageKind::Array { layers } => Ok(layers),
            ImageKind::Cube => Ok(6),
            ImageKind::CubeArray { cubes } => cubes.checked_mul(6).ok_or_else(|| {
                Error::InvalidResource(format!("cube array of {} cubes is too large", cubes))
            }),
        }
    }

    pub fn view_type(&self) -> vk::ImageViewType {
        match self {
            ImageKind::Texture2D => vk::ImageViewType::TYPE_2D,
            ImageKind::Array { .. } => vk::ImageViewType::TYPE_2D_ARRAY,
            ImageKind::Cube => vk::ImageViewType::CUBE,
            ImageKind::CubeArray { .. } => vk::ImageViewType::CUBE_ARRAY,
        }
    }

    pub fn create_flags(&self) -> vk::ImageCreateFlags {
        match self {
            ImageKind::Cube | ImageKind::CubeArray { .. } => vk::ImageCreateFlags::CUBE_COMPATIBLE,
            _ => vk::ImageCreateFlags::empty(),
        }
    }
}

/// Everything needed to create an image
#[derive(Debug, Clone, Copy)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub kind: ImageKind,
    /// Chain `VkExportMetalObjectCreateInfoEXT` so the MTLTexture can be exported
    pub export_metal: bool,
}

impl ImageDesc {
    pub fn new(width: u32, height: u32, format: TextureFormat, kind: ImageKind) -> Self {
        Self {
            width,
            height,
            format,
            kind,
            export_metal: false,
        }
    }

    pub fn validate(&self) -> Result<u32> {
        let layers = self.kind.layer_count()?;
        if self.width == 0 || self.height == 0 || layers == 0 {
            return Err(Error::InvalidResource(format!(
                "invalid texture extent {}x{} with {} layers",
                self.width, self.height, layers
            )));
        }
        if matches!(self.kind, ImageKind::Cube | ImageKind::CubeArray { .. }) && self.width != self.height {
            return Err(Error::InvalidResource(format!(
                "cube faces must be square, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(layers)
    }
}

/// Aspect used for sampling views and buffer copies (depth only for depth formats)
pub fn sample_aspect(format: TextureFormat) -> vk::ImageAspectFlags {
    if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

/// Tightly packed copy of one layer
pub fn layer_copy_region(width: u32, height: u32, format: TextureFormat, layer: u32) -> vk::BufferImageCopy {
    vk::BufferImageCopy {
        buffer_offset: 0,
        buffer_row_length: 0,
        buffer_image_height: 0,
        image_subresource: vk::ImageSubresourceLayers {
            aspect_mask: sample_aspect(format),
            mip_level: 0,
            base_array_layer: layer,
            layer_count: 1,
        },
        image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
        image_extent: vk::Extent3D {
            width,
            height,
            depth: 1,
        },
    }
}

pub struct VulkanImage {
    ctx: Arc<GpuContext>,
    image: vk::Image,
    allocation: Option<Allocation>,
    view: vk::ImageView,
    layer_views: Vec<vk::ImageView>,
    desc: ImageDesc,
    layers: u32,
    tracker: Arc<LayoutTracker>,
}

impl VulkanImage {
    pub fn new(ctx: Arc<GpuContext>, desc: ImageDesc) -> Result<Self> {
        let layers = desc.validate()?;
        let device = ctx.device();

        let mut export_info = vk::ExportMetalObjectCreateInfoEXT::default()
            .export_object_type(vk::ExportMetalObjectTypeFlagsEXT::METAL_TEXTURE);
        let mut create_info = vk::ImageCreateInfo::default()
            .flags(desc.kind.create_flags())
            .image_type(vk::ImageType::TYPE_2D)
            .format(to_vk_format(desc.format))
            .extent(vk::Extent3D {
                width: desc.width,
                height: desc.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(layers)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(image_usage(desc.format))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        if desc.export_metal {
            create_info = create_info.push_next(&mut export_info);
        }

        let image = unsafe { device.create_image(&create_info, None) }.native(SOURCE, "vkCreateImage")?;
        let requirements = unsafe { device.get_image_memory_requirements(image) };

        let allocation_scheme = if desc.export_metal {
            AllocationScheme::DedicatedImage(image)
        } else {
            AllocationScheme::GpuAllocatorManaged
        };
        let allocation = match ctx.allocate(&AllocationCreateDesc {
            name: "texture",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: false,
            allocation_scheme,
        }) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(e);
            }
        };

        // From here on Drop releases whatever has been created
        let mut this = Self {
            ctx: ctx.clone(),
            image,
            allocation: Some(allocation),
            view: vk::ImageView::null(),
            layer_views: Vec::with_capacity(layers as usize),
            desc,
            layers,
            tracker: LayoutTracker::new(layers),
        };

        if let Some(allocation) = &this.allocation {
            unsafe { device.bind_image_memory(image, allocation.memory(), allocation.offset()) }
                .native(SOURCE, "vkBindImageMemory")?;
        }

        this.view = this.create_view(desc.kind.view_type(), sample_aspect(desc.format), 0..layers)?;
        for layer in 0..layers {
            let view = this.create_view(vk::ImageViewType::TYPE_2D, aspect_mask(desc.format), layer..layer + 1)?;
            this.layer_views.push(view);
        }

        gfx_trace!(
            SOURCE,
            "Created {:?} image {}x{} ({:?}, {} layers)",
            desc.kind,
            desc.width,
            desc.height,
            desc.format,
            layers
        );
        Ok(this)
    }

    fn create_view(
        &self,
        view_type: vk::ImageViewType,
        aspect: vk::ImageAspectFlags,
        layers: Range<u32>,
    ) -> Result<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(self.image)
            .view_type(view_type)
            .format(to_vk_format(self.desc.format))
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: layers.start,
                layer_count: layers.end - layers.start,
            });
        unsafe { self.ctx.device().create_image_view(&create_info, None) }
            .native(SOURCE, "vkCreateImageView")
    }

    pub fn ctx(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// View over every layer, typed by the image kind
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    /// 2D view of one layer, for framebuffers
    pub fn layer_view(&self, layer: u32) -> Result<vk::ImageView> {
        self.layer_views.get(layer as usize).copied().ok_or_else(|| {
            Error::InvalidResource(format!("layer {} outside 0..{}", layer, self.layers))
        })
    }

    pub fn width(&self) -> u32 {
        self.desc.width
    }

    pub fn height(&self) -> u32 {
        self.desc.height
    }

    pub fn format(&self) -> TextureFormat {
        self.desc.format
    }

    pub fn kind(&self) -> ImageKind {
        self.desc.kind
    }

    pub fn layer_count(&self) -> u32 {
        self.layers
    }

    pub fn tracker(&self) -> &Arc<LayoutTracker> {
        &self.tracker
    }

    /// Current native layout of one layer
    pub fn vk_layout(&self, layer: u32) -> Result<vk::ImageLayout> {
        self.tracker.layout(layer).map(to_vk_layout)
    }

    pub fn check_layer(&self, layer: u32) -> Result<()> {
        if layer >= self.layers {
            return Err(Error::InvalidResource(format!(
                "layer {} outside 0..{}",
                layer, self.layers
            )));
        }
        Ok(())
    }

    fn layer_size(&self) -> usize {
        self.desc.format.image_size(self.desc.width, self.desc.height)
    }

    /// Move `layers` to `target`, one barrier per run of equal source layouts
    pub fn transition(&self, layers: Range<u32>, target: TextureLayout) -> Result<()> {
        if target == TextureLayout::Undefined {
            return Err(Error::InvalidOperation(
                "cannot transition an image to the Undefined layout".to_string(),
            ));
        }
        let runs = self.tracker.transitions(layers.clone(), target)?;
        if runs.is_empty() {
            return Ok(());
        }

        let (image, aspect) = (self.image, aspect_mask(self.desc.format));
        self.ctx.command_pool().submit_immediate(|device, cmd| {
            for run in &runs {
                record_layout_transition(device, cmd, image, aspect, run.layers.clone(), run.from, target);
            }
        })?;
        for run in &runs {
            gfx_trace!(SOURCE, "layers {:?}: {:?} -> {:?}", run.layers, run.from, target);
        }
        self.tracker.commit(layers, target)
    }

    /// Replace one layer with tightly packed pixels; the layer ends ShaderReadOnly
    pub fn upload_layer(&self, layer: u32, pixels: &[u8]) -> Result<()> {
        self.check_layer(layer)?;
        if pixels.len() != self.layer_size() {
            return Err(Error::InvalidResource(format!(
                "expected {} bytes for a {}x{} {:?} layer, got {}",
                self.layer_size(),
                self.desc.width,
                self.desc.height,
                self.desc.format,
                pixels.len()
            )));
        }

        let staging = StagingBuffer::for_upload(&self.ctx, pixels)?;
        let from = self.tracker.layout(layer)?;
        let (image, aspect, buffer) = (self.image, aspect_mask(self.desc.format), staging.handle());
        let region = layer_copy_region(self.desc.width, self.desc.height, self.desc.format, layer);
        let layers = layer..layer + 1;

        self.ctx.command_pool().submit_immediate(|device, cmd| {
            if from != TextureLayout::TransferDst {
                record_layout_transition(device, cmd, image, aspect, layers.clone(), from, TextureLayout::TransferDst);
            }
            unsafe {
                device.cmd_copy_buffer_to_image(
                    cmd,
                    buffer,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );
            }
            record_layout_transition(
                device,
                cmd,
                image,
                aspect,
                layers.clone(),
                TextureLayout::TransferDst,
                TextureLayout::ShaderReadOnly,
            );
        })?;

        self.tracker.commit(layers, TextureLayout::ShaderReadOnly)
    }

    /// Read one layer back as tightly packed pixels; the layer ends ShaderReadOnly
    pub fn download_layer(&self, layer: u32) -> Result<Vec<u8>> {
        self.check_layer(layer)?;

        let staging = StagingBuffer::for_download(&self.ctx, self.layer_size() as u64)?;
        let from = self.tracker.layout(layer)?;
        let (image, aspect, buffer) = (self.image, aspect_mask(self.desc.format), staging.handle());
        let region = layer_copy_region(self.desc.width, self.desc.height, self.desc.format, layer);
        let layers = layer..layer + 1;

        self.ctx.command_pool().submit_immediate(|device, cmd| {
            if from != TextureLayout::TransferSrc {
                record_layout_transition(device, cmd, image, aspect, layers.clone(), from, TextureLayout::TransferSrc);
            }
            unsafe {
                device.cmd_copy_image_to_buffer(
                    cmd,
                    image,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    buffer,
                    &[region],
                );
            }
            record_layout_transition(
                device,
                cmd,
                image,
                aspect,
                layers.clone(),
                TextureLayout::TransferSrc,
                TextureLayout::ShaderReadOnly,
            );
        })?;

        self.tracker.commit(layers, TextureLayout::ShaderReadOnly)?;
        staging.read_all()
    }
}

impl Drop for VulkanImage {
    fn drop(&mut self) {
        let device = self.ctx.device();
        unsafe {
            for view in self.layer_views.drain(..) {
                device.destroy_image_view(view, None);
            }
            device.destroy_image_view(self.view, None);
            device.destroy_image(self.image, None);
        }
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_image_tests.rs"]
mod tests;
