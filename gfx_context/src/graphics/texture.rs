/// Texture traits, cube faces and attachment/sampling views
///
/// Textures are owned by the caller and destroyed on drop. Layout state lives
/// in a shared `LayoutTracker`, so every method takes `&self`.

use crate::error::{Error, Result};
use crate::graphics::format::TextureFormat;
use crate::graphics::layout::{LayoutTracker, TextureLayout};
use std::any::Any;
use std::sync::Arc;

/// Face of a cube map, in the order of its array layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// Layer index of this face inside one cube
    pub fn index(&self) -> u32 {
        *self as u32
    }

    pub fn from_index(index: u32) -> Option<CubeFace> {
        Self::ALL.get(index as usize).copied()
    }
}

/// Array layer of `face` of cube `cube_index` inside a cube array
pub fn cube_array_layer(cube_index: u32, face: CubeFace) -> u32 {
    cube_index * 6 + face.index()
}

// ===== TEXTURE TRAITS =====

/// 2D texture with tracked layout
pub trait Texture2D: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn format(&self) -> TextureFormat;

    /// Shared layout state (one layer)
    fn layout_tracker(&self) -> &Arc<LayoutTracker>;

    /// Current layout
    fn layout(&self) -> TextureLayout {
        self.layout_tracker()
            .layout(0)
            .unwrap_or(TextureLayout::Undefined)
    }

    /// Replace the whole image with tightly packed pixels; ends in ShaderReadOnly
    fn upload(&self, pixels: &[u8]) -> Result<()>;

    /// Read the whole image back as tightly packed pixels; ends in ShaderReadOnly
    fn download_pixels(&self) -> Result<Vec<u8>>;

    /// Move to the layout given; no-op when already there
    fn transition_to(&self, layout: TextureLayout) -> Result<()>;

    /// Move to the attachment layout matching the format
    fn prepare_for_render(&self) -> Result<()> {
        self.transition_to(TextureLayout::attachment_for(self.format()))
    }

    /// Move to ShaderReadOnly
    fn prepare_for_sampling(&self) -> Result<()> {
        self.transition_to(TextureLayout::ShaderReadOnly)
    }

    /// Skia surface drawing into this texture
    fn create_skia_surface(&self) -> Result<skia_safe::Surface>;

    fn as_any(&self) -> &dyn Any;
}

/// Texture usable by both the 2D (Skia) layer and the 3D pipeline
///
/// On the composite context the Vulkan image and the Metal texture are the
/// same allocation. No synchronization is inserted between the two APIs:
/// call `wait_idle` on the context that wrote last before the other API
/// reads or writes the texture.
pub trait SharedTexture: Texture2D {
    fn as_texture_2d(&self) -> &dyn Texture2D;

    /// True when the texture is reachable through two native APIs
    fn is_cross_api(&self) -> bool {
        false
    }
}

/// Array of 2D layers (shadow cascades, G-buffer slices)
pub trait TextureArray: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn array_size(&self) -> u32;
    fn format(&self) -> TextureFormat;
    fn layout_tracker(&self) -> &Arc<LayoutTracker>;

    fn layer_layout(&self, layer: u32) -> Result<TextureLayout> {
        self.layout_tracker().layout(layer)
    }

    fn upload_layer(&self, layer: u32, pixels: &[u8]) -> Result<()>;

    /// Move one layer to the attachment layout matching the format
    fn transition_layer_to_attachment(&self, layer: u32) -> Result<()>;
    fn transition_layer_to_sampled(&self, layer: u32) -> Result<()>;
    fn transition_all_to_sampled(&self) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

/// Cube map (six square faces)
pub trait TextureCube: Send + Sync {
    fn size(&self) -> u32;
    fn format(&self) -> TextureFormat;
    fn layout_tracker(&self) -> &Arc<LayoutTracker>;

    fn face_layout(&self, face: CubeFace) -> Result<TextureLayout> {
        self.layout_tracker().layout(face.index())
    }

    fn upload_face(&self, face: CubeFace, pixels: &[u8]) -> Result<()>;
    fn transition_face_to_attachment(&self, face: CubeFace) -> Result<()>;
    fn transition_to_attachment(&self) -> Result<()>;
    fn transition_to_sampled(&self) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

/// Array of cube maps (point-light shadow atlases)
pub trait TextureCubeArray: Send + Sync {
    fn size(&self) -> u32;
    /// Number of cubes
    fn array_size(&self) -> u32;
    fn format(&self) -> TextureFormat;
    fn layout_tracker(&self) -> &Arc<LayoutTracker>;

    fn face_layout(&self, cube_index: u32, face: CubeFace) -> Result<TextureLayout> {
        self.layout_tracker().layout(cube_array_layer(cube_index, face))
    }

    fn transition_cube_to_attachment(&self, cube_index: u32) -> Result<()>;
    fn transition_face_to_attachment(&self, cube_index: u32, face: CubeFace) -> Result<()>;
    fn transition_to_sampled(&self) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

// ===== VIEWS =====

/// One render-target slice of a texture, as attached to a framebuffer
#[derive(Clone, Copy)]
pub enum AttachmentView<'a> {
    Texture(&'a dyn Texture2D),
    Layer {
        array: &'a dyn TextureArray,
        layer: u32,
    },
    Face {
        cube: &'a dyn TextureCube,
        face: CubeFace,
    },
    CubeArrayFace {
        cube_array: &'a dyn TextureCubeArray,
        cube_index: u32,
        face: CubeFace,
    },
}

impl<'a> AttachmentView<'a> {
    pub fn texture(texture: &'a dyn Texture2D) -> Self {
        AttachmentView::Texture(texture)
    }

    pub fn layer(array: &'a dyn TextureArray, layer: u32) -> Result<Self> {
        if layer >= array.array_size() {
            return Err(Error::InvalidResource(format!(
                "layer {} outside texture array of {} layers",
                layer,
                array.array_size()
            )));
        }
        Ok(AttachmentView::Layer { array, layer })
    }

    pub fn face(cube: &'a dyn TextureCube, face: CubeFace) -> Self {
        AttachmentView::Face { cube, face }
    }

    pub fn cube_array_face(
        cube_array: &'a dyn TextureCubeArray,
        cube_index: u32,
        face: CubeFace,
    ) -> Result<Self> {
        if cube_index >= cube_array.array_size() {
            return Err(Error::InvalidResource(format!(
                "cube {} outside cube array of {} cubes",
                cube_index,
                cube_array.array_size()
            )));
        }
        Ok(AttachmentView::CubeArrayFace {
            cube_array,
            cube_index,
            face,
        })
    }

    pub fn width(&self) -> u32 {
        match self {
            AttachmentView::Texture(t) => t.width(),
            AttachmentView::Layer { array, .. } => array.width(),
            AttachmentView::Face { cube, .. } => cube.size(),
            AttachmentView::CubeArrayFace { cube_array, .. } => cube_array.size(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            AttachmentView::Texture(t) => t.height(),
            AttachmentView::Layer { array, .. } => array.height(),
            AttachmentView::Face { cube, .. } => cube.size(),
            AttachmentView::CubeArrayFace { cube_array, .. } => cube_array.size(),
        }
    }

    pub fn format(&self) -> TextureFormat {
        match self {
            AttachmentView::Texture(t) => t.format(),
            AttachmentView::Layer { array, .. } => array.format(),
            AttachmentView::Face { cube, .. } => cube.format(),
            AttachmentView::CubeArrayFace { cube_array, .. } => cube_array.format(),
        }
    }

    /// Absolute array layer inside the underlying image
    pub fn layer_index(&self) -> u32 {
        match self {
            AttachmentView::Texture(_) => 0,
            AttachmentView::Layer { layer, .. } => *layer,
            AttachmentView::Face { face, .. } => face.index(),
            AttachmentView::CubeArrayFace {
                cube_index, face, ..
            } => cube_array_layer(*cube_index, *face),
        }
    }

    pub fn layout_tracker(&self) -> &'a Arc<LayoutTracker> {
        match *self {
            AttachmentView::Texture(t) => t.layout_tracker(),
            AttachmentView::Layer { array, .. } => array.layout_tracker(),
            AttachmentView::Face { cube, .. } => cube.layout_tracker(),
            AttachmentView::CubeArrayFace { cube_array, .. } => cube_array.layout_tracker(),
        }
    }

    /// Layout the slice must be in while the render pass runs
    pub fn required_layout(&self) -> TextureLayout {
        TextureLayout::attachment_for(self.format())
    }

    /// The underlying texture object, for backend downcasts
    pub fn as_any(&self) -> &'a dyn Any {
        match *self {
            AttachmentView::Texture(t) => t.as_any(),
            AttachmentView::Layer { array, .. } => array.as_any(),
            AttachmentView::Face { cube, .. } => cube.as_any(),
            AttachmentView::CubeArrayFace { cube_array, .. } => cube_array.as_any(),
        }
    }
}

/// A whole texture bound for sampling
#[derive(Clone, Copy)]
pub enum SampledTexture<'a> {
    Texture2D(&'a dyn Texture2D),
    Array(&'a dyn TextureArray),
    Cube(&'a dyn TextureCube),
    CubeArray(&'a dyn TextureCubeArray),
}

impl<'a> SampledTexture<'a> {
    pub fn format(&self) -> TextureFormat {
        match self {
            SampledTexture::Texture2D(t) => t.format(),
            SampledTexture::Array(t) => t.format(),
            SampledTexture::Cube(t) => t.format(),
            SampledTexture::CubeArray(t) => t.format(),
        }
    }

    pub fn layout_tracker(&self) -> &'a Arc<LayoutTracker> {
        match *self {
            SampledTexture::Texture2D(t) => t.layout_tracker(),
            SampledTexture::Array(t) => t.layout_tracker(),
            SampledTexture::Cube(t) => t.layout_tracker(),
            SampledTexture::CubeArray(t) => t.layout_tracker(),
        }
    }

    pub fn as_any(&self) -> &'a dyn Any {
        match *self {
            SampledTexture::Texture2D(t) => t.as_any(),
            SampledTexture::Array(t) => t.as_any(),
            SampledTexture::Cube(t) => t.as_any(),
            SampledTexture::CubeArray(t) => t.as_any(),
        }
    }
}
