/// Texture formats and their classification

use skia_safe::ColorType;

/// Pixel format of textures, render targets and depth buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Bgra8Unorm,
    Rgba16Float,
    Rgba32Float,
    R8Unorm,
    R16Float,
    R32Float,
    Depth32Float,
    Depth24UnormStencil8,
}

impl TextureFormat {
    /// Every format, in declaration order
    pub const ALL: [TextureFormat; 9] = [
        TextureFormat::Rgba8Unorm,
        TextureFormat::Bgra8Unorm,
        TextureFormat::Rgba16Float,
        TextureFormat::Rgba32Float,
        TextureFormat::R8Unorm,
        TextureFormat::R16Float,
        TextureFormat::R32Float,
        TextureFormat::Depth32Float,
        TextureFormat::Depth24UnormStencil8,
    ];

    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth32Float | TextureFormat::Depth24UnormStencil8
        )
    }

    pub fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::Depth24UnormStencil8)
    }

    /// Size of one texel in bytes (the layout used by upload/download)
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm | TextureFormat::Bgra8Unorm => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
            TextureFormat::R8Unorm => 1,
            TextureFormat::R16Float => 2,
            TextureFormat::R32Float => 4,
            TextureFormat::Depth32Float => 4,
            TextureFormat::Depth24UnormStencil8 => 4,
        }
    }

    /// Number of channels (depth counts as one, depth+stencil as two)
    pub fn channel_count(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm
            | TextureFormat::Bgra8Unorm
            | TextureFormat::Rgba16Float
            | TextureFormat::Rgba32Float => 4,
            TextureFormat::R8Unorm
            | TextureFormat::R16Float
            | TextureFormat::R32Float
            | TextureFormat::Depth32Float => 1,
            TextureFormat::Depth24UnormStencil8 => 2,
        }
    }

    /// Byte size of a tightly packed `width` x `height` image
    pub fn image_size(&self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel() as usize
    }

    /// Skia color type for formats Skia can render into
    ///
    /// Depth formats and single-channel float formats have no Skia equivalent.
    pub fn to_skia_color_type(&self) -> Option<ColorType> {
        match self {
            TextureFormat::Rgba8Unorm => Some(ColorType::RGBA8888),
            TextureFormat::Bgra8Unorm => Some(ColorType::BGRA8888),
            TextureFormat::Rgba16Float => Some(ColorType::RGBAF16),
            TextureFormat::Rgba32Float => Some(ColorType::RGBAF32),
            TextureFormat::R8Unorm => Some(ColorType::R8UNorm),
            TextureFormat::R16Float
            | TextureFormat::R32Float
            | TextureFormat::Depth32Float
            | TextureFormat::Depth24UnormStencil8 => None,
        }
    }
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
