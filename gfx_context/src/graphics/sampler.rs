/// Sampler trait and descriptor

use std::any::Any;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerFilter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerAddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

/// Sampler creation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub min_filter: SamplerFilter,
    pub mag_filter: SamplerFilter,
    pub address_u: SamplerAddressMode,
    pub address_v: SamplerAddressMode,
    pub address_w: SamplerAddressMode,
}

impl SamplerDesc {
    pub fn new(
        min_filter: SamplerFilter,
        mag_filter: SamplerFilter,
        address_u: SamplerAddressMode,
        address_v: SamplerAddressMode,
    ) -> Self {
        Self {
            min_filter,
            mag_filter,
            address_u,
            address_v,
            address_w: address_v,
        }
    }

    /// Bilinear, clamped (render target sampling)
    pub fn linear_clamp() -> Self {
        Self::new(
            SamplerFilter::Linear,
            SamplerFilter::Linear,
            SamplerAddressMode::ClampToEdge,
            SamplerAddressMode::ClampToEdge,
        )
    }

    /// Point sampling, tiled
    pub fn nearest_repeat() -> Self {
        Self::new(
            SamplerFilter::Nearest,
            SamplerFilter::Nearest,
            SamplerAddressMode::Repeat,
            SamplerAddressMode::Repeat,
        )
    }
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self::linear_clamp()
    }
}

/// Immutable sampler object
pub trait Sampler: Send + Sync {
    fn desc(&self) -> &SamplerDesc;
    fn as_any(&self) -> &dyn Any;
}
