/*!
# gfx_context

Backend-agnostic GPU context layer shared by a 2D (Skia) renderer and a 3D
pipeline.

This crate defines the traits every backend implements and the pieces that
do not need a GPU: the context factory with its thread affinity rules,
layout tracking, descriptor validation, GPU diagnostics, shader compilation
and a CPU mock context. The Vulkan and Metal backends live in
`gfx_context_vulkan`.

## Architecture

- **GraphicsContext**: root trait; creates every GPU resource
- **GraphicsContextFactory**: lazily creates the shared context, GPU selection
- **SharedTexture / TextureArray / TextureCube / TextureCubeArray**: textures with tracked layouts
- **Buffer**: vertex, index, uniform and storage buffers
- **RenderPass3D / Framebuffer3D / Pipeline3D / DescriptorSet**: 3D recording
- **GpuInfo**: per-context diagnostics, serializable to JSON
*/

mod error;
pub mod config;
pub mod factory;
pub mod graphics;
pub mod log;
pub mod mock;
pub mod thread_bound;

// Main gfx namespace module
pub mod gfx {
    // Error types
    pub use crate::error::{Error, Result};

    pub use crate::config::{ContextConfig, ContextKind, ValidationSeverity};
    pub use crate::factory::{ContextBackend, FactoryState, GraphicsContextFactory};
    pub use crate::thread_bound::ThreadBound;

    // Resource traits and descriptors
    pub use crate::graphics::*;

    // Logging sub-module (types only; the gfx_* macros live at the crate root)
    pub mod log {
        pub use crate::log::{reset_logger, set_logger, DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    // CPU implementation for tests and headless tools
    pub mod mock {
        pub use crate::mock::*;
    }
}

// Re-export math and 2D libraries at crate root
pub use glam;
pub use skia_safe;
