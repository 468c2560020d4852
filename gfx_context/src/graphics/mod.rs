/// Graphics module - backend-agnostic GPU resource types and traits

pub mod buffer;
pub mod context;
pub mod descriptor_set;
pub mod format;
pub mod gpu_info;
pub mod layout;
pub mod pipeline;
pub mod render_pass;
pub mod sampler;
pub mod shader_compiler;
pub mod texture;

pub use buffer::*;
pub use context::*;
pub use descriptor_set::*;
pub use format::*;
pub use gpu_info::*;
pub use layout::*;
pub use pipeline::*;
pub use render_pass::*;
pub use sampler::*;
pub use shader_compiler::*;
pub use texture::*;
