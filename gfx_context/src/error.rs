//! Error types for the graphics context layer
//!
//! Three classes of failure surface here: unsupported platform/API requests,
//! caller contract violations (layouts, pairing, thread affinity, validation),
//! and native API failures carrying the driver's result code. Missing optional
//! capabilities are logged by the backends and never reach this type.

use std::fmt;

/// Result type for graphics context operations
pub type Result<T> = std::result::Result<T, Error>;

/// Graphics context errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (Vulkan, Metal, Skia)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (foreign texture, bad index, unknown binding, ...)
    InvalidResource(String),

    /// Initialization failed (instance, device, context, Skia bridge)
    InitializationFailed(String),

    /// The requested API or context kind does not exist on this platform
    UnsupportedPlatform(String),

    /// A native call returned a failure code
    NativeCallFailed {
        /// Name of the failing entry point
        call: String,
        /// Raw native result code (`VkResult`)
        code: i32,
    },

    /// A native API returned a null handle (Metal `nil`)
    NullHandle(String),

    /// The operation is not valid in the current state
    InvalidOperation(String),

    /// Called from a thread other than the owning render thread
    WrongThread(String),

    /// The object was already disposed
    ObjectDisposed(String),

    /// A precondition on the arguments was violated
    ValidationFailed(String),

    /// Shader source could not be compiled to SPIR-V
    ShaderCompilation(String),
}

impl Error {
    /// Native result code, for errors coming from a failing native call
    pub fn native_code(&self) -> Option<i32> {
        match self {
            Error::NativeCallFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::UnsupportedPlatform(msg) => write!(f, "Unsupported platform: {}", msg),
            Error::NativeCallFailed { call, code } => {
                write!(f, "Native call {} failed with result code {}", call, code)
            }
            Error::NullHandle(msg) => write!(f, "Null native handle: {}", msg),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Error::WrongThread(msg) => write!(f, "Wrong thread: {}", msg),
            Error::ObjectDisposed(msg) => write!(f, "Object disposed: {}", msg),
            Error::ValidationFailed(msg) => write!(f, "Validation failed: {}", msg),
            Error::ShaderCompilation(msg) => write!(f, "Shader compilation failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
