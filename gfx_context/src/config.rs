//! Context creation configuration

use std::path::PathBuf;

/// Which concrete context the native backend builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextKind {
    /// Composite (Metal + Vulkan) on macOS, plain Vulkan elsewhere
    #[default]
    Auto,
    /// Vulkan only, with the Vulkan Skia bridge (unavailable on macOS)
    Vulkan,
    /// Metal + Vulkan composite with shared textures (macOS only)
    Composite,
}

/// Validation message severities the debug messenger subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationSeverity {
    ErrorsOnly,
    #[default]
    ErrorsAndWarnings,
    All,
}

/// Configuration shared by the factory and the native backend
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Application name reported to the driver
    pub app_name: String,

    /// Engine name reported to the driver
    pub engine_name: String,

    /// Request VK_LAYER_KHRONOS_validation and a debug messenger.
    /// Only honoured when the `vulkan-validation` feature of the backend is compiled in.
    pub enable_validation: bool,

    /// Severities forwarded by the debug messenger
    pub validation_severity: ValidationSeverity,

    /// Count validation messages per severity
    pub enable_validation_stats: bool,

    /// Which context to build
    pub context_kind: ContextKind,

    /// Extra directories scanned for ICD manifests and libMoltenVK.dylib
    pub driver_search_dirs: Vec<PathBuf>,

    /// Where a generated MoltenVK_icd.json is written (None: temp_dir()/gfx_context)
    pub writable_dir: Option<PathBuf>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            app_name: "Gfx Application".to_string(),
            engine_name: "gfx_context".to_string(),
            enable_validation: cfg!(debug_assertions),
            validation_severity: ValidationSeverity::ErrorsAndWarnings,
            enable_validation_stats: false,
            context_kind: ContextKind::Auto,
            driver_search_dirs: Vec::new(),
            writable_dir: None,
        }
    }
}

impl ContextConfig {
    /// Directory used for generated driver manifests
    pub fn resolved_writable_dir(&self) -> PathBuf {
        self.writable_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("gfx_context"))
    }
}
