//! MoltenVK discovery for macOS
//!
//! Finds `libMoltenVK.dylib`, reuses or writes its ICD manifest and computes
//! the `DYLD_*` search path updates. The file logic is plain path handling,
//! so it builds and is tested on every platform; only `VulkanSetup` decides
//! to run it on macOS.

use crate::vulkan_setup::{executable_dir, merge_search_path, EnvUpdate, PathMergeMode};
use gfx_context::gfx::{ContextConfig, Error, Result};
use gfx_context::{gfx_debug, gfx_error, gfx_info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SOURCE: &str = "gfx::vulkan::setup";

pub const MOLTENVK_LIBRARY: &str = "libMoltenVK.dylib";
pub const MOLTENVK_ICD_NAME: &str = "MoltenVK_icd.json";

/// Dynamic loader variables that receive the MoltenVK directory
pub const DYLD_VARS: [&str; 2] = ["DYLD_LIBRARY_PATH", "DYLD_FALLBACK_LIBRARY_PATH"];

// ============================================================================
// ICD manifest
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IcdEntry {
    pub library_path: String,
    pub api_version: String,
    pub is_portability_driver: bool,
}

/// Loader manifest describing one installable client driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IcdManifest {
    pub file_format_version: String,
    #[serde(rename = "ICD")]
    pub icd: IcdEntry,
}

impl IcdManifest {
    pub fn for_library(library: &Path) -> Self {
        Self {
            file_format_version: "1.0.0".to_string(),
            icd: IcdEntry {
                library_path: library.to_string_lossy().into_owned(),
                api_version: "1.2.0".to_string(),
                is_portability_driver: true,
            },
        }
    }
}

/// Write `MoltenVK_icd.json` for `library` into `dir`
pub fn write_icd_manifest(dir: &Path, library: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| {
        gfx_error!(SOURCE, "Cannot create {}: {}", dir.display(), e);
        Error::BackendError(format!("Cannot create {}: {}", dir.display(), e))
    })?;

    let json = serde_json::to_string_pretty(&IcdManifest::for_library(library))
        .map_err(|e| Error::BackendError(format!("ICD manifest serialization failed: {}", e)))?;

    let path = dir.join(MOLTENVK_ICD_NAME);
    std::fs::write(&path, json).map_err(|e| {
        gfx_error!(SOURCE, "Cannot write {}: {}", path.display(), e);
        Error::BackendError(format!("Cannot write {}: {}", path.display(), e))
    })?;
    Ok(path)
}

/// Manifest installed alongside `library`, if any
///
/// Looks next to the library first, then in the `share/vulkan/icd.d`
/// directory of the same prefix.
pub fn find_existing_manifest(library: &Path) -> Option<PathBuf> {
    let lib_dir = library.parent()?;
    let mut candidates = vec![lib_dir.join(MOLTENVK_ICD_NAME)];
    if let Some(prefix) = lib_dir.parent() {
        candidates.push(
            prefix
                .join("share")
                .join("vulkan")
                .join("icd.d")
                .join(MOLTENVK_ICD_NAME),
        );
    }
    candidates.into_iter().find(|path| path.is_file())
}

/// Directories searched for the library, in priority order, without duplicates
pub fn candidate_dirs(
    search_dirs: &[PathBuf],
    exe_dir: Option<&Path>,
    vulkan_sdk: Option<&Path>,
) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = search_dirs.to_vec();
    if let Some(exe) = exe_dir {
        dirs.push(exe.to_path_buf());
        dirs.push(exe.join("..").join("Frameworks"));
    }
    if let Some(sdk) = vulkan_sdk {
        dirs.push(sdk.join("lib"));
    }
    dirs.push(PathBuf::from("/usr/local/lib"));
    dirs.push(PathBuf::from("/opt/homebrew/lib"));

    let mut unique = Vec::with_capacity(dirs.len());
    for dir in dirs {
        if !unique.contains(&dir) {
            unique.push(dir);
        }
    }
    unique
}

// ============================================================================
// Location
// ============================================================================

/// Result of a successful MoltenVK lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoltenVkLocation {
    pub library: PathBuf,
    pub manifest: PathBuf,
    /// The manifest was written by us rather than found
    pub generated: bool,
}

impl MoltenVkLocation {
    /// Prepend the library directory to every `DYLD_VARS` entry
    ///
    /// `lookup` returns the current value of a variable.
    pub fn env_updates(&self, lookup: impl Fn(&str) -> Option<String>) -> Vec<EnvUpdate> {
        let Some(lib_dir) = self.library.parent() else {
            return Vec::new();
        };
        let additions = [lib_dir.to_path_buf()];
        DYLD_VARS
            .iter()
            .map(|name| EnvUpdate {
                name: name.to_string(),
                value: merge_search_path(lookup(name).as_deref(), &additions, PathMergeMode::Prepend),
            })
            .collect()
    }
}

pub struct MacOSVulkanSetup {
    candidate_dirs: Vec<PathBuf>,
    writable_dir: PathBuf,
}

impl MacOSVulkanSetup {
    pub fn from_config(config: &ContextConfig) -> Self {
        let sdk = std::env::var_os("VULKAN_SDK").map(PathBuf::from);
        let exe = executable_dir();
        Self::new(
            candidate_dirs(&config.driver_search_dirs, exe.as_deref(), sdk.as_deref()),
            config.resolved_writable_dir(),
        )
    }

    pub fn new(candidate_dirs: Vec<PathBuf>, writable_dir: PathBuf) -> Self {
        Self {
            candidate_dirs,
            writable_dir,
        }
    }

    pub fn candidate_dirs(&self) -> &[PathBuf] {
        &self.candidate_dirs
    }

    /// First `libMoltenVK.dylib` in the candidate directories
    pub fn find_library(&self) -> Option<PathBuf> {
        self.candidate_dirs
            .iter()
            .map(|dir| dir.join(MOLTENVK_LIBRARY))
            .find(|path| path.is_file())
    }

    /// Find the library and a manifest for it
    ///
    /// `Ok(None)` when the library is not installed. A manifest is written
    /// into the writable directory only when none ships with the library.
    pub fn locate(&self) -> Result<Option<MoltenVkLocation>> {
        let Some(library) = self.find_library() else {
            gfx_debug!(SOURCE, "{} not found in {} directories", MOLTENVK_LIBRARY, self.candidate_dirs.len());
            return Ok(None);
        };
        let library = library.canonicalize().unwrap_or(library);
        gfx_info!(SOURCE, "Found MoltenVK at {}", library.display());

        if let Some(manifest) = find_existing_manifest(&library) {
            gfx_debug!(SOURCE, "Using existing manifest {}", manifest.display());
            return Ok(Some(MoltenVkLocation {
                library,
                manifest,
                generated: false,
            }));
        }

        let manifest = write_icd_manifest(&self.writable_dir, &library)?;
        gfx_info!(SOURCE, "Generated {}", manifest.display());
        Ok(Some(MoltenVkLocation {
            library,
            manifest,
            generated: true,
        }))
    }
}

#[cfg(test)]
#[path = "vulkan_macos_setup_tests.rs"]
mod tests;
