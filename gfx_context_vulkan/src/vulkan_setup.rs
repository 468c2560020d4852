//! Loader environment preparation
//!
//! The Vulkan loader reads its driver variables when the instance is
//! created, so `VulkanSetup::apply` has to run before `ash::Entry::load`.
//! Updates are computed as plain `EnvUpdate` values first; only `apply`
//! touches the process environment.

use crate::vulkan_macos_setup::MacOSVulkanSetup;
use gfx_context::gfx::ContextConfig;
use gfx_context::{gfx_debug, gfx_info, gfx_warn};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};

const SOURCE: &str = "gfx::vulkan::setup";

/// ICD manifests shipped next to the application
pub const ICD_MANIFEST_NAMES: [&str; 2] = ["vk_swiftshader_icd.json", "MoltenVK_icd.json"];

#[cfg(windows)]
pub const PATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
pub const PATH_SEPARATOR: char = ':';

/// Loader variable listing extra driver manifests
#[cfg(target_os = "macos")]
pub const DRIVER_FILES_VAR: &str = "VK_DRIVER_FILES";
#[cfg(not(target_os = "macos"))]
pub const DRIVER_FILES_VAR: &str = "VK_ADD_DRIVER_FILES";

/// Where new entries go relative to the existing value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMergeMode {
    Prepend,
    Append,
}

/// Merge mode of `DRIVER_FILES_VAR` on this platform
pub fn driver_files_merge_mode() -> PathMergeMode {
    if cfg!(target_os = "macos") {
        PathMergeMode::Prepend
    } else {
        PathMergeMode::Append
    }
}

/// One environment variable assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvUpdate {
    pub name: String,
    pub value: String,
}

/// Merge `additions` into a search-path variable
///
/// Empty entries are dropped and the first occurrence of a path wins.
pub fn merge_search_path(
    existing: Option<&str>,
    additions: &[PathBuf],
    mode: PathMergeMode,
) -> String {
    let current: Vec<PathBuf> = existing
        .map(|value| {
            value
                .split(PATH_SEPARATOR)
                .filter(|entry| !entry.is_empty())
                .map(PathBuf::from)
                .collect()
        })
        .unwrap_or_default();

    let ordered: Vec<&PathBuf> = match mode {
        PathMergeMode::Prepend => additions.iter().chain(current.iter()).collect(),
        PathMergeMode::Append => current.iter().chain(additions.iter()).collect(),
    };

    let mut seen: FxHashSet<&Path> = FxHashSet::default();
    ordered
        .into_iter()
        .filter(|path| seen.insert(path.as_path()))
        .map(|path| path.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(&PATH_SEPARATOR.to_string())
}

/// Update of `DRIVER_FILES_VAR` listing `manifests`, if there are any
pub fn driver_files_update(manifests: &[PathBuf], existing: Option<&str>) -> Option<EnvUpdate> {
    if manifests.is_empty() {
        return None;
    }
    Some(EnvUpdate {
        name: DRIVER_FILES_VAR.to_string(),
        value: merge_search_path(existing, manifests, driver_files_merge_mode()),
    })
}

/// Known ICD manifests present in `dirs`, in search order
pub fn find_icd_manifests(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for dir in dirs {
        for name in ICD_MANIFEST_NAMES {
            let path = dir.join(name);
            if path.is_file() && !found.contains(&path) {
                found.push(path);
            }
        }
    }
    found
}

pub(crate) fn executable_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

/// Driver discovery run once before the instance is created
pub struct VulkanSetup {
    search_dirs: Vec<PathBuf>,
    manifests: Vec<PathBuf>,
    macos: Option<MacOSVulkanSetup>,
}

impl VulkanSetup {
    /// Scan the configured directories and the executable's directory
    pub fn from_config(config: &ContextConfig) -> Self {
        let mut search_dirs = config.driver_search_dirs.clone();
        if let Some(dir) = executable_dir() {
            if !search_dirs.contains(&dir) {
                search_dirs.push(dir);
            }
        }
        let manifests = find_icd_manifests(&search_dirs);
        let macos = cfg!(target_os = "macos").then(|| MacOSVulkanSetup::from_config(config));
        Self {
            search_dirs,
            manifests,
            macos,
        }
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// ICD manifests found in the search directories
    pub fn icd_manifests(&self) -> &[PathBuf] {
        &self.manifests
    }

    /// Variable updates for the current environment
    ///
    /// On macOS this locates MoltenVK and may write its manifest into the
    /// configured writable directory.
    pub fn env_updates(&self) -> Vec<EnvUpdate> {
        let mut manifests = self.manifests.clone();
        let mut updates = Vec::new();

        if let Some(macos) = &self.macos {
            match macos.locate() {
                Ok(Some(location)) => {
                    if !manifests.contains(&location.manifest) {
                        manifests.insert(0, location.manifest.clone());
                    }
                    updates.extend(location.env_updates(|name| std::env::var(name).ok()));
                }
                Ok(None) => gfx_warn!(
                    SOURCE,
                    "libMoltenVK.dylib not found; relying on the system Vulkan loader"
                ),
                Err(e) => gfx_warn!(SOURCE, "MoltenVK setup failed, continuing without it: {}", e),
            }
        }

        let existing = std::env::var(DRIVER_FILES_VAR).ok();
        updates.extend(driver_files_update(&manifests, existing.as_deref()));
        updates
    }

    /// Write the updates into the process environment
    pub fn apply(&self) -> Vec<EnvUpdate> {
        let updates = self.env_updates();
        if updates.is_empty() {
            gfx_debug!(SOURCE, "No loader environment changes needed");
        }
        for update in &updates {
            std::env::set_var(&update.name, &update.value);
            gfx_info!(SOURCE, "{}={}", update.name, update.value);
        }
        updates
    }
}

#[cfg(test)]
#[path = "vulkan_setup_tests.rs"]
mod tests;
