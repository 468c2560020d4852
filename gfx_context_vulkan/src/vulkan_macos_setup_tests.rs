//! Unit tests for vulkan_macos_setup.rs

use super::*;
use crate::vulkan_setup::PATH_SEPARATOR;
use std::fs;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("gfx_context_vulkan_tests")
        .join(format!("{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

// ============================================================================
// MANIFEST TESTS
// ============================================================================

#[test]
fn test_manifest_json_schema() {
    let manifest = IcdManifest::for_library(Path::new("/opt/vk/lib/libMoltenVK.dylib"));
    let value: serde_json::Value = serde_json::to_value(&manifest).unwrap();

    assert_eq!(value["file_format_version"], "1.0.0");
    assert_eq!(value["ICD"]["library_path"], "/opt/vk/lib/libMoltenVK.dylib");
    assert_eq!(value["ICD"]["api_version"], "1.2.0");
    assert_eq!(value["ICD"]["is_portability_driver"], true);
}

#[test]
fn test_write_icd_manifest_creates_directory() {
    let root = scratch_dir("write_manifest");
    let target = root.join("nested").join("icd");
    let library = Path::new("/opt/vk/lib/libMoltenVK.dylib");

    let path = write_icd_manifest(&target, library).unwrap();
    assert_eq!(path, target.join(MOLTENVK_ICD_NAME));

    let parsed: IcdManifest = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed, IcdManifest::for_library(library));
}

#[test]
fn test_find_existing_manifest_next_to_library() {
    let lib_dir = scratch_dir("manifest_beside");
    let library = lib_dir.join(MOLTENVK_LIBRARY);
    fs::write(&library, b"").unwrap();
    assert_eq!(find_existing_manifest(&library), None);

    fs::write(lib_dir.join(MOLTENVK_ICD_NAME), "{}").unwrap();
    assert_eq!(find_existing_manifest(&library), Some(lib_dir.join(MOLTENVK_ICD_NAME)));
}

#[test]
fn test_find_existing_manifest_in_share_dir() {
    let prefix = scratch_dir("manifest_share");
    let lib_dir = prefix.join("lib");
    let icd_dir = prefix.join("share").join("vulkan").join("icd.d");
    fs::create_dir_all(&lib_dir).unwrap();
    fs::create_dir_all(&icd_dir).unwrap();
    fs::write(icd_dir.join(MOLTENVK_ICD_NAME), "{}").unwrap();

    let found = find_existing_manifest(&lib_dir.join(MOLTENVK_LIBRARY));
    assert_eq!(found, Some(icd_dir.join(MOLTENVK_ICD_NAME)));
}

// ============================================================================
// SEARCH ORDER TESTS
// ============================================================================

#[test]
fn test_candidate_dirs_order() {
    let dirs = candidate_dirs(
        &[PathBuf::from("/custom")],
        Some(Path::new("/app/MacOS")),
        Some(Path::new("/sdk")),
    );
    assert_eq!(
        dirs,
        vec![
            PathBuf::from("/custom"),
            PathBuf::from("/app/MacOS"),
            PathBuf::from("/app/MacOS/../Frameworks"),
            PathBuf::from("/sdk/lib"),
            PathBuf::from("/usr/local/lib"),
            PathBuf::from("/opt/homebrew/lib"),
        ]
    );
}

#[test]
fn test_candidate_dirs_deduplicated() {
    let dirs = candidate_dirs(&[PathBuf::from("/usr/local/lib")], None, None);
    assert_eq!(
        dirs,
        vec![PathBuf::from("/usr/local/lib"), PathBuf::from("/opt/homebrew/lib")]
    );
}

// ============================================================================
// LOCATE TESTS
// ============================================================================

#[test]
fn test_locate_without_library() {
    let empty = scratch_dir("locate_none");
    let setup = MacOSVulkanSetup::new(vec![empty.clone()], empty.join("out"));
    assert_eq!(setup.locate().unwrap(), None);
    assert!(!empty.join("out").exists());
}

#[test]
fn test_locate_generates_manifest() {
    let lib_dir = scratch_dir("locate_generate");
    let out_dir = scratch_dir("locate_generate_out");
    fs::write(lib_dir.join(MOLTENVK_LIBRARY), b"").unwrap();

    let setup = MacOSVulkanSetup::new(vec![lib_dir.clone()], out_dir.clone());
    let location = setup.locate().unwrap().unwrap();

    assert!(location.generated);
    assert_eq!(location.manifest, out_dir.join(MOLTENVK_ICD_NAME));
    assert!(location.library.ends_with(MOLTENVK_LIBRARY));
}

#[test]
fn test_locate_reuses_existing_manifest() {
    let lib_dir = scratch_dir("locate_reuse");
    let out_dir = scratch_dir("locate_reuse_out");
    fs::write(lib_dir.join(MOLTENVK_LIBRARY), b"").unwrap();
    fs::write(lib_dir.join(MOLTENVK_ICD_NAME), "{}").unwrap();

    let setup = MacOSVulkanSetup::new(vec![lib_dir], out_dir.clone());
    let location = setup.locate().unwrap().unwrap();

    assert!(!location.generated);
    assert!(!out_dir.join(MOLTENVK_ICD_NAME).exists());
}

#[test]
fn test_location_env_updates_prepend_library_dir() {
    let location = MoltenVkLocation {
        library: PathBuf::from("/vk/lib/libMoltenVK.dylib"),
        manifest: PathBuf::from("/vk/lib/MoltenVK_icd.json"),
        generated: false,
    };
    let updates = location.env_updates(|name| {
        (name == "DYLD_LIBRARY_PATH").then(|| "/usr/lib".to_string())
    });

    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].name, "DYLD_LIBRARY_PATH");
    assert_eq!(updates[0].value, format!("/vk/lib{}/usr/lib", PATH_SEPARATOR));
    assert_eq!(updates[1].name, "DYLD_FALLBACK_LIBRARY_PATH");
    assert_eq!(updates[1].value, "/vk/lib");
}
