//! Unit tests for vulkan_context.rs
//!
//! Context creation needs a GPU (see tests/vulkan_context_tests.rs).

use super::*;
use gfx_context::gfx::mock::mock_device;
use gfx_context::gfx::GpuDeviceType;

fn extensions(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_gpu_info_selected_and_available() {
    let discrete = mock_device(0, "Discrete", GpuDeviceType::DiscreteGpu);
    let integrated = mock_device(1, "Integrated", GpuDeviceType::IntegratedGpu);
    let info = build_gpu_info(
        GraphicsBackend::Vulkan,
        vec![discrete.clone(), integrated],
        &discrete,
        &[],
        &[],
    );
    assert_eq!(info.backend, GraphicsBackend::Vulkan);
    assert_eq!(info.available_gpus.len(), 2);
    assert_eq!(info.selected_gpu.as_ref().map(|g| g.name.as_str()), Some("Discrete"));
    assert_eq!(info.api_version, discrete.api_version);
    assert_eq!(info.memory, discrete.memory);
}

#[test]
fn test_gpu_info_merges_extensions_without_duplicates() {
    let gpu = mock_device(0, "GPU", GpuDeviceType::DiscreteGpu);
    let info = build_gpu_info(
        GraphicsBackend::Metal,
        vec![gpu.clone()],
        &gpu,
        &extensions(&["VK_KHR_surface", "VK_EXT_metal_objects"]),
        &extensions(&["VK_KHR_swapchain", "VK_EXT_metal_objects"]),
    );
    assert_eq!(
        info.extensions,
        extensions(&["VK_KHR_surface", "VK_EXT_metal_objects", "VK_KHR_swapchain"])
    );
    assert_eq!(info.backend, GraphicsBackend::Metal);
}

#[test]
fn test_gpu_info_json_round_trip() {
    let gpu = mock_device(0, "GPU", GpuDeviceType::IntegratedGpu);
    let info = build_gpu_info(GraphicsBackend::Vulkan, vec![gpu.clone()], &gpu, &[], &[]);
    let json = info.to_json_pretty().unwrap();
    assert!(json.contains("Integrated GPU"));
    let parsed = GpuInfo::from_json(&json).unwrap();
    assert_eq!(parsed.selected_gpu, info.selected_gpu);
}
