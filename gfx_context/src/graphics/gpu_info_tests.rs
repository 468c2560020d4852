//! Unit tests for gpu_info.rs

use crate::graphics::context::GraphicsBackend;
use crate::graphics::gpu_info::{
    format_api_version, select_best_gpu, GpuDeviceType, GpuInfo, GpuMemoryInfo,
    GraphicsDeviceInfo,
};

fn gpu(index: usize, name: &str, device_type: GpuDeviceType) -> GraphicsDeviceInfo {
    GraphicsDeviceInfo {
        index,
        name: name.to_string(),
        device_type,
        vendor_id: 0x10DE,
        device_id: 0x2684,
        api_version: "1.3.260".to_string(),
        driver_version: 1,
        memory: GpuMemoryInfo::default(),
    }
}

// ============================================================================
// API VERSION
// ============================================================================

#[test]
fn test_format_api_version() {
    // VK_MAKE_API_VERSION(0, 1, 2, 0)
    assert_eq!(format_api_version((1 << 22) | (2 << 12)), "1.2.0");
    assert_eq!(format_api_version((1 << 22) | (3 << 12) | 275), "1.3.275");
    assert_eq!(format_api_version(0), "0.0.0");
}

// ============================================================================
// MEMORY
// ============================================================================

#[test]
fn test_memory_from_heaps_splits_device_local() {
    let info = GpuMemoryInfo::from_heaps([(8u64 << 30, true), (16u64 << 30, false), (256u64 << 20, true)]);
    assert_eq!(info.device_local_bytes, (8 << 30) + (256 << 20));
    assert_eq!(info.host_visible_bytes, 16 << 30);
}

// ============================================================================
// GPU SELECTION
// ============================================================================

#[test]
fn test_select_prefers_discrete() {
    let gpus = vec![
        gpu(0, "Intel UHD", GpuDeviceType::IntegratedGpu),
        gpu(1, "llvmpipe", GpuDeviceType::Cpu),
        gpu(2, "RTX 4080", GpuDeviceType::DiscreteGpu),
    ];
    assert_eq!(select_best_gpu(&gpus).unwrap().index, 2);
}

#[test]
fn test_select_falls_back_to_integrated_then_first() {
    let gpus = vec![
        gpu(0, "SwiftShader", GpuDeviceType::Cpu),
        gpu(1, "Intel UHD", GpuDeviceType::IntegratedGpu),
    ];
    assert_eq!(select_best_gpu(&gpus).unwrap().index, 1);

    let gpus = vec![gpu(0, "SwiftShader", GpuDeviceType::Cpu)];
    assert_eq!(select_best_gpu(&gpus).unwrap().index, 0);

    assert!(select_best_gpu(&[]).is_none());
}

#[test]
fn test_is_molten_vk() {
    assert!(gpu(0, "Apple M2 Pro", GpuDeviceType::IntegratedGpu).is_molten_vk());
    assert!(!gpu(0, "AMD Radeon", GpuDeviceType::DiscreteGpu).is_molten_vk());
}

// ============================================================================
// JSON
// ============================================================================

#[test]
fn test_device_type_display_matches_json() {
    assert_eq!(GpuDeviceType::DiscreteGpu.to_string(), "Discrete GPU");
    assert_eq!(
        serde_json::to_string(&GpuDeviceType::VirtualGpu).unwrap(),
        "\"Virtual GPU\""
    );
}

#[test]
fn test_gpu_info_json_snapshot() {
    let selected = gpu(0, "RTX 4080", GpuDeviceType::DiscreteGpu);
    let info = GpuInfo {
        backend: GraphicsBackend::Vulkan,
        available_gpus: vec![selected.clone()],
        selected_gpu: Some(selected),
        extensions: vec!["VK_KHR_surface".to_string(), "VK_KHR_swapchain".to_string()],
        api_version: "1.3.260".to_string(),
        memory: GpuMemoryInfo {
            device_local_bytes: 1024,
            host_visible_bytes: 2048,
        },
    };

    let json = info.to_json_pretty().unwrap();
    assert!(json.contains("\"selected_gpu\""));
    assert!(json.contains("\"Discrete GPU\""));
    assert!(json.contains("VK_KHR_swapchain"));
    assert!(json.contains('\n'), "pretty JSON is indented");

    assert_eq!(GpuInfo::from_json(&json).unwrap(), info);
}

#[test]
fn test_gpu_info_from_bad_json() {
    assert!(GpuInfo::from_json("{ not json").is_err());
}
