//! Unit tests for vulkan_buffer.rs
//!
//! Memory placement only; buffer creation is covered by the GPU tests.

use super::*;

// ============================================================================
// MEMORY LOCATION TESTS
// ============================================================================

#[test]
fn test_device_local_goes_gpu_only() {
    assert_eq!(memory_location(MemoryProperty::DEVICE_LOCAL), MemoryLocation::GpuOnly);
    assert_eq!(memory_location(MemoryProperty::empty()), MemoryLocation::GpuOnly);
}

#[test]
fn test_host_visible_goes_cpu_to_gpu() {
    assert_eq!(
        memory_location(MemoryProperty::HOST_VISIBLE | MemoryProperty::HOST_COHERENT),
        MemoryLocation::CpuToGpu
    );
}

#[test]
fn test_host_cached_goes_gpu_to_cpu() {
    assert_eq!(
        memory_location(MemoryProperty::HOST_VISIBLE | MemoryProperty::HOST_CACHED),
        MemoryLocation::GpuToCpu
    );
}

// ============================================================================
// USAGE TESTS
// ============================================================================

#[test]
fn test_device_local_adds_transfer_usage() {
    let flags = vk_buffer_usage(BufferUsage::VERTEX, MemoryProperty::DEVICE_LOCAL);
    assert!(flags.contains(vk::BufferUsageFlags::VERTEX_BUFFER));
    assert!(flags.contains(vk::BufferUsageFlags::TRANSFER_SRC));
    assert!(flags.contains(vk::BufferUsageFlags::TRANSFER_DST));
}

#[test]
fn test_host_visible_keeps_requested_usage() {
    let flags = vk_buffer_usage(
        BufferUsage::UNIFORM,
        MemoryProperty::HOST_VISIBLE | MemoryProperty::HOST_COHERENT,
    );
    assert_eq!(flags, vk::BufferUsageFlags::UNIFORM_BUFFER);
}
