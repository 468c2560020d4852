//! Unit tests for buffer.rs

use crate::error::Error;
use crate::graphics::buffer::{check_buffer_range, BufferUsage, MemoryProperty};
use crate::graphics::context::GraphicsContext;
use crate::mock::MockGraphicsContext;

fn host_buffer(ctx: &MockGraphicsContext, size: u64) -> Box<dyn crate::graphics::buffer::Buffer> {
    ctx.create_buffer(
        size,
        BufferUsage::UNIFORM,
        MemoryProperty::HOST_VISIBLE | MemoryProperty::HOST_COHERENT,
    )
    .unwrap()
}

// ============================================================================
// RANGE CHECKS
// ============================================================================

#[test]
fn test_range_inside_buffer() {
    assert!(check_buffer_range(64, 0, 64).is_ok());
    assert!(check_buffer_range(64, 60, 4).is_ok());
    assert!(check_buffer_range(64, 64, 0).is_ok());
}

#[test]
fn test_range_outside_buffer() {
    assert!(matches!(
        check_buffer_range(64, 60, 8),
        Err(Error::InvalidResource(_))
    ));
    assert!(check_buffer_range(64, u64::MAX, 2).is_err());
}

#[test]
fn test_memory_property_host_visible() {
    assert!(MemoryProperty::HOST_VISIBLE.is_host_visible());
    assert!((MemoryProperty::HOST_VISIBLE | MemoryProperty::HOST_CACHED).is_host_visible());
    assert!(!MemoryProperty::DEVICE_LOCAL.is_host_visible());
}

// ============================================================================
// UPLOAD / READ
// ============================================================================

#[test]
fn test_upload_pod_values() {
    let ctx = MockGraphicsContext::new();
    let buffer = host_buffer(&ctx, 16);

    buffer.upload_pod(4, &[1.0f32, 2.0]).unwrap();

    let bytes = buffer.read(4, 8).unwrap();
    let values: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    assert_eq!(values, vec![1.0, 2.0]);
    assert_eq!(buffer.read(0, 4).unwrap(), vec![0; 4]);
}

#[test]
fn test_upload_out_of_range() {
    let ctx = MockGraphicsContext::new();
    let buffer = host_buffer(&ctx, 8);
    assert!(matches!(
        buffer.upload(4, &[0u8; 8]),
        Err(Error::InvalidResource(_))
    ));
}

// ============================================================================
// MAPPING
// ============================================================================

#[test]
fn test_mapping_writes_through() {
    let ctx = MockGraphicsContext::new();
    let buffer = host_buffer(&ctx, 8);

    {
        let mut mapping = buffer.map().unwrap();
        assert_eq!(mapping.len(), 8);
        mapping.as_mut_slice()[..3].copy_from_slice(&[9, 8, 7]);
        assert!(buffer.is_mapped());
    }

    assert!(!buffer.is_mapped());
    assert_eq!(buffer.read(0, 3).unwrap(), vec![9, 8, 7]);
}

#[test]
fn test_double_map_rejected() {
    let ctx = MockGraphicsContext::new();
    let buffer = host_buffer(&ctx, 8);

    let _mapping = buffer.map().unwrap();
    assert!(matches!(buffer.map(), Err(Error::InvalidOperation(_))));
}

#[test]
fn test_upload_while_mapped_rejected() {
    let ctx = MockGraphicsContext::new();
    let buffer = host_buffer(&ctx, 8);

    let mapping = buffer.map().unwrap();
    assert!(matches!(buffer.upload(0, &[1]), Err(Error::InvalidOperation(_))));
    drop(mapping);
    buffer.upload(0, &[1]).unwrap();
}
