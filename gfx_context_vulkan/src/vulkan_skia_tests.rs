//! Unit tests for vulkan_skia.rs
//!
//! Proc resolution order only; the Skia context needs a device.

use super::*;

unsafe extern "system" fn fake_entry_point() {}

fn found() -> vk::PFN_vkVoidFunction {
    Some(fake_entry_point)
}

// ============================================================================
// LOOKUP ORDER TESTS
// ============================================================================

#[test]
fn test_device_procs_try_device_first() {
    assert_eq!(
        lookup_order(true),
        &[ProcLookup::Device, ProcLookup::Instance, ProcLookup::Global]
    );
}

#[test]
fn test_instance_procs_skip_device() {
    assert_eq!(lookup_order(false), &[ProcLookup::Instance, ProcLookup::Global]);
}

// ============================================================================
// RESOLUTION TESTS
// ============================================================================

#[test]
fn test_first_hit_wins() {
    let mut asked = Vec::new();
    let resolved = resolve_proc(lookup_order(true), |kind| {
        asked.push(kind);
        match kind {
            ProcLookup::Device => None,
            _ => found(),
        }
    });
    let (kind, ptr) = resolved.unwrap();
    assert_eq!(kind, ProcLookup::Instance);
    assert!(!ptr.is_null());
    assert_eq!(asked, vec![ProcLookup::Device, ProcLookup::Instance]);
}

#[test]
fn test_falls_back_to_global() {
    let resolved = resolve_proc(lookup_order(true), |kind| match kind {
        ProcLookup::Global => found(),
        _ => None,
    });
    assert_eq!(resolved.map(|(kind, _)| kind), Some(ProcLookup::Global));
}

#[test]
fn test_unresolved_is_none() {
    assert!(resolve_proc(lookup_order(false), |_| None).is_none());
}
