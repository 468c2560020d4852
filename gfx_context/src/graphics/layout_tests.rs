//! Unit tests for layout.rs

use crate::error::Error;
use crate::graphics::format::TextureFormat;
use crate::graphics::layout::{LayoutRun, LayoutTracker, TextureLayout};

// ============================================================================
// TEXTURE LAYOUT
// ============================================================================

#[test]
fn test_attachment_for_format() {
    assert_eq!(
        TextureLayout::attachment_for(TextureFormat::Rgba8Unorm),
        TextureLayout::ColorAttachment
    );
    assert_eq!(
        TextureLayout::attachment_for(TextureFormat::Depth32Float),
        TextureLayout::DepthStencilAttachment
    );
    assert!(TextureLayout::DepthStencilAttachment.is_attachment());
    assert!(!TextureLayout::ShaderReadOnly.is_attachment());
}

// ============================================================================
// TRACKER
// ============================================================================

#[test]
fn test_new_tracker_is_undefined() {
    let tracker = LayoutTracker::new(6);
    assert_eq!(tracker.layer_count(), 6);
    assert_eq!(tracker.uniform_layout(), Some(TextureLayout::Undefined));
    assert_eq!(tracker.layout(5).unwrap(), TextureLayout::Undefined);
}

#[test]
fn test_layout_out_of_range() {
    let tracker = LayoutTracker::new(2);
    assert!(matches!(tracker.layout(2), Err(Error::InvalidResource(_))));
    assert!(tracker.commit(1..3, TextureLayout::ShaderReadOnly).is_err());
    assert!(tracker.transitions(0..0, TextureLayout::ShaderReadOnly).is_err());
}

#[test]
fn test_transitions_skip_layers_already_in_target() {
    let tracker = LayoutTracker::new(4);
    tracker.commit(1..2, TextureLayout::ShaderReadOnly).unwrap();

    let runs = tracker.transitions(0..4, TextureLayout::ShaderReadOnly).unwrap();
    assert_eq!(
        runs,
        vec![
            LayoutRun { layers: 0..1, from: TextureLayout::Undefined },
            LayoutRun { layers: 2..4, from: TextureLayout::Undefined },
        ]
    );
}

#[test]
fn test_transitions_split_on_source_layout() {
    let tracker = LayoutTracker::new(3);
    tracker.commit(0..1, TextureLayout::ColorAttachment).unwrap();
    tracker.commit(1..3, TextureLayout::TransferDst).unwrap();

    let runs = tracker.transitions(0..3, TextureLayout::ShaderReadOnly).unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].from, TextureLayout::ColorAttachment);
    assert_eq!(runs[1].layers, 1..3);
}

#[test]
fn test_no_transition_when_equal() {
    let tracker = LayoutTracker::new(1);
    tracker.commit(0..1, TextureLayout::ColorAttachment).unwrap();
    assert!(tracker
        .transitions(0..1, TextureLayout::ColorAttachment)
        .unwrap()
        .is_empty());
}

#[test]
fn test_expect_reports_offending_layer() {
    let tracker = LayoutTracker::new(6);
    tracker.commit(0..6, TextureLayout::ShaderReadOnly).unwrap();
    tracker.commit(3..4, TextureLayout::ColorAttachment).unwrap();

    assert!(tracker.expect(0..3, TextureLayout::ShaderReadOnly, "cube").is_ok());
    match tracker.expect(0..6, TextureLayout::ShaderReadOnly, "cube") {
        Err(Error::InvalidOperation(msg)) => {
            assert!(msg.contains("layer 3"));
            assert!(msg.contains("ColorAttachment"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(tracker.uniform_layout(), None);
}
