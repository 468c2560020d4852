/// Image layout state and per-layer layout tracking
///
/// Layout transitions are mandatory state-machine steps. Every texture owns a
/// `LayoutTracker` (one entry per array layer / cube face) and every consumer
/// that needs a particular layout (framebuffers, descriptor sets) keeps a clone
/// of the tracker so the requirement can be checked when the work is recorded.

use crate::error::{Error, Result};
use crate::graphics::format::TextureFormat;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard};

/// Layout an image (or one of its layers) is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureLayout {
    /// Contents undefined (freshly created)
    Undefined,
    /// Render target for color writes
    ColorAttachment,
    /// Render target for depth/stencil writes
    DepthStencilAttachment,
    /// Sampled from shaders
    ShaderReadOnly,
    /// Source of a copy (download)
    TransferSrc,
    /// Destination of a copy (upload)
    TransferDst,
}

impl TextureLayout {
    /// Attachment layout matching a format (depth or color)
    pub fn attachment_for(format: TextureFormat) -> Self {
        if format.is_depth() {
            TextureLayout::DepthStencilAttachment
        } else {
            TextureLayout::ColorAttachment
        }
    }

    pub fn is_attachment(&self) -> bool {
        matches!(
            self,
            TextureLayout::ColorAttachment | TextureLayout::DepthStencilAttachment
        )
    }
}

/// A contiguous run of layers sharing the same current layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutRun {
    pub layers: Range<u32>,
    pub from: TextureLayout,
}

/// Per-layer layout state of one image
#[derive(Debug)]
pub struct LayoutTracker {
    layouts: Mutex<Vec<TextureLayout>>,
}

impl LayoutTracker {
    /// Tracker for `layer_count` layers, all `Undefined`
    pub fn new(layer_count: u32) -> Arc<Self> {
        Arc::new(Self {
            layouts: Mutex::new(vec![TextureLayout::Undefined; layer_count as usize]),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<TextureLayout>>> {
        self.layouts
            .lock()
            .map_err(|_| Error::BackendError("layout tracker lock poisoned".to_string()))
    }

    fn check_range(layouts: &[TextureLayout], layers: &Range<u32>) -> Result<()> {
        if layers.start >= layers.end || layers.end as usize > layouts.len() {
            return Err(Error::InvalidResource(format!(
                "layer range {:?} outside 0..{}",
                layers,
                layouts.len()
            )));
        }
        Ok(())
    }

    pub fn layer_count(&self) -> u32 {
        self.lock().map(|l| l.len() as u32).unwrap_or(0)
    }

    /// Current layout of one layer
    pub fn layout(&self, layer: u32) -> Result<TextureLayout> {
        let layouts = self.lock()?;
        layouts.get(layer as usize).copied().ok_or_else(|| {
            Error::InvalidResource(format!("layer {} outside 0..{}", layer, layouts.len()))
        })
    }

    /// The common layout when every layer agrees
    pub fn uniform_layout(&self) -> Option<TextureLayout> {
        let layouts = self.lock().ok()?;
        let first = *layouts.first()?;
        layouts.iter().all(|l| *l == first).then_some(first)
    }

    /// Runs of layers in `layers` that need a barrier to reach `target`
    ///
    /// Layers already in `target` are skipped; adjacent layers with the same
    /// source layout are merged into one run.
    pub fn transitions(&self, layers: Range<u32>, target: TextureLayout) -> Result<Vec<LayoutRun>> {
        let layouts = self.lock()?;
        Self::check_range(&layouts, &layers)?;

        let mut runs: Vec<LayoutRun> = Vec::new();
        for layer in layers {
            let from = layouts[layer as usize];
            if from == target {
                continue;
            }
            match runs.last_mut() {
                Some(run) if run.from == from && run.layers.end == layer => run.layers.end = layer + 1,
                _ => runs.push(LayoutRun {
                    layers: layer..layer + 1,
                    from,
                }),
            }
        }
        Ok(runs)
    }

    /// Record that `layers` are now in `layout`
    pub fn commit(&self, layers: Range<u32>, layout: TextureLayout) -> Result<()> {
        let mut layouts = self.lock()?;
        Self::check_range(&layouts, &layers)?;
        for layer in layers {
            layouts[layer as usize] = layout;
        }
        Ok(())
    }

    /// Fail with `InvalidOperation` unless every layer in `layers` is in `expected`
    pub fn expect(&self, layers: Range<u32>, expected: TextureLayout, what: &str) -> Result<()> {
        let layouts = self.lock()?;
        Self::check_range(&layouts, &layers)?;
        for layer in layers {
            let actual = layouts[layer as usize];
            if actual != expected {
                return Err(Error::InvalidOperation(format!(
                    "{} layer {} is in {:?} layout, expected {:?}",
                    what, layer, actual, expected
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
