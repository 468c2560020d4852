//! In-memory graphics context
//!
//! `MockGraphicsContext` implements every graphics trait on the CPU: images
//! are byte vectors, render passes validate their calls and apply clears on
//! `end`. It enforces the same layout, binding and lifetime rules as the
//! native backends, so application code can be tested without a GPU.
//! `MockBackend` plugs the mock into `GraphicsContextFactory`.

use crate::error::{Error, Result};
use crate::factory::ContextBackend;
use crate::graphics::buffer::{check_buffer_range, Buffer, BufferUsage, MemoryProperty};
use crate::graphics::context::{validate_framebuffer_attachments, GraphicsBackend, GraphicsContext};
use crate::graphics::descriptor_set::{DescriptorPoolSize, DescriptorSet, DescriptorWrites};
use crate::graphics::format::TextureFormat;
use crate::graphics::gpu_info::{
    select_best_gpu, GpuDeviceType, GpuInfo, GpuMemoryInfo, GraphicsDeviceInfo,
};
use crate::graphics::layout::{LayoutTracker, TextureLayout};
use crate::graphics::pipeline::{
    validate_push_constants, DescriptorBinding, Pipeline3D, PipelineDesc,
};
use crate::graphics::render_pass::{
    not_recording, validate_clear_colors, AttachmentLoadOp, ClearColor, Framebuffer3D,
    IndexType, RenderPass3D, RenderPassDesc,
};
use crate::graphics::sampler::{Sampler, SamplerDesc};
use crate::graphics::texture::{
    AttachmentView, CubeFace, SampledTexture, SharedTexture, Texture2D, TextureArray,
    TextureCube, TextureCubeArray,
};
use skia_safe::gpu::DirectContext;
use std::any::Any;
use std::ops::Range;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

const SOURCE: &str = "gfx::mock";

const SPIRV_MAGIC: u32 = 0x0723_0203;

static NEXT_RENDER_PASS_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// IMAGES
// ============================================================================

type LayerPixels = Arc<Mutex<Vec<Vec<u8>>>>;

fn lock_pixels(pixels: &LayerPixels) -> Result<MutexGuard<'_, Vec<Vec<u8>>>> {
    pixels
        .lock()
        .map_err(|_| Error::BackendError("mock image lock poisoned".to_string()))
}

/// CPU image with one tightly packed byte vector per array layer
struct MockImage {
    width: u32,
    height: u32,
    layers: u32,
    format: TextureFormat,
    tracker: Arc<LayoutTracker>,
    pixels: LayerPixels,
}

impl MockImage {
    fn new(width: u32, height: u32, layers: u32, format: TextureFormat) -> Result<Self> {
        if width == 0 || height == 0 || layers == 0 {
            return Err(Error::InvalidResource(format!(
                "invalid texture extent {}x{} with {} layers",
                width, height, layers
            )));
        }
        let layer_size = format.image_size(width, height);
        Ok(Self {
            width,
            height,
            layers,
            format,
            tracker: LayoutTracker::new(layers),
            pixels: Arc::new(Mutex::new(vec![vec![0u8; layer_size]; layers as usize])),
        })
    }

    fn layer_size(&self) -> usize {
        self.format.image_size(self.width, self.height)
    }

    fn check_layer(&self, layer: u32) -> Result<()> {
        if layer >= self.layers {
            return Err(Error::InvalidResource(format!(
                "layer {} outside 0..{}",
                layer, self.layers
            )));
        }
        Ok(())
    }

    fn transition(&self, layers: Range<u32>, layout: TextureLayout) -> Result<()> {
        if layout == TextureLayout::Undefined {
            return Err(Error::InvalidOperation(
                "cannot transition an image to the Undefined layout".to_string(),
            ));
        }
        for run in self.tracker.transitions(layers.clone(), layout)? {
            crate::gfx_trace!(
                SOURCE,
                "layers {:?}: {:?} -> {:?}",
                run.layers,
                run.from,
                layout
            );
        }
        self.tracker.commit(layers, layout)
    }

    fn write_layer(&self, layer: u32, data: &[u8]) -> Result<()> {
        self.check_layer(layer)?;
        if data.len() != self.layer_size() {
            return Err(Error::InvalidResource(format!(
                "expected {} bytes for a {}x{} {:?} layer, got {}",
                self.layer_size(),
                self.width,
                self.height,
                self.format,
                data.len()
            )));
        }
        self.transition(layer..layer + 1, TextureLayout::TransferDst)?;
        lock_pixels(&self.pixels)?[layer as usize].copy_from_slice(data);
        self.transition(layer..layer + 1, TextureLayout::ShaderReadOnly)
    }

    fn read_layer(&self, layer: u32) -> Result<Vec<u8>> {
        self.check_layer(layer)?;
        self.transition(layer..layer + 1, TextureLayout::TransferSrc)?;
        let data = lock_pixels(&self.pixels)?[layer as usize].clone();
        self.transition(layer..layer + 1, TextureLayout::ShaderReadOnly)?;
        Ok(data)
    }

    fn attachment(&self, layer: u32) -> MockAttachment {
        MockAttachment {
            pixels: self.pixels.clone(),
            layer,
            format: self.format,
            tracker: self.tracker.clone(),
        }
    }
}

/// 2D texture (also the shared texture of the mock context)
pub struct MockTexture2D {
    image: MockImage,
}

impl Texture2D for MockTexture2D {
    fn width(&self) -> u32 {
        self.image.width
    }

    fn height(&self) -> u32 {
        self.image.height
    }

    fn format(&self) -> TextureFormat {
        self.image.format
    }

    fn layout_tracker(&self) -> &Arc<LayoutTracker> {
        &self.image.tracker
    }

    fn upload(&self, pixels: &[u8]) -> Result<()> {
        self.image.write_layer(0, pixels)
    }

    fn download_pixels(&self) -> Result<Vec<u8>> {
        self.image.read_layer(0)
    }

    fn transition_to(&self, layout: TextureLayout) -> Result<()> {
        self.image.transition(0..1, layout)
    }

    fn create_skia_surface(&self) -> Result<skia_safe::Surface> {
        if self.image.format.to_skia_color_type().is_none() {
            return Err(Error::InvalidOperation(format!(
                "{:?} has no Skia color type",
                self.image.format
            )));
        }
        skia_safe::surfaces::raster_n32_premul((self.image.width as i32, self.image.height as i32))
            .ok_or_else(|| Error::BackendError("Skia raster surface creation failed".to_string()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl SharedTexture for MockTexture2D {
    fn as_texture_2d(&self) -> &dyn Texture2D {
        self
    }
}

pub struct MockTextureArray {
    image: MockImage,
}

impl TextureArray for MockTextureArray {
    fn width(&self) -> u32 {
        self.image.width
    }

    fn height(&self) -> u32 {
        self.image.height
    }

    fn array_size(&self) -> u32 {
        self.image.layers
    }

    fn format(&self) -> TextureFormat {
        self.image.format
    }

    fn layout_tracker(&self) -> &Arc<LayoutTracker> {
        &self.image.tracker
    }

    fn upload_layer(&self, layer: u32, pixels: &[u8]) -> Result<()> {
        self.image.write_layer(layer, pixels)
    }

    fn transition_layer_to_attachment(&self, layer: u32) -> Result<()> {
        self.image.check_layer(layer)?;
        self.image
            .transition(layer..layer + 1, TextureLayout::attachment_for(self.image.format))
    }

    fn transition_layer_to_sampled(&self, layer: u32) -> Result<()> {
        self.image.check_layer(layer)?;
        self.image
            .transition(layer..layer + 1, TextureLayout::ShaderReadOnly)
    }

    fn transition_all_to_sampled(&self) -> Result<()> {
        self.image
            .transition(0..self.image.layers, TextureLayout::ShaderReadOnly)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockTextureCube {
    image: MockImage,
}

impl TextureCube for MockTextureCube {
    fn size(&self) -> u32 {
        self.image.width
    }

    fn format(&self) -> TextureFormat {
        self.image.format
    }

    fn layout_tracker(&self) -> &Arc<LayoutTracker> {
        &self.image.tracker
    }

    fn upload_face(&self, face: CubeFace, pixels: &[u8]) -> Result<()> {
        self.image.write_layer(face.index(), pixels)
    }

    fn transition_face_to_attachment(&self, face: CubeFace) -> Result<()> {
        let layer = face.index();
        self.image
            .transition(layer..layer + 1, TextureLayout::attachment_for(self.image.format))
    }

    fn transition_to_attachment(&self) -> Result<()> {
        self.image
            .transition(0..6, TextureLayout::attachment_for(self.image.format))
    }

    fn transition_to_sampled(&self) -> Result<()> {
        self.image.transition(0..6, TextureLayout::ShaderReadOnly)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockTextureCubeArray {
    image: MockImage,
}

impl MockTextureCubeArray {
    fn check_cube(&self, cube_index: u32) -> Result<()> {
        if cube_index >= self.array_size() {
            return Err(Error::InvalidResource(format!(
                "cube {} outside cube array of {} cubes",
                cube_index,
                self.array_size()
            )));
        }
        Ok(())
    }
}

impl TextureCubeArray for MockTextureCubeArray {
    fn size(&self) -> u32 {
        self.image.width
    }

    fn array_size(&self) -> u32 {
        self.image.layers / 6
    }

    fn format(&self) -> TextureFormat {
        self.image.format
    }

    fn layout_tracker(&self) -> &Arc<LayoutTracker> {
        &self.image.tracker
    }

    fn transition_cube_to_attachment(&self, cube_index: u32) -> Result<()> {
        self.check_cube(cube_index)?;
        let first = cube_index * 6;
        self.image
            .transition(first..first + 6, TextureLayout::attachment_for(self.image.format))
    }

    fn transition_face_to_attachment(&self, cube_index: u32, face: CubeFace) -> Result<()> {
        self.check_cube(cube_index)?;
        let layer = crate::graphics::texture::cube_array_layer(cube_index, face);
        self.image
            .transition(layer..layer + 1, TextureLayout::attachment_for(self.image.format))
    }

    fn transition_to_sampled(&self) -> Result<()> {
        self.image
            .transition(0..self.image.layers, TextureLayout::ShaderReadOnly)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn mock_image(any: &dyn Any) -> Option<&MockImage> {
    if let Some(t) = any.downcast_ref::<MockTexture2D>() {
        return Some(&t.image);
    }
    if let Some(t) = any.downcast_ref::<MockTextureArray>() {
        return Some(&t.image);
    }
    if let Some(t) = any.downcast_ref::<MockTextureCube>() {
        return Some(&t.image);
    }
    any.downcast_ref::<MockTextureCubeArray>().map(|t| &t.image)
}

// ============================================================================
// BUFFERS / SAMPLERS
// ============================================================================

pub struct MockBuffer {
    size: u64,
    usage: BufferUsage,
    memory: MemoryProperty,
    data: Mutex<Box<[u8]>>,
    mapped: AtomicBool,
}

impl MockBuffer {
    fn lock(&self) -> Result<MutexGuard<'_, Box<[u8]>>> {
        self.data
            .lock()
            .map_err(|_| Error::BackendError("mock buffer lock poisoned".to_string()))
    }

    fn check_unmapped(&self, operation: &str) -> Result<()> {
        if self.mapped.load(Ordering::Acquire) {
            return Err(Error::InvalidOperation(format!(
                "{} on a mapped buffer",
                operation
            )));
        }
        Ok(())
    }
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn memory_properties(&self) -> MemoryProperty {
        self.memory
    }

    fn upload(&self, offset: u64, data: &[u8]) -> Result<()> {
        check_buffer_range(self.size, offset, data.len() as u64)?;
        self.check_unmapped("upload")?;
        let start = offset as usize;
        self.lock()?[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        check_buffer_range(self.size, offset, len)?;
        self.check_unmapped("read")?;
        let start = offset as usize;
        Ok(self.lock()?[start..start + len as usize].to_vec())
    }

    fn map_raw(&self) -> Result<NonNull<u8>> {
        if !self.memory.is_host_visible() {
            return Err(Error::InvalidOperation(
                "only host-visible buffers can be mapped".to_string(),
            ));
        }
        if self
            .mapped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::InvalidOperation("buffer is already mapped".to_string()));
        }
        let ptr = self.lock()?.as_mut_ptr();
        NonNull::new(ptr).ok_or_else(|| Error::NullHandle("mapped buffer pointer".to_string()))
    }

    fn unmap(&self) {
        self.mapped.store(false, Ordering::Release);
    }

    fn is_mapped(&self) -> bool {
        self.mapped.load(Ordering::Acquire)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockSampler {
    desc: SamplerDesc,
}

impl Sampler for MockSampler {
    fn desc(&self) -> &SamplerDesc {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// RENDER PASSES
// ============================================================================

#[derive(Debug, Default)]
struct MockStats {
    passes: AtomicU64,
    draws: AtomicU64,
}

/// One attached layer of a mock image
#[derive(Clone)]
struct MockAttachment {
    pixels: LayerPixels,
    layer: u32,
    format: TextureFormat,
    tracker: Arc<LayoutTracker>,
}

impl MockAttachment {
    fn expect_attachment_layout(&self, what: &str) -> Result<()> {
        self.tracker.expect(
            self.layer..self.layer + 1,
            TextureLayout::attachment_for(self.format),
            what,
        )
    }

    fn fill(&self, texel: &[u8]) -> Result<()> {
        let mut pixels = lock_pixels(&self.pixels)?;
        for chunk in pixels[self.layer as usize].chunks_exact_mut(texel.len()) {
            chunk.copy_from_slice(texel);
        }
        Ok(())
    }
}

/// Clear color as stored in `format`, when the mock can encode it
fn encode_clear_color(format: TextureFormat, color: ClearColor) -> Option<Vec<u8>> {
    match format {
        TextureFormat::Rgba8Unorm => Some(color.to_rgba8().to_vec()),
        TextureFormat::Bgra8Unorm => {
            let [r, g, b, a] = color.to_rgba8();
            Some(vec![b, g, r, a])
        }
        TextureFormat::R8Unorm => Some(vec![color.to_rgba8()[0]]),
        TextureFormat::Rgba32Float => Some(bytemuck::bytes_of(&color.to_array()).to_vec()),
        TextureFormat::R32Float => Some(color.r.to_ne_bytes().to_vec()),
        TextureFormat::Rgba16Float
        | TextureFormat::R16Float
        | TextureFormat::Depth32Float
        | TextureFormat::Depth24UnormStencil8 => None,
    }
}

pub struct MockFramebuffer {
    width: u32,
    height: u32,
    color_formats: Vec<TextureFormat>,
    depth_format: Option<TextureFormat>,
    colors: Vec<MockAttachment>,
    depth: Option<MockAttachment>,
}

impl MockFramebuffer {
    fn is_compatible(&self, desc: &RenderPassDesc) -> bool {
        self.color_formats == desc.color_formats && self.depth_format == desc.depth_format
    }
}

impl Framebuffer3D for MockFramebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn color_attachment_count(&self) -> u32 {
        self.colors.len() as u32
    }

    fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct Recording {
    colors: Vec<MockAttachment>,
    depth: Option<MockAttachment>,
    clear_colors: Vec<ClearColor>,
    clear_depth: f32,
    pipeline_bound: bool,
    index_buffer_bound: bool,
    draws: u64,
}

pub struct MockRenderPass {
    id: u64,
    desc: RenderPassDesc,
    stats: Arc<MockStats>,
    recording: Option<Recording>,
}

impl MockRenderPass {
    pub fn id(&self) -> u64 {
        self.id
    }

    fn recording(&mut self, operation: &str) -> Result<&mut Recording> {
        self.recording
            .as_mut()
            .ok_or_else(|| not_recording(operation))
    }
}

impl RenderPass3D for MockRenderPass {
    fn desc(&self) -> &RenderPassDesc {
        &self.desc
    }

    fn begin(
        &mut self,
        framebuffer: &dyn Framebuffer3D,
        clear_colors: &[ClearColor],
        clear_depth: f32,
    ) -> Result<()> {
        if self.recording.is_some() {
            return Err(Error::InvalidOperation(
                "begin called while the render pass is already recording".to_string(),
            ));
        }
        validate_clear_colors(self.desc.color_formats.len(), clear_colors.len())?;

        let framebuffer = framebuffer
            .as_any()
            .downcast_ref::<MockFramebuffer>()
            .ok_or_else(|| {
                Error::InvalidResource("framebuffer was not created by the mock context".to_string())
            })?;
        if !framebuffer.is_compatible(&self.desc) {
            return Err(Error::ValidationFailed(
                "framebuffer is not compatible with this render pass".to_string(),
            ));
        }
        for (index, attachment) in framebuffer.colors.iter().enumerate() {
            attachment.expect_attachment_layout(&format!("color attachment {}", index))?;
        }
        if let Some(depth) = &framebuffer.depth {
            depth.expect_attachment_layout("depth attachment")?;
        }

        self.recording = Some(Recording {
            colors: framebuffer.colors.clone(),
            depth: framebuffer.depth.clone(),
            clear_colors: clear_colors.to_vec(),
            clear_depth,
            pipeline_bound: false,
            index_buffer_bound: false,
            draws: 0,
        });
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &dyn Pipeline3D) -> Result<()> {
        let expected = self.desc.color_formats.len() as u32;
        let recording = self.recording("bind_pipeline")?;
        let pipeline = pipeline
            .as_any()
            .downcast_ref::<MockPipeline>()
            .ok_or_else(|| {
                Error::InvalidResource("pipeline was not created by the mock context".to_string())
            })?;
        if pipeline.color_attachment_count != expected {
            return Err(Error::ValidationFailed(format!(
                "pipeline writes {} color attachments, render pass has {}",
                pipeline.color_attachment_count, expected
            )));
        }
        recording.pipeline_bound = true;
        Ok(())
    }

    fn bind_descriptor_set(
        &mut self,
        _pipeline: &dyn Pipeline3D,
        set: &dyn DescriptorSet,
    ) -> Result<()> {
        let recording = self.recording("bind_descriptor_set")?;
        if !recording.pipeline_bound {
            return Err(Error::InvalidOperation(
                "bind_descriptor_set before bind_pipeline".to_string(),
            ));
        }
        set.writes().validate_for_bind()
    }

    fn bind_vertex_buffer(&mut self, _binding: u32, buffer: &dyn Buffer) -> Result<()> {
        self.recording("bind_vertex_buffer")?;
        if !buffer.usage().contains(BufferUsage::VERTEX) {
            return Err(Error::ValidationFailed(
                "buffer bound as vertex buffer lacks VERTEX usage".to_string(),
            ));
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, _index_type: IndexType) -> Result<()> {
        let recording = self.recording("bind_index_buffer")?;
        if !buffer.usage().contains(BufferUsage::INDEX) {
            return Err(Error::ValidationFailed(
                "buffer bound as index buffer lacks INDEX usage".to_string(),
            ));
        }
        recording.index_buffer_bound = true;
        Ok(())
    }

    fn push_constants(&mut self, pipeline: &dyn Pipeline3D, data: &[u8]) -> Result<()> {
        self.recording("push_constants")?;
        validate_push_constants(data.len())?;
        if data.len() > pipeline.push_constant_size() as usize {
            return Err(Error::ValidationFailed(format!(
                "{} bytes of push constants exceed the pipeline's {} byte block",
                data.len(),
                pipeline.push_constant_size()
            )));
        }
        Ok(())
    }

    fn draw(&mut self, _vertex_count: u32, _instance_count: u32) -> Result<()> {
        let recording = self.recording("draw")?;
        if !recording.pipeline_bound {
            return Err(Error::InvalidOperation("draw without a bound pipeline".to_string()));
        }
        recording.draws += 1;
        Ok(())
    }

    fn draw_indexed(&mut self, _index_count: u32, _instance_count: u32) -> Result<()> {
        let recording = self.recording("draw_indexed")?;
        if !recording.pipeline_bound {
            return Err(Error::InvalidOperation(
                "draw_indexed without a bound pipeline".to_string(),
            ));
        }
        if !recording.index_buffer_bound {
            return Err(Error::InvalidOperation(
                "draw_indexed without an index buffer".to_string(),
            ));
        }
        recording.draws += 1;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let recording = self.recording.take().ok_or_else(|| not_recording("end"))?;

        if self.desc.color_load_op == AttachmentLoadOp::Clear {
            for (attachment, color) in recording.colors.iter().zip(&recording.clear_colors) {
                match encode_clear_color(attachment.format, *color) {
                    Some(texel) => attachment.fill(&texel)?,
                    None => crate::gfx_debug!(
                        SOURCE,
                        "clear of {:?} attachments is not simulated",
                        attachment.format
                    ),
                }
            }
        }
        if self.desc.depth_load_op == AttachmentLoadOp::Clear {
            if let Some(depth) = &recording.depth {
                if depth.format == TextureFormat::Depth32Float {
                    depth.fill(&recording.clear_depth.to_ne_bytes())?;
                }
            }
        }

        self.stats.passes.fetch_add(1, Ordering::Relaxed);
        self.stats.draws.fetch_add(recording.draws, Ordering::Relaxed);
        crate::gfx_trace!(
            SOURCE,
            "render pass {} submitted with {} draws",
            self.id,
            recording.draws
        );
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// PIPELINES / DESCRIPTOR SETS
// ============================================================================

pub struct MockPipeline {
    bindings: Vec<DescriptorBinding>,
    color_attachment_count: u32,
}

impl Pipeline3D for MockPipeline {
    fn bindings(&self) -> &[DescriptorBinding] {
        &self.bindings
    }

    fn color_attachment_count(&self) -> u32 {
        self.color_attachment_count
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockDescriptorSet {
    writes: DescriptorWrites,
}

impl DescriptorSet for MockDescriptorSet {
    fn update_buffer(&mut self, binding: u32, buffer: &dyn Buffer) -> Result<()> {
        self.writes.record_buffer(binding, buffer).map(|_| ())
    }

    fn update_texture(
        &mut self,
        binding: u32,
        texture: SampledTexture<'_>,
        sampler: &dyn Sampler,
    ) -> Result<()> {
        if sampler.as_any().downcast_ref::<MockSampler>().is_none() {
            return Err(Error::InvalidResource(
                "sampler was not created by the mock context".to_string(),
            ));
        }
        self.writes.record_texture(binding, texture)
    }

    fn writes(&self) -> &DescriptorWrites {
        &self.writes
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// CONTEXT
// ============================================================================

/// CPU implementation of `GraphicsContext`
pub struct MockGraphicsContext {
    gpu_info: GpuInfo,
    disposed: AtomicBool,
    dispose_count: AtomicU32,
    wait_idle_count: AtomicU32,
    stats: Arc<MockStats>,
}

impl MockGraphicsContext {
    /// Context on a single "Mock GPU"
    pub fn new() -> Self {
        let gpu = mock_device(0, "Mock GPU", GpuDeviceType::Cpu);
        Self::with_gpus(vec![gpu.clone()], gpu)
    }

    pub fn with_gpus(available: Vec<GraphicsDeviceInfo>, selected: GraphicsDeviceInfo) -> Self {
        let memory = selected.memory;
        Self {
            gpu_info: GpuInfo {
                backend: GraphicsBackend::Vulkan,
                available_gpus: available,
                selected_gpu: Some(selected),
                extensions: Vec::new(),
                api_version: "1.3.0".to_string(),
                memory,
            },
            disposed: AtomicBool::new(false),
            dispose_count: AtomicU32::new(0),
            wait_idle_count: AtomicU32::new(0),
            stats: Arc::new(MockStats::default()),
        }
    }

    /// Number of `dispose` calls that actually released the context
    pub fn dispose_count(&self) -> u32 {
        self.dispose_count.load(Ordering::Relaxed)
    }

    pub fn wait_idle_count(&self) -> u32 {
        self.wait_idle_count.load(Ordering::Relaxed)
    }

    /// Render passes ended so far
    pub fn submitted_passes(&self) -> u64 {
        self.stats.passes.load(Ordering::Relaxed)
    }

    pub fn draw_calls(&self) -> u64 {
        self.stats.draws.load(Ordering::Relaxed)
    }

    fn check_alive(&self, operation: &str) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(Error::ObjectDisposed(format!(
                "{} called on a disposed context",
                operation
            )));
        }
        Ok(())
    }
}

impl Default for MockGraphicsContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Device record for mock GPUs
pub fn mock_device(index: usize, name: &str, device_type: GpuDeviceType) -> GraphicsDeviceInfo {
    GraphicsDeviceInfo {
        index,
        name: name.to_string(),
        device_type,
        vendor_id: 0,
        device_id: index as u32,
        api_version: "1.3.0".to_string(),
        driver_version: 1,
        memory: GpuMemoryInfo {
            device_local_bytes: 1 << 30,
            host_visible_bytes: 1 << 30,
        },
    }
}

impl GraphicsContext for MockGraphicsContext {
    fn backend(&self) -> GraphicsBackend {
        self.gpu_info.backend
    }

    fn skia_context(&self) -> Result<DirectContext> {
        self.check_alive("skia_context")?;
        Err(Error::UnsupportedPlatform(
            "the mock context has no Skia GPU backend".to_string(),
        ))
    }

    fn gpu_info(&self) -> &GpuInfo {
        &self.gpu_info
    }

    fn create_texture(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn SharedTexture>> {
        self.check_alive("create_texture")?;
        Ok(Box::new(MockTexture2D {
            image: MockImage::new(width, height, 1, format)?,
        }))
    }

    fn create_texture_2d(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn Texture2D>> {
        self.check_alive("create_texture_2d")?;
        Ok(Box::new(MockTexture2D {
            image: MockImage::new(width, height, 1, format)?,
        }))
    }

    fn create_texture_array(
        &self,
        width: u32,
        height: u32,
        array_size: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn TextureArray>> {
        self.check_alive("create_texture_array")?;
        Ok(Box::new(MockTextureArray {
            image: MockImage::new(width, height, array_size, format)?,
        }))
    }

    fn create_texture_cube(&self, size: u32, format: TextureFormat) -> Result<Box<dyn TextureCube>> {
        self.check_alive("create_texture_cube")?;
        Ok(Box::new(MockTextureCube {
            image: MockImage::new(size, size, 6, format)?,
        }))
    }

    fn create_texture_cube_array(
        &self,
        size: u32,
        array_size: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn TextureCubeArray>> {
        self.check_alive("create_texture_cube_array")?;
        let layers = array_size.checked_mul(6).ok_or_else(|| {
            Error::InvalidResource(format!("cube array of {} cubes is too large", array_size))
        })?;
        Ok(Box::new(MockTextureCubeArray {
            image: MockImage::new(size, size, layers, format)?,
        }))
    }

    fn create_buffer(
        &self,
        size: u64,
        usage: BufferUsage,
        memory: MemoryProperty,
    ) -> Result<Box<dyn Buffer>> {
        self.check_alive("create_buffer")?;
        if size == 0 {
            return Err(Error::InvalidResource("buffer size must be non-zero".to_string()));
        }
        let len = usize::try_from(size)
            .map_err(|_| Error::InvalidResource(format!("buffer size {} too large", size)))?;
        Ok(Box::new(MockBuffer {
            size,
            usage,
            memory,
            data: Mutex::new(vec![0u8; len].into_boxed_slice()),
            mapped: AtomicBool::new(false),
        }))
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Box<dyn Sampler>> {
        self.check_alive("create_sampler")?;
        Ok(Box::new(MockSampler { desc: *desc }))
    }

    fn create_render_pass_3d(&self, desc: &RenderPassDesc) -> Result<Box<dyn RenderPass3D>> {
        self.check_alive("create_render_pass_3d")?;
        desc.validate()?;
        Ok(Box::new(MockRenderPass {
            id: NEXT_RENDER_PASS_ID.fetch_add(1, Ordering::Relaxed),
            desc: desc.clone(),
            stats: self.stats.clone(),
            recording: None,
        }))
    }

    fn create_framebuffer_3d(
        &self,
        render_pass: &dyn RenderPass3D,
        color_attachments: &[AttachmentView<'_>],
        depth_attachment: Option<AttachmentView<'_>>,
    ) -> Result<Box<dyn Framebuffer3D>> {
        self.check_alive("create_framebuffer_3d")?;
        let desc = render_pass.desc();
        let (width, height) =
            validate_framebuffer_attachments(desc, color_attachments, depth_attachment.as_ref())?;

        let to_attachment = |view: &AttachmentView<'_>| {
            mock_image(view.as_any())
                .map(|image| image.attachment(view.layer_index()))
                .ok_or_else(|| {
                    Error::InvalidResource(
                        "attachment was not created by the mock context".to_string(),
                    )
                })
        };
        let colors = color_attachments
            .iter()
            .map(to_attachment)
            .collect::<Result<Vec<_>>>()?;
        let depth = depth_attachment.as_ref().map(to_attachment).transpose()?;

        Ok(Box::new(MockFramebuffer {
            width,
            height,
            color_formats: desc.color_formats.clone(),
            depth_format: desc.depth_format,
            colors,
            depth,
        }))
    }

    fn create_pipeline_3d(
        &self,
        render_pass: &dyn RenderPass3D,
        desc: &PipelineDesc,
    ) -> Result<Box<dyn Pipeline3D>> {
        self.check_alive("create_pipeline_3d")?;
        desc.validate()?;
        for (stage, code) in [("vertex", &desc.vertex_spirv), ("fragment", &desc.fragment_spirv)] {
            if code.first() != Some(&SPIRV_MAGIC) {
                return Err(Error::ValidationFailed(format!(
                    "{} shader is not SPIR-V",
                    stage
                )));
            }
        }
        Ok(Box::new(MockPipeline {
            bindings: desc.bindings.clone(),
            color_attachment_count: render_pass.desc().color_formats.len() as u32,
        }))
    }

    fn create_descriptor_set(
        &self,
        pipeline: &dyn Pipeline3D,
        pool_sizes: &[DescriptorPoolSize],
    ) -> Result<Box<dyn DescriptorSet>> {
        self.check_alive("create_descriptor_set")?;
        let writes = DescriptorWrites::new(pipeline.bindings());
        writes.check_pool(&DescriptorPoolSize::resolve(pool_sizes, pipeline.bindings()))?;
        Ok(Box::new(MockDescriptorSet { writes }))
    }

    fn wait_idle(&self) -> Result<()> {
        self.check_alive("wait_idle")?;
        self.wait_idle_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.dispose_count.fetch_add(1, Ordering::Relaxed);
        crate::gfx_debug!(SOURCE, "Mock context disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

// ============================================================================
// FACTORY BACKEND
// ============================================================================

/// Call counters shared between a `MockBackend` and the test observing it
#[derive(Debug, Clone, Default)]
pub struct MockBackendCalls {
    initialize: Arc<AtomicU32>,
    create: Arc<AtomicU32>,
    release: Arc<AtomicU32>,
}

impl MockBackendCalls {
    pub fn initialize_count(&self) -> u32 {
        self.initialize.load(Ordering::Relaxed)
    }

    pub fn create_count(&self) -> u32 {
        self.create.load(Ordering::Relaxed)
    }

    /// Releases of an initialized instance
    pub fn release_count(&self) -> u32 {
        self.release.load(Ordering::Relaxed)
    }
}

/// Scripted `ContextBackend` producing `MockGraphicsContext`s
pub struct MockBackend {
    gpus: Vec<GraphicsDeviceInfo>,
    fail_initialize: bool,
    fail_create: bool,
    initialized: bool,
    calls: MockBackendCalls,
}

impl MockBackend {
    pub fn new(gpus: Vec<GraphicsDeviceInfo>) -> Self {
        Self {
            gpus,
            fail_initialize: false,
            fail_create: false,
            initialized: false,
            calls: MockBackendCalls::default(),
        }
    }

    /// An integrated GPU (index 0) and a discrete GPU (index 1)
    pub fn with_default_gpus() -> Self {
        Self::new(vec![
            mock_device(0, "Mock Integrated GPU", GpuDeviceType::IntegratedGpu),
            mock_device(1, "Mock Discrete GPU", GpuDeviceType::DiscreteGpu),
        ])
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn calls(&self) -> MockBackendCalls {
        self.calls.clone()
    }
}

impl ContextBackend for MockBackend {
    fn initialize(&mut self) -> Result<Vec<GraphicsDeviceInfo>> {
        self.calls.initialize.fetch_add(1, Ordering::Relaxed);
        if self.fail_initialize {
            return Err(Error::InitializationFailed(
                "mock instance creation failed".to_string(),
            ));
        }
        self.initialized = true;
        Ok(self.gpus.clone())
    }

    fn create_context(
        &mut self,
        gpu: Option<&GraphicsDeviceInfo>,
    ) -> Result<Arc<dyn GraphicsContext>> {
        self.calls.create.fetch_add(1, Ordering::Relaxed);
        if !self.initialized {
            return Err(Error::InvalidOperation(
                "create_context before initialize".to_string(),
            ));
        }
        if self.fail_create {
            return Err(Error::InitializationFailed(
                "mock device creation failed".to_string(),
            ));
        }
        let selected = gpu
            .or_else(|| select_best_gpu(&self.gpus))
            .cloned()
            .ok_or_else(|| Error::InitializationFailed("no GPU available".to_string()))?;
        Ok(Arc::new(MockGraphicsContext::with_gpus(self.gpus.clone(), selected)))
    }

    fn release(&mut self) {
        if self.initialized {
            self.initialized = false;
            self.calls.release.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;
