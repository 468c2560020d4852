/// MetalContext - system Metal device, one command queue and the Skia
/// Metal `DirectContext`, all bound to the render thread

use gfx_context::gfx::{Error, Result, TextureFormat, ThreadBound};
use gfx_context::{gfx_debug, gfx_error, gfx_info, gfx_warn};
use metal::foreign_types::ForeignType;
use objc::rc::autoreleasepool;
use skia_safe::gpu::{self, mtl, DirectContext, SurfaceOrigin};
use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

const SOURCE: &str = "gfx::metal";

/// Same GPU as seen by MoltenVK and by Metal
pub fn same_gpu_name(vulkan_name: &str, metal_name: &str) -> bool {
    vulkan_name.trim().eq_ignore_ascii_case(metal_name.trim())
}

pub struct MetalContext {
    device: ThreadBound<metal::Device>,
    queue: ThreadBound<metal::CommandQueue>,
    skia: Mutex<Option<ThreadBound<DirectContext>>>,
    /// Raw `id<MTLDevice>`, for identity checks only
    device_id: usize,
    device_name: String,
    disposed: AtomicBool,
}

impl MetalContext {
    pub fn new() -> Result<Self> {
        let device = metal::Device::system_default().ok_or_else(|| {
            gfx_error!(SOURCE, "MTLCreateSystemDefaultDevice returned nil");
            Error::NullHandle("no system default Metal device".to_string())
        })?;
        let queue = device.new_command_queue();
        let device_name = device.name().to_string();

        let context = unsafe {
            let backend = mtl::BackendContext::new(
                device.as_ptr() as mtl::Handle,
                queue.as_ptr() as mtl::Handle,
            );
            gpu::direct_contexts::make_metal(&backend, None)
        }
        .ok_or_else(|| {
            gfx_error!(SOURCE, "Failed to create the Skia Metal context");
            Error::InitializationFailed("Skia Metal context creation failed".to_string())
        })?;

        gfx_info!(SOURCE, "Metal device: {}", device_name);

        Ok(Self {
            device_id: device.as_ptr() as usize,
            device: ThreadBound::new(device),
            queue: ThreadBound::new(queue),
            skia: Mutex::new(Some(ThreadBound::new(context))),
            device_name,
            disposed: AtomicBool::new(false),
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn device_id(&self) -> usize {
        self.device_id
    }

    pub fn device(&self) -> Result<&metal::Device> {
        self.check_alive("device")?;
        self.device.get()
    }

    fn check_alive(&self, operation: &str) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(Error::ObjectDisposed(format!(
                "{} called on a disposed Metal context",
                operation
            )));
        }
        Ok(())
    }

    fn lock_skia(&self) -> Result<MutexGuard<'_, Option<ThreadBound<DirectContext>>>> {
        self.skia
            .lock()
            .map_err(|_| Error::BackendError("Skia context lock poisoned".to_string()))
    }

    pub fn direct_context(&self) -> Result<DirectContext> {
        self.check_alive("skia_context")?;
        let guard = self.lock_skia()?;
        let bound = guard
            .as_ref()
            .ok_or_else(|| Error::ObjectDisposed("Skia context has been released".to_string()))?;
        Ok(bound.get()?.clone())
    }

    /// Commit an empty command buffer and block until it completes
    pub fn wait_idle(&self) -> Result<()> {
        self.check_alive("wait_idle")?;
        self.drain_queue()
    }

    fn drain_queue(&self) -> Result<()> {
        let queue = self.queue.get()?;
        autoreleasepool(|| {
            let command_buffer = queue.new_command_buffer();
            command_buffer.commit();
            command_buffer.wait_until_completed();
        });
        Ok(())
    }

    /// Wrap an `id<MTLTexture>` as a Skia surface
    pub fn wrap_texture(
        &self,
        texture: *mut c_void,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<skia_safe::Surface> {
        if texture.is_null() {
            return Err(Error::NullHandle("Metal texture is nil".to_string()));
        }
        let color_type = format.to_skia_color_type().ok_or_else(|| {
            Error::InvalidOperation(format!("{:?} has no Skia color type", format))
        })?;
        let mut context = self.direct_context()?;

        let backend_texture = unsafe {
            let info = mtl::TextureInfo::new(texture as mtl::Handle);
            gpu::backend_textures::make_mtl(
                (width as i32, height as i32),
                gpu::Mipmapped::No,
                &info,
                "shared texture",
            )
        };

        gpu::surfaces::wrap_backend_texture(
            &mut context,
            &backend_texture,
            SurfaceOrigin::TopLeft,
            None,
            color_type,
            None,
            None,
        )
        .ok_or_else(|| {
            gfx_error!(SOURCE, "Skia refused to wrap a {}x{} {:?} Metal texture", width, height, format);
            Error::BackendError("Skia surface creation failed".to_string())
        })
    }

    /// Wait, flush Skia and drop it; later calls fail with ObjectDisposed
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.drain_queue() {
            gfx_warn!(SOURCE, "wait_idle failed during dispose: {}", e);
        }

        match self.lock_skia() {
            Ok(mut guard) => {
                if let Some(mut bound) = guard.take() {
                    if let Ok(context) = bound.get_mut() {
                        context.flush_and_submit();
                    }
                }
            }
            Err(e) => gfx_warn!(SOURCE, "Skia context not released: {}", e),
        }
        gfx_debug!(SOURCE, "Metal context disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Drop for MetalContext {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
#[path = "metal_context_tests.rs"]
mod tests;
