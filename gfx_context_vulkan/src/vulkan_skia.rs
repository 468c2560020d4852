//! Skia Vulkan bridge
//!
//! Builds a Skia `DirectContext` on the context's device and queue and wraps
//! Vulkan images as Skia surfaces. The `DirectContext` is bound to the thread
//! that created it and is dropped by `release`, before the device goes away.

use crate::vulkan_device::VulkanDevice;
use crate::vulkan_format::to_skia_vk_format;
use ash::vk::{self, Handle};
use gfx_context::gfx::{Error, Result, TextureFormat, ThreadBound};
use gfx_context::{gfx_debug, gfx_error, gfx_info, gfx_warn};
use skia_safe::gpu::{self, vk as skia_vk, DirectContext, SurfaceOrigin};
use std::ffi::{c_void, CStr};
use std::sync::{Mutex, MutexGuard};

const SOURCE: &str = "gfx::vulkan::skia";

/// Which lookup resolved a Vulkan entry point for Skia
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcLookup {
    Device,
    Instance,
    Global,
}

/// Try each lookup in turn; the first non-null function wins
///
/// Device-level entry points only resolve once a device exists, so the
/// device is asked first, then the instance, then the loader itself.
pub fn resolve_proc<F>(lookups: &[ProcLookup], mut lookup: F) -> Option<(ProcLookup, *const c_void)>
where
    F: FnMut(ProcLookup) -> vk::PFN_vkVoidFunction,
{
    lookups
        .iter()
        .find_map(|&kind| lookup(kind).map(|f| (kind, f as *const c_void)))
}

/// Lookup order for an entry point Skia asks for
pub fn lookup_order(device_level: bool) -> &'static [ProcLookup] {
    if device_level {
        &[ProcLookup::Device, ProcLookup::Instance, ProcLookup::Global]
    } else {
        &[ProcLookup::Instance, ProcLookup::Global]
    }
}

pub struct SkiaBridge {
    context: Mutex<Option<ThreadBound<DirectContext>>>,
    queue_family: u32,
}

impl SkiaBridge {
    /// Create the Skia context on the calling (render) thread
    pub fn new(device: &VulkanDevice) -> Result<Self> {
        let entry = device.instance().entry();
        let instance = device.instance().handle();
        let raw_instance = instance.handle();
        let raw_device = device.handle().handle();

        let get_proc = |of: skia_vk::GetProcOf| -> *const c_void {
            let (device_level, name) = match of {
                skia_vk::GetProcOf::Instance(_, name) => (false, name),
                skia_vk::GetProcOf::Device(_, name) => (true, name),
            };
            let resolved = resolve_proc(lookup_order(device_level), |kind| unsafe {
                match kind {
                    ProcLookup::Device => instance.get_device_proc_addr(raw_device, name),
                    ProcLookup::Instance => entry.get_instance_proc_addr(raw_instance, name),
                    ProcLookup::Global => entry.get_instance_proc_addr(vk::Instance::null(), name),
                }
            });
            match resolved {
                Some((_, f)) => f,
                None => {
                    let name = unsafe { CStr::from_ptr(name) };
                    gfx_warn!(SOURCE, "Skia could not resolve {}", name.to_string_lossy());
                    std::ptr::null()
                }
            }
        };

        let context = unsafe {
            let backend = skia_vk::BackendContext::new(
                raw_instance.as_raw() as _,
                device.physical_device().as_raw() as _,
                raw_device.as_raw() as _,
                (device.queue().as_raw() as _, device.queue_family() as usize),
                &get_proc,
            );
            gpu::direct_contexts::make_vulkan(&backend, None)
        }
        .ok_or_else(|| {
            gfx_error!(SOURCE, "Failed to create the Skia Vulkan context");
            Error::InitializationFailed("Skia Vulkan context creation failed".to_string())
        })?;

        gfx_info!(SOURCE, "Skia Vulkan context created");
        Ok(Self {
            context: Mutex::new(Some(ThreadBound::new(context))),
            queue_family: device.queue_family(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<ThreadBound<DirectContext>>>> {
        self.context
            .lock()
            .map_err(|_| Error::BackendError("Skia context lock poisoned".to_string()))
    }

    /// Shared handle to the Skia context; render thread only
    pub fn direct_context(&self) -> Result<DirectContext> {
        let guard = self.lock()?;
        let bound = guard
            .as_ref()
            .ok_or_else(|| Error::ObjectDisposed("Skia context has been released".to_string()))?;
        Ok(bound.get()?.clone())
    }

    /// Flush and drop the Skia context; later calls fail with ObjectDisposed
    pub fn release(&self) {
        let Ok(mut guard) = self.lock() else {
            return;
        };
        if let Some(mut bound) = guard.take() {
            if let Ok(context) = bound.get_mut() {
                context.flush_and_submit();
            }
            drop(bound);
            gfx_debug!(SOURCE, "Skia Vulkan context released");
        }
    }

    /// Wrap `image` (in COLOR_ATTACHMENT_OPTIMAL) as a Skia surface
    pub fn wrap_render_target(
        &self,
        image: vk::Image,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<skia_safe::Surface> {
        let color_type = format.to_skia_color_type().ok_or_else(|| {
            Error::InvalidOperation(format!("{:?} has no Skia color type", format))
        })?;
        let mut context = self.direct_context()?;

        let image_info = unsafe {
            skia_vk::ImageInfo::new(
                image.as_raw() as _,
                skia_vk::Alloc::default(),
                skia_vk::ImageTiling::OPTIMAL,
                skia_vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                to_skia_vk_format(format),
                1,
                Some(self.queue_family),
                None,
                None,
                None,
            )
        };
        let render_target =
            gpu::backend_render_targets::make_vk((width as i32, height as i32), &image_info);

        gpu::surfaces::wrap_backend_render_target(
            &mut context,
            &render_target,
            SurfaceOrigin::TopLeft,
            color_type,
            None,
            None,
        )
        .ok_or_else(|| {
            gfx_error!(SOURCE, "Skia refused to wrap a {}x{} {:?} image", width, height, format);
            Error::BackendError("Skia surface creation failed".to_string())
        })
    }
}

impl Drop for SkiaBridge {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[path = "vulkan_skia_tests.rs"]
mod tests;
