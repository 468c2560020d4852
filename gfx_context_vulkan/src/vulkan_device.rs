//! Logical device on one physical GPU with a single graphics queue

use crate::vulkan_instance::{filter_extensions, VulkanInstance};
use crate::vulkan_result::VkResultExt;
use ash::vk;
use gfx_context::gfx::{Error, GraphicsDeviceInfo, Result};
use gfx_context::{gfx_debug, gfx_error, gfx_info, gfx_warn};
use rustc_hash::FxHashSet;
use std::ffi::CStr;
use std::sync::Arc;

const SOURCE: &str = "gfx::vulkan";

/// Device extensions requested on this platform
pub fn device_extension_wishlist() -> Vec<&'static CStr> {
    let mut wishlist = vec![ash::khr::swapchain::NAME];
    if cfg!(target_os = "macos") {
        wishlist.push(ash::khr::portability_subset::NAME);
        wishlist.push(ash::ext::metal_objects::NAME);
    }
    wishlist
}

/// Index of the first queue family supporting graphics
pub fn find_graphics_queue_family(families: &[vk::QueueFamilyProperties]) -> Option<u32> {
    families
        .iter()
        .enumerate()
        .find(|(_, qf)| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|(i, _)| i as u32)
}

pub struct VulkanDevice {
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    queue: vk::Queue,
    queue_family: u32,
    enabled_extensions: Vec<String>,
    info: GraphicsDeviceInfo,
    /// Declared last: the instance outlives the device
    instance: Arc<VulkanInstance>,
}

impl VulkanDevice {
    pub fn new(
        instance: Arc<VulkanInstance>,
        physical_device: vk::PhysicalDevice,
        info: GraphicsDeviceInfo,
    ) -> Result<Self> {
        let vk_instance = instance.handle();

        let families =
            unsafe { vk_instance.get_physical_device_queue_family_properties(physical_device) };
        let queue_family = find_graphics_queue_family(&families).ok_or_else(|| {
            gfx_error!(SOURCE, "No graphics queue family found on {}", info.name);
            Error::InvalidOperation("No graphics queue family found".to_string())
        })?;

        let available: FxHashSet<String> =
            unsafe { vk_instance.enumerate_device_extension_properties(physical_device) }
                .native(SOURCE, "vkEnumerateDeviceExtensionProperties")?
                .iter()
                .filter_map(|p| p.extension_name_as_c_str().ok())
                .map(|name| name.to_string_lossy().into_owned())
                .collect();
        let wishlist = device_extension_wishlist();
        let (enabled, missing) = filter_extensions(&wishlist, &available);
        for name in &missing {
            gfx_warn!(SOURCE, "Device extension {} not available, skipping", name.to_string_lossy());
        }

        let queue_priorities = [1.0];
        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_family)
            .queue_priorities(&queue_priorities)];
        let extension_ptrs: Vec<*const std::os::raw::c_char> =
            enabled.iter().map(|name| name.as_ptr()).collect();
        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_ptrs)
            .enabled_features(&features);

        let device = unsafe { vk_instance.create_device(physical_device, &create_info, None) }
            .map_err(|e| {
                gfx_error!(SOURCE, "Failed to create logical device: {:?}", e);
                Error::NativeCallFailed {
                    call: "vkCreateDevice".to_string(),
                    code: e.as_raw(),
                }
            })?;
        let queue = unsafe { device.get_device_queue(queue_family, 0) };

        gfx_info!(SOURCE, "Selected GPU: {} (queue family {})", info.name, queue_family);

        Ok(Self {
            device,
            physical_device,
            queue,
            queue_family,
            enabled_extensions: enabled
                .iter()
                .map(|name| name.to_string_lossy().into_owned())
                .collect(),
            info,
            instance,
        })
    }

    pub fn instance(&self) -> &Arc<VulkanInstance> {
        &self.instance
    }

    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    pub fn enabled_extensions(&self) -> &[String] {
        &self.enabled_extensions
    }

    pub fn has_extension(&self, name: &CStr) -> bool {
        let name = name.to_string_lossy();
        self.enabled_extensions.iter().any(|e| *e == name)
    }

    pub fn info(&self) -> &GraphicsDeviceInfo {
        &self.info
    }

    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }.native(SOURCE, "vkDeviceWaitIdle")
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();
            self.device.destroy_device(None);
        }
        gfx_debug!(SOURCE, "Vulkan device destroyed ({})", self.info.name);
    }
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
