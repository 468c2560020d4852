//! Vulkan instance with negotiated extensions and optional validation
//!
//! Extensions are requested from a per-platform wishlist intersected with
//! what the loader reports. Anything missing is logged and skipped.

use crate::vulkan_result::VkResultExt;
use ash::vk;
use gfx_context::gfx::{
    format_api_version, ContextConfig, Error, GpuDeviceType, GpuMemoryInfo, GraphicsDeviceInfo,
    Result,
};
use gfx_context::{gfx_debug, gfx_error, gfx_info, gfx_warn};
use rustc_hash::FxHashSet;
use std::ffi::{CStr, CString};

const SOURCE: &str = "gfx::vulkan";

pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Instance extensions requested on this platform
pub fn instance_extension_wishlist(validation: bool) -> Vec<&'static CStr> {
    let mut wishlist = vec![ash::khr::surface::NAME];

    if cfg!(target_os = "macos") {
        wishlist.extend([
            ash::khr::portability_enumeration::NAME,
            ash::khr::get_physical_device_properties2::NAME,
            ash::ext::metal_objects::NAME,
            ash::ext::metal_surface::NAME,
        ]);
    } else if cfg!(windows) {
        wishlist.push(ash::khr::win32_surface::NAME);
    } else if cfg!(target_os = "linux") {
        wishlist.extend([
            ash::khr::xlib_surface::NAME,
            ash::khr::xcb_surface::NAME,
            ash::khr::wayland_surface::NAME,
        ]);
    }

    if validation {
        wishlist.push(ash::ext::debug_utils::NAME);
    }
    wishlist
}

/// Split `wishlist` into (available, missing), keeping wishlist order
pub fn filter_extensions<'a>(
    wishlist: &[&'a CStr],
    available: &FxHashSet<String>,
) -> (Vec<&'a CStr>, Vec<&'a CStr>) {
    wishlist
        .iter()
        .copied()
        .partition(|name| available.contains(&*name.to_string_lossy()))
}

pub fn device_type_from_vk(device_type: vk::PhysicalDeviceType) -> GpuDeviceType {
    match device_type {
        vk::PhysicalDeviceType::INTEGRATED_GPU => GpuDeviceType::IntegratedGpu,
        vk::PhysicalDeviceType::DISCRETE_GPU => GpuDeviceType::DiscreteGpu,
        vk::PhysicalDeviceType::VIRTUAL_GPU => GpuDeviceType::VirtualGpu,
        vk::PhysicalDeviceType::CPU => GpuDeviceType::Cpu,
        _ => GpuDeviceType::Other,
    }
}

fn extension_names(properties: &[vk::ExtensionProperties]) -> FxHashSet<String> {
    properties
        .iter()
        .filter_map(|p| p.extension_name_as_c_str().ok())
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}

/// Whether validation can actually be turned on
#[cfg(feature = "vulkan-validation")]
fn resolve_validation(entry: &ash::Entry, config: &ContextConfig) -> bool {
    if !config.enable_validation {
        return false;
    }
    let layers = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
    let available = layers
        .iter()
        .filter_map(|layer| layer.layer_name_as_c_str().ok())
        .any(|name| name == VALIDATION_LAYER);
    if !available {
        gfx_warn!(
            SOURCE,
            "Validation layers requested but not available, continuing without them."
        );
    }
    available
}

#[cfg(not(feature = "vulkan-validation"))]
fn resolve_validation(_entry: &ash::Entry, config: &ContextConfig) -> bool {
    if config.enable_validation {
        gfx_warn!(
            SOURCE,
            "Validation requested but the vulkan-validation feature is not compiled in"
        );
    }
    false
}

type DebugMessenger = (ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT);

pub struct VulkanInstance {
    entry: ash::Entry,
    instance: ash::Instance,
    debug_messenger: Option<DebugMessenger>,
    enabled_extensions: Vec<String>,
    validation_enabled: bool,
}

impl VulkanInstance {
    /// Load the loader and create the instance
    ///
    /// Loader environment variables must already be in place
    /// (see `VulkanSetup::apply`).
    pub fn new(config: &ContextConfig) -> Result<Self> {
        let entry = unsafe { ash::Entry::load() }.map_err(|e| {
            gfx_error!(SOURCE, "Failed to load Vulkan library: {:?}", e);
            Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
        })?;

        let validation = resolve_validation(&entry, config);

        let available = unsafe { entry.enumerate_instance_extension_properties(None) }
            .native(SOURCE, "vkEnumerateInstanceExtensionProperties")?;
        let wishlist = instance_extension_wishlist(validation);
        let (enabled, missing) = filter_extensions(&wishlist, &extension_names(&available));
        for name in &missing {
            gfx_warn!(SOURCE, "Instance extension {} not available, skipping", name.to_string_lossy());
        }
        let debug_utils_enabled = enabled.contains(&ash::ext::debug_utils::NAME);

        let app_name = CString::new(config.app_name.as_str())
            .map_err(|_| Error::InitializationFailed("app_name contains a NUL byte".to_string()))?;
        let engine_name = CString::new(config.engine_name.as_str())
            .map_err(|_| Error::InitializationFailed("engine_name contains a NUL byte".to_string()))?;

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_2);

        let extension_ptrs: Vec<*const std::os::raw::c_char> =
            enabled.iter().map(|name| name.as_ptr()).collect();
        let layer_ptrs = if validation {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        let mut create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&extension_ptrs);
        if cfg!(target_os = "macos") && enabled.contains(&ash::khr::portability_enumeration::NAME) {
            create_info = create_info.flags(vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR);
        }

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .native(SOURCE, "vkCreateInstance")?;

        let debug_messenger = if validation && debug_utils_enabled {
            Self::create_debug_messenger(&entry, &instance, config)
        } else {
            None
        };

        gfx_info!(
            SOURCE,
            "Vulkan instance created ({} extensions, validation {})",
            enabled.len(),
            if validation { "on" } else { "off" }
        );

        Ok(Self {
            entry,
            instance,
            debug_messenger,
            enabled_extensions: enabled
                .iter()
                .map(|name| name.to_string_lossy().into_owned())
                .collect(),
            validation_enabled: validation,
        })
    }

    #[cfg(feature = "vulkan-validation")]
    fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
        config: &ContextConfig,
    ) -> Option<DebugMessenger> {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

        crate::debug::init_debug_config(crate::debug::DebugConfig {
            severity: config.validation_severity,
            enable_stats: config.enable_validation_stats,
        });

        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(crate::debug::severity_flags(config.validation_severity))
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

        match unsafe { debug_utils.create_debug_utils_messenger(&debug_info, None) } {
            Ok(messenger) => Some((debug_utils, messenger)),
            Err(e) => {
                gfx_warn!(SOURCE, "Failed to create debug messenger, continuing without it: {:?}", e);
                crate::debug::cleanup_debug_config();
                None
            }
        }
    }

    #[cfg(not(feature = "vulkan-validation"))]
    fn create_debug_messenger(
        _entry: &ash::Entry,
        _instance: &ash::Instance,
        _config: &ContextConfig,
    ) -> Option<DebugMessenger> {
        None
    }

    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    pub fn handle(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn enabled_extensions(&self) -> &[String] {
        &self.enabled_extensions
    }

    pub fn has_extension(&self, name: &CStr) -> bool {
        let name = name.to_string_lossy();
        self.enabled_extensions.iter().any(|e| *e == name)
    }

    pub fn validation_enabled(&self) -> bool {
        self.validation_enabled
    }

    /// All physical devices with their diagnostics, in driver order
    pub fn enumerate_gpus(&self) -> Result<Vec<(vk::PhysicalDevice, GraphicsDeviceInfo)>> {
        let devices = unsafe { self.instance.enumerate_physical_devices() }
            .native(SOURCE, "vkEnumeratePhysicalDevices")?;

        let gpus: Vec<_> = devices
            .into_iter()
            .enumerate()
            .map(|(index, device)| (device, self.describe(index, device)))
            .collect();

        for (_, info) in &gpus {
            gfx_info!(
                SOURCE,
                "Found GPU {}: {} ({}, Vulkan {})",
                info.index,
                info.name,
                info.device_type,
                info.api_version
            );
        }
        if gpus.is_empty() {
            gfx_error!(SOURCE, "No Vulkan-capable GPU found");
        }
        Ok(gpus)
    }

    fn describe(&self, index: usize, device: vk::PhysicalDevice) -> GraphicsDeviceInfo {
        let properties = unsafe { self.instance.get_physical_device_properties(device) };
        let memory = unsafe { self.instance.get_physical_device_memory_properties(device) };
        let heaps = &memory.memory_heaps[..memory.memory_heap_count as usize];

        GraphicsDeviceInfo {
            index,
            name: properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| format!("GPU {}", index)),
            device_type: device_type_from_vk(properties.device_type),
            vendor_id: properties.vendor_id,
            device_id: properties.device_id,
            api_version: format_api_version(properties.api_version),
            driver_version: properties.driver_version,
            memory: GpuMemoryInfo::from_heaps(heaps.iter().map(|heap| {
                (heap.size, heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            })),
        }
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some((debug_utils, messenger)) = self.debug_messenger.take() {
                crate::debug::cleanup_debug_config();
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        gfx_debug!(SOURCE, "Vulkan instance destroyed");
    }
}

#[cfg(test)]
#[path = "vulkan_instance_tests.rs"]
mod tests;
