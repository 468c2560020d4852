/// GPU diagnostics snapshot, serialized to JSON once per context creation

use crate::error::{Error, Result};
use crate::graphics::context::GraphicsBackend;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpuDeviceType {
    #[serde(rename = "Integrated GPU")]
    IntegratedGpu,
    #[serde(rename = "Discrete GPU")]
    DiscreteGpu,
    #[serde(rename = "Virtual GPU")]
    VirtualGpu,
    #[serde(rename = "CPU")]
    Cpu,
    #[serde(rename = "Other")]
    Other,
}

impl fmt::Display for GpuDeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GpuDeviceType::IntegratedGpu => "Integrated GPU",
            GpuDeviceType::DiscreteGpu => "Discrete GPU",
            GpuDeviceType::VirtualGpu => "Virtual GPU",
            GpuDeviceType::Cpu => "CPU",
            GpuDeviceType::Other => "Other",
        };
        f.write_str(name)
    }
}

/// Heap totals of one physical device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuMemoryInfo {
    /// Sum of heaps flagged device-local
    pub device_local_bytes: u64,
    /// Sum of all other heaps
    pub host_visible_bytes: u64,
}

impl GpuMemoryInfo {
    /// Fold `(size, is_device_local)` heap entries
    pub fn from_heaps(heaps: impl IntoIterator<Item = (u64, bool)>) -> Self {
        heaps
            .into_iter()
            .fold(GpuMemoryInfo::default(), |mut info, (size, device_local)| {
                if device_local {
                    info.device_local_bytes += size;
                } else {
                    info.host_visible_bytes += size;
                }
                info
            })
    }
}

/// One physical device as reported by the driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphicsDeviceInfo {
    /// Enumeration index
    pub index: usize,
    pub name: String,
    pub device_type: GpuDeviceType,
    pub vendor_id: u32,
    pub device_id: u32,
    /// "major.minor.patch"
    pub api_version: String,
    pub driver_version: u32,
    pub memory: GpuMemoryInfo,
}

impl GraphicsDeviceInfo {
    /// Apple GPU reached through MoltenVK
    pub fn is_molten_vk(&self) -> bool {
        self.name.contains("Apple")
    }
}

/// Read-only snapshot captured when a context is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub backend: GraphicsBackend,
    pub available_gpus: Vec<GraphicsDeviceInfo>,
    pub selected_gpu: Option<GraphicsDeviceInfo>,
    /// Enabled instance and device extensions
    pub extensions: Vec<String>,
    pub api_version: String,
    pub memory: GpuMemoryInfo,
}

impl GpuInfo {
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::BackendError(format!("GpuInfo serialization failed: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidResource(format!("GpuInfo parse failed: {}", e)))
    }
}

/// Decode a packed Vulkan API version
pub fn format_api_version(version: u32) -> String {
    format!(
        "{}.{}.{}",
        version >> 22,
        (version >> 12) & 0x3FF,
        version & 0xFFF
    )
}

/// First discrete GPU, else first integrated GPU, else the first device
pub fn select_best_gpu(gpus: &[GraphicsDeviceInfo]) -> Option<&GraphicsDeviceInfo> {
    gpus.iter()
        .find(|g| g.device_type == GpuDeviceType::DiscreteGpu)
        .or_else(|| gpus.iter().find(|g| g.device_type == GpuDeviceType::IntegratedGpu))
        .or_else(|| gpus.first())
}

#[cfg(test)]
#[path = "gpu_info_tests.rs"]
mod tests;
