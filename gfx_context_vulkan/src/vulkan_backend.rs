/// NativeContextBackend - the factory's native side
///
/// `initialize` prepares the loader environment, creates the instance and
/// lists the GPUs; `create_context` builds a `VulkanContext`, or on macOS the
/// Metal + Vulkan `CompositeContext`.

use crate::vulkan_context::VulkanContext;
use crate::vulkan_instance::VulkanInstance;
use crate::vulkan_setup::VulkanSetup;
use ash::vk;
use gfx_context::gfx::{
    select_best_gpu, ContextBackend, ContextConfig, ContextKind, Error, GraphicsContext,
    GraphicsContextFactory, GraphicsDeviceInfo, Result,
};
use gfx_context::{gfx_debug, gfx_info};
use std::sync::Arc;

const SOURCE: &str = "gfx::vulkan::backend";

/// Concrete context a `ContextKind` resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedKind {
    Vulkan,
    Composite,
}

/// Resolve `kind` for the target platform
pub fn resolve_context_kind(kind: ContextKind, macos: bool) -> Result<ResolvedKind> {
    match (kind, macos) {
        (ContextKind::Auto, true) | (ContextKind::Composite, true) => Ok(ResolvedKind::Composite),
        (ContextKind::Auto, false) | (ContextKind::Vulkan, _) => Ok(ResolvedKind::Vulkan),
        (ContextKind::Composite, false) => Err(Error::UnsupportedPlatform(
            "the composite Metal + Vulkan context is only available on macOS".to_string(),
        )),
    }
}

/// The enumerated device matching `requested`, or the best one
pub fn pick_gpu<'a, T>(
    gpus: &'a [(T, GraphicsDeviceInfo)],
    requested: Option<&GraphicsDeviceInfo>,
) -> Result<&'a (T, GraphicsDeviceInfo)> {
    let infos: Vec<GraphicsDeviceInfo> = gpus.iter().map(|(_, info)| info.clone()).collect();
    let wanted = match requested {
        Some(gpu) => gpu.clone(),
        None => select_best_gpu(&infos)
            .cloned()
            .ok_or_else(|| Error::InitializationFailed("no Vulkan-capable GPU found".to_string()))?,
    };
    gpus.iter()
        .find(|(_, info)| info.index == wanted.index && info.name == wanted.name)
        .ok_or_else(|| {
            Error::InvalidResource(format!(
                "GPU {} ({}) is not in the enumerated device list",
                wanted.index, wanted.name
            ))
        })
}

pub struct NativeContextBackend {
    config: ContextConfig,
    instance: Option<Arc<VulkanInstance>>,
    gpus: Vec<(vk::PhysicalDevice, GraphicsDeviceInfo)>,
}

impl NativeContextBackend {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config,
            instance: None,
            gpus: Vec::new(),
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }
}

impl ContextBackend for NativeContextBackend {
    fn initialize(&mut self) -> Result<Vec<GraphicsDeviceInfo>> {
        if self.instance.is_none() {
            VulkanSetup::from_config(&self.config).apply();
            let instance = Arc::new(VulkanInstance::new(&self.config)?);
            self.gpus = instance.enumerate_gpus()?;
            self.instance = Some(instance);
        }
        Ok(self.gpus.iter().map(|(_, info)| info.clone()).collect())
    }

    fn create_context(
        &mut self,
        gpu: Option<&GraphicsDeviceInfo>,
    ) -> Result<Arc<dyn GraphicsContext>> {
        let instance = self.instance.clone().ok_or_else(|| {
            Error::InvalidOperation("create_context called before initialize".to_string())
        })?;
        let kind = resolve_context_kind(self.config.context_kind, cfg!(target_os = "macos"))?;
        let (physical_device, selected) = pick_gpu(&self.gpus, gpu)?.clone();
        let available: Vec<GraphicsDeviceInfo> =
            self.gpus.iter().map(|(_, info)| info.clone()).collect();

        gfx_info!(SOURCE, "Creating {:?} context on {}", kind, selected.name);

        let context: Arc<dyn GraphicsContext> = match kind {
            ResolvedKind::Vulkan => Arc::new(VulkanContext::new(
                instance,
                physical_device,
                selected,
                available,
            )?),
            #[cfg(target_os = "macos")]
            ResolvedKind::Composite => Arc::new(crate::metal::CompositeContext::new(
                instance,
                physical_device,
                selected,
                available,
            )?),
            #[cfg(not(target_os = "macos"))]
            ResolvedKind::Composite => {
                return Err(Error::UnsupportedPlatform(
                    "the composite Metal + Vulkan context is only available on macOS".to_string(),
                ))
            }
        };
        Ok(context)
    }

    fn release(&mut self) {
        self.gpus.clear();
        if self.instance.take().is_some() {
            gfx_debug!(SOURCE, "Vulkan instance released");
        }
    }
}

/// Factory driving the native backend; call on the render thread
pub fn create_factory(config: ContextConfig) -> GraphicsContextFactory {
    GraphicsContextFactory::new(NativeContextBackend::new(config))
}

#[cfg(test)]
#[path = "vulkan_backend_tests.rs"]
mod tests;
