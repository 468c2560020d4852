//! Graphics context factory
//!
//! Lazily creates and caches the one shared `GraphicsContext` of the
//! application, enumerates and selects physical GPUs, and tears everything
//! down on shutdown. The factory is an explicit service object: the
//! application creates it on the render thread and passes it (usually in an
//! `Arc`) to whoever needs the context. Every call verifies it runs on that
//! thread.
//!
//! ```text
//! Uninitialized -> VulkanInstanceReady -> ContextCreated -> Disposed
//!        \                 \                   |              |
//!         +-----------------+--> FailedToInitialize (absorbing)
//! ```
//!
//! After `Disposed` the next `get_or_create_shared` starts over, which is how
//! a GPU switch is performed (shutdown, select, create).

use crate::error::{Error, Result};
use crate::graphics::context::GraphicsContext;
use crate::graphics::gpu_info::GraphicsDeviceInfo;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

const SOURCE: &str = "gfx::factory";

/// Lifecycle state of the factory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactoryState {
    Uninitialized,
    VulkanInstanceReady,
    ContextCreated,
    Disposed,
    FailedToInitialize,
}

/// Native side of the factory: instance bring-up and context construction
pub trait ContextBackend: Send {
    /// Prepare the environment, create the instance and list the GPUs
    fn initialize(&mut self) -> Result<Vec<GraphicsDeviceInfo>>;

    /// Build the context on `gpu` (None: the backend picks the best GPU)
    fn create_context(
        &mut self,
        gpu: Option<&GraphicsDeviceInfo>,
    ) -> Result<Arc<dyn GraphicsContext>>;

    /// Destroy whatever `initialize` created
    fn release(&mut self);
}

struct FactoryInner {
    state: FactoryState,
    backend: Box<dyn ContextBackend>,
    gpus: Vec<GraphicsDeviceInfo>,
    selected: Option<GraphicsDeviceInfo>,
    shared: Option<Arc<dyn GraphicsContext>>,
    failure: Option<Error>,
}

impl FactoryInner {
    fn set_state(&mut self, state: FactoryState) {
        if self.state != state {
            crate::gfx_debug!(SOURCE, "{:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    fn fail(&mut self, error: Error) {
        crate::gfx_error!(SOURCE, "Graphics context initialization failed: {}", error);
        self.backend.release();
        self.shared = None;
        self.failure = Some(error);
        self.set_state(FactoryState::FailedToInitialize);
    }

    fn previous_failure(&self) -> Error {
        Error::InitializationFailed(match &self.failure {
            Some(e) => format!("previous initialization failed: {}", e),
            None => "previous initialization failed".to_string(),
        })
    }

    /// Bring the instance up if needed
    fn ensure_instance(&mut self) -> Result<()> {
        match self.state {
            FactoryState::VulkanInstanceReady | FactoryState::ContextCreated => Ok(()),
            FactoryState::FailedToInitialize => Err(self.previous_failure()),
            FactoryState::Uninitialized | FactoryState::Disposed => {
                match self.backend.initialize() {
                    Ok(gpus) => {
                        for gpu in &gpus {
                            crate::gfx_info!(
                                SOURCE,
                                "Found GPU {}: {} ({})",
                                gpu.index,
                                gpu.name,
                                gpu.device_type
                            );
                        }
                        self.gpus = gpus;
                        self.set_state(FactoryState::VulkanInstanceReady);
                        Ok(())
                    }
                    Err(e) => {
                        self.fail(e.clone());
                        Err(e)
                    }
                }
            }
        }
    }

    fn check_selectable(&mut self) -> Result<()> {
        if self.state == FactoryState::ContextCreated {
            return Err(Error::InvalidOperation(
                "GPU selection must happen before the shared context is created".to_string(),
            ));
        }
        self.ensure_instance()
    }
}

/// Owner of the application's shared graphics context
pub struct GraphicsContextFactory {
    owner: ThreadId,
    inner: Mutex<FactoryInner>,
}

impl GraphicsContextFactory {
    /// Create the factory; the calling thread becomes the render thread
    pub fn new(backend: impl ContextBackend + 'static) -> Self {
        Self {
            owner: thread::current().id(),
            inner: Mutex::new(FactoryInner {
                state: FactoryState::Uninitialized,
                backend: Box::new(backend),
                gpus: Vec::new(),
                selected: None,
                shared: None,
                failure: None,
            }),
        }
    }

    pub fn owner_thread(&self) -> ThreadId {
        self.owner
    }

    /// Fail with `WrongThread` unless called on the render thread
    pub fn verify_access(&self, operation: &str) -> Result<()> {
        let current = thread::current().id();
        if current != self.owner {
            crate::gfx_error!(
                SOURCE,
                "{} called from {:?}; the render thread is {:?}",
                operation,
                current,
                self.owner
            );
            return Err(Error::WrongThread(format!(
                "GraphicsContextFactory::{} must run on the render thread",
                operation
            )));
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, FactoryInner>> {
        self.inner
            .lock()
            .map_err(|_| Error::BackendError("graphics context factory lock poisoned".to_string()))
    }

    pub fn state(&self) -> FactoryState {
        self.lock()
            .map(|inner| inner.state)
            .unwrap_or(FactoryState::FailedToInitialize)
    }

    /// Error that put the factory into `FailedToInitialize`
    pub fn last_error(&self) -> Option<Error> {
        self.lock().ok().and_then(|inner| inner.failure.clone())
    }

    /// Enumerate physical GPUs, initializing the instance on first use
    pub fn available_gpus(&self) -> Result<Vec<GraphicsDeviceInfo>> {
        self.verify_access("available_gpus")?;
        let mut inner = self.lock()?;
        inner.ensure_instance()?;
        Ok(inner.gpus.clone())
    }

    /// Select a GPU by enumeration index (before the context exists)
    pub fn select_gpu(&self, index: usize) -> Result<()> {
        self.verify_access("select_gpu")?;
        let mut inner = self.lock()?;
        inner.check_selectable()?;

        let gpu = inner
            .gpus
            .iter()
            .find(|g| g.index == index)
            .cloned()
            .ok_or_else(|| {
                Error::InvalidResource(format!(
                    "no GPU with index {} ({} available)",
                    index,
                    inner.gpus.len()
                ))
            })?;
        crate::gfx_info!(SOURCE, "Selected GPU {}: {}", gpu.index, gpu.name);
        inner.selected = Some(gpu);
        Ok(())
    }

    /// Select a GPU by name: exact (case-insensitive) match first, then substring
    pub fn select_gpu_by_name(&self, name: &str) -> Result<()> {
        self.verify_access("select_gpu_by_name")?;
        let mut inner = self.lock()?;
        inner.check_selectable()?;

        let wanted = name.to_lowercase();
        let gpu = inner
            .gpus
            .iter()
            .find(|g| g.name.to_lowercase() == wanted)
            .or_else(|| inner.gpus.iter().find(|g| g.name.to_lowercase().contains(&wanted)))
            .cloned()
            .ok_or_else(|| {
                let names: Vec<&str> = inner.gpus.iter().map(|g| g.name.as_str()).collect();
                Error::InvalidResource(format!("no GPU named '{}' (available: {:?})", name, names))
            })?;
        crate::gfx_info!(SOURCE, "Selected GPU {}: {}", gpu.index, gpu.name);
        inner.selected = Some(gpu);
        Ok(())
    }

    /// GPU chosen by `select_gpu*`, or the one the shared context runs on
    pub fn selected_gpu(&self) -> Option<GraphicsDeviceInfo> {
        self.lock().ok().and_then(|inner| inner.selected.clone())
    }

    /// The shared context, creating it on first call
    ///
    /// Returns `Ok(None)` when creation fails; the failure is remembered and
    /// later calls return `Ok(None)` without retrying.
    pub fn get_or_create_shared(&self) -> Result<Option<Arc<dyn GraphicsContext>>> {
        self.verify_access("get_or_create_shared")?;
        let mut inner = self.lock()?;

        match inner.state {
            FactoryState::ContextCreated => return Ok(inner.shared.clone()),
            FactoryState::FailedToInitialize => return Ok(None),
            _ => {}
        }

        if inner.ensure_instance().is_err() {
            return Ok(None);
        }

        let selected = inner.selected.clone();
        match inner.backend.create_context(selected.as_ref()) {
            Ok(context) => {
                if inner.selected.is_none() {
                    inner.selected = context.gpu_info().selected_gpu.clone();
                }
                crate::gfx_info!(SOURCE, "Created shared {} graphics context", context.backend());
                inner.shared = Some(context.clone());
                inner.failure = None;
                inner.set_state(FactoryState::ContextCreated);
                Ok(Some(context))
            }
            Err(e) => {
                inner.fail(e);
                Ok(None)
            }
        }
    }

    /// The shared context if it exists, without creating it
    pub fn shared(&self) -> Option<Arc<dyn GraphicsContext>> {
        self.lock().ok().and_then(|inner| inner.shared.clone())
    }

    /// Wait for the GPU, dispose the shared context and release the instance
    ///
    /// Idempotent. Callers must have dropped every resource created from the
    /// context before calling this.
    pub fn shutdown(&self) -> Result<()> {
        self.verify_access("shutdown")?;
        let mut inner = self.lock()?;

        match inner.state {
            FactoryState::Uninitialized
            | FactoryState::Disposed
            | FactoryState::FailedToInitialize => return Ok(()),
            FactoryState::VulkanInstanceReady | FactoryState::ContextCreated => {}
        }

        if let Some(context) = inner.shared.take() {
            if let Err(e) = context.wait_idle() {
                crate::gfx_warn!(SOURCE, "wait_idle before shutdown failed: {}", e);
            }
            context.dispose();
            let holders = Arc::strong_count(&context) - 1;
            if holders > 0 {
                crate::gfx_warn!(
                    SOURCE,
                    "Shared context disposed while {} other reference(s) are alive",
                    holders
                );
            }
        }
        inner.backend.release();
        inner.gpus.clear();
        inner.set_state(FactoryState::Disposed);
        Ok(())
    }
}

impl Drop for GraphicsContextFactory {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            crate::gfx_error!(SOURCE, "Factory dropped without clean shutdown: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
