//! Single-thread affinity for native objects
//!
//! Skia GPU contexts and Metal objects must be created, used and destroyed on
//! the render thread. `ThreadBound` records the creating thread and rejects
//! access from any other thread at runtime.

use crate::error::{Error, Result};
use std::mem::ManuallyDrop;
use std::thread::{self, ThreadId};

/// A value that may only be touched on the thread that created it
pub struct ThreadBound<T> {
    owner: ThreadId,
    value: ManuallyDrop<T>,
}

// SAFETY: the wrapped value is only reachable through `get`/`get_mut`, which
// check the owning thread, and it is only dropped on the owning thread.
unsafe impl<T> Send for ThreadBound<T> {}
unsafe impl<T> Sync for ThreadBound<T> {}

impl<T> ThreadBound<T> {
    /// Bind `value` to the current thread
    pub fn new(value: T) -> Self {
        Self {
            owner: thread::current().id(),
            value: ManuallyDrop::new(value),
        }
    }

    /// Thread that owns the value
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// True when called from the owning thread
    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Check the calling thread without touching the value
    pub fn verify_access(&self, operation: &str) -> Result<()> {
        if self.is_owner_thread() {
            Ok(())
        } else {
            Err(Error::WrongThread(format!(
                "{} called from {:?}, owned by {:?}",
                operation,
                thread::current().id(),
                self.owner
            )))
        }
    }

    pub fn get(&self) -> Result<&T> {
        self.verify_access("ThreadBound::get")?;
        Ok(&self.value)
    }

    pub fn get_mut(&mut self) -> Result<&mut T> {
        self.verify_access("ThreadBound::get_mut")?;
        Ok(&mut self.value)
    }
}

impl<T> Drop for ThreadBound<T> {
    fn drop(&mut self) {
        if self.is_owner_thread() {
            // SAFETY: dropped exactly once, on the owning thread
            unsafe { ManuallyDrop::drop(&mut self.value) };
        } else {
            crate::gfx_error!(
                "gfx::thread",
                "{} dropped on {:?} but owned by {:?}; leaking it",
                std::any::type_name::<T>(),
                thread::current().id(),
                self.owner
            );
        }
    }
}

#[cfg(test)]
#[path = "thread_bound_tests.rs"]
mod tests;
