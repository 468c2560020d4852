/// Buffer trait, usage/memory flags and the mapping guard

use crate::error::{Error, Result};
use bitflags::bitflags;
use std::any::Any;
use std::ptr::NonNull;

bitflags! {
    /// How a buffer is used by the GPU
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const UNIFORM = 1 << 2;
        const STORAGE = 1 << 3;
        const TRANSFER_SRC = 1 << 4;
        const TRANSFER_DST = 1 << 5;
    }
}

bitflags! {
    /// Memory properties requested for a buffer allocation
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryProperty: u32 {
        const DEVICE_LOCAL = 1 << 0;
        const HOST_VISIBLE = 1 << 1;
        const HOST_COHERENT = 1 << 2;
        const HOST_CACHED = 1 << 3;
        const LAZILY_ALLOCATED = 1 << 4;
    }
}

impl MemoryProperty {
    pub fn is_host_visible(&self) -> bool {
        self.contains(MemoryProperty::HOST_VISIBLE)
    }
}

/// Check that `offset..offset + len` fits in a buffer of `size` bytes
pub fn check_buffer_range(size: u64, offset: u64, len: u64) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::InvalidResource(format!(
            "range {}..{} exceeds buffer size {}",
            offset,
            offset.saturating_add(len),
            size
        ))),
    }
}

/// GPU buffer
///
/// Implemented by backend-specific buffer types. The buffer is destroyed
/// when dropped.
pub trait Buffer: Send + Sync {
    /// Size in bytes
    fn size(&self) -> u64;

    fn usage(&self) -> BufferUsage;

    fn memory_properties(&self) -> MemoryProperty;

    /// Write bytes at `offset`
    ///
    /// Host-visible buffers are written directly; device-local buffers go
    /// through a staging copy.
    fn upload(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Read `len` bytes starting at `offset`
    fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>>;

    /// Map the whole buffer; fails unless host-visible and not already mapped
    ///
    /// Prefer `<dyn Buffer>::map`, which unmaps on drop.
    fn map_raw(&self) -> Result<NonNull<u8>>;

    /// Release a mapping obtained by `map_raw`
    fn unmap(&self);

    fn is_mapped(&self) -> bool;

    fn as_any(&self) -> &dyn Any;
}

impl dyn Buffer + '_ {
    /// Map the buffer for CPU access until the returned guard is dropped
    pub fn map(&self) -> Result<BufferMapping<'_>> {
        let ptr = self.map_raw()?;
        Ok(BufferMapping {
            buffer: self,
            ptr,
            len: self.size() as usize,
        })
    }

    /// Upload a slice of plain-old-data values at `offset`
    pub fn upload_pod<T: bytemuck::Pod>(&self, offset: u64, values: &[T]) -> Result<()> {
        self.upload(offset, bytemuck::cast_slice(values))
    }
}

/// Live CPU mapping of a buffer; unmaps on drop
pub struct BufferMapping<'a> {
    buffer: &'a dyn Buffer,
    ptr: NonNull<u8>,
    len: usize,
}

impl BufferMapping<'_> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the backend guarantees `len` mapped bytes until unmap
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above; the guard is the only CPU view while mapped
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for BufferMapping<'_> {
    fn drop(&mut self) {
        self.buffer.unmap();
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
