use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::Allocation;

#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash)]
/// An handle that points to memory.
pub struct HandleId {
    value: u64,
}

static HANDLE_COUNT: AtomicU64 = AtomicU64::new(0);

impl HandleId {
    fn new() -> Self {
        let value = HANDLE_COUNT.fetch_add(1, Ordering::Relaxed);
        Self { value }
    }
}

/// Handle to a region of device memory.
///
/// Cloning a handle shares the underlying allocation, which is freed once every clone is dropped.
/// Offsets narrow the visible region without copying.
#[derive(Clone)]
pub struct Handle {
    id: HandleId,
    memory: Arc<Allocation>,
    /// Memory offset in bytes.
    offset_start: u64,
    /// Length of the visible region in bytes.
    size: u64,
}

impl core::fmt::Debug for Handle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("offset_start", &self.offset_start)
            .field("size", &self.size)
            .finish()
    }
}

impl Handle {
    pub(crate) fn new(memory: Arc<Allocation>) -> Self {
        Self {
            id: HandleId::new(),
            size: memory.size(),
            memory,
            offset_start: 0,
        }
    }

    /// The identifier of the underlying allocation.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Size of the visible region in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Offset of the visible region from the start of the allocation, in bytes.
    pub fn offset(&self) -> u64 {
        self.offset_start
    }

    /// Skip the first `offset` bytes of the visible region.
    ///
    /// The offset saturates at the end of the region.
    pub fn offset_start(mut self, offset: u64) -> Self {
        let offset = offset.min(self.size);
        self.offset_start += offset;
        self.size -= offset;
        self
    }

    /// Pointer to the first visible byte.
    pub fn as_ptr(&self) -> *mut u8 {
        // SAFETY: `offset_start` never exceeds the allocation size.
        unsafe { self.memory.ptr().add(self.offset_start as usize) }
    }

    /// Copies the visible bytes.
    ///
    /// # Safety
    ///
    /// No kernel may be writing the region concurrently.
    pub(crate) unsafe fn read_bytes(&self) -> Vec<u8> {
        unsafe { core::slice::from_raw_parts(self.as_ptr(), self.size as usize).to_vec() }
    }

    /// Overwrites the start of the visible region with `data`.
    ///
    /// # Safety
    ///
    /// No kernel may be accessing the region concurrently.
    pub(crate) unsafe fn write_bytes(&self, data: &[u8]) {
        let len = data.len().min(self.size as usize);
        unsafe { core::ptr::copy_nonoverlapping(data.as_ptr(), self.as_ptr(), len) }
    }
}
