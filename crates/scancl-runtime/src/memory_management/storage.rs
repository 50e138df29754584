use core::ptr::NonNull;
use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::sync::Arc;

use scancl_common::backtrace::BackTrace;

use super::{AllocationError, UsageCounters};

/// A single zeroed, aligned block of device memory.
///
/// The block is released when dropped; [handles](super::Handle) share it through an [Arc].
pub struct Allocation {
    ptr: NonNull<u8>,
    layout: Layout,
    size: u64,
    usage: Arc<UsageCounters>,
}

// Access to the bytes is coordinated by the kernels and the stream ordering, the allocation
// itself is only a pointer and a layout.
unsafe impl Send for Allocation {}
unsafe impl Sync for Allocation {}

impl Allocation {
    pub(crate) fn new(
        size: u64,
        alignment: u64,
        usage: Arc<UsageCounters>,
    ) -> Result<Self, AllocationError> {
        let invalid_layout = || AllocationError::InvalidLayout {
            size,
            alignment,
            backtrace: BackTrace::capture(),
        };
        let padded = usize::try_from(size.max(1)).map_err(|_| invalid_layout())?;
        let align = usize::try_from(alignment).map_err(|_| invalid_layout())?;
        let layout = Layout::from_size_align(padded, align)
            .map_err(|_| invalid_layout())?
            .pad_to_align();

        // SAFETY: the layout has a non-zero size.
        let ptr = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or_else(|| AllocationError::OutOfMemory {
            requested: size,
            max: size,
            backtrace: BackTrace::capture(),
        })?;

        usage.register(size, layout.size() as u64);

        Ok(Self {
            ptr,
            layout,
            size,
            usage,
        })
    }

    /// Pointer to the first byte.
    pub fn ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Requested size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        self.usage.release(self.size, self.layout.size() as u64);
        // SAFETY: allocated in `new` with the same layout.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

impl core::fmt::Debug for Allocation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Allocation")
            .field("ptr", &self.ptr)
            .field("size", &self.size)
            .field("align", &self.layout.align())
            .finish()
    }
}
