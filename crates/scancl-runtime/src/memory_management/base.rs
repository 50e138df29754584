use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use scancl_common::backtrace::BackTrace;
use thiserror::Error;

use super::{Allocation, Handle};

/// Properties of the device memory.
#[derive(Debug, Clone)]
pub struct MemoryDeviceProperties {
    /// The largest single allocation the device accepts, in bytes.
    pub max_allocation_size: u64,
    /// Alignment of every allocation, in bytes. Must be a power of two.
    pub alignment: u64,
}

impl Default for MemoryDeviceProperties {
    fn default() -> Self {
        Self {
            max_allocation_size: 1 << 32,
            alignment: 256,
        }
    }
}

/// Errors raised by the device allocator.
#[derive(Error, Clone)]
pub enum AllocationError {
    /// The requested size can't be served by the device.
    #[error(
        "Out of memory.\nRequested {requested} bytes, maximum allocation is {max} bytes.\nBacktrace\n{backtrace}"
    )]
    OutOfMemory {
        /// Requested size in bytes.
        requested: u64,
        /// Maximum size of one allocation.
        max: u64,
        /// The backtrace for this error.
        backtrace: BackTrace,
    },
    /// The size/alignment pair doesn't form a valid layout.
    #[error("Invalid allocation layout of {size} bytes aligned to {alignment}.\nBacktrace\n{backtrace}")]
    InvalidLayout {
        /// Requested size in bytes.
        size: u64,
        /// Requested alignment in bytes.
        alignment: u64,
        /// The backtrace for this error.
        backtrace: BackTrace,
    },
}

impl core::fmt::Debug for AllocationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{self}"))
    }
}

/// Amount of memory in use by the device allocator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    /// The number of live allocations.
    pub number_allocs: u64,
    /// The number of bytes requested by live allocations.
    pub bytes_in_use: u64,
    /// The number of bytes reserved, including alignment padding.
    pub bytes_reserved: u64,
}

impl core::fmt::Display for MemoryUsage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Memory Usage Report:")?;
        writeln!(f, "  Number of allocations: {}", self.number_allocs)?;
        writeln!(f, "  Bytes in use: {}", self.bytes_in_use)?;
        write!(f, "  Bytes reserved: {}", self.bytes_reserved)
    }
}

#[derive(Debug, Default)]
pub(crate) struct UsageCounters {
    number_allocs: AtomicU64,
    bytes_in_use: AtomicU64,
    bytes_reserved: AtomicU64,
}

impl UsageCounters {
    pub(crate) fn register(&self, size: u64, reserved: u64) {
        self.number_allocs.fetch_add(1, Ordering::Relaxed);
        self.bytes_in_use.fetch_add(size, Ordering::Relaxed);
        self.bytes_reserved.fetch_add(reserved, Ordering::Relaxed);
    }

    pub(crate) fn release(&self, size: u64, reserved: u64) {
        self.number_allocs.fetch_sub(1, Ordering::Relaxed);
        self.bytes_in_use.fetch_sub(size, Ordering::Relaxed);
        self.bytes_reserved.fetch_sub(reserved, Ordering::Relaxed);
    }

    fn snapshot(&self) -> MemoryUsage {
        MemoryUsage {
            number_allocs: self.number_allocs.load(Ordering::Relaxed),
            bytes_in_use: self.bytes_in_use.load(Ordering::Relaxed),
            bytes_reserved: self.bytes_reserved.load(Ordering::Relaxed),
        }
    }
}

/// Device allocator.
///
/// Every allocation is zeroed, aligned to [MemoryDeviceProperties::alignment] and released when
/// the last [handle](Handle) pointing to it is dropped, including handles captured by kernels
/// still waiting in a stream.
#[derive(Debug)]
pub struct MemoryManagement {
    properties: MemoryDeviceProperties,
    usage: Arc<UsageCounters>,
}

impl MemoryManagement {
    /// Creates a new allocator for a device with the given memory properties.
    pub fn new(properties: MemoryDeviceProperties) -> Self {
        Self {
            properties,
            usage: Arc::new(UsageCounters::default()),
        }
    }

    /// Allocates `size` zeroed bytes.
    pub fn reserve(&self, size: u64) -> Result<Handle, AllocationError> {
        if size > self.properties.max_allocation_size {
            return Err(AllocationError::OutOfMemory {
                requested: size,
                max: self.properties.max_allocation_size,
                backtrace: BackTrace::capture(),
            });
        }

        let allocation = Allocation::new(size, self.properties.alignment, self.usage.clone())?;
        log::trace!("Reserved {size} bytes at {:p}", allocation.ptr());

        Ok(Handle::new(Arc::new(allocation)))
    }

    /// The current memory usage.
    pub fn memory_usage(&self) -> MemoryUsage {
        self.usage.snapshot()
    }

    /// The memory properties of the device.
    pub fn properties(&self) -> &MemoryDeviceProperties {
        &self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_aligned_and_zeroed() {
        let memory = MemoryManagement::new(MemoryDeviceProperties::default());
        let handle = memory.reserve(100).unwrap();

        assert_eq!(handle.as_ptr() as usize % 256, 0);
        assert_eq!(handle.size(), 100);
        let bytes = unsafe { core::slice::from_raw_parts(handle.as_ptr(), 100) };
        assert!(bytes.iter().all(|b| *b == 0));
    }

    #[test]
    fn usage_tracks_live_handles() {
        let memory = MemoryManagement::new(MemoryDeviceProperties::default());
        let handle = memory.reserve(64).unwrap();
        let copy = handle.clone();

        assert_eq!(memory.memory_usage().number_allocs, 1);
        assert_eq!(memory.memory_usage().bytes_in_use, 64);

        core::mem::drop(handle);
        assert_eq!(memory.memory_usage().number_allocs, 1);

        core::mem::drop(copy);
        assert_eq!(memory.memory_usage(), MemoryUsage::default());
    }

    #[test]
    fn oversized_allocation_fails() {
        let memory = MemoryManagement::new(MemoryDeviceProperties {
            max_allocation_size: 1024,
            alignment: 16,
        });

        let result = memory.reserve(2048);

        assert!(matches!(
            result,
            Err(AllocationError::OutOfMemory {
                requested: 2048,
                max: 1024,
                ..
            })
        ));
    }

    #[test]
    fn zero_sized_allocation_is_valid() {
        let memory = MemoryManagement::new(MemoryDeviceProperties::default());
        let handle = memory.reserve(0).unwrap();

        assert_eq!(handle.size(), 0);
    }
}
