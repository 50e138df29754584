use core::marker::PhantomData;
use core::mem::{align_of, size_of};

use bytemuck::Pod;
use scancl_common::backtrace::BackTrace;
use thiserror::Error;

use super::Handle;
use crate::load::{CacheModifier, ElementSource};

/// Errors raised when viewing device memory as typed elements.
#[derive(Error, Clone)]
pub enum BindingError {
    /// The memory region is smaller than the requested elements.
    #[error(
        "Binding of {len} elements needs {required} bytes, the handle only has {available}.\nBacktrace\n{backtrace}"
    )]
    TooSmall {
        /// Number of elements requested.
        len: usize,
        /// Bytes needed.
        required: u64,
        /// Bytes available.
        available: u64,
        /// The backtrace for this error.
        backtrace: BackTrace,
    },
    /// The memory region isn't aligned for the element type.
    #[error("Binding requires an alignment of {alignment} bytes.\nBacktrace\n{backtrace}")]
    Misaligned {
        /// Alignment required by the element type.
        alignment: usize,
        /// The backtrace for this error.
        backtrace: BackTrace,
    },
}

impl core::fmt::Debug for BindingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{self}"))
    }
}

fn check_binding<T>(handle: &Handle, len: usize) -> Result<(), BindingError> {
    let required = (len as u64).saturating_mul(size_of::<T>() as u64);
    if required > handle.size() {
        return Err(BindingError::TooSmall {
            len,
            required,
            available: handle.size(),
            backtrace: BackTrace::capture(),
        });
    }
    if (handle.as_ptr() as usize) % align_of::<T>() != 0 {
        return Err(BindingError::Misaligned {
            alignment: align_of::<T>(),
            backtrace: BackTrace::capture(),
        });
    }
    Ok(())
}

/// Read-only view of device memory as `len` elements of `T`.
///
/// The view keeps the memory alive.
#[derive(Clone, Debug)]
pub struct DeviceSlice<T> {
    handle: Handle,
    len: usize,
    _ty: PhantomData<T>,
}

impl<T: Pod> DeviceSlice<T> {
    /// Views the start of the handle as `len` elements.
    pub fn new(handle: Handle, len: usize) -> Result<Self, BindingError> {
        check_binding::<T>(&handle, len)?;
        Ok(Self {
            handle,
            len,
            _ty: PhantomData,
        })
    }

    /// The handle the view points to.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Pointer to the first element.
    pub fn as_ptr(&self) -> *const T {
        self.handle.as_ptr() as *const T
    }
}

unsafe impl<T: Pod + Send + Sync> ElementSource<T> for DeviceSlice<T> {
    fn len(&self) -> usize {
        self.len
    }

    fn address(&self, index: usize) -> Option<*const T> {
        if index < self.len {
            // SAFETY: in bounds of a region checked at creation.
            Some(unsafe { self.as_ptr().add(index) })
        } else {
            None
        }
    }

    fn value(&self, index: usize, _modifier: CacheModifier) -> T {
        assert!(
            index < self.len,
            "Index {index} out of bounds for a slice of {}",
            self.len
        );
        // SAFETY: in bounds of a region checked at creation.
        unsafe { self.as_ptr().add(index).read() }
    }
}

/// Writable view of device memory as `len` elements of `T`.
///
/// Writes go through a shared reference: the cubes of a grid write disjoint elements
/// concurrently, and it's up to the kernel to never write an element twice or read an element
/// another cube writes.
#[derive(Clone, Debug)]
pub struct DeviceSliceMut<T> {
    handle: Handle,
    len: usize,
    _ty: PhantomData<T>,
}

impl<T: Pod> DeviceSliceMut<T> {
    /// Views the start of the handle as `len` elements.
    pub fn new(handle: Handle, len: usize) -> Result<Self, BindingError> {
        check_binding::<T>(&handle, len)?;
        Ok(Self {
            handle,
            len,
            _ty: PhantomData,
        })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the view has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The handle the view points to.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Pointer to the first element.
    pub fn as_mut_ptr(&self) -> *mut T {
        self.handle.as_ptr() as *mut T
    }

    /// A read-only view of the same elements.
    pub fn as_source(&self) -> DeviceSlice<T> {
        DeviceSlice {
            handle: self.handle.clone(),
            len: self.len,
            _ty: PhantomData,
        }
    }

    /// Writes `value` at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of bounds.
    ///
    /// # Safety
    ///
    /// No other unit may access the element concurrently.
    pub unsafe fn write(&self, index: usize, value: T) {
        assert!(
            index < self.len,
            "Index {index} out of bounds for a slice of {}",
            self.len
        );
        // SAFETY: in bounds, exclusivity is forwarded to the caller.
        unsafe { self.as_mut_ptr().add(index).write(value) }
    }
}
