//! Per-tile status records, the only channel between the tiles of a scan.
//!
//! The records live in the caller's scratch memory, preceded by [TILE_STATUS_PADDING] sentinel
//! records standing for the tiles before the first one. A record only moves forward:
//! `Invalid -> Partial -> Inclusive`, or `Invalid -> Inclusive` for the first tile. Each record
//! has one writer, any number of readers, and is published with release semantics.
//!
//! Elements of at most 4 bytes are packed with their status in one 64-bit word, written with a
//! single store. Larger elements use a status word plus one payload slot per transition, each
//! written once before its status is released.

use core::marker::PhantomData;
use core::mem::{align_of, size_of};
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use bytemuck::Pod;
use scancl_runtime::load::{CacheModifier, load};
use scancl_runtime::memory_management::Handle;

use crate::ScanError;

/// Number of sentinel records preceding the records of the first tile.
pub const TILE_STATUS_PADDING: usize = 32;

const STATUS_INVALID: u32 = 0;
const STATUS_PARTIAL: u32 = 1;
const STATUS_INCLUSIVE: u32 = 2;

const SPLIT_ALIGN: usize = 16;

/// State of a tile as seen by the tiles after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStatus<T> {
    /// Nothing published yet.
    Invalid,
    /// Aggregate of the tile alone.
    Partial(T),
    /// Fold of the tile and every tile before it.
    Inclusive(T),
}

/// Memory layout of the status records of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStatusLayout {
    /// One 64-bit word per record, status in the low half and value bits in the high half.
    Packed {
        /// Number of records, sentinels included.
        records: usize,
    },
    /// Status words followed by the partial and inclusive value arrays.
    Split {
        /// Number of records, sentinels included.
        records: usize,
        /// Byte offset of the partial values.
        partial_offset: usize,
        /// Byte offset of the inclusive values.
        inclusive_offset: usize,
        /// Total size in bytes.
        size: usize,
        /// Alignment of the element type, at least 16.
        align: usize,
    },
}

impl TileStatusLayout {
    /// The layout of `num_tiles` records for elements of type `T`.
    pub fn new<T>(num_tiles: usize) -> Self {
        let records = num_tiles + TILE_STATUS_PADDING;

        if size_of::<T>() <= size_of::<u32>() && align_of::<T>() <= align_of::<u32>() {
            return Self::Packed { records };
        }

        let align = align_of::<T>().max(SPLIT_ALIGN);
        let status_bytes = (records * size_of::<u32>()).next_multiple_of(align);
        let value_bytes = (records * size_of::<T>()).next_multiple_of(align);

        Self::Split {
            records,
            partial_offset: status_bytes,
            inclusive_offset: status_bytes + value_bytes,
            size: status_bytes + 2 * value_bytes,
            align,
        }
    }

    /// Number of records, sentinels included.
    pub fn records(&self) -> usize {
        match self {
            Self::Packed { records } | Self::Split { records, .. } => *records,
        }
    }

    /// Scratch bytes needed.
    pub fn size(&self) -> usize {
        match self {
            Self::Packed { records } => records * size_of::<AtomicU64>(),
            Self::Split { size, .. } => *size,
        }
    }

    /// Alignment the scratch must have.
    pub fn align(&self) -> usize {
        match self {
            Self::Packed { .. } => align_of::<AtomicU64>(),
            Self::Split { align, .. } => *align,
        }
    }
}

/// Typed view of the status records in a scratch buffer.
pub struct TileStatusStore<T> {
    scratch: Handle,
    layout: TileStatusLayout,
    _ty: PhantomData<T>,
}

impl<T: Pod> TileStatusStore<T> {
    /// Binds the records of `layout` to the start of `scratch`.
    pub fn new(scratch: Handle, layout: TileStatusLayout) -> Result<Self, ScanError> {
        if (scratch.size() as usize) < layout.size() {
            return Err(ScanError::invalid(format!(
                "The scratch holds {} bytes, the tile status needs {}",
                scratch.size(),
                layout.size()
            )));
        }
        if (scratch.as_ptr() as usize) % layout.align() != 0 {
            return Err(ScanError::invalid(format!(
                "The scratch must be aligned to {} bytes",
                layout.align()
            )));
        }

        Ok(Self {
            scratch,
            layout,
            _ty: PhantomData,
        })
    }

    /// The layout of the records.
    pub fn layout(&self) -> &TileStatusLayout {
        &self.layout
    }

    /// Resets record `record` (sentinels included) to its initial state.
    ///
    /// Sentinels become `Inclusive(sentinel)`, tile records become `Invalid`.
    pub fn reset(&self, record: usize, sentinel: T) {
        if record < TILE_STATUS_PADDING {
            self.publish(record, STATUS_INCLUSIVE, sentinel);
        } else {
            match self.layout {
                TileStatusLayout::Packed { .. } => {
                    self.packed(record).store(STATUS_INVALID as u64, Ordering::Release)
                }
                TileStatusLayout::Split { .. } => {
                    self.status(record).store(STATUS_INVALID, Ordering::Release)
                }
            }
        }
    }

    /// Publishes the aggregate of `tile`.
    pub fn set_partial(&self, tile: usize, aggregate: T) {
        self.publish(tile + TILE_STATUS_PADDING, STATUS_PARTIAL, aggregate);
    }

    /// Publishes the inclusive prefix of `tile`.
    pub fn set_inclusive(&self, tile: usize, prefix: T) {
        self.publish(tile + TILE_STATUS_PADDING, STATUS_INCLUSIVE, prefix);
    }

    /// Reads the record of `tile` without waiting.
    ///
    /// Negative tiles read the sentinels.
    pub fn load(&self, tile: isize) -> TileStatus<T> {
        let record = tile + TILE_STATUS_PADDING as isize;
        assert!(record >= 0, "Tile {tile} is before the sentinels");
        let record = record as usize;

        match self.layout {
            TileStatusLayout::Packed { .. } => {
                let word = self.packed(record).load(Ordering::Acquire);
                let value = || {
                    let bits = (word >> 32) as u32;
                    bytemuck::pod_read_unaligned(&bytemuck::bytes_of(&bits)[..size_of::<T>()])
                };
                match word as u32 {
                    STATUS_PARTIAL => TileStatus::Partial(value()),
                    STATUS_INCLUSIVE => TileStatus::Inclusive(value()),
                    _ => TileStatus::Invalid,
                }
            }
            TileStatusLayout::Split {
                partial_offset,
                inclusive_offset,
                ..
            } => match self.status(record).load(Ordering::Acquire) {
                STATUS_PARTIAL => TileStatus::Partial(self.read_value(partial_offset, record)),
                STATUS_INCLUSIVE => {
                    TileStatus::Inclusive(self.read_value(inclusive_offset, record))
                }
                _ => TileStatus::Invalid,
            },
        }
    }

    fn publish(&self, record: usize, status: u32, value: T) {
        match self.layout {
            TileStatusLayout::Packed { .. } => {
                let mut bits = 0u32;
                bytemuck::bytes_of_mut(&mut bits)[..size_of::<T>()]
                    .copy_from_slice(bytemuck::bytes_of(&value));
                let word = ((bits as u64) << 32) | status as u64;
                self.packed(record).store(word, Ordering::Release);
            }
            TileStatusLayout::Split {
                partial_offset,
                inclusive_offset,
                ..
            } => {
                let offset = match status {
                    STATUS_PARTIAL => partial_offset,
                    _ => inclusive_offset,
                };
                // SAFETY: in bounds of the checked layout. The slot is only written here, once
                // per transition, and only read after the status below is observed.
                unsafe { self.value_ptr(offset, record).write(value) };
                self.status(record).store(status, Ordering::Release);
            }
        }
    }

    fn read_value(&self, offset: usize, record: usize) -> T {
        // SAFETY: in bounds and aligned, the slot was written before its status was released.
        unsafe { load(self.value_ptr(offset, record), CacheModifier::CacheAsVolatile) }
    }

    fn value_ptr(&self, offset: usize, record: usize) -> *mut T {
        debug_assert!(record < self.layout.records());
        // SAFETY: within the scratch, checked against the layout at creation.
        unsafe { (self.scratch.as_ptr().add(offset) as *mut T).add(record) }
    }

    fn packed(&self, record: usize) -> &AtomicU64 {
        debug_assert!(record < self.layout.records());
        // SAFETY: in bounds, 8-byte aligned and only ever accessed atomically.
        unsafe { &*(self.scratch.as_ptr() as *const AtomicU64).add(record) }
    }

    fn status(&self, record: usize) -> &AtomicU32 {
        debug_assert!(record < self.layout.records());
        // SAFETY: in bounds, aligned and only ever accessed atomically.
        unsafe { &*(self.scratch.as_ptr() as *const AtomicU32).add(record) }
    }
}

impl<T> Clone for TileStatusStore<T> {
    fn clone(&self) -> Self {
        Self {
            scratch: self.scratch.clone(),
            layout: self.layout,
            _ty: PhantomData,
        }
    }
}
