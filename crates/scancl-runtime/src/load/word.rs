use core::mem::{MaybeUninit, align_of, size_of};

use bytemuck::Pod;

use super::CacheModifier;

/// Machine word widths with a dedicated load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidthClass {
    /// 1 byte.
    W8,
    /// 2 bytes.
    W16,
    /// 4 bytes.
    W32,
    /// 8 bytes.
    W64,
    /// 16 bytes.
    W128,
}

impl WidthClass {
    /// All width classes, narrowest first.
    pub const ALL: [WidthClass; 5] = [
        WidthClass::W8,
        WidthClass::W16,
        WidthClass::W32,
        WidthClass::W64,
        WidthClass::W128,
    ];

    /// Width in bytes.
    pub const fn size(self) -> usize {
        match self {
            WidthClass::W8 => 1,
            WidthClass::W16 => 2,
            WidthClass::W32 => 4,
            WidthClass::W64 => 8,
            WidthClass::W128 => 16,
        }
    }

    /// The width class loading `T` in a single word, if any.
    ///
    /// `T` must be exactly one word wide and at least as aligned as the word.
    pub const fn of<T>() -> Option<Self> {
        let class = match size_of::<T>() {
            1 => WidthClass::W8,
            2 => WidthClass::W16,
            4 => WidthClass::W32,
            8 => WidthClass::W64,
            16 => WidthClass::W128,
            _ => return None,
        };

        if align_of::<T>() >= class.word_align() {
            Some(class)
        } else {
            None
        }
    }

    /// The widest class dividing both the size and the alignment of `T`.
    pub const fn decomposition_of<T>() -> Self {
        let mut index = Self::ALL.len();
        while index > 1 {
            index -= 1;
            let class = Self::ALL[index];
            if size_of::<T>() % class.size() == 0 && align_of::<T>() % class.word_align() == 0 {
                return class;
            }
        }
        WidthClass::W8
    }

    const fn word_align(self) -> usize {
        match self {
            WidthClass::W8 => align_of::<u8>(),
            WidthClass::W16 => align_of::<u16>(),
            WidthClass::W32 => align_of::<u32>(),
            WidthClass::W64 => align_of::<u64>(),
            WidthClass::W128 => align_of::<u128>(),
        }
    }
}

/// A machine word with a dedicated load for every [cache modifier](CacheModifier).
pub trait LoadWord: Pod {
    /// The width class of the word.
    const CLASS: WidthClass;

    /// Loads one word under the given modifier.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and aligned for `Self`.
    unsafe fn load(ptr: *const Self, modifier: CacheModifier) -> Self {
        hint(ptr as *const u8, modifier);

        if modifier.is_volatile() {
            // SAFETY: forwarded to the caller.
            unsafe { core::ptr::read_volatile(ptr) }
        } else {
            // SAFETY: forwarded to the caller.
            unsafe { core::ptr::read(ptr) }
        }
    }
}

macro_rules! load_word {
    ($($ty:ty => $class:ident),*) => {
        $(
            impl LoadWord for $ty {
                const CLASS: WidthClass = WidthClass::$class;
            }
        )*
    };
}

load_word!(u8 => W8, u16 => W16, u32 => W32, u64 => W64, u128 => W128);

#[inline(always)]
#[allow(unused_unsafe)]
fn hint(ptr: *const u8, modifier: CacheModifier) {
    cfg_if::cfg_if! {
        if #[cfg(prefetch_x86)] {
            use core::arch::x86_64::{_MM_HINT_NTA, _MM_HINT_T0, _MM_HINT_T1, _mm_prefetch};

            // SAFETY: prefetches never fault, SSE is part of the x86_64 baseline.
            unsafe {
                match modifier {
                    CacheModifier::CacheAllLevels | CacheModifier::ReadOnlyCache => {
                        _mm_prefetch::<_MM_HINT_T0>(ptr as *const i8)
                    }
                    CacheModifier::CacheGlobalOnly => _mm_prefetch::<_MM_HINT_T1>(ptr as *const i8),
                    CacheModifier::CacheStreaming => _mm_prefetch::<_MM_HINT_NTA>(ptr as *const i8),
                    _ => {}
                }
            }
        } else if #[cfg(prefetch_arm)] {
            use core::arch::asm;

            // SAFETY: prefetches never fault.
            unsafe {
                match modifier {
                    CacheModifier::CacheAllLevels | CacheModifier::ReadOnlyCache => asm!(
                        "prfm pldl1keep, [{0}]",
                        in(reg) ptr,
                        options(nostack, readonly, preserves_flags)
                    ),
                    CacheModifier::CacheGlobalOnly => asm!(
                        "prfm pldl2keep, [{0}]",
                        in(reg) ptr,
                        options(nostack, readonly, preserves_flags)
                    ),
                    CacheModifier::CacheStreaming => asm!(
                        "prfm pldl1strm, [{0}]",
                        in(reg) ptr,
                        options(nostack, readonly, preserves_flags)
                    ),
                    _ => {}
                }
            }
        } else {
            let _ = (ptr, modifier);
        }
    }
}

/// Loads a value of any plain type under the given cache modifier.
///
/// The modifier is first [resolved](CacheModifier::resolve) for the build target. Types one
/// machine word wide use that word's load directly, other types are loaded as an array of the
/// widest word dividing their size and alignment and only reinterpreted once every word is read.
///
/// # Safety
///
/// `ptr` must be valid for reads and aligned for `T`.
#[inline]
pub unsafe fn load<T: Pod>(ptr: *const T, modifier: CacheModifier) -> T {
    let modifier = modifier.resolve();

    // SAFETY: forwarded to the caller, the word matches the size and alignment of `T`.
    unsafe {
        match WidthClass::of::<T>() {
            Some(WidthClass::W8) => reinterpret(u8::load(ptr as *const u8, modifier)),
            Some(WidthClass::W16) => reinterpret(u16::load(ptr as *const u16, modifier)),
            Some(WidthClass::W32) => reinterpret(u32::load(ptr as *const u32, modifier)),
            Some(WidthClass::W64) => reinterpret(u64::load(ptr as *const u64, modifier)),
            Some(WidthClass::W128) => reinterpret(u128::load(ptr as *const u128, modifier)),
            None => match WidthClass::decomposition_of::<T>() {
                WidthClass::W8 => load_words::<T, u8>(ptr, modifier),
                WidthClass::W16 => load_words::<T, u16>(ptr, modifier),
                WidthClass::W32 => load_words::<T, u32>(ptr, modifier),
                WidthClass::W64 => load_words::<T, u64>(ptr, modifier),
                WidthClass::W128 => load_words::<T, u128>(ptr, modifier),
            },
        }
    }
}

#[inline(always)]
fn reinterpret<W: Pod, T: Pod>(word: W) -> T {
    bytemuck::pod_read_unaligned(bytemuck::bytes_of(&word))
}

/// # Safety
///
/// `ptr` must be valid for reads and aligned for `T`, `W` must divide the size and the
/// alignment of `T`.
unsafe fn load_words<T: Pod, W: LoadWord>(ptr: *const T, modifier: CacheModifier) -> T {
    let mut value = MaybeUninit::<T>::uninit();
    let src = ptr as *const W;
    let dst = value.as_mut_ptr() as *mut W;

    for i in 0..size_of::<T>() / size_of::<W>() {
        // SAFETY: `i` words stay within one `T`, aligned since `W` divides the alignment of `T`.
        unsafe { dst.add(i).write(W::load(src.add(i), modifier)) };
    }

    // SAFETY: every byte was written and any bit pattern is a valid `T`.
    unsafe { value.assume_init() }
}
