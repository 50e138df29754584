use bytemuck::Pod;
use half::{bf16, f16};

use super::ScanInstruction;

/// Element types the built-in arithmetic operators apply to.
///
/// Integer arithmetic wraps on overflow.
pub trait ScanNumeric: Pod + PartialOrd + Send + Sync + core::fmt::Debug {
    /// Neutral element of [Add].
    const ZERO: Self;
    /// Neutral element of [Mul].
    const ONE: Self;
    /// Neutral element of [Max].
    const MIN: Self;
    /// Neutral element of [Min].
    const MAX: Self;

    /// `lhs + rhs`.
    fn scan_add(lhs: Self, rhs: Self) -> Self;
    /// `lhs * rhs`.
    fn scan_mul(lhs: Self, rhs: Self) -> Self;
}

/// Integer element types the bitwise operators apply to.
pub trait ScanBits: ScanNumeric {
    /// `lhs | rhs`.
    fn scan_or(lhs: Self, rhs: Self) -> Self;
    /// `lhs & rhs`.
    fn scan_and(lhs: Self, rhs: Self) -> Self;
    /// `lhs ^ rhs`.
    fn scan_xor(lhs: Self, rhs: Self) -> Self;
}

macro_rules! impl_integer {
    ($($ty:ty),*) => {
        $(
            impl ScanNumeric for $ty {
                const ZERO: Self = 0;
                const ONE: Self = 1;
                const MIN: Self = <$ty>::MIN;
                const MAX: Self = <$ty>::MAX;

                #[inline]
                fn scan_add(lhs: Self, rhs: Self) -> Self {
                    lhs.wrapping_add(rhs)
                }

                #[inline]
                fn scan_mul(lhs: Self, rhs: Self) -> Self {
                    lhs.wrapping_mul(rhs)
                }
            }

            impl ScanBits for $ty {
                #[inline]
                fn scan_or(lhs: Self, rhs: Self) -> Self {
                    lhs | rhs
                }

                #[inline]
                fn scan_and(lhs: Self, rhs: Self) -> Self {
                    lhs & rhs
                }

                #[inline]
                fn scan_xor(lhs: Self, rhs: Self) -> Self {
                    lhs ^ rhs
                }
            }
        )*
    };
}

macro_rules! impl_float {
    ($($ty:ty => $zero:expr, $one:expr),*) => {
        $(
            impl ScanNumeric for $ty {
                const ZERO: Self = $zero;
                const ONE: Self = $one;
                const MIN: Self = <$ty>::NEG_INFINITY;
                const MAX: Self = <$ty>::INFINITY;

                #[inline]
                fn scan_add(lhs: Self, rhs: Self) -> Self {
                    lhs + rhs
                }

                #[inline]
                fn scan_mul(lhs: Self, rhs: Self) -> Self {
                    lhs * rhs
                }
            }
        )*
    };
}

impl_integer!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);
impl_float!(
    f32 => 0.0, 1.0,
    f64 => 0.0, 1.0,
    f16 => f16::ZERO, f16::ONE,
    bf16 => bf16::ZERO, bf16::ONE
);

macro_rules! instruction {
    ($(#[$doc:meta])* $name:ident: $bound:ident, |$lhs:ident, $rhs:ident| $body:expr) => {
        $(#[$doc])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        impl<T: $bound> ScanInstruction<T> for $name {
            #[inline]
            fn combine(&self, $lhs: T, $rhs: T) -> T {
                $body
            }
        }
    };
}

instruction!(
    /// Sum, wrapping for integers.
    Add: ScanNumeric, |lhs, rhs| T::scan_add(lhs, rhs)
);
instruction!(
    /// Product, wrapping for integers.
    Mul: ScanNumeric, |lhs, rhs| T::scan_mul(lhs, rhs)
);
instruction!(
    /// Maximum, keeping the left operand on ties.
    Max: ScanNumeric, |lhs, rhs| if rhs > lhs { rhs } else { lhs }
);
instruction!(
    /// Minimum, keeping the left operand on ties.
    Min: ScanNumeric, |lhs, rhs| if rhs < lhs { rhs } else { lhs }
);
instruction!(
    /// Bitwise or.
    BitOr: ScanBits, |lhs, rhs| T::scan_or(lhs, rhs)
);
instruction!(
    /// Bitwise and.
    BitAnd: ScanBits, |lhs, rhs| T::scan_and(lhs, rhs)
);
instruction!(
    /// Bitwise exclusive or.
    BitXor: ScanBits, |lhs, rhs| T::scan_xor(lhs, rhs)
);
