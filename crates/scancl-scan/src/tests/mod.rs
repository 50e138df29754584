#![allow(missing_docs)]

pub mod simple;

pub use half::{bf16, f16};
pub use scancl_runtime::Runtime;

use rand::distr::Uniform;
use scancl_common::rand::{Rng, get_seeded_rng};

use crate::instructions::ScanNumeric;

/// Element types the generated tests sample inputs for.
pub trait TestElement: ScanNumeric {
    fn from_sample(value: i64) -> Self;
}

macro_rules! test_element {
    ($($ty:ty => |$value:ident| $body:expr),* $(,)?) => {
        $(
            impl TestElement for $ty {
                fn from_sample($value: i64) -> Self {
                    $body
                }
            }
        )*
    };
}

test_element!(
    i8 => |value| value as i8,
    u8 => |value| value as u8,
    i16 => |value| value as i16,
    u16 => |value| value as u16,
    i32 => |value| value as i32,
    u32 => |value| value as u32,
    i64 => |value| value,
    u64 => |value| value as u64,
    f32 => |value| value as f32,
    f64 => |value| value as f64,
    f16 => |value| f16::from_f32(value as f32),
    bf16 => |value| bf16::from_f32(value as f32),
);

/// Seeded inputs in `1..20`, so that float sums stay exact.
pub fn sample<N: TestElement>(len: usize) -> Vec<N> {
    get_seeded_rng(1234)
        .sample_iter(Uniform::<i64>::new(1, 20).unwrap())
        .take(len)
        .map(N::from_sample)
        .collect()
}

#[macro_export]
macro_rules! testgen_scan {
    () => {
        mod test_scan {
            use super::*;

            $crate::testgen_scan_simple!();
        }
    };
}
