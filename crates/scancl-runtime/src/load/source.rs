use core::marker::PhantomData;

use bytemuck::Pod;

use super::{CacheModifier, load};

/// Random access to the elements of a kernel input.
///
/// A source either exposes the address of its elements, which are then read with the
/// [cache-modified load](load), or computes them on demand.
///
/// # Safety
///
/// For every `index < len()`, [address](ElementSource::address) must return either `None` or a
/// pointer valid for reads and aligned for `T`, for as long as the source is alive.
pub unsafe trait ElementSource<T: Pod>: Send + Sync {
    /// Number of elements.
    fn len(&self) -> usize;

    /// Whether the source has no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Address of the element at `index`, if the source is backed by memory.
    fn address(&self, _index: usize) -> Option<*const T> {
        None
    }

    /// Value at `index`, used when the source has no address.
    ///
    /// The modifier is forwarded to any memory the source reads from.
    fn value(&self, index: usize, modifier: CacheModifier) -> T;
}

/// Loads the element at `index` of the source under the given modifier.
///
/// Sources without an address fall back to their computed [value](ElementSource::value).
#[inline]
pub fn load_element<T: Pod, S: ElementSource<T> + ?Sized>(
    source: &S,
    index: usize,
    modifier: CacheModifier,
) -> T {
    match source.address(index) {
        // SAFETY: guaranteed by the `ElementSource` contract.
        Some(ptr) => unsafe { load(ptr, modifier) },
        None => source.value(index, modifier),
    }
}

/// A sequence of consecutive integers starting at a given value.
#[derive(Debug, Clone, Copy)]
pub struct CountingInput<T> {
    start: T,
    len: usize,
}

impl<T> CountingInput<T> {
    /// Counts `len` values up from `start`, wrapping on overflow.
    pub fn new(start: T, len: usize) -> Self {
        Self { start, len }
    }
}

macro_rules! counting_input {
    ($($ty:ty),*) => {
        $(
            unsafe impl ElementSource<$ty> for CountingInput<$ty> {
                fn len(&self) -> usize {
                    self.len
                }

                fn value(&self, index: usize, _modifier: CacheModifier) -> $ty {
                    self.start.wrapping_add(index as $ty)
                }
            }
        )*
    };
}

counting_input!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

/// Applies a function to every element of another source.
pub struct TransformInput<A, S, F> {
    source: S,
    func: F,
    _input: PhantomData<fn(A)>,
}

impl<A, S, F> TransformInput<A, S, F> {
    /// Maps the elements of `source` through `func`.
    pub fn new(source: S, func: F) -> Self {
        Self {
            source,
            func,
            _input: PhantomData,
        }
    }
}

unsafe impl<A, T, S, F> ElementSource<T> for TransformInput<A, S, F>
where
    A: Pod,
    T: Pod,
    S: ElementSource<A>,
    F: Fn(A) -> T + Send + Sync,
{
    fn len(&self) -> usize {
        self.source.len()
    }

    fn value(&self, index: usize, modifier: CacheModifier) -> T {
        (self.func)(load_element(&self.source, index, modifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_input_wraps() {
        let input = CountingInput::new(254u8, 4);

        let values: Vec<u8> = (0..input.len())
            .map(|i| load_element(&input, i, CacheModifier::Default))
            .collect();

        assert_eq!(values, vec![254, 255, 0, 1]);
    }

    #[test]
    fn transform_forwards_to_source() {
        let input = TransformInput::new(CountingInput::new(1u32, 3), |x: u32| x as f64 * 0.5);

        assert_eq!(input.len(), 3);
        assert!(input.address(0).is_none());
        assert_eq!(load_element(&input, 2, CacheModifier::CacheStreaming), 1.5);
    }
}
