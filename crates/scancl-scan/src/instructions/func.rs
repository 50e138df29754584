use core::marker::PhantomData;

use super::ScanInstruction;

/// A scan operator defined by a closure.
///
/// ```
/// use scancl_scan::ScanInstruction;
/// use scancl_scan::instructions::FnInstruction;
///
/// // Composition of affine maps `x -> a * x + b`, not commutative.
/// let compose = FnInstruction::new(|f: (u32, u32), g: (u32, u32)| {
///     (f.0.wrapping_mul(g.0), f.1.wrapping_mul(g.0).wrapping_add(g.1))
/// });
///
/// assert_eq!(compose.combine((2, 1), (3, 4)), (6, 7));
/// ```
pub struct FnInstruction<T, F> {
    func: F,
    _ty: PhantomData<fn(T, T) -> T>,
}

impl<T, F> FnInstruction<T, F>
where
    F: Fn(T, T) -> T,
{
    /// Wraps an associative closure.
    pub fn new(func: F) -> Self {
        Self {
            func,
            _ty: PhantomData,
        }
    }
}

impl<T, F> ScanInstruction<T> for FnInstruction<T, F>
where
    T: 'static,
    F: Fn(T, T) -> T + Send + Sync + 'static,
{
    #[inline]
    fn combine(&self, lhs: T, rhs: T) -> T {
        (self.func)(lhs, rhs)
    }
}

impl<T, F: Clone> Clone for FnInstruction<T, F> {
    fn clone(&self) -> Self {
        Self {
            func: self.func.clone(),
            _ty: PhantomData,
        }
    }
}
