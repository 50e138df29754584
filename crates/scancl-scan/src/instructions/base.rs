/// An associative binary operator a scan folds with.
///
/// `combine` must be associative: `combine(a, combine(b, c)) == combine(combine(a, b), c)`.
/// It doesn't have to be commutative: the left operand always holds the elements with the
/// lower indices. Results are only reproducible across runs when the operator is exactly
/// associative, floating point additions are not.
pub trait ScanInstruction<T>: Send + Sync + 'static {
    /// Combines two partial results, `lhs` covering the elements before `rhs`.
    fn combine(&self, lhs: T, rhs: T) -> T;

    /// Folds an optional partial result with the partial result that follows it.
    #[inline]
    fn fold(&self, lhs: Option<T>, rhs: T) -> T {
        match lhs {
            Some(lhs) => self.combine(lhs, rhs),
            None => rhs,
        }
    }
}
