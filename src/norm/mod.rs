//! Norm tensors
//!
//! A [`NormTensor`] is a small dense tensor holding one non-negative `f32`
//! per tile, indexed by tile ordinal. Shapes store scaled tile norms in one
//! and run their whole algebra on it: elementwise maps, permutation, block
//! extraction and matrix-product contraction.

mod contraction;
mod tensor;

pub use contraction::ContractionPlan;
pub use tensor::NormTensor;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Minimum number of elements before a norm kernel is split across the
/// rayon pool. Norm tensors are usually tiny; below this size the fork/join
/// overhead dominates.
pub(crate) const PARALLEL_MIN_LEN: usize = 4096;

/// Evaluate `f` at every ordinal `0..len`, in parallel when worthwhile
pub(crate) fn collect_ordinals<F>(len: usize, f: F) -> Vec<f32>
where
    F: Fn(usize) -> f32 + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        if len >= PARALLEL_MIN_LEN {
            return (0..len).into_par_iter().map(f).collect();
        }
    }

    (0..len).map(f).collect()
}
