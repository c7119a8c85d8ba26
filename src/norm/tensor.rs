//! Dense ordinal-indexed tensor of tile norms

use super::collect_ordinals;
use crate::error::{Error, Result, ensure};
use crate::permutation::Permutation;
use crate::range::{Dims, Range};

/// Dense tensor of `f32` values laid out row-major over a [`Range`]
#[derive(Clone, Debug, PartialEq)]
pub struct NormTensor {
    range: Range,
    data: Vec<f32>,
}

impl NormTensor {
    /// Create a tensor from its range and row-major data
    ///
    /// # Errors
    ///
    /// Returns error if `data.len()` differs from the range volume.
    pub fn new(range: Range, data: Vec<f32>) -> Result<Self> {
        ensure!(
            data.len() == range.volume(),
            Error::shape_mismatch(&[range.volume()], &[data.len()])
        );
        Ok(Self { range, data })
    }

    /// Tensor of zeros
    pub fn zeros(range: Range) -> Self {
        let data = vec![0.0; range.volume()];
        Self { range, data }
    }

    /// Tensor whose value at each coordinate is `f(coordinate)`
    pub fn from_fn(range: Range, mut f: impl FnMut(&[usize]) -> f32) -> Self {
        let data = range.iter().map(|idx| f(&idx)).collect();
        Self { range, data }
    }

    /// The index range
    #[inline]
    pub fn range(&self) -> &Range {
        &self.range
    }

    /// Number of values
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor holds no values
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Values in ordinal order
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consume the tensor, returning its values
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Value at `ordinal`
    #[inline]
    pub fn get(&self, ordinal: usize) -> Option<f32> {
        self.data.get(ordinal).copied()
    }

    /// Value at coordinate `idx`
    pub fn at(&self, idx: &[usize]) -> Option<f32> {
        self.range.ordinal(idx).map(|ord| self.data[ord])
    }

    /// Iterate values in ordinal order
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.data.iter().copied()
    }

    /// Apply `f(ordinal, value)` to every value
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(usize, f32) -> f32 + Sync + Send,
    {
        let data = collect_ordinals(self.len(), |ord| f(ord, self.data[ord]));
        Self {
            range: self.range.clone(),
            data,
        }
    }

    /// Combine two tensors of identical extents value by value
    pub fn zip_map<F>(&self, other: &NormTensor, f: F) -> Result<Self>
    where
        F: Fn(usize, f32, f32) -> f32 + Sync + Send,
    {
        ensure!(
            self.range.extents() == other.range.extents(),
            Error::shape_mismatch(&self.range.extents(), &other.range.extents())
        );
        let data = collect_ordinals(self.len(), |ord| {
            f(ord, self.data[ord], other.data[ord])
        });
        Ok(Self {
            range: self.range.clone(),
            data,
        })
    }

    /// Tensor whose value at `perm * idx` is this tensor's value at `idx`
    pub fn permute(&self, perm: &Permutation) -> Result<Self> {
        let range = self.range.permute(perm)?;
        let inverse = perm.inverse();
        let data = collect_ordinals(range.volume(), |ord| {
            let out_idx = range.idx(ord).unwrap_or_default();
            let src = self.range.ordinal(&inverse.apply(&out_idx)).unwrap_or_default();
            self.data[src]
        });
        Ok(Self { range, data })
    }

    /// Copy of the sub-block `[lower, upper)`, re-indexed to start at the origin
    ///
    /// # Errors
    ///
    /// Returns error unless `lower < upper` in every dimension and the block
    /// lies inside this tensor's range.
    pub fn block(&self, lower: &[usize], upper: &[usize]) -> Result<Self> {
        let rank = self.range.rank();
        ensure!(
            lower.len() == rank && upper.len() == rank,
            Error::RankMismatch {
                expected: rank,
                got: if lower.len() != rank { lower.len() } else { upper.len() },
            }
        );
        for d in 0..rank {
            ensure!(
                lower[d] < upper[d],
                Error::invalid_argument(
                    "lower",
                    format!("block lower bound {lower:?} is not less than upper bound {upper:?}"),
                )
            );
            ensure!(
                self.range.lobound()[d] <= lower[d] && upper[d] <= self.range.upbound()[d],
                Error::invalid_argument(
                    "upper",
                    format!("block [{lower:?}, {upper:?}) exceeds {}", self.range),
                )
            );
        }

        let extents: Dims = lower.iter().zip(upper).map(|(lo, hi)| hi - lo).collect();
        let range = Range::from_extents(&extents);
        let data = collect_ordinals(range.volume(), |ord| {
            let mut idx = range.idx(ord).unwrap_or_default();
            for (i, lo) in idx.iter_mut().zip(lower) {
                *i += lo;
            }
            self.data[self.range.ordinal(&idx).unwrap_or_default()]
        });
        Ok(Self { range, data })
    }
}
