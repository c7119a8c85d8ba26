//! Matrix-product contraction of norm tensors

use super::tensor::NormTensor;
use crate::error::{Error, Result, ensure};
use crate::range::{Dims, Range};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Index pattern of a contraction `C[m.., n..] = A[m.., k..] * B[k.., n..]`.
///
/// The trailing `k` dimensions of the left operand are contracted with the
/// leading `k` dimensions of the right operand, where
/// `k = (left_rank + right_rank - result_rank) / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractionPlan {
    result_rank: usize,
    left_rank: usize,
    right_rank: usize,
}

impl ContractionPlan {
    /// Create a contraction plan from the three operand ranks
    ///
    /// # Errors
    ///
    /// Returns error if the ranks do not describe a matrix product.
    pub fn new(result_rank: usize, left_rank: usize, right_rank: usize) -> Result<Self> {
        let total = left_rank + right_rank;
        ensure!(
            total >= result_rank && (total - result_rank) % 2 == 0,
            Error::invalid_argument(
                "result_rank",
                format!(
                    "ranks {left_rank} x {right_rank} -> {result_rank} do not describe a contraction"
                ),
            )
        );
        let k = (total - result_rank) / 2;
        ensure!(
            k <= left_rank && k <= right_rank,
            Error::invalid_argument(
                "result_rank",
                format!("cannot contract {k} dimensions of ranks {left_rank} and {right_rank}"),
            )
        );
        Ok(Self {
            result_rank,
            left_rank,
            right_rank,
        })
    }

    /// Rank of the result
    #[inline]
    pub fn result_rank(&self) -> usize {
        self.result_rank
    }

    /// Rank of the left operand
    #[inline]
    pub fn left_rank(&self) -> usize {
        self.left_rank
    }

    /// Rank of the right operand
    #[inline]
    pub fn right_rank(&self) -> usize {
        self.right_rank
    }

    /// Number of contracted dimensions
    #[inline]
    pub fn num_contract_ranks(&self) -> usize {
        (self.left_rank + self.right_rank - self.result_rank) / 2
    }

    /// Number of free dimensions of the left operand
    #[inline]
    pub fn left_outer_rank(&self) -> usize {
        self.left_rank - self.num_contract_ranks()
    }

    /// Number of free dimensions of the right operand
    #[inline]
    pub fn right_outer_rank(&self) -> usize {
        self.right_rank - self.num_contract_ranks()
    }

    /// Check operand ranks and contracted extents against this plan
    pub(crate) fn check(&self, left: &[usize], right: &[usize]) -> Result<()> {
        ensure!(
            left.len() == self.left_rank,
            Error::RankMismatch {
                expected: self.left_rank,
                got: left.len(),
            }
        );
        ensure!(
            right.len() == self.right_rank,
            Error::RankMismatch {
                expected: self.right_rank,
                got: right.len(),
            }
        );
        let k = self.num_contract_ranks();
        let left_inner = &left[self.left_outer_rank()..];
        let right_inner = &right[..k];
        ensure!(
            left_inner == right_inner,
            Error::shape_mismatch(left_inner, right_inner)
        );
        Ok(())
    }
}

impl NormTensor {
    /// Contract `factor * self * other` according to `plan`.
    ///
    /// # Example
    /// ```
    /// use tilesparse::norm::{ContractionPlan, NormTensor};
    /// use tilesparse::range::Range;
    /// let a = NormTensor::new(Range::from_extents(&[1, 2]), vec![1.0, 2.0])?;
    /// let b = NormTensor::new(Range::from_extents(&[2, 1]), vec![3.0, 4.0])?;
    /// let c = a.gemm(&b, 1.0, &ContractionPlan::new(2, 2, 2)?)?;
    /// assert_eq!(c.as_slice(), &[11.0]);
    /// # Ok::<(), tilesparse::error::Error>(())
    /// ```
    pub fn gemm(&self, other: &NormTensor, factor: f32, plan: &ContractionPlan) -> Result<Self> {
        let left = self.range().extents();
        let right = other.range().extents();
        plan.check(&left, &right)?;

        let outer = plan.left_outer_rank();
        let k = plan.num_contract_ranks();
        let m: usize = left[..outer].iter().product();
        let kk: usize = left[outer..].iter().product();
        let n: usize = right[k..].iter().product();

        let extents: Dims = left[..outer].iter().chain(&right[k..]).copied().collect();
        let data = matmul(self.as_slice(), other.as_slice(), m, n, kk, factor);
        NormTensor::new(Range::from_extents(&extents), data)
    }
}

/// `alpha * A @ B` for row-major `A (m x k)` and `B (k x n)`
fn matmul(a: &[f32], b: &[f32], m: usize, n: usize, k: usize, alpha: f32) -> Vec<f32> {
    let mut out = vec![0.0f32; m * n];
    if out.is_empty() {
        return out;
    }

    // ikj order: better cache locality for B
    let row = |(i, out_row): (usize, &mut [f32])| {
        for kk in 0..k {
            let a_val = alpha * a[i * k + kk];
            if a_val == 0.0 {
                continue;
            }
            let b_row = &b[kk * n..(kk + 1) * n];
            for (o, &b_val) in out_row.iter_mut().zip(b_row) {
                *o += a_val * b_val;
            }
        }
    };

    #[cfg(feature = "rayon")]
    {
        if m * n * k >= super::PARALLEL_MIN_LEN {
            out.par_chunks_mut(n).enumerate().for_each(row);
            return out;
        }
    }

    out.chunks_mut(n).enumerate().for_each(row);
    out
}
