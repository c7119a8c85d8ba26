//! Dimension permutations
//!
//! A permutation `p` moves dimension `i` of its argument to position `p[i]`
//! of the result: `(p * idx)[p[i]] = idx[i]`. Shapes and ranges use this
//! convention for the output coordinates of every permuting operation.

use crate::error::{Error, Result, ensure};
use crate::range::Dims;
use std::fmt;
use std::ops::Index;

/// A permutation of `0..rank`
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Permutation(Dims);

impl Permutation {
    /// Create a permutation, validating that `perm` holds each of `0..perm.len()` once.
    pub fn new(perm: impl Into<Dims>) -> Result<Self> {
        let perm = perm.into();
        let mut seen = vec![false; perm.len()];
        for &p in perm.iter() {
            ensure!(
                p < perm.len() && !seen[p],
                Error::InvalidPermutation { perm: perm.to_vec() }
            );
            seen[p] = true;
        }
        Ok(Self(perm))
    }

    /// The identity permutation of the given rank
    pub fn identity(rank: usize) -> Self {
        Self((0..rank).collect())
    }

    /// Number of dimensions permuted
    #[inline]
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// The target positions as a slice
    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Whether this permutation leaves every dimension in place
    pub fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(i, &p)| i == p)
    }

    /// The inverse permutation: `p.inverse().apply(&p.apply(idx)) == idx`
    pub fn inverse(&self) -> Self {
        let mut inv = Dims::filled(0, self.rank());
        for (i, &p) in self.0.iter().enumerate() {
            inv[p] = i;
        }
        Self(inv)
    }

    /// Permute a per-dimension sequence (coordinate index, extents, bounds).
    ///
    /// `values.len()` must equal [`rank`](Self::rank).
    pub fn apply(&self, values: &[usize]) -> Dims {
        debug_assert_eq!(values.len(), self.rank());
        let mut out = Dims::filled(0, values.len());
        for (i, &p) in self.0.iter().enumerate() {
            out[p] = values[i];
        }
        out
    }

    /// Permute an arbitrary per-dimension sequence
    pub fn apply_to<T: Clone>(&self, values: &[T]) -> Vec<T> {
        debug_assert_eq!(values.len(), self.rank());
        let mut out: Vec<Option<T>> = vec![None; values.len()];
        for (i, &p) in self.0.iter().enumerate() {
            out[p] = Some(values[i].clone());
        }
        out.into_iter().flatten().collect()
    }
}

impl Index<usize> for Permutation {
    type Output = usize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl fmt::Debug for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Permutation({:?})", self.0)
    }
}

impl TryFrom<Vec<usize>> for Permutation {
    type Error = Error;

    fn try_from(value: Vec<usize>) -> Result<Self> {
        Self::new(value)
    }
}
