//! Range: a dense, row-major box of coordinate indices

use super::dims::Dims;
use crate::error::{Error, Result, ensure};
use crate::permutation::Permutation;
use std::fmt;

/// Half-open box `[lobound, upbound)` of coordinate indices.
///
/// Coordinates map to ordinals in row-major order, relative to the lower
/// bound:
///   ordinal = (i0 - lo0) * strides[0] + ... + (in - lon) * strides[n]
///
/// Tile index spaces use ranges anchored at the origin; tile *element*
/// ranges carry the lower bound of the tile inside the full tensor.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Range {
    lobound: Dims,
    upbound: Dims,
    strides: Dims,
    volume: usize,
}

impl Range {
    /// Create a range from explicit bounds.
    ///
    /// # Errors
    ///
    /// Returns error if the bounds have different ranks or `lobound > upbound`
    /// in any dimension.
    pub fn new(lobound: impl Into<Dims>, upbound: impl Into<Dims>) -> Result<Self> {
        let lobound = lobound.into();
        let upbound = upbound.into();
        ensure!(
            lobound.len() == upbound.len(),
            Error::RankMismatch {
                expected: lobound.len(),
                got: upbound.len(),
            }
        );
        ensure!(
            lobound.iter().zip(upbound.iter()).all(|(lo, hi)| lo <= hi),
            Error::invalid_argument(
                "upbound",
                format!("lower bound {lobound:?} exceeds upper bound {upbound:?}"),
            )
        );
        Ok(Self::from_bounds_unchecked(lobound, upbound))
    }

    /// Create a range `[0, extents)`
    ///
    /// # Example
    /// ```
    /// use tilesparse::range::Range;
    /// let range = Range::from_extents(&[2, 3, 4]);
    /// assert_eq!(range.volume(), 24);
    /// assert_eq!(range.strides(), &[12, 4, 1]);
    /// ```
    pub fn from_extents(extents: &[usize]) -> Self {
        Self::from_bounds_unchecked(Dims::filled(0, extents.len()), Dims::from(extents))
    }

    pub(crate) fn from_bounds_unchecked(lobound: Dims, upbound: Dims) -> Self {
        let extents: Dims = lobound
            .iter()
            .zip(upbound.iter())
            .map(|(lo, hi)| hi - lo)
            .collect();
        let strides = Self::compute_contiguous_strides(&extents);
        let volume = extents.product();
        Self {
            lobound,
            upbound,
            strides,
            volume,
        }
    }

    /// Compute contiguous strides for the given extents (row-major order)
    fn compute_contiguous_strides(extents: &[usize]) -> Dims {
        let mut strides = Dims::filled(0, extents.len());
        let mut stride = 1usize;

        // Compute strides from last dimension to first
        for (slot, &extent) in strides.iter_mut().rev().zip(extents.iter().rev()) {
            *slot = stride;
            stride *= extent;
        }

        strides
    }

    /// Number of dimensions
    #[inline]
    pub fn rank(&self) -> usize {
        self.lobound.len()
    }

    /// Inclusive lower bound
    #[inline]
    pub fn lobound(&self) -> &[usize] {
        &self.lobound
    }

    /// Exclusive upper bound
    #[inline]
    pub fn upbound(&self) -> &[usize] {
        &self.upbound
    }

    /// Row-major strides (in ordinals)
    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Extent along dimension `d`
    #[inline]
    pub fn extent(&self, d: usize) -> usize {
        self.upbound[d] - self.lobound[d]
    }

    /// Extents of every dimension
    pub fn extents(&self) -> Dims {
        (0..self.rank()).map(|d| self.extent(d)).collect()
    }

    /// Total number of coordinates
    #[inline]
    pub fn volume(&self) -> usize {
        self.volume
    }

    /// Whether the range holds no coordinates
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.volume == 0
    }

    /// Check if `idx` lies inside the range
    pub fn includes(&self, idx: &[usize]) -> bool {
        idx.len() == self.rank()
            && idx
                .iter()
                .zip(self.lobound.iter().zip(self.upbound.iter()))
                .all(|(i, (lo, hi))| lo <= i && i < hi)
    }

    /// Ordinal of coordinate `idx`, or `None` if it lies outside the range
    pub fn ordinal(&self, idx: &[usize]) -> Option<usize> {
        if !self.includes(idx) {
            return None;
        }
        Some(
            idx.iter()
                .zip(self.lobound.iter())
                .zip(self.strides.iter())
                .map(|((i, lo), stride)| (i - lo) * stride)
                .sum(),
        )
    }

    /// Coordinate of `ordinal`, or `None` if it is out of range
    pub fn idx(&self, ordinal: usize) -> Option<Dims> {
        if ordinal >= self.volume {
            return None;
        }
        let mut rem = ordinal;
        let mut idx = Dims::filled(0, self.rank());
        for d in 0..self.rank() {
            idx[d] = self.lobound[d] + rem / self.strides[d];
            rem %= self.strides[d];
        }
        Some(idx)
    }

    /// Ordinal of coordinate `idx` with all of its precondition checks.
    pub fn checked_ordinal(&self, idx: &[usize]) -> Result<usize> {
        ensure!(
            idx.len() == self.rank(),
            Error::RankMismatch {
                expected: self.rank(),
                got: idx.len(),
            }
        );
        for (d, &i) in idx.iter().enumerate() {
            ensure!(
                self.lobound[d] <= i && i < self.upbound[d],
                Error::IndexOutOfBounds {
                    index: i,
                    size: self.upbound[d],
                }
            );
        }
        Ok(self.ordinal(idx).unwrap_or_default())
    }

    /// Range with both bounds permuted: dimension `i` moves to `perm[i]`
    pub fn permute(&self, perm: &Permutation) -> Result<Self> {
        ensure!(
            perm.rank() == self.rank(),
            Error::RankMismatch {
                expected: self.rank(),
                got: perm.rank(),
            }
        );
        Ok(Self::from_bounds_unchecked(
            perm.apply(&self.lobound),
            perm.apply(&self.upbound),
        ))
    }

    /// Iterate all coordinates in row-major order
    pub fn iter(&self) -> RangeIter<'_> {
        RangeIter {
            range: self,
            current: if self.is_empty() {
                None
            } else {
                Some(self.lobound.clone())
            },
        }
    }
}

impl fmt::Debug for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Range({:?}, {:?})", self.lobound, self.upbound)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}, {:?})", self.lobound.as_slice(), self.upbound.as_slice())
    }
}

impl<'a> IntoIterator for &'a Range {
    type Item = Dims;
    type IntoIter = RangeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Row-major coordinate iterator over a [`Range`]
#[derive(Debug, Clone)]
pub struct RangeIter<'a> {
    range: &'a Range,
    current: Option<Dims>,
}

impl Iterator for RangeIter<'_> {
    type Item = Dims;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.take()?;
        let mut next = current.clone();

        // Increment the last dimension, carrying into leading dimensions
        let mut d = self.range.rank();
        let mut done = true;
        while d > 0 {
            d -= 1;
            next[d] += 1;
            if next[d] < self.range.upbound[d] {
                done = false;
                break;
            }
            next[d] = self.range.lobound[d];
        }

        if !done {
            self.current = Some(next);
        }
        Some(current)
    }
}
