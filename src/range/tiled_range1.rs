//! TiledRange1: the tiling of a single dimension

use crate::error::{Error, Result, ensure};
use std::fmt;

/// Partition of one dimension's element range into contiguous tiles.
///
/// Stored as the tile boundaries `b0 < b1 < ... < bn`; tile `t` covers the
/// elements `[b_t, b_{t+1})`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TiledRange1 {
    bounds: Vec<usize>,
}

impl TiledRange1 {
    /// Create a tiling from its boundaries.
    ///
    /// # Errors
    ///
    /// Returns error if fewer than two boundaries are given or the
    /// boundaries are not strictly increasing.
    pub fn new(bounds: impl Into<Vec<usize>>) -> Result<Self> {
        let bounds = bounds.into();
        ensure!(
            bounds.len() >= 2,
            Error::invalid_argument("bounds", "a tiling needs at least two boundaries")
        );
        ensure!(
            bounds.windows(2).all(|w| w[0] < w[1]),
            Error::invalid_argument(
                "bounds",
                format!("tile boundaries must be strictly increasing, got {bounds:?}"),
            )
        );
        Ok(Self { bounds })
    }

    /// Tile `[0, extent)` with tiles of `block_size` elements; the last tile
    /// may be shorter.
    ///
    /// # Example
    /// ```
    /// use tilesparse::range::TiledRange1;
    /// let tr1 = TiledRange1::uniform(5, 2).unwrap();
    /// assert_eq!(tr1.bounds(), &[0, 2, 4, 5]);
    /// ```
    pub fn uniform(extent: usize, block_size: usize) -> Result<Self> {
        ensure!(
            block_size > 0,
            Error::invalid_argument("block_size", "must be at least 1")
        );
        ensure!(
            extent > 0,
            Error::invalid_argument("extent", "cannot tile an empty dimension")
        );
        let mut bounds: Vec<usize> = (0..extent).step_by(block_size).collect();
        bounds.push(extent);
        Self::new(bounds)
    }

    /// Tile boundaries
    #[inline]
    pub fn bounds(&self) -> &[usize] {
        &self.bounds
    }

    /// Number of tiles
    #[inline]
    pub fn tile_count(&self) -> usize {
        self.bounds.len() - 1
    }

    /// First element
    #[inline]
    pub fn lobound(&self) -> usize {
        self.bounds[0]
    }

    /// One past the last element
    #[inline]
    pub fn upbound(&self) -> usize {
        self.bounds[self.bounds.len() - 1]
    }

    /// Number of elements
    #[inline]
    pub fn extent(&self) -> usize {
        self.upbound() - self.lobound()
    }

    /// Element range `[lo, hi)` of tile `t`
    ///
    /// # Panics
    ///
    /// Panics if `t >= tile_count()`.
    #[inline]
    pub fn tile(&self, t: usize) -> (usize, usize) {
        (self.bounds[t], self.bounds[t + 1])
    }

    /// Number of elements in tile `t`
    #[inline]
    pub fn tile_extent(&self, t: usize) -> usize {
        self.bounds[t + 1] - self.bounds[t]
    }

    /// Index of the tile containing element `element`
    pub fn element_to_tile(&self, element: usize) -> Result<usize> {
        ensure!(
            element >= self.lobound() && element < self.upbound(),
            Error::IndexOutOfBounds {
                index: element,
                size: self.upbound(),
            }
        );
        // Number of boundaries <= element, minus the leading one
        Ok(self.bounds.partition_point(|&b| b <= element) - 1)
    }

    /// Tiling of tiles `[lower, upper)`, keeping their element bounds
    pub fn slice(&self, lower: usize, upper: usize) -> Result<Self> {
        ensure!(
            lower < upper && upper <= self.tile_count(),
            Error::invalid_argument(
                "upper",
                format!(
                    "tile block [{lower}, {upper}) is not a non-empty sub-range of [0, {})",
                    self.tile_count()
                ),
            )
        );
        Ok(Self {
            bounds: self.bounds[lower..=upper].to_vec(),
        })
    }
}

impl fmt::Debug for TiledRange1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TiledRange1{:?}", self.bounds)
    }
}
