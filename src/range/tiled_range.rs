//! TiledRange: tilings of every dimension of a tensor

use super::dims::Dims;
use super::range::Range;
use super::tiled_range1::TiledRange1;
use crate::error::{Error, Result, ensure};
use crate::permutation::Permutation;
use std::fmt;

/// Cartesian product of per-dimension tilings.
///
/// Tiles are numbered in row-major order over [`tiles_range`](Self::tiles_range).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TiledRange {
    dims: Vec<TiledRange1>,
    tiles: Range,
    elements: Range,
}

impl TiledRange {
    /// Create a tiled range from one tiling per dimension
    pub fn new(dims: Vec<TiledRange1>) -> Self {
        let tiles = Range::from_extents(&dims.iter().map(TiledRange1::tile_count).collect::<Dims>());
        let elements = Range::from_bounds_unchecked(
            dims.iter().map(TiledRange1::lobound).collect(),
            dims.iter().map(TiledRange1::upbound).collect(),
        );
        Self {
            dims,
            tiles,
            elements,
        }
    }

    /// Create a tiled range from the tile boundaries of each dimension
    ///
    /// # Example
    /// ```
    /// use tilesparse::range::TiledRange;
    /// let tr = TiledRange::from_bounds(&[&[0, 2, 5], &[0, 3]]).unwrap();
    /// assert_eq!(tr.tile_count(), 2);
    /// assert_eq!(tr.tile_volume(1), 9);
    /// ```
    pub fn from_bounds(bounds: &[&[usize]]) -> Result<Self> {
        let dims = bounds
            .iter()
            .map(|b| TiledRange1::new(b.to_vec()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(dims))
    }

    /// Number of dimensions
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Per-dimension tilings
    #[inline]
    pub fn dims(&self) -> &[TiledRange1] {
        &self.dims
    }

    /// Tiling of dimension `d`
    #[inline]
    pub fn dim(&self, d: usize) -> &TiledRange1 {
        &self.dims[d]
    }

    /// Range of tile coordinates, anchored at the origin
    #[inline]
    pub fn tiles_range(&self) -> &Range {
        &self.tiles
    }

    /// Range of element coordinates
    #[inline]
    pub fn elements_range(&self) -> &Range {
        &self.elements
    }

    /// Total number of tiles
    #[inline]
    pub fn tile_count(&self) -> usize {
        self.tiles.volume()
    }

    /// Element range of the tile at tile coordinate `idx`
    pub fn make_tile_range_at(&self, idx: &[usize]) -> Result<Range> {
        self.tiles.checked_ordinal(idx)?;
        let (lobound, upbound): (Vec<usize>, Vec<usize>) = idx
            .iter()
            .zip(self.dims.iter())
            .map(|(&t, dim)| dim.tile(t))
            .unzip();
        Ok(Range::from_bounds_unchecked(
            Dims::from(lobound),
            Dims::from(upbound),
        ))
    }

    /// Element range of tile `ordinal`
    pub fn make_tile_range(&self, ordinal: usize) -> Result<Range> {
        let idx = self.tiles.idx(ordinal).ok_or(Error::IndexOutOfBounds {
            index: ordinal,
            size: self.tile_count(),
        })?;
        self.make_tile_range_at(&idx)
    }

    /// Number of elements in tile `ordinal`.
    ///
    /// # Panics
    ///
    /// Panics if `ordinal >= tile_count()`.
    pub fn tile_volume(&self, ordinal: usize) -> usize {
        let mut rem = ordinal;
        let mut volume = 1usize;
        for (dim, &stride) in self.dims.iter().zip(self.tiles.strides()) {
            volume *= dim.tile_extent(rem / stride);
            rem %= stride;
        }
        volume
    }

    /// Volumes of every tile, indexed by tile ordinal
    pub fn tile_volumes(&self) -> Vec<usize> {
        let mut volumes = vec![1usize];
        for dim in &self.dims {
            volumes = volumes
                .iter()
                .flat_map(|&outer| (0..dim.tile_count()).map(move |t| outer * dim.tile_extent(t)))
                .collect();
        }
        volumes
    }

    /// Tile coordinate of the tile containing element coordinate `element`
    pub fn element_to_tile_idx(&self, element: &[usize]) -> Result<Dims> {
        ensure!(
            element.len() == self.rank(),
            Error::RankMismatch {
                expected: self.rank(),
                got: element.len(),
            }
        );
        element
            .iter()
            .zip(self.dims.iter())
            .map(|(&e, dim)| dim.element_to_tile(e))
            .collect()
    }

    /// Tiled range with dimension `i` moved to `perm[i]`
    pub fn permute(&self, perm: &Permutation) -> Result<Self> {
        ensure!(
            perm.rank() == self.rank(),
            Error::RankMismatch {
                expected: self.rank(),
                got: perm.rank(),
            }
        );
        Ok(Self::new(perm.apply_to(&self.dims)))
    }

    /// Tiled range of the tile block `[lower, upper)`
    pub fn block(&self, lower: &[usize], upper: &[usize]) -> Result<Self> {
        ensure!(
            lower.len() == self.rank() && upper.len() == self.rank(),
            Error::RankMismatch {
                expected: self.rank(),
                got: lower.len().max(upper.len()),
            }
        );
        let dims = self
            .dims
            .iter()
            .zip(lower.iter().zip(upper.iter()))
            .map(|(dim, (&lo, &hi))| dim.slice(lo, hi))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(dims))
    }

    /// Tiled range with `leading` inserted as the new first dimension
    pub fn prepend(&self, leading: TiledRange1) -> Self {
        let mut dims = Vec::with_capacity(self.rank() + 1);
        dims.push(leading);
        dims.extend(self.dims.iter().cloned());
        Self::new(dims)
    }

    /// Tiled range made of dimensions `range` of this one
    pub fn subrange(&self, range: std::ops::Range<usize>) -> Self {
        Self::new(self.dims[range].to_vec())
    }
}

impl fmt::Debug for TiledRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.dims.iter()).finish()
    }
}
