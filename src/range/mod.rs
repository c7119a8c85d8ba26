//! Tile index spaces
//!
//! A tensor's element index space is partitioned, per dimension, into
//! contiguous tiles. Shapes only ever read this partition: they need the
//! number of tiles, the element range and volume of each tile, and the map
//! from an element coordinate to the tile that contains it.
//!
//! [`TileIndexSpace`] is that read-only interface; [`TiledRange`] is the
//! in-crate implementation.

mod dims;
mod range;
mod tiled_range;
mod tiled_range1;

pub use dims::Dims;
pub use range::{Range, RangeIter};
pub use tiled_range::TiledRange;
pub use tiled_range1::TiledRange1;

use crate::error::Result;

/// Read-only view of a tiled index space
pub trait TileIndexSpace {
    /// Number of dimensions
    fn rank(&self) -> usize;

    /// Number of tiles along each dimension
    fn tile_extents(&self) -> Dims;

    /// Total number of tiles
    fn tile_count(&self) -> usize {
        self.tile_extents().product()
    }

    /// Element range `[lo, hi)` of tile `ordinal`
    fn tile_range(&self, ordinal: usize) -> Result<Range>;

    /// Number of elements in tile `ordinal`
    fn volume(&self, ordinal: usize) -> Result<usize> {
        Ok(self.tile_range(ordinal)?.volume())
    }

    /// Ordinal of the tile containing element coordinate `element`
    fn element_to_tile(&self, element: &[usize]) -> Result<usize>;
}

impl TileIndexSpace for TiledRange {
    fn rank(&self) -> usize {
        TiledRange::rank(self)
    }

    fn tile_extents(&self) -> Dims {
        self.tiles_range().extents()
    }

    fn tile_count(&self) -> usize {
        TiledRange::tile_count(self)
    }

    fn tile_range(&self, ordinal: usize) -> Result<Range> {
        self.make_tile_range(ordinal)
    }

    fn element_to_tile(&self, element: &[usize]) -> Result<usize> {
        let idx = self.element_to_tile_idx(element)?;
        self.tiles_range().checked_ordinal(&idx)
    }
}
