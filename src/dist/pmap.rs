//! Ownership of tiles across the participants of a group

use crate::error::{Error, Result, ensure};

/// Assigns contiguous blocks of tile ordinals to ranks.
///
/// With `n` tiles and `p` ranks each block holds `ceil(n / p)` tiles; the
/// trailing ranks may own fewer tiles, or none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockedPmap {
    tiles: usize,
    size: usize,
    rank: usize,
    block_size: usize,
}

impl BlockedPmap {
    /// Ownership map of `tiles` tiles for participant `rank` of a group of `size`
    pub fn new(tiles: usize, rank: usize, size: usize) -> Result<Self> {
        ensure!(
            size > 0,
            Error::invalid_argument("size", "a group needs at least one participant")
        );
        ensure!(rank < size, Error::IndexOutOfBounds { index: rank, size });
        Ok(Self {
            tiles,
            size,
            rank,
            block_size: tiles.div_ceil(size).max(1),
        })
    }

    /// Ownership map for the calling participant of `comm`
    pub fn for_comm<C: super::Communicator + ?Sized>(tiles: usize, comm: &C) -> Result<Self> {
        Self::new(tiles, comm.rank(), comm.size())
    }

    /// Number of tiles mapped
    #[inline]
    pub fn tiles(&self) -> usize {
        self.tiles
    }

    /// Rank of the participant that owns tile `ordinal`
    #[inline]
    pub fn owner(&self, ordinal: usize) -> usize {
        ordinal / self.block_size
    }

    /// Whether the local participant owns tile `ordinal`
    #[inline]
    pub fn is_local(&self, ordinal: usize) -> bool {
        ordinal < self.tiles && self.owner(ordinal) == self.rank
    }

    /// Tile ordinals owned by the local participant
    pub fn local_ordinals(&self) -> std::ops::Range<usize> {
        let lo = (self.rank * self.block_size).min(self.tiles);
        let hi = (lo + self.block_size).min(self.tiles);
        lo..hi
    }
}
