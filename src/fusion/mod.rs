//! Block tensors and their fusion
//!
//! [`BlockTensor`] is a minimal tiled tensor: a [`Shape`] plus the tiles it
//! marks nonzero. It exists to carry shapes through real data.
//!
//! [`fuse_block_tensors`] stacks `n` identically tiled tensors into one
//! tensor with a new leading dimension of extent `n`, tiled in blocks of
//! `B`. [`split_block_tensor`] recovers any one of them. The shape
//! counterparts are [`fuse_shapes`] and [`split_shape`].
//!
//! [`Shape`]: crate::shape::Shape

mod fuse;
mod tensor;
mod tile_op;

pub use fuse::{fuse_block_tensors, fuse_shapes, fuse_tiled_ranges, split_block_tensor, split_shape};
pub use tensor::{BlockTensor, Element, Tile};
pub use tile_op::{BinaryKind, BinaryTileOp, Operand};

use crate::error::Result;
use tracing::trace;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Compute one tile per ordinal, on the rayon pool when enabled.
///
/// Results come back in the order of `ordinals`; the first error wins.
pub(crate) fn run_tile_tasks<T, F>(ordinals: &[usize], task: F) -> Result<Vec<(usize, Tile<T>)>>
where
    T: Send,
    F: Fn(usize) -> Result<Tile<T>> + Sync + Send,
{
    let run = |&ord: &usize| {
        trace!(ordinal = ord, "tile task");
        task(ord).map(|tile| (ord, tile))
    };

    #[cfg(feature = "rayon")]
    {
        ordinals.par_iter().map(run).collect()
    }

    #[cfg(not(feature = "rayon"))]
    {
        ordinals.iter().map(run).collect()
    }
}
