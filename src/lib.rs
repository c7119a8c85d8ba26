//! # tilesparse
//!
//! **Shape metadata for block-sparse tiled tensors.**
//!
//! A tiled tensor is partitioned into rectangular tiles. tilesparse keeps one
//! scaled Frobenius norm per tile and uses it to decide which tiles are
//! negligible, so that an algorithm can skip them without ever looking at
//! their data.
//!
//! ## Features
//!
//! - **Shapes**: dense or sparse per-tile norm bounds with a configurable zero threshold
//! - **Shape algebra**: scale, add, subtract, multiply, contract, permute, block and mask,
//!   each producing a sound upper bound on the result's tile norms
//! - **Distributed construction**: one collective sum turns per-participant norms into
//!   the same shape on every participant
//! - **Fusion**: stack identically tiled tensors along a new leading dimension and split
//!   them back, with their shapes
//!
//! ## Quick Start
//!
//! ```
//! use tilesparse::prelude::*;
//!
//! let trange = TiledRange::from_bounds(&[&[0, 2, 4], &[0, 3, 6]])?;
//! let norms = NormTensor::new(trange.tiles_range().clone(), vec![6.0, 0.0, 0.0, 12.0])?;
//! let shape = Shape::from_tile_norms(&norms, trange, ShapeConfig::default())?;
//!
//! assert_eq!(shape.get(0)?, 1.0);
//! assert!(shape.is_zero(1)?);
//! assert_eq!(shape.add(&shape)?.get(3)?, 4.0);
//! # Ok::<(), tilesparse::error::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): multi-threaded tile tasks and large norm kernels
//! - `abort-on-error`: precondition violations panic where they are detected

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod dist;
pub mod error;
pub mod fusion;
pub mod norm;
pub mod permutation;
pub mod range;
pub mod shape;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::ShapeConfig;
    pub use crate::dist::{BlockedPmap, Communicator, LocalGroup, SelfComm};
    pub use crate::error::{Error, Result};
    pub use crate::fusion::{
        BlockTensor, Tile, fuse_block_tensors, fuse_shapes, fuse_tiled_ranges, split_block_tensor,
        split_shape,
    };
    pub use crate::norm::{ContractionPlan, NormTensor};
    pub use crate::permutation::Permutation;
    pub use crate::range::{Range, TileIndexSpace, TiledRange, TiledRange1};
    pub use crate::shape::{OutputOp, Shape};
}
