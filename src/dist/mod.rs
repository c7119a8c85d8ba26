//! Distributed shape construction
//!
//! A tensor distributed over a process group has each tile's norm computed by
//! the participant that owns the tile. [`Shape::reduce_tile_norms`] combines
//! those partial results with one collective sum, so every participant ends
//! up with the same shape.
//!
//! [`Communicator`] is the process-group seam. [`SelfComm`] covers the
//! single-process case and [`LocalGroup`] runs a group of threads inside one
//! process. [`BlockedPmap`] decides which participant owns which tile.
//!
//! [`Shape::reduce_tile_norms`]: crate::shape::Shape::reduce_tile_norms

mod comm;
mod pmap;
mod shape;

pub use comm::{Communicator, LocalGroup, SelfComm};
pub use pmap::BlockedPmap;
