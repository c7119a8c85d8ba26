//! Structural shape operations: permute, block, mask, transform

use super::OutputOp;
use super::algebra::{check_same_threshold, check_same_tiling};
use super::repr::{Shape, View};
use crate::error::{Error, Result, ensure};
use crate::permutation::Permutation;
use std::sync::Arc;

impl Shape {
    /// Shape whose tile at `perm * idx` is this shape's tile at `idx`
    pub fn permute(&self, perm: &Permutation) -> Result<Shape> {
        self.scale_with(&OutputOp::permuted(perm.clone()))
    }

    /// Sub-shape of the tiles `lower <= idx < upper`, re-indexed to the origin
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] unless `lower < upper` in every
    /// dimension and `upper` lies within the tile extents.
    pub fn block(&self, lower: &[usize], upper: &[usize]) -> Result<Shape> {
        self.block_with(lower, upper, &OutputOp::new())
    }

    /// Sub-shape of the tiles `lower <= idx < upper`, scaled and permuted by `output`
    pub fn block_with(&self, lower: &[usize], upper: &[usize], output: &OutputOp) -> Result<Shape> {
        let view = self.view("block")?;
        let scale = output.magnitude()?;
        let trange = view.trange();
        let tiles = trange.tiles_range();
        let rank = tiles.rank();
        ensure!(
            lower.len() == rank && upper.len() == rank,
            Error::RankMismatch {
                expected: rank,
                got: if lower.len() != rank { lower.len() } else { upper.len() },
            }
        );
        for d in 0..rank {
            ensure!(
                lower[d] < upper[d],
                Error::invalid_argument(
                    "lower",
                    format!("lower bound {lower:?} must be less than upper bound {upper:?}"),
                )
            );
            ensure!(
                upper[d] <= tiles.extent(d),
                Error::invalid_argument(
                    "upper",
                    format!("upper bound {upper:?} exceeds tile extents {:?}", tiles.extents().as_slice()),
                )
            );
        }

        let block_trange = Arc::new(trange.block(lower, upper)?);
        let norms = match view {
            View::Dense(_) => None,
            View::Sparse(data) => {
                let block = data.norms.block(lower, upper)?;
                let block = if scale == 1.0 {
                    block
                } else {
                    block.map(|_, v| v * scale)
                };
                Some((block, data.config))
            }
        };
        Shape::finish(&block_trange, norms, output.perm())
    }

    /// Zero every tile that is nonzero here but zero in `mask`.
    ///
    /// A dense mask leaves this shape unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DenseShape`] when this shape is dense and `mask` is
    /// sparse, since a dense shape has no tile values to zero.
    pub fn mask(&self, mask: &Shape) -> Result<Shape> {
        let this = self.view("mask")?;
        let other = mask.view("mask")?;
        check_same_tiling(this.trange(), other.trange())?;
        let (this, other) = match (this, other) {
            (View::Sparse(this), View::Sparse(other)) => (this, other),
            (_, View::Dense(_)) => return Ok(self.clone()),
            (View::Dense(_), View::Sparse(_)) => {
                return Err(crate::error::violation(Error::DenseShape { op: "mask" }));
            }
        };
        check_same_threshold(this.config.threshold(), other.config.threshold())?;
        let config = this.config;
        let norms = this.norms.zip_map(&other.norms, |_, l, r| {
            if !config.is_zero(l) && config.is_zero(r) { 0.0 } else { l }
        })?;
        Shape::finish(&this.trange, Some((norms, config)), None)
    }

    /// Apply `f(ordinal, value)` to every stored value, then re-threshold.
    ///
    /// # Errors
    ///
    /// Returns error on empty or dense shapes, or if `f` produces a negative
    /// or non-finite value.
    pub fn transform<F>(&self, f: F) -> Result<Shape>
    where
        F: Fn(usize, f32) -> f32 + Sync + Send,
    {
        let data = match self.view("transform")? {
            View::Sparse(data) => data,
            View::Dense(_) => {
                return Err(crate::error::violation(Error::DenseShape { op: "transform" }));
            }
        };
        let norms = data.norms.map(f);
        Shape::finish(&data.trange, Some((norms, data.config)), None)
    }
}
