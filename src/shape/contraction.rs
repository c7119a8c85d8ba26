//! Contraction (gemm) of shapes

use super::OutputOp;
use super::algebra::check_same_threshold;
use super::repr::{Shape, View};
use crate::error::{Error, Result, ensure};
use crate::norm::ContractionPlan;
use crate::range::TiledRange;
use std::sync::Arc;
use tracing::trace;

/// Tiled range of the result of contracting `left` with `right`
fn contract_tiled_ranges(
    left: &TiledRange,
    right: &TiledRange,
    plan: &ContractionPlan,
) -> Result<TiledRange> {
    plan.check(&left.tiles_range().extents(), &right.tiles_range().extents())?;
    let outer = plan.left_outer_rank();
    let k = plan.num_contract_ranks();
    ensure!(
        left.dims()[outer..] == right.dims()[..k],
        Error::invalid_argument(
            "other",
            format!(
                "contracted tilings differ: {:?} vs {:?}",
                &left.dims()[outer..],
                &right.dims()[..k]
            ),
        )
    );
    let dims = left.dims()[..outer]
        .iter()
        .chain(&right.dims()[k..])
        .cloned()
        .collect();
    Ok(TiledRange::new(dims))
}

impl Shape {
    /// Bound of `factor * self * other`, contracting per `plan`.
    ///
    /// The trailing `plan.num_contract_ranks()` tile dimensions of `self` are
    /// contracted with the leading ones of `other`; their tilings must agree.
    pub fn gemm(&self, other: &Shape, factor: f32, plan: &ContractionPlan) -> Result<Shape> {
        self.gemm_with(other, plan, &OutputOp::scaled(factor))
    }

    /// Bound of `self * other` contracted per `plan`, scaled and permuted by `output`
    pub fn gemm_with(
        &self,
        other: &Shape,
        plan: &ContractionPlan,
        output: &OutputOp,
    ) -> Result<Shape> {
        let left = self.view("gemm")?;
        let right = other.view("gemm")?;
        let scale = output.magnitude()?;
        let trange = Arc::new(contract_tiled_ranges(left.trange(), right.trange(), plan)?);

        let (left, right) = match (left, right) {
            (View::Sparse(l), View::Sparse(r)) => (l, r),
            _ => return Shape::finish(&trange, None, output.perm()),
        };
        check_same_threshold(left.config.threshold(), right.config.threshold())?;

        let left_volumes = left.trange.tile_volumes();
        let right_volumes = right.trange.tile_volumes();
        let left_norms = left.norms.map(|ord, v| v * left_volumes[ord] as f32);
        let right_norms = right.norms.map(|ord, v| v * right_volumes[ord] as f32);
        let product = left_norms.gemm(&right_norms, scale, plan)?;

        let volumes = trange.tile_volumes();
        let norms = product.map(|ord, v| v / volumes[ord] as f32);
        trace!(
            left_tiles = left_volumes.len(),
            right_tiles = right_volumes.len(),
            result_tiles = volumes.len(),
            "contracted shapes"
        );
        Shape::finish(&trange, Some((norms, left.config)), output.perm())
    }
}
