//! Tile shapes: per-tile magnitude bounds and zero tests
//!
//! A [`Shape`] decides, for every tile of a tiled tensor, whether the tile is
//! negligible. Sparse shapes store a scaled Frobenius norm per tile,
//!
//! ```text
//! stored[t] = ||tile_t||_F / volume(t)
//! ```
//!
//! i.e. an average per-element magnitude, and treat tiles whose stored value
//! falls below the configured zero threshold as zero. Dense shapes store
//! nothing and report every tile as nonzero.
//!
//! # Bound propagation
//!
//! Shape algebra mirrors tensor algebra without touching tile data. Every
//! operation maps stored values to a sound *upper bound* on the stored value
//! of the result:
//!
//! | operation        | result\[t\]                                   |
//! |------------------|-----------------------------------------------|
//! | `scale(c)`       | `l[t] * |c|`                                  |
//! | `add`, `subt`    | `l[t] + r[t]`                                 |
//! | `add_const(c)`   | `l[t] + sqrt(c² · vol(t)) / vol(t)`           |
//! | `mult`           | `l[t] * r[t] * vol(t)`                        |
//! | `gemm`           | contraction of unscaled norms, rescaled       |
//!
//! Every result is re-thresholded. Shapes are immutable; each operation
//! returns a new shape that inherits the left operand's [`ShapeConfig`].
//!
//! [`ShapeConfig`]: crate::config::ShapeConfig

mod algebra;
mod contraction;
mod repr;
mod structure;

pub use repr::Shape;
pub(crate) use repr::{check_norm_values, check_tile_extents, scatter_sparse_norms};

use crate::error::{Error, Result, ensure};
use crate::permutation::Permutation;

/// How the output of a shape operation is scaled and laid out.
///
/// `factor` multiplies every result value by `|factor|`; `perm` moves the
/// value computed at tile coordinate `idx` to `perm * idx`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputOp {
    factor: Option<f32>,
    perm: Option<Permutation>,
}

impl OutputOp {
    /// No scaling, no permutation
    pub fn new() -> Self {
        Self::default()
    }

    /// Scale the result by `|factor|`
    pub fn scaled(factor: f32) -> Self {
        Self::new().with_factor(factor)
    }

    /// Permute the result
    pub fn permuted(perm: Permutation) -> Self {
        Self::new().with_perm(perm)
    }

    /// Set the scale factor
    pub fn with_factor(mut self, factor: f32) -> Self {
        self.factor = Some(factor);
        self
    }

    /// Set the permutation
    pub fn with_perm(mut self, perm: Permutation) -> Self {
        self.perm = Some(perm);
        self
    }

    /// The scale factor, if any
    pub fn factor(&self) -> Option<f32> {
        self.factor
    }

    /// The permutation, if any
    pub fn perm(&self) -> Option<&Permutation> {
        self.perm.as_ref()
    }

    /// Multiplier applied to bounds: the magnitude of the factor
    pub(crate) fn magnitude(&self) -> Result<f32> {
        let magnitude = self.factor.map_or(1.0, f32::abs);
        ensure!(
            magnitude.is_finite(),
            Error::invalid_argument("factor", format!("must be finite, got {magnitude}"))
        );
        Ok(magnitude)
    }
}
