//! Elementwise shape algebra: scale, add, subtract, constant shifts, multiply

use super::OutputOp;
use super::repr::{Shape, View};
use crate::error::{Error, Result, ensure};
use crate::range::TiledRange;

/// Require two operands to be tiled identically
pub(super) fn check_same_tiling(left: &TiledRange, right: &TiledRange) -> Result<()> {
    let (l, r) = (left.tiles_range().extents(), right.tiles_range().extents());
    ensure!(l == r, Error::shape_mismatch(&l, &r));
    ensure!(
        left == right,
        Error::invalid_argument("other", format!("tilings differ: {left:?} vs {right:?}"))
    );
    Ok(())
}

/// Require two sparse operands to share a zero threshold
pub(super) fn check_same_threshold(left: f32, right: f32) -> Result<()> {
    ensure!(
        left == right,
        Error::ThresholdMismatch {
            lhs: left,
            rhs: right,
        }
    );
    Ok(())
}

fn check_const(value: f32) -> Result<()> {
    ensure!(
        value.is_finite(),
        Error::invalid_argument("value", format!("constant must be finite, got {value}"))
    );
    Ok(())
}

impl Shape {
    /// Apply `f(left, right, volume)` to every tile, then `output`.
    ///
    /// `right` is 0 for unary operations. Any dense operand makes the result
    /// dense.
    pub(super) fn elementwise<F>(
        &self,
        other: Option<&Shape>,
        output: &OutputOp,
        op: &'static str,
        f: F,
    ) -> Result<Shape>
    where
        F: Fn(f32, f32, f32) -> f32 + Sync + Send,
    {
        let left = self.view(op)?;
        let right = other.map(|s| s.view(op)).transpose()?;
        let scale = output.magnitude()?;
        let trange = left.trange();
        if let Some(right) = &right {
            check_same_tiling(trange, right.trange())?;
        }

        let (left, right) = match (left, right) {
            (View::Sparse(l), None) => (l, None),
            (View::Sparse(l), Some(View::Sparse(r))) => {
                check_same_threshold(l.config.threshold(), r.config.threshold())?;
                (l, Some(r))
            }
            _ => return Shape::finish(trange, None, output.perm()),
        };

        let volumes = trange.tile_volumes();
        let norms = match right {
            None => left
                .norms
                .map(|ord, l| f(l, 0.0, volumes[ord] as f32) * scale),
            Some(right) => left.norms.zip_map(&right.norms, |ord, l, r| {
                f(l, r, volumes[ord] as f32) * scale
            })?,
        };
        Shape::finish(trange, Some((norms, left.config)), output.perm())
    }

    /// Bound of `factor * self`
    pub fn scale(&self, factor: f32) -> Result<Shape> {
        self.scale_with(&OutputOp::scaled(factor))
    }

    /// Bound of `self` scaled and permuted by `output`
    pub fn scale_with(&self, output: &OutputOp) -> Result<Shape> {
        self.elementwise(None, output, "scale", |l, _, _| l)
    }

    /// Bound of `self + other`
    ///
    /// # Example
    /// ```
    /// use tilesparse::prelude::*;
    /// let trange = TiledRange::from_bounds(&[&[0, 2, 4]])?;
    /// let norms = |v: Vec<f32>| NormTensor::new(Range::from_extents(&[2]), v);
    /// let a = Shape::from_tile_norms(&norms(vec![2.0, 0.0])?, trange.clone(), ShapeConfig::default())?;
    /// let b = Shape::from_tile_norms(&norms(vec![4.0, 0.0])?, trange, ShapeConfig::default())?;
    /// let sum = a.add(&b)?;
    /// assert_eq!(sum.get(0)?, 3.0);
    /// assert!(sum.is_zero(1)?);
    /// # Ok::<(), tilesparse::error::Error>(())
    /// ```
    pub fn add(&self, other: &Shape) -> Result<Shape> {
        self.add_with(other, &OutputOp::new())
    }

    /// Bound of `self + other`, scaled and permuted by `output`
    pub fn add_with(&self, other: &Shape, output: &OutputOp) -> Result<Shape> {
        self.elementwise(Some(other), output, "add", |l, r, _| l + r)
    }

    /// Bound of `self - other`
    pub fn subt(&self, other: &Shape) -> Result<Shape> {
        self.subt_with(other, &OutputOp::new())
    }

    /// Bound of `self - other`, scaled and permuted by `output`
    pub fn subt_with(&self, other: &Shape, output: &OutputOp) -> Result<Shape> {
        // |a - b| <= |a| + |b|
        self.elementwise(Some(other), output, "subt", |l, r, _| l + r)
    }

    /// Bound of `self + value` with `value` added to every element
    pub fn add_const(&self, value: f32) -> Result<Shape> {
        self.add_const_with(value, &OutputOp::new())
    }

    /// Bound of `self + value`, scaled and permuted by `output`
    pub fn add_const_with(&self, value: f32, output: &OutputOp) -> Result<Shape> {
        check_const(value)?;
        self.elementwise(None, output, "add_const", move |l, _, vol| {
            l + const_norm(value, vol)
        })
    }

    /// Bound of `self - value` with `value` subtracted from every element
    pub fn subt_const(&self, value: f32) -> Result<Shape> {
        self.subt_const_with(value, &OutputOp::new())
    }

    /// Bound of `self - value`, scaled and permuted by `output`
    pub fn subt_const_with(&self, value: f32, output: &OutputOp) -> Result<Shape> {
        check_const(value)?;
        self.elementwise(None, output, "subt_const", move |l, _, vol| {
            l + const_norm(value, vol)
        })
    }

    /// Bound of the elementwise (Hadamard) product `self .* other`
    pub fn mult(&self, other: &Shape) -> Result<Shape> {
        self.mult_with(other, &OutputOp::new())
    }

    /// Bound of `self .* other`, scaled and permuted by `output`
    pub fn mult_with(&self, other: &Shape, output: &OutputOp) -> Result<Shape> {
        // ||a .* b|| <= ||a|| ||b||, rescaled by one volume
        self.elementwise(Some(other), output, "mult", |l, r, vol| l * r * vol)
    }
}

/// Scaled norm of a tile of `vol` elements all equal to `value`
#[inline]
fn const_norm(value: f32, vol: f32) -> f32 {
    (value * value * vol).sqrt() / vol
}
