//! Tiles and block tensors

use super::run_tile_tasks;
use super::tile_op::{BinaryTileOp, Operand};
use crate::config::ShapeConfig;
use crate::error::{Error, Result, ensure};
use crate::norm::NormTensor;
use crate::permutation::Permutation;
use crate::range::{Range, TiledRange};
use crate::shape::{OutputOp, Shape};
use num_traits::{Float, NumCast};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Scalar type stored in tiles
pub trait Element: Float + Send + Sync + fmt::Debug + 'static {}

impl<T: Float + Send + Sync + fmt::Debug + 'static> Element for T {}

/// A dense block of elements covering an element [`Range`], stored row-major
#[derive(Clone, Debug, PartialEq)]
pub struct Tile<T> {
    range: Range,
    data: Vec<T>,
}

impl<T: Element> Tile<T> {
    /// Create a tile from its element range and row-major data
    pub fn new(range: Range, data: Vec<T>) -> Result<Self> {
        ensure!(
            data.len() == range.volume(),
            Error::shape_mismatch(&[range.volume()], &[data.len()])
        );
        Ok(Self { range, data })
    }

    /// Tile of zeros
    pub fn zeros(range: Range) -> Self {
        let data = vec![T::zero(); range.volume()];
        Self { range, data }
    }

    /// Tile whose value at each element coordinate is `f(coordinate)`
    pub fn from_fn(range: Range, f: impl Fn(&[usize]) -> T) -> Self {
        let data = range.iter().map(|idx| f(&idx)).collect();
        Self { range, data }
    }

    /// The element range
    #[inline]
    pub fn range(&self) -> &Range {
        &self.range
    }

    /// Elements in row-major order
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consume the tile, returning its elements
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Element at coordinate `idx`
    pub fn get(&self, idx: &[usize]) -> Option<T> {
        self.range.ordinal(idx).map(|ord| self.data[ord])
    }

    /// Frobenius norm
    pub fn norm(&self) -> T {
        self.data.iter().fold(T::zero(), |acc, &v| acc + v * v).sqrt()
    }

    /// Tile whose element at `perm * idx` is this tile's element at `idx`
    pub fn permute(&self, perm: &Permutation) -> Result<Self> {
        let range = self.range.permute(perm)?;
        let inverse = perm.inverse();
        let data = range
            .iter()
            .map(|idx| {
                let src = self.range.ordinal(&inverse.apply(&idx)).unwrap_or_default();
                self.data[src]
            })
            .collect();
        Ok(Self { range, data })
    }

    /// Apply `f` to every element in place
    pub(crate) fn map_inplace(&mut self, f: impl Fn(T) -> T) {
        for v in &mut self.data {
            *v = f(*v);
        }
    }

    /// `self[i] = f(self[i], other[i])` for tiles over the same range
    pub(crate) fn zip_inplace(&mut self, other: &Tile<T>, f: impl Fn(T, T) -> T) -> Result<()> {
        self.check_same_range(other)?;
        for (v, &o) in self.data.iter_mut().zip(&other.data) {
            *v = f(*v, o);
        }
        Ok(())
    }

    pub(crate) fn check_same_range(&self, other: &Tile<T>) -> Result<()> {
        ensure!(
            self.range == other.range,
            Error::invalid_argument(
                "other",
                format!("tile ranges differ: {} vs {}", self.range, other.range),
            )
        );
        Ok(())
    }
}

/// A tiled tensor that stores only the tiles its [`Shape`] marks nonzero.
///
/// Tiles are shared behind [`Arc`], so cloning a tensor never copies data.
#[derive(Clone, Debug)]
pub struct BlockTensor<T> {
    trange: Arc<TiledRange>,
    shape: Shape,
    tiles: BTreeMap<usize, Arc<Tile<T>>>,
}

impl<T: Element> BlockTensor<T> {
    /// Tensor with the given shape and no tiles yet; fill it with [`set`](Self::set)
    pub fn new(trange: impl Into<Arc<TiledRange>>, shape: Shape) -> Result<Self> {
        let trange = trange.into();
        ensure!(
            shape.validate(trange.as_ref()) && shape.trange()?.as_ref() == trange.as_ref(),
            Error::invalid_argument("shape", "shape does not describe this tiled range")
        );
        Ok(Self {
            trange,
            shape,
            tiles: BTreeMap::new(),
        })
    }

    /// Tensor with element values `f(element coordinate)`.
    ///
    /// With a `config` the shape is sparse, computed from the tile norms, and
    /// tiles it marks zero are dropped. Without one the shape is dense.
    pub fn from_fn<F>(
        trange: impl Into<Arc<TiledRange>>,
        config: Option<ShapeConfig>,
        f: F,
    ) -> Result<Self>
    where
        F: Fn(&[usize]) -> T + Sync + Send,
    {
        let trange = trange.into();
        let ordinals: Vec<usize> = (0..trange.tile_count()).collect();
        let tiles = run_tile_tasks(&ordinals, |ord| {
            Ok(Tile::from_fn(trange.make_tile_range(ord)?, &f))
        })?;

        let shape = match config {
            None => Shape::dense(Arc::clone(&trange)),
            Some(config) => {
                let norms = tiles
                    .iter()
                    .map(|(_, tile)| tile.norm().to_f32().unwrap_or(f32::INFINITY))
                    .collect();
                let norms = NormTensor::new(trange.tiles_range().clone(), norms)?;
                Shape::from_tile_norms(&norms, Arc::clone(&trange), config)?
            }
        };
        Self::from_tiles(trange, shape, tiles)
    }

    /// Assemble a tensor, keeping only tiles the shape marks nonzero
    pub(crate) fn from_tiles(
        trange: Arc<TiledRange>,
        shape: Shape,
        tiles: Vec<(usize, Tile<T>)>,
    ) -> Result<Self> {
        let mut kept = BTreeMap::new();
        for (ord, tile) in tiles {
            if !shape.is_zero(ord)? {
                kept.insert(ord, Arc::new(tile));
            }
        }
        Ok(Self {
            trange,
            shape,
            tiles: kept,
        })
    }

    /// The tiled range
    #[inline]
    pub fn trange(&self) -> &Arc<TiledRange> {
        &self.trange
    }

    /// The shape
    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Whether tile `ordinal` is zero according to the shape
    pub fn is_zero(&self, ordinal: usize) -> Result<bool> {
        self.shape.is_zero(ordinal)
    }

    /// Number of stored tiles
    pub fn stored_tiles(&self) -> usize {
        self.tiles.len()
    }

    /// The stored tile at `ordinal`, if any
    pub fn find(&self, ordinal: usize) -> Option<&Arc<Tile<T>>> {
        self.tiles.get(&ordinal)
    }

    /// Stored tiles in ordinal order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Arc<Tile<T>>)> + '_ {
        self.tiles.iter().map(|(&ord, tile)| (ord, tile))
    }

    /// Store `tile` at `ordinal`.
    ///
    /// # Errors
    ///
    /// Returns error if the shape marks the tile zero or the tile's range is
    /// not the range of tile `ordinal`.
    pub fn set(&mut self, ordinal: usize, tile: impl Into<Arc<Tile<T>>>) -> Result<()> {
        let tile = tile.into();
        ensure!(
            !self.shape.is_zero(ordinal)?,
            Error::invalid_argument("ordinal", format!("tile {ordinal} is zero in the shape"))
        );
        let expected = self.trange.make_tile_range(ordinal)?;
        ensure!(
            *tile.range() == expected,
            Error::invalid_argument(
                "tile",
                format!("tile {ordinal} must cover {expected}, got {}", tile.range()),
            )
        );
        self.tiles.insert(ordinal, tile);
        Ok(())
    }

    /// Element at coordinate `idx`; elements of zero tiles read as zero
    pub fn element(&self, idx: &[usize]) -> Result<T> {
        let ord = crate::range::TileIndexSpace::element_to_tile(self.trange.as_ref(), idx)?;
        Ok(self
            .find(ord)
            .and_then(|tile| tile.get(idx))
            .unwrap_or_else(T::zero))
    }

    /// `self + other`
    pub fn add(&self, other: &BlockTensor<T>) -> Result<Self> {
        self.add_with(other, &OutputOp::new())
    }

    /// `self + other`, scaled and permuted by `output`
    pub fn add_with(&self, other: &BlockTensor<T>, output: &OutputOp) -> Result<Self> {
        let shape = self.shape.add_with(&other.shape, output)?;
        self.binary(other, shape, BinaryTileOp::add(), output)
    }

    /// `self - other`
    pub fn subt(&self, other: &BlockTensor<T>) -> Result<Self> {
        self.subt_with(other, &OutputOp::new())
    }

    /// `self - other`, scaled and permuted by `output`
    pub fn subt_with(&self, other: &BlockTensor<T>, output: &OutputOp) -> Result<Self> {
        let shape = self.shape.subt_with(&other.shape, output)?;
        self.binary(other, shape, BinaryTileOp::subt(), output)
    }

    /// Compute the tiles of `shape` that are nonzero, and only those
    fn binary(
        &self,
        other: &BlockTensor<T>,
        shape: Shape,
        op: BinaryTileOp<T>,
        output: &OutputOp,
    ) -> Result<Self> {
        let mut op = op;
        if let Some(factor) = output.factor() {
            let factor = <T as NumCast>::from(factor).ok_or_else(|| {
                Error::invalid_argument("factor", format!("{factor} is not representable"))
            })?;
            op = op.with_factor(factor);
        }
        if let Some(perm) = output.perm() {
            op = op.with_perm(perm.clone());
        }

        let trange = Arc::clone(shape.trange()?);
        let inverse = output.perm().map(Permutation::inverse);
        let nonzero = shape.nonzero_ordinals()?;
        let tiles = run_tile_tasks(&nonzero, |ord| {
            let src = match &inverse {
                None => ord,
                Some(inv) => {
                    let idx = trange.tiles_range().idx(ord).unwrap_or_default();
                    self.trange.tiles_range().checked_ordinal(&inv.apply(&idx))?
                }
            };
            let left = self.find(src).map(|t| Operand::Borrowed(t.as_ref()));
            let right = other.find(src).map(|t| Operand::Borrowed(t.as_ref()));
            if left.is_none() && right.is_none() {
                return Ok(Tile::zeros(trange.make_tile_range(ord)?));
            }
            op.apply(left, right)
        })?;
        debug!(
            tiles = trange.tile_count(),
            computed = tiles.len(),
            "computed nonzero result tiles"
        );
        Self::from_tiles(trange, shape, tiles)
    }
}
