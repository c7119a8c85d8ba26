//! Shape representation, constructors and queries

use crate::config::ShapeConfig;
use crate::error::{Error, Result, ensure};
use crate::norm::NormTensor;
use crate::permutation::Permutation;
use crate::range::{TileIndexSpace, TiledRange};
use std::sync::Arc;
use tracing::{debug, trace};

/// Per-tile zero/nonzero metadata of a tiled tensor.
///
/// Cloning is cheap: the norm tensor and tiled range are shared.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shape {
    kind: Kind,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(super) enum Kind {
    #[default]
    Empty,
    Dense(Arc<TiledRange>),
    Sparse(Arc<SparseData>),
}

#[derive(Debug, PartialEq)]
pub(super) struct SparseData {
    pub(super) trange: Arc<TiledRange>,
    pub(super) norms: NormTensor,
    pub(super) zero_count: usize,
    pub(super) config: ShapeConfig,
}

/// Non-empty view of a shape's contents
pub(super) enum View<'a> {
    Dense(&'a Arc<TiledRange>),
    Sparse(&'a SparseData),
}

impl<'a> View<'a> {
    pub(super) fn trange(&self) -> &'a Arc<TiledRange> {
        match *self {
            View::Dense(trange) => trange,
            View::Sparse(data) => &data.trange,
        }
    }
}

impl Shape {
    /// Shape of a dense tensor: every tile is nonzero
    pub fn dense(trange: impl Into<Arc<TiledRange>>) -> Self {
        Self {
            kind: Kind::Dense(trange.into()),
        }
    }

    /// Build a sparse shape from raw per-tile Frobenius norms.
    ///
    /// Stored values are `tile_norms[t] / volume(t)`; values below the
    /// threshold of `config` are set to exactly zero.
    ///
    /// # Errors
    ///
    /// Returns error if the extents of `tile_norms` differ from the tile
    /// extents of `trange`, or if any norm is negative or not finite.
    ///
    /// # Example
    /// ```
    /// use tilesparse::prelude::*;
    /// let trange = TiledRange::from_bounds(&[&[0, 2, 4], &[0, 3]])?;
    /// let norms = NormTensor::new(Range::from_extents(&[2, 1]), vec![12.0, 0.0])?;
    /// let shape = Shape::from_tile_norms(&norms, trange, ShapeConfig::default())?;
    /// assert_eq!(shape.get(0)?, 2.0);
    /// assert!(shape.is_zero(1)?);
    /// assert_eq!(shape.sparsity()?, 0.5);
    /// # Ok::<(), tilesparse::error::Error>(())
    /// ```
    pub fn from_tile_norms(
        tile_norms: &NormTensor,
        trange: impl Into<Arc<TiledRange>>,
        config: ShapeConfig,
    ) -> Result<Self> {
        let trange = trange.into();
        check_tile_extents(tile_norms, &trange)?;
        check_norm_values(tile_norms.as_slice())?;

        let volumes = trange.tile_volumes();
        let scaled = tile_norms.map(|ord, raw| raw / volumes[ord] as f32);
        let shape = Self::from_parts(trange, scaled, config);
        debug!(
            tiles = tile_norms.len(),
            zero_tiles = shape.zero_count_unchecked(),
            threshold = config.threshold(),
            "built shape from tile norms"
        );
        Ok(shape)
    }

    /// Build a sparse shape from `(tile coordinate, raw norm)` pairs.
    ///
    /// Tiles that are not listed have norm zero. The result is identical to
    /// [`from_tile_norms`](Self::from_tile_norms) on the equivalent dense input.
    ///
    /// # Errors
    ///
    /// Returns error if a coordinate lies outside the tiles range or is listed
    /// twice, or if a norm is negative or not finite.
    pub fn from_sparse_norms<I: AsRef<[usize]>>(
        tile_norms: &[(I, f32)],
        trange: impl Into<Arc<TiledRange>>,
        config: ShapeConfig,
    ) -> Result<Self> {
        let trange = trange.into();
        let dense = scatter_sparse_norms(tile_norms, &trange)?;
        Self::from_tile_norms(&dense, trange, config)
    }

    /// Build a sparse shape from norms that are already scaled by tile volume.
    ///
    /// Only thresholding is applied.
    pub fn from_scaled_norms(
        norms: NormTensor,
        trange: impl Into<Arc<TiledRange>>,
        config: ShapeConfig,
    ) -> Result<Self> {
        let trange = trange.into();
        check_tile_extents(&norms, &trange)?;
        check_norm_values(norms.as_slice())?;
        let shape = Self::from_parts(trange, norms, config);
        debug!(
            tiles = shape.tile_count_unchecked(),
            zero_tiles = shape.zero_count_unchecked(),
            "built shape from scaled norms"
        );
        Ok(shape)
    }

    /// Threshold `norms` and wrap them into a sparse shape.
    ///
    /// `norms` must already match the tile extents of `trange`.
    pub(super) fn from_parts(trange: Arc<TiledRange>, norms: NormTensor, config: ShapeConfig) -> Self {
        let norms = norms.map(|_, v| config.canonicalize(v));
        let zero_count = norms.iter().filter(|&v| config.is_zero(v)).count();
        trace!(tiles = norms.len(), zero_count, "thresholded shape");
        Self {
            kind: Kind::Sparse(Arc::new(SparseData {
                trange,
                norms,
                zero_count,
                config,
            })),
        }
    }

    /// Like [`from_parts`](Self::from_parts), moving each value at `idx` to
    /// `perm * idx` first. `norms` is `None` for a dense result, which only
    /// has its tiled range permuted.
    ///
    /// Computed norms that are negative or not finite (an overflowing
    /// product, say) are rejected with [`Error::InvalidNorm`].
    pub(super) fn finish(
        trange: &Arc<TiledRange>,
        norms: Option<(NormTensor, ShapeConfig)>,
        perm: Option<&Permutation>,
    ) -> Result<Self> {
        if let Some(p) = perm {
            ensure!(
                p.rank() == trange.rank(),
                Error::RankMismatch {
                    expected: trange.rank(),
                    got: p.rank(),
                }
            );
        }
        let perm = perm.filter(|p| !p.is_identity());
        let trange = match perm {
            Some(p) => Arc::new(trange.permute(p)?),
            None => Arc::clone(trange),
        };
        match norms {
            None => Ok(Self::dense(trange)),
            Some((norms, config)) => {
                check_norm_values(norms.as_slice())?;
                let norms = match perm {
                    Some(p) => norms.permute(p)?,
                    None => norms,
                };
                Ok(Self::from_parts(trange, norms, config))
            }
        }
    }

    /// Contents of a non-empty shape; `op` names the operation for errors
    pub(super) fn view(&self, op: &'static str) -> Result<View<'_>> {
        match &self.kind {
            Kind::Empty => Err(crate::error::violation(Error::EmptyShape { op })),
            Kind::Dense(trange) => Ok(View::Dense(trange)),
            Kind::Sparse(data) => Ok(View::Sparse(data)),
        }
    }

    /// Norm data of a sparse shape
    fn sparse(&self, op: &'static str) -> Result<&SparseData> {
        match self.view(op)? {
            View::Sparse(data) => Ok(data),
            View::Dense(_) => Err(crate::error::violation(Error::DenseShape { op })),
        }
    }

    fn zero_count_unchecked(&self) -> usize {
        match &self.kind {
            Kind::Sparse(data) => data.zero_count,
            _ => 0,
        }
    }

    fn tile_count_unchecked(&self) -> usize {
        match &self.kind {
            Kind::Empty => 0,
            Kind::Dense(trange) => trange.tile_count(),
            Kind::Sparse(data) => data.norms.len(),
        }
    }

    /// Whether this is a default-constructed shape with no tile information
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self.kind, Kind::Empty)
    }

    /// Whether every tile is implicitly nonzero
    #[inline]
    pub fn is_dense(&self) -> bool {
        matches!(self.kind, Kind::Dense(_))
    }

    /// Whether this shape can describe a tensor tiled by `space`.
    ///
    /// False for empty shapes and for mismatched tile extents.
    pub fn validate<S: TileIndexSpace + ?Sized>(&self, space: &S) -> bool {
        let trange = match &self.kind {
            Kind::Empty => return false,
            Kind::Dense(trange) => trange,
            Kind::Sparse(data) => &data.trange,
        };
        trange.tiles_range().extents() == space.tile_extents()
    }

    /// The tiled range this shape describes
    pub fn trange(&self) -> Result<&Arc<TiledRange>> {
        Ok(self.view("trange")?.trange())
    }

    /// The zero threshold of a sparse shape
    pub fn threshold(&self) -> Result<f32> {
        Ok(self.sparse("threshold")?.config.threshold())
    }

    /// The configuration of a sparse shape
    pub fn config(&self) -> Result<ShapeConfig> {
        Ok(self.sparse("config")?.config)
    }

    /// Total number of tiles
    pub fn tile_count(&self) -> Result<usize> {
        Ok(self.view("tile_count")?.trange().tile_count())
    }

    fn check_ordinal(&self, ordinal: usize, op: &'static str) -> Result<View<'_>> {
        let view = self.view(op)?;
        let size = view.trange().tile_count();
        ensure!(ordinal < size, Error::IndexOutOfBounds { index: ordinal, size });
        Ok(view)
    }

    /// Whether tile `ordinal` is negligible.
    ///
    /// Always false for dense shapes.
    pub fn is_zero(&self, ordinal: usize) -> Result<bool> {
        Ok(match self.check_ordinal(ordinal, "is_zero")? {
            View::Dense(_) => false,
            View::Sparse(data) => data.config.is_zero(data.norms.as_slice()[ordinal]),
        })
    }

    /// Whether the tile at tile coordinate `idx` is negligible
    pub fn is_zero_at(&self, idx: &[usize]) -> Result<bool> {
        let ordinal = self.view("is_zero")?.trange().tiles_range().checked_ordinal(idx)?;
        self.is_zero(ordinal)
    }

    /// Stored (scaled) norm of tile `ordinal`
    pub fn get(&self, ordinal: usize) -> Result<f32> {
        match self.check_ordinal(ordinal, "get")? {
            View::Dense(_) => Err(crate::error::violation(Error::DenseShape { op: "get" })),
            View::Sparse(data) => Ok(data.norms.as_slice()[ordinal]),
        }
    }

    /// Stored (scaled) norm of the tile at tile coordinate `idx`
    pub fn get_at(&self, idx: &[usize]) -> Result<f32> {
        let ordinal = self.view("get")?.trange().tiles_range().checked_ordinal(idx)?;
        self.get(ordinal)
    }

    /// The stored (scaled) norms
    pub fn data(&self) -> Result<&NormTensor> {
        Ok(&self.sparse("data")?.norms)
    }

    /// Unscaled per-tile norm bounds: `stored[t] * volume(t)`
    pub fn tile_norms(&self) -> Result<NormTensor> {
        let data = self.sparse("tile_norms")?;
        let volumes = data.trange.tile_volumes();
        Ok(data.norms.map(|ord, v| v * volumes[ord] as f32))
    }

    /// Number of zero tiles; zero for dense shapes
    pub fn zero_count(&self) -> Result<usize> {
        Ok(match self.view("zero_count")? {
            View::Dense(_) => 0,
            View::Sparse(data) => data.zero_count,
        })
    }

    /// Fraction of tiles that are zero, in `[0, 1]`
    pub fn sparsity(&self) -> Result<f32> {
        let tiles = self.tile_count()?;
        if tiles == 0 {
            return Ok(0.0);
        }
        Ok(self.zero_count()? as f32 / tiles as f32)
    }

    /// Ordinals of nonzero tiles, ascending
    pub fn nonzero_ordinals(&self) -> Result<Vec<usize>> {
        Ok(match self.view("nonzero_ordinals")? {
            View::Dense(trange) => (0..trange.tile_count()).collect(),
            View::Sparse(data) => data
                .norms
                .iter()
                .enumerate()
                .filter(|&(_, v)| !data.config.is_zero(v))
                .map(|(ord, _)| ord)
                .collect(),
        })
    }
}

pub(crate) fn check_tile_extents(norms: &NormTensor, trange: &TiledRange) -> Result<()> {
    let expected = trange.tiles_range().extents();
    let got = norms.range().extents();
    ensure!(
        expected == got,
        Error::invalid_argument(
            "tile_norms",
            format!(
                "norm tensor extents {:?} differ from tile extents {:?}",
                got.as_slice(),
                expected.as_slice()
            ),
        )
    );
    Ok(())
}

pub(crate) fn check_norm_values(values: &[f32]) -> Result<()> {
    if let Some((ordinal, &value)) = values
        .iter()
        .enumerate()
        .find(|&(_, v)| !(v.is_finite() && *v >= 0.0))
    {
        return Err(crate::error::violation(Error::InvalidNorm { ordinal, value }));
    }
    Ok(())
}

/// Dense raw-norm tensor from `(tile coordinate, norm)` pairs
pub(crate) fn scatter_sparse_norms<I: AsRef<[usize]>>(
    tile_norms: &[(I, f32)],
    trange: &TiledRange,
) -> Result<NormTensor> {
    let tiles = trange.tiles_range();
    let mut data = vec![0.0f32; tiles.volume()];
    let mut seen = vec![false; data.len()];
    for (idx, norm) in tile_norms {
        let idx = idx.as_ref();
        let ordinal = tiles.checked_ordinal(idx)?;
        ensure!(
            !seen[ordinal],
            Error::invalid_argument("tile_norms", format!("tile {idx:?} is listed twice"))
        );
        seen[ordinal] = true;
        data[ordinal] = *norm;
    }
    NormTensor::new(tiles.clone(), data)
}
