//! Stacking block tensors along a new leading dimension and splitting them back

use super::run_tile_tasks;
use super::tensor::{BlockTensor, Element, Tile};
use crate::error::{Error, Result, ensure};
use crate::norm::{NormTensor, collect_ordinals};
use crate::range::{TiledRange, TiledRange1};
use crate::shape::Shape;
use std::sync::Arc;
use tracing::debug;

/// Tiled range of `count` stacked copies of `inner`, the stack dimension
/// leading and tiled `[0, B, 2B, ..., count]`
pub fn fuse_tiled_ranges(inner: &TiledRange, count: usize, block_size: usize) -> Result<TiledRange> {
    Ok(inner.prepend(TiledRange1::uniform(count, block_size)?))
}

/// The trailing dimensions of a fused tiled range
fn inner_trange(fused: &TiledRange) -> Result<TiledRange> {
    ensure!(
        fused.rank() >= 1,
        Error::invalid_argument("fused_trange", "a fused tiled range has a leading dimension")
    );
    Ok(fused.subrange(1..fused.rank()))
}

fn check_inner_tiling(expected: &TiledRange, got: &TiledRange) -> Result<()> {
    let (e, g) = (expected.tiles_range().extents(), got.tiles_range().extents());
    ensure!(e == g, Error::shape_mismatch(&e, &g));
    ensure!(
        expected == got,
        Error::invalid_argument("trange", format!("tilings differ: {expected:?} vs {got:?}"))
    );
    Ok(())
}

/// Shape of the fusion of tensors with the given `shapes`.
///
/// For a leading tile holding `k` constituents and inner tile `o`,
///
/// ```text
/// fused[t, o] = sqrt(sum_v (stored_v[o] * vol(o))^2) / (vol(o) * k)
/// ```
///
/// which is the exact scaled norm of the fused tile when the stored values
/// are exact. Any dense input makes the fused shape dense. The fused shape
/// inherits the configuration of the first input.
pub fn fuse_shapes(shapes: &[Shape], fused_trange: impl Into<Arc<TiledRange>>) -> Result<Shape> {
    let fused_trange = fused_trange.into();
    let inner = inner_trange(&fused_trange)?;
    let leading = fused_trange.dim(0);
    ensure!(
        leading.lobound() == 0 && leading.extent() == shapes.len(),
        Error::invalid_argument(
            "shapes",
            format!(
                "{} shapes cannot fill a leading dimension of {:?}",
                shapes.len(),
                leading
            ),
        )
    );
    for shape in shapes {
        check_inner_tiling(&inner, shape.trange()?)?;
    }
    if shapes.iter().any(Shape::is_dense) {
        return Ok(Shape::dense(fused_trange));
    }

    let config = shapes[0].config()?;
    let mut stored = Vec::with_capacity(shapes.len());
    for shape in shapes {
        let threshold = shape.threshold()?;
        ensure!(
            threshold == config.threshold(),
            Error::ThresholdMismatch {
                lhs: config.threshold(),
                rhs: threshold,
            }
        );
        stored.push(shape.data()?.as_slice());
    }

    let volumes = inner.tile_volumes();
    let inner_tiles = volumes.len();
    let data = collect_ordinals(fused_trange.tile_count(), |ord| {
        let (t, o) = (ord / inner_tiles, ord % inner_tiles);
        let (lo, hi) = leading.tile(t);
        let vol = volumes[o] as f32;
        let norm2: f32 = stored[lo..hi]
            .iter()
            .map(|values| {
                let unscaled = values[o] * vol;
                unscaled * unscaled
            })
            .sum();
        norm2.sqrt() / (vol * (hi - lo) as f32)
    });
    let norms = NormTensor::new(fused_trange.tiles_range().clone(), data)?;
    Shape::from_scaled_norms(norms, fused_trange, config)
}

/// Shape of element `i` of the leading dimension of a fused tensor.
///
/// Each stored value is the fused value times the extent of the leading tile
/// containing `i`. This is an upper bound, not the exact norm: a fused tile
/// cannot tell which of its constituents carry its weight.
pub fn split_shape(fused: &Shape, i: usize, split_trange: impl Into<Arc<TiledRange>>) -> Result<Shape> {
    let split_trange = split_trange.into();
    let fused_trange = fused.trange()?;
    check_inner_tiling(&inner_trange(fused_trange)?, &split_trange)?;
    let leading = fused_trange.dim(0);
    let t = leading.element_to_tile(i)?;
    if fused.is_dense() {
        return Ok(Shape::dense(split_trange));
    }

    let extent = leading.tile_extent(t) as f32;
    let n = split_trange.tile_count();
    let slab = &fused.data()?.as_slice()[t * n..(t + 1) * n];
    let data = collect_ordinals(n, |ord| slab[ord] * extent);
    let norms = NormTensor::new(split_trange.tiles_range().clone(), data)?;
    Shape::from_scaled_norms(norms, split_trange, fused.config()?)
}

/// Stack `arrays` into one tensor with a new leading dimension of extent
/// `arrays.len()`, tiled in blocks of `block_size`.
///
/// The fused tile `(t, o)` is the concatenation, in array order, of tile `o`
/// of every array in leading tile `t`. A constituent tile that is zero in
/// its array contributes zeros.
///
/// # Errors
///
/// Returns error if `arrays` is empty, `block_size` is zero, or the arrays
/// are not tiled identically.
pub fn fuse_block_tensors<T: Element>(arrays: &[BlockTensor<T>], block_size: usize) -> Result<BlockTensor<T>> {
    ensure!(
        !arrays.is_empty(),
        Error::invalid_argument("arrays", "nothing to fuse")
    );
    let inner = arrays[0].trange();
    for array in &arrays[1..] {
        check_inner_tiling(inner, array.trange())?;
    }

    let fused_trange = Arc::new(fuse_tiled_ranges(inner, arrays.len(), block_size)?);
    let shapes: Vec<Shape> = arrays.iter().map(|a| a.shape().clone()).collect();
    let fused_shape = fuse_shapes(&shapes, Arc::clone(&fused_trange))?;

    let leading = fused_trange.dim(0);
    let inner_tiles = inner.tile_count();
    let nonzero = fused_shape.nonzero_ordinals()?;
    let tiles = run_tile_tasks(&nonzero, |ord| {
        let (t, o) = (ord / inner_tiles, ord % inner_tiles);
        let (lo, hi) = leading.tile(t);
        let volume = inner.tile_volume(o);
        let mut data = Vec::with_capacity(volume * (hi - lo));
        for array in &arrays[lo..hi] {
            match array.find(o) {
                Some(tile) => data.extend_from_slice(tile.as_slice()),
                None => data.resize(data.len() + volume, T::zero()),
            }
        }
        Tile::new(fused_trange.make_tile_range(ord)?, data)
    })?;

    debug!(
        arrays = arrays.len(),
        block_size,
        tiles = fused_trange.tile_count(),
        computed = tiles.len(),
        "fused block tensors"
    );
    BlockTensor::from_tiles(fused_trange, fused_shape, tiles)
}

/// Extract element `i` of the leading dimension of `fused` as a tensor
/// tiled by `split_trange`.
///
/// `split_trange` must equal the trailing dimensions of the fused tiled
/// range. Split tile `o` is the `i - lo`-th slab of fused tile `(t, o)`,
/// where leading tile `t = [lo, hi)` contains `i`.
pub fn split_block_tensor<T: Element>(
    fused: &BlockTensor<T>,
    i: usize,
    split_trange: impl Into<Arc<TiledRange>>,
) -> Result<BlockTensor<T>> {
    let split_trange = split_trange.into();
    let split = split_shape(fused.shape(), i, Arc::clone(&split_trange))?;

    let leading = fused.trange().dim(0);
    let t = leading.element_to_tile(i)?;
    let offset = i - leading.tile(t).0;
    let n = split_trange.tile_count();
    let nonzero = split.nonzero_ordinals()?;
    let tiles = run_tile_tasks(&nonzero, |ord| {
        let range = split_trange.make_tile_range(ord)?;
        let volume = range.volume();
        match fused.find(t * n + ord) {
            Some(tile) => {
                let slab = &tile.as_slice()[offset * volume..(offset + 1) * volume];
                Tile::new(range, slab.to_vec())
            }
            None => Ok(Tile::zeros(range)),
        }
    })?;

    debug!(
        element = i,
        leading_tile = t,
        computed = tiles.len(),
        "split block tensor"
    );
    BlockTensor::from_tiles(split_trange, split, tiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShapeConfig;

    fn inner() -> TiledRange {
        TiledRange::from_bounds(&[&[0, 2, 3], &[0, 1, 3]]).unwrap()
    }

    fn sparse_shape(scaled: Vec<f32>) -> Shape {
        let norms = NormTensor::new(inner().tiles_range().clone(), scaled).unwrap();
        Shape::from_scaled_norms(norms, inner(), ShapeConfig::default()).unwrap()
    }

    #[test]
    fn test_fuse_tiled_ranges() {
        let fused = fuse_tiled_ranges(&inner(), 5, 2).unwrap();
        assert_eq!(fused.rank(), 3);
        assert_eq!(fused.dim(0).bounds(), &[0, 2, 4, 5]);
        assert_eq!(fused.subrange(1..3), inner());
        let exact = fuse_tiled_ranges(&inner(), 4, 2).unwrap();
        assert_eq!(exact.dim(0).bounds(), &[0, 2, 4]);
    }

    #[test]
    fn test_fuse_shapes_norms() {
        // inner volumes: 2 4 / 1 2
        let shapes = vec![
            sparse_shape(vec![1.0, 0.0, 2.0, 0.5]),
            sparse_shape(vec![3.0, 0.0, 0.0, 0.5]),
            sparse_shape(vec![1.0, 1.0, 0.0, 0.0]),
        ];
        let fused_trange = fuse_tiled_ranges(&inner(), 3, 2).unwrap();
        let fused = fuse_shapes(&shapes, fused_trange).unwrap();
        let volumes = inner().tile_volumes();
        for o in 0..4 {
            let vol = volumes[o] as f32;
            let a = shapes[0].get(o).unwrap() * vol;
            let b = shapes[1].get(o).unwrap() * vol;
            let expected = (a * a + b * b).sqrt() / (vol * 2.0);
            assert!((fused.get(o).unwrap() - expected).abs() < 1e-6);
            // last leading tile holds a single array: norm unchanged
            assert!((fused.get(4 + o).unwrap() - shapes[2].get(o).unwrap()).abs() < 1e-6);
        }
        assert!(fused.is_zero(1).unwrap());
    }

    #[test]
    fn test_split_shape_widens() {
        let shapes = vec![
            sparse_shape(vec![1.0, 0.0, 2.0, 0.5]),
            sparse_shape(vec![0.0, 0.0, 0.0, 0.5]),
        ];
        let fused = fuse_shapes(&shapes, fuse_tiled_ranges(&inner(), 2, 2).unwrap()).unwrap();
        for (i, original) in shapes.iter().enumerate() {
            let split = split_shape(&fused, i, inner()).unwrap();
            for o in 0..4 {
                assert_eq!(split.get(o).unwrap(), fused.get(o).unwrap() * 2.0);
                assert!(split.get(o).unwrap() >= original.get(o).unwrap() * (1.0 - 1e-6));
            }
        }
    }

    #[test]
    fn test_dense_inputs() {
        let shapes = vec![sparse_shape(vec![1.0; 4]), Shape::dense(inner())];
        let fused = fuse_shapes(&shapes, fuse_tiled_ranges(&inner(), 2, 1).unwrap()).unwrap();
        assert!(fused.is_dense());
        assert!(split_shape(&fused, 1, inner()).unwrap().is_dense());
    }

    #[cfg(not(feature = "abort-on-error"))]
    #[test]
    fn test_rejects_mismatched_inputs() {
        let fused_trange = fuse_tiled_ranges(&inner(), 3, 2).unwrap();
        let two = vec![sparse_shape(vec![1.0; 4]), sparse_shape(vec![1.0; 4])];
        assert!(fuse_shapes(&two, fused_trange.clone()).is_err());

        let other = TiledRange::from_bounds(&[&[0, 3], &[0, 1, 3]]).unwrap();
        let fused = fuse_shapes(&two, fuse_tiled_ranges(&inner(), 2, 2).unwrap()).unwrap();
        assert!(split_shape(&fused, 0, other).is_err());
        assert!(split_shape(&fused, 2, inner()).is_err());
        assert!(fuse_block_tensors::<f32>(&[], 2).is_err());
    }
}
