//! Integration tests for shape construction and queries
//!
//! Tests verify:
//! - Scaling of raw norms by tile volume
//! - Threshold consistency of every constructor
//! - Dense-tensor and sparse-list constructor equivalence
//! - Empty and dense shape behavior

mod common;

use common::{assert_close, random_raw_norms, random_shape, trange2, trange3};
use tilesparse::prelude::*;

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_from_tile_norms_scales_by_volume() {
    let trange = trange3();
    let raw = random_raw_norms(&trange, 7);
    let shape = Shape::from_tile_norms(&raw, trange.clone(), ShapeConfig::default()).unwrap();
    let volumes = trange.tile_volumes();
    for (ord, vol) in volumes.iter().enumerate() {
        let expected = raw.get(ord).unwrap() / *vol as f32;
        assert_eq!(shape.get(ord).unwrap(), expected, "tile {ord}");
    }
    assert_eq!(shape.tile_count().unwrap(), volumes.len());
}

#[test]
fn test_threshold_consistency() {
    let trange = trange3();
    let config = ShapeConfig::new(4.0).unwrap();
    let shape = random_shape(&trange, 11, config);
    let unscaled = shape.tile_norms().unwrap();
    let mut zeros = 0;
    for ord in 0..shape.tile_count().unwrap() {
        let value = shape.get(ord).unwrap();
        let zero = shape.is_zero(ord).unwrap();
        assert_eq!(zero, value < config.threshold(), "tile {ord}");
        if zero {
            zeros += 1;
            assert_eq!(value, 0.0);
            assert_eq!(unscaled.get(ord).unwrap(), 0.0);
        }
    }
    assert_eq!(shape.zero_count().unwrap(), zeros);
    assert_close(
        shape.sparsity().unwrap(),
        zeros as f32 / shape.tile_count().unwrap() as f32,
        1e-6,
        "sparsity",
    );
    let nonzero = shape.nonzero_ordinals().unwrap();
    assert_eq!(nonzero.len() + zeros, shape.tile_count().unwrap());
    assert!(nonzero.iter().all(|&ord| !shape.is_zero(ord).unwrap()));
}

#[test]
fn test_sparse_list_matches_dense() {
    let trange = trange2();
    let raw = random_raw_norms(&trange, 3);
    let config = ShapeConfig::new(1.0).unwrap();
    let pairs: Vec<(Vec<usize>, f32)> = trange
        .tiles_range()
        .iter()
        .enumerate()
        .filter_map(|(ord, idx)| {
            let v = raw.get(ord).unwrap();
            (v != 0.0).then(|| (idx.to_vec(), v))
        })
        .collect();
    let dense = Shape::from_tile_norms(&raw, trange.clone(), config).unwrap();
    let sparse = Shape::from_sparse_norms(&pairs, trange, config).unwrap();
    assert_eq!(dense, sparse);
}

#[test]
fn test_coordinate_queries_match_ordinals() {
    let trange = trange3();
    let shape = random_shape(&trange, 5, ShapeConfig::default());
    for (ord, idx) in trange.tiles_range().iter().enumerate() {
        assert_eq!(shape.get_at(&idx).unwrap(), shape.get(ord).unwrap());
        assert_eq!(shape.is_zero_at(&idx).unwrap(), shape.is_zero(ord).unwrap());
    }
}

#[test]
fn test_scaled_norms_only_threshold() {
    let trange = trange2();
    let values: Vec<f32> = (0..9).map(|i| i as f32 * 0.25).collect();
    let norms = NormTensor::new(trange.tiles_range().clone(), values.clone()).unwrap();
    let shape = Shape::from_scaled_norms(norms, trange, ShapeConfig::new(0.6).unwrap()).unwrap();
    for (ord, v) in values.iter().enumerate() {
        let expected = if *v < 0.6 { 0.0 } else { *v };
        assert_eq!(shape.get(ord).unwrap(), expected);
    }
    assert_eq!(shape.zero_count().unwrap(), 3);
}

// ============================================================================
// Dense and empty shapes
// ============================================================================

#[test]
fn test_dense_shape() {
    let trange = trange3();
    let shape = Shape::dense(trange.clone());
    assert!(shape.is_dense());
    assert!(!shape.is_empty());
    assert!(shape.validate(&trange));
    assert!(!shape.validate(&trange2()));
    assert_eq!(shape.zero_count().unwrap(), 0);
    assert_eq!(shape.sparsity().unwrap(), 0.0);
    for ord in 0..trange.tile_count() {
        assert!(!shape.is_zero(ord).unwrap());
    }
}

#[test]
fn test_validate_checks_tile_extents() {
    let shape = random_shape(&trange2(), 1, ShapeConfig::default());
    assert!(shape.validate(&trange2()));
    assert!(!shape.validate(&trange3()));
    assert!(!Shape::default().validate(&trange2()));
}

#[cfg(not(feature = "abort-on-error"))]
mod errors {
    use super::*;

    #[test]
    fn test_empty_shape_queries_fail() {
        let empty = Shape::default();
        assert!(empty.is_empty());
        assert!(!empty.is_dense());
        assert!(matches!(empty.is_zero(0), Err(Error::EmptyShape { .. })));
        assert!(matches!(empty.threshold(), Err(Error::EmptyShape { .. })));
        assert!(empty.scale(2.0).is_err());
    }

    #[test]
    fn test_dense_shape_has_no_norms() {
        let dense = Shape::dense(trange2());
        assert!(matches!(dense.data(), Err(Error::DenseShape { .. })));
        assert!(matches!(dense.get(0), Err(Error::DenseShape { .. })));
    }

    #[test]
    fn test_invalid_inputs() {
        let trange = trange2();
        let mut values = vec![1.0; 9];
        values[4] = -1.0;
        let norms = NormTensor::new(trange.tiles_range().clone(), values).unwrap();
        assert!(matches!(
            Shape::from_tile_norms(&norms, trange.clone(), ShapeConfig::default()),
            Err(Error::InvalidNorm { ordinal: 4, .. })
        ));

        let wrong = NormTensor::new(Range::from_extents(&[3, 2]), vec![1.0; 6]).unwrap();
        assert!(Shape::from_tile_norms(&wrong, trange.clone(), ShapeConfig::default()).is_err());

        let duplicate = [([1usize, 1usize], 2.0f32), ([1, 1], 3.0)];
        assert!(Shape::from_sparse_norms(&duplicate, trange.clone(), ShapeConfig::default()).is_err());

        let outside = [([3usize, 0usize], 2.0f32)];
        assert!(Shape::from_sparse_norms(&outside, trange, ShapeConfig::default()).is_err());

        assert!(ShapeConfig::new(-1.0).is_err());
        assert!(ShapeConfig::new(f32::NAN).is_err());
    }
}
