//! Integration tests for structural shape operations and contraction

mod common;

use common::{assert_bounds, assert_close, perm3, random_shape, random_tensor, trange2, trange3};
use tilesparse::prelude::*;

fn config() -> ShapeConfig {
    ShapeConfig::new(1e-3).unwrap()
}

// ============================================================================
// Permutation
// ============================================================================

#[test]
fn test_permute_round_trip() {
    let shape = random_shape(&trange3(), 21, config());
    let perm = perm3();
    let permuted = shape.permute(&perm).unwrap();
    for (ord, idx) in trange3().tiles_range().iter().enumerate() {
        assert_eq!(permuted.get_at(&perm.apply(&idx)).unwrap(), shape.get(ord).unwrap());
    }
    assert_eq!(permuted.zero_count().unwrap(), shape.zero_count().unwrap());
    assert_eq!(permuted.permute(&perm.inverse()).unwrap(), shape);
    assert_eq!(shape.permute(&Permutation::identity(3)).unwrap(), shape);
}

// ============================================================================
// Block
// ============================================================================

#[test]
fn test_block_extracts_tiles() {
    let trange = trange3();
    let shape = random_shape(&trange, 22, config());
    let (lower, upper) = ([1, 0, 1], [3, 2, 3]);
    let block = shape.block(&lower, &upper).unwrap();
    let block_trange = block.trange().unwrap();
    assert_eq!(block_trange.tiles_range().extents().as_slice(), &[2, 2, 2]);
    assert_eq!(block_trange.dim(0).bounds(), &[2, 5, 6]);

    let mut zeros = 0;
    for idx in block_trange.tiles_range().iter() {
        let source: Vec<usize> = idx.iter().zip(&lower).map(|(i, lo)| i + lo).collect();
        assert_eq!(block.get_at(&idx).unwrap(), shape.get_at(&source).unwrap());
        zeros += usize::from(block.is_zero_at(&idx).unwrap());
    }
    assert_eq!(block.zero_count().unwrap(), zeros);
}

#[test]
fn test_block_with_output() {
    let trange = trange3();
    let shape = random_shape(&trange, 23, config());
    let (lower, upper) = ([0, 1, 0], [2, 2, 3]);
    let output = OutputOp::new().with_factor(-2.0).with_perm(perm3());
    let direct = shape.block_with(&lower, &upper, &output).unwrap();
    let stepwise = shape
        .block(&lower, &upper)
        .unwrap()
        .scale(2.0)
        .unwrap()
        .permute(&perm3())
        .unwrap();
    assert_eq!(direct, stepwise);
}

#[test]
fn test_dense_block_is_dense() {
    let block = Shape::dense(trange3()).block(&[0, 0, 0], &[1, 1, 1]).unwrap();
    assert!(block.is_dense());
    assert_eq!(block.tile_count().unwrap(), 1);
}

#[cfg(not(feature = "abort-on-error"))]
#[test]
fn test_block_rejects_bad_bounds() {
    let shape = random_shape(&trange3(), 24, config());
    assert!(matches!(
        shape.block(&[1, 0, 0], &[1, 2, 3]),
        Err(Error::InvalidArgument { .. })
    ));
    assert!(matches!(
        shape.block(&[2, 0, 0], &[1, 2, 3]),
        Err(Error::InvalidArgument { .. })
    ));
    assert!(matches!(
        shape.block(&[0, 0, 0], &[4, 2, 3]),
        Err(Error::InvalidArgument { .. })
    ));
    assert!(matches!(
        shape.block(&[0, 0], &[1, 1]),
        Err(Error::RankMismatch { .. })
    ));
}

// ============================================================================
// Mask and transform
// ============================================================================

#[test]
fn test_mask() {
    let trange = trange2();
    let shape = random_shape(&trange, 25, config());
    let mask = random_shape(&trange, 26, config());
    let masked = shape.mask(&mask).unwrap();
    for ord in 0..trange.tile_count() {
        let expected = if mask.is_zero(ord).unwrap() {
            0.0
        } else {
            shape.get(ord).unwrap()
        };
        assert_eq!(masked.get(ord).unwrap(), expected, "tile {ord}");
    }
    assert_eq!(shape.mask(&Shape::dense(trange)).unwrap(), shape);
}

#[cfg(not(feature = "abort-on-error"))]
#[test]
fn test_mask_rejects_dense_shape() {
    let trange = trange2();
    let mask = random_shape(&trange, 26, config());
    assert!(matches!(
        Shape::dense(trange).mask(&mask),
        Err(Error::DenseShape { op: "mask" })
    ));
}

#[test]
fn test_transform() {
    let trange = trange2();
    let shape = random_shape(&trange, 27, config());
    let halved = shape.transform(|_, v| v * 0.5).unwrap();
    for ord in 0..trange.tile_count() {
        assert_eq!(halved.get(ord).unwrap(), shape.get(ord).unwrap() * 0.5);
    }
    let cleared = shape.transform(|ord, v| if ord == 0 { 0.0 } else { v }).unwrap();
    assert!(cleared.is_zero(0).unwrap());
}

// ============================================================================
// Contraction
// ============================================================================

#[test]
fn test_gemm_bounds_matrix_product() {
    let left_trange = trange2();
    let right_trange = TiledRange::from_bounds(&[&[0, 2, 5, 6], &[0, 4, 7]]).unwrap();
    let a = random_tensor(&left_trange, 28, Some(config()));
    let b = random_tensor(&right_trange, 29, Some(config()));
    let plan = ContractionPlan::new(2, 2, 2).unwrap();
    let shape = a.shape().gemm(b.shape(), -1.5, &plan).unwrap();

    let result_trange = shape.trange().unwrap();
    assert_eq!(result_trange.dim(0), left_trange.dim(0));
    assert_eq!(result_trange.dim(1), right_trange.dim(1));

    let actual: Vec<f64> = (0..result_trange.tile_count())
        .map(|ord| {
            let range = result_trange.make_tile_range(ord).unwrap();
            let norm2: f64 = range
                .iter()
                .map(|idx| {
                    let c: f64 = (0..6)
                        .map(|k| a.element(&[idx[0], k]).unwrap() * b.element(&[k, idx[1]]).unwrap())
                        .sum();
                    let c = -1.5 * c;
                    c * c
                })
                .sum();
            norm2.sqrt() / range.volume() as f64
        })
        .collect();
    assert_bounds(&shape, &actual, "gemm");
}

#[test]
fn test_gemm_with_permuted_output() {
    let left = random_shape(&trange2(), 30, config());
    let right_trange = TiledRange::from_bounds(&[&[0, 2, 5, 6], &[0, 4, 7]]).unwrap();
    let right = random_shape(&right_trange, 31, config());
    let plan = ContractionPlan::new(2, 2, 2).unwrap();
    let transpose = Permutation::new(vec![1, 0]).unwrap();
    let direct = left
        .gemm_with(&right, &plan, &OutputOp::scaled(2.0).with_perm(transpose.clone()))
        .unwrap();
    let stepwise = left.gemm(&right, 2.0, &plan).unwrap().permute(&transpose).unwrap();
    assert_eq!(direct.trange().unwrap(), stepwise.trange().unwrap());
    for ord in 0..direct.tile_count().unwrap() {
        assert_close(direct.get(ord).unwrap(), stepwise.get(ord).unwrap(), 1e-6, "gemm_with");
    }
}

#[test]
fn test_gemm_outer_product() {
    let left_trange = TiledRange::from_bounds(&[&[0, 2, 3]]).unwrap();
    let right_trange = TiledRange::from_bounds(&[&[0, 1, 4]]).unwrap();
    let left = Shape::from_tile_norms(
        &NormTensor::new(left_trange.tiles_range().clone(), vec![4.0, 1.0]).unwrap(),
        left_trange,
        config(),
    )
    .unwrap();
    let right = Shape::from_tile_norms(
        &NormTensor::new(right_trange.tiles_range().clone(), vec![2.0, 6.0]).unwrap(),
        right_trange,
        config(),
    )
    .unwrap();
    let outer = left.gemm(&right, 1.0, &ContractionPlan::new(2, 1, 1).unwrap()).unwrap();
    // unscaled result norm is the product of unscaled operand norms
    let expected = [8.0 / 2.0, 24.0 / 6.0, 2.0 / 1.0, 6.0 / 3.0];
    for (ord, e) in expected.iter().enumerate() {
        assert_close(outer.get(ord).unwrap(), *e, 1e-6, "outer");
    }
}

#[test]
fn test_gemm_dense_operand() {
    let right_trange = TiledRange::from_bounds(&[&[0, 2, 5, 6], &[0, 4, 7]]).unwrap();
    let sparse = random_shape(&trange2(), 32, config());
    let plan = ContractionPlan::new(2, 2, 2).unwrap();
    let result = sparse.gemm(&Shape::dense(right_trange), 1.0, &plan).unwrap();
    assert!(result.is_dense());
    assert_eq!(result.tile_count().unwrap(), 6);
}

#[cfg(not(feature = "abort-on-error"))]
#[test]
fn test_gemm_rejects_mismatched_tilings() {
    let left = random_shape(&trange2(), 33, config());
    let wrong = TiledRange::from_bounds(&[&[0, 3, 5, 6], &[0, 4, 7]]).unwrap();
    let right = random_shape(&wrong, 34, config());
    let plan = ContractionPlan::new(2, 2, 2).unwrap();
    assert!(matches!(
        left.gemm(&right, 1.0, &plan),
        Err(Error::InvalidArgument { .. })
    ));
    assert!(matches!(
        left.gemm(&right, 1.0, &ContractionPlan::new(2, 3, 1).unwrap()),
        Err(Error::RankMismatch { .. })
    ));
}
