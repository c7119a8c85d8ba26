//! Common test utilities
#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tilesparse::prelude::*;

/// Rank-3 tiled range with irregular tiles, 3 x 2 x 3 tiles
pub fn trange3() -> TiledRange {
    TiledRange::from_bounds(&[&[0, 2, 5, 6], &[0, 4, 7], &[0, 1, 3, 6]]).unwrap()
}

/// Rank-2 tiled range, 3 x 3 tiles
pub fn trange2() -> TiledRange {
    TiledRange::from_bounds(&[&[0, 3, 4, 8], &[0, 2, 5, 6]]).unwrap()
}

/// Permutation used by the permuted-output tests
pub fn perm3() -> Permutation {
    Permutation::new(vec![2, 0, 1]).unwrap()
}

/// Seeded raw tile norms: roughly a third of the tiles are exactly zero,
/// the rest are uniform in `[0.5, 10)` times the tile volume
pub fn random_raw_norms(trange: &TiledRange, seed: u64) -> NormTensor {
    let mut rng = StdRng::seed_from_u64(seed);
    let volumes = trange.tile_volumes();
    let data = volumes
        .iter()
        .map(|&vol| {
            if rng.random_bool(0.35) {
                0.0
            } else {
                rng.random_range(0.5f32..10.0) * vol as f32
            }
        })
        .collect();
    NormTensor::new(trange.tiles_range().clone(), data).unwrap()
}

/// Sparse shape with seeded random norms under `config`
pub fn random_shape(trange: &TiledRange, seed: u64, config: ShapeConfig) -> Shape {
    Shape::from_tile_norms(&random_raw_norms(trange, seed), trange.clone(), config).unwrap()
}

/// Assert two f32 values are close within a relative tolerance
pub fn assert_close(a: f32, b: f32, rtol: f32, msg: &str) {
    let tol = rtol * a.abs().max(b.abs()).max(f32::MIN_POSITIVE);
    assert!(
        (a - b).abs() <= tol,
        "{}: {} vs {} (diff={}, tol={})",
        msg,
        a,
        b,
        (a - b).abs(),
        tol
    );
}

/// Seeded tensor with elements uniform in `[-1, 1)`; roughly a third of
/// the tiles are entirely zero. `config` selects a sparse shape.
pub fn random_tensor(trange: &TiledRange, seed: u64, config: Option<ShapeConfig>) -> BlockTensor<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let zero_tiles: Vec<bool> = (0..trange.tile_count()).map(|_| rng.random_bool(0.3)).collect();
    let values: Vec<f64> = (0..trange.elements_range().volume())
        .map(|_| rng.random_range(-1.0..1.0))
        .collect();
    let elements = trange.elements_range().clone();
    let tiles = trange.clone();
    BlockTensor::from_fn(trange.clone(), config, move |idx| {
        let tile = TileIndexSpace::element_to_tile(&tiles, idx).unwrap();
        if zero_tiles[tile] {
            0.0
        } else {
            values[elements.ordinal(idx).unwrap()]
        }
    })
    .unwrap()
}

/// Scaled Frobenius norm of every tile of `tensor`, zero for absent tiles
pub fn actual_scaled_norms(tensor: &BlockTensor<f64>) -> Vec<f64> {
    let trange = tensor.trange();
    (0..trange.tile_count())
        .map(|ord| match tensor.find(ord) {
            Some(tile) => tile.norm() / trange.tile_volume(ord) as f64,
            None => 0.0,
        })
        .collect()
}

/// Assert every actual scaled norm is bounded by the shape's stored value
pub fn assert_bounds(shape: &Shape, actual: &[f64], msg: &str) {
    for (ord, &norm) in actual.iter().enumerate() {
        let bound = shape.get(ord).unwrap() as f64;
        assert!(
            norm <= bound * (1.0 + 1e-5) + 1e-12,
            "{}: tile {} norm {} exceeds bound {}",
            msg,
            ord,
            norm,
            bound
        );
    }
}
