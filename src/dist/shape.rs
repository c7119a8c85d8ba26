//! Shapes assembled from per-participant contributions

use super::Communicator;
use crate::config::ShapeConfig;
use crate::error::Result;
use crate::norm::NormTensor;
use crate::range::TiledRange;
use crate::shape::{Shape, check_norm_values, check_tile_extents, scatter_sparse_norms};
use std::sync::Arc;
use tracing::debug;

/// Run `check` locally; on failure poison the group before returning the error
fn check_or_abort<C, T>(comm: &C, check: impl FnOnce() -> Result<T>) -> Result<T>
where
    C: Communicator + ?Sized,
{
    check().inspect_err(|err| comm.abort(&err.to_string()))
}

impl Shape {
    /// Build a shape from raw tile norms distributed over the participants of `comm`.
    ///
    /// Each participant passes a tensor holding the norms of the tiles it owns
    /// and zero elsewhere. The tensors are summed across the group, then
    /// scaled and thresholded exactly as in
    /// [`from_tile_norms`](Shape::from_tile_norms). Every participant must
    /// call this collectively.
    ///
    /// # Errors
    ///
    /// A participant whose input is invalid aborts the group, so every
    /// participant returns an error: the invalid one its precondition
    /// violation, the others [`Error::Communication`](crate::error::Error::Communication).
    pub fn reduce_tile_norms<C: Communicator + ?Sized>(
        comm: &C,
        local_norms: &NormTensor,
        trange: impl Into<Arc<TiledRange>>,
        config: ShapeConfig,
    ) -> Result<Shape> {
        let trange = trange.into();
        check_or_abort(comm, || {
            check_tile_extents(local_norms, &trange)?;
            check_norm_values(local_norms.as_slice())
        })?;
        reduce(comm, local_norms.clone(), trange, config)
    }

    /// Distributed form of [`from_sparse_norms`](Shape::from_sparse_norms).
    ///
    /// Each participant lists `(tile coordinate, raw norm)` pairs for the
    /// tiles it owns. A tile listed by more than one participant has the
    /// contributions summed.
    pub fn reduce_sparse_norms<C, I>(
        comm: &C,
        local_norms: &[(I, f32)],
        trange: impl Into<Arc<TiledRange>>,
        config: ShapeConfig,
    ) -> Result<Shape>
    where
        C: Communicator + ?Sized,
        I: AsRef<[usize]>,
    {
        let trange = trange.into();
        let local = check_or_abort(comm, || {
            let local = scatter_sparse_norms(local_norms, &trange)?;
            check_norm_values(local.as_slice())?;
            Ok(local)
        })?;
        reduce(comm, local, trange, config)
    }
}

fn reduce<C: Communicator + ?Sized>(
    comm: &C,
    local: NormTensor,
    trange: Arc<TiledRange>,
    config: ShapeConfig,
) -> Result<Shape> {
    let range = local.range().clone();
    let mut values = local.into_vec();
    comm.all_reduce_sum(&mut values)?;
    debug!(
        rank = comm.rank(),
        size = comm.size(),
        tiles = values.len(),
        "reduced tile norms"
    );
    let summed = NormTensor::new(range, values)?;
    Shape::from_tile_norms(&summed, trange, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::{BlockedPmap, LocalGroup, SelfComm};
    use crate::error::Error;
    use std::thread;

    fn trange() -> TiledRange {
        TiledRange::from_bounds(&[&[0, 2, 5, 6], &[0, 3, 4, 8]]).unwrap()
    }

    fn raw_norms() -> NormTensor {
        let range = trange().tiles_range().clone();
        NormTensor::from_fn(range, |idx| ((idx[0] * 7 + idx[1] * 3) % 5) as f32 * 2.5)
    }

    fn owned_part(pmap: &BlockedPmap) -> NormTensor {
        raw_norms().map(|ord, v| if pmap.is_local(ord) { v } else { 0.0 })
    }

    #[test]
    fn test_single_participant_matches_local() {
        let config = ShapeConfig::default();
        let reduced = Shape::reduce_tile_norms(&SelfComm, &raw_norms(), trange(), config).unwrap();
        let local = Shape::from_tile_norms(&raw_norms(), trange(), config).unwrap();
        assert_eq!(reduced, local);
    }

    #[test]
    fn test_partition_independence() {
        let config = ShapeConfig::new(0.3).unwrap();
        let expected = Shape::from_tile_norms(&raw_norms(), trange(), config).unwrap();
        for size in [2, 3, 4] {
            let group = LocalGroup::new(size).unwrap();
            let shapes: Vec<Shape> = thread::scope(|s| {
                let handles: Vec<_> = group
                    .into_iter()
                    .map(|comm| {
                        s.spawn(move || {
                            let pmap = BlockedPmap::for_comm(9, &comm).unwrap();
                            Shape::reduce_tile_norms(&comm, &owned_part(&pmap), trange(), config)
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect()
            });
            assert!(shapes.iter().all(|shape| *shape == expected), "{size} participants");
        }
    }

    #[test]
    fn test_sparse_reduction() {
        let config = ShapeConfig::default();
        let group = LocalGroup::new(2).unwrap();
        let shapes: Vec<Shape> = thread::scope(|s| {
            let handles: Vec<_> = group
                .into_iter()
                .map(|comm| {
                    s.spawn(move || {
                        let pairs: Vec<([usize; 2], f32)> = if comm.rank() == 0 {
                            vec![([0, 0], 6.0)]
                        } else {
                            vec![([2, 2], 8.0)]
                        };
                        Shape::reduce_sparse_norms(&comm, &pairs, trange(), config)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect()
        });
        let expected =
            Shape::from_sparse_norms(&[([0, 0], 6.0), ([2, 2], 8.0)], trange(), config).unwrap();
        assert_eq!(shapes[0], expected);
        assert_eq!(shapes[1], expected);
        assert_eq!(expected.zero_count().unwrap(), 7);
    }

    #[cfg(not(feature = "abort-on-error"))]
    #[test]
    fn test_bad_input_fails_everyone() {
        let config = ShapeConfig::default();
        let group = LocalGroup::new(3).unwrap();
        let results: Vec<Result<Shape>> = thread::scope(|s| {
            let handles: Vec<_> = group
                .into_iter()
                .map(|comm| {
                    s.spawn(move || {
                        let mut local = raw_norms().into_vec();
                        if comm.rank() == 1 {
                            local[0] = f32::NAN;
                        }
                        let local = NormTensor::new(trange().tiles_range().clone(), local)?;
                        Shape::reduce_tile_norms(&comm, &local, trange(), config)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(matches!(results[1], Err(Error::InvalidNorm { ordinal: 0, .. })));
        assert!(matches!(results[0], Err(Error::Communication(_))));
        assert!(matches!(results[2], Err(Error::Communication(_))));
    }
}
