//! Process groups and the collective sum-reduction

use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use tracing::{debug, warn};

/// A group of participants that take part in collective operations.
///
/// Every participant of the group must call each collective in the same
/// order with buffers of the same length. A collective blocks until all
/// participants have joined it.
pub trait Communicator: Send + Sync {
    /// This participant's index in `0..size()`
    fn rank(&self) -> usize;

    /// Number of participants
    fn size(&self) -> usize;

    /// Replace `values` with the element-wise sum of every participant's `values`
    ///
    /// Returns [`Error::Communication`] if the group is poisoned or the
    /// participants disagree on the buffer length. Both are fatal.
    fn all_reduce_sum(&self, values: &mut [f32]) -> Result<()>;

    /// Poison the group so that every pending and future collective fails
    fn abort(&self, reason: &str);
}

/// The trivial group of one participant
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfComm;

impl Communicator for SelfComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce_sum(&self, _values: &mut [f32]) -> Result<()> {
        Ok(())
    }

    fn abort(&self, reason: &str) {
        warn!(reason, "single-process group aborted");
    }
}

/// In-process group of `size` participants, typically one per thread.
///
/// Reductions sum contributions in rank order, so every participant sees a
/// bit-identical result regardless of arrival order.
///
/// # Example
/// ```
/// use tilesparse::dist::{Communicator, LocalGroup};
/// let group = LocalGroup::new(3)?;
/// let results: Vec<Vec<f32>> = std::thread::scope(|s| {
///     let handles: Vec<_> = group
///         .into_iter()
///         .map(|comm| {
///             s.spawn(move || {
///                 let mut values = vec![comm.rank() as f32; 2];
///                 comm.all_reduce_sum(&mut values).map(|_| values)
///             })
///         })
///         .collect();
///     handles.into_iter().map(|h| h.join().unwrap()).collect::<Result<_, _>>()
/// })?;
/// assert!(results.iter().all(|r| *r == [3.0, 3.0]));
/// # Ok::<(), tilesparse::error::Error>(())
/// ```
#[derive(Debug)]
pub struct LocalGroup {
    rank: usize,
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    size: usize,
    state: Mutex<State>,
    arrived: Condvar,
}

#[derive(Debug, Default)]
struct State {
    generation: u64,
    contributions: Vec<Option<Vec<f32>>>,
    result: Vec<f32>,
    poisoned: Option<String>,
}

impl LocalGroup {
    /// Create the `size` members of a new group, ordered by rank
    pub fn new(size: usize) -> Result<Vec<LocalGroup>> {
        if size == 0 {
            return Err(crate::error::violation(Error::invalid_argument(
                "size",
                "a group needs at least one participant",
            )));
        }
        let shared = Arc::new(Shared {
            size,
            state: Mutex::new(State {
                contributions: vec![None; size],
                ..State::default()
            }),
            arrived: Condvar::new(),
        });
        Ok((0..size)
            .map(|rank| LocalGroup {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect())
    }

    /// Whether the group has been poisoned
    pub fn is_poisoned(&self) -> bool {
        self.shared.state.lock().poisoned.is_some()
    }
}

impl Shared {
    fn poison(&self, state: &mut State, reason: String) -> Error {
        warn!(%reason, "process group poisoned");
        state.poisoned.get_or_insert(reason);
        self.arrived.notify_all();
        Error::Communication(state.poisoned.clone().unwrap_or_default())
    }
}

impl Communicator for LocalGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn all_reduce_sum(&self, values: &mut [f32]) -> Result<()> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        if let Some(reason) = &state.poisoned {
            return Err(Error::Communication(reason.clone()));
        }

        let expected = state.contributions.iter().flatten().next().map(Vec::len);
        if let Some(expected) = expected.filter(|&len| len != values.len()) {
            let reason = format!(
                "rank {} reduced {} values, peers reduced {expected}",
                self.rank,
                values.len()
            );
            return Err(shared.poison(&mut state, reason));
        }

        state.contributions[self.rank] = Some(values.to_vec());
        let generation = state.generation;
        if state.contributions.iter().all(Option::is_some) {
            let mut sum = vec![0.0f32; values.len()];
            for contribution in state.contributions.iter_mut() {
                for (s, v) in sum.iter_mut().zip(contribution.take().unwrap_or_default()) {
                    *s += v;
                }
            }
            state.result = sum;
            state.generation += 1;
            debug!(size = shared.size, len = values.len(), "all-reduce complete");
            shared.arrived.notify_all();
        } else {
            while state.generation == generation && state.poisoned.is_none() {
                shared.arrived.wait(&mut state);
            }
            if state.generation == generation {
                let reason = state.poisoned.clone().unwrap_or_default();
                return Err(Error::Communication(reason));
            }
        }

        values.copy_from_slice(&state.result);
        Ok(())
    }

    fn abort(&self, reason: &str) {
        let mut state = self.shared.state.lock();
        let reason = format!("rank {} aborted: {reason}", self.rank);
        let _ = self.shared.poison(&mut state, reason);
    }
}
