//! Error types for tilesparse

use thiserror::Error;

/// Result type alias using tilesparse's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in shape, fusion and reduction operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Extents of two operands (or an operand and a tile index space) disagree
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected extents
        expected: Vec<usize>,
        /// Actual extents
        got: Vec<usize>,
    },

    /// Rank of an operand, index or permutation disagrees with the target
    #[error("Rank mismatch: expected rank {expected}, got {got}")]
    RankMismatch {
        /// Expected rank
        expected: usize,
        /// Actual rank
        got: usize,
    },

    /// Index out of bounds
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index
        index: usize,
        /// Size of the dimension
        size: usize,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Sequence is not a permutation of `0..n`
    #[error("Invalid permutation {perm:?}")]
    InvalidPermutation {
        /// The rejected sequence
        perm: Vec<usize>,
    },

    /// Negative or non-finite tile norm
    #[error("Invalid norm {value} for tile {ordinal}: norms must be finite and non-negative")]
    InvalidNorm {
        /// Tile ordinal holding the value
        ordinal: usize,
        /// The rejected value
        value: f32,
    },

    /// Query or operation on a default-constructed shape
    #[error("Operation '{op}' on an empty shape")]
    EmptyShape {
        /// The operation name
        op: &'static str,
    },

    /// Operation needs per-tile norms but the shape is dense
    #[error("Operation '{op}' requires a sparse shape")]
    DenseShape {
        /// The operation name
        op: &'static str,
    },

    /// Operands were built with different zero thresholds
    #[error("Zero threshold mismatch: {lhs} vs {rhs}")]
    ThresholdMismatch {
        /// Left-hand side threshold
        lhs: f32,
        /// Right-hand side threshold
        rhs: f32,
    },

    /// Collective communication failed; every participant of the group observes it
    #[error("Communication failure: {0}")]
    Communication(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Whether the error leaves the process group in an inconsistent state.
    ///
    /// Fatal errors must not be recovered from: a partial reduction means
    /// every shape built by the group disagrees with its peers.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Communication(_))
    }
}

/// Report a violated precondition.
///
/// With the `abort-on-error` feature the violation panics here, at the
/// detection site. Otherwise the error is handed back for the caller to
/// return.
#[inline]
#[track_caller]
pub(crate) fn violation(err: Error) -> Error {
    if cfg!(feature = "abort-on-error") {
        panic!("tilesparse: precondition violated: {err}");
    }
    err
}

/// Return early with a precondition violation unless `cond` holds.
macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return Err($crate::error::violation($err));
        }
    };
}

pub(crate) use ensure;
