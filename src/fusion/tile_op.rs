//! Binary tile kernels
//!
//! A tile operation receives each operand either borrowed or owned. Owned
//! operands are reused as the output buffer; borrowed ones are copied first.
//! A missing operand (`None`) stands for a zero tile.

use super::tensor::{Element, Tile};
use crate::error::{Error, Result};
use crate::permutation::Permutation;

/// A tile argument, borrowed from a tensor or handed over by the caller
#[derive(Debug)]
pub enum Operand<'a, T> {
    /// Read-only argument; the result gets a fresh buffer
    Borrowed(&'a Tile<T>),
    /// Argument the operation may overwrite and return
    Owned(Tile<T>),
}

impl<T: Element> Operand<'_, T> {
    /// The tile
    pub fn tile(&self) -> &Tile<T> {
        match self {
            Operand::Borrowed(tile) => *tile,
            Operand::Owned(tile) => tile,
        }
    }

    /// The tile as an owned value, copying a borrowed one
    pub fn into_owned(self) -> Tile<T> {
        match self {
            Operand::Borrowed(tile) => tile.clone(),
            Operand::Owned(tile) => tile,
        }
    }
}

impl<'a, T> From<&'a Tile<T>> for Operand<'a, T> {
    fn from(tile: &'a Tile<T>) -> Self {
        Operand::Borrowed(tile)
    }
}

impl<T> From<Tile<T>> for Operand<'_, T> {
    fn from(tile: Tile<T>) -> Self {
        Operand::Owned(tile)
    }
}

/// Elementwise combination applied by a [`BinaryTileOp`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKind {
    /// `left + right`
    Add,
    /// `left - right`
    Subt,
}

impl BinaryKind {
    #[inline]
    fn combine<T: Element>(self, left: T, right: T) -> T {
        match self {
            BinaryKind::Add => left + right,
            BinaryKind::Subt => left - right,
        }
    }

    /// Result when the left operand is zero
    #[inline]
    fn right_only<T: Element>(self, right: T) -> T {
        match self {
            BinaryKind::Add => right,
            BinaryKind::Subt => -right,
        }
    }
}

/// `factor * perm(left op right)` on tiles
#[derive(Debug, Clone)]
pub struct BinaryTileOp<T> {
    kind: BinaryKind,
    factor: Option<T>,
    perm: Option<Permutation>,
}

impl<T: Element> BinaryTileOp<T> {
    /// Tile addition
    pub fn add() -> Self {
        Self::new(BinaryKind::Add)
    }

    /// Tile subtraction
    pub fn subt() -> Self {
        Self::new(BinaryKind::Subt)
    }

    /// Operation of the given kind, unscaled and unpermuted
    pub fn new(kind: BinaryKind) -> Self {
        Self {
            kind,
            factor: None,
            perm: None,
        }
    }

    /// Scale results by `factor`
    pub fn with_factor(mut self, factor: T) -> Self {
        self.factor = Some(factor);
        self
    }

    /// Permute results; the identity permutation is dropped
    pub fn with_perm(mut self, perm: Permutation) -> Self {
        self.perm = (!perm.is_identity()).then_some(perm);
        self
    }

    /// The combination applied
    pub fn kind(&self) -> BinaryKind {
        self.kind
    }

    /// Evaluate the operation; `None` operands are zero tiles.
    ///
    /// # Errors
    ///
    /// Returns error if both operands are zero or their ranges differ.
    pub fn apply(&self, left: Option<Operand<'_, T>>, right: Option<Operand<'_, T>>) -> Result<Tile<T>> {
        let kind = self.kind;
        let mut result = match (left, right) {
            (Some(left), Some(right)) => match (left, right) {
                (Operand::Owned(mut left), right) => {
                    left.zip_inplace(right.tile(), |l, r| kind.combine(l, r))?;
                    left
                }
                (left, Operand::Owned(mut right)) => {
                    right.zip_inplace(left.tile(), |r, l| kind.combine(l, r))?;
                    right
                }
                (left, right) => {
                    let mut out = left.into_owned();
                    out.zip_inplace(right.tile(), |l, r| kind.combine(l, r))?;
                    out
                }
            },
            (Some(left), None) => left.into_owned(),
            (None, Some(right)) => {
                let mut out = right.into_owned();
                if kind == BinaryKind::Subt {
                    out.map_inplace(|r| kind.right_only(r));
                }
                out
            }
            (None, None) => {
                return Err(crate::error::violation(Error::invalid_argument(
                    "left",
                    "both operands of a tile operation are zero",
                )));
            }
        };

        if let Some(factor) = self.factor {
            result.map_inplace(|v| v * factor);
        }
        match &self.perm {
            Some(perm) => result.permute(perm),
            None => Ok(result),
        }
    }
}
