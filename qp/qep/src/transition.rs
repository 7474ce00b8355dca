//! Bounded state paths collected while resolving a transition

use heapless::Vec;
use qp_core::{QError, QResult};

/// States collected leaf first while climbing the hierarchy.
///
/// Entry actions run over the path in reverse, root to leaf. Pushing
/// past the capacity `D` is a modeling error reported as
/// [`QError::NestingTooDeep`].
pub struct QPath<S: Copy, const D: usize> {
    states: Vec<S, D>,
}

impl<S: Copy, const D: usize> QPath<S, D> {
    /// Create an empty path
    pub const fn new() -> Self {
        Self { states: Vec::new() }
    }

    /// Append the next state up the hierarchy
    pub fn push(&mut self, state: S) -> QResult<()> {
        self.states
            .push(state)
            .map_err(|_| QError::NestingTooDeep)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Keep only the `len` states closest to the leaf
    pub fn truncate(&mut self, len: usize) {
        self.states.truncate(len);
    }

    /// Index of the highest (closest to the root) state matching `pred`
    pub fn find_from_root(&self, pred: impl Fn(S) -> bool) -> Option<usize> {
        self.states.iter().rposition(|&s| pred(s))
    }

    /// States in entry order, outermost first
    pub fn root_to_leaf(&self) -> impl Iterator<Item = S> + '_ {
        self.states.iter().rev().copied()
    }

    /// States in collection order, leaf first
    pub fn leaf_to_root(&self) -> impl Iterator<Item = S> + '_ {
        self.states.iter().copied()
    }
}

impl<S: Copy, const D: usize> Default for QPath<S, D> {
    fn default() -> Self {
        Self::new()
    }
}
