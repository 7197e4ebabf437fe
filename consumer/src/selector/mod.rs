//! The adaptive frame selection policy.
//!
//! Each frame is compared against the last *kept* frame:
//!
//! - score >= backoff threshold: near-duplicate, skip and double the dwell
//!   interval (capped at the maximum).
//! - score < similarity threshold: the scene changed, keep.
//! - otherwise: keep only if the dwell interval has elapsed since the last
//!   keep.
//!
//! Every keep resets the dwell interval to its initial value.

mod decision;
mod state;

pub use decision::{Decision, Outcome};
pub(crate) use decision::write_line;
pub use state::{Counters, EngineState};

use frame_sieve_common::config::SelectionParams;
use frame_sieve_common::frame::CanonicalFrame;
use std::time::Duration;

use crate::similarity::Similarity;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("frame is {frame:?} but reference is {reference:?}")]
    DimensionMismatch {
        reference: (u32, u32),
        frame: (u32, u32),
    },
}

/// Owns the policy parameters, the similarity oracle and the per-stream state.
pub struct SelectionEngine<S> {
    params: SelectionParams,
    oracle: S,
    state: EngineState,
}

impl<S: Similarity> SelectionEngine<S> {
    pub fn new(params: SelectionParams, oracle: S) -> Self {
        Self {
            state: EngineState::new(&params),
            params,
            oracle,
        }
    }

    /// Decide whether `frame`, observed at `at` since the start of the
    /// stream, is kept or skipped.
    pub fn observe(&mut self, frame: CanonicalFrame, at: Duration) -> Result<Decision, EngineError> {
        let oracle = &self.oracle;
        self.state
            .decide(&self.params, frame, at, |reference, frame| {
                oracle.similarity(reference, frame)
            })
    }

    pub fn params(&self) -> &SelectionParams {
        &self.params
    }

    pub fn oracle(&self) -> &S {
        &self.oracle
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn counters(&self) -> Counters {
        self.state.counters()
    }

    /// Forget the stream seen so far.
    pub fn reset(&mut self) {
        self.state = EngineState::new(&self.params);
    }
}
