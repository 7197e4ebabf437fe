use frame_sieve_common::config::SelectionParams;
use frame_sieve_common::frame::CanonicalFrame;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::decision::{Decision, Outcome};
use super::EngineError;

/// Running totals, updated only from decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub seen: u64,
    pub kept: u64,
    pub skipped: u64,
}

impl Counters {
    pub fn record(&mut self, outcome: Outcome) {
        self.seen += 1;
        if outcome.is_kept() {
            self.kept += 1;
        } else {
            self.skipped += 1;
        }
    }
}

/// Everything the selection policy remembers between frames.
///
/// Created empty once per stream and mutated once per frame, in order.
#[derive(Debug, Clone)]
pub struct EngineState {
    /// Last kept frame; the comparison baseline.
    reference: Option<CanonicalFrame>,
    last_kept_at: Duration,
    interval: Duration,
    counters: Counters,
}

impl EngineState {
    pub fn new(params: &SelectionParams) -> Self {
        Self {
            reference: None,
            last_kept_at: Duration::ZERO,
            interval: params.initial_interval(),
            counters: Counters::default(),
        }
    }

    pub fn reference(&self) -> Option<&CanonicalFrame> {
        self.reference.as_ref()
    }

    pub fn last_kept_at(&self) -> Duration {
        self.last_kept_at
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Classify `frame`, seen at `at`, and apply the outcome.
    ///
    /// `score` is called with `(reference, frame)` only when a reference
    /// exists; the first frame of a stream is never scored.
    pub fn decide<F>(
        &mut self,
        params: &SelectionParams,
        frame: CanonicalFrame,
        at: Duration,
        score: F,
    ) -> Result<Decision, EngineError>
    where
        F: FnOnce(&CanonicalFrame, &CanonicalFrame) -> f64,
    {
        let score = match &self.reference {
            None => None,
            Some(reference) => {
                if reference.dimensions() != frame.dimensions() {
                    return Err(EngineError::DimensionMismatch {
                        reference: reference.dimensions(),
                        frame: frame.dimensions(),
                    });
                }
                Some(score(reference, &frame))
            }
        };

        let outcome = self.classify(params, score, at);
        match outcome {
            Outcome::KeptFirst | Outcome::KeptMotion | Outcome::KeptIntervalElapsed => {
                self.reference = Some(frame);
                self.last_kept_at = at;
                self.interval = params.initial_interval();
            }
            Outcome::SkippedBackoff => {
                self.interval = self.interval.saturating_mul(2).min(params.max_interval());
            }
            Outcome::SkippedWaiting => {}
        }
        self.counters.record(outcome);

        let decision = Decision {
            frame_index: self.counters.seen,
            score,
            outcome,
            interval: self.interval,
        };
        debug!(
            frame = decision.frame_index,
            score = decision.score,
            outcome = ?decision.outcome,
            interval_ms = self.interval.as_millis() as u64,
            "frame decision"
        );
        Ok(decision)
    }

    /// Pure classification step.
    ///
    /// `>=` against the backoff threshold and the dwell interval, strict `<`
    /// against the similarity threshold.
    fn classify(&self, params: &SelectionParams, score: Option<f64>, at: Duration) -> Outcome {
        let Some(score) = score else {
            return Outcome::KeptFirst;
        };

        if score >= params.backoff_threshold() {
            Outcome::SkippedBackoff
        } else if score < params.similarity_threshold() {
            Outcome::KeptMotion
        } else if at.saturating_sub(self.last_kept_at) >= self.interval {
            Outcome::KeptIntervalElapsed
        } else {
            Outcome::SkippedWaiting
        }
    }
}
