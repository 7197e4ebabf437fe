//! Property-based tests for the frame selection policy.
//!
//! Scores and inter-frame gaps are generated directly; the engine state is
//! driven through `EngineState::decide` with a scripted score.

use frame_sieve_common::config::SelectionParams;
use frame_sieve_common::frame::CanonicalFrame;
use frame_sieve_consumer::{Decision, EngineState, Outcome};
use proptest::prelude::*;
use std::time::Duration;

fn score() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => 0.0f64..=1.0,
        1 => Just(0.85),
        1 => Just(0.925),
        1 => Just(1.0),
    ]
}

/// (score, gap since previous frame in ms); the first score is never used.
fn stream() -> impl Strategy<Value = Vec<(f64, u64)>> {
    prop::collection::vec((score(), 0u64..400), 1..80)
}

fn frame(i: usize) -> CanonicalFrame {
    CanonicalFrame::from_luma(2, 1, vec![(i % 256) as u8, (i / 256 % 256) as u8]).unwrap()
}

/// Run the stream, checking per-frame invariants along the way.
fn run(params: &SelectionParams, steps: &[(f64, u64)]) -> Vec<Decision> {
    let mut state = EngineState::new(params);
    let mut at = Duration::ZERO;
    let mut decisions = Vec::with_capacity(steps.len());

    for (i, &(score, gap)) in steps.iter().enumerate() {
        at += Duration::from_millis(gap);
        let before = state.reference().cloned();
        let d = state.decide(params, frame(i), at, |_, _| score).unwrap();

        let counts = state.counters();
        assert_eq!(counts.seen, counts.kept + counts.skipped);
        assert_eq!(counts.seen, i as u64 + 1);
        assert_eq!(d.frame_index, counts.seen);

        if d.outcome.is_kept() {
            assert_eq!(state.reference(), Some(&frame(i)));
            assert_eq!(state.last_kept_at(), at);
            assert_eq!(d.interval, params.initial_interval());
        } else {
            assert_eq!(state.reference().cloned(), before);
        }
        decisions.push(d);
    }
    decisions
}

proptest! {
    /// Same scores and timestamps give the same decisions.
    #[test]
    fn deterministic(steps in stream()) {
        let params = SelectionParams::default();
        prop_assert_eq!(run(&params, &steps), run(&params, &steps));
    }

    /// The first frame of any non-empty stream is kept, unscored.
    #[test]
    fn first_frame_kept(steps in stream()) {
        let decisions = run(&SelectionParams::default(), &steps);
        prop_assert_eq!(decisions[0].outcome, Outcome::KeptFirst);
        prop_assert_eq!(decisions[0].score, None);
    }

    /// Consecutive backoffs never shrink the interval nor exceed the maximum.
    #[test]
    fn backoff_monotonic(steps in stream()) {
        let params = SelectionParams::default();
        let decisions = run(&params, &steps);
        for pair in decisions.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            prop_assert!(next.interval <= params.max_interval());
            if next.outcome == Outcome::SkippedBackoff {
                prop_assert!(next.interval >= prev.interval);
            }
            if next.outcome == Outcome::SkippedWaiting {
                prop_assert_eq!(next.interval, prev.interval);
            }
        }
    }

    /// Outcomes line up with the threshold comparators.
    #[test]
    fn outcome_matches_score_band(steps in stream()) {
        let params = SelectionParams::default();
        let decisions = run(&params, &steps);
        for d in decisions.iter().skip(1) {
            let s = d.score.unwrap();
            match d.outcome {
                Outcome::SkippedBackoff => prop_assert!(s >= params.backoff_threshold()),
                Outcome::KeptMotion => prop_assert!(s < params.similarity_threshold()),
                Outcome::KeptIntervalElapsed | Outcome::SkippedWaiting => {
                    prop_assert!(s >= params.similarity_threshold());
                    prop_assert!(s < params.backoff_threshold());
                }
                Outcome::KeptFirst => prop_assert!(false, "KeptFirst after the first frame"),
            }
        }
    }

    /// In the ambiguous band a frame is kept exactly when the time since the
    /// last keep reaches the interval in force before the decision, including
    /// intervals grown by earlier backoffs.
    #[test]
    fn time_gate_follows_current_interval(
        steps in prop::collection::vec(
            (prop_oneof![Just(0.99), Just(0.90), Just(0.88), Just(0.5)], 0u64..700),
            1..80,
        ),
    ) {
        let params = SelectionParams::default();
        let mut state = EngineState::new(&params);
        let mut at = Duration::ZERO;
        for (i, &(score, gap)) in steps.iter().enumerate() {
            at += Duration::from_millis(gap);
            let interval_before = state.interval();
            let last_kept_before = state.last_kept_at();
            let d = state.decide(&params, frame(i), at, |_, _| score).unwrap();
            if matches!(d.outcome, Outcome::KeptIntervalElapsed | Outcome::SkippedWaiting) {
                let elapsed = at - last_kept_before;
                prop_assert_eq!(
                    d.outcome == Outcome::KeptIntervalElapsed,
                    elapsed >= interval_before
                );
            }
        }
    }

    /// Custom thresholds keep the same invariants.
    #[test]
    fn custom_thresholds(
        threshold in 0.05f64..0.95,
        initial_ms in 1u64..500,
        factor in 1u32..40,
        steps in stream(),
    ) {
        let initial = Duration::from_millis(initial_ms);
        let params = SelectionParams::with_midpoint(threshold, initial, initial * factor).unwrap();
        let decisions = run(&params, &steps);
        prop_assert!(decisions.iter().all(|d| d.interval <= params.max_interval()));
    }
}

#[test]
fn documented_scenarios() {
    let params = SelectionParams::default();
    let ms = Duration::from_millis;

    let d = run(&params, &[(0.0, 0), (0.99, 10), (0.99, 10), (0.99, 10)]);
    let got: Vec<_> = d.iter().map(|d| (d.outcome, d.interval)).collect();
    assert_eq!(
        got,
        vec![
            (Outcome::KeptFirst, ms(100)),
            (Outcome::SkippedBackoff, ms(200)),
            (Outcome::SkippedBackoff, ms(400)),
            (Outcome::SkippedBackoff, ms(800)),
        ]
    );

    let d = run(&params, &[(0.0, 0), (0.99, 10), (0.80, 10)]);
    assert_eq!(d[2].outcome, Outcome::KeptMotion);
    assert_eq!(d[2].interval, ms(100));

    let d = run(&params, &[(0.0, 0), (0.90, 10), (0.90, 100)]);
    assert_eq!(d[1].outcome, Outcome::SkippedWaiting);
    assert_eq!(d[2].outcome, Outcome::KeptIntervalElapsed);

    // gaps: 10ms, then 140ms (150ms since the keep, under 200ms), then 60ms (210ms)
    let d = run(&params, &[(0.0, 0), (0.99, 10), (0.90, 140), (0.90, 60)]);
    let got: Vec<_> = d.iter().map(|d| (d.outcome, d.interval)).collect();
    assert_eq!(
        got,
        vec![
            (Outcome::KeptFirst, ms(100)),
            (Outcome::SkippedBackoff, ms(200)),
            (Outcome::SkippedWaiting, ms(200)),
            (Outcome::KeptIntervalElapsed, ms(100)),
        ]
    );
}
