use frame_sieve_common::config::ReportConfig;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use tracing::info;

use crate::selector::{write_line, Counters, Decision, Outcome};

/// What a reporter sees after every decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionEvent {
    pub frame_index: u64,
    /// 0.0 for the first frame, which is never scored.
    pub score: f64,
    pub outcome: Outcome,
    pub label: String,
    pub interval_secs: f64,
    pub counts: Counters,
}

impl DecisionEvent {
    pub fn new(decision: &Decision, counts: Counters) -> Self {
        Self {
            frame_index: decision.frame_index,
            score: decision.score.unwrap_or(0.0),
            outcome: decision.outcome,
            label: decision.label(),
            interval_secs: decision.interval.as_secs_f64(),
            counts,
        }
    }

    /// One-line human-readable form, e.g. `Frame 3: SSIM=0.9900 → SKIP (interval ↑ 0.40s)`.
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DecisionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_line(f, self.frame_index, self.score, &self.label)
    }
}

/// Final counts of a stream that ran to its end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_frames: u64,
    pub kept_frames: u64,
    pub skipped_frames: u64,
}

impl From<Counters> for Summary {
    fn from(c: Counters) -> Self {
        Self {
            total_frames: c.seen,
            kept_frames: c.kept,
            skipped_frames: c.skipped,
        }
    }
}

/// Receives the decision stream. Must not block the pipeline.
pub trait DecisionSink {
    /// Called once before the first frame.
    fn on_start(&mut self, _estimated_frames: Option<u64>) {}

    /// Called exactly once per frame, in stream order.
    fn on_decision(&mut self, event: &DecisionEvent);

    /// Called when the stream ends normally. Never called on cancellation.
    fn on_complete(&mut self, _summary: &Summary) {}
}

/// Running counts plus a bounded log of the most recent decisions.
#[derive(Debug, Clone)]
pub struct Aggregator {
    counts: Counters,
    recent: VecDeque<String>,
    capacity: usize,
    refresh_every: u64,
    estimate: Option<u64>,
    completed: Option<Summary>,
}

impl Aggregator {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            counts: Counters::default(),
            recent: VecDeque::with_capacity(config.recent_capacity),
            capacity: config.recent_capacity,
            refresh_every: config.refresh_every.max(1),
            estimate: None,
            completed: None,
        }
    }

    pub fn counts(&self) -> Counters {
        self.counts
    }

    /// Most recent summaries, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &str> {
        self.recent.iter().map(String::as_str)
    }

    /// Fraction of the estimated frame count processed so far.
    pub fn progress(&self) -> Option<f64> {
        match self.estimate {
            Some(total) if total > 0 => Some((self.counts.seen as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }

    /// Whether a presentation layer should redraw after frame `frame_index`:
    /// the first frame and every `refresh_every`-th frame after it.
    pub fn should_refresh(&self, frame_index: u64) -> bool {
        frame_index == 1 || frame_index % self.refresh_every == 0
    }

    pub fn snapshot(&self) -> Summary {
        Summary::from(self.counts)
    }

    /// The final summary, once the stream has completed.
    pub fn completed(&self) -> Option<&Summary> {
        self.completed.as_ref()
    }
}

impl DecisionSink for Aggregator {
    fn on_start(&mut self, estimated_frames: Option<u64>) {
        self.estimate = estimated_frames;
    }

    fn on_decision(&mut self, event: &DecisionEvent) {
        self.counts.record(event.outcome);
        if self.capacity == 0 {
            return;
        }
        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(event.summary());
    }

    fn on_complete(&mut self, summary: &Summary) {
        self.completed = Some(*summary);
    }
}

/// Aggregator that also reports throttled progress through `tracing`.
#[derive(Debug, Clone)]
pub struct TracingSink {
    aggregator: Aggregator,
}

impl TracingSink {
    pub fn new(aggregator: Aggregator) -> Self {
        Self { aggregator }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }
}

impl DecisionSink for TracingSink {
    fn on_start(&mut self, estimated_frames: Option<u64>) {
        self.aggregator.on_start(estimated_frames);
    }

    fn on_decision(&mut self, event: &DecisionEvent) {
        self.aggregator.on_decision(event);
        if self.aggregator.should_refresh(event.frame_index) {
            let counts = self.aggregator.counts();
            info!(
                total = counts.seen,
                kept = counts.kept,
                skipped = counts.skipped,
                progress = self.aggregator.progress(),
                "{}",
                event
            );
        }
    }

    fn on_complete(&mut self, summary: &Summary) {
        self.aggregator.on_complete(summary);
        info!(
            total = summary.total_frames,
            kept = summary.kept_frames,
            skipped = summary.skipped_frames,
            "processing complete"
        );
    }
}
