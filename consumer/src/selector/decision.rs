use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Why a frame was kept or skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    /// First frame of the stream; there is nothing to compare against.
    KeptFirst,
    /// Score fell below the similarity threshold.
    KeptMotion,
    /// Ambiguous score, but the dwell interval since the last keep has passed.
    KeptIntervalElapsed,
    /// Near-duplicate; the dwell interval was doubled.
    SkippedBackoff,
    /// Ambiguous score and the dwell interval has not passed yet.
    SkippedWaiting,
}

impl Outcome {
    pub fn is_kept(self) -> bool {
        matches!(
            self,
            Outcome::KeptFirst | Outcome::KeptMotion | Outcome::KeptIntervalElapsed
        )
    }
}

/// One decision per input frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// 1-based position of the frame in the stream.
    pub frame_index: u64,
    /// `None` for the first frame, which is never scored.
    pub score: Option<f64>,
    pub outcome: Outcome,
    /// Dwell interval after this decision was applied.
    pub interval: Duration,
}

impl Decision {
    pub fn label(&self) -> String {
        match self.outcome {
            Outcome::KeptFirst => "KEPT (first frame)".into(),
            Outcome::KeptMotion => "KEPT (motion)".into(),
            Outcome::KeptIntervalElapsed => "KEPT (interval hit)".into(),
            Outcome::SkippedBackoff => {
                format!("SKIP (interval ↑ {:.2}s)", self.interval.as_secs_f64())
            }
            Outcome::SkippedWaiting => "SKIPPED".into(),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_line(f, self.frame_index, self.score.unwrap_or(0.0), &self.label())
    }
}

/// `Frame {index}: SSIM={score:.4} → {label}`
pub(crate) fn write_line(
    f: &mut fmt::Formatter<'_>,
    frame_index: u64,
    score: f64,
    label: &str,
) -> fmt::Result {
    write!(f, "Frame {frame_index}: SSIM={score:.4} → {label}")
}
