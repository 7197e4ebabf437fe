use frame_sieve_common::config::ClockKind;
use frame_sieve_common::frame::RawFrame;
use std::time::{Duration, Instant};

/// Source of the time `t` handed to the selection engine, measured from the
/// start of the session.
pub trait Clock {
    fn now(&mut self, frame: &RawFrame) -> Duration;
}

/// Monotonic processing time.
#[derive(Debug, Clone)]
pub struct WallClock {
    start: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now(&mut self, _frame: &RawFrame) -> Duration {
        self.start.elapsed()
    }
}

/// Presentation timestamps carried by the frames. Frames without one reuse
/// the last timestamp seen.
#[derive(Debug, Clone, Default)]
pub struct StreamClock {
    last: Duration,
}

impl Clock for StreamClock {
    fn now(&mut self, frame: &RawFrame) -> Duration {
        if let Some(pts) = frame.pts {
            self.last = pts;
        }
        self.last
    }
}

pub fn from_kind(kind: ClockKind) -> Box<dyn Clock> {
    match kind {
        ClockKind::Wall => Box::new(WallClock::new()),
        ClockKind::Stream => Box::new(StreamClock::default()),
    }
}
