use frame_sieve_common::frame::{DecodeError, RawFrame};
use std::collections::VecDeque;

use crate::source::FrameSource;

/// A frame source over frames that are already decoded in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    frames: VecDeque<RawFrame>,
    estimate: Option<u64>,
    /// Returned once after the frames run out, instead of end-of-stream.
    trailing_error: Option<DecodeError>,
    pulled: u64,
}

impl MemorySource {
    pub fn new(frames: Vec<RawFrame>) -> Self {
        let estimate = Some(frames.len() as u64);
        Self {
            frames: frames.into(),
            estimate,
            trailing_error: None,
            pulled: 0,
        }
    }

    /// Override the advisory frame count.
    pub fn with_estimate(mut self, estimate: Option<u64>) -> Self {
        self.estimate = estimate;
        self
    }

    /// Fail with `error` after the buffered frames are exhausted.
    pub fn then_fail(mut self, error: DecodeError) -> Self {
        self.trailing_error = Some(error);
        self
    }

    /// Frames handed out so far.
    pub fn pulled(&self) -> u64 {
        self.pulled
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<RawFrame>, DecodeError> {
        match self.frames.pop_front() {
            Some(frame) => {
                self.pulled += 1;
                Ok(Some(frame))
            }
            None => match self.trailing_error.take() {
                Some(e) => Err(e),
                None => Ok(None),
            },
        }
    }

    fn estimated_frame_count(&self) -> Option<u64> {
        self.estimate
    }

    fn close(&mut self) {
        self.frames.clear();
        self.trailing_error = None;
    }
}
