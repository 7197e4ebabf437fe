use frame_sieve_common::frame::{DecodeError, RawFrame};

/// Pull-based producer of raw frames in decode order.
pub trait FrameSource {
    /// Returns the next frame, or `Ok(None)` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<RawFrame>, DecodeError>;

    /// Advisory total frame count, if the container reports one.
    fn estimated_frame_count(&self) -> Option<u64> {
        None
    }

    /// Release the underlying stream. Later calls to `next_frame` return `Ok(None)`.
    fn close(&mut self);
}
