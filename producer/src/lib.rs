//! Frame sources: where raw decoded frames come from.
//!
//! A source is pulled one frame at a time. `Ok(None)` from
//! [`FrameSource::next_frame`] is the normal end-of-stream signal.

mod ffmpeg;
mod memory;
mod source;

pub use ffmpeg::{FfmpegSource, StreamInfo};
pub use memory::MemorySource;
pub use source::FrameSource;

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("video file not found: {0}")]
    NotFound(String),
    #[error("failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },
    #[error("ffprobe failed: {0}")]
    Probe(String),
    #[error("no video stream in {0}")]
    NoVideoStream(String),
}
