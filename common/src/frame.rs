use std::time::Duration;

/// Width of every canonical comparison frame.
pub const CANONICAL_WIDTH: u32 = 320;
/// Height of every canonical comparison frame.
pub const CANONICAL_HEIGHT: u32 = 180;

/// A decoded frame as it comes out of a frame source.
///
/// Pixel layout is packed and row-major:
///   channels = 1  → luma
///   channels = 3  → RGB
///   channels = 4  → RGBA
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Vec<u8>,
    /// Presentation timestamp relative to the start of the stream, if known.
    pub pts: Option<Duration>,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels,
            data,
            pts: None,
        }
    }

    pub fn with_pts(mut self, pts: Duration) -> Self {
        self.pts = Some(pts);
        self
    }

    /// Number of bytes a well-formed frame of this shape carries.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }

    /// Check shape and buffer size before the frame is handed to the preprocessor.
    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.width == 0 || self.height == 0 {
            return Err(DecodeError::ZeroDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if !matches!(self.channels, 1 | 3 | 4) {
            return Err(DecodeError::UnsupportedChannels(self.channels));
        }
        let expected = self.expected_len();
        if self.data.len() != expected {
            return Err(DecodeError::BufferSize {
                got: self.data.len(),
                expected,
            });
        }
        Ok(())
    }
}

/// Single-channel 8-bit intensity image used for every similarity comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalFrame {
    width: u32,
    height: u32,
    luma: Vec<u8>,
}

impl CanonicalFrame {
    pub fn from_luma(width: u32, height: u32, luma: Vec<u8>) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::ZeroDimensions { width, height });
        }
        let expected = width as usize * height as usize;
        if luma.len() != expected {
            return Err(DecodeError::BufferSize {
                got: luma.len(),
                expected,
            });
        }
        Ok(Self {
            width,
            height,
            luma,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn luma(&self) -> &[u8] {
        &self.luma
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("frame has zero dimension: {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },
    #[error("unsupported channel count {0}, expected 1, 3 or 4")]
    UnsupportedChannels(u8),
    #[error("frame buffer is {got} bytes, expected {expected}")]
    BufferSize { got: usize, expected: usize },
    #[error("stream ended mid-frame: got {got} of {expected} bytes")]
    Truncated { got: usize, expected: usize },
    #[error("timestamp went backwards: {previous:?} -> {current:?}")]
    NonMonotonicTimestamp {
        previous: Duration,
        current: Duration,
    },
    #[error("failed to read frame: {0}")]
    Io(String),
}
