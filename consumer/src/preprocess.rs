use frame_sieve_common::frame::{
    CanonicalFrame, DecodeError, RawFrame, CANONICAL_HEIGHT, CANONICAL_WIDTH,
};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

/// Convert a raw frame into the canonical comparison representation:
/// single-channel intensity, resized to `CANONICAL_WIDTH x CANONICAL_HEIGHT`
/// with bilinear resampling.
///
/// Fails with [`DecodeError`] on malformed frames (zero dimensions,
/// unsupported channel count, wrong buffer size).
pub fn canonicalize(raw: RawFrame) -> Result<CanonicalFrame, DecodeError> {
    raw.validate()?;

    let RawFrame {
        width,
        height,
        channels,
        data,
        ..
    } = raw;
    let got = data.len();
    let size_error = || DecodeError::BufferSize {
        got,
        expected: width as usize * height as usize * channels as usize,
    };

    let gray: GrayImage = match channels {
        1 => GrayImage::from_raw(width, height, data).ok_or_else(size_error)?,
        3 => RgbImage::from_raw(width, height, data)
            .map(|img| DynamicImage::ImageRgb8(img).to_luma8())
            .ok_or_else(size_error)?,
        4 => RgbaImage::from_raw(width, height, data)
            .map(|img| DynamicImage::ImageRgba8(img).to_luma8())
            .ok_or_else(size_error)?,
        other => return Err(DecodeError::UnsupportedChannels(other)),
    };

    let gray = if gray.dimensions() == (CANONICAL_WIDTH, CANONICAL_HEIGHT) {
        gray
    } else {
        imageops::resize(&gray, CANONICAL_WIDTH, CANONICAL_HEIGHT, FilterType::Triangle)
    };

    CanonicalFrame::from_luma(CANONICAL_WIDTH, CANONICAL_HEIGHT, gray.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_frame_becomes_canonical() {
        let raw = RawFrame::new(640, 360, 3, vec![200; 640 * 360 * 3]);
        let frame = canonicalize(raw).unwrap();
        assert_eq!(frame.dimensions(), (CANONICAL_WIDTH, CANONICAL_HEIGHT));
        assert_eq!(frame.luma().len(), (CANONICAL_WIDTH * CANONICAL_HEIGHT) as usize);
        // Neutral gray stays neutral gray.
        assert!(frame.luma().iter().all(|&v| v.abs_diff(200) <= 1));
    }

    #[test]
    fn rgba_and_luma_inputs_accepted() {
        let rgba = RawFrame::new(32, 18, 4, vec![10; 32 * 18 * 4]);
        assert_eq!(canonicalize(rgba).unwrap().width(), CANONICAL_WIDTH);

        let luma = RawFrame::new(1280, 720, 1, vec![99; 1280 * 720]);
        let frame = canonicalize(luma).unwrap();
        assert!(frame.luma().iter().all(|&v| v.abs_diff(99) <= 1));
    }

    #[test]
    fn canonical_size_passes_through_unchanged() {
        let n = (CANONICAL_WIDTH * CANONICAL_HEIGHT) as usize;
        let data: Vec<u8> = (0..n).map(|i| (i % 251) as u8).collect();
        let raw = RawFrame::new(CANONICAL_WIDTH, CANONICAL_HEIGHT, 1, data.clone());
        assert_eq!(canonicalize(raw).unwrap().luma(), &data[..]);
    }

    #[test]
    fn deterministic() {
        let data: Vec<u8> = (0..(97 * 55 * 3)).map(|i| (i * 7 % 256) as u8).collect();
        let a = canonicalize(RawFrame::new(97, 55, 3, data.clone())).unwrap();
        let b = canonicalize(RawFrame::new(97, 55, 3, data)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn malformed_frames_are_decode_errors() {
        assert!(matches!(
            canonicalize(RawFrame::new(0, 10, 3, vec![])),
            Err(DecodeError::ZeroDimensions { .. })
        ));
        assert!(matches!(
            canonicalize(RawFrame::new(4, 4, 2, vec![0; 32])),
            Err(DecodeError::UnsupportedChannels(2))
        ));
        assert!(matches!(
            canonicalize(RawFrame::new(4, 4, 3, vec![0; 47])),
            Err(DecodeError::BufferSize { .. })
        ));
    }
}
