//! Windowed structural similarity (SSIM).
//!
//! Local luminance, contrast and structure statistics are taken over every
//! fully-contained `window x window` block with uniform weights, combined
//! into a per-window SSIM, and averaged into one score. Window sums come
//! from summed-area tables, so the cost is linear in the pixel count.

use frame_sieve_common::frame::CanonicalFrame;

use super::traits::Similarity;

/// SSIM with a uniform window and sample-covariance normalisation.
#[derive(Debug, Clone)]
pub struct WindowedSsim {
    /// Side length of the square window (default: 7).
    window: usize,
    /// Luminance stability constant (default: 0.01).
    k1: f64,
    /// Contrast stability constant (default: 0.03).
    k2: f64,
    /// Dynamic range of the pixel values (default: 255).
    data_range: f64,
}

impl Default for WindowedSsim {
    fn default() -> Self {
        Self {
            window: 7,
            k1: 0.01,
            k2: 0.03,
            data_range: 255.0,
        }
    }
}

impl WindowedSsim {
    /// `window` is clamped to at least 1.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Similarity for WindowedSsim {
    fn similarity(&self, a: &CanonicalFrame, b: &CanonicalFrame) -> f64 {
        if a.luma() == b.luma() {
            return 1.0;
        }

        let (w, h) = a.dimensions();
        let (w, h) = (w as usize, h as usize);
        // Frames smaller than the window fall back to the largest window that fits.
        let win = self.window.min(w).min(h);

        let tables = Moments::build(a.luma(), b.luma(), w, h);

        let n = (win * win) as f64;
        let cov_norm = if win > 1 { n / (n - 1.0) } else { 1.0 };
        let c1 = (self.k1 * self.data_range).powi(2);
        let c2 = (self.k2 * self.data_range).powi(2);

        let mut total = 0.0;
        let mut count = 0usize;
        for y in 0..=(h - win) {
            for x in 0..=(w - win) {
                let s = tables.window_sums(x, y, win);
                let ux = s.x / n;
                let uy = s.y / n;
                let uxy_mean = ux * uy;
                let vx = cov_norm * (s.xx / n - ux * ux);
                let vy = cov_norm * (s.yy / n - uy * uy);
                let vxy = cov_norm * (s.xy / n - uxy_mean);

                let numerator = (2.0 * uxy_mean + c1) * (2.0 * vxy + c2);
                let denominator = (ux * ux + uy * uy + c1) * (vx + vy + c2);
                total += numerator / denominator;
                count += 1;
            }
        }

        (total / count as f64).clamp(0.0, 1.0)
    }

    fn name(&self) -> &str {
        "ssim"
    }
}

/// Raw (unnormalised) sums of one window.
struct WindowSums {
    x: f64,
    y: f64,
    xx: f64,
    yy: f64,
    xy: f64,
}

/// Summed-area tables of x, y, x², y² and xy, each `(w + 1) * (h + 1)`
/// with a zero first row and column. Integer sums stay exact.
struct Moments {
    stride: usize,
    x: Vec<u64>,
    y: Vec<u64>,
    xx: Vec<u64>,
    yy: Vec<u64>,
    xy: Vec<u64>,
}

impl Moments {
    fn build(a: &[u8], b: &[u8], w: usize, h: usize) -> Self {
        let stride = w + 1;
        let len = stride * (h + 1);
        let mut m = Self {
            stride,
            x: vec![0; len],
            y: vec![0; len],
            xx: vec![0; len],
            yy: vec![0; len],
            xy: vec![0; len],
        };

        for row in 0..h {
            let (mut rx, mut ry, mut rxx, mut ryy, mut rxy) = (0u64, 0u64, 0u64, 0u64, 0u64);
            for col in 0..w {
                let pa = a[row * w + col] as u64;
                let pb = b[row * w + col] as u64;
                rx += pa;
                ry += pb;
                rxx += pa * pa;
                ryy += pb * pb;
                rxy += pa * pb;

                let above = row * stride + col + 1;
                let here = above + stride;
                m.x[here] = m.x[above] + rx;
                m.y[here] = m.y[above] + ry;
                m.xx[here] = m.xx[above] + rxx;
                m.yy[here] = m.yy[above] + ryy;
                m.xy[here] = m.xy[above] + rxy;
            }
        }
        m
    }

    fn window_sums(&self, x: usize, y: usize, win: usize) -> WindowSums {
        let top_left = y * self.stride + x;
        let top_right = top_left + win;
        let bottom_left = top_left + win * self.stride;
        let bottom_right = bottom_left + win;
        let rect = |t: &[u64]| {
            (t[bottom_right] + t[top_left] - t[top_right] - t[bottom_left]) as f64
        };
        WindowSums {
            x: rect(&self.x),
            y: rect(&self.y),
            xx: rect(&self.xx),
            yy: rect(&self.yy),
            xy: rect(&self.xy),
        }
    }
}
