use frame_sieve_common::frame::CanonicalFrame;

/// Similarity oracle consumed by the selection engine.
///
/// Implementations receive two canonical frames of identical dimensions and
/// return a score in `[0, 1]`, where 1.0 means identical. The score must be
/// symmetric and must be exactly 1.0 when both frames are the same.
pub trait Similarity {
    fn similarity(&self, a: &CanonicalFrame, b: &CanonicalFrame) -> f64;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

impl<S: Similarity + ?Sized> Similarity for &S {
    fn similarity(&self, a: &CanonicalFrame, b: &CanonicalFrame) -> f64 {
        (**self).similarity(a, b)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
