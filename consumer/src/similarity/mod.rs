pub mod ssim;
pub mod traits;

pub use ssim::WindowedSsim;
pub use traits::Similarity;
