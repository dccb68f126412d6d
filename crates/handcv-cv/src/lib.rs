//! handcv Computer Vision Library
//!
//! Vision operations over platform bitmaps: grayscale conversion, template matching,
//! keypoint detection and hand detection, each delegated to a pluggable backend.

pub mod backend;
pub mod config;
pub mod error;
pub mod overlay;
pub mod region;
pub mod utils;
pub mod vision;

// Re-export commonly used types
pub use backend::{ImageprocBackend, ScoreMap};
#[cfg(feature = "opencv")]
pub use backend::OpenCvBackend;
pub use config::{Color, HandConfig, KeypointConfig, MatchingMethod, OverlayConfig, VisionConfig};
pub use error::VisionError;
pub use region::{HandRegion, Keypoint, MatchLocation, Region};
pub use utils::ImageUtils;
pub use vision::{Findings, Operation, Outcome, Vision};

pub use handcv_core::{Bitmap, Bridge, ChannelOrder, Matrix, PlatformProfile, Rotation};

// Error handling
pub type Result<T> = std::result::Result<T, VisionError>;

/// Core traits for the CV system
pub mod traits {
    use crate::backend::ScoreMap;
    use crate::config::{HandConfig, KeypointConfig, MatchingMethod};
    use crate::region::{HandRegion, Keypoint};
    use handcv_core::Matrix;

    /// The external vision library. Matrices handed in are packed, top-left origin and in
    /// library channel order; failures are returned untouched.
    pub trait VisionBackend {
        fn name(&self) -> &'static str;

        /// Version of the linked library. An error means the library is not usable.
        fn version(&self) -> anyhow::Result<String>;

        /// Single-channel conversion; gray input comes back unchanged.
        fn to_gray(&self, image: &Matrix) -> anyhow::Result<Matrix>;

        /// Score every placement of a gray `template` over a gray `source`.
        fn match_template(
            &self,
            source: &Matrix,
            template: &Matrix,
            method: MatchingMethod,
        ) -> anyhow::Result<ScoreMap>;

        fn detect_keypoints(
            &self,
            gray: &Matrix,
            config: &KeypointConfig,
        ) -> anyhow::Result<Vec<Keypoint>>;

        /// `Ok(None)` when no hand is visible.
        fn detect_hand(
            &self,
            image: &Matrix,
            config: &HandConfig,
        ) -> anyhow::Result<Option<HandRegion>>;
    }
}
