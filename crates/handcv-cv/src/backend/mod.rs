//! Vision library backends
//!
//! The façade only ever talks to a [`VisionBackend`](crate::traits::VisionBackend). The
//! default backend is pure Rust; the OpenCV one is behind the `opencv` feature.

pub mod imageproc_backend;
#[cfg(feature = "opencv")]
pub mod opencv_backend;

pub use imageproc_backend::ImageprocBackend;
#[cfg(feature = "opencv")]
pub use opencv_backend::OpenCvBackend;

use crate::config::MatchingMethod;
use handcv_core::{BridgeError, Matrix};

/// Score of every placement of a template over a source image.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMap {
    /// `source.cols - template.cols + 1`
    pub width: u32,
    /// `source.rows - template.rows + 1`
    pub height: u32,
    pub scores: Vec<f32>,
    pub method: MatchingMethod,
}

impl ScoreMap {
    /// Location and score of the best placement; minimum for inverted methods.
    /// NaN scores (flat patches under normalized methods) never win.
    pub fn best(&self) -> Option<(u32, u32, f32)> {
        let inverted = self.method.is_inverted();
        self.scores
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_nan())
            .reduce(|best, cur| {
                let better = if inverted {
                    cur.1 < best.1
                } else {
                    cur.1 > best.1
                };
                if better { cur } else { best }
            })
            .map(|(i, &s)| {
                let w = self.width.max(1) as usize;
                ((i % w) as u32, (i / w) as u32, s)
            })
    }

    /// Raw scores as a single-channel float matrix.
    pub fn into_matrix(self) -> Result<Matrix, BridgeError> {
        Matrix::from_f32(self.height as usize, self.width as usize, &self.scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(method: MatchingMethod) -> ScoreMap {
        ScoreMap {
            width: 3,
            height: 2,
            scores: vec![0.2, f32::NAN, 0.1, 0.9, 0.5, 0.05],
            method,
        }
    }

    #[test]
    fn test_best_for_correlation_is_maximum() {
        assert_eq!(map(MatchingMethod::CCorrNormed).best(), Some((0, 1, 0.9)));
    }

    #[test]
    fn test_best_for_squared_difference_is_minimum() {
        assert_eq!(map(MatchingMethod::SqDiff).best(), Some((2, 1, 0.05)));
    }

    #[test]
    fn test_first_of_equal_scores_wins() {
        let m = ScoreMap {
            width: 2,
            height: 1,
            scores: vec![1.0, 1.0],
            method: MatchingMethod::CCorr,
        };
        assert_eq!(m.best(), Some((0, 0, 1.0)));
    }
}
