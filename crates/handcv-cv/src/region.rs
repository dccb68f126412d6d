//! Structured detection results
//!
//! Everything an overlay draws is available here as plain data, so callers that need
//! coordinates do not have to scrape them back out of an annotated image.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest region containing every point. `None` for an empty set.
    pub fn bounding(points: &[(i32, i32)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let (mut x0, mut y0, mut x1, mut y1) = (first.0, first.1, first.0, first.1);
        for &(x, y) in rest {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        Some(Self::new(x0, y0, (x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32))
    }

    pub fn to_rect(&self) -> imageproc::rect::Rect {
        imageproc::rect::Rect::at(self.x, self.y).of_size(self.width.max(1), self.height.max(1))
    }
}

/// Best placement of a template inside a source image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchLocation {
    pub region: Region,
    /// Raw score at the best location, in the method's own scale.
    pub score: f32,
}

/// A detected feature point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: u32,
    pub y: u32,
    pub score: f32,
}

impl Keypoint {
    fn distance_sq(&self, other: &Keypoint) -> u64 {
        let dx = self.x.abs_diff(other.x) as u64;
        let dy = self.y.abs_diff(other.y) as u64;
        dx * dx + dy * dy
    }
}

/// Strongest-first suppression: a keypoint survives only if no stronger survivor lies
/// within `radius`. The result is sorted by descending score and capped at `limit`.
pub fn suppress_keypoints(
    mut keypoints: Vec<Keypoint>,
    radius: u32,
    limit: usize,
) -> Vec<Keypoint> {
    keypoints.sort_by(|a, b| b.score.total_cmp(&a.score));

    if radius == 0 {
        keypoints.truncate(limit);
        return keypoints;
    }

    let radius_sq = radius as u64 * radius as u64;
    let mut keep: Vec<Keypoint> = Vec::new();
    for kp in keypoints {
        if keep.len() >= limit {
            break;
        }
        if keep.iter().all(|k| k.distance_sq(&kp) > radius_sq) {
            keep.push(kp);
        }
    }
    keep
}

/// A detected hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandRegion {
    pub bounds: Region,
    /// Convex hull of the hand contour, in drawing order.
    pub hull: Vec<(i32, i32)>,
    /// Area enclosed by the contour, in pixels.
    pub area: f64,
    /// `area` over the frame area.
    pub coverage: f64,
}
