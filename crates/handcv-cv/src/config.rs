//! Vision configuration

use crate::Result;
use handcv_core::{ChannelOrder, PlatformProfile};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration of the façade
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub platform: PlatformProfile,
    pub matching: MatchingConfig,
    pub keypoints: KeypointConfig,
    pub hand: HandConfig,
    pub overlay: OverlayConfig,
}

/// Template matching method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchingMethod {
    /// Normalized cross-correlation (default)
    #[default]
    CCorrNormed,
    /// Raw cross-correlation
    CCorr,
    /// Normalized squared difference (inverted: lower is better)
    SqDiffNormed,
    /// Raw squared difference (inverted)
    SqDiff,
}

impl MatchingMethod {
    pub fn is_inverted(&self) -> bool {
        matches!(self, MatchingMethod::SqDiff | MatchingMethod::SqDiffNormed)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub method: MatchingMethod,
}

/// Keypoint detector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeypointConfig {
    /// Intensity difference a FAST arc must exceed.
    pub threshold: u8,
    /// Weaker keypoints closer than this to a stronger one are dropped. 0 keeps all.
    pub suppression_radius: u32,
    pub max_keypoints: usize,
}

impl Default for KeypointConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            suppression_radius: 3,
            max_keypoints: 500,
        }
    }
}

/// Skin-region hand detector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandConfig {
    /// Inclusive Cr band of skin pixels in YCrCb.
    pub cr_range: (u8, u8),
    /// Inclusive Cb band of skin pixels in YCrCb.
    pub cb_range: (u8, u8),
    /// Radius of the morphological opening that removes speckle.
    pub open_radius: u8,
    /// Smallest region, as a fraction of the frame, accepted as a hand.
    pub min_area_fraction: f64,
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            cr_range: (133, 173),
            cb_range: (77, 127),
            open_radius: 2,
            min_area_fraction: 0.01,
        }
    }
}

/// RGB color of an overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pixel bytes in `order`, opaque alpha. Gray uses BT.601 luma.
    pub fn to_pixel(self, order: ChannelOrder) -> Vec<u8> {
        if order == ChannelOrder::Gray {
            let luma = 0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32;
            return vec![luma.round() as u8];
        }
        let mut px = vec![0u8; order.channels()];
        let [r, g, b] = order.rgb_offsets();
        px[r] = self.r;
        px[g] = self.g;
        px[b] = self.b;
        if let Some(a) = order.alpha_offset() {
            px[a] = 255;
        }
        px
    }
}

/// Overlay drawing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub match_color: Color,
    pub keypoint_color: Color,
    pub hand_color: Color,
    pub hull_color: Color,
    pub thickness: u32,
    pub keypoint_radius: i32,
    pub draw_hull: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            match_color: Color::rgb(255, 0, 0),
            keypoint_color: Color::rgb(0, 255, 0),
            hand_color: Color::rgb(0, 0, 255),
            hull_color: Color::rgb(255, 255, 0),
            thickness: 2,
            keypoint_radius: 3,
            draw_hull: true,
        }
    }
}

impl VisionConfig {
    /// Configuration for 32-bit BGRA camera frames
    pub fn camera_frames() -> Self {
        Self {
            platform: PlatformProfile::camera(),
            overlay: OverlayConfig {
                thickness: 3,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Lower FAST threshold and tighter suppression, for low-contrast scenes
    pub fn sensitive_keypoints() -> Self {
        Self {
            keypoints: KeypointConfig {
                threshold: 8,
                suppression_radius: 2,
                max_keypoints: 1000,
            },
            ..Default::default()
        }
    }

    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_follows_channel_order() {
        let red = Color::rgb(255, 0, 0);
        assert_eq!(red.to_pixel(ChannelOrder::Bgr), vec![0, 0, 255]);
        assert_eq!(red.to_pixel(ChannelOrder::Argb), vec![255, 255, 0, 0]);
        assert_eq!(red.to_pixel(ChannelOrder::Gray), vec![76]);
    }

    #[test]
    fn test_partial_json_keeps_defaults() -> Result<()> {
        let config: VisionConfig =
            serde_json::from_str(r#"{ "keypoints": { "threshold": 42 } }"#)?;
        assert_eq!(config.keypoints.threshold, 42);
        assert_eq!(config.keypoints.max_keypoints, 500);
        assert_eq!(config.matching.method, MatchingMethod::CCorrNormed);
        Ok(())
    }

    #[test]
    fn test_json_file_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("vision.json");
        std::fs::write(&path, VisionConfig::camera_frames().to_json()?)?;

        let loaded = VisionConfig::from_json_file(&path)?;
        assert_eq!(loaded.platform, PlatformProfile::camera());
        assert_eq!(loaded.overlay.thickness, 3);
        Ok(())
    }
}
