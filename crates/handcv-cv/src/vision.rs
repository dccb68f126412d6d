//! The vision façade
//!
//! Each operation decodes its input bitmaps, makes one backend call, draws the result
//! onto a copy where there is something to draw, and encodes back into the input's
//! channel order. Inputs are never mutated and nothing is kept between calls.

use crate::Result;
use crate::backend::{ImageprocBackend, ScoreMap};
use crate::config::VisionConfig;
use crate::error::VisionError;
use crate::overlay::{self, Layer, Shape};
use crate::region::{HandRegion, Keypoint, MatchLocation, Region, suppress_keypoints};
use crate::traits::VisionBackend;
use handcv_core::{Bitmap, Bridge, ChannelOrder, Matrix};
use log::{debug, info, warn};
use serde::Serialize;

/// Named operations, as a caller would pick them from a menu or command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operation {
    Grayscale,
    Match,
    Keypoints,
    Hand,
}

/// Structured side of an operation's result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Findings {
    Grayscale,
    Match(MatchLocation),
    Keypoints { keypoints: Vec<Keypoint> },
    Hand { hand: Option<HandRegion> },
}

/// Output image plus what was found in it
#[derive(Debug, Clone)]
pub struct Outcome {
    pub image: Bitmap,
    pub findings: Findings,
}

/// Vision operations over platform bitmaps
pub struct Vision<B: VisionBackend = ImageprocBackend> {
    backend: B,
    bridge: Bridge,
    config: VisionConfig,
    version: String,
}

impl Vision<ImageprocBackend> {
    /// Façade over the default pure-Rust backend
    pub fn new(config: VisionConfig) -> Result<Self> {
        Self::with_backend(ImageprocBackend::new(), config)
    }
}

impl<B: VisionBackend> Vision<B> {
    /// Initialize over `backend`. A backend that cannot report its version is treated as
    /// not loaded.
    pub fn with_backend(backend: B, config: VisionConfig) -> Result<Self> {
        let version = backend
            .version()
            .map_err(|e| VisionError::LibraryUnavailable(format!("{}: {e:#}", backend.name())))?;
        info!("vision backend {} ready ({})", backend.name(), version);
        Ok(Self {
            bridge: Bridge::new(config.platform),
            backend,
            config,
            version,
        })
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Version of the vision library in use
    pub fn version_string(&self) -> &str {
        &self.version
    }

    /// Single-channel copy of `image`.
    pub fn to_grayscale(&self, image: &Bitmap) -> Result<Bitmap> {
        let gray = self.gray_matrix(&self.bridge.decode(image)?)?;
        Ok(self.bridge.encode_as(&gray, ChannelOrder::Gray)?)
    }

    /// Copy of `source` with the best placement of `template` outlined.
    pub fn match_template(&self, source: &Bitmap, template: &Bitmap) -> Result<Bitmap> {
        let src = self.bridge.decode(source)?;
        let location = self.locate_in(&self.scores(&src, template)?, template)?;
        self.outline_match(&src, &location, source)
    }

    /// Best placement of `template` inside `source`.
    pub fn locate_template(&self, source: &Bitmap, template: &Bitmap) -> Result<MatchLocation> {
        let scores = self.scores(&self.bridge.decode(source)?, template)?;
        self.locate_in(&scores, template)
    }

    /// Score map of every placement, stretched to a gray heat map.
    pub fn correlation_map(&self, source: &Bitmap, template: &Bitmap) -> Result<Bitmap> {
        self.heat_map(self.scores(&self.bridge.decode(source)?, template)?)
    }

    /// Heat map of `template` over `source` together with the best placement, from a
    /// single scoring pass.
    pub fn heat_map_outcome(&self, source: &Bitmap, template: &Bitmap) -> Result<Outcome> {
        let scores = self.scores(&self.bridge.decode(source)?, template)?;
        let location = self.locate_in(&scores, template)?;
        Ok(Outcome {
            image: self.heat_map(scores)?,
            findings: Findings::Match(location),
        })
    }

    /// Copy of `image` with a marker on every keypoint.
    pub fn detect_keypoints(&self, image: &Bitmap) -> Result<Bitmap> {
        let matrix = self.bridge.decode(image)?;
        let keypoints = self.keypoints_in(&matrix)?;
        self.mark_keypoints(&matrix, &keypoints, image)
    }

    /// Keypoints of `image`, strongest first.
    pub fn find_keypoints(&self, image: &Bitmap) -> Result<Vec<Keypoint>> {
        self.keypoints_in(&self.bridge.decode(image)?)
    }

    /// Copy of `image` with the detected hand outlined; unchanged when there is none.
    pub fn detect_hand(&self, image: &Bitmap) -> Result<Bitmap> {
        let matrix = self.bridge.decode(image)?;
        let hand = self.hand_in(&matrix)?;
        self.outline_hand(matrix, hand.as_ref(), image)
    }

    /// The detected hand, if any.
    pub fn locate_hand(&self, image: &Bitmap) -> Result<Option<HandRegion>> {
        self.hand_in(&self.bridge.decode(image)?)
    }

    /// Run `op` and return both the image and the structured result. The input is decoded
    /// once and the backend is asked once; `Match` needs a template.
    pub fn run(
        &self,
        op: Operation,
        image: &Bitmap,
        template: Option<&Bitmap>,
    ) -> Result<Outcome> {
        debug!("running {:?} on {}x{} {:?}", op, image.width, image.height, image.order());
        match op {
            Operation::Grayscale => Ok(Outcome {
                image: self.to_grayscale(image)?,
                findings: Findings::Grayscale,
            }),
            Operation::Match => {
                let template = template
                    .ok_or_else(|| VisionError::InvalidInput("match needs a template".into()))?;
                let matrix = self.bridge.decode(image)?;
                let location = self.locate_in(&self.scores(&matrix, template)?, template)?;
                Ok(Outcome {
                    image: self.outline_match(&matrix, &location, image)?,
                    findings: Findings::Match(location),
                })
            }
            Operation::Keypoints => {
                let matrix = self.bridge.decode(image)?;
                let keypoints = self.keypoints_in(&matrix)?;
                Ok(Outcome {
                    image: self.mark_keypoints(&matrix, &keypoints, image)?,
                    findings: Findings::Keypoints { keypoints },
                })
            }
            Operation::Hand => {
                let matrix = self.bridge.decode(image)?;
                let hand = self.hand_in(&matrix)?;
                Ok(Outcome {
                    image: self.outline_hand(matrix, hand.as_ref(), image)?,
                    findings: Findings::Hand { hand },
                })
            }
        }
    }

    fn gray_matrix(&self, matrix: &Matrix) -> Result<Matrix> {
        let gray = self.backend.to_gray(matrix).map_err(library)?;
        if gray.channels != 1 {
            return Err(VisionError::Conversion(format!(
                "{} returned {} channels for a gray conversion",
                self.backend.name(),
                gray.channels
            )));
        }
        Ok(gray)
    }

    fn scores(&self, source: &Matrix, template: &Bitmap) -> Result<ScoreMap> {
        let tpl = self.bridge.decode(template)?;
        if tpl.cols > source.cols || tpl.rows > source.rows {
            return Err(VisionError::InvalidInput(format!(
                "template {}x{} is larger than source {}x{}",
                tpl.cols, tpl.rows, source.cols, source.rows
            )));
        }
        let (src_gray, tpl_gray) = (self.gray_matrix(source)?, self.gray_matrix(&tpl)?);
        self.backend
            .match_template(&src_gray, &tpl_gray, self.config.matching.method)
            .map_err(library)
    }

    fn locate_in(&self, scores: &ScoreMap, template: &Bitmap) -> Result<MatchLocation> {
        let (x, y, score) = scores.best().ok_or_else(|| {
            VisionError::Library(anyhow::anyhow!(
                "{} produced no finite match score",
                self.backend.name()
            ))
        })?;
        debug!("best match at ({x}, {y}) score {score}");
        Ok(MatchLocation {
            region: Region::new(
                x as i32,
                y as i32,
                template.width as u32,
                template.height as u32,
            ),
            score,
        })
    }

    fn heat_map(&self, scores: ScoreMap) -> Result<Bitmap> {
        let heat = scores.into_matrix()?.normalized_u8()?;
        Ok(self.bridge.encode_as(&heat, ChannelOrder::Gray)?)
    }

    fn keypoints_in(&self, matrix: &Matrix) -> Result<Vec<Keypoint>> {
        let gray = self.gray_matrix(matrix)?;
        let cfg = &self.config.keypoints;
        let raw = self.backend.detect_keypoints(&gray, cfg).map_err(library)?;
        let found = raw.len();
        let kept = suppress_keypoints(raw, cfg.suppression_radius, cfg.max_keypoints);
        debug!("{} keypoints detected, {} kept", found, kept.len());
        Ok(kept)
    }

    fn hand_in(&self, matrix: &Matrix) -> Result<Option<HandRegion>> {
        if matrix.channels < 3 {
            warn!(
                "hand detection on {}-channel input: no chroma to segment skin",
                matrix.channels
            );
        }
        let hand = self
            .backend
            .detect_hand(matrix, &self.config.hand)
            .map_err(library)?;
        match &hand {
            Some(h) => debug!("hand at {:?}, coverage {:.3}", h.bounds, h.coverage),
            None => debug!("no hand found"),
        }
        Ok(hand)
    }

    fn outline_match(
        &self,
        matrix: &Matrix,
        location: &MatchLocation,
        like: &Bitmap,
    ) -> Result<Bitmap> {
        let layer = Layer::new(
            self.config.overlay.match_color,
            vec![Shape::Rect {
                region: location.region,
                thickness: self.config.overlay.thickness,
            }],
        );
        self.encode_like(&overlay::draw(matrix, &[layer])?, like)
    }

    fn mark_keypoints(
        &self,
        matrix: &Matrix,
        keypoints: &[Keypoint],
        like: &Bitmap,
    ) -> Result<Bitmap> {
        let overlay = &self.config.overlay;
        let shapes = keypoints
            .iter()
            .map(|kp| Shape::Circle {
                center: (kp.x as i32, kp.y as i32),
                radius: overlay.keypoint_radius,
            })
            .collect();
        let annotated = overlay::draw(matrix, &[Layer::new(overlay.keypoint_color, shapes)])?;
        self.encode_like(&annotated, like)
    }

    fn outline_hand(
        &self,
        matrix: Matrix,
        hand: Option<&HandRegion>,
        like: &Bitmap,
    ) -> Result<Bitmap> {
        let Some(hand) = hand else {
            return self.encode_like(&matrix, like);
        };
        let overlay = &self.config.overlay;
        let mut layers = vec![Layer::new(
            overlay.hand_color,
            vec![Shape::Rect {
                region: hand.bounds,
                thickness: overlay.thickness,
            }],
        )];
        if overlay.draw_hull && hand.hull.len() > 1 {
            layers.push(Layer::new(
                overlay.hull_color,
                vec![Shape::Polygon {
                    points: hand.hull.clone(),
                }],
            ));
        }
        self.encode_like(&overlay::draw(&matrix, &layers)?, like)
    }

    /// Encode back into the caller's channel order.
    fn encode_like(&self, matrix: &Matrix, like: &Bitmap) -> Result<Bitmap> {
        Ok(self.bridge.encode_as(matrix, like.order())?)
    }
}

/// Unwrap façade errors that travelled through a backend, pass anything else through.
fn library(err: anyhow::Error) -> VisionError {
    match err.downcast::<VisionError>() {
        Ok(inner) => inner,
        Err(other) => VisionError::Library(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HandConfig, KeypointConfig, MatchingMethod};
    use std::cell::Cell;

    /// Default backend that counts detection calls.
    #[derive(Default)]
    struct Counting {
        inner: ImageprocBackend,
        matches: Cell<usize>,
        keypoints: Cell<usize>,
        hands: Cell<usize>,
    }

    impl VisionBackend for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }
        fn version(&self) -> anyhow::Result<String> {
            self.inner.version()
        }
        fn to_gray(&self, image: &Matrix) -> anyhow::Result<Matrix> {
            self.inner.to_gray(image)
        }
        fn match_template(
            &self,
            source: &Matrix,
            template: &Matrix,
            method: MatchingMethod,
        ) -> anyhow::Result<ScoreMap> {
            self.matches.set(self.matches.get() + 1);
            self.inner.match_template(source, template, method)
        }
        fn detect_keypoints(
            &self,
            gray: &Matrix,
            config: &KeypointConfig,
        ) -> anyhow::Result<Vec<Keypoint>> {
            self.keypoints.set(self.keypoints.get() + 1);
            self.inner.detect_keypoints(gray, config)
        }
        fn detect_hand(
            &self,
            image: &Matrix,
            config: &HandConfig,
        ) -> anyhow::Result<Option<HandRegion>> {
            self.hands.set(self.hands.get() + 1);
            self.inner.detect_hand(image, config)
        }
    }

    struct Unloaded;

    impl VisionBackend for Unloaded {
        fn name(&self) -> &'static str {
            "unloaded"
        }
        fn version(&self) -> anyhow::Result<String> {
            anyhow::bail!("library not linked")
        }
        fn to_gray(&self, _: &Matrix) -> anyhow::Result<Matrix> {
            unreachable!()
        }
        fn match_template(
            &self,
            _: &Matrix,
            _: &Matrix,
            _: crate::config::MatchingMethod,
        ) -> anyhow::Result<ScoreMap> {
            unreachable!()
        }
        fn detect_keypoints(
            &self,
            _: &Matrix,
            _: &crate::config::KeypointConfig,
        ) -> anyhow::Result<Vec<Keypoint>> {
            unreachable!()
        }
        fn detect_hand(
            &self,
            _: &Matrix,
            _: &crate::config::HandConfig,
        ) -> anyhow::Result<Option<HandRegion>> {
            unreachable!()
        }
    }

    #[test]
    fn test_unloaded_backend_is_library_unavailable() {
        let err = Vision::with_backend(Unloaded, VisionConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, VisionError::LibraryUnavailable(_)));
    }

    #[test]
    fn test_version_is_captured_at_construction() -> Result<()> {
        let vision = Vision::new(VisionConfig::default())?;
        assert!(vision.version_string().starts_with("imageproc backend"));
        Ok(())
    }

    #[test]
    fn test_match_without_template_is_invalid() -> Result<()> {
        let vision = Vision::new(VisionConfig::default())?;
        let image = Bitmap::filled(4, 4, ChannelOrder::Rgb, 0, &[1, 2, 3]);
        let err = vision.run(Operation::Match, &image, None).unwrap_err();
        assert!(err.is_invalid_input());
        Ok(())
    }

    #[test]
    fn test_output_keeps_input_order() -> Result<()> {
        let vision = Vision::new(VisionConfig::camera_frames())?;
        let image = Bitmap::filled(16, 16, ChannelOrder::Rgba, 0, &[9, 9, 9, 255]);
        let out = vision.detect_keypoints(&image)?;
        assert_eq!(out.order(), ChannelOrder::Rgba);
        assert_eq!(out.stride() % 64, 0);
        Ok(())
    }

    #[test]
    fn test_run_asks_the_backend_once_per_operation() -> Result<()> {
        let vision = Vision::with_backend(Counting::default(), VisionConfig::default())?;
        let mut image = Bitmap::filled(32, 32, ChannelOrder::Rgb, 0, &[20, 40, 90]);
        for (i, px) in image.data.chunks_mut(3).enumerate() {
            px[0] = (i * 7 % 251) as u8;
        }
        let template = Bitmap::filled(6, 6, ChannelOrder::Rgb, 0, &[20, 40, 90]);

        vision.run(Operation::Match, &image, Some(&template))?;
        vision.run(Operation::Keypoints, &image, None)?;
        vision.run(Operation::Hand, &image, None)?;
        assert_eq!(vision.backend().matches.get(), 1);
        assert_eq!(vision.backend().keypoints.get(), 1);
        assert_eq!(vision.backend().hands.get(), 1);

        let outcome = vision.heat_map_outcome(&image, &template)?;
        assert_eq!(vision.backend().matches.get(), 2);
        assert_eq!((outcome.image.width, outcome.image.height), (27, 27));
        assert!(matches!(outcome.findings, Findings::Match(_)));
        Ok(())
    }
}
