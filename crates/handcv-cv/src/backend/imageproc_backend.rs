//! Pure-Rust backend on top of `image` and `imageproc`

use super::ScoreMap;
use crate::config::{HandConfig, KeypointConfig, MatchingMethod};
use crate::region::{HandRegion, Keypoint, Region};
use crate::traits::VisionBackend;
use crate::utils::ImageUtils;
use anyhow::{Context, ensure};
use handcv_core::Matrix;
use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::corners::corners_fast9;
use imageproc::distance_transform::Norm;
use imageproc::geometry::convex_hull;
use imageproc::morphology::open;
use imageproc::point::Point;
use imageproc::template_matching::MatchTemplateMethod;
use log::debug;

/// Backend running every operation in-process with `imageproc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageprocBackend;

impl ImageprocBackend {
    pub fn new() -> Self {
        Self
    }

    /// Binary skin mask: 255 where Cr and Cb fall inside the configured bands.
    fn skin_mask(&self, image: &Matrix, config: &HandConfig) -> anyhow::Result<GrayImage> {
        let rgb = ImageUtils::matrix_to_dynamic(image)?.to_rgb8();
        let (cr_lo, cr_hi) = config.cr_range;
        let (cb_lo, cb_hi) = config.cb_range;

        Ok(GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            let [r, g, b] = rgb.get_pixel(x, y).0;
            let (cr, cb) = chroma(r, g, b);
            let skin = (cr_lo..=cr_hi).contains(&cr) && (cb_lo..=cb_hi).contains(&cb);
            image::Luma([if skin { 255 } else { 0 }])
        }))
    }
}

/// Cr and Cb of an 8-bit RGB pixel (ITU-R BT.601, offset 128).
fn chroma(r: u8, g: u8, b: u8) -> (u8, u8) {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cr = (r - y) * 0.713 + 128.0;
    let cb = (b - y) * 0.564 + 128.0;
    (
        cr.round().clamp(0.0, 255.0) as u8,
        cb.round().clamp(0.0, 255.0) as u8,
    )
}

/// Shoelace area of a closed polygon.
fn polygon_area(points: &[Point<i32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: i64 = (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
        })
        .sum();
    twice.abs() as f64 / 2.0
}

fn to_imageproc(method: MatchingMethod) -> MatchTemplateMethod {
    match method {
        MatchingMethod::CCorrNormed => MatchTemplateMethod::CrossCorrelationNormalized,
        MatchingMethod::CCorr => MatchTemplateMethod::CrossCorrelation,
        MatchingMethod::SqDiffNormed => MatchTemplateMethod::SumOfSquaredErrorsNormalized,
        MatchingMethod::SqDiff => MatchTemplateMethod::SumOfSquaredErrors,
    }
}

impl VisionBackend for ImageprocBackend {
    fn name(&self) -> &'static str {
        "imageproc"
    }

    fn version(&self) -> anyhow::Result<String> {
        Ok(format!("imageproc backend {}", env!("CARGO_PKG_VERSION")))
    }

    fn to_gray(&self, image: &Matrix) -> anyhow::Result<Matrix> {
        if image.channels == 1 {
            return Ok(image.clone());
        }
        let luma = ImageUtils::matrix_to_dynamic(image)
            .context("Failed to prepare matrix for luma conversion")?
            .to_luma8();
        Ok(ImageUtils::gray_to_matrix(luma)?)
    }

    fn match_template(
        &self,
        source: &Matrix,
        template: &Matrix,
        method: MatchingMethod,
    ) -> anyhow::Result<ScoreMap> {
        let source =
            ImageUtils::matrix_to_gray(source).context("Template matching needs gray input")?;
        let template =
            ImageUtils::matrix_to_gray(template).context("Template matching needs gray input")?;
        ensure!(
            template.width() <= source.width() && template.height() <= source.height(),
            "template {:?} does not fit in source {:?}",
            template.dimensions(),
            source.dimensions()
        );

        #[cfg(feature = "parallel")]
        let scores = imageproc::template_matching::match_template_parallel(
            &source,
            &template,
            to_imageproc(method),
        );
        #[cfg(not(feature = "parallel"))]
        let scores =
            imageproc::template_matching::match_template(&source, &template, to_imageproc(method));

        let (width, height) = scores.dimensions();
        Ok(ScoreMap {
            width,
            height,
            scores: scores.into_raw(),
            method,
        })
    }

    fn detect_keypoints(
        &self,
        gray: &Matrix,
        config: &KeypointConfig,
    ) -> anyhow::Result<Vec<Keypoint>> {
        let gray = ImageUtils::matrix_to_gray(gray).context("FAST needs gray input")?;
        Ok(corners_fast9(&gray, config.threshold)
            .into_iter()
            .map(|c| Keypoint {
                x: c.x,
                y: c.y,
                score: c.score,
            })
            .collect())
    }

    fn detect_hand(
        &self,
        image: &Matrix,
        config: &HandConfig,
    ) -> anyhow::Result<Option<HandRegion>> {
        if image.channels < 3 {
            return Ok(None);
        }

        let mut mask = self.skin_mask(image, config)?;
        if config.open_radius > 0 {
            mask = open(&mask, Norm::LInf, config.open_radius);
        }

        let largest = find_contours::<i32>(&mask)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer)
            .map(|c| (polygon_area(&c.points), c))
            .max_by(|a, b| a.0.total_cmp(&b.0));

        let Some((area, contour)) = largest else {
            return Ok(None);
        };

        let frame = (image.cols * image.rows) as f64;
        let coverage = area / frame;
        if coverage < config.min_area_fraction {
            debug!(
                "largest skin region covers {:.4} of the frame, below {:.4}",
                coverage, config.min_area_fraction
            );
            return Ok(None);
        }

        let outline: Vec<(i32, i32)> = contour.points.iter().map(|p| (p.x, p.y)).collect();
        let bounds = Region::bounding(&outline).context("Contour without points")?;
        let hull = convex_hull(contour.points)
            .into_iter()
            .map(|p| (p.x, p.y))
            .collect();

        Ok(Some(HandRegion {
            bounds,
            hull,
            area,
            coverage,
        }))
    }
}
