//! OpenCV backend
//!
//! Uses the `_def` variants of OpenCV functions so the same code builds against the
//! 4.x releases found on common distributions.

use super::ScoreMap;
use crate::config::{HandConfig, KeypointConfig, MatchingMethod};
use crate::region::{HandRegion, Keypoint, Region};
use crate::traits::VisionBackend;
use anyhow::{Context, bail, ensure};
use handcv_core::{Depth, Matrix};
use opencv::{
    core::{self, KeyPoint, Mat, Point, Scalar, Size, Vector},
    features2d, imgproc,
    prelude::*,
};

/// Backend delegating to the system OpenCV installation.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCvBackend;

impl OpenCvBackend {
    pub fn new() -> Self {
        Self
    }
}

fn to_mat(matrix: &Matrix) -> anyhow::Result<Mat> {
    ensure!(matrix.depth == Depth::U8, "only 8-bit matrices go to OpenCV");
    let typ = match matrix.channels {
        1 => core::CV_8UC1,
        3 => core::CV_8UC3,
        4 => core::CV_8UC4,
        n => bail!("unsupported channel count {n}"),
    };
    let mut mat = Mat::new_rows_cols_with_default(
        matrix.rows as i32,
        matrix.cols as i32,
        typ,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(&matrix.data);
    Ok(mat)
}

fn from_mat(mat: &Mat) -> anyhow::Result<Matrix> {
    ensure!(mat.depth() == core::CV_8U, "OpenCV returned a non-byte matrix");
    let owned;
    let mat = if mat.is_continuous() {
        mat
    } else {
        owned = mat.try_clone()?;
        &owned
    };
    Ok(Matrix::from_bytes(
        mat.rows() as usize,
        mat.cols() as usize,
        mat.channels() as usize,
        mat.data_bytes()?.to_vec(),
    )?)
}

fn to_bgr(mat: &Mat) -> anyhow::Result<Mat> {
    if mat.channels() == 3 {
        return Ok(mat.try_clone()?);
    }
    let mut bgr = Mat::default();
    imgproc::cvt_color_def(mat, &mut bgr, imgproc::COLOR_BGRA2BGR)?;
    Ok(bgr)
}

fn to_opencv(method: MatchingMethod) -> i32 {
    match method {
        MatchingMethod::CCorrNormed => imgproc::TM_CCORR_NORMED,
        MatchingMethod::CCorr => imgproc::TM_CCORR,
        MatchingMethod::SqDiffNormed => imgproc::TM_SQDIFF_NORMED,
        MatchingMethod::SqDiff => imgproc::TM_SQDIFF,
    }
}

impl VisionBackend for OpenCvBackend {
    fn name(&self) -> &'static str {
        "opencv"
    }

    fn version(&self) -> anyhow::Result<String> {
        Ok(format!("OpenCV {}", core::get_version_string()?))
    }

    fn to_gray(&self, image: &Matrix) -> anyhow::Result<Matrix> {
        let code = match image.channels {
            1 => return Ok(image.clone()),
            3 => imgproc::COLOR_BGR2GRAY,
            4 => imgproc::COLOR_BGRA2GRAY,
            n => bail!("unsupported channel count {n}"),
        };
        let mut gray = Mat::default();
        imgproc::cvt_color_def(&to_mat(image)?, &mut gray, code).context("cvtColor failed")?;
        from_mat(&gray)
    }

    fn match_template(
        &self,
        source: &Matrix,
        template: &Matrix,
        method: MatchingMethod,
    ) -> anyhow::Result<ScoreMap> {
        let mut result = Mat::default();
        imgproc::match_template(
            &to_mat(source)?,
            &to_mat(template)?,
            &mut result,
            to_opencv(method),
            &core::no_array(),
        )
        .context("Template matching failed")?;

        Ok(ScoreMap {
            width: result.cols() as u32,
            height: result.rows() as u32,
            scores: result.data_typed::<f32>()?.to_vec(),
            method,
        })
    }

    fn detect_keypoints(
        &self,
        gray: &Matrix,
        config: &KeypointConfig,
    ) -> anyhow::Result<Vec<Keypoint>> {
        let mut detector = features2d::FastFeatureDetector::create_def()?;
        detector.set_threshold(config.threshold as i32)?;

        let mut found = Vector::<KeyPoint>::new();
        detector
            .detect(&to_mat(gray)?, &mut found, &core::no_array())
            .context("FAST detection failed")?;

        Ok(found
            .iter()
            .map(|kp| Keypoint {
                x: kp.pt().x.round().max(0.0) as u32,
                y: kp.pt().y.round().max(0.0) as u32,
                score: kp.response(),
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

        let mut ycrcb = Mat::default();
        let bgr = to_bgr(&to_mat(image)?)?;
        imgproc::cvt_color_def(&bgr, &mut ycrcb, imgproc::COLOR_BGR2YCrCb)?;

        let lower = Scalar::new(0.0, config.cr_range.0 as f64, config.cb_range.0 as f64, 0.0);
        let upper = Scalar::new(255.0, config.cr_range.1 as f64, config.cb_range.1 as f64, 0.0);
        let mut mask = Mat::default();
        core::in_range(&ycrcb, &lower, &upper, &mut mask)?;

        if config.open_radius > 0 {
            let k = 2 * config.open_radius as i32 + 1;
            let kernel =
                imgproc::get_structuring_element_def(imgproc::MORPH_RECT, Size::new(k, k))?;
            let mut opened = Mat::default();
            imgproc::morphology_ex_def(&mask, &mut opened, imgproc::MORPH_OPEN, &kernel)?;
            mask = opened;
        }

        let mut contours = Vector::<Vector<Point>>::new();
        imgproc::find_contours_def(
            &mask,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_NONE,
        )?;

        let mut largest: Option<(f64, Vector<Point>)> = None;
        for contour in contours.iter() {
            let area = imgproc::contour_area_def(&contour)?;
            if largest.as_ref().is_none_or(|(best, _)| area > *best) {
                largest = Some((area, contour));
            }
        }
        let Some((area, contour)) = largest else {
            return Ok(None);
        };

        let coverage = area / (image.cols * image.rows) as f64;
        if coverage < config.min_area_fraction {
            return Ok(None);
        }

        let rect = imgproc::bounding_rect(&contour)?;
        let mut hull = Vector::<Point>::new();
        imgproc::convex_hull_def(&contour, &mut hull)?;

        Ok(Some(HandRegion {
            bounds: Region::new(rect.x, rect.y, rect.width as u32, rect.height as u32),
            hull: hull.iter().map(|p| (p.x, p.y)).collect(),
            area,
            coverage,
        }))
    }
}
