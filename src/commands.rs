//! Image commands driven through the vision façade

use anyhow::{Context, Result};
use handcv_cv::traits::VisionBackend;
use handcv_cv::{
    Bitmap, Findings, ImageUtils, ImageprocBackend, Operation, Rotation, Vision, VisionConfig,
};
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendChoice {
    Imageproc,
    #[cfg(feature = "opencv")]
    OpenCv,
}

/// One image command
#[derive(Debug, Clone)]
pub struct Request {
    pub operation: Operation,
    pub input: PathBuf,
    pub template: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub rotation: Option<Rotation>,
    pub heat_map: bool,
    pub json: bool,
}

/// What `--json` prints
#[derive(Debug, Serialize)]
struct Report<'a> {
    operation: Operation,
    backend: &'a str,
    version: &'a str,
    input: &'a Path,
    output: Option<&'a Path>,
    width: usize,
    height: usize,
    findings: &'a Findings,
}

pub fn print_version(backend: BackendChoice, config: VisionConfig) -> Result<()> {
    match backend {
        BackendChoice::Imageproc => {
            let vision = Vision::with_backend(ImageprocBackend::new(), config)?;
            println!("{}", vision.version_string());
        }
        #[cfg(feature = "opencv")]
        BackendChoice::OpenCv => println!(
            "{}",
            Vision::with_backend(handcv_cv::OpenCvBackend::new(), config)?.version_string()
        ),
    }
    Ok(())
}

pub fn execute(backend: BackendChoice, config: VisionConfig, request: &Request) -> Result<()> {
    match backend {
        BackendChoice::Imageproc => run(
            &Vision::with_backend(ImageprocBackend::new(), config)?,
            request,
        ),
        #[cfg(feature = "opencv")]
        BackendChoice::OpenCv => run(
            &Vision::with_backend(handcv_cv::OpenCvBackend::new(), config)?,
            request,
        ),
    }
}

fn load(path: &Path, vision: &Vision<impl VisionBackend>) -> Result<Bitmap> {
    ImageUtils::load_bitmap(path, vision.bridge().profile())
        .with_context(|| format!("Failed to load image: {:?}", path))
}

fn run<B: VisionBackend>(vision: &Vision<B>, request: &Request) -> Result<()> {
    let mut image = load(&request.input, vision)?;
    if let Some(rotation) = request.rotation {
        image = image.rotated(rotation);
    }
    let template = request
        .template
        .as_deref()
        .map(|path| load(path, vision))
        .transpose()?;

    let outcome = match (&template, request.heat_map) {
        (Some(template), true) => vision.heat_map_outcome(&image, template)?,
        _ => vision.run(request.operation, &image, template.as_ref())?,
    };

    if let Some(output) = &request.output {
        ImageUtils::save_bitmap(&outcome.image, output)
            .with_context(|| format!("Failed to save output: {:?}", output))?;
        info!("{:?} result saved: {:?}", request.operation, output);
    }

    if request.json {
        let report = Report {
            operation: request.operation,
            backend: vision.backend().name(),
            version: vision.version_string(),
            input: &request.input,
            output: request.output.as_deref(),
            width: image.width,
            height: image.height,
            findings: &outcome.findings,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize result")?
        );
    } else {
        summarize(&outcome.findings);
    }

    Ok(())
}

fn summarize(findings: &Findings) {
    match findings {
        Findings::Grayscale => info!("converted to grayscale"),
        Findings::Match(location) => info!(
            "best match at ({}, {}) score {:.4}",
            location.region.x, location.region.y, location.score
        ),
        Findings::Keypoints { keypoints } => info!("{} keypoints", keypoints.len()),
        Findings::Hand { hand: Some(hand) } => info!(
            "hand at {:?}, {:.1}% of the frame",
            hand.bounds,
            hand.coverage * 100.0
        ),
        Findings::Hand { hand: None } => info!("no hand detected"),
    }
}
