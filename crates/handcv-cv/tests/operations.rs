// tests/operations.rs
use handcv_cv::{
    Bitmap, ChannelOrder, Findings, MatchingMethod, Operation, Region, Result, Vision,
    VisionConfig, VisionError,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

const SKIN: [u8; 3] = [224, 172, 138];
const BACKGROUND: [u8; 3] = [30, 60, 120];

fn noise(width: usize, height: usize, seed: u64) -> Bitmap {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..width * height * 3).map(|_| rng.r#gen::<u8>()).collect();
    Bitmap::packed(width, height, ChannelOrder::Rgb, data)
}

fn crop(src: &Bitmap, x: usize, y: usize, width: usize, height: usize) -> Bitmap {
    let c = src.channels();
    let data = src
        .rows()
        .skip(y)
        .take(height)
        .flat_map(|row| row[x * c..(x + width) * c].to_vec())
        .collect();
    Bitmap::packed(width, height, src.order(), data)
}

/// Background frame with a skin-colored block, rows padded to 16 bytes.
fn frame_with_hand(region: Region) -> Bitmap {
    let mut bmp = Bitmap::filled(120, 120, ChannelOrder::Rgb, 16, &BACKGROUND);
    let stride = bmp.stride();
    for y in region.y..region.y + region.height as i32 {
        for x in region.x..region.x + region.width as i32 {
            let at = y as usize * stride + x as usize * 3;
            bmp.data[at..at + 3].copy_from_slice(&SKIN);
        }
    }
    bmp
}

fn pixels(bmp: &Bitmap) -> Vec<u8> {
    bmp.rows().flatten().copied().collect()
}

#[test]
fn test_grayscale_is_single_channel_and_idempotent() -> Result<()> {
    let vision = Vision::new(VisionConfig::default())?;
    let image = noise(33, 17, 1);

    let once = vision.to_grayscale(&image)?;
    let twice = vision.to_grayscale(&once)?;

    assert_eq!(once.channels(), 1);
    assert_eq!((once.width, once.height), (33, 17));
    assert_eq!(pixels(&once), pixels(&twice));
    Ok(())
}

#[test]
fn test_grayscale_ignores_channel_order() -> Result<()> {
    let vision = Vision::new(VisionConfig::default())?;
    let rgb = Bitmap::filled(4, 4, ChannelOrder::Rgb, 0, &[200, 40, 10]);
    let bgr = Bitmap::filled(4, 4, ChannelOrder::Bgr, 8, &[10, 40, 200]);
    assert_eq!(
        pixels(&vision.to_grayscale(&rgb)?),
        pixels(&vision.to_grayscale(&bgr)?)
    );
    Ok(())
}

#[test]
fn test_match_reports_pasted_offset() -> Result<()> {
    let source = noise(64, 48, 7);
    let template = crop(&source, 37, 21, 12, 10);

    for method in [MatchingMethod::CCorrNormed, MatchingMethod::SqDiff] {
        let mut config = VisionConfig::default();
        config.matching.method = method;
        let vision = Vision::new(config)?;

        let found = vision.locate_template(&source, &template)?;
        assert_eq!(found.region, Region::new(37, 21, 12, 10), "{method:?}");
    }
    Ok(())
}

#[test]
fn test_match_outlines_best_location_on_a_copy() -> Result<()> {
    let vision = Vision::new(VisionConfig::default())?;
    let source = noise(64, 48, 11);
    let before = source.clone();
    let template = crop(&source, 5, 9, 16, 16);

    let annotated = vision.match_template(&source, &template)?;

    assert_eq!(source, before);
    assert_eq!(annotated.order(), ChannelOrder::Rgb);
    // default overlay color is red
    assert_eq!(annotated.rgb_at(5, 9), Some([255, 0, 0]));
    assert_eq!(annotated.rgb_at(12, 15), source.rgb_at(12, 15));
    Ok(())
}

#[test]
fn test_template_larger_than_source_is_invalid_input() -> Result<()> {
    let vision = Vision::new(VisionConfig::default())?;
    let source = noise(20, 20, 3);

    for (w, h) in [(21, 5), (5, 21), (21, 21)] {
        let template = noise(w, h, 4);
        let err = vision.match_template(&source, &template).unwrap_err();
        assert!(matches!(err, VisionError::InvalidInput(_)), "{w}x{h}: {err}");
    }
    Ok(())
}

#[test]
fn test_correlation_map_peaks_at_match() -> Result<()> {
    let vision = Vision::new(VisionConfig::default())?;
    let source = noise(40, 30, 5);
    let template = crop(&source, 8, 6, 10, 10);

    let heat = vision.correlation_map(&source, &template)?;

    assert_eq!((heat.width, heat.height), (31, 21));
    assert_eq!(heat.order(), ChannelOrder::Gray);
    assert_eq!(heat.pixel(8, 6), Some(&[255][..]));
    Ok(())
}

#[test]
fn test_blank_image_has_no_detections() -> Result<()> {
    let vision = Vision::new(VisionConfig::default())?;
    let blank = Bitmap::filled(64, 64, ChannelOrder::Rgba, 16, &[200, 200, 200, 255]);

    assert!(vision.find_keypoints(&blank)?.is_empty());
    assert_eq!(pixels(&vision.detect_keypoints(&blank)?), pixels(&blank));

    assert!(vision.locate_hand(&blank)?.is_none());
    assert_eq!(pixels(&vision.detect_hand(&blank)?), pixels(&blank));
    Ok(())
}

#[test]
fn test_keypoints_found_on_square_corners() -> Result<()> {
    let vision = Vision::new(VisionConfig::default())?;
    let mut image = Bitmap::filled(64, 64, ChannelOrder::Gray, 0, &[0]);
    for y in 20..40 {
        for x in 20..40 {
            image.data[y * 64 + x] = 255;
        }
    }

    let keypoints = vision.find_keypoints(&image)?;
    assert!(!keypoints.is_empty());
    for kp in &keypoints {
        let near_corner = [(20, 20), (39, 20), (20, 39), (39, 39)]
            .iter()
            .any(|&(cx, cy): &(u32, u32)| kp.x.abs_diff(cx) <= 3 && kp.y.abs_diff(cy) <= 3);
        assert!(near_corner, "unexpected keypoint {kp:?}");
    }

    let annotated = vision.detect_keypoints(&image)?;
    assert_ne!(pixels(&annotated), pixels(&image));
    Ok(())
}

#[test]
fn test_hand_region_is_located_and_outlined() -> Result<()> {
    let vision = Vision::new(VisionConfig::default())?;
    let block = Region::new(30, 40, 50, 60);
    let frame = frame_with_hand(block);

    let hand = vision.locate_hand(&frame)?.expect("hand");
    assert_eq!(hand.bounds, block);
    assert!(hand.coverage > 0.15 && hand.coverage < 0.25);
    assert!(hand.hull.len() >= 4);

    let annotated = vision.detect_hand(&frame)?;
    // inner ring of the two-pixel outline, away from the hull edges
    assert_eq!(annotated.rgb_at(55, 41), Some([0, 0, 255]));
    assert_eq!(annotated.rgb_at(55, 70), Some(SKIN));
    assert_eq!(annotated.rgb_at(5, 5), Some(BACKGROUND));
    Ok(())
}

#[test]
fn test_small_skin_speck_is_not_a_hand() -> Result<()> {
    let vision = Vision::new(VisionConfig::default())?;
    let frame = frame_with_hand(Region::new(10, 10, 8, 8));
    assert!(vision.locate_hand(&frame)?.is_none());
    Ok(())
}

#[test]
fn test_gray_input_has_no_hand() -> Result<()> {
    let vision = Vision::new(VisionConfig::default())?;
    let gray = vision.to_grayscale(&frame_with_hand(Region::new(30, 40, 50, 60)))?;
    assert!(vision.locate_hand(&gray)?.is_none());
    Ok(())
}

#[test]
fn test_run_returns_image_and_findings() -> Result<()> {
    let vision = Vision::new(VisionConfig::default())?;
    let frame = frame_with_hand(Region::new(30, 40, 50, 60));

    let outcome = vision.run(Operation::Hand, &frame, None)?;
    let Findings::Hand { hand: Some(hand) } = &outcome.findings else {
        panic!("expected a hand, got {:?}", outcome.findings);
    };
    assert_eq!(hand.bounds.x, 30);

    let json = serde_json::to_value(&outcome.findings).expect("serializable");
    assert_eq!(json["kind"], "hand");
    assert_eq!(json["hand"]["bounds"]["width"], 50);
    Ok(())
}

#[test]
fn test_invalid_bitmaps_surface_at_the_boundary() -> Result<()> {
    let vision = Vision::new(VisionConfig::default())?;

    let empty = Bitmap::packed(0, 0, ChannelOrder::Rgb, vec![]);
    assert!(vision.detect_hand(&empty).unwrap_err().is_invalid_input());

    let short = Bitmap::with_stride(8, 8, ChannelOrder::Rgb, 24, vec![0; 100]);
    assert!(matches!(
        vision.to_grayscale(&short),
        Err(VisionError::Conversion(_))
    ));
    Ok(())
}
