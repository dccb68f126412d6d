//! Conversions between handcv pixel containers and the `image` crate

use crate::Result;
use crate::error::VisionError;
use handcv_core::{Bitmap, ChannelOrder, Matrix, PixelLayout, PlatformProfile, transcode};
use image::{DynamicImage, GrayImage, ImageBuffer, RgbImage, RgbaImage};
use log::debug;
use std::path::Path;

/// Image utility functions
pub struct ImageUtils;

impl ImageUtils {
    /// Load an image file as a platform bitmap with the profile's row alignment.
    pub fn load_bitmap<P: AsRef<Path>>(path: P, profile: &PlatformProfile) -> Result<Bitmap> {
        let img = image::open(&path)?;
        debug!("loaded {:?} ({}x{})", path.as_ref(), img.width(), img.height());
        Self::dynamic_to_bitmap(img, profile)
    }

    /// Save a bitmap, whatever its stride and channel order.
    pub fn save_bitmap<P: AsRef<Path>>(bitmap: &Bitmap, path: P) -> Result<()> {
        Self::bitmap_to_dynamic(bitmap)?.save(&path)?;
        debug!("saved {:?}", path.as_ref());
        Ok(())
    }

    /// Decoded file contents → bitmap in the profile's channel order.
    pub fn dynamic_to_bitmap(img: DynamicImage, profile: &PlatformProfile) -> Result<Bitmap> {
        let (width, height) = (img.width() as usize, img.height() as usize);
        let (raw, src_order) = match img {
            DynamicImage::ImageLuma8(buf) => (buf.into_raw(), ChannelOrder::Gray),
            DynamicImage::ImageRgb8(buf) => (buf.into_raw(), ChannelOrder::Rgb),
            other if other.color().has_alpha() => (other.to_rgba8().into_raw(), ChannelOrder::Rgba),
            other => (other.to_rgb8().into_raw(), ChannelOrder::Rgb),
        };
        let order = profile
            .order_for(src_order.channels())
            .unwrap_or(src_order);
        let src = PixelLayout::packed(src_order, width);
        let dst = PixelLayout::aligned(order, width, profile.row_alignment);
        let data = transcode(&raw, width, height, &src, &dst)?;
        Ok(Bitmap {
            width,
            height,
            bits_per_component: 8,
            layout: dst,
            data,
        })
    }

    /// Bitmap → `image` buffer with padding removed and channels in RGB(A) order.
    pub fn bitmap_to_dynamic(bitmap: &Bitmap) -> Result<DynamicImage> {
        let target = match bitmap.channels() {
            1 => ChannelOrder::Gray,
            3 => ChannelOrder::Rgb,
            4 => ChannelOrder::Rgba,
            n => {
                return Err(VisionError::InvalidInput(format!(
                    "unsupported channel count {n}"
                )));
            }
        };
        let dst = PixelLayout::packed(target, bitmap.width);
        let raw = transcode(&bitmap.data, bitmap.width, bitmap.height, &bitmap.layout, &dst)?;
        Self::packed_to_dynamic(bitmap.width as u32, bitmap.height as u32, target, raw)
    }

    /// Library-order matrix → `image` buffer in RGB(A) order.
    pub fn matrix_to_dynamic(matrix: &Matrix) -> Result<DynamicImage> {
        let src = matrix.layout()?;
        let target = match src.order {
            ChannelOrder::Bgr => ChannelOrder::Rgb,
            ChannelOrder::Bgra => ChannelOrder::Rgba,
            other => other,
        };
        let dst = PixelLayout::packed(target, matrix.cols);
        let raw = transcode(&matrix.data, matrix.cols, matrix.rows, &src, &dst)?;
        Self::packed_to_dynamic(matrix.cols as u32, matrix.rows as u32, target, raw)
    }

    /// Single-channel matrix → `GrayImage`, without copying channel semantics around.
    pub fn matrix_to_gray(matrix: &Matrix) -> Result<GrayImage> {
        if matrix.channels != 1 {
            return Err(VisionError::InvalidInput(format!(
                "expected a single-channel matrix, got {} channels",
                matrix.channels
            )));
        }
        matrix.layout()?;
        ImageBuffer::from_raw(matrix.cols as u32, matrix.rows as u32, matrix.data.clone())
            .ok_or_else(|| VisionError::Conversion("gray buffer size mismatch".into()))
    }

    /// `GrayImage` → single-channel matrix.
    pub fn gray_to_matrix(gray: GrayImage) -> Result<Matrix> {
        let (w, h) = gray.dimensions();
        Ok(Matrix::from_bytes(h as usize, w as usize, 1, gray.into_raw())?)
    }

    fn packed_to_dynamic(
        width: u32,
        height: u32,
        order: ChannelOrder,
        raw: Vec<u8>,
    ) -> Result<DynamicImage> {
        let mismatch = || VisionError::Conversion(format!("{order:?} buffer size mismatch"));
        Ok(match order {
            ChannelOrder::Gray => {
                let buffer = GrayImage::from_raw(width, height, raw).ok_or_else(mismatch)?;
                DynamicImage::ImageLuma8(buffer)
            }
            ChannelOrder::Rgb => {
                let buffer = RgbImage::from_raw(width, height, raw).ok_or_else(mismatch)?;
                DynamicImage::ImageRgb8(buffer)
            }
            ChannelOrder::Rgba => {
                let buffer = RgbaImage::from_raw(width, height, raw).ok_or_else(mismatch)?;
                DynamicImage::ImageRgba8(buffer)
            }
            other => {
                return Err(VisionError::Conversion(format!(
                    "{other:?} has no direct image buffer"
                )));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_to_dynamic_restores_rgb() -> Result<()> {
        let m = Matrix::from_bytes(1, 1, 3, vec![30, 20, 10])?;
        let img = ImageUtils::matrix_to_dynamic(&m)?.to_rgb8();
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30]);
        Ok(())
    }

    #[test]
    fn test_save_and_load_keeps_pixels() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("frame.png");
        let profile = PlatformProfile::camera();
        let bmp = Bitmap::filled(7, 5, ChannelOrder::Bgra, 64, &[1, 2, 3, 255]);

        ImageUtils::save_bitmap(&bmp, &path)?;
        let loaded = ImageUtils::load_bitmap(&path, &profile)?;

        assert_eq!(loaded.order(), ChannelOrder::Bgra);
        assert_eq!(loaded.stride(), 64);
        assert_eq!(loaded.pixel(6, 4), Some(&[1, 2, 3, 255][..]));
        Ok(())
    }

    #[test]
    fn test_gray_matrix_round_trip() -> Result<()> {
        let gray = GrayImage::from_fn(4, 3, |x, y| image::Luma([(x + y * 4) as u8]));
        let m = ImageUtils::gray_to_matrix(gray.clone())?;
        assert_eq!((m.rows, m.cols), (3, 4));
        assert_eq!(ImageUtils::matrix_to_gray(&m)?, gray);
        Ok(())
    }
}
