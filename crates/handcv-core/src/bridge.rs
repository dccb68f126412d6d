//! Conversion between platform bitmaps and library matrices

use crate::bitmap::Bitmap;
use crate::error::{BridgeError, Result};
use crate::layout::{ChannelOrder, Depth, Origin, PixelLayout, transcode};
use crate::legacy::{LEGACY_ROW_ALIGN, LegacyImage};
use crate::matrix::Matrix;
use log::debug;
use serde::{Deserialize, Serialize};

/// What the host platform's bitmaps look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformProfile {
    /// Order used for three-channel bitmaps produced by `encode`.
    pub color_order: ChannelOrder,
    /// Order used for four-channel bitmaps produced by `encode`.
    pub alpha_order: ChannelOrder,
    /// Row alignment in bytes of bitmaps produced by `encode`.
    pub row_alignment: usize,
}

impl Default for PlatformProfile {
    fn default() -> Self {
        Self {
            color_order: ChannelOrder::Rgb,
            alpha_order: ChannelOrder::Rgba,
            row_alignment: 16,
        }
    }
}

impl PlatformProfile {
    /// 32-bit BGRA camera frames with 64-byte rows.
    pub fn camera() -> Self {
        Self {
            color_order: ChannelOrder::Bgr,
            alpha_order: ChannelOrder::Bgra,
            row_alignment: 64,
        }
    }

    /// Order `encode` picks for a matrix with `channels` channels.
    pub fn order_for(&self, channels: usize) -> Option<ChannelOrder> {
        match channels {
            1 => Some(ChannelOrder::Gray),
            3 => Some(self.color_order),
            4 => Some(self.alpha_order),
            _ => None,
        }
    }
}

/// Stateless converter; holds only the platform description.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bridge {
    profile: PlatformProfile,
}

impl Bridge {
    pub fn new(profile: PlatformProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    /// Bitmap → packed library-order matrix.
    pub fn decode(&self, bitmap: &Bitmap) -> Result<Matrix> {
        let native = validate_bitmap(bitmap)?;
        let dst = PixelLayout::packed(native, bitmap.width);
        let data = transcode(&bitmap.data, bitmap.width, bitmap.height, &bitmap.layout, &dst)?;
        debug!(
            "decoded {}x{} {:?} bitmap (stride {}) into {:?} matrix",
            bitmap.width,
            bitmap.height,
            bitmap.order(),
            bitmap.stride(),
            native
        );
        Matrix::from_bytes(bitmap.height, bitmap.width, native.channels(), data)
    }

    /// Matrix → bitmap in the platform's order for the matrix's channel count.
    pub fn encode(&self, matrix: &Matrix) -> Result<Bitmap> {
        let order = self.profile.order_for(matrix.channels).ok_or_else(|| {
            BridgeError::invalid(format!("unsupported channel count {}", matrix.channels))
        })?;
        self.encode_as(matrix, order)
    }

    /// Matrix → bitmap in an explicit channel order.
    pub fn encode_as(&self, matrix: &Matrix, order: ChannelOrder) -> Result<Bitmap> {
        let src = validate_matrix(matrix)?;
        let dst = PixelLayout::aligned(order, matrix.cols, self.profile.row_alignment);
        let data = transcode(&matrix.data, matrix.cols, matrix.rows, &src, &dst)?;
        Ok(Bitmap {
            width: matrix.cols,
            height: matrix.rows,
            bits_per_component: 8,
            layout: dst,
            data,
        })
    }

    /// Bitmap → legacy handle in library order, rows stored in `origin` order.
    pub fn decode_legacy(&self, bitmap: &Bitmap, origin: Origin) -> Result<LegacyImage> {
        let native = validate_bitmap(bitmap)?;
        let dst = PixelLayout::aligned(native, bitmap.width, LEGACY_ROW_ALIGN).with_origin(origin);
        let data = transcode(&bitmap.data, bitmap.width, bitmap.height, &bitmap.layout, &dst)?;
        Ok(LegacyImage {
            width: bitmap.width,
            height: bitmap.height,
            depth: Depth::U8,
            channels: native.channels(),
            origin,
            channel_order: native,
            width_step: dst.stride,
            data,
        })
    }

    /// Legacy handle → top-left bitmap in the platform's order.
    pub fn encode_legacy(&self, image: &LegacyImage) -> Result<Bitmap> {
        if image.width == 0 || image.height == 0 {
            return Err(BridgeError::invalid(format!(
                "legacy image has zero dimension ({}x{})",
                image.width, image.height
            )));
        }
        if image.depth != Depth::U8 {
            return Err(BridgeError::invalid(format!(
                "legacy depth {:?} is not byte-sized",
                image.depth
            )));
        }
        if image.channels != image.channel_order.channels() {
            return Err(BridgeError::conversion(format!(
                "legacy image declares {} channels but sequence {:?}",
                image.channels, image.channel_order
            )));
        }
        let order = self.profile.order_for(image.channels).ok_or_else(|| {
            BridgeError::invalid(format!("unsupported channel count {}", image.channels))
        })?;
        let dst = PixelLayout::aligned(order, image.width, self.profile.row_alignment);
        let data = transcode(&image.data, image.width, image.height, &image.layout(), &dst)?;
        Ok(Bitmap {
            width: image.width,
            height: image.height,
            bits_per_component: 8,
            layout: dst,
            data,
        })
    }
}

fn validate_bitmap(bitmap: &Bitmap) -> Result<ChannelOrder> {
    if bitmap.width == 0 || bitmap.height == 0 {
        return Err(BridgeError::invalid(format!(
            "bitmap has zero dimension ({}x{})",
            bitmap.width, bitmap.height
        )));
    }
    if bitmap.bits_per_component != 8 {
        return Err(BridgeError::invalid(format!(
            "{} bits per component is not supported",
            bitmap.bits_per_component
        )));
    }
    let channels = bitmap.channels();
    ChannelOrder::native(channels)
        .ok_or_else(|| BridgeError::invalid(format!("unsupported channel count {channels}")))
}

fn validate_matrix(matrix: &Matrix) -> Result<PixelLayout> {
    if matrix.is_empty() {
        return Err(BridgeError::invalid(format!(
            "matrix has zero elements ({}x{}x{})",
            matrix.rows, matrix.cols, matrix.channels
        )));
    }
    if matrix.depth != Depth::U8 {
        return Err(BridgeError::invalid(format!(
            "matrix element type {:?} cannot be encoded",
            matrix.depth
        )));
    }
    matrix.layout()
}
