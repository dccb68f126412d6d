//! Legacy image handle
//!
//! The older library API passes images around with an explicit channel sequence, a row
//! step aligned to four bytes and an origin that may be bottom-left. It is kept so code
//! that still speaks it can join the matrix path through [`LegacyImage::into_matrix`].

use crate::error::{BridgeError, Result};
use crate::layout::{ChannelOrder, Depth, Origin, PixelLayout, transcode};
use crate::matrix::Matrix;

/// Row alignment of legacy image rows, in bytes.
pub const LEGACY_ROW_ALIGN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyImage {
    pub width: usize,
    pub height: usize,
    pub depth: Depth,
    pub channels: usize,
    pub origin: Origin,
    pub channel_order: ChannelOrder,
    /// Bytes per row including alignment padding.
    pub width_step: usize,
    pub data: Vec<u8>,
}

impl LegacyImage {
    pub fn layout(&self) -> PixelLayout {
        PixelLayout {
            order: self.channel_order,
            origin: self.origin,
            stride: self.width_step,
        }
    }

    /// Build from a matrix, storing rows in `origin` order.
    pub fn from_matrix(matrix: &Matrix, origin: Origin) -> Result<Self> {
        let src = matrix.layout()?;
        let dst =
            PixelLayout::aligned(src.order, matrix.cols, LEGACY_ROW_ALIGN).with_origin(origin);
        let data = transcode(&matrix.data, matrix.cols, matrix.rows, &src, &dst)?;
        Ok(Self {
            width: matrix.cols,
            height: matrix.rows,
            depth: Depth::U8,
            channels: matrix.channels,
            origin,
            channel_order: src.order,
            width_step: dst.stride,
            data,
        })
    }

    /// Convert into the packed, top-left, library-order matrix.
    pub fn into_matrix(self) -> Result<Matrix> {
        if self.depth != Depth::U8 {
            return Err(BridgeError::invalid(format!(
                "legacy images of depth {:?} are not supported",
                self.depth
            )));
        }
        if self.channels != self.channel_order.channels() {
            return Err(BridgeError::conversion(format!(
                "legacy image declares {} channels but sequence {:?}",
                self.channels, self.channel_order
            )));
        }
        let native = ChannelOrder::native(self.channels).ok_or_else(|| {
            BridgeError::invalid(format!("unsupported channel count {}", self.channels))
        })?;
        let dst = PixelLayout::packed(native, self.width);
        let data = transcode(&self.data, self.width, self.height, &self.layout(), &dst)?;
        Matrix::from_bytes(self.height, self.width, self.channels, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_four_byte_aligned() {
        let m = Matrix::from_bytes(2, 3, 3, (0..18).collect()).unwrap();
        let legacy = LegacyImage::from_matrix(&m, Origin::TopLeft).unwrap();
        assert_eq!(legacy.width_step, 12);
        assert_eq!(legacy.data.len(), 24);
        assert_eq!(legacy.into_matrix().unwrap(), m);
    }

    #[test]
    fn test_bottom_left_origin_round_trips() {
        let m = Matrix::from_bytes(3, 1, 1, vec![10, 20, 30]).unwrap();
        let legacy = LegacyImage::from_matrix(&m, Origin::BottomLeft).unwrap();
        assert_eq!(legacy.data, vec![30, 0, 0, 0, 20, 0, 0, 0, 10, 0, 0, 0]);
        assert_eq!(legacy.into_matrix().unwrap(), m);
    }

    #[test]
    fn test_rgb_sequence_is_swapped_on_the_way_in() {
        let legacy = LegacyImage {
            width: 1,
            height: 1,
            depth: Depth::U8,
            channels: 3,
            origin: Origin::TopLeft,
            channel_order: ChannelOrder::Rgb,
            width_step: 4,
            data: vec![1, 2, 3, 0],
        };
        assert_eq!(legacy.into_matrix().unwrap().data, vec![3, 2, 1]);
    }
}
