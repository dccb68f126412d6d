//! Dense matrix in the vision library's native layout

use crate::error::{BridgeError, Result};
use crate::layout::{ChannelOrder, Depth, PixelLayout};

/// Packed, top-left origin pixel grid. Multi-channel 8-bit data is in library order
/// (BGR / BGRA); float matrices hold native-endian `f32` bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub channels: usize,
    pub depth: Depth,
    pub data: Vec<u8>,
}

impl Matrix {
    /// 8-bit matrix from packed bytes in library order.
    pub fn from_bytes(rows: usize, cols: usize, channels: usize, data: Vec<u8>) -> Result<Self> {
        let expected = rows * cols * channels;
        if data.len() != expected {
            return Err(BridgeError::invalid(format!(
                "{rows}x{cols}x{channels} matrix needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            rows,
            cols,
            channels,
            depth: Depth::U8,
            data,
        })
    }

    /// 8-bit matrix with every element set to `value`.
    pub fn filled(rows: usize, cols: usize, channels: usize, value: u8) -> Self {
        Self {
            rows,
            cols,
            channels,
            depth: Depth::U8,
            data: vec![value; rows * cols * channels],
        }
    }

    /// Single-channel float matrix, e.g. a score map.
    pub fn from_f32(rows: usize, cols: usize, values: &[f32]) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(BridgeError::invalid(format!(
                "{rows}x{cols} float matrix needs {} values, got {}",
                rows * cols,
                values.len()
            )));
        }
        Ok(Self {
            rows,
            cols,
            channels: 1,
            depth: Depth::F32,
            data: values.iter().flat_map(|v| v.to_ne_bytes()).collect(),
        })
    }

    /// Number of pixels.
    pub fn total(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0 || self.channels == 0
    }

    pub fn order(&self) -> Option<ChannelOrder> {
        ChannelOrder::native(self.channels)
    }

    /// Layout descriptor of an 8-bit matrix.
    pub fn layout(&self) -> Result<PixelLayout> {
        if self.depth != Depth::U8 {
            return Err(BridgeError::invalid(format!(
                "{:?} matrices have no byte pixel layout",
                self.depth
            )));
        }
        let order = self.order().ok_or_else(|| {
            BridgeError::invalid(format!("unsupported channel count {}", self.channels))
        })?;
        Ok(PixelLayout::packed(order, self.cols))
    }

    /// Element bytes of the pixel at column `x`, row `y`.
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[u8]> {
        if x >= self.cols || y >= self.rows {
            return None;
        }
        let size = self.channels * self.depth.size();
        let at = (y * self.cols + x) * size;
        self.data.get(at..at + size)
    }

    /// Values of a single-channel float matrix.
    pub fn as_f32(&self) -> Result<Vec<f32>> {
        if self.depth != Depth::F32 || self.channels != 1 {
            return Err(BridgeError::invalid("not a single-channel float matrix"));
        }
        Ok(self
            .data
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    /// Stretch a float matrix to 0..=255, the way a heat map is rendered.
    pub fn normalized_u8(&self) -> Result<Matrix> {
        let values = self.as_f32()?;
        let (min, max) = values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let span = max - min;
        let data = values
            .iter()
            .map(|&v| {
                if span > f32::EPSILON {
                    ((v - min) / span * 255.0).round() as u8
                } else {
                    0
                }
            })
            .collect();
        Matrix::from_bytes(self.rows, self.cols, 1, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_checks_length() {
        assert!(Matrix::from_bytes(2, 2, 3, vec![0; 11]).is_err());
        assert!(Matrix::from_bytes(2, 2, 3, vec![0; 12]).is_ok());
    }

    #[test]
    fn test_pixel_lookup() {
        let m = Matrix::from_bytes(1, 2, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(m.pixel(1, 0), Some(&[4, 5, 6][..]));
        assert_eq!(m.pixel(0, 1), None);
    }

    #[test]
    fn test_float_matrix_normalizes() {
        let m = Matrix::from_f32(1, 3, &[-1.0, 0.0, 1.0]).unwrap();
        assert!(m.layout().is_err());
        let n = m.normalized_u8().unwrap();
        assert_eq!(n.data, vec![0, 128, 255]);
    }
}
