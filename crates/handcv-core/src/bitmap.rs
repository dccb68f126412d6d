//! Platform bitmap representation

use crate::layout::{ChannelOrder, Origin, PixelLayout};
use serde::{Deserialize, Serialize};

/// A platform-native pixel buffer, rows possibly padded for alignment.
///
/// Fields are public so callers can wrap whatever the platform hands them; the bridge
/// validates everything before touching the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: usize,
    pub height: usize,
    pub bits_per_component: u8,
    pub layout: PixelLayout,
    pub data: Vec<u8>,
}

/// Clockwise quarter turns applied to a bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
    Half,
}

impl Bitmap {
    /// Wrap tightly packed 8-bit rows.
    pub fn packed(width: usize, height: usize, order: ChannelOrder, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            bits_per_component: 8,
            layout: PixelLayout::packed(order, width),
            data,
        }
    }

    /// Wrap 8-bit rows that are `stride` bytes apart.
    pub fn with_stride(
        width: usize,
        height: usize,
        order: ChannelOrder,
        stride: usize,
        data: Vec<u8>,
    ) -> Self {
        Self {
            width,
            height,
            bits_per_component: 8,
            layout: PixelLayout {
                order,
                origin: Origin::TopLeft,
                stride,
            },
            data,
        }
    }

    /// A bitmap filled with one pixel value, rows padded to `alignment`.
    ///
    /// # Panics
    ///
    /// If `pixel` holds fewer bytes than `order` has channels.
    pub fn filled(
        width: usize,
        height: usize,
        order: ChannelOrder,
        alignment: usize,
        pixel: &[u8],
    ) -> Self {
        let layout = PixelLayout::aligned(order, width, alignment);
        let mut data = vec![0u8; layout.stride * height];
        for row in data.chunks_exact_mut(layout.stride.max(1)) {
            for px in row[..width * order.channels()].chunks_exact_mut(order.channels()) {
                px.copy_from_slice(&pixel[..order.channels()]);
            }
        }
        Self {
            width,
            height,
            bits_per_component: 8,
            layout,
            data,
        }
    }

    pub fn order(&self) -> ChannelOrder {
        self.layout.order
    }

    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    pub fn stride(&self) -> usize {
        self.layout.stride
    }

    /// Meaningful bytes of row `y`, counted from the top of the image.
    pub fn row(&self, y: usize) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let y = match self.layout.origin {
            Origin::TopLeft => y,
            Origin::BottomLeft => self.height - 1 - y,
        };
        let start = y * self.layout.stride;
        self.data.get(start..start + self.layout.row_bytes(self.width))
    }

    /// Bytes of the pixel at `(x, y)` in the bitmap's own channel order.
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[u8]> {
        if x >= self.width {
            return None;
        }
        let c = self.channels();
        self.row(y).map(|row| &row[x * c..(x + 1) * c])
    }

    /// Red, green, blue of a pixel regardless of channel order.
    pub fn rgb_at(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        let [r, g, b] = self.order().rgb_offsets();
        self.pixel(x, y).map(|px| [px[r], px[g], px[b]])
    }

    /// Rows from top to bottom, padding removed.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.height).filter_map(move |y| self.row(y))
    }

    /// Same pixels mirrored top to bottom.
    pub fn flipped_vertical(&self) -> Bitmap {
        let mut out = self.clone();
        let row_bytes = self.layout.row_bytes(self.width);
        let stride = self.layout.stride;
        for y in 0..self.height {
            let (from, to) = (y * stride, (self.height - 1 - y) * stride);
            if let (Some(src), Some(dst)) = (
                self.data.get(from..from + row_bytes),
                out.data.get_mut(to..to + row_bytes),
            ) {
                dst.copy_from_slice(src);
            }
        }
        out
    }

    /// Same pixels turned by a quarter or half turn. Keeps channel order and the
    /// bitmap's row alignment.
    pub fn rotated(&self, rotation: Rotation) -> Bitmap {
        let c = self.channels();
        let (w, h) = match rotation {
            Rotation::Half => (self.width, self.height),
            Rotation::Clockwise | Rotation::CounterClockwise => (self.height, self.width),
        };
        let alignment = row_alignment(self.layout.stride, self.layout.row_bytes(self.width));
        let layout = PixelLayout::aligned(self.order(), w, alignment);
        let mut data = vec![0u8; layout.stride * h];

        for (sy, row) in self.rows().enumerate() {
            for (sx, px) in row.chunks_exact(c).enumerate() {
                let (dx, dy) = match rotation {
                    Rotation::Clockwise => (self.height - 1 - sy, sx),
                    Rotation::CounterClockwise => (sy, self.width - 1 - sx),
                    Rotation::Half => (self.width - 1 - sx, self.height - 1 - sy),
                };
                let at = dy * layout.stride + dx * c;
                data[at..at + c].copy_from_slice(px);
            }
        }

        Bitmap {
            width: w,
            height: h,
            bits_per_component: self.bits_per_component,
            layout,
            data,
        }
    }
}

/// Largest power of two (up to 64) that the observed stride is a multiple of,
/// or 0 when the rows are packed.
fn row_alignment(stride: usize, row_bytes: usize) -> usize {
    if stride == row_bytes {
        return 0;
    }
    [64, 32, 16, 8, 4]
        .into_iter()
        .find(|a| stride % a == 0)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(width: usize, height: usize) -> Bitmap {
        Bitmap::packed(
            width,
            height,
            ChannelOrder::Gray,
            (0..(width * height) as u8).collect(),
        )
    }

    #[test]
    fn test_pixel_access_skips_padding() {
        let bmp = Bitmap::with_stride(2, 2, ChannelOrder::Rgb, 8, vec![
            1, 2, 3, 4, 5, 6, 0, 0, //
            7, 8, 9, 10, 11, 12, 0, 0,
        ]);
        assert_eq!(bmp.pixel(1, 1), Some(&[10, 11, 12][..]));
        assert_eq!(bmp.rgb_at(0, 1), Some([7, 8, 9]));
        assert_eq!(bmp.pixel(2, 0), None);
    }

    #[test]
    fn test_rotate_clockwise() {
        // 0 1 2      3 0
        // 3 4 5  ->  4 1
        //            5 2
        let rotated = numbered(3, 2).rotated(Rotation::Clockwise);
        assert_eq!((rotated.width, rotated.height), (2, 3));
        let rows: Vec<Vec<u8>> = rotated.rows().map(|r| r.to_vec()).collect();
        assert_eq!(rows, vec![vec![3, 0], vec![4, 1], vec![5, 2]]);
    }

    #[test]
    fn test_rotate_counter_clockwise_undoes_clockwise() {
        let bmp = numbered(4, 3);
        let back = bmp
            .rotated(Rotation::Clockwise)
            .rotated(Rotation::CounterClockwise);
        assert_eq!(back, bmp);
    }

    #[test]
    fn test_half_turn_and_flip() {
        let bmp = numbered(2, 2);
        let half: Vec<u8> = bmp.rotated(Rotation::Half).rows().flatten().copied().collect();
        assert_eq!(half, vec![3, 2, 1, 0]);
        let flipped: Vec<u8> = bmp.flipped_vertical().rows().flatten().copied().collect();
        assert_eq!(flipped, vec![2, 3, 0, 1]);
    }

    #[test]
    fn test_rotation_keeps_alignment() {
        let bmp = Bitmap::filled(5, 3, ChannelOrder::Rgba, 16, &[1, 2, 3, 4]);
        let rotated = bmp.rotated(Rotation::Clockwise);
        assert_eq!(rotated.stride() % 16, 0);
        assert_eq!(rotated.pixel(2, 4), Some(&[1, 2, 3, 4][..]));
    }

    #[test]
    #[should_panic]
    fn test_filled_with_short_pixel_panics() {
        Bitmap::filled(2, 2, ChannelOrder::Rgba, 0, &[1, 2, 3]);
    }
}
