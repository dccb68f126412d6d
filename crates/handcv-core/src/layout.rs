//! Pixel layout descriptors
//!
//! Channel order, row origin and stride are the three things a platform bitmap and a
//! library matrix can disagree on. They are described here declaratively and reconciled
//! by a pure function, so every conversion in the bridge goes through [`transcode`].

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};

/// Role of a single byte inside a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Luma,
    Red,
    Green,
    Blue,
    Alpha,
}

/// Byte order of the channels of one pixel, as laid out in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelOrder {
    Gray,
    Rgb,
    Bgr,
    Rgba,
    /// 32-bit little-endian "alpha first" frames, the usual camera output.
    Bgra,
    /// 32-bit big-endian "alpha first".
    Argb,
}

impl ChannelOrder {
    fn roles(self) -> &'static [Channel] {
        use Channel::*;
        match self {
            ChannelOrder::Gray => &[Luma],
            ChannelOrder::Rgb => &[Red, Green, Blue],
            ChannelOrder::Bgr => &[Blue, Green, Red],
            ChannelOrder::Rgba => &[Red, Green, Blue, Alpha],
            ChannelOrder::Bgra => &[Blue, Green, Red, Alpha],
            ChannelOrder::Argb => &[Alpha, Red, Green, Blue],
        }
    }

    /// Number of bytes per pixel.
    pub fn channels(self) -> usize {
        self.roles().len()
    }

    /// Order the vision library expects for a given channel count.
    pub fn native(channels: usize) -> Option<Self> {
        match channels {
            1 => Some(ChannelOrder::Gray),
            3 => Some(ChannelOrder::Bgr),
            4 => Some(ChannelOrder::Bgra),
            _ => None,
        }
    }

    /// Byte offsets of red, green and blue inside a pixel. Gray maps all three to 0.
    pub fn rgb_offsets(self) -> [usize; 3] {
        let roles = self.roles();
        let find = |want: Channel| {
            roles
                .iter()
                .position(|&c| c == want || c == Channel::Luma)
                .unwrap_or(0)
        };
        [find(Channel::Red), find(Channel::Green), find(Channel::Blue)]
    }

    /// Byte offset of the alpha channel, if any.
    pub fn alpha_offset(self) -> Option<usize> {
        self.roles().iter().position(|&c| c == Channel::Alpha)
    }
}

/// Which row comes first in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Origin {
    #[default]
    TopLeft,
    BottomLeft,
}

/// Element type of a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Depth {
    U8,
    U16,
    F32,
}

impl Depth {
    pub fn size(self) -> usize {
        match self {
            Depth::U8 => 1,
            Depth::U16 => 2,
            Depth::F32 => 4,
        }
    }
}

/// Declarative description of how 8-bit pixels sit in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelLayout {
    pub order: ChannelOrder,
    pub origin: Origin,
    /// Bytes from the start of one row to the start of the next.
    pub stride: usize,
}

impl PixelLayout {
    /// Tightly packed, top-left origin.
    pub fn packed(order: ChannelOrder, width: usize) -> Self {
        Self {
            order,
            origin: Origin::TopLeft,
            stride: width * order.channels(),
        }
    }

    /// Rows padded up to a multiple of `alignment` bytes. 0 and 1 mean packed.
    pub fn aligned(order: ChannelOrder, width: usize, alignment: usize) -> Self {
        let row = width * order.channels();
        let stride = if alignment > 1 {
            row.div_ceil(alignment) * alignment
        } else {
            row
        };
        Self {
            order,
            origin: Origin::TopLeft,
            stride,
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn channels(&self) -> usize {
        self.order.channels()
    }

    /// Meaningful bytes in one row.
    pub fn row_bytes(&self, width: usize) -> usize {
        width * self.channels()
    }

    /// Minimum buffer length able to hold `height` rows.
    pub fn required_len(&self, width: usize, height: usize) -> usize {
        if height == 0 {
            return 0;
        }
        self.stride * (height - 1) + self.row_bytes(width)
    }

    fn check(&self, width: usize, height: usize, len: usize, side: &str) -> Result<()> {
        let row = self.row_bytes(width);
        if self.stride < row {
            return Err(BridgeError::conversion(format!(
                "{side} stride {} is narrower than a {row}-byte row",
                self.stride
            )));
        }
        let needed = self.required_len(width, height);
        if len < needed {
            return Err(BridgeError::conversion(format!(
                "{side} buffer holds {len} bytes, layout needs {needed}"
            )));
        }
        Ok(())
    }
}

/// What has to happen to move pixels from one layout to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPlan {
    /// `swizzle[i]` is the source byte feeding destination byte `i` of each pixel.
    pub swizzle: Vec<usize>,
    pub flip_rows: bool,
}

impl LayoutPlan {
    pub fn is_channel_identity(&self) -> bool {
        self.swizzle.iter().enumerate().all(|(i, &s)| i == s)
    }
}

/// Work out the channel permutation and row flip between two layouts.
///
/// Both orders must carry the same set of channels; dropping or inventing a channel
/// (alpha in particular) is refused rather than silently done.
pub fn reconcile(src: &PixelLayout, dst: &PixelLayout) -> Result<LayoutPlan> {
    let from = src.order.roles();
    let to = dst.order.roles();
    if from.len() != to.len() {
        return Err(BridgeError::conversion(format!(
            "cannot map {:?} ({} channels) onto {:?} ({} channels)",
            src.order,
            from.len(),
            dst.order,
            to.len()
        )));
    }

    let swizzle = to
        .iter()
        .map(|role| {
            from.iter().position(|r| r == role).ok_or_else(|| {
                BridgeError::conversion(format!(
                    "{:?} has no {:?} channel required by {:?}",
                    src.order, role, dst.order
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(LayoutPlan {
        swizzle,
        flip_rows: src.origin != dst.origin,
    })
}

/// Copy `height` rows of `width` pixels from `src` into a freshly allocated buffer
/// laid out as `dst_layout`. Padding bytes in the output are zero.
pub fn transcode(
    src: &[u8],
    width: usize,
    height: usize,
    src_layout: &PixelLayout,
    dst_layout: &PixelLayout,
) -> Result<Vec<u8>> {
    let plan = reconcile(src_layout, dst_layout)?;
    src_layout.check(width, height, src.len(), "source")?;
    dst_layout.check(width, height, dst_layout.stride * height, "destination")?;

    let channels = src_layout.channels();
    let row_bytes = width * channels;
    let mut out = vec![0u8; dst_layout.stride * height];
    let identity = plan.is_channel_identity();

    for y in 0..height {
        let sy = if plan.flip_rows { height - 1 - y } else { y };
        let src_row = &src[sy * src_layout.stride..sy * src_layout.stride + row_bytes];
        let dst_row = &mut out[y * dst_layout.stride..y * dst_layout.stride + row_bytes];

        if identity {
            dst_row.copy_from_slice(src_row);
            continue;
        }
        for (d, s) in dst_row
            .chunks_exact_mut(channels)
            .zip(src_row.chunks_exact(channels))
        {
            for (slot, &from) in d.iter_mut().zip(&plan.swizzle) {
                *slot = s[from];
            }
        }
    }

    Ok(out)
}
