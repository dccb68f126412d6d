//! Drawing detection results onto copies of a matrix

use crate::Result;
use crate::config::Color;
use crate::error::VisionError;
use crate::region::Region;
use handcv_core::Matrix;
use image::{ImageBuffer, Luma, Pixel, Rgb, Rgba};
use imageproc::drawing::{
    Canvas, draw_hollow_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut,
};

/// A primitive to draw
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Rectangle outline, grown inwards to `thickness` pixels.
    Rect { region: Region, thickness: u32 },
    Circle { center: (i32, i32), radius: i32 },
    /// Closed polyline.
    Polygon { points: Vec<(i32, i32)> },
}

/// Shapes sharing a color.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub color: Color,
    pub shapes: Vec<Shape>,
}

impl Layer {
    pub fn new(color: Color, shapes: Vec<Shape>) -> Self {
        Self { color, shapes }
    }
}

/// Draw every layer onto a copy of `image`. The matrix bytes are painted as they are;
/// colors are swizzled into the matrix's channel order first.
pub fn draw(image: &Matrix, layers: &[Layer]) -> Result<Matrix> {
    let order = image.layout()?.order;
    let (w, h) = (image.cols as u32, image.rows as u32);
    let data = image.data.clone();
    let mismatch = || VisionError::Conversion("overlay buffer size mismatch".into());

    let painted = match image.channels {
        1 => {
            let mut canvas: ImageBuffer<Luma<u8>, Vec<u8>> =
                ImageBuffer::from_raw(w, h, data).ok_or_else(mismatch)?;
            paint(&mut canvas, layers, |c| Luma([c.to_pixel(order)[0]]));
            canvas.into_raw()
        }
        3 => {
            let mut canvas: ImageBuffer<Rgb<u8>, Vec<u8>> =
                ImageBuffer::from_raw(w, h, data).ok_or_else(mismatch)?;
            paint(&mut canvas, layers, |c| *Rgb::from_slice(&c.to_pixel(order)));
            canvas.into_raw()
        }
        4 => {
            let mut canvas: ImageBuffer<Rgba<u8>, Vec<u8>> =
                ImageBuffer::from_raw(w, h, data).ok_or_else(mismatch)?;
            paint(&mut canvas, layers, |c| *Rgba::from_slice(&c.to_pixel(order)));
            canvas.into_raw()
        }
        n => {
            return Err(VisionError::InvalidInput(format!(
                "cannot draw on {n}-channel matrix"
            )));
        }
    };

    Ok(Matrix::from_bytes(image.rows, image.cols, image.channels, painted)?)
}

fn paint<C, F>(canvas: &mut C, layers: &[Layer], pixel: F)
where
    C: Canvas,
    F: Fn(Color) -> C::Pixel,
{
    for layer in layers {
        let color = pixel(layer.color);
        for shape in &layer.shapes {
            draw_shape(canvas, shape, color);
        }
    }
}

fn draw_shape<C: Canvas>(canvas: &mut C, shape: &Shape, color: C::Pixel) {
    match shape {
        Shape::Rect { region, thickness } => {
            for inset in 0..(*thickness).max(1) {
                let (w, h) = (
                    region.width.saturating_sub(2 * inset),
                    region.height.saturating_sub(2 * inset),
                );
                if w == 0 || h == 0 {
                    break;
                }
                let ring = Region::new(region.x + inset as i32, region.y + inset as i32, w, h);
                draw_hollow_rect_mut(canvas, ring.to_rect(), color);
            }
        }
        Shape::Circle { center, radius } => {
            draw_hollow_circle_mut(canvas, *center, *radius, color)
        }
        Shape::Polygon { points } => {
            for (i, &(x0, y0)) in points.iter().enumerate() {
                let (x1, y1) = points[(i + 1) % points.len()];
                draw_line_segment_mut(
                    canvas,
                    (x0 as f32, y0 as f32),
                    (x1 as f32, y1 as f32),
                    color,
                );
            }
        }
    }
}
