use image::{ImageBuffer, Rgba};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, Canvas};
use imageproc::rect::Rect;

use crate::detection::domain::segmentation::Mask;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::color::Rgb;
use crate::shared::frame::Frame;

use super::bitmap_font::{glyph, text_width, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};

/// Padding around label text inside its plate.
pub const LABEL_PADDING: i64 = 2;

/// Height of a label plate including padding.
pub const LABEL_HEIGHT: i64 = GLYPH_HEIGHT + 2 * LABEL_PADDING;

#[derive(Clone, Copy)]
enum Stroke {
    Filled,
    Hollow,
}

fn stroke_rect<C: Canvas>(canvas: &mut C, rect: Rect, color: C::Pixel, stroke: Stroke) {
    match stroke {
        Stroke::Filled => draw_filled_rect_mut(canvas, rect, color),
        Stroke::Hollow => draw_hollow_rect_mut(canvas, rect, color),
    }
}

/// Draws `rect` straight into the frame buffer through an `image` view.
/// imageproc clips anything outside the frame.
fn paint_rect(frame: &mut Frame, rect: Rect, color: Rgb, stroke: Stroke) {
    let (width, height, channels) = (frame.width(), frame.height(), frame.channels());
    let [a, b, c] = frame.ordered(color.0);
    let data = frame.data_mut();
    let drawn = match channels {
        3 => ImageBuffer::<image::Rgb<u8>, _>::from_raw(width, height, data)
            .map(|mut view| stroke_rect(&mut view, rect, image::Rgb([a, b, c]), stroke)),
        4 => ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, data)
            .map(|mut view| stroke_rect(&mut view, rect, Rgba([a, b, c, u8::MAX]), stroke)),
        _ => None,
    };
    if drawn.is_none() {
        log::debug!("Skipped rectangle on {width}x{height} frame with {channels} channels");
    }
}

pub fn fill_rect(frame: &mut Frame, x: i64, y: i64, width: i64, height: i64, color: Rgb) {
    if width <= 0 || height <= 0 {
        return;
    }
    let rect = Rect::at(x as i32, y as i32).of_size(width as u32, height as u32);
    paint_rect(frame, rect, color, Stroke::Filled);
}

/// Outlines `bbox` with a border `thickness` pixels wide, drawn inwards as
/// nested one-pixel outlines.
pub fn draw_rect(frame: &mut Frame, bbox: &BoundingBox, color: Rgb, thickness: u32) {
    for inset in 0..thickness.max(1) as i32 {
        let width = bbox.width - 2 * inset;
        let height = bbox.height - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(bbox.x + inset, bbox.y + inset).of_size(width as u32, height as u32);
        paint_rect(frame, rect, color, Stroke::Hollow);
    }
}

pub fn draw_text(frame: &mut Frame, text: &str, x: i64, y: i64, color: Rgb) {
    for (i, ch) in text.chars().enumerate() {
        let origin_x = x + i as i64 * GLYPH_ADVANCE;
        for (row, bits) in glyph(ch).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                    frame.put_rgb(origin_x + col, y + row as i64, color.0);
                }
            }
        }
    }
}

/// Draws `text` on a filled plate whose top-left corner is `(x, y)`.
/// Returns the plate's bounds.
pub fn draw_label(
    frame: &mut Frame,
    text: &str,
    x: i64,
    y: i64,
    plate: Rgb,
    ink: Rgb,
) -> BoundingBox {
    let width = text_width(text) + 2 * LABEL_PADDING;
    fill_rect(frame, x, y, width, LABEL_HEIGHT, plate);
    draw_text(frame, text, x + LABEL_PADDING, y + LABEL_PADDING, ink);
    BoundingBox::new(x as i32, y as i32, width as i32, LABEL_HEIGHT as i32)
}

/// Top edge for a label attached to `bbox`: above the box when there is
/// room, otherwise just inside its top edge.
pub fn label_top(bbox: &BoundingBox) -> i64 {
    let above = bbox.y as i64 - LABEL_HEIGHT;
    if above >= 0 {
        above
    } else {
        bbox.y.max(0) as i64
    }
}

/// Blends `color` over every masked pixel. Mask cells outside the frame
/// are ignored.
pub fn blend_mask(frame: &mut Frame, mask: &Mask, color: Rgb, opacity: f32) {
    for ((row, col), &on) in mask.indexed_iter() {
        if on {
            frame.blend_rgb(col as u32, row as u32, color.0, opacity);
        }
    }
}

/// Paints the mask's boundary: masked pixels with at least one unmasked
/// 4-neighbour, or lying on the mask edge.
pub fn draw_mask_contour(frame: &mut Frame, mask: &Mask, color: Rgb) {
    let (rows, cols) = mask.dim();
    let inside = |r: isize, c: isize| -> bool {
        r >= 0
            && c >= 0
            && (r as usize) < rows
            && (c as usize) < cols
            && mask[[r as usize, c as usize]]
    };
    for ((row, col), &on) in mask.indexed_iter() {
        if !on {
            continue;
        }
        let (r, c) = (row as isize, col as isize);
        let interior = inside(r - 1, c) && inside(r + 1, c) && inside(r, c - 1) && inside(r, c + 1);
        if !interior {
            frame.put_rgb(col as i64, row as i64, color.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    use crate::shared::frame::PixelFormat;

    const RED: Rgb = Rgb([255, 0, 0]);

    fn blank(w: u32, h: u32) -> Frame {
        Frame::solid(w, h, [0, 0, 0], 0)
    }

    #[test]
    fn test_draw_rect_outline_leaves_interior() {
        let mut frame = blank(20, 20);
        draw_rect(&mut frame, &BoundingBox::new(2, 2, 10, 10), RED, 2);

        assert_eq!(frame.rgb_at(2, 2), RED.0);
        assert_eq!(frame.rgb_at(3, 6), RED.0);
        assert_eq!(frame.rgb_at(11, 11), RED.0);
        assert_eq!(frame.rgb_at(6, 6), [0, 0, 0]);
        assert_eq!(frame.rgb_at(12, 12), [0, 0, 0]);
    }

    #[test]
    fn test_draw_rect_partially_offscreen() {
        let mut frame = blank(10, 10);
        draw_rect(&mut frame, &BoundingBox::new(-5, -5, 10, 10), RED, 1);
        assert_eq!(frame.rgb_at(4, 0), RED.0);
        assert_eq!(frame.rgb_at(0, 4), RED.0);
    }

    #[test]
    fn test_draw_rect_thickness_capped_by_small_box() {
        let mut frame = blank(10, 10);
        draw_rect(&mut frame, &BoundingBox::new(1, 1, 3, 3), RED, 5);
        assert_eq!(frame.rgb_at(2, 2), RED.0);
        assert_eq!(frame.rgb_at(4, 4), [0, 0, 0]);
    }

    #[test]
    fn test_fill_rect_in_bgr_frame_keeps_true_colour() {
        let mut frame = blank(6, 6).to_format(PixelFormat::Bgr);
        fill_rect(&mut frame, 1, 1, 2, 2, Rgb([10, 20, 30]));
        assert_eq!(frame.rgb_at(2, 2), [10, 20, 30]);
        assert_eq!(frame.rgb_at(3, 3), [0, 0, 0]);
    }

    #[test]
    fn test_fill_rect_on_four_channel_frame() {
        let mut frame = Frame::new(vec![0u8; 4 * 4 * 4], 4, 4, 4, 0);
        fill_rect(&mut frame, -2, -2, 4, 4, RED);
        assert_eq!(frame.rgb_at(1, 1), RED.0);
        assert_eq!(frame.rgb_at(2, 2), [0, 0, 0]);
    }

    #[test]
    fn test_empty_fill_is_noop() {
        let mut frame = blank(4, 4);
        fill_rect(&mut frame, 0, 0, 0, 3, RED);
        assert!(frame.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_draw_text_sets_glyph_pixels() {
        let mut frame = blank(20, 10);
        draw_text(&mut frame, "I", 0, 0, RED);
        // Top row of 'I' is 0b01110.
        assert_eq!(frame.rgb_at(0, 0), [0, 0, 0]);
        assert_eq!(frame.rgb_at(1, 0), RED.0);
        assert_eq!(frame.rgb_at(2, 3), RED.0);
    }

    #[test]
    fn test_draw_label_returns_plate_bounds() {
        let mut frame = blank(40, 20);
        let plate = draw_label(&mut frame, "AB", 1, 1, Rgb::WHITE, Rgb::BLACK);
        assert_eq!(plate, BoundingBox::new(1, 1, 15, 11));
        assert_eq!(frame.rgb_at(1, 1), Rgb::WHITE.0);
    }

    #[test]
    fn test_label_top_above_or_inside() {
        assert_eq!(label_top(&BoundingBox::new(0, 30, 5, 5)), 30 - LABEL_HEIGHT);
        assert_eq!(label_top(&BoundingBox::new(0, 3, 5, 5)), 3);
    }

    #[test]
    fn test_blend_mask_only_touches_masked_pixels() {
        let mut frame = blank(4, 4);
        let mut mask = Array2::from_elem((4, 4), false);
        mask[[1, 2]] = true;
        blend_mask(&mut frame, &mask, Rgb([200, 100, 0]), 0.5);

        assert_eq!(frame.rgb_at(2, 1), [100, 50, 0]);
        assert_eq!(frame.rgb_at(1, 2), [0, 0, 0]);
    }

    #[test]
    fn test_contour_skips_interior() {
        let mut frame = blank(5, 5);
        let mut mask = Array2::from_elem((5, 5), false);
        for r in 1..4 {
            for c in 1..4 {
                mask[[r, c]] = true;
            }
        }
        draw_mask_contour(&mut frame, &mask, RED);

        assert_eq!(frame.rgb_at(1, 1), RED.0);
        assert_eq!(frame.rgb_at(3, 2), RED.0);
        assert_eq!(frame.rgb_at(2, 2), [0, 0, 0]);
        assert_eq!(frame.rgb_at(0, 0), [0, 0, 0]);
    }
}
