//! Rectangle outlines and coordinate labels drawn onto detection output

use super::detector::Rectangle;
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

const GLYPH_SIZE: i32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationStyle {
    pub outline_color: [u8; 4],
    pub outline_width: u32,
    pub label_color: [u8; 4],
    /// Integer upscale of the 8x8 bitmap font
    pub label_scale: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            outline_color: [0, 0, 255, 255],
            outline_width: 2,
            label_color: [255, 0, 0, 255],
            label_scale: 1,
        }
    }
}

/// Outline every rectangle and write its corner coordinates just above it
/// (or just inside, when there is no room above).
pub fn draw_regions(img: &mut RgbaImage, rectangles: &[Rectangle], style: &AnnotationStyle) {
    let outline = Rgba(style.outline_color);
    let label = Rgba(style.label_color);
    let scale = style.label_scale.max(1) as i32;

    for rect in rectangles {
        draw_rect_outline(img, rect, outline, style.outline_width);

        let text_x = rect.min_x as i32 + 2;
        let above = rect.min_y as i32 - 2 - GLYPH_SIZE * scale;
        let text_y = if above >= 0 {
            above
        } else {
            rect.min_y as i32 + style.outline_width as i32 + 2
        };
        draw_bitmap_text(img, text_x, text_y, &rect.label(), label, scale);
    }
}

fn draw_rect_outline(img: &mut RgbaImage, rect: &Rectangle, color: Rgba<u8>, thickness: u32) {
    if img.width() == 0 || img.height() == 0 {
        return;
    }
    let last_x = img.width() - 1;
    let last_y = img.height() - 1;

    let x0 = rect.min_x.min(last_x);
    let y0 = rect.min_y.min(last_y);
    let x1 = rect.max_x.min(last_x);
    let y1 = rect.max_y.min(last_y);

    // grows inward so the outline never covers pixels outside the region
    for t in 0..thickness.max(1) {
        let tx0 = (x0 + t).min(x1);
        let ty0 = (y0 + t).min(y1);
        let tx1 = x1.saturating_sub(t).max(tx0);
        let ty1 = y1.saturating_sub(t).max(ty0);

        for xx in tx0..=tx1 {
            img.put_pixel(xx, ty0, color);
            img.put_pixel(xx, ty1, color);
        }
        for yy in ty0..=ty1 {
            img.put_pixel(tx0, yy, color);
            img.put_pixel(tx1, yy, color);
        }
    }
}

fn draw_bitmap_text(img: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>, scale: i32) {
    let mut cursor_x = x;
    for ch in text.chars() {
        let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
            cursor_x += GLYPH_SIZE * scale;
            continue;
        };
        for (row_idx, row) in glyph.iter().enumerate() {
            let row_bits = *row;
            for col_idx in 0..GLYPH_SIZE {
                if (row_bits >> col_idx) & 1 == 0 {
                    continue;
                }
                let px = cursor_x + col_idx * scale;
                let py = y + row_idx as i32 * scale;
                for sy in 0..scale {
                    for sx in 0..scale {
                        let tx = px + sx;
                        let ty = py + sy;
                        if tx >= 0
                            && ty >= 0
                            && tx < img.width() as i32
                            && ty < img.height() as i32
                        {
                            img.put_pixel(tx as u32, ty as u32, color);
                        }
                    }
                }
            }
        }
        cursor_x += GLYPH_SIZE * scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outline_stays_inside_rectangle() {
        let mut img = RgbaImage::from_pixel(40, 40, Rgba([255, 255, 255, 255]));
        let rect = Rectangle::new(10, 10, 20, 20);
        draw_rect_outline(&mut img, &rect, Rgba([0, 0, 255, 255]), 2);

        assert_eq!(img.get_pixel(10, 10).0, [0, 0, 255, 255]);
        assert_eq!(img.get_pixel(11, 15).0, [0, 0, 255, 255]);
        assert_eq!(img.get_pixel(20, 20).0, [0, 0, 255, 255]);
        assert_eq!(img.get_pixel(15, 15).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(9, 10).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(21, 20).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_label_drawn_above_when_room() {
        let mut img = RgbaImage::from_pixel(200, 60, Rgba([255, 255, 255, 255]));
        let rect = Rectangle::new(5, 30, 60, 50);
        draw_regions(&mut img, &[rect], &AnnotationStyle::default());

        let red_above = (0..200)
            .flat_map(|x| (0..30).map(move |y| (x, y)))
            .any(|(x, y)| img.get_pixel(x, y).0 == [255, 0, 0, 255]);
        assert!(red_above, "label should be rendered above the box");
    }

    #[test]
    fn test_text_clipped_at_image_edge() {
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        draw_bitmap_text(&mut img, -4, -4, "(999, 999 to 999, 999)", Rgba([255, 0, 0, 255]), 2);
        draw_bitmap_text(&mut img, 8, 8, "W", Rgba([255, 0, 0, 255]), 1);
    }
}
