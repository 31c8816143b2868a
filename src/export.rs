//! Flattened image export with a count box in the top-right corner.

use std::io::Cursor;
use std::path::Path;

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::config::{
    COUNT_BOX_BORDER, COUNT_BOX_MARGIN, COUNT_BOX_PADDING, COUNT_TEXT_SCALE, DOT_SIZE,
};
use crate::error::ExportError;
use crate::session::{AnnotationSession, LoadedImage, Marker};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Pixel rectangle, `x`/`y` may fall outside the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BoxRect {
    fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountBox {
    pub text: String,
    pub rect: BoxRect,
    pub text_origin: (i32, i32),
}

impl CountBox {
    /// Box sized to the text plus padding, `margin` from the top-right corner.
    pub fn new(image_width: u32, count: usize) -> Self {
        let text = format!("Count: {count}");
        let text_w = text.chars().count() as i32 * 8 * COUNT_TEXT_SCALE;
        let text_h = 8 * COUNT_TEXT_SCALE;
        let w = text_w + COUNT_BOX_PADDING * 2;
        let h = text_h + COUNT_BOX_PADDING * 2;
        let rect = BoxRect {
            x: image_width as i32 - w - COUNT_BOX_MARGIN,
            y: COUNT_BOX_MARGIN,
            w,
            h,
        };
        Self {
            text,
            rect,
            text_origin: (rect.x + COUNT_BOX_PADDING, rect.y + COUNT_BOX_PADDING),
        }
    }
}

fn put(img: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && x < img.width() as i32 && y < img.height() as i32 {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Fill pixels whose centers lie within `r` of `(cx, cy)`.
fn fill_circle(img: &mut RgbaImage, cx: f32, cy: f32, r: f32, color: Rgba<u8>) {
    let x0 = (cx - r).floor() as i32;
    let x1 = (cx + r).ceil() as i32;
    let y0 = (cy - r).floor() as i32;
    let y1 = (cy + r).ceil() as i32;
    for py in y0..=y1 {
        for px in x0..=x1 {
            let dx = px as f32 + 0.5 - cx;
            let dy = py as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= r * r {
                put(img, px, py, color);
            }
        }
    }
}

fn fill_rect(img: &mut RgbaImage, rect: BoxRect, color: Rgba<u8>) {
    for py in rect.y..rect.y + rect.h {
        for px in rect.x..rect.x + rect.w {
            put(img, px, py, color);
        }
    }
}

/// Border of `width` pixels centered on the rect's edge.
fn stroke_rect(img: &mut RgbaImage, rect: BoxRect, width: i32, color: Rgba<u8>) {
    let half = width / 2;
    let outer = BoxRect {
        x: rect.x - half,
        y: rect.y - half,
        w: rect.w + width,
        h: rect.h + width,
    };
    let inner = BoxRect {
        x: rect.x + (width - half),
        y: rect.y + (width - half),
        w: rect.w - width,
        h: rect.h - width,
    };
    for py in outer.y..outer.y + outer.h {
        for px in outer.x..outer.x + outer.w {
            if !inner.contains(px, py) {
                put(img, px, py, color);
            }
        }
    }
}

fn draw_bitmap_text(img: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>, scale: i32) {
    let mut cursor_x = x;
    for ch in text.chars() {
        let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
            cursor_x += 8 * scale;
            continue;
        };
        for (row_idx, row) in glyph.iter().enumerate() {
            for col_idx in 0..8 {
                if (row >> col_idx) & 1 == 0 {
                    continue;
                }
                let px = cursor_x + col_idx * scale;
                let py = y + row_idx as i32 * scale;
                for sy in 0..scale {
                    for sx in 0..scale {
                        put(img, px + sx, py + sy, color);
                    }
                }
            }
        }
        cursor_x += 8 * scale;
    }
}

/// The image at natural resolution with every marker painted on it.
pub fn render_composite(image: &LoadedImage, markers: &[Marker]) -> RgbaImage {
    let mut img = image.pixels.clone();
    for m in markers {
        let [r, g, b] = m.color.rgb();
        fill_circle(&mut img, m.x as f32, m.y as f32, DOT_SIZE / 2.0, Rgba([r, g, b, 255]));
    }
    img
}

pub fn draw_count_box(img: &mut RgbaImage, count: usize) {
    let count_box = CountBox::new(img.width(), count);
    fill_rect(img, count_box.rect, WHITE);
    stroke_rect(img, count_box.rect, COUNT_BOX_BORDER, RED);
    let (tx, ty) = count_box.text_origin;
    draw_bitmap_text(img, tx, ty, &count_box.text, BLACK, COUNT_TEXT_SCALE);
}

pub fn encode_jpeg(img: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(rgb).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)?;
    Ok(bytes)
}

/// Render the annotated image with its count and write it as JPEG.
/// Nothing is written unless encoding succeeds.
pub fn export_image(session: &AnnotationSession, path: &Path) -> Result<(), ExportError> {
    let image = session.image().ok_or(ExportError::NoImage)?;
    let mut img = render_composite(image, session.markers());
    draw_count_box(&mut img, session.markers().len());
    let bytes = encode_jpeg(&img)?;
    std::fs::write(path, bytes)?;
    log::info!(
        "Exported {} with count {}",
        path.display(),
        session.markers().len()
    );
    Ok(())
}
