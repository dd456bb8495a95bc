use std::sync::Arc;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};

/// The one capability the renderer needs from a font.
pub trait Typeface {
    /// Rendered width of `text` in pixels at the given size.
    fn measure(&self, size: f32, text: &str) -> u32;
    fn draw(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, size: f32, text: &str);
}

/// Ordered candidates, tried in sequence at startup. Rendering never fails
/// for lack of a font: the chain terminates in [`BitmapFace`].
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub fn load_typeface() -> Arc<dyn Typeface + Send + Sync> {
    for path in FONT_CANDIDATES {
        if let Some(face) = VectorFace::from_path(path) {
            tracing::debug!(path, "card typeface loaded");
            return Arc::new(face);
        }
    }
    tracing::debug!("no system typeface found, using builtin bitmap face");
    Arc::new(BitmapFace)
}

pub struct VectorFace {
    font: FontVec,
}

impl VectorFace {
    /// None if the file is missing or is not a parseable font.
    pub fn from_path(path: &str) -> Option<Self> {
        let bytes = std::fs::read(path).ok()?;
        let font = FontVec::try_from_vec(bytes).ok()?;
        Some(Self { font })
    }
}

impl Typeface for VectorFace {
    fn measure(&self, size: f32, text: &str) -> u32 {
        let (width, _height) = text_size(PxScale::from(size), &self.font, text);
        width
    }

    fn draw(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, size: f32, text: &str) {
        draw_text_mut(canvas, color, x, y, PxScale::from(size), &self.font, text);
    }
}

/// Built-in 5x7 pixel face. Crude but always available; lowercase maps to
/// uppercase and unknown glyphs draw as a box.
pub struct BitmapFace;

const GLYPH_COLS: u32 = 5;
const GLYPH_ROWS: u32 = 7;
// one column of spacing at the nominal scale
const GLYPH_ADVANCE: u32 = GLYPH_COLS + 1;

impl BitmapFace {
    fn pixel_size(size: f32) -> u32 {
        (size / GLYPH_ROWS as f32).round().max(1.0) as u32
    }
}

impl Typeface for BitmapFace {
    fn measure(&self, size: f32, text: &str) -> u32 {
        let px = Self::pixel_size(size);
        text.chars().count() as u32 * GLYPH_ADVANCE * px
    }

    fn draw(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, size: f32, text: &str) {
        let px = Self::pixel_size(size) as i32;
        let mut pen_x = x;
        for c in text.chars() {
            if c != ' ' {
                let rows = glyph(c);
                for (row, bits) in rows.iter().enumerate() {
                    for col in 0..GLYPH_COLS {
                        if bits >> (GLYPH_COLS - 1 - col) & 1 == 1 {
                            fill_square(
                                canvas,
                                pen_x + col as i32 * px,
                                y + row as i32 * px,
                                px,
                                color,
                            );
                        }
                    }
                }
            }
            pen_x += GLYPH_ADVANCE as i32 * px;
        }
    }
}

fn fill_square(canvas: &mut RgbImage, x: i32, y: i32, side: i32, color: Rgb<u8>) {
    for dy in 0..side {
        for dx in 0..side {
            let (px, py) = (x + dx, y + dy);
            if px >= 0 && py >= 0 && (px as u32) < canvas.width() && (py as u32) < canvas.height() {
                canvas.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

// Row-major, 5 bits per row, MSB leftmost.
fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0E],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x01, 0x01, 0x01, 0x01, 0x11, 0x11, 0x0E],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x1B, 0x11],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '?' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
        '\'' => [0x04, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
        '"' => [0x0A, 0x0A, 0x00, 0x00, 0x00, 0x00, 0x00],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '_' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        ';' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x04, 0x08],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        '/' => [0x01, 0x01, 0x02, 0x04, 0x08, 0x10, 0x10],
        '@' => [0x0E, 0x11, 0x17, 0x15, 0x17, 0x10, 0x0E],
        _ => [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_face_measures_and_draws() {
        let face = BitmapFace;
        let mut canvas = RgbImage::from_pixel(200, 100, Rgb([0, 0, 0]));

        let width = face.measure(14.0, "hi");
        assert_eq!(width, 2 * 6 * 2);

        face.draw(&mut canvas, Rgb([255, 255, 255]), 10, 10, 14.0, "hi");
        let lit = canvas.pixels().filter(|p| p.0 == [255, 255, 255]).count();
        assert!(lit > 0);
    }

    #[test]
    fn builtin_face_clips_out_of_bounds_draws() {
        let face = BitmapFace;
        let mut canvas = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        // must not panic
        face.draw(&mut canvas, Rgb([255, 255, 255]), -50, -50, 70.0, "XYZ");
        face.draw(&mut canvas, Rgb([255, 255, 255]), 15, 15, 70.0, "XYZ");
    }

    #[test]
    fn missing_font_path_is_rejected() {
        assert!(VectorFace::from_path("/nonexistent/font.ttf").is_none());
    }
}
