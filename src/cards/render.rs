use std::io::Cursor;

use anyhow::Context;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;

use crate::cards::font::Typeface;
use crate::AppResult;

pub const WIDTH: u32 = 1080;
pub const HEIGHT: u32 = 1080;

const BACKGROUND: Rgb<u8> = Rgb([88, 101, 242]);
const TEXT: Rgb<u8> = Rgb([255, 255, 255]);
// the accents are translucent white in spirit; pre-blended over the
// background since the canvas has no alpha channel
const ACCENT: Rgb<u8> = Rgb([121, 131, 245]);
const MUTED: Rgb<u8> = Rgb([219, 222, 252]);

const TITLE_SIZE: f32 = 90.0;
const BODY_SIZE: f32 = 72.0;
const FOOTER_SIZE: f32 = 50.0;
const CTA_SIZE: f32 = 40.0;

const BODY_TOP: i32 = 350;
const BODY_LINE_HEIGHT: i32 = 85;

pub const WRAP_COLUMNS: usize = 22;
pub const MAX_BODY_LINES: usize = 8;

/// Deterministic: no disk or network side effects, same input bytes out for
/// the same message, recipient, and face.
pub fn render(text: &str, recipient: &str, face: &dyn Typeface) -> AppResult<Vec<u8>> {
    let mut canvas = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);

    draw_filled_circle_mut(&mut canvas, (WIDTH as i32 - 75, 75), 225, ACCENT);
    draw_filled_circle_mut(&mut canvas, (75, HEIGHT as i32 - 75), 225, ACCENT);

    draw_centered(&mut canvas, face, TEXT, 100, TITLE_SIZE, "Anonymous Message");
    draw_filled_rect_mut(
        &mut canvas,
        Rect::at(WIDTH as i32 / 2 - 180, 230).of_size(360, 12),
        TEXT,
    );

    let mut y = BODY_TOP;
    for line in wrap_body(text) {
        draw_centered(&mut canvas, face, TEXT, y, BODY_SIZE, &line);
        y += BODY_LINE_HEIGHT;
    }

    let footer = format!("Sent to @{recipient}");
    draw_centered(&mut canvas, face, TEXT, HEIGHT as i32 - 200, FOOTER_SIZE, &footer);
    draw_centered(
        &mut canvas,
        face,
        MUTED,
        HEIGHT as i32 - 100,
        CTA_SIZE,
        "Send me anonymous messages!",
    );

    let mut buffer = Cursor::new(Vec::new());
    canvas
        .write_to(&mut buffer, image::ImageFormat::Png)
        .context("encoding card png")?;
    Ok(buffer.into_inner())
}

fn draw_centered(
    canvas: &mut RgbImage,
    face: &dyn Typeface,
    color: Rgb<u8>,
    y: i32,
    size: f32,
    text: &str,
) {
    let width = face.measure(size, text);
    let x = WIDTH.saturating_sub(width) / 2;
    face.draw(canvas, color, x as i32, y, size, text);
}

/// Word-wraps the body to [`WRAP_COLUMNS`] and caps it at
/// [`MAX_BODY_LINES`], truncating the last line with an ellipsis marker
/// when the body overflows.
pub fn wrap_body(text: &str) -> Vec<String> {
    let mut lines = wrap(text, WRAP_COLUMNS);
    if lines.len() > MAX_BODY_LINES {
        lines.truncate(MAX_BODY_LINES);
        let last = &mut lines[MAX_BODY_LINES - 1];
        let mut truncated: String = last.chars().take(WRAP_COLUMNS - 3).collect();
        truncated.push_str("...");
        *last = truncated;
    }
    lines
}

fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let mut word = word;

        // hard-split anything wider than a full line
        while word.chars().count() > columns {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let head: String = word.chars().take(columns).collect();
            word = &word[head.len()..];
            lines.push(head);
        }
        if word.is_empty() {
            continue;
        }

        if line.is_empty() {
            line = word.to_owned();
        } else if line.chars().count() + 1 + word.chars().count() <= columns {
            line.push(' ');
            line.push_str(word);
        } else {
            lines.push(std::mem::take(&mut line));
            line = word.to_owned();
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
