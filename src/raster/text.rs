//! Bitmap text using the Spleen font family.
//!
//! Glyphs are taken from the Spleen cell closest to the requested pixel
//! height and scaled with nearest neighbour. Bold is a one-pixel double
//! strike; italic is a row shear. Font family names are not consulted.

use image::{Rgba, RgbaImage};
use spleen_font::{FONT_6X12, FONT_8X16, FONT_12X24, PSF2Font};

use super::draw::blend_pixel;
use crate::document::TextAlign;
use crate::error::ReportCardError;

/// Line height as a multiple of glyph height.
pub const LINE_SPACING: f32 = 1.2;

const ITALIC_SHEAR: f32 = 0.2;

/// One Spleen font cell size.
#[derive(Debug, Clone, Copy)]
struct Face {
    data: &'static [u8],
    cell_w: usize,
    cell_h: usize,
}

const SMALL: Face = Face {
    data: FONT_6X12,
    cell_w: 6,
    cell_h: 12,
};
const MEDIUM: Face = Face {
    data: FONT_8X16,
    cell_w: 8,
    cell_h: 16,
};
const LARGE: Face = Face {
    data: FONT_12X24,
    cell_w: 12,
    cell_h: 24,
};

fn face_for(px_height: u32) -> Face {
    match px_height {
        0..=13 => SMALL,
        14..=19 => MEDIUM,
        _ => LARGE,
    }
}

/// Resolved text drawing parameters, in buffer pixels.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    /// Glyph height.
    pub size: f32,
    pub color: Rgba<u8>,
    pub bold: bool,
    pub italic: bool,
}

impl TextStyle {
    pub fn glyph_height(&self) -> u32 {
        self.size.round().max(1.0) as u32
    }

    pub fn glyph_width(&self) -> u32 {
        let face = face_for(self.glyph_height());
        ((face.cell_w as f32 * self.glyph_height() as f32 / face.cell_h as f32).round() as u32)
            .max(1)
    }

    pub fn line_height(&self) -> f32 {
        self.glyph_height() as f32 * LINE_SPACING
    }

    /// Advance width of `text`.
    pub fn measure(&self, text: &str) -> f32 {
        (text.chars().count() as u32 * self.glyph_width()) as f32
    }

    /// Characters that fit in `width`.
    pub fn chars_fitting(&self, width: f32) -> usize {
        (width / self.glyph_width() as f32).floor().max(0.0) as usize
    }
}

/// Word-wrap `text` to lines of at most `max_chars` characters.
///
/// Explicit newlines are kept; words longer than a line are split.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let used = current.chars().count();
            let sep = usize::from(!current.is_empty());
            if used + sep + word.len() > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.extend(word);
        }
        lines.push(current);
    }
    lines
}

/// Draw a single line of text with its top-left at (`x`, `y`).
pub fn draw_line(
    img: &mut RgbaImage,
    text: &str,
    x: f32,
    y: f32,
    style: &TextStyle,
) -> Result<(), ReportCardError> {
    let gh = style.glyph_height() as usize;
    let gw = style.glyph_width() as usize;
    let face = face_for(gh as u32);
    let mut font = PSF2Font::new(face.data)
        .map_err(|_| ReportCardError::Render("bitmap font failed to load".into()))?;
    let bold_offset = (gh / 16).max(1) as i32;

    let mut cursor = x.round() as i32;
    let top = y.round() as i32;
    for ch in text.chars() {
        if !ch.is_whitespace() {
            let bits = glyph_bits(&mut font, face, ch);
            for dy in 0..gh {
                let sy = dy * face.cell_h / gh;
                let shear = if style.italic {
                    ((gh - dy) as f32 * ITALIC_SHEAR * gw as f32 / gh as f32).round() as i32
                } else {
                    0
                };
                for dx in 0..gw {
                    let sx = dx * face.cell_w / gw;
                    if !bits[sy * face.cell_w + sx] {
                        continue;
                    }
                    let px = cursor + dx as i32 + shear;
                    let py = top + dy as i32;
                    blend_pixel(img, px, py, style.color);
                    if style.bold {
                        blend_pixel(img, px + bold_offset, py, style.color);
                    }
                }
            }
        }
        cursor += gw as i32;
    }
    Ok(())
}

/// Glyph bitmap for `ch`, row-major `cell_w * cell_h`. Unknown glyphs are a box.
fn glyph_bits(font: &mut PSF2Font, face: Face, ch: char) -> Vec<bool> {
    let mut bits = vec![false; face.cell_w * face.cell_h];
    let utf8 = ch.to_string();
    match font.glyph_for_utf8(utf8.as_bytes()) {
        Some(glyph) => {
            for (row_y, row) in glyph.enumerate() {
                for (col_x, on) in row.enumerate() {
                    if row_y < face.cell_h && col_x < face.cell_w {
                        bits[row_y * face.cell_w + col_x] = on;
                    }
                }
            }
        }
        None => {
            for x in 1..face.cell_w - 1 {
                bits[2 * face.cell_w + x] = true;
                bits[(face.cell_h - 3) * face.cell_w + x] = true;
            }
            for y in 2..face.cell_h - 2 {
                bits[y * face.cell_w + 1] = true;
                bits[y * face.cell_w + face.cell_w - 2] = true;
            }
        }
    }
    bits
}

/// Horizontal start of a line of `width` inside `[left, left + avail)`.
pub fn aligned_x(align: TextAlign, left: f32, avail: f32, width: f32) -> f32 {
    match align {
        TextAlign::Left => left,
        TextAlign::Center => left + (avail - width) / 2.0,
        TextAlign::Right => left + avail - width,
    }
}
