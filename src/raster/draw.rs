//! Pixel primitives on RGBA buffers.
//!
//! Everything blends with source-over alpha; coordinates outside the buffer
//! are clipped silently, and loops only visit pixels inside it.

use image::{Rgba, RgbaImage};

use crate::document::{BorderStyle, TRANSPARENT};

/// Parse a CSS colour. `None` for transparent, fully clear or unparseable values.
pub fn parse_color(value: &str) -> Option<Rgba<u8>> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(TRANSPARENT) {
        return None;
    }
    let parsed: csscolorparser::Color = value.parse().ok()?;
    let rgba = parsed.to_rgba8();
    (rgba[3] > 0).then_some(Rgba(rgba))
}

/// Scale a colour's alpha.
pub fn with_alpha(color: Rgba<u8>, factor: f32) -> Rgba<u8> {
    let Rgba([r, g, b, a]) = color;
    Rgba([r, g, b, (f32::from(a) * factor.clamp(0.0, 1.0)).round() as u8])
}

/// Source-over blend a single pixel.
pub fn blend_pixel(img: &mut RgbaImage, x: i32, y: i32, src: Rgba<u8>) {
    if x < 0 || y < 0 || x as u32 >= img.width() || y as u32 >= img.height() {
        return;
    }
    let sa = f32::from(src[3]) / 255.0;
    if sa <= 0.0 {
        return;
    }
    let dst = img.get_pixel_mut(x as u32, y as u32);
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return;
    }
    for c in 0..3 {
        let s = f32::from(src[c]) * sa;
        let d = f32::from(dst[c]) * da * (1.0 - sa);
        dst[c] = ((s + d) / out_a).round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

/// Axis-aligned rectangle in buffer pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Shrink on all sides, never below zero size.
    pub fn inset(self, by: f32) -> Self {
        Self {
            x: self.x + by,
            y: self.y + by,
            w: (self.w - 2.0 * by).max(0.0),
            h: (self.h - 2.0 * by).max(0.0),
        }
    }

    pub fn right(self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(self) -> f32 {
        self.y + self.h
    }
}

pub fn fill_rect(img: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    fill_rounded_rect(img, rect, 0.0, color);
}

/// Fill a rectangle with rounded corners.
pub fn fill_rounded_rect(img: &mut RgbaImage, rect: Rect, radius: f32, color: Rgba<u8>) {
    let radius = radius.min(rect.w / 2.0).min(rect.h / 2.0).max(0.0);
    let (x0, x1) = clip_span(rect.x.round(), rect.right().round(), img.width());
    let (y0, y1) = clip_span(rect.y.round(), rect.bottom().round(), img.height());
    for y in y0..y1 {
        for x in x0..x1 {
            if radius > 0.0 && outside_corner(rect, radius, x as f32 + 0.5, y as f32 + 0.5) {
                continue;
            }
            blend_pixel(img, x, y, color);
        }
    }
}

/// Integer range `from..to` limited to `0..len`.
fn clip_span(from: f32, to: f32, len: u32) -> (i32, i32) {
    let len = i32::try_from(len).unwrap_or(i32::MAX);
    ((from as i32).clamp(0, len), (to as i32).clamp(0, len))
}

fn outside_corner(rect: Rect, radius: f32, px: f32, py: f32) -> bool {
    let cx = px.clamp(rect.x + radius, rect.right() - radius);
    let cy = py.clamp(rect.y + radius, rect.bottom() - radius);
    let (dx, dy) = (px - cx, py - cy);
    dx * dx + dy * dy > radius * radius
}

/// Whether position `t` along a stroke is inked for a border style.
fn inked(style: BorderStyle, t: i64, width: f32) -> bool {
    let w = if width.is_finite() {
        width.clamp(1.0, 4096.0).round() as i64
    } else {
        1
    };
    match style {
        BorderStyle::None => false,
        BorderStyle::Solid => true,
        BorderStyle::Dashed => t.rem_euclid(5 * w) < 3 * w,
        BorderStyle::Dotted => t.rem_euclid(2 * w) < w,
    }
}

/// Horizontal stroke of the given thickness, starting at `y`.
pub fn hline(
    img: &mut RgbaImage,
    x0: f32,
    x1: f32,
    y: f32,
    thickness: f32,
    style: BorderStyle,
    color: Rgba<u8>,
) {
    let start = x0.round();
    let (from, to) = clip_span(start, x1.round(), img.width());
    let (top, bottom) = clip_span(y.round(), y.round() + thickness.max(1.0).round(), img.height());
    for x in from..to {
        if !inked(style, i64::from(x) - start as i64, thickness) {
            continue;
        }
        for py in top..bottom {
            blend_pixel(img, x, py, color);
        }
    }
}

/// Vertical stroke of the given thickness, starting at `x`.
pub fn vline(
    img: &mut RgbaImage,
    x: f32,
    y0: f32,
    y1: f32,
    thickness: f32,
    style: BorderStyle,
    color: Rgba<u8>,
) {
    let start = y0.round();
    let (from, to) = clip_span(start, y1.round(), img.height());
    let (left, right) = clip_span(x.round(), x.round() + thickness.max(1.0).round(), img.width());
    for y in from..to {
        if !inked(style, i64::from(y) - start as i64, thickness) {
            continue;
        }
        for px in left..right {
            blend_pixel(img, px, y, color);
        }
    }
}

/// Stroke a rectangle's border inside its bounds.
pub fn stroke_rect(img: &mut RgbaImage, rect: Rect, width: f32, style: BorderStyle, color: Rgba<u8>) {
    if style == BorderStyle::None || width <= 0.0 {
        return;
    }
    let w = width.max(1.0);
    hline(img, rect.x, rect.right(), rect.y, w, style, color);
    hline(img, rect.x, rect.right(), rect.bottom() - w, w, style, color);
    vline(img, rect.x, rect.y, rect.bottom(), w, style, color);
    vline(img, rect.right() - w, rect.y, rect.bottom(), w, style, color);
}

/// Fill an ellipse inscribed in `rect`.
pub fn fill_ellipse(img: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    ellipse_pixels(img, rect, None, color);
}

/// Stroke an ellipse inscribed in `rect` with the given ring width.
pub fn stroke_ellipse(img: &mut RgbaImage, rect: Rect, width: f32, color: Rgba<u8>) {
    if width <= 0.0 {
        return;
    }
    ellipse_pixels(img, rect, Some(width.max(1.0)), color);
}

fn ellipse_pixels(img: &mut RgbaImage, rect: Rect, ring: Option<f32>, color: Rgba<u8>) {
    let (rx, ry) = (rect.w / 2.0, rect.h / 2.0);
    if rx <= 0.0 || ry <= 0.0 {
        return;
    }
    let (cx, cy) = (rect.x + rx, rect.y + ry);
    let inner = ring.map(|w| ((rx - w).max(0.0), (ry - w).max(0.0)));
    let (x0, x1) = clip_span(rect.x.floor(), rect.right().ceil(), img.width());
    let (y0, y1) = clip_span(rect.y.floor(), rect.bottom().ceil(), img.height());
    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if (dx / rx).powi(2) + (dy / ry).powi(2) > 1.0 {
                continue;
            }
            if let Some((irx, iry)) = inner
                && irx > 0.0
                && iry > 0.0
                && (dx / irx).powi(2) + (dy / iry).powi(2) < 1.0
            {
                continue;
            }
            blend_pixel(img, x, y, color);
        }
    }
}

/// Draw a straight line between two points (nearest-pixel stepping).
pub fn line(img: &mut RgbaImage, from: (f32, f32), to: (f32, f32), color: Rgba<u8>) {
    let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs()).ceil() as i32;
    for i in 0..=steps.max(1) {
        let t = i as f32 / steps.max(1) as f32;
        let x = from.0 + (to.0 - from.0) * t;
        let y = from.1 + (to.1 - from.1) * t;
        blend_pixel(img, x.round() as i32, y.round() as i32, color);
    }
}

/// Composite `layer` onto `page` with its top-left at (`x`, `y`), rotated
/// clockwise by `rotation` degrees about its centre, at `opacity`.
pub fn composite(
    page: &mut RgbaImage,
    layer: &RgbaImage,
    x: f32,
    y: f32,
    rotation: f32,
    opacity: f32,
) {
    let frame = Rect::new(x, y, layer.width() as f32, layer.height() as f32);
    composite_window(page, layer, frame, (0.0, 0.0), rotation, opacity);
}

/// Composite a partial layer. `frame` is the whole box on the page before
/// rotation; `layer` holds the box's pixels starting at `offset` within it.
pub fn composite_window(
    page: &mut RgbaImage,
    layer: &RgbaImage,
    frame: Rect,
    offset: (f32, f32),
    rotation: f32,
    opacity: f32,
) {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || layer.width() == 0 || layer.height() == 0 {
        return;
    }
    let (lw, lh) = (layer.width() as f32, layer.height() as f32);

    if rotation.rem_euclid(360.0) == 0.0 {
        let ox = (frame.x + offset.0).round() as i32;
        let oy = (frame.y + offset.1).round() as i32;
        for (lx, ly, px) in layer.enumerate_pixels() {
            blend_pixel(page, ox + lx as i32, oy + ly as i32, with_alpha(*px, opacity));
        }
        return;
    }

    let rotate = Rotation::new(frame, rotation);
    // bounding box of the rotated box
    let (sin, cos) = (rotate.sin.abs(), rotate.cos.abs());
    let half_w = (frame.w * cos + frame.h * sin) / 2.0;
    let half_h = (frame.w * sin + frame.h * cos) / 2.0;
    let (x0, x1) = clip_span((rotate.cx - half_w).floor(), (rotate.cx + half_w).ceil(), page.width());
    let (y0, y1) = clip_span((rotate.cy - half_h).floor(), (rotate.cy + half_h).ceil(), page.height());
    for py in y0..y1 {
        for px in x0..x1 {
            let (bx, by) = rotate.to_box(px as f32 + 0.5, py as f32 + 0.5);
            let (lx, ly) = (bx - offset.0, by - offset.1);
            if lx < 0.0 || ly < 0.0 || lx >= lw || ly >= lh {
                continue;
            }
            let src = *layer.get_pixel(lx as u32, ly as u32);
            blend_pixel(page, px, py, with_alpha(src, opacity));
        }
    }
}

/// Clockwise rotation of a box about its centre.
#[derive(Debug, Clone, Copy)]
pub struct Rotation {
    cx: f32,
    cy: f32,
    half_w: f32,
    half_h: f32,
    sin: f32,
    cos: f32,
}

impl Rotation {
    pub fn new(frame: Rect, degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            cx: frame.x + frame.w / 2.0,
            cy: frame.y + frame.h / 2.0,
            half_w: frame.w / 2.0,
            half_h: frame.h / 2.0,
            sin,
            cos,
        }
    }

    /// Inverse rotation: a page point in box-local coordinates.
    pub fn to_box(&self, px: f32, py: f32) -> (f32, f32) {
        let dx = px - self.cx;
        let dy = py - self.cy;
        (
            dx * self.cos + dy * self.sin + self.half_w,
            -dx * self.sin + dy * self.cos + self.half_h,
        )
    }
}
