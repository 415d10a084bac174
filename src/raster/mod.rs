//! # Rasterization and export
//!
//! Turns a [`RenderedPage`] into pixels and pixels into files:
//!
//! - [`Rasterizer`]: draws every block (backgrounds, borders, text, tables,
//!   images, rules, shapes) at a scale factor, applying rotation and opacity
//!   per block
//! - [`to_png`]: PNG encoding for previews
//! - [`PdfBuilder`]: multi-page PDF, one raster per page
//! - [`ImageResolver`]: downloads and caches image sources ahead of time
//!
//! Rasterization is synchronous and never touches the network; image pixels
//! come from a [`ResolvedImages`] map filled by the resolver beforehand.
//!
//! Geometry comes from client JSON, so every length is bounded before it
//! drives an allocation or a loop: block sides, strokes, padding and font
//! sizes are clamped, and each unrotated block only allocates the part of
//! its layer that lands on the page.

pub mod draw;
mod pdf;
mod resolve;
pub mod text;

pub use pdf::PdfBuilder;
pub use resolve::{ImageResolver, ResolvedImages, ResolverConfig, is_private_host};

use std::io::Cursor;

use image::{DynamicImage, Rgba, RgbaImage, imageops::FilterType};

use crate::context::RendererContext;
use crate::document::{
    BorderStyle, FontStyle, FontWeight, ImageFit, LineDirection, ShapeKind, TextAlign,
    Template, VerticalAlign,
};
use crate::error::ReportCardError;
use crate::render::{
    BlockBody, ImageSource, ImageStates, PageView, RenderedBlock, RenderedPage, TableFont,
};
use crate::tables::{RowEmphasis, TableBlock};
use draw::{
    Rect, Rotation, composite, composite_window, fill_rect, fill_rounded_rect, hline, parse_color,
    stroke_rect, vline,
};
use text::{TextStyle, aligned_x, draw_line, wrap};

/// Scale used for print output (2x the 96 DPI document grid).
pub const EXPORT_SCALE: f32 = 2.0;

/// Largest accepted raster scale.
pub const MAX_SCALE: f32 = 8.0;

/// Longest block side drawn, in document pixels.
const MAX_BLOCK_EXTENT: f32 = 4096.0;
const MAX_FONT_SIZE: f32 = 144.0;
const MAX_STROKE: f32 = 64.0;
const MAX_PADDING: f32 = 512.0;

const SELECTION_COLOR: Rgba<u8> = Rgba([59, 130, 246, 255]);
const GRID_COLOR: Rgba<u8> = Rgba([209, 213, 219, 255]);
const PLACEHOLDER_FILL: Rgba<u8> = Rgba([243, 244, 246, 255]);
const PLACEHOLDER_INK: Rgba<u8> = Rgba([156, 163, 175, 255]);
const FALLBACK_TEXT: Rgba<u8> = Rgba([17, 24, 39, 255]);

/// Draws rendered pages onto RGBA buffers.
pub struct Rasterizer<'a> {
    images: &'a ResolvedImages,
}

impl<'a> Rasterizer<'a> {
    pub fn new(images: &'a ResolvedImages) -> Self {
        Self { images }
    }

    /// Rasterize a page at `scale` (1.0 = one pixel per document pixel).
    pub fn rasterize(&self, page: &RenderedPage, scale: f32) -> Result<RgbaImage, ReportCardError> {
        if !(scale.is_finite() && scale > 0.0 && scale <= MAX_SCALE) {
            return Err(ReportCardError::Render(format!("invalid scale {}", scale)));
        }
        let width = (page.width as f32 * scale).round() as u32;
        let height = (page.height as f32 * scale).round() as u32;
        let background = parse_color(&page.background).unwrap_or(Rgba([255, 255, 255, 255]));
        let mut canvas = RgbaImage::from_pixel(width, height, background);
        let bounds = Rect::new(0.0, 0.0, width as f32, height as f32);

        for block in &page.blocks {
            let (w, h) = block_size(block, scale);
            let frame = Rect::new(block.x * scale, block.y * scale, w, h);
            let Some(window) = visible_window(frame, block.rotation, bounds) else {
                continue;
            };
            let layer = self.draw_block(block, scale, window)?;
            composite_window(
                &mut canvas,
                &layer,
                frame,
                (window.x, window.y),
                block.rotation,
                block.opacity,
            );
        }
        Ok(canvas)
    }

    /// Draw the `window` part of one block into its own layer, unrotated.
    fn draw_block(
        &self,
        block: &RenderedBlock,
        scale: f32,
        window: Rect,
    ) -> Result<RgbaImage, ReportCardError> {
        let (w, h) = block_size(block, scale);
        let mut layer = RgbaImage::new(window.w as u32, window.h as u32);
        let frame = Rect::new(-window.x, -window.y, w, h);
        let style = &block.style;
        let border_width = bounded(style.border_width, MAX_STROKE) * scale;
        let border_color = parse_color(&style.border_color);

        let is_ellipse = matches!(
            block.body,
            BlockBody::Shape {
                shape: ShapeKind::Ellipse
            }
        );
        let is_line = matches!(block.body, BlockBody::Line { .. });

        if is_ellipse {
            if let Some(fill) = parse_color(&style.background_color) {
                draw::fill_ellipse(&mut layer, frame, fill);
            }
            if let Some(color) = border_color
                && style.border_style != BorderStyle::None
            {
                draw::stroke_ellipse(&mut layer, frame, border_width, color);
            }
        } else if !is_line {
            if let Some(fill) = parse_color(&style.background_color) {
                fill_rounded_rect(&mut layer, frame, style.border_radius * scale, fill);
            }
            if let Some(color) = border_color {
                stroke_rect(&mut layer, frame, border_width, style.border_style, color);
            }
        }

        let inner = frame.inset(bounded(style.padding, MAX_PADDING) * scale + border_width);
        match &block.body {
            BlockBody::Text { text, rule_above } => {
                let ts = text_style(block, scale);
                if *rule_above {
                    let rule_y = inner.y + (inner.h - ts.line_height()) / 2.0 - 4.0 * scale;
                    hline(
                        &mut layer,
                        inner.x,
                        inner.right(),
                        rule_y.max(inner.y),
                        scale,
                        BorderStyle::Solid,
                        ts.color,
                    );
                }
                draw_paragraph(&mut layer, text, inner, block, &ts)?;
            }
            BlockBody::Editor { raw, .. } => {
                let ts = text_style(block, scale);
                draw_paragraph(&mut layer, raw, inner, block, &ts)?;
                stroke_rect(&mut layer, frame, scale, BorderStyle::Dashed, SELECTION_COLOR);
            }
            BlockBody::Table {
                caption,
                table,
                font,
            } => {
                draw_table(&mut layer, caption, table, font, frame.inset(border_width), scale)?;
            }
            BlockBody::Image { source, fit } => {
                let image = match source {
                    ImageSource::Url { url } => self.images.get(url),
                    ImageSource::Placeholder => None,
                };
                match image {
                    Some(image) => draw_image(&mut layer, image, frame, *fit),
                    None => draw_image_placeholder(&mut layer, frame, scale),
                }
            }
            BlockBody::Line {
                direction,
                thickness,
                color,
                border_style,
            } => {
                let color = parse_color(color).unwrap_or(FALLBACK_TEXT);
                let t = bounded(*thickness, MAX_STROKE) * scale;
                let style = match border_style {
                    BorderStyle::None => BorderStyle::Solid,
                    other => *other,
                };
                match direction {
                    LineDirection::Horizontal => {
                        let y = frame.y + ((frame.h - t) / 2.0).max(0.0);
                        hline(&mut layer, frame.x, frame.right(), y, t, style, color);
                    }
                    LineDirection::Vertical => {
                        let x = frame.x + ((frame.w - t) / 2.0).max(0.0);
                        vline(&mut layer, x, frame.y, frame.bottom(), t, style, color);
                    }
                }
            }
            BlockBody::Shape { .. } => {}
        }

        if block.outlined {
            stroke_rect(&mut layer, frame, 2.0 * scale, BorderStyle::Solid, SELECTION_COLOR);
        }
        Ok(layer)
    }
}

/// Clamp a client-supplied length to `0..=max`; non-finite values become zero.
fn bounded(value: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, max)
    } else {
        0.0
    }
}

/// Full layer size of a block, in buffer pixels.
fn block_size(block: &RenderedBlock, scale: f32) -> (f32, f32) {
    let side = |v: f32| (bounded(v, MAX_BLOCK_EXTENT) * scale).round().max(1.0);
    (side(block.width), side(block.height))
}

/// The part of `frame` that can reach the page once rotated, in box-local
/// pixels. `None` when nothing of it lands on the page.
fn visible_window(frame: Rect, rotation: f32, page: Rect) -> Option<Rect> {
    if !(frame.x.is_finite() && frame.y.is_finite() && rotation.is_finite()) {
        return None;
    }
    let (mut left, mut top, mut right, mut bottom) = if rotation.rem_euclid(360.0) == 0.0 {
        (
            page.x - frame.x,
            page.y - frame.y,
            page.right() - frame.x,
            page.bottom() - frame.y,
        )
    } else {
        // page corners mapped back into the unrotated box
        let rotate = Rotation::new(frame, rotation);
        let corners = [
            rotate.to_box(page.x, page.y),
            rotate.to_box(page.right(), page.y),
            rotate.to_box(page.x, page.bottom()),
            rotate.to_box(page.right(), page.bottom()),
        ];
        corners.iter().fold(
            (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
            |(l, t, r, b), &(x, y)| (l.min(x), t.min(y), r.max(x), b.max(y)),
        )
    };
    left = left.max(0.0).floor();
    top = top.max(0.0).floor();
    right = right.min(frame.w).ceil();
    bottom = bottom.min(frame.h).ceil();
    (right > left && bottom > top).then(|| Rect::new(left, top, right - left, bottom - top))
}

fn text_style(block: &RenderedBlock, scale: f32) -> TextStyle {
    TextStyle {
        size: bounded(block.style.font_size, MAX_FONT_SIZE) * scale,
        color: parse_color(&block.style.color).unwrap_or(FALLBACK_TEXT),
        bold: block.style.font_weight == FontWeight::Bold,
        italic: block.style.font_style == FontStyle::Italic,
    }
}

/// Wrapped, aligned text inside `area`, clipped to whole lines that fit.
fn draw_paragraph(
    layer: &mut RgbaImage,
    text: &str,
    area: Rect,
    block: &RenderedBlock,
    ts: &TextStyle,
) -> Result<(), ReportCardError> {
    let lines = wrap(text, ts.chars_fitting(area.w));
    let line_h = ts.line_height();
    let max_lines = ((area.h / line_h).floor() as usize).max(1);
    let lines = &lines[..lines.len().min(max_lines)];
    let total_h = lines.len() as f32 * line_h;
    let top = match block.style.vertical_align {
        VerticalAlign::Top => area.y,
        VerticalAlign::Middle => area.y + (area.h - total_h) / 2.0,
        VerticalAlign::Bottom => area.bottom() - total_h,
    };
    let leading = (line_h - ts.glyph_height() as f32) / 2.0;
    for (i, line) in lines.iter().enumerate() {
        let x = aligned_x(block.style.text_align, area.x, area.w, ts.measure(line));
        draw_line(layer, line, x, top + i as f32 * line_h + leading, ts)?;
    }
    Ok(())
}

/// Column widths: a wider first column when there are more than two.
fn column_widths(columns: usize, total: f32) -> Vec<f32> {
    if columns == 0 {
        return Vec::new();
    }
    let first_weight = if columns > 2 { 2.0 } else { 1.0 };
    let unit = total / (first_weight + (columns - 1) as f32);
    (0..columns)
        .map(|i| if i == 0 { unit * first_weight } else { unit })
        .collect()
}

fn draw_table(
    layer: &mut RgbaImage,
    caption: &str,
    table: &TableBlock,
    font: &TableFont,
    area: Rect,
    scale: f32,
) -> Result<(), ReportCardError> {
    let color = parse_color(&font.color).unwrap_or(FALLBACK_TEXT);
    let body_style = TextStyle {
        size: bounded(font.size, MAX_FONT_SIZE) * table.font_scale() * scale,
        color,
        bold: false,
        italic: false,
    };
    let pad = table.cell_padding() * scale;
    let row_h = body_style.line_height() + 2.0 * pad;
    let mut y = area.y;

    if !caption.trim().is_empty() {
        let caption_style = TextStyle {
            bold: true,
            ..body_style
        };
        draw_line(layer, caption, area.x + pad, y + pad, &caption_style)?;
        y += row_h;
    }

    let widths = column_widths(table.column_count(), area.w);
    let header_style = TextStyle {
        bold: true,
        color: parse_color(&table.style.header_color).unwrap_or(color),
        ..body_style
    };
    if let Some(fill) = parse_color(&table.style.header_background) {
        fill_rect(layer, Rect::new(area.x, y, area.w, row_h), fill);
    }
    draw_cells(layer, &table.headers, &widths, area.x, y, row_h, pad, &header_style)?;
    let grid_top = y;
    y += row_h;

    for (i, row) in table.rows.iter().enumerate() {
        if y + row_h > area.bottom() + 0.5 {
            break;
        }
        if let Some(fill) = table.row_background(i).and_then(parse_color) {
            fill_rect(layer, Rect::new(area.x, y, area.w, row_h), fill);
        }
        let row_style = TextStyle {
            bold: row.emphasis == RowEmphasis::Total,
            ..body_style
        };
        draw_cells(layer, &row.cells, &widths, area.x, y, row_h, pad, &row_style)?;
        y += row_h;
    }

    // grid
    let rule = scale.max(1.0);
    let mut row_y = grid_top;
    while row_y <= y + 0.5 {
        hline(layer, area.x, area.right(), row_y, rule, BorderStyle::Solid, GRID_COLOR);
        row_y += row_h;
    }
    let mut col_x = area.x;
    for w in &widths {
        vline(layer, col_x, grid_top, y, rule, BorderStyle::Solid, GRID_COLOR);
        col_x += w;
    }
    vline(layer, area.right() - rule, grid_top, y, rule, BorderStyle::Solid, GRID_COLOR);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn draw_cells(
    layer: &mut RgbaImage,
    cells: &[String],
    widths: &[f32],
    left: f32,
    top: f32,
    row_h: f32,
    pad: f32,
    style: &TextStyle,
) -> Result<(), ReportCardError> {
    let text_top = top + (row_h - style.glyph_height() as f32) / 2.0;
    let mut x = left;
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        let avail = (width - 2.0 * pad).max(0.0);
        let fitted: String = cell.chars().take(style.chars_fitting(avail)).collect();
        let align = if i == 0 {
            TextAlign::Left
        } else {
            TextAlign::Center
        };
        let tx = aligned_x(align, x + pad, avail, style.measure(&fitted));
        draw_line(layer, &fitted, tx, text_top, style)?;
        x += width;
    }
    Ok(())
}

fn draw_image(layer: &mut RgbaImage, image: &DynamicImage, frame: Rect, fit: ImageFit) {
    let (fw, fh) = (frame.w.max(1.0), frame.h.max(1.0));
    let (iw, ih) = (image.width().max(1) as f32, image.height().max(1) as f32);
    let (w, h) = match fit {
        ImageFit::Fill => (fw, fh),
        ImageFit::Contain => {
            let k = (fw / iw).min(fh / ih);
            (iw * k, ih * k)
        }
    };
    let target = Rect::new(frame.x + (fw - w) / 2.0, frame.y + (fh - h) / 2.0, w, h);

    // only the part of the picture that lands on the layer is resampled
    let left = target.x.max(0.0);
    let top = target.y.max(0.0);
    let right = target.right().min(layer.width() as f32);
    let bottom = target.bottom().min(layer.height() as f32);
    if right - left < 1.0 || bottom - top < 1.0 {
        return;
    }
    let (kx, ky) = (iw / w, ih / h);
    let sx = (((left - target.x) * kx).floor() as u32).min(image.width().saturating_sub(1));
    let sy = (((top - target.y) * ky).floor() as u32).min(image.height().saturating_sub(1));
    let sw = (((right - left) * kx).ceil() as u32).clamp(1, (image.width() - sx).max(1));
    let sh = (((bottom - top) * ky).ceil() as u32).clamp(1, (image.height() - sy).max(1));
    let resized = image
        .crop_imm(sx, sy, sw, sh)
        .resize_exact(
            (right - left).round().max(1.0) as u32,
            (bottom - top).round().max(1.0) as u32,
            FilterType::Triangle,
        )
        .to_rgba8();
    composite(layer, &resized, left, top, 0.0, 1.0);
}

/// Framed picture glyph: a light box with a cross.
fn draw_image_placeholder(layer: &mut RgbaImage, frame: Rect, scale: f32) {
    fill_rect(layer, frame, PLACEHOLDER_FILL);
    stroke_rect(layer, frame, scale, BorderStyle::Dashed, PLACEHOLDER_INK);
    let inner = frame.inset(frame.w.min(frame.h) * 0.3);
    draw::line(layer, (inner.x, inner.y), (inner.right(), inner.bottom()), PLACEHOLDER_INK);
    draw::line(layer, (inner.right(), inner.y), (inner.x, inner.bottom()), PLACEHOLDER_INK);
}

/// Encode an RGBA buffer as PNG.
pub fn to_png(image: &RgbaImage) -> Result<Vec<u8>, ReportCardError> {
    let mut png_bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png_bytes), image::ImageFormat::Png)
        .map_err(|e| ReportCardError::Export(format!("PNG encoding failed: {}", e)))?;
    Ok(png_bytes)
}

/// Resolve a template's images, then render it to PNG off the async runtime.
///
/// `preview = false` draws the editing view (element outlines).
pub async fn render_png(
    resolver: &ImageResolver,
    template: &Template,
    ctx: Option<&RendererContext>,
    preview: bool,
    scale: f32,
) -> Result<Vec<u8>, ReportCardError> {
    let mut states = ImageStates::new();
    let images = resolver.resolve_template(template, ctx, &mut states).await;
    let view = PageView {
        preview,
        ..PageView::preview()
    };
    let page = template.render_page(ctx, view, &states);
    tokio::task::spawn_blocking(move || {
        let raster = Rasterizer::new(&images).rasterize(&page, scale)?;
        to_png(&raster)
    })
    .await
    .map_err(|e| ReportCardError::Render(format!("render task failed: {}", e)))?
}
