//! Multi-page PDF assembly: one full-page raster per page.

use std::io::BufWriter;

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use printpdf::{
    ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Mm, PdfDocument,
    PdfDocumentReference, Px,
};

use crate::error::ReportCardError;

/// Document pixels per inch.
const DOCUMENT_DPI: f32 = 96.0;
const MM_PER_INCH: f32 = 25.4;

/// Builds a PDF whose pages are sized to the template's paper.
///
/// Each added raster is stretched to fill one page, so rasters made at 2x
/// scale simply end up at 192 DPI.
pub struct PdfBuilder {
    title: String,
    page_w_mm: f32,
    page_h_mm: f32,
    doc: Option<PdfDocumentReference>,
    pages: usize,
}

impl PdfBuilder {
    /// `page_size` is in document pixels (e.g. 794x1123 for A4).
    pub fn new(title: impl Into<String>, page_size: (u32, u32)) -> Self {
        Self {
            title: title.into(),
            page_w_mm: px_to_mm(page_size.0),
            page_h_mm: px_to_mm(page_size.1),
            doc: None,
            pages: 0,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages
    }

    /// Page size in millimetres.
    pub fn page_size_mm(&self) -> (f32, f32) {
        (self.page_w_mm, self.page_h_mm)
    }

    /// Append one raster as a new page.
    pub fn add_page(&mut self, raster: &RgbaImage) -> Result<(), ReportCardError> {
        if raster.width() == 0 || raster.height() == 0 {
            return Err(ReportCardError::Export("empty page raster".into()));
        }
        let (w, h) = (Mm(self.page_w_mm), Mm(self.page_h_mm));
        let page_name = format!("Page {}", self.pages + 1);
        let layer = match &self.doc {
            None => {
                let (doc, page, layer) = PdfDocument::new(self.title.clone(), w, h, page_name);
                let layer = doc.get_page(page).get_layer(layer);
                self.doc = Some(doc);
                layer
            }
            Some(doc) => {
                let (page, layer) = doc.add_page(w, h, page_name);
                doc.get_page(page).get_layer(layer)
            }
        };

        let rgb = flatten_on_white(raster);
        let (width_px, height_px) = rgb.dimensions();
        let image = Image::from(ImageXObject {
            width: Px(width_px as usize),
            height: Px(height_px as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: rgb.into_raw(),
            image_filter: None,
            clipping_bbox: None,
            smask: None,
        });
        let dpi = width_px as f32 / (self.page_w_mm / MM_PER_INCH);
        image.add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(0.0)),
                translate_y: Some(Mm(0.0)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        self.pages += 1;
        Ok(())
    }

    /// Serialize the document. Fails if no page was added.
    pub fn finish(self) -> Result<Vec<u8>, ReportCardError> {
        let doc = self
            .doc
            .ok_or_else(|| ReportCardError::Export("document has no pages".into()))?;
        let mut writer = BufWriter::new(Vec::new());
        doc.save(&mut writer)
            .map_err(|e| ReportCardError::Export(format!("PDF write failed: {}", e)))?;
        writer
            .into_inner()
            .map_err(|e| ReportCardError::Export(format!("PDF flush failed: {}", e)))
    }
}

fn px_to_mm(px: u32) -> f32 {
    px as f32 * MM_PER_INCH / DOCUMENT_DPI
}

/// Composite RGBA over white; PDF image XObjects here carry no alpha.
fn flatten_on_white(raster: &RgbaImage) -> RgbImage {
    let mut rgb = RgbImage::new(raster.width(), raster.height());
    for (x, y, pixel) in raster.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = f32::from(a) / 255.0;
        let over = |c: u8| (f32::from(c) * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        rgb.put_pixel(x, y, Rgb([over(r), over(g), over(b)]));
    }
    rgb
}
