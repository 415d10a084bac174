//! # Rendering
//!
//! Pure mapping from a template element (plus mode flags and an optional
//! [`RendererContext`]) to a positioned [`RenderedBlock`]. The same blocks
//! feed the interactive editor and the rasterizer used for export, so what
//! the editor shows in preview mode is what gets printed.
//!
//! ```ignore
//! use reportcard::render::{ImageStates, PageView};
//!
//! let page = template.render_page(Some(&ctx), PageView::preview(), &ImageStates::new());
//! for block in &page.blocks {
//!     println!("{} at ({}, {})", block.type_name, block.x, block.y);
//! }
//! ```

mod images;

pub use images::ImageStates;

use serde::Serialize;

use crate::context::RendererContext;
use crate::document::{
    BorderStyle, ElementFamily, ElementKind, ElementStyle, ImageFit, LineDirection, ShapeKind,
    Template, TemplateElement,
};
use crate::placeholder::substitute;
use crate::tables::{TableBlock, table_for};

/// Per-element mode flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderMode {
    /// Print/export view: no outline, no drag handles, no inline editor.
    pub preview: bool,
    pub selected: bool,
    /// Show the inline text editor instead of the display text.
    pub editing: bool,
}

impl RenderMode {
    pub fn preview() -> Self {
        Self {
            preview: true,
            ..Default::default()
        }
    }

    /// Flags after preview overrides.
    pub fn effective(self) -> Self {
        if self.preview {
            Self::preview()
        } else {
            self
        }
    }
}

/// Page-level view: which element (if any) is selected and being edited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageView<'a> {
    pub preview: bool,
    pub selection: Option<&'a str>,
    pub editing: bool,
}

impl<'a> PageView<'a> {
    pub fn preview() -> Self {
        Self {
            preview: true,
            selection: None,
            editing: false,
        }
    }

    pub fn mode_for(&self, element_id: &str) -> RenderMode {
        let selected = self.selection == Some(element_id);
        RenderMode {
            preview: self.preview,
            selected,
            editing: selected && self.editing,
        }
        .effective()
    }
}

/// Font baseline a table inherits from its element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableFont {
    pub family: String,
    pub size: f32,
    pub color: String,
}

/// Where an image block gets its pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ImageSource {
    Url { url: String },
    /// No URL, or the current URL failed to load.
    Placeholder,
}

/// Content of a rendered block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "body", rename_all = "snake_case")]
pub enum BlockBody {
    Text {
        text: String,
        /// Signature rule drawn above the text.
        rule_above: bool,
    },
    /// Inline editor bound to the element's raw content.
    Editor { element_id: String, raw: String },
    Table {
        caption: String,
        table: TableBlock,
        font: TableFont,
    },
    Image { source: ImageSource, fit: ImageFit },
    Line {
        direction: LineDirection,
        thickness: f32,
        color: String,
        border_style: BorderStyle,
    },
    Shape { shape: ShapeKind },
}

/// A positioned visual block, in unscaled document pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedBlock {
    pub element_id: String,
    pub type_name: &'static str,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Degrees, clockwise, applied to the whole box.
    pub rotation: f32,
    /// Alpha applied to the whole box, in 0..=1.
    pub opacity: f32,
    pub z_index: i32,
    pub style: ElementStyle,
    /// Draw a selection outline.
    pub outlined: bool,
    pub draggable: bool,
    pub body: BlockBody,
}

/// A whole page of blocks in draw order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedPage {
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub blocks: Vec<RenderedBlock>,
}

impl RenderedPage {
    /// All display text on the page (text bodies and table cells), in draw order.
    pub fn text_content(&self) -> Vec<String> {
        let mut out = Vec::new();
        for block in &self.blocks {
            match &block.body {
                BlockBody::Text { text, .. } => out.push(text.clone()),
                BlockBody::Editor { raw, .. } => out.push(raw.clone()),
                BlockBody::Table { caption, table, .. } => {
                    if !caption.is_empty() {
                        out.push(caption.clone());
                    }
                    out.extend(table.headers.iter().cloned());
                    out.extend(table.rows.iter().map(|r| r.text()));
                }
                _ => {}
            }
        }
        out
    }
}

/// Render one element.
pub fn render_element(
    element: &TemplateElement,
    mode: RenderMode,
    ctx: Option<&RendererContext>,
    images: &ImageStates,
) -> RenderedBlock {
    let mode = mode.effective();
    let opacity = if element.style.opacity.is_nan() {
        1.0
    } else {
        element.style.opacity.clamp(0.0, 1.0)
    };

    RenderedBlock {
        element_id: element.id.clone(),
        type_name: element.kind.type_name(),
        x: element.x,
        y: element.y,
        width: element.width,
        height: element.height,
        rotation: element.rotation,
        opacity,
        z_index: element.z_index,
        style: element.style.clone(),
        outlined: mode.selected,
        draggable: !mode.preview && !element.locked,
        body: render_body(element, mode, ctx, images),
    }
}

fn render_body(
    element: &TemplateElement,
    mode: RenderMode,
    ctx: Option<&RendererContext>,
    images: &ImageStates,
) -> BlockBody {
    if element.kind.family() == ElementFamily::Text {
        if mode.editing {
            return BlockBody::Editor {
                element_id: element.id.clone(),
                raw: element.content.clone(),
            };
        }
        let text = element
            .style
            .text_transform
            .apply(&substitute(&element.content, ctx));
        let rule_above = matches!(&element.kind, ElementKind::Signature(p) if p.show_line);
        return BlockBody::Text { text, rule_above };
    }

    if let Some(table) = table_for(element, ctx) {
        return BlockBody::Table {
            caption: element.content.clone(),
            table,
            font: TableFont {
                family: element.style.font_family.clone(),
                size: element.style.font_size,
                color: element.style.color.clone(),
            },
        };
    }

    match &element.kind {
        ElementKind::SchoolLogo(props) | ElementKind::Image(props) => {
            let is_logo = matches!(element.kind, ElementKind::SchoolLogo(_));
            let url = props
                .url
                .clone()
                .filter(|u| !u.trim().is_empty())
                .or_else(|| {
                    ctx.filter(|_| is_logo)
                        .and_then(|c| c.school.logo_url.clone())
                        .filter(|u| !u.trim().is_empty())
                });
            let source = match url {
                Some(url) if !images.is_failed(&element.id, &url) => ImageSource::Url { url },
                _ => ImageSource::Placeholder,
            };
            BlockBody::Image {
                source,
                fit: props.fit,
            }
        }
        ElementKind::Line(props) => BlockBody::Line {
            direction: props.direction,
            thickness: element.style.border_width.max(1.0),
            color: element.style.border_color.clone(),
            border_style: element.style.border_style,
        },
        ElementKind::Shape(props) => BlockBody::Shape { shape: props.shape },
        // text and table kinds handled above
        _ => BlockBody::Text {
            text: element.content.clone(),
            rule_above: false,
        },
    }
}

/// Image URL an element will display, if any.
pub fn image_url(element: &TemplateElement, ctx: Option<&RendererContext>) -> Option<String> {
    match render_body(element, RenderMode::preview(), ctx, &ImageStates::default()) {
        BlockBody::Image {
            source: ImageSource::Url { url },
            ..
        } => Some(url),
        _ => None,
    }
}

impl Template {
    /// Render all visible elements in draw order.
    pub fn render_page(
        &self,
        ctx: Option<&RendererContext>,
        view: PageView<'_>,
        images: &ImageStates,
    ) -> RenderedPage {
        let (width, height) = self.page_size();
        let blocks = self
            .draw_order()
            .into_iter()
            .map(|el| render_element(el, view.mode_for(&el.id), ctx, images))
            .collect();
        RenderedPage {
            width,
            height,
            background: self.background_color.clone(),
            blocks,
        }
    }
}
