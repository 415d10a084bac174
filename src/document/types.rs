//! Element struct types for the template model.
//!
//! All types derive `Serialize + Deserialize` so the same types work for
//! both Rust API construction and the JSON the editor saves.
//!
//! Type-specific properties are a typed payload per element kind rather than
//! a loose string map, so an unknown property for a given kind is simply not
//! representable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::context::{AttendanceSummary, GradeRow};

use super::ElementKind;

pub(crate) fn default_true() -> bool {
    true
}

fn default_opacity() -> f32 {
    1.0
}

fn default_size() -> f32 {
    100.0
}

// ============================================================================
// STYLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    #[default]
    None,
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextTransform {
    #[default]
    None,
    Uppercase,
    Lowercase,
    Capitalize,
}

impl TextTransform {
    /// Apply the transform to display text.
    pub fn apply(self, text: &str) -> String {
        match self {
            TextTransform::None => text.to_string(),
            TextTransform::Uppercase => text.to_uppercase(),
            TextTransform::Lowercase => text.to_lowercase(),
            TextTransform::Capitalize => text
                .split(' ')
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars).collect(),
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Colour value meaning "draw nothing".
pub const TRANSPARENT: &str = "transparent";

/// Visual styling shared by every element kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementStyle {
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub color: String,
    /// Background fill, or `"transparent"`.
    pub background_color: String,
    pub border_width: f32,
    pub border_style: BorderStyle,
    pub border_color: String,
    pub text_align: TextAlign,
    pub vertical_align: VerticalAlign,
    pub text_transform: TextTransform,
    pub padding: f32,
    pub border_radius: f32,
    /// 0.0 = invisible, 1.0 = opaque.
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            font_family: "Arial".into(),
            font_size: 14.0,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            color: "#111827".into(),
            background_color: TRANSPARENT.into(),
            border_width: 0.0,
            border_style: BorderStyle::None,
            border_color: "#000000".into(),
            text_align: TextAlign::Left,
            vertical_align: VerticalAlign::Middle,
            text_transform: TextTransform::None,
            padding: 4.0,
            border_radius: 0.0,
            opacity: 1.0,
        }
    }
}

// ============================================================================
// TYPE-SPECIFIC PROPERTIES
// ============================================================================

/// Free-text elements carry no extra properties.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextProps {}

/// Signature block: label text with an optional rule above it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureProps {
    #[serde(default = "default_true")]
    pub show_line: bool,
}

impl Default for SignatureProps {
    fn default() -> Self {
        Self { show_line: true }
    }
}

/// Styling toggles shared by all table-like elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableStyle {
    /// Alternate row background.
    pub striped: bool,
    /// Reduced padding and font size.
    pub compact: bool,
    pub header_background: String,
    pub header_color: String,
    pub stripe_color: String,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            striped: true,
            compact: false,
            header_background: "#1e3a5f".into(),
            header_color: "#ffffff".into(),
            stripe_color: "#f3f4f6".into(),
        }
    }
}

fn default_preview_rows() -> u8 {
    4
}

/// Grade table: subject rows with optional per-component score columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeTableProps {
    #[serde(default)]
    pub table: TableStyle,
    /// Show one column per assessment component of the grade template.
    #[serde(default = "default_true")]
    pub show_components: bool,
    #[serde(default = "default_true")]
    pub show_total: bool,
    #[serde(default = "default_true")]
    pub show_grade: bool,
    #[serde(default = "default_true")]
    pub show_remarks: bool,
    /// Per-component visibility keyed by component name. Missing = visible.
    #[serde(default)]
    pub component_visibility: BTreeMap<String, bool>,
    /// Sample rows shown when no data is attached (1–20).
    #[serde(default = "default_preview_rows")]
    pub preview_rows: u8,
}

impl Default for GradeTableProps {
    fn default() -> Self {
        Self {
            table: TableStyle::default(),
            show_components: true,
            show_total: true,
            show_grade: true,
            show_remarks: true,
            component_visibility: BTreeMap::new(),
            preview_rows: default_preview_rows(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceTableProps {
    #[serde(default)]
    pub table: TableStyle,
    #[serde(default = "default_true")]
    pub show_late: bool,
}

impl Default for AttendanceTableProps {
    fn default() -> Self {
        Self {
            table: TableStyle::default(),
            show_late: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BehaviorTableProps {
    #[serde(default)]
    pub table: TableStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingScaleProps {
    #[serde(default)]
    pub table: TableStyle,
    #[serde(default = "default_true")]
    pub show_remarks: bool,
}

impl Default for GradingScaleProps {
    fn default() -> Self {
        Self {
            table: TableStyle::default(),
            show_remarks: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFit {
    /// Scale to fit inside the frame, preserving aspect ratio.
    #[default]
    Contain,
    /// Stretch to the frame.
    Fill,
}

/// Logo or generic image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageProps {
    /// Image URL. Logos fall back to the school's logo URL when unset.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub fit: ImageFit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineDirection {
    #[default]
    Horizontal,
    Vertical,
}

/// Rule line. Thickness and colour come from the border style fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineProps {
    #[serde(default)]
    pub direction: LineDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    #[default]
    Rectangle,
    Ellipse,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShapeProps {
    #[serde(default)]
    pub shape: ShapeKind,
}

// ============================================================================
// ATTACHED DATA
// ============================================================================

/// Concrete values rendered instead of samples (set by the bulk generator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementData {
    Grades { rows: Vec<GradeRow> },
    Attendance(AttendanceSummary),
}

// ============================================================================
// TEMPLATE ELEMENT
// ============================================================================

/// One positioned, styled visual unit on a template page.
///
/// Geometry is in unscaled document pixels.
///
/// ## Example (JSON)
///
/// ```json
/// {
///   "id": "el-1",
///   "type": "grade_table",
///   "show_remarks": false,
///   "x": 50, "y": 270, "width": 694, "height": 200,
///   "z_index": 3,
///   "style": {"font_size": 12}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateElement {
    pub id: String,
    #[serde(flatten)]
    pub kind: ElementKind,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default = "default_size")]
    pub width: f32,
    #[serde(default = "default_size")]
    pub height: f32,
    /// Degrees, clockwise.
    #[serde(default)]
    pub rotation: f32,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Locked elements cannot be dragged or deleted from the keyboard.
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub style: ElementStyle,
    /// Display text; may contain `[Placeholder]` tokens. Tables use it as a caption.
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ElementData>,
}

impl TemplateElement {
    /// Create an element of the given kind using its editor preset.
    pub fn new(kind: ElementKind) -> Self {
        let preset = super::presets::preset_for(&kind);
        Self {
            id: new_element_id(),
            kind,
            x: preset.x,
            y: preset.y,
            width: preset.width,
            height: preset.height,
            rotation: preset.rotation,
            z_index: 0,
            visible: true,
            locked: false,
            style: preset.style,
            content: preset.content,
            data: None,
        }
    }

    /// Whether the point (document pixels) falls inside the element's box.
    ///
    /// Rotation is ignored for hit testing.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// Fresh unique element id.
pub fn new_element_id() -> String {
    format!("el-{}", uuid::Uuid::new_v4())
}
