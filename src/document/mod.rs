//! # Template Document Model
//!
//! A single type hierarchy that is both the Rust API and the JSON the editor
//! saves. A [`Template`] is a flat list of absolutely positioned
//! [`TemplateElement`]s plus page settings.
//!
//! ```ignore
//! use reportcard::document::*;
//!
//! let mut template = Template::new("Term 1");
//! let id = template.add_element("school_name")?.id.clone();
//! template.duplicate_element(&id)?;
//!
//! let template: Template = serde_json::from_str(
//!     r#"{"name": "T", "elements": [{"id": "a", "type": "student_name", "content": "[Student Name]"}]}"#,
//! )?;
//! ```

pub mod types;

mod editing;
pub mod presets;

pub use presets::grade_table_height;
pub use types::*;

use serde::{Deserialize, Serialize};

// ============================================================================
// PAGE SETTINGS
// ============================================================================

/// Supported paper sizes, in document pixels at 96 DPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperSize {
    #[default]
    A4,
    Letter,
    Legal,
}

impl PaperSize {
    /// Portrait (width, height) in pixels.
    pub fn portrait_px(self) -> (u32, u32) {
        match self {
            PaperSize::A4 => (794, 1123),
            PaperSize::Letter => (816, 1056),
            PaperSize::Legal => (816, 1344),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

fn default_background() -> String {
    "#ffffff".into()
}

/// A report card template: elements plus page settings.
///
/// `id` is assigned by the template store on first save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub paper: PaperSize,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default = "default_background")]
    pub background_color: String,
    /// Used by bulk generation when no template is chosen explicitly.
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub elements: Vec<TemplateElement>,
}

impl Template {
    /// Create an empty, unsaved portrait A4 template.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            paper: PaperSize::A4,
            orientation: Orientation::Portrait,
            background_color: default_background(),
            is_default: false,
            elements: Vec::new(),
        }
    }

    /// Page (width, height) in pixels after applying orientation.
    pub fn page_size(&self) -> (u32, u32) {
        let (w, h) = self.paper.portrait_px();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    pub fn element(&self, id: &str) -> Option<&TemplateElement> {
        self.elements.iter().find(|el| el.id == id)
    }

    pub fn element_mut(&mut self, id: &str) -> Option<&mut TemplateElement> {
        self.elements.iter_mut().find(|el| el.id == id)
    }

    /// Copy this template as a new unsaved template with fresh element ids.
    pub fn clone_as(&self, name: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.id = None;
        copy.name = name.into();
        copy.is_default = false;
        for el in &mut copy.elements {
            el.id = new_element_id();
        }
        copy
    }
}

// ============================================================================
// ELEMENT KINDS
// ============================================================================

/// Broad grouping of element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementFamily {
    /// Text with placeholder substitution.
    Text,
    /// Tables generated from data or samples.
    Structural,
    Media,
    Decorative,
}

/// Define the ElementKind enum and all dispatch methods from a single list.
///
/// Adding a new element kind: add one line here, give it a preset in
/// `presets.rs`, and the compiler points at the remaining exhaustive matches.
macro_rules! define_elements {
    ($($variant:ident($inner:ty) = $type_name:literal, $label:literal, $family:ident;)+) => {
        /// The closed set of element kinds, each with its typed properties.
        ///
        /// `#[serde(tag = "type")]` enables JSON like
        /// `{"type": "grade_table", "show_total": false}`.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "type", rename_all = "snake_case")]
        pub enum ElementKind {
            $($variant($inner),)+
        }

        impl ElementKind {
            /// Serde type tag (e.g. `"school_name"`).
            pub fn type_name(&self) -> &'static str {
                match self { $(ElementKind::$variant(_) => $type_name,)+ }
            }

            /// Human-readable display label.
            pub fn label(&self) -> &'static str {
                match self { $(ElementKind::$variant(_) => $label,)+ }
            }

            pub fn family(&self) -> ElementFamily {
                match self { $(ElementKind::$variant(_) => ElementFamily::$family,)+ }
            }

            /// Every kind with default properties, in palette order.
            pub fn all_defaults() -> Vec<Self> {
                vec![$(ElementKind::$variant(<$inner>::default()),)+]
            }
        }
    };
}

define_elements! {
    SchoolName(TextProps) = "school_name", "School Name", Text;
    SchoolAddress(TextProps) = "school_address", "School Address", Text;
    SchoolMotto(TextProps) = "school_motto", "School Motto", Text;
    StudentName(TextProps) = "student_name", "Student Name", Text;
    ClassName(TextProps) = "class_name", "Class Name", Text;
    RollNumber(TextProps) = "roll_number", "Roll Number", Text;
    AcademicYear(TextProps) = "academic_year", "Academic Year", Text;
    Term(TextProps) = "term", "Term", Text;
    TotalMarks(TextProps) = "total_marks", "Total Marks", Text;
    Percentage(TextProps) = "percentage", "Percentage", Text;
    Position(TextProps) = "position", "Position", Text;
    Result(TextProps) = "result", "Result", Text;
    AttendanceSummary(TextProps) = "attendance_summary", "Attendance Summary", Text;
    NextTermDate(TextProps) = "next_term_date", "Next Term Date", Text;
    Signature(SignatureProps) = "signature", "Signature", Text;
    Watermark(TextProps) = "watermark", "Watermark", Text;
    Text(TextProps) = "text", "Text", Text;
    GradeTable(GradeTableProps) = "grade_table", "Grade Table", Structural;
    AttendanceTable(AttendanceTableProps) = "attendance_table", "Attendance Table", Structural;
    BehaviorTable(BehaviorTableProps) = "behavior_table", "Behavior Table", Structural;
    GradingScale(GradingScaleProps) = "grading_scale", "Grading Scale", Structural;
    SchoolLogo(ImageProps) = "school_logo", "School Logo", Media;
    Image(ImageProps) = "image", "Image", Media;
    Line(LineProps) = "line", "Line", Decorative;
    Shape(ShapeProps) = "shape", "Shape", Decorative;
}

impl ElementKind {
    /// Default kind for a serde type name. `None` for unknown names.
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        Self::all_defaults()
            .into_iter()
            .find(|kind| kind.type_name() == type_name)
    }
}

/// Element kind metadata for editor palettes.
#[derive(Debug, Clone, Serialize)]
pub struct ElementTypeMeta {
    #[serde(rename = "type")]
    pub type_name: &'static str,
    pub label: &'static str,
    pub family: ElementFamily,
}

/// Palette metadata for every element kind.
pub fn element_types() -> Vec<ElementTypeMeta> {
    ElementKind::all_defaults()
        .iter()
        .map(|kind| ElementTypeMeta {
            type_name: kind.type_name(),
            label: kind.label(),
            family: kind.family(),
        })
        .collect()
}

/// Create an element with editor defaults by type name.
pub fn new_element(type_name: &str) -> Option<TemplateElement> {
    ElementKind::from_type_name(type_name).map(TemplateElement::new)
}
