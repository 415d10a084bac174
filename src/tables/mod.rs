//! Table content for the structural element family.
//!
//! Each structural kind turns attached data, or deterministic sample data
//! when nothing is attached, into a [`TableBlock`]: headers plus body rows.
//! Styling toggles (striping, compact mode, header colours) travel with the
//! block so every table is drawn the same way.

mod attendance;
mod behavior;
mod grade;
mod scale;

pub use attendance::attendance_table;
pub use behavior::behavior_table;
pub use grade::{grade_columns, grade_table};
pub use scale::{default_scale, grading_scale_table};

use serde::Serialize;

use crate::context::RendererContext;
use crate::document::{ElementKind, TableStyle, TemplateElement};

/// Placeholder shown for a missing cell value.
pub const DASH: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowEmphasis {
    #[default]
    Normal,
    /// Summary row, drawn bold.
    Total,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub cells: Vec<String>,
    pub emphasis: RowEmphasis,
}

impl TableRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self {
            cells,
            emphasis: RowEmphasis::Normal,
        }
    }

    pub fn total(cells: Vec<String>) -> Self {
        Self {
            cells,
            emphasis: RowEmphasis::Total,
        }
    }

    /// Cells joined with single spaces.
    pub fn text(&self) -> String {
        self.cells.join(" ")
    }
}

/// A generated table, ready to lay out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableBlock {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
    pub style: TableStyle,
}

impl TableBlock {
    pub fn new(headers: Vec<String>, style: &TableStyle) -> Self {
        Self {
            headers,
            rows: Vec::new(),
            style: style.clone(),
        }
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Background for body row `index`, if striping applies.
    pub fn row_background(&self, index: usize) -> Option<&str> {
        (self.style.striped && index % 2 == 1).then_some(self.style.stripe_color.as_str())
    }

    /// Cell padding in document pixels.
    pub fn cell_padding(&self) -> f32 {
        if self.style.compact { 2.0 } else { 6.0 }
    }

    /// Multiplier applied to the inherited font size.
    pub fn font_scale(&self) -> f32 {
        if self.style.compact { 0.85 } else { 1.0 }
    }
}

/// Table for a structural element, `None` for every other kind.
pub fn table_for(element: &TemplateElement, ctx: Option<&RendererContext>) -> Option<TableBlock> {
    let grade_template = ctx.and_then(|c| c.grade_template.as_ref());
    match &element.kind {
        ElementKind::GradeTable(props) => {
            Some(grade_table(props, element.data.as_ref(), grade_template))
        }
        ElementKind::AttendanceTable(props) => Some(attendance_table(props, element.data.as_ref())),
        ElementKind::BehaviorTable(props) => Some(behavior_table(props)),
        ElementKind::GradingScale(props) => Some(grading_scale_table(props, grade_template)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::new_element;

    #[test]
    fn only_structural_kinds_produce_tables() {
        for ty in ["grade_table", "attendance_table", "behavior_table", "grading_scale"] {
            let el = new_element(ty).unwrap();
            assert!(table_for(&el, None).is_some(), "{}", ty);
        }
        for ty in ["school_name", "image", "line"] {
            let el = new_element(ty).unwrap();
            assert!(table_for(&el, None).is_none(), "{}", ty);
        }
    }

    #[test]
    fn striping_and_compact_mode() {
        let mut style = TableStyle::default();
        let block = TableBlock::new(vec!["A".into()], &style);
        assert_eq!(block.row_background(0), None);
        assert_eq!(block.row_background(1), Some("#f3f4f6"));
        assert_eq!(block.cell_padding(), 6.0);

        style.striped = false;
        style.compact = true;
        let block = TableBlock::new(vec!["A".into()], &style);
        assert_eq!(block.row_background(1), None);
        assert_eq!(block.cell_padding(), 2.0);
        assert!(block.font_scale() < 1.0);
    }
}
