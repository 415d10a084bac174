//! Grading scale reference table.

use super::{TableBlock, TableRow};
use crate::context::{GradeBand, GradeTemplate};
use crate::document::GradingScaleProps;
use crate::placeholder::format_number;

/// The five-band scale used when no grade template is supplied.
pub fn default_scale() -> Vec<GradeBand> {
    [
        ("A+", 90.0, 100.0, "Outstanding"),
        ("A", 80.0, 89.0, "Excellent"),
        ("B", 70.0, 79.0, "Very Good"),
        ("C", 60.0, 69.0, "Good"),
        ("F", 0.0, 59.0, "Needs Improvement"),
    ]
    .into_iter()
    .map(|(grade, min_score, max_score, remark)| GradeBand {
        grade: grade.into(),
        min_score,
        max_score,
        remark: remark.into(),
    })
    .collect()
}

/// Build the grading scale table from the grade template's bands, or the default scale.
pub fn grading_scale_table(
    props: &GradingScaleProps,
    grade_template: Option<&GradeTemplate>,
) -> TableBlock {
    let bands = match grade_template {
        Some(t) if !t.scale.is_empty() => t.scale.clone(),
        _ => default_scale(),
    };

    let mut headers = vec!["Grade".to_string(), "Range".into()];
    if props.show_remarks {
        headers.push("Remark".into());
    }
    let mut block = TableBlock::new(headers, &props.table);
    block.rows = bands
        .into_iter()
        .map(|band| {
            let mut cells = vec![
                band.grade,
                format!(
                    "{}-{}",
                    format_number(band.min_score),
                    format_number(band.max_score)
                ),
            ];
            if props.show_remarks {
                cells.push(band.remark);
            }
            TableRow::new(cells)
        })
        .collect();
    block
}
