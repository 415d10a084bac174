//! Grade table: one row per subject.

use super::{DASH, TableBlock, TableRow, default_scale};
use crate::context::{AssessmentComponent, GradeBand, GradeRow, GradeTemplate, band_in};
use crate::document::{ElementData, GradeTableProps};
use crate::placeholder::format_number;

const SAMPLE_SUBJECTS: [&str; 8] = [
    "Mathematics",
    "English Language",
    "Basic Science",
    "Social Studies",
    "Civic Education",
    "Computer Studies",
    "Agricultural Science",
    "French",
];

const SAMPLE_TOTALS: [f64; 8] = [85.0, 72.0, 91.0, 64.0, 78.0, 58.0, 88.0, 69.0];

/// Components shown as columns, in grade-template order.
pub fn grade_columns<'a>(
    props: &GradeTableProps,
    grade_template: Option<&'a GradeTemplate>,
) -> Vec<&'a AssessmentComponent> {
    if !props.show_components {
        return Vec::new();
    }
    grade_template
        .map(|t| {
            t.components
                .iter()
                .filter(|c| props.component_visibility.get(&c.name) != Some(&false))
                .collect()
        })
        .unwrap_or_default()
}

/// Build the grade table from attached rows, or sample rows.
///
/// Either way the body holds at most `preview_rows` rows. Sample rows cycle
/// through a fixed subject list until that many exist.
pub fn grade_table(
    props: &GradeTableProps,
    data: Option<&ElementData>,
    grade_template: Option<&GradeTemplate>,
) -> TableBlock {
    let components = grade_columns(props, grade_template);
    let fallback_scale;
    let scale: &[GradeBand] = match grade_template {
        Some(t) if !t.scale.is_empty() => &t.scale,
        _ => {
            fallback_scale = default_scale();
            &fallback_scale
        }
    };

    let mut headers = vec!["Subject".to_string()];
    headers.extend(components.iter().map(|c| c.name.clone()));
    if props.show_total {
        headers.push("Total".into());
    }
    if props.show_grade {
        headers.push("Grade".into());
    }
    if props.show_remarks {
        headers.push("Remarks".into());
    }
    let mut block = TableBlock::new(headers, &props.table);

    let count = usize::from(props.preview_rows.clamp(1, 20));
    block.rows = match data {
        Some(ElementData::Grades { rows }) => rows
            .iter()
            .take(count)
            .map(|row| data_row(props, row, &components, scale))
            .collect(),
        _ => sample_rows(props, count, &components, scale),
    };
    block
}

fn data_row(
    props: &GradeTableProps,
    row: &GradeRow,
    components: &[&AssessmentComponent],
    scale: &[GradeBand],
) -> TableRow {
    let scores: Vec<Option<f64>> = components.iter().map(|c| row.component_score(c)).collect();
    let total = row.total.or_else(|| {
        let known: Vec<f64> = scores.iter().flatten().copied().collect();
        (!known.is_empty()).then(|| known.iter().sum())
    });
    let band = total.and_then(|t| band_in(scale, t));

    let mut cells = vec![row.subject.clone()];
    cells.extend(
        scores
            .iter()
            .map(|s| s.map(format_number).unwrap_or_else(|| DASH.into())),
    );
    push_summary(
        props,
        &mut cells,
        total.map(format_number),
        row.grade.clone().or_else(|| band.map(|b| b.grade.clone())),
        row.remark.clone().or_else(|| band.map(|b| b.remark.clone())),
    );
    TableRow::new(cells)
}

fn sample_rows(
    props: &GradeTableProps,
    count: usize,
    components: &[&AssessmentComponent],
    scale: &[GradeBand],
) -> Vec<TableRow> {
    (0..count)
        .map(|i| {
            let slot = i % SAMPLE_SUBJECTS.len();
            let total = SAMPLE_TOTALS[slot];
            let band = band_in(scale, total);
            let mut cells = vec![SAMPLE_SUBJECTS[slot].to_string()];
            cells.extend(split_total(total, components).into_iter().map(format_number));
            push_summary(
                props,
                &mut cells,
                Some(format_number(total)),
                band.map(|b| b.grade.clone()),
                band.map(|b| b.remark.clone()),
            );
            TableRow::new(cells)
        })
        .collect()
}

fn push_summary(
    props: &GradeTableProps,
    cells: &mut Vec<String>,
    total: Option<String>,
    grade: Option<String>,
    remark: Option<String>,
) {
    let or_dash = |v: Option<String>| v.unwrap_or_else(|| DASH.into());
    if props.show_total {
        cells.push(or_dash(total));
    }
    if props.show_grade {
        cells.push(or_dash(grade));
    }
    if props.show_remarks {
        cells.push(or_dash(remark));
    }
}

/// Split a total across components by weight; whole numbers summing to `total`.
///
/// Zero total weight splits evenly.
fn split_total(total: f64, components: &[&AssessmentComponent]) -> Vec<f64> {
    if components.is_empty() {
        return Vec::new();
    }
    let weight_sum: f64 = components.iter().map(|c| c.weight.max(0.0)).sum();
    let share = |c: &AssessmentComponent| {
        if weight_sum > 0.0 {
            c.weight.max(0.0) / weight_sum
        } else {
            1.0 / components.len() as f64
        }
    };

    let mut parts: Vec<f64> = components
        .iter()
        .map(|c| (total * share(c)).floor())
        .collect();
    let assigned: f64 = parts.iter().sum();
    if let Some(last) = parts.last_mut() {
        *last += total - assigned;
    }
    parts
}
