//! Attendance table: period rows followed by a totals row.

use super::{TableBlock, TableRow};
use crate::context::AttendanceSummary;
use crate::document::{AttendanceTableProps, ElementData};

const SAMPLE_MONTHS: [(&str, AttendanceSummary); 3] = [
    (
        "September",
        AttendanceSummary {
            present: 20,
            absent: 2,
            late: 1,
            total_days: 22,
        },
    ),
    (
        "October",
        AttendanceSummary {
            present: 21,
            absent: 1,
            late: 0,
            total_days: 22,
        },
    ),
    (
        "November",
        AttendanceSummary {
            present: 17,
            absent: 1,
            late: 2,
            total_days: 18,
        },
    ),
];

/// Build the attendance table.
///
/// Attached data is aggregate-shaped and yields a single "Term" row; without
/// data three sample months are shown. Either way a totals row follows.
pub fn attendance_table(props: &AttendanceTableProps, data: Option<&ElementData>) -> TableBlock {
    let mut headers = vec!["Period".to_string(), "Present".into(), "Absent".into()];
    if props.show_late {
        headers.push("Late".into());
    }
    headers.push("Total".into());
    let mut block = TableBlock::new(headers, &props.table);

    let periods: Vec<(&str, AttendanceSummary)> = match data {
        Some(ElementData::Attendance(summary)) => vec![("Term", *summary)],
        _ => SAMPLE_MONTHS.to_vec(),
    };

    let mut totals = AttendanceSummary::default();
    for (label, summary) in &periods {
        totals.present += summary.present;
        totals.absent += summary.absent;
        totals.late += summary.late;
        totals.total_days += days(summary);
        block
            .rows
            .push(TableRow::new(cells(props, label, summary)));
    }
    block.rows.push(TableRow::total(cells(props, "Total", &totals)));
    block
}

/// Total days, falling back to present + absent when unset.
fn days(summary: &AttendanceSummary) -> u32 {
    if summary.total_days > 0 {
        summary.total_days
    } else {
        summary.present + summary.absent
    }
}

fn cells(props: &AttendanceTableProps, label: &str, summary: &AttendanceSummary) -> Vec<String> {
    let mut cells = vec![
        label.to_string(),
        summary.present.to_string(),
        summary.absent.to_string(),
    ];
    if props.show_late {
        cells.push(summary.late.to_string());
    }
    cells.push(days(summary).to_string());
    cells
}
