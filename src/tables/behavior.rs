//! Behavior table. Sample traits only; there is no live-data source yet.

use super::{TableBlock, TableRow};
use crate::document::BehaviorTableProps;

const SAMPLE_TRAITS: [(&str, &str, &str); 3] = [
    ("Responsibility", "A", "Excellent"),
    ("Respect", "B", "Very Good"),
    ("Participation", "A", "Excellent"),
];

pub fn behavior_table(props: &BehaviorTableProps) -> TableBlock {
    let mut block = TableBlock::new(
        vec!["Trait".into(), "Rating".into(), "Remark".into()],
        &props.table,
    );
    block.rows = SAMPLE_TRAITS
        .iter()
        .map(|(name, rating, remark)| {
            TableRow::new(vec![name.to_string(), rating.to_string(), remark.to_string()])
        })
        .collect();
    block
}
