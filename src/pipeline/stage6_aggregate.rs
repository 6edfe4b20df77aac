use std::collections::HashMap;

use serde::Serialize;

use crate::model::modality::MetricKind;
use crate::pipeline::GmaeError;
use crate::pipeline::stage4_group::GroupedTable;
use crate::stats;

/// Genes × groups summary matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateMatrix {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl AggregateMatrix {
    pub fn n_rows(&self) -> usize {
        self.values.len()
    }

    pub fn n_cols(&self) -> usize {
        self.col_labels.len()
    }

    pub fn present_values(&self) -> Vec<Option<f64>> {
        self.values.iter().flatten().copied().collect()
    }
}

pub fn summarize(values: &[f64], kind: MetricKind) -> Option<f64> {
    match kind {
        MetricKind::Ratio => stats::median(values),
        MetricKind::Count => stats::mean(values),
    }
}

/// One summary per group of `grouped`, in group display order.
pub fn summarize_groups(grouped: &GroupedTable, column: &str, kind: MetricKind) -> Vec<Option<f64>> {
    let mut buckets: HashMap<&str, Vec<f64>> = HashMap::new();
    if let Some(values) = grouped.table.number(column) {
        for (label, value) in grouped.labels().iter().zip(values) {
            if let (Some(label), Some(v)) = (label, value) {
                buckets.entry(label.as_str()).or_default().push(*v);
            }
        }
    }
    grouped
        .groups
        .iter()
        .map(|g| {
            buckets
                .get(g.as_str())
                .and_then(|vals| summarize(vals, kind))
        })
        .collect()
}

/// Reduces each `(row label, metric column)` of `grouped` to one value per
/// group: the median for ratios, the mean for counts.
pub fn aggregate(
    grouped: &GroupedTable,
    rows: &[(String, String)],
    kind: MetricKind,
) -> Result<AggregateMatrix, GmaeError> {
    if rows.is_empty() || grouped.groups.is_empty() {
        return Err(GmaeError::DegenerateInput(
            "aggregated matrix would be empty".to_string(),
        ));
    }
    let values = rows
        .iter()
        .map(|(_, column)| summarize_groups(grouped, column, kind))
        .collect();
    Ok(AggregateMatrix {
        row_labels: rows.iter().map(|(label, _)| label.clone()).collect(),
        col_labels: grouped.groups.clone(),
        values,
    })
}

/// Per-row min-max rescaling to [0, 1]. A zero-range row becomes all zeros;
/// missing cells stay missing.
pub fn normalize_rows(matrix: &mut AggregateMatrix) {
    for row in &mut matrix.values {
        let present: Vec<f64> = row.iter().flatten().copied().collect();
        let Some((min, max)) = stats::min_max(&present) else {
            continue;
        };
        let range = if max - min == 0.0 { 1.0 } else { max - min };
        for v in row.iter_mut().flatten() {
            *v = (*v - min) / range;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage6_aggregate.rs"]
mod tests;
