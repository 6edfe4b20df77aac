use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::model::grouping::{GroupingScheme, MISSING_LABEL, slice_of_dataset};
use crate::model::table::{CellTable, Column};
use crate::pipeline::GmaeError;

/// Name of the materialized group label column.
pub const GROUP: &str = "group";

#[derive(Debug, Clone, PartialEq)]
pub struct GroupedTable {
    /// Rows sorted by group in display order, with a `group` column.
    pub table: CellTable,
    /// Distinct groups in display order.
    pub groups: Vec<String>,
    pub requested: GroupingScheme,
    pub scheme: GroupingScheme,
}

impl GroupedTable {
    pub fn fell_back(&self) -> bool {
        self.requested != self.scheme
    }

    pub fn labels(&self) -> &[Option<String>] {
        self.table.text(GROUP).unwrap_or_default()
    }
}

/// Raw labels for `scheme`, before missing values are filled. `None` when
/// the table lacks the source column.
fn raw_labels(table: &CellTable, scheme: GroupingScheme, clustering: &str) -> Option<Vec<Option<String>>> {
    let column = table.column(&scheme.source_column(clustering))?;
    let labels: Vec<Option<String>> = match column {
        Column::Text(v) => v.clone(),
        Column::Number(v) => v.iter().map(|x| x.map(|x| x.to_string())).collect(),
    };
    if scheme == GroupingScheme::Slice {
        return Some(
            labels
                .into_iter()
                .map(|d| d.and_then(|d| slice_of_dataset(&d)))
                .collect(),
        );
    }
    Some(labels)
}

fn distinct(labels: &[Option<String>]) -> usize {
    labels.iter().flatten().collect::<HashSet<_>>().len()
}

fn cluster_sort_key(label: &str) -> Option<f64> {
    label
        .strip_prefix("cluster_")
        .unwrap_or(label)
        .parse::<f64>()
        .ok()
}

/// Display order of the distinct labels. Annotations follow
/// `annotation_order`, unknown ones after it in order of first appearance.
/// Clusters sort numerically when every label is a number. Everything else
/// sorts lexically, with the missing label last.
pub fn order_groups(labels: &[String], scheme: GroupingScheme, annotation_order: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut groups: Vec<String> = labels
        .iter()
        .filter(|l| seen.insert(l.as_str()))
        .cloned()
        .collect();

    match scheme {
        GroupingScheme::Annotation => {
            let rank: HashMap<&str, usize> = annotation_order
                .iter()
                .enumerate()
                .map(|(i, l)| (l.as_str(), i))
                .collect();
            // stable: unknown labels keep first-appearance order
            groups.sort_by_key(|g| rank.get(g.as_str()).copied().unwrap_or(usize::MAX));
        }
        GroupingScheme::Cluster
            if groups
                .iter()
                .filter(|g| g.as_str() != MISSING_LABEL)
                .all(|g| cluster_sort_key(g).is_some()) =>
        {
            groups.sort_by(|a, b| match (cluster_sort_key(a), cluster_sort_key(b)) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (None, None) => Ordering::Equal,
            });
        }
        _ => {
            let missing = [MISSING_LABEL, scheme.missing_label()];
            groups.sort_by(|a, b| {
                let am = missing.contains(&a.as_str());
                let bm = missing.contains(&b.as_str());
                am.cmp(&bm).then_with(|| a.cmp(b))
            });
        }
    }
    groups
}

/// Tags every cell with a group label for `requested`, falling back to the
/// cluster grouping of `clustering` when the requested column is absent or
/// has at most one distinct value. Rows come back sorted by group.
pub fn assign_groups(
    mut table: CellTable,
    requested: GroupingScheme,
    clustering: &str,
    annotation_order: &[String],
) -> Result<GroupedTable, GmaeError> {
    if table.is_empty() {
        return Err(GmaeError::DegenerateInput("no cells to group".to_string()));
    }

    let mut scheme = requested;
    let mut raw = raw_labels(&table, requested, clustering).filter(|l| distinct(l) > 1);
    if raw.is_none() && requested != GroupingScheme::Cluster {
        warn!(
            "grouping {requested} is absent or single-valued; falling back to cluster_{clustering}"
        );
        scheme = GroupingScheme::Cluster;
    }
    if raw.is_none() {
        raw = raw_labels(&table, GroupingScheme::Cluster, clustering);
    }
    let Some(raw) = raw else {
        return Err(GmaeError::DegenerateInput(format!(
            "no cluster labels for clustering {clustering}"
        )));
    };

    let fill = scheme.missing_label();
    let labels: Vec<String> = raw
        .into_iter()
        .map(|l| l.unwrap_or_else(|| fill.to_string()))
        .collect();
    let groups = order_groups(&labels, scheme, annotation_order);

    let rank: HashMap<&str, usize> = groups.iter().enumerate().map(|(i, g)| (g.as_str(), i)).collect();
    let mut rows: Vec<usize> = (0..labels.len()).collect();
    rows.sort_by_key(|&r| rank.get(labels[r].as_str()).copied().unwrap_or(usize::MAX));

    table.set_column(GROUP, Column::Text(labels.into_iter().map(Some).collect()));
    table.select_rows(&rows);
    info!("grouped {} cells into {} {scheme} groups", table.len(), groups.len());

    Ok(GroupedTable {
        table,
        groups,
        requested,
        scheme,
    })
}

/// Cells per group in display order.
pub fn group_counts(grouped: &GroupedTable) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in grouped.labels().iter().flatten() {
        *counts.entry(label.as_str()).or_default() += 1;
    }
    grouped
        .groups
        .iter()
        .map(|g| (g.clone(), counts.get(g.as_str()).copied().unwrap_or(0)))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_group.rs"]
mod tests;
