use super::*;
use crate::model::grouping::GroupingScheme;
use crate::model::table::{CellTable, Column};
use crate::pipeline::stage4_group::assign_groups;

fn grouped() -> GroupedTable {
    let mut t = CellTable::new((1..=5).map(|i| format!("c{i}")).collect());
    t.set_column(
        "cluster_k30",
        Column::Text(["1", "1", "1", "2", "2"].iter().map(|s| Some(s.to_string())).collect()),
    );
    t.set_column(
        "metric_0",
        Column::Number(vec![Some(0.1), Some(0.5), Some(0.3), Some(0.8), None]),
    );
    t.set_column(
        "metric_1",
        Column::Number(vec![Some(2.0), Some(2.0), Some(2.0), None, None]),
    );
    assign_groups(t, GroupingScheme::Cluster, "k30", &[]).unwrap()
}

fn rows() -> Vec<(String, String)> {
    vec![
        ("Gad1".to_string(), "metric_0".to_string()),
        ("Gad2".to_string(), "metric_1".to_string()),
    ]
}

#[test]
fn test_median_for_ratios_mean_for_counts() {
    let g = grouped();
    let m = aggregate(&g, &rows(), MetricKind::Ratio).unwrap();
    assert_eq!(m.col_labels, vec!["1", "2"]);
    assert_eq!(m.row_labels, vec!["Gad1", "Gad2"]);
    assert_eq!(m.values[0], vec![Some(0.3), Some(0.8)]);
    assert_eq!(m.values[1], vec![Some(2.0), None]);

    let counts = aggregate(&g, &rows(), MetricKind::Count).unwrap();
    assert!((counts.values[0][0].unwrap() - 0.3).abs() < 1e-12);
}

#[test]
fn test_zero_range_row_normalizes_to_zeros() {
    let g = grouped();
    let mut m = aggregate(&g, &rows(), MetricKind::Ratio).unwrap();
    m.values[1] = vec![Some(2.0), Some(2.0)];
    normalize_rows(&mut m);
    assert_eq!(m.values[1], vec![Some(0.0), Some(0.0)]);
    assert_eq!(m.values[0], vec![Some(0.0), Some(1.0)]);

    let mut sparse = AggregateMatrix {
        row_labels: vec!["a".into()],
        col_labels: vec!["x".into(), "y".into()],
        values: vec![vec![None, Some(3.0)]],
    };
    normalize_rows(&mut sparse);
    assert_eq!(sparse.values[0], vec![None, Some(0.0)]);
}

#[test]
fn test_empty_matrix_is_degenerate() {
    assert!(matches!(
        aggregate(&grouped(), &[], MetricKind::Ratio),
        Err(GmaeError::DegenerateInput(_))
    ));
}
