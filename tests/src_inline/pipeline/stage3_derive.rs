use super::*;
use crate::model::modality::Modality;
use crate::pipeline::fixtures::{self, CLUSTERING, EMBEDDING, gene};
use crate::pipeline::stage2_load::{LoadParams, load_rows};

fn load(modality: &str, ids: &[&str]) -> LoadedRows {
    let m: Modality = modality.parse().unwrap();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
    let genes: Vec<_> = ids.iter().map(|id| gene(id, id)).collect();
    let params = LoadParams {
        modality: &m,
        ensemble: "Ens1",
        clustering: CLUSTERING,
        embedding: EMBEDDING,
        smoothed: false,
    };
    load_rows(&fixtures::source(), &pool, &genes, &params).unwrap()
}

fn metric(table: &CellTable) -> Vec<Option<f64>> {
    table.number(METRIC).unwrap().to_vec()
}

fn close(a: Option<f64>, b: f64) -> bool {
    a.is_some_and(|a| (a - b).abs() < 1e-9)
}

#[test]
fn test_single_gene_ratio_and_normalized() {
    let loaded = load("mCH", &["G1.1"]);
    let original = metric(&derive_metric(&loaded, MetricKind::Ratio, Level::Original).unwrap());
    assert!(close(original[0], 0.1));
    assert!(close(original[3], 0.95));

    let normalized =
        metric(&derive_metric(&loaded, MetricKind::Ratio, Level::Normalized).unwrap());
    assert!(close(normalized[0], 0.2));
    assert!(close(normalized[2], 3.6));
}

#[test]
fn test_average_of_components_not_ratios() {
    let loaded = load("mCH", &["G2.1", "G3.1"]);
    let table = derive_metric(&loaded, MetricKind::Ratio, Level::Original).unwrap();
    let m = metric(&table);
    assert!(close(m[0], 6.5 / 8.5));
    assert!(!close(m[0], 0.75));
    assert_eq!(table.number("CH").unwrap()[0], Some(8.5));
    // c2 only has G2, c3 has neither
    assert!(close(m[1], 1.0));
    assert_eq!(m[2], None);
}

#[test]
fn test_duplicate_gene_matches_single_gene() {
    let single = derive_metric(&load("mCH", &["G1.1"]), MetricKind::Ratio, Level::Original).unwrap();
    let double =
        derive_metric(&load("mCH", &["G1.1", "G1.1"]), MetricKind::Ratio, Level::Original)
            .unwrap();
    assert_eq!(single, double);
}

#[test]
fn test_zero_denominator_is_missing_and_empty_denominator_is_no_data() {
    let loaded = load("mCH", &["G2.1"]);
    let m = metric(&derive_metric(&loaded, MetricKind::Ratio, Level::Original).unwrap());
    assert_eq!(m[3], None);

    let empty = load("mCH", &["G0.1"]);
    assert!(matches!(
        derive_metric(&empty, MetricKind::Ratio, Level::Original),
        Err(GmaeError::NoData(_))
    ));
}

#[test]
fn test_counts_fill_missing_with_zero() {
    let loaded = load("RNA", &["G1.1"]);
    let m = metric(&derive_metric(&loaded, MetricKind::Count, Level::Original).unwrap());
    assert_eq!(m, vec![Some(2.0), Some(4.0), Some(0.0), Some(6.0)]);
    assert!(matches!(
        compute_metric(&[None, None], None, None, MetricKind::Count, Level::Original),
        Err(GmaeError::NoData(_))
    ));
}

#[test]
fn test_per_gene_keeps_uncovered_gene_as_missing_row() {
    let loaded = load("mCH", &["G1.1", "G0.1"]);
    let (table, genes) = derive_per_gene(&loaded, MetricKind::Ratio, Level::Original).unwrap();
    assert_eq!(genes.len(), 2);
    assert!(close(table.number(&gene_metric_column(0)).unwrap()[1], 0.2));
    assert!(table.number(&gene_metric_column(1)).unwrap().iter().all(Option::is_none));
}

#[test]
fn test_trim_outliers_uses_metric_quantile() {
    let loaded = load("mCH", &["G1.1"]);
    let mut table = derive_metric(&loaded, MetricKind::Ratio, Level::Original).unwrap();
    trim_outliers(&mut table, 0.5);
    assert_eq!(table.cell_ids(), &["c1".to_string(), "c2".to_string()]);

    let mut sparse = CellTable::new(vec!["a".into(), "b".into(), "c".into()]);
    sparse.set_column(METRIC, Column::Number(vec![None, Some(1.0), Some(100.0)]));
    trim_outliers(&mut sparse, 0.99);
    assert_eq!(sparse.cell_ids(), &["a".to_string(), "b".to_string()]);
}
