use super::*;
use crate::model::grouping::GroupingScheme;
use crate::pipeline::fixtures::{self, CLUSTERING, EMBEDDING};
use crate::pipeline::stage5_color::MappedColor;

fn engine() -> Engine {
    let mut config = EngineConfig::default_v1();
    config.workers = 2;
    Engine::new(
        Box::new(fixtures::source()),
        Box::new(fixtures::catalog()),
        config,
    )
    .unwrap()
}

fn request(modality: &str) -> PlotRequest {
    let mut req = PlotRequest::new("Ens1", modality.parse().unwrap());
    req.clustering = CLUSTERING.to_string();
    req.embedding = EMBEDDING.to_string();
    req
}

fn tokens(t: &[&str]) -> Vec<String> {
    t.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_scatter_end_to_end() {
    let e = engine();
    let out = e.scatter(&tokens(&["gad1"]), &request("mCH")).unwrap();
    assert_eq!(out.cell_ids.len(), 4);
    assert_eq!(out.grouping, GroupingScheme::Cluster);
    assert_eq!(out.groups.iter().map(|g| g.label.as_str()).collect::<Vec<_>>(), vec!["1", "2", "10"]);
    assert!((out.color_scale.lower_bound - 0.115).abs() < 1e-12);
    assert!((out.color_scale.upper_bound - 0.9425).abs() < 1e-12);
    // c4 (0.95) is last after grouping by cluster 10
    let c4 = out.cell_ids.iter().position(|c| c == "c4").unwrap();
    assert_eq!(out.colors[c4], MappedColor::Value(out.color_scale.upper_bound));
    assert_eq!(out.coords.len(), 2);
    let (lo, hi) = out.axis_ranges[0].unwrap();
    assert!((lo + 0.3).abs() < 1e-9 && (hi - 3.3).abs() < 1e-9);
    assert_eq!(out.marker_size, 4);
    assert_eq!(
        out.hover[0],
        "Cell: c1<br>Annotation: mL4<br>Cluster: 1<br>Target Region: MOp\
         <br>Dataset: CEMBA_3C_171206<br>mCH/CH original: 0.100"
    );
    // c3 has no annotation
    let c3 = out.cell_ids.iter().position(|c| c == "c3").unwrap();
    assert!(!out.hover[c3].contains("Annotation"));
}

#[test]
fn test_scatter_is_cached() {
    let e = engine();
    let req = request("mCH");
    let a = e.scatter(&tokens(&["Gad1"]), &req).unwrap();
    let b = e.scatter(&tokens(&["GAD1"]), &req).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(e.cache().unwrap().entry_count(), 1);

    let mut other = req.clone();
    other.p_hi = 0.9;
    let c = e.scatter(&tokens(&["Gad1"]), &other).unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
}

#[test]
fn test_unknown_gene_and_no_data() {
    let e = engine();
    let err = e.scatter(&tokens(&["Gad1", "Nope"]), &request("mCH")).unwrap_err();
    assert!(matches!(err, GmaeError::NotFound(_)));
    assert_eq!(err.user_message(), "Not found: genes Nope");

    let err = e.scatter(&tokens(&["Nocov"]), &request("mCH")).unwrap_err();
    assert!(matches!(err, GmaeError::NoData(_)));
}

#[test]
fn test_invalid_identifier_rejects_request() {
    let e = engine();
    let mut req = request("mCH");
    req.ensemble = "Ens1;DROP".to_string();
    let err = e.scatter(&tokens(&["Gad1"]), &req).unwrap_err();
    assert!(matches!(err, GmaeError::InvalidIdentifier { .. }));
    assert_eq!(err.user_message(), crate::pipeline::USER_FAILURE_NOTICE);
}

#[test]
fn test_fallback_grouping_in_box_plot() {
    let e = engine();
    let mut req = request("mCH");
    req.grouping = GroupingScheme::Sex;
    let out = e.box_plot(&tokens(&["Gad1"]), &req).unwrap();
    assert_eq!(out.requested_grouping, GroupingScheme::Sex);
    assert_eq!(out.grouping, GroupingScheme::Cluster);
    assert_eq!(out.series.len(), 3);
    assert_eq!(out.series[1].values, vec![0.2, 0.9]);
    assert_eq!(out.series[0].boxpoints, "suspectedoutliers");
}

#[test]
fn test_outlier_trim_drops_top_cells() {
    let e = engine();
    let mut req = request("mCH");
    req.outliers = false;
    let table = e
        .load_and_derive(&[fixtures::gene("G1.1", "Gad1")], &req)
        .unwrap();
    assert_eq!(table.len(), 3);
    assert!(!table.cell_ids().contains(&"c4".to_string()));
}

#[test]
fn test_heatmap_orders_and_labels() {
    let e = engine();
    let mut req = request("mCH");
    req.normalize_rows = true;
    let out = e.heatmap(&tokens(&["Gad1", "Gad2", "Nocov"]), &req).unwrap();
    assert_eq!(out.row_labels.len(), 3);
    assert_eq!(out.col_labels.len(), 3);
    assert!(out.col_labels.iter().all(|c| c.starts_with("Cluster ")));
    assert!(out.ticks.len() >= 3);
    let nocov = out.row_labels.iter().position(|r| r == "Nocov").unwrap();
    assert!(out.values[nocov].iter().all(Option::is_none));
    for row in &out.values {
        for v in row.iter().flatten() {
            assert!((0.0..=1.0).contains(v));
        }
    }
    assert_eq!(out.ordering.rows.len(), 3);
}

#[test]
fn test_group_counts_and_percentages() {
    let e = engine();
    let mut req = request("mCH");
    req.grouping = GroupingScheme::TargetRegion;
    let counts = e.group_counts(&req, false).unwrap();
    assert_eq!(counts.total, 4);
    let groups: Vec<(&str, usize)> = counts.groups.iter().map(|g| (g.group.as_str(), g.cells)).collect();
    assert_eq!(groups, vec![("MOp", 1), ("SSp", 2), ("N/A", 1)]);

    let pct = e.group_counts(&req, true).unwrap();
    assert_eq!(pct.groups[1].value, 50.0);
    assert_eq!(pct.groups[1].text, "50% mCH cells");
}

#[test]
fn test_rna_counts_use_mean() {
    let e = engine();
    let out = e.box_plot(&tokens(&["Gad1"]), &request("RNA")).unwrap();
    assert_eq!(out.y_title, "RNA normalized counts");
    assert_eq!(out.series[1].values, vec![4.0, 0.0]);
}

#[test]
fn test_embedding_clip_and_metric_trim_are_independent() {
    let e = engine();
    let mut clip_only = request("mCH");
    clip_only.hide_embedding_outliers = true;
    let out = e.scatter(&tokens(&["Gad1"]), &clip_only).unwrap();
    assert_eq!(out.cell_ids.len(), 4);
    let (lo, hi) = out.axis_ranges[0].unwrap();
    assert!(lo > -0.3 && hi < 3.3);
    assert!((lo + 0.2964).abs() < 1e-9 && (hi - 3.2964).abs() < 1e-9);

    let mut trim_only = request("mCH");
    trim_only.outliers = false;
    let out = e.scatter(&tokens(&["Gad1"]), &trim_only).unwrap();
    assert_eq!(out.cell_ids.len(), 3);
    let (lo, hi) = out.axis_ranges[0].unwrap();
    assert!((lo + 0.2).abs() < 1e-9 && (hi - 2.2).abs() < 1e-9);
}

#[test]
fn test_cluster_order_follows_configured_linkage() {
    use crate::pipeline::stage7_order::{DistanceMetric, Linkage};

    let m = AggregateMatrix {
        row_labels: (0..5).map(|i| format!("g{i}")).collect(),
        col_labels: vec!["k0".to_string()],
        values: [0.0, 4.0, 1.5, 6.0, 2.6].iter().map(|v| vec![Some(*v)]).collect(),
    };
    assert_eq!(engine().cluster_order(&m).rows, vec![0, 2, 4, 1, 3]);

    let mut config = EngineConfig::default_v1();
    config.distance_metric = DistanceMetric::Manhattan;
    config.linkage = Linkage::Single;
    let single = Engine::new(
        Box::new(fixtures::source()),
        Box::new(fixtures::catalog()),
        config,
    )
    .unwrap();
    assert_eq!(single.cluster_order(&m).rows, vec![0, 1, 2, 4, 3]);
}
