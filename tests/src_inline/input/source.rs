use super::*;
use crate::model::modality::Modality;

fn rowset(columns: &[&str], rows: &[&[&str]]) -> RowSet {
    let mut out = RowSet::new(columns.iter().map(|s| s.to_string()).collect());
    for row in rows {
        out.push_row(row.iter().map(|v| (!v.is_empty()).then_some(*v)));
    }
    out
}

fn key(scope_gene: &str) -> TableKey {
    let m: Modality = "mCH".parse().unwrap();
    TableKey::new(&m, "Ens1", scope_gene, "k30", "e_ndim2", false).unwrap()
}

fn cells() -> RowSet {
    rowset(
        &["cell_id", "dataset", "cluster_k30", "tsne_x_e_ndim2", "tsne_y_e_ndim2", "global_mCH"],
        &[
            &["c1", "CEMBA_3C_1", "1", "0.5", "1.5", "0.02"],
            &["c2", "CEMBA_3C_1", "2", "1.0", "2.0", "0.03"],
            &["c3", "CEMBA_4B_1", "2", "2.0", "0.0", "0.01"],
        ],
    )
}

#[test]
fn test_left_join_keeps_cohort_order_and_missing_cells() {
    let gene = rowset(&["cell_id", "mCH", "CH"], &[&["c3", "1", "4"], &["c1", "2", "8"]]);
    let k = key("G1");
    let out = join_cells(&cells(), &gene, &k.columns(ColumnScope::Full)).unwrap();
    let id = out.column_index("cell_id").unwrap();
    let mch = out.column_index("mCH").unwrap();
    assert_eq!(out.len(), 3);
    assert_eq!(out.get(0, id), Some("c1"));
    assert_eq!(out.get(0, mch), Some("2"));
    assert_eq!(out.get(1, mch), None);
    assert_eq!(out.get(2, mch), Some("1"));
    assert!(out.column_index("sex").is_none());
    assert!(out.column_index("annotation_k30").is_none());
}

#[test]
fn test_measurement_scope_omits_metadata() {
    let gene = rowset(&["cell_id", "mCH", "CH"], &[&["c1", "2", "8"]]);
    let out = join_cells(&cells(), &gene, &key("G1").columns(ColumnScope::MeasurementOnly)).unwrap();
    assert_eq!(out.columns, vec!["cell_id", "mCH", "CH"]);
}

#[test]
fn test_memory_source_not_found() {
    let mut src = MemoryRowSource::new();
    src.insert_cohort("methylation", "Ens1", cells());
    assert!(src.fetch(&key("G1"), ColumnScope::Full).unwrap().is_none());
    src.insert_gene(
        "methylation",
        "gene_G1_2",
        rowset(&["cell_id", "mCH", "CH"], &[&["c1", "2", "8"]]),
    );
    let rows = src.fetch(&key("G1.2"), ColumnScope::Full).unwrap().unwrap();
    assert_eq!(rows.len(), 3);
}

#[test]
fn test_tsv_source_reads_directory_store() {
    let dir = tempfile::tempdir().unwrap();
    let ens = dir.path().join("methylation").join("Ens1");
    let genes = dir.path().join("methylation").join("genes");
    std::fs::create_dir_all(&ens).unwrap();
    std::fs::create_dir_all(&genes).unwrap();
    std::fs::write(ens.join("cells.tsv"), "cell_id\tcluster_k30\nc1\t1\nc2\t2\n").unwrap();
    std::fs::write(genes.join("gene_G1.tsv"), "cell_id\tmCH\tCH\nc2\t3\t6\n").unwrap();

    let src = TsvRowSource::new(dir.path());
    let rows = src.fetch(&key("G1"), ColumnScope::Full).unwrap().unwrap();
    let ch = rows.column_index("CH").unwrap();
    assert_eq!(rows.get(0, ch), None);
    assert_eq!(rows.get(1, ch), Some("6"));
    assert!(src.fetch(&key("G2"), ColumnScope::Full).unwrap().is_none());
}
