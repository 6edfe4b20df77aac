use super::*;

fn sample() -> CellTable {
    let mut t = CellTable::new(vec!["c1".into(), "c2".into(), "c3".into()]);
    assert!(t.set_column("x", Column::Number(vec![Some(1.0), None, Some(3.0)])));
    assert!(t.set_column(
        "label",
        Column::Text(vec![Some("a".into()), Some("b".into()), None])
    ));
    t
}

#[test]
fn test_set_column_rejects_wrong_length() {
    let mut t = sample();
    assert!(!t.set_column("y", Column::Number(vec![Some(1.0)])));
    assert!(!t.has_column("y"));
    assert!(t.set_column("x", Column::Number(vec![None, None, None])));
    assert_eq!(t.number("x").unwrap(), &[None, None, None]);
    assert!(t.text("x").is_none());
}

#[test]
fn test_select_and_retain_rows_keep_columns_aligned() {
    let mut t = sample();
    t.select_rows(&[2, 0]);
    assert_eq!(t.cell_ids(), &["c3".to_string(), "c1".to_string()]);
    assert_eq!(t.number("x").unwrap(), &[Some(3.0), Some(1.0)]);
    assert_eq!(t.text("label").unwrap(), &[None, Some("a".to_string())]);

    t.retain_rows(&[false, true]);
    assert_eq!(t.len(), 1);
    assert_eq!(t.row_index().get("c1"), Some(&0));
}
