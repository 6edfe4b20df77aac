use crate::report::HeatmapPayload;

fn format_cell(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.6}"),
        None => "NA".to_string(),
    }
}

/// Ordered heatmap matrix as TSV: a header of group labels, then one line
/// per gene.
pub fn render_heatmap_tsv(payload: &HeatmapPayload) -> String {
    let mut out = String::from("gene");
    for col in &payload.col_labels {
        out.push('\t');
        out.push_str(col);
    }
    out.push('\n');
    for (label, row) in payload.row_labels.iter().zip(&payload.values) {
        out.push_str(label);
        for v in row {
            out.push('\t');
            out.push_str(&format_cell(*v));
        }
        out.push('\n');
    }
    out
}
