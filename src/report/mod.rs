pub mod json;
pub mod text;

use serde::Serialize;

use crate::model::gene::GeneRecord;
use crate::model::grouping::GroupingScheme;
use crate::model::modality::Level;
use crate::pipeline::stage5_color::{ColorScale, MappedColor, Tick};
use crate::pipeline::stage7_order::ClusterOrdering;
use crate::stats;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTrace {
    pub label: String,
    pub color: String,
    /// Row indices into the payload's per-cell arrays.
    pub cells: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPayload {
    pub genes: Vec<GeneRecord>,
    pub modality: String,
    pub level: Level,
    pub requested_grouping: GroupingScheme,
    pub grouping: GroupingScheme,
    pub cell_ids: Vec<String>,
    /// One vector per embedding axis.
    pub coords: Vec<Vec<Option<f64>>>,
    pub axis_ranges: Vec<Option<(f64, f64)>>,
    pub marker_size: u32,
    pub values: Vec<Option<f64>>,
    pub colors: Vec<MappedColor>,
    pub color_scale: ColorScale,
    pub ticks: Vec<Tick>,
    pub hover: Vec<String>,
    pub groups: Vec<GroupTrace>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSeries {
    pub group: String,
    pub color: String,
    pub values: Vec<f64>,
    pub boxpoints: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxPayload {
    pub genes: Vec<GeneRecord>,
    pub modality: String,
    pub level: Level,
    pub requested_grouping: GroupingScheme,
    pub grouping: GroupingScheme,
    pub y_title: String,
    pub series: Vec<BoxSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapPayload {
    pub genes: Vec<GeneRecord>,
    pub modality: String,
    pub requested_grouping: GroupingScheme,
    pub grouping: GroupingScheme,
    pub normalized_rows: bool,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
    pub ordering: ClusterOrdering,
    pub color_scale: ColorScale,
    pub ticks: Vec<Tick>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    pub group: String,
    pub cells: usize,
    /// `cells`, or its share of the cohort in percent.
    pub value: f64,
    pub color: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountsPayload {
    pub modality: String,
    pub requested_grouping: GroupingScheme,
    pub grouping: GroupingScheme,
    pub percentages: bool,
    pub total: usize,
    pub y_title: String,
    pub groups: Vec<GroupCount>,
}

fn hls_to_rgb(h: f64, l: f64, s: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (l, l, l);
    }
    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    let channel = |hue: f64| {
        let hue = hue.rem_euclid(1.0);
        if hue < 1.0 / 6.0 {
            m1 + (m2 - m1) * hue * 6.0
        } else if hue < 0.5 {
            m2
        } else if hue < 2.0 / 3.0 {
            m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
        } else {
            m1
        }
    };
    (channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
}

/// `n` colours spread over the hue circle at 50% lightness and saturation.
/// Large palettes use a wider hue stride so neighbours differ more; the list
/// is doubled so indices past `n` still resolve.
pub fn group_palette(n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    let stride = if n > 18 { 1.8 } else { 1.3 };
    let colors: Vec<String> = (0..n)
        .map(|i| {
            let deg = if n == 1 {
                0.0
            } else {
                360.0 * i as f64 / (n - 1) as f64
            };
            let (r, g, b) = hls_to_rgb(deg * stride / 360.0, 0.5, 0.5);
            format!(
                "rgb({},{},{})",
                (r * 255.0).round() as u8,
                (g * 255.0).round() as u8,
                (b * 255.0).round() as u8
            )
        })
        .collect();
    [colors.clone(), colors].concat()
}

/// `key: value` lines joined by `<br>`, skipping absent values.
pub fn hover_text(fields: &[(&str, Option<String>)]) -> String {
    fields
        .iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| format!("{k}: {v}")))
        .collect::<Vec<_>>()
        .join("<br>")
}

/// Axis span over present values, optionally clipped to a quantile window,
/// padded on both sides by `padding` times the span.
pub fn axis_range(values: &[Option<f64>], clip: Option<(f64, f64)>, padding: f64) -> Option<(f64, f64)> {
    let sorted = stats::sorted(&stats::present(values));
    let (lo, hi) = match clip {
        Some((q_lo, q_hi)) => (
            stats::quantile_sorted(&sorted, q_lo)?,
            stats::quantile_sorted(&sorted, q_hi)?,
        ),
        None => (*sorted.first()?, *sorted.last()?),
    };
    let pad = (hi - lo) * padding;
    Some((lo - pad, hi + pad))
}

pub fn marker_size(n_cells: usize, large_plot_threshold: usize) -> u32 {
    if n_cells > large_plot_threshold { 2 } else { 4 }
}

/// Heatmap column titles: clusters read `Cluster <n>`; a lone `None`
/// column reads `N/A`.
pub fn heatmap_column_labels(groups: &[String], scheme: GroupingScheme) -> Vec<String> {
    if groups.len() == 1 && groups[0] == "None" {
        return vec!["N/A".to_string()];
    }
    match scheme {
        GroupingScheme::Cluster => groups
            .iter()
            .map(|g| format!("Cluster {}", g.strip_prefix("cluster_").unwrap_or(g)))
            .collect(),
        _ => groups.to_vec(),
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;
