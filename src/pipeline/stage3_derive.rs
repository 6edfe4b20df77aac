use tracing::{debug, info};

use crate::model::modality::{Level, MetricKind};
use crate::model::table::{CellTable, Column};
use crate::pipeline::GmaeError;
use crate::pipeline::stage2_load::{GeneComponents, LoadedRows};
use crate::stats;

/// Name of the per-cell derived metric column.
pub const METRIC: &str = "metric";

/// Per-cell mean of the genes' values, skipping genes without a value for
/// that cell.
pub fn average_components(parts: &[&[Option<f64>]], n: usize) -> Vec<Option<f64>> {
    (0..n)
        .map(|i| {
            let mut sum = 0f64;
            let mut count = 0usize;
            for part in parts {
                if let Some(v) = part.get(i).copied().flatten() {
                    sum += v;
                    count += 1;
                }
            }
            (count > 0).then(|| sum / count as f64)
        })
        .collect()
}

/// Turns raw components into the metric. Ratios divide numerator by
/// denominator (and by the global ratio when normalized); a zero or missing
/// divisor yields a missing value. Counts are filled with zero.
pub fn compute_metric(
    numerator: &[Option<f64>],
    denominator: Option<&[Option<f64>]>,
    global: Option<&[Option<f64>]>,
    kind: MetricKind,
    level: Level,
) -> Result<Vec<Option<f64>>, GmaeError> {
    match kind {
        MetricKind::Count => {
            if numerator.iter().all(Option::is_none) {
                return Err(GmaeError::NoData("count column is empty".to_string()));
            }
            if level == Level::Normalized {
                debug!("normalized level has no effect on count data");
            }
            Ok(numerator.iter().map(|v| Some(v.unwrap_or(0.0))).collect())
        }
        MetricKind::Ratio => {
            let Some(den) = denominator.filter(|d| d.iter().any(Option::is_some)) else {
                return Err(GmaeError::NoData("denominator column is empty".to_string()));
            };
            let global = match level {
                Level::Original => None,
                Level::Normalized => Some(global.ok_or_else(|| {
                    GmaeError::NoData("global ratio column is missing".to_string())
                })?),
            };
            Ok(numerator
                .iter()
                .zip(den)
                .enumerate()
                .map(|(i, (n, d))| {
                    let ratio = divide(*n, *d)?;
                    match global {
                        None => Some(ratio),
                        Some(g) => divide(Some(ratio), g.get(i).copied().flatten()),
                    }
                })
                .collect())
        }
    }
}

fn divide(n: Option<f64>, d: Option<f64>) -> Option<f64> {
    let (n, d) = (n?, d?);
    if d == 0.0 { None } else { Some(n / d) }
}

fn global_column<'a>(loaded: &'a LoadedRows) -> Option<&'a [Option<f64>]> {
    loaded
        .columns
        .global
        .as_deref()
        .and_then(|name| loaded.cells.number(name))
}

/// Single metric column from all loaded genes, averaging components (not
/// ratios) across genes. The averaged components are kept next to it.
pub fn derive_metric(
    loaded: &LoadedRows,
    kind: MetricKind,
    level: Level,
) -> Result<CellTable, GmaeError> {
    let n = loaded.cells.len();
    let nums: Vec<&[Option<f64>]> = loaded.genes.iter().map(|g| g.numerator.as_slice()).collect();
    let dens: Vec<&[Option<f64>]> = loaded
        .genes
        .iter()
        .filter_map(|g| g.denominator.as_deref())
        .collect();
    let numerator = average_components(&nums, n);
    let denominator = (!dens.is_empty()).then(|| average_components(&dens, n));

    let metric = compute_metric(
        &numerator,
        denominator.as_deref(),
        global_column(loaded),
        kind,
        level,
    )?;

    let mut table = loaded.cells.clone();
    table.set_column(&loaded.columns.numerator, Column::Number(numerator));
    if let (Some(name), Some(values)) = (&loaded.columns.denominator, denominator) {
        table.set_column(name, Column::Number(values));
    }
    table.set_column(METRIC, Column::Number(metric));
    Ok(table)
}

/// Column name for gene `index` in a per-gene table.
pub fn gene_metric_column(index: usize) -> String {
    format!("{METRIC}_{index}")
}

/// One metric column per loaded gene. A gene without coverage keeps a
/// column of missing values; the table is NoData only when no gene has any.
pub fn derive_per_gene(
    loaded: &LoadedRows,
    kind: MetricKind,
    level: Level,
) -> Result<(CellTable, Vec<GeneComponents>), GmaeError> {
    let n = loaded.cells.len();
    let mut table = loaded.cells.clone();
    let mut covered = 0usize;
    for (i, gene) in loaded.genes.iter().enumerate() {
        let metric = match compute_metric(
            &gene.numerator,
            gene.denominator.as_deref(),
            global_column(loaded),
            kind,
            level,
        ) {
            Ok(values) => {
                covered += 1;
                values
            }
            Err(GmaeError::NoData(why)) => {
                debug!("gene {} has no data: {why}", gene.gene.gene_id);
                vec![None; n]
            }
            Err(other) => return Err(other),
        };
        table.set_column(&gene_metric_column(i), Column::Number(metric));
    }
    if covered == 0 {
        return Err(GmaeError::NoData("no gene has coverage".to_string()));
    }
    Ok((table, loaded.genes.clone()))
}

/// Drops cells whose metric lies above the `quantile` of the metric column.
/// Cells without a value are kept.
pub fn trim_outliers(table: &mut CellTable, quantile: f64) {
    let Some(values) = table.number(METRIC) else {
        return;
    };
    let Some(cutoff) = stats::quantile(&stats::present(values), quantile) else {
        return;
    };
    let keep: Vec<bool> = values.iter().map(|v| v.is_none_or(|v| v <= cutoff)).collect();
    let before = table.len();
    table.retain_rows(&keep);
    info!(
        "outlier trim at q{quantile} ({cutoff:.4}) dropped {} of {before} cells",
        before - table.len()
    );
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_derive.rs"]
mod tests;
