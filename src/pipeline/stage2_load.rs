use std::collections::HashMap;
use std::time::Instant;

use rayon::ThreadPool;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::input::key::TableKey;
use crate::input::source::CELL_ID;
use crate::input::tsv::parse_number;
use crate::input::{ColumnScope, InputError, RowSet, RowSource};
use crate::model::gene::GeneRecord;
use crate::model::modality::{MeasureColumns, Modality};
use crate::model::table::{CellTable, Column};
use crate::pipeline::GmaeError;

#[derive(Debug, Clone)]
pub struct LoadParams<'a> {
    pub modality: &'a Modality,
    pub ensemble: &'a str,
    pub clustering: &'a str,
    pub embedding: &'a str,
    pub smoothed: bool,
}

/// Raw components of one gene, aligned to the loaded cell table.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneComponents {
    pub gene: GeneRecord,
    pub numerator: Vec<Option<f64>>,
    pub denominator: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Clone)]
pub struct LoadedRows {
    /// Metadata, embedding and global-ratio columns of the cohort.
    pub cells: CellTable,
    /// Genes that had a table, in request order.
    pub genes: Vec<GeneComponents>,
    pub columns: MeasureColumns,
}

fn table_keys(genes: &[GeneRecord], params: &LoadParams<'_>) -> Result<Vec<TableKey>, InputError> {
    genes
        .iter()
        .map(|g| {
            TableKey::new(
                params.modality,
                params.ensemble,
                &g.gene_id,
                params.clustering,
                params.embedding,
                params.smoothed,
            )
        })
        .collect()
}

fn cohort_key(params: &LoadParams<'_>) -> Result<TableKey, InputError> {
    TableKey::cohort(
        params.modality,
        params.ensemble,
        params.clustering,
        params.embedding,
        params.smoothed,
    )
}

fn numeric_columns(key: &TableKey) -> Vec<String> {
    let mut out = key.embedding_columns();
    out.extend(key.measure_columns().global);
    out
}

/// Typed cell table from a fetched row set; `numeric` columns are parsed as
/// numbers, everything else stays text.
pub fn rowset_to_table(rows: &RowSet, numeric: &[String]) -> Result<CellTable, GmaeError> {
    let id_col = rows
        .column_index(CELL_ID)
        .ok_or_else(|| GmaeError::NoData("rows carry no cell_id column".to_string()))?;
    let kept: Vec<usize> = (0..rows.len())
        .filter(|&r| rows.get(r, id_col).is_some())
        .collect();
    let ids = kept
        .iter()
        .filter_map(|&r| rows.get(r, id_col).map(str::to_string))
        .collect();
    let mut table = CellTable::new(ids);
    for (c, name) in rows.columns.iter().enumerate() {
        if c == id_col {
            continue;
        }
        let column = if numeric.contains(name) {
            Column::Number(kept.iter().map(|&r| parse_number(rows.get(r, c))).collect())
        } else {
            Column::Text(
                kept.iter()
                    .map(|&r| rows.get(r, c).map(str::to_string))
                    .collect(),
            )
        };
        table.set_column(name, column);
    }
    Ok(table)
}

/// Values of `column` re-keyed onto `index` by cell id. `None` when the row
/// set lacks the column.
fn aligned(
    rows: &RowSet,
    column: &str,
    index: &HashMap<&str, usize>,
    n: usize,
) -> Option<Vec<Option<f64>>> {
    let id_col = rows.column_index(CELL_ID)?;
    let col = rows.column_index(column)?;
    let mut out = vec![None; n];
    for r in 0..rows.len() {
        let Some(&slot) = rows.get(r, id_col).and_then(|id| index.get(id)) else {
            continue;
        };
        out[slot] = parse_number(rows.get(r, col));
    }
    Some(out)
}

/// Fetches the cohort's cell metadata with the full column scope, then every
/// gene's measurement columns on `pool`. Every gene is treated alike: a
/// missing table leaves that gene out of the average, and the request is
/// NoData only when no gene has a table. Results are merged in request order
/// whatever order the fetches finish in.
pub fn load_rows(
    source: &dyn RowSource,
    pool: &ThreadPool,
    genes: &[GeneRecord],
    params: &LoadParams<'_>,
) -> Result<LoadedRows, GmaeError> {
    if genes.is_empty() {
        return Err(GmaeError::NotFound("no genes requested".to_string()));
    }
    let cohort = cohort_key(params)?;
    let keys = table_keys(genes, params)?;
    let started = Instant::now();

    let Some(cohort_rows) = source.fetch(&cohort, ColumnScope::Full)? else {
        return Err(GmaeError::NotFound(format!("ensemble {}", params.ensemble)));
    };
    let cells = rowset_to_table(&cohort_rows, &numeric_columns(&cohort))?;

    let fetched: Vec<Result<Option<RowSet>, InputError>> = pool.install(|| {
        keys.par_iter()
            .map(|key| {
                let t = Instant::now();
                let out = source.fetch(key, ColumnScope::MeasurementOnly);
                debug!(
                    "fetched {} in {} ms",
                    key.gene_id().unwrap_or_default(),
                    t.elapsed().as_millis()
                );
                out
            })
            .collect()
    });

    let columns = cohort.measure_columns();
    let index = cells.row_index();
    let mut components = Vec::with_capacity(genes.len());
    for (gene, result) in genes.iter().zip(fetched) {
        let rows = match result {
            Ok(Some(rows)) => rows,
            Ok(None) => {
                warn!("no table for gene {}; leaving it out of the average", gene.gene_id);
                continue;
            }
            Err(err) if genes.len() > 1 => {
                return Err(GmaeError::FailedToAggregate(format!(
                    "loading {}: {err}",
                    gene.gene_id
                )));
            }
            Err(err) => return Err(err.into()),
        };
        components.push(GeneComponents {
            gene: gene.clone(),
            numerator: aligned(&rows, &columns.numerator, &index, cells.len())
                .unwrap_or_else(|| vec![None; cells.len()]),
            denominator: columns
                .denominator
                .as_deref()
                .and_then(|den| aligned(&rows, den, &index, cells.len())),
        });
    }
    if components.is_empty() {
        return Err(GmaeError::NoData(format!(
            "no gene tables for {} in ensemble {}",
            gene_list(genes),
            params.ensemble
        )));
    }

    info!(
        "loaded {} of {} genes over {} cells in {} ms",
        components.len(),
        genes.len(),
        cells.len(),
        started.elapsed().as_millis()
    );
    Ok(LoadedRows {
        cells,
        genes: components,
        columns,
    })
}

fn gene_list(genes: &[GeneRecord]) -> String {
    genes
        .iter()
        .map(|g| g.gene_id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_load.rs"]
mod tests;
